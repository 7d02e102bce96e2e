//! Arithmetic functions: `add`, `subtract`, `multiply`, `divide`.
//!
//! Each takes two or more arguments and folds left to right. The result is
//! an Integer unless any operand is a Float; `divide` always produces a
//! Float. Every operand must be ground and numeric.

use super::FunctionKind;
use crate::solve::SolveError;
use crate::subst::SubstitutionSet;
use crate::term::Term;

/// A numeric operand, after grounding.
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(&self) -> f64 {
        match self {
            Number::Int(i) => *i as f64,
            Number::Float(f) => *f,
        }
    }
}

/// Ground every argument and check that it is a number.
fn ground_numbers(
    op: &'static str,
    args: &[Term],
    ss: &SubstitutionSet,
) -> Result<Vec<Number>, SolveError> {
    let mut numbers = Vec::with_capacity(args.len());
    for arg in args {
        let (ground, ok) = ss.ground_term(arg);
        if !ok {
            return Err(SolveError::NotGround { op, term: ground.to_string() });
        }
        match ground {
            Term::Integer(i) => numbers.push(Number::Int(*i)),
            Term::Float(f) => numbers.push(Number::Float(*f)),
            other => {
                return Err(SolveError::NotNumber { op, term: other.to_string() });
            }
        }
    }
    Ok(numbers)
}

/// Evaluate an arithmetic function over its arguments, left to right.
pub fn evaluate(
    kind: FunctionKind,
    args: &[Term],
    ss: &SubstitutionSet,
) -> Result<Term, SolveError> {
    let op = kind.name();
    if args.len() < 2 {
        return Err(SolveError::WrongArity { op, expected: 2, found: args.len() });
    }
    let numbers = ground_numbers(op, args, ss)?;

    // Division is always carried out in floating point.
    if kind == FunctionKind::Divide {
        let mut result = numbers[0].as_f64();
        for n in &numbers[1..] {
            result /= n.as_f64();
        }
        return Ok(Term::Float(result));
    }

    let has_float = numbers.iter().any(|n| matches!(n, Number::Float(_)));
    if has_float {
        let mut result = numbers[0].as_f64();
        for n in &numbers[1..] {
            let v = n.as_f64();
            match kind {
                FunctionKind::Add => result += v,
                FunctionKind::Subtract => result -= v,
                FunctionKind::Multiply => result *= v,
                _ => unreachable!("divide handled above; join is not arithmetic"),
            }
        }
        Ok(Term::Float(result))
    } else {
        let mut result = match numbers[0] {
            Number::Int(i) => i,
            Number::Float(_) => unreachable!("has_float is false"),
        };
        for n in &numbers[1..] {
            let v = match n {
                Number::Int(i) => *i,
                Number::Float(_) => unreachable!("has_float is false"),
            };
            match kind {
                FunctionKind::Add => result += v,
                FunctionKind::Subtract => result -= v,
                FunctionKind::Multiply => result *= v,
                _ => unreachable!("divide handled above; join is not arithmetic"),
            }
        }
        Ok(Term::Integer(result))
    }
}
