//! Comparison predicates: `==`, `<`, `<=`, `>`, `>=`.
//!
//! Comparisons never unify; both operands must already be ground.
//! Integers compare as integers; a mixed integer/float pair promotes the
//! integer to a float. When either operand is an atom, the two terms
//! compare lexicographically by their textual form. `==` is strict
//! equality of ground values.

use super::BuiltinKind;
use crate::solve::SolveError;
use crate::subst::SubstitutionSet;
use crate::term::Term;
use std::cmp::Ordering;

/// Resolve both operands to ground terms, or report which one is unbound.
fn ground_pair<'a>(
    op: &'static str,
    args: &'a [Term],
    ss: &'a SubstitutionSet,
) -> Result<(&'a Term, &'a Term), SolveError> {
    let (g1, ok) = ss.ground_term(&args[0]);
    if !ok {
        return Err(SolveError::NotGround { op, term: g1.to_string() });
    }
    let (g2, ok) = ss.ground_term(&args[1]);
    if !ok {
        return Err(SolveError::NotGround { op, term: g2.to_string() });
    }
    Ok((g1, g2))
}

/// Order two ground terms, or report that one is not comparable.
fn order(op: &'static str, a: &Term, b: &Term) -> Result<Ordering, SolveError> {
    match (a, b) {
        (Term::Integer(x), Term::Integer(y)) => Ok(x.cmp(y)),
        (Term::Integer(x), Term::Float(y)) => Ok(total(*x as f64, *y)),
        (Term::Float(x), Term::Integer(y)) => Ok(total(*x, *y as f64)),
        (Term::Float(x), Term::Float(y)) => Ok(total(*x, *y)),
        (Term::Atom(_), _) | (_, Term::Atom(_)) => {
            Ok(a.to_string().cmp(&b.to_string()))
        }
        _ => Err(SolveError::NotNumber { op, term: a.to_string() }),
    }
}

fn total(x: f64, y: f64) -> Ordering {
    x.partial_cmp(&y).unwrap_or(Ordering::Equal)
}

/// Strict equality of two ground values. Mixed integer/float promotes the
/// integer; mismatched kinds are simply unequal.
fn strictly_equal(a: &Term, b: &Term) -> bool {
    match (a, b) {
        (Term::Integer(x), Term::Integer(y)) => x == y,
        (Term::Float(x), Term::Float(y)) => x == y,
        (Term::Integer(x), Term::Float(y)) => (*x as f64) == *y,
        (Term::Float(x), Term::Integer(y)) => *x == (*y as f64),
        (Term::Atom(x), Term::Atom(y)) => x == y,
        _ => false,
    }
}

/// Evaluate a comparison predicate. Success returns the parent set
/// unchanged; comparisons never extend it.
pub fn solve(
    kind: BuiltinKind,
    args: &[Term],
    ss: &SubstitutionSet,
) -> Result<Option<SubstitutionSet>, SolveError> {
    let op = kind.name();
    let (g1, g2) = ground_pair(op, args, ss)?;

    let holds = match kind {
        BuiltinKind::Equal => strictly_equal(g1, g2),
        BuiltinKind::LessThan => order(op, g1, g2)? == Ordering::Less,
        BuiltinKind::LessThanOrEqual => order(op, g1, g2)? != Ordering::Greater,
        BuiltinKind::GreaterThan => order(op, g1, g2)? == Ordering::Greater,
        BuiltinKind::GreaterThanOrEqual => order(op, g1, g2)? != Ordering::Less,
        _ => unreachable!("not a comparison predicate"),
    };

    Ok(holds.then(|| ss.clone()))
}
