//! Built-in predicates and functions.
//!
//! A built-in *predicate* is a goal with a custom solver that yields at
//! most one solution per invocation (`$X = a`, `append(...)`, `print(...)`).
//! A built-in *function* is a term that evaluates to a concrete term when
//! it is unified (`add(1, 2)`, `join(...)`).

pub mod arith;
pub mod compare;
pub mod functor;
pub mod io;
pub mod lists;
pub mod text;

use crate::solve::{SolveContext, SolveError};
use crate::subst::SubstitutionSet;
use crate::term::{Term, VarGenerator, VarMap};
use crate::unify::unify;
use std::fmt;

/// The built-in functions: terms which evaluate during unification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FunctionKind {
    Add,
    Subtract,
    Multiply,
    Divide,
    Join,
}

impl FunctionKind {
    pub fn name(self) -> &'static str {
        match self {
            FunctionKind::Add => "add",
            FunctionKind::Subtract => "subtract",
            FunctionKind::Multiply => "multiply",
            FunctionKind::Divide => "divide",
            FunctionKind::Join => "join",
        }
    }

    /// Look up a function by its source-text name.
    pub fn from_name(name: &str) -> Option<FunctionKind> {
        match name {
            "add" => Some(FunctionKind::Add),
            "subtract" => Some(FunctionKind::Subtract),
            "multiply" => Some(FunctionKind::Multiply),
            "divide" => Some(FunctionKind::Divide),
            "join" => Some(FunctionKind::Join),
            _ => None,
        }
    }
}

/// A built-in function call, e.g. `add(7, 3, 2)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    pub kind: FunctionKind,
    pub args: Vec<Term>,
}

impl Function {
    pub fn new(kind: FunctionKind, args: Vec<Term>) -> Function {
        Function { kind, args }
    }

    /// Evaluate the function against the current bindings, producing a
    /// concrete term. All arguments must be ground.
    pub fn eval(&self, ss: &SubstitutionSet) -> Result<Term, SolveError> {
        match self.kind {
            FunctionKind::Add
            | FunctionKind::Subtract
            | FunctionKind::Multiply
            | FunctionKind::Divide => arith::evaluate(self.kind, &self.args, ss),
            FunctionKind::Join => text::join(&self.args, ss),
        }
    }

    pub fn recreate_variables(&self, vars: &mut VarMap, gen: &VarGenerator) -> Function {
        Function {
            kind: self.kind,
            args: self.args.iter().map(|t| t.recreate_variables(vars, gen)).collect(),
        }
    }

    pub fn replace_variables(&self, ss: &SubstitutionSet) -> Function {
        Function {
            kind: self.kind,
            args: self.args.iter().map(|t| t.replace_variables(ss)).collect(),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.kind.name())?;
        for (n, arg) in self.args.iter().enumerate() {
            if n != 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", arg)?;
        }
        write!(f, ")")
    }
}

/// The built-in predicates: goals with a custom one-shot solver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuiltinKind {
    Unify,
    Equal,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Append,
    Count,
    Functor,
    Include,
    Exclude,
    Print,
    PrintList,
    Nl,
}

impl BuiltinKind {
    pub fn name(self) -> &'static str {
        match self {
            BuiltinKind::Unify => "unify",
            BuiltinKind::Equal => "equal",
            BuiltinKind::LessThan => "less_than",
            BuiltinKind::LessThanOrEqual => "less_than_or_equal",
            BuiltinKind::GreaterThan => "greater_than",
            BuiltinKind::GreaterThanOrEqual => "greater_than_or_equal",
            BuiltinKind::Append => "append",
            BuiltinKind::Count => "count",
            BuiltinKind::Functor => "functor",
            BuiltinKind::Include => "include",
            BuiltinKind::Exclude => "exclude",
            BuiltinKind::Print => "print",
            BuiltinKind::PrintList => "print_list",
            BuiltinKind::Nl => "nl",
        }
    }

    /// The source-text operator for infix predicates, if any.
    fn infix(self) -> Option<&'static str> {
        match self {
            BuiltinKind::Unify => Some("="),
            BuiltinKind::Equal => Some("=="),
            BuiltinKind::LessThan => Some("<"),
            BuiltinKind::LessThanOrEqual => Some("<="),
            BuiltinKind::GreaterThan => Some(">"),
            BuiltinKind::GreaterThanOrEqual => Some(">="),
            _ => None,
        }
    }
}

/// A built-in predicate call with its arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct Builtin {
    pub kind: BuiltinKind,
    pub args: Vec<Term>,
}

impl Builtin {
    pub fn new(kind: BuiltinKind, args: Vec<Term>) -> Builtin {
        Builtin { kind, args }
    }

    /// Evaluate the predicate against the current bindings. Every built-in
    /// predicate yields at most one solution; the solution node latches
    /// after the first call.
    pub fn solve(
        &self,
        ss: &SubstitutionSet,
        ctx: &SolveContext,
    ) -> Result<Option<SubstitutionSet>, SolveError> {
        match self.kind {
            BuiltinKind::Unify => {
                self.expect_args(2)?;
                unify(&self.args[0], &self.args[1], ss)
            }
            BuiltinKind::Equal
            | BuiltinKind::LessThan
            | BuiltinKind::LessThanOrEqual
            | BuiltinKind::GreaterThan
            | BuiltinKind::GreaterThanOrEqual => {
                self.expect_args(2)?;
                compare::solve(self.kind, &self.args, ss)
            }
            BuiltinKind::Append => lists::append(&self.args, ss),
            BuiltinKind::Count => {
                self.expect_args(2)?;
                lists::count(&self.args, ss)
            }
            BuiltinKind::Functor => functor::solve(&self.args, ss),
            BuiltinKind::Include => {
                self.expect_args(3)?;
                lists::filter(&self.args, ss, true)
            }
            BuiltinKind::Exclude => {
                self.expect_args(3)?;
                lists::filter(&self.args, ss, false)
            }
            BuiltinKind::Print => io::print(&self.args, ss, ctx),
            BuiltinKind::PrintList => io::print_list(&self.args, ss, ctx),
            BuiltinKind::Nl => io::newline(ss, ctx),
        }
    }

    fn expect_args(&self, n: usize) -> Result<(), SolveError> {
        if self.args.len() == n {
            Ok(())
        } else {
            Err(SolveError::WrongArity {
                op: self.kind.name(),
                expected: n,
                found: self.args.len(),
            })
        }
    }

    pub fn recreate_variables(&self, vars: &mut VarMap, gen: &VarGenerator) -> Builtin {
        Builtin {
            kind: self.kind,
            args: self.args.iter().map(|t| t.recreate_variables(vars, gen)).collect(),
        }
    }

    pub fn replace_variables(&self, ss: &SubstitutionSet) -> Builtin {
        Builtin {
            kind: self.kind,
            args: self.args.iter().map(|t| t.replace_variables(ss)).collect(),
        }
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(op) = self.kind.infix() {
            if self.args.len() == 2 {
                return write!(f, "{} {} {}", self.args[0], op, self.args[1]);
            }
        }
        write!(f, "{}", self.kind.name())?;
        if !self.args.is_empty() {
            write!(f, "(")?;
            for (n, arg) in self.args.iter().enumerate() {
                if n != 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", arg)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_names_round_trip() {
        for kind in [
            FunctionKind::Add,
            FunctionKind::Subtract,
            FunctionKind::Multiply,
            FunctionKind::Divide,
            FunctionKind::Join,
        ] {
            assert_eq!(FunctionKind::from_name(kind.name()), Some(kind));
        }
    }

    #[test]
    fn unknown_function_name() {
        assert_eq!(FunctionKind::from_name("modulo"), None);
    }

    #[test]
    fn display_infix_builtin() {
        let b = Builtin::new(BuiltinKind::Unify, vec![Term::var("$X"), Term::atom("verb")]);
        assert_eq!(b.to_string(), "$X = verb");

        let c = Builtin::new(BuiltinKind::LessThanOrEqual, vec![Term::var("$X"), Term::Integer(5)]);
        assert_eq!(c.to_string(), "$X <= 5");
    }

    #[test]
    fn display_named_builtin() {
        let b = Builtin::new(
            BuiltinKind::Append,
            vec![Term::atom("a"), Term::atom("b"), Term::var("$Out")],
        );
        assert_eq!(b.to_string(), "append(a, b, $Out)");
    }

    #[test]
    fn display_nl_without_parens() {
        let b = Builtin::new(BuiltinKind::Nl, vec![]);
        assert_eq!(b.to_string(), "nl");
    }

    #[test]
    fn display_function_call() {
        let f = Function::new(FunctionKind::Add, vec![Term::Integer(1), Term::Integer(2)]);
        assert_eq!(f.to_string(), "add(1, 2)");
    }
}
