//! Goals and rules.
//!
//! A goal is a term being proved: a complex term resolved against the
//! knowledge base, an operator expression (And, Or, Not, Cut, Fail), a
//! timed goal, or a built-in predicate. Rules pair a complex head with an
//! optional body goal; a rule without a body is a fact.

use crate::builtins::Builtin;
use crate::subst::SubstitutionSet;
use crate::term::{Complex, VarGenerator, VarMap, Variable};
use std::fmt;

/// A goal expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Goal {
    /// A complex term, resolved against the knowledge base.
    Complex(Complex),
    /// Conjunction: every operand must succeed, left to right.
    And(Vec<Goal>),
    /// Disjunction: operands are tried left to right.
    Or(Vec<Goal>),
    /// Negation as failure over a single goal.
    Not(Box<Goal>),
    /// Prove the inner goal and report its elapsed time.
    Time(Complex),
    /// `!` - commit to the choices made so far in the current rule.
    Cut,
    /// Always fails.
    Fail,
    /// A built-in predicate with a one-shot solver.
    Builtin(Builtin),
}

impl Goal {
    /// Rename every variable in the goal to a fresh scoped id, keeping
    /// repeated occurrences consistent through the shared map.
    pub fn recreate_variables(&self, vars: &mut VarMap, gen: &VarGenerator) -> Goal {
        match self {
            Goal::Complex(c) => Goal::Complex(c.recreate_variables(vars, gen)),
            Goal::And(goals) => {
                Goal::And(goals.iter().map(|g| g.recreate_variables(vars, gen)).collect())
            }
            Goal::Or(goals) => {
                Goal::Or(goals.iter().map(|g| g.recreate_variables(vars, gen)).collect())
            }
            Goal::Not(inner) => Goal::Not(Box::new(inner.recreate_variables(vars, gen))),
            Goal::Time(c) => Goal::Time(c.recreate_variables(vars, gen)),
            Goal::Cut => Goal::Cut,
            Goal::Fail => Goal::Fail,
            Goal::Builtin(b) => Goal::Builtin(b.recreate_variables(vars, gen)),
        }
    }

    /// Replace bound variables with their bindings, for displaying a
    /// resolved goal.
    pub fn replace_variables(&self, ss: &SubstitutionSet) -> Goal {
        match self {
            Goal::Complex(c) => Goal::Complex(c.replace_variables(ss)),
            Goal::And(goals) => {
                Goal::And(goals.iter().map(|g| g.replace_variables(ss)).collect())
            }
            Goal::Or(goals) => {
                Goal::Or(goals.iter().map(|g| g.replace_variables(ss)).collect())
            }
            Goal::Not(inner) => Goal::Not(Box::new(inner.replace_variables(ss))),
            Goal::Time(c) => Goal::Time(c.replace_variables(ss)),
            Goal::Cut => Goal::Cut,
            Goal::Fail => Goal::Fail,
            Goal::Builtin(b) => Goal::Builtin(b.replace_variables(ss)),
        }
    }

    /// Collect every distinct variable in the goal, in order of first
    /// appearance.
    pub fn collect_variables(&self, out: &mut Vec<Variable>) {
        match self {
            Goal::Complex(c) => c.collect_variables(out),
            Goal::And(goals) | Goal::Or(goals) => {
                for g in goals {
                    g.collect_variables(out);
                }
            }
            Goal::Not(inner) => inner.collect_variables(out),
            Goal::Time(c) => c.collect_variables(out),
            Goal::Cut | Goal::Fail => {}
            Goal::Builtin(b) => {
                for arg in &b.args {
                    arg.collect_variables(out);
                }
            }
        }
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Goal::Complex(c) => write!(f, "{}", c),
            Goal::And(goals) => {
                for (n, g) in goals.iter().enumerate() {
                    if n != 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", g)?;
                }
                Ok(())
            }
            Goal::Or(goals) => {
                for (n, g) in goals.iter().enumerate() {
                    if n != 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", g)?;
                }
                Ok(())
            }
            Goal::Not(inner) => write!(f, "not({})", inner),
            Goal::Time(c) => write!(f, "time({})", c),
            Goal::Cut => write!(f, "!"),
            Goal::Fail => write!(f, "fail"),
            Goal::Builtin(b) => write!(f, "{}", b),
        }
    }
}

/// A rule: `head :- body.` A fact is a rule without a body.
#[derive(Clone, Debug, PartialEq)]
pub struct Rule {
    pub head: Complex,
    pub body: Option<Goal>,
}

impl Rule {
    pub fn new(head: Complex, body: Goal) -> Rule {
        Rule { head, body: Some(body) }
    }

    pub fn fact(head: Complex) -> Rule {
        Rule { head, body: None }
    }

    pub fn is_fact(&self) -> bool {
        self.body.is_none()
    }

    /// Rename every variable in head and body through one shared map, so
    /// that variables spanning both stay consistent.
    pub fn recreate_variables(&self, vars: &mut VarMap, gen: &VarGenerator) -> Rule {
        Rule {
            head: self.head.recreate_variables(vars, gen),
            body: self.body.as_ref().map(|b| b.recreate_variables(vars, gen)),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.body {
            Some(body) => write!(f, "{} :- {}.", self.head, body),
            None => write!(f, "{}.", self.head),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::{Builtin, BuiltinKind};
    use crate::symbol::Symbol;
    use crate::term::Term;

    fn complex(functor: &str, args: Vec<Term>) -> Complex {
        Complex::new(Symbol::intern(functor), args)
    }

    // ========== DISPLAY TESTS ==========

    #[test]
    fn display_and_goal() {
        let g = Goal::And(vec![
            Goal::Complex(complex("a", vec![])),
            Goal::Complex(complex("b", vec![])),
        ]);
        assert_eq!(g.to_string(), "a, b");
    }

    #[test]
    fn display_or_goal() {
        let g = Goal::Or(vec![
            Goal::Complex(complex("a", vec![])),
            Goal::Complex(complex("b", vec![])),
        ]);
        assert_eq!(g.to_string(), "a; b");
    }

    #[test]
    fn display_not_cut_fail() {
        let g = Goal::Not(Box::new(Goal::Complex(complex("a", vec![]))));
        assert_eq!(g.to_string(), "not(a)");
        assert_eq!(Goal::Cut.to_string(), "!");
        assert_eq!(Goal::Fail.to_string(), "fail");
    }

    #[test]
    fn display_time_goal() {
        let g = Goal::Time(complex("qsort", vec![]));
        assert_eq!(g.to_string(), "time(qsort)");
    }

    #[test]
    fn display_fact_and_rule() {
        let fact = Rule::fact(complex("male", vec![Term::atom("Harold")]));
        assert_eq!(fact.to_string(), "male(Harold).");

        let rule = Rule::new(
            complex("parent", vec![Term::var("$X"), Term::var("$Y")]),
            Goal::Complex(complex("mother", vec![Term::var("$X"), Term::var("$Y")])),
        );
        assert_eq!(rule.to_string(), "parent($X, $Y) :- mother($X, $Y).");
    }

    // ========== VARIABLE RECREATION TESTS ==========

    #[test]
    fn recreate_shares_variables_between_head_and_body() {
        let gen = VarGenerator::new();
        let mut vars = VarMap::default();
        let rule = Rule::new(
            complex("p", vec![Term::var("$X")]),
            Goal::Complex(complex("q", vec![Term::var("$X")])),
        );
        let fresh = rule.recreate_variables(&mut vars, &gen);
        let head_var = match &fresh.head.args[0] {
            Term::Var(v) => *v,
            other => panic!("Expected variable, got {:?}", other),
        };
        let body_var = match &fresh.body {
            Some(Goal::Complex(c)) => match &c.args[0] {
                Term::Var(v) => *v,
                other => panic!("Expected variable, got {:?}", other),
            },
            other => panic!("Expected complex body, got {:?}", other),
        };
        assert_eq!(head_var, body_var, "Head and body must share the renamed variable");
        assert_ne!(head_var.id, 0);
    }

    #[test]
    fn recreate_operator_goal_recurses() {
        let gen = VarGenerator::new();
        let mut vars = VarMap::default();
        let g = Goal::And(vec![
            Goal::Complex(complex("p", vec![Term::var("$X")])),
            Goal::Not(Box::new(Goal::Complex(complex("q", vec![Term::var("$X")])))),
        ]);
        let fresh = g.recreate_variables(&mut vars, &gen);
        let mut collected = Vec::new();
        fresh.collect_variables(&mut collected);
        assert_eq!(collected.len(), 1, "One distinct variable across both operands");
        assert_ne!(collected[0].id, 0);
    }

    // ========== VARIABLE COLLECTION TESTS ==========

    #[test]
    fn collect_variables_from_builtin_goal() {
        let g = Goal::Builtin(Builtin::new(
            BuiltinKind::Unify,
            vec![Term::var("$X"), Term::atom("verb")],
        ));
        let mut collected = Vec::new();
        g.collect_variables(&mut collected);
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].name.as_str(), "$X");
    }

    #[test]
    fn cut_and_fail_have_no_variables() {
        let mut collected = Vec::new();
        Goal::Cut.collect_variables(&mut collected);
        Goal::Fail.collect_variables(&mut collected);
        assert!(collected.is_empty());
    }
}
