//! The term model: the sum type of logic terms and the operations every
//! term supports (display, variable recreation, binding replacement).
//!
//! Terms:
//! - `Atom` - interned symbolic constant; `a` and `A` are distinct
//! - `Integer`, `Float` - 64-bit numeric constants
//! - `Var` - logic variable, `$Name`; id 0 is an unscoped template
//! - `Anonymous` - `$_`, unifies with anything, binds nothing
//! - `Complex` - functor applied to argument terms
//! - `List` - singly linked list with optional tail variable
//! - `Function` - evaluates to a concrete term during unification

use crate::builtins::Function;
use crate::list::LinkedList;
use crate::subst::SubstitutionSet;
use crate::symbol::Symbol;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Map from template variables to their per-scope replacements.
///
/// Keyed by (name, id) so that distinct variables which share a name do not
/// collapse, while repeated occurrences of one variable stay consistent.
pub type VarMap = FxHashMap<(Symbol, usize), Variable>;

/// Generator of scoped variable ids, one per top-level query.
///
/// Substitution sets are indexed by variable id, so ids must stay small and
/// contiguous. The driver resets the generator at every query entry.
#[derive(Debug)]
pub struct VarGenerator {
    next: AtomicUsize,
}

impl VarGenerator {
    /// Create a generator whose first fresh id is 1.
    pub fn new() -> Self {
        Self { next: AtomicUsize::new(1) }
    }

    /// Hand out the next unused id.
    pub fn fresh(&self) -> usize {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Highest id handed out so far, for sizing diagnostics.
    pub fn high_water(&self) -> usize {
        self.next.load(Ordering::Relaxed) - 1
    }
}

impl Default for VarGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Tag identifying a term's kind without inspecting the payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TermKind {
    Atom,
    Integer,
    Float,
    Variable,
    Anonymous,
    Complex,
    List,
    Function,
}

/// A logic variable. The name includes the leading dollar sign, e.g. `$X`.
///
/// The parser produces variables with id 0 (templates). Scoped ids are
/// assigned when a goal is created or a rule is fetched from the knowledge
/// base, so that every rule instantiation has its own variables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Variable {
    pub name: Symbol,
    pub id: usize,
}

impl Variable {
    /// A template variable (id 0) with the given name.
    pub fn template(name: &str) -> Variable {
        Variable { name: Symbol::intern(name), id: 0 }
    }

    /// Look up or create the scoped replacement for this variable.
    /// Repeated occurrences map to the same replacement through `vars`.
    pub fn recreate(&self, vars: &mut VarMap, gen: &VarGenerator) -> Variable {
        *vars
            .entry((self.name, self.id))
            .or_insert_with(|| Variable { name: self.name, id: gen.fresh() })
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.id == 0 {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}_{}", self.name, self.id)
        }
    }
}

/// A complex (compound) term: a functor applied to zero or more arguments.
///
/// `owns(John, house)` has functor `owns` and arity 2. Rules are indexed by
/// functor/arity, and a complex goal is the unit of match against the
/// knowledge base.
#[derive(Clone, Debug, PartialEq)]
pub struct Complex {
    pub functor: Symbol,
    pub args: Vec<Term>,
}

impl Complex {
    pub fn new(functor: Symbol, args: Vec<Term>) -> Complex {
        Complex { functor, args }
    }

    /// A zero-arity complex term, e.g. the goal `halt`.
    pub fn nullary(functor: Symbol) -> Complex {
        Complex { functor, args: Vec::new() }
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// Rename every variable in the term through the shared map.
    pub fn recreate_variables(&self, vars: &mut VarMap, gen: &VarGenerator) -> Complex {
        Complex {
            functor: self.functor,
            args: self.args.iter().map(|t| t.recreate_variables(vars, gen)).collect(),
        }
    }

    /// Resolve bound variables for display of final results.
    pub fn replace_variables(&self, ss: &SubstitutionSet) -> Complex {
        Complex {
            functor: self.functor,
            args: self.args.iter().map(|t| t.replace_variables(ss)).collect(),
        }
    }

    /// Collect every distinct variable, in order of first appearance.
    pub fn collect_variables(&self, out: &mut Vec<Variable>) {
        for arg in &self.args {
            arg.collect_variables(out);
        }
    }
}

impl fmt::Display for Complex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.functor)?;
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

/// The sum type of logic terms.
#[derive(Clone, Debug, PartialEq)]
pub enum Term {
    Atom(Symbol),
    Integer(i64),
    Float(f64),
    Var(Variable),
    Anonymous,
    Complex(Complex),
    List(LinkedList),
    Function(Function),
}

impl Term {
    /// Convenience constructor for atoms.
    pub fn atom(name: &str) -> Term {
        Term::Atom(Symbol::intern(name))
    }

    /// Convenience constructor for template variables.
    pub fn var(name: &str) -> Term {
        Term::Var(Variable::template(name))
    }

    /// The tag identifying this term's kind.
    pub fn kind(&self) -> TermKind {
        match self {
            Term::Atom(_) => TermKind::Atom,
            Term::Integer(_) => TermKind::Integer,
            Term::Float(_) => TermKind::Float,
            Term::Var(_) => TermKind::Variable,
            Term::Anonymous => TermKind::Anonymous,
            Term::Complex(_) => TermKind::Complex,
            Term::List(_) => TermKind::List,
            Term::Function(_) => TermKind::Function,
        }
    }

    /// Rename every variable in the term to a fresh scoped id, consistently
    /// across repeated occurrences. The scope of a logic variable is the
    /// rule or goal in which it is defined; this is called whenever a rule
    /// is fetched from the knowledge base or a goal enters a query.
    pub fn recreate_variables(&self, vars: &mut VarMap, gen: &VarGenerator) -> Term {
        match self {
            Term::Var(v) => Term::Var(v.recreate(vars, gen)),
            Term::Complex(c) => Term::Complex(c.recreate_variables(vars, gen)),
            Term::List(l) => Term::List(l.recreate_variables(vars, gen)),
            Term::Function(fun) => Term::Function(fun.recreate_variables(vars, gen)),
            other => other.clone(),
        }
    }

    /// Replace bound variables with their bindings, recursively. Used to
    /// display final results. Unbound variables remain as variables.
    pub fn replace_variables(&self, ss: &SubstitutionSet) -> Term {
        match self {
            Term::Var(v) => match ss.binding(v) {
                Some(bound) => bound.clone().replace_variables(ss),
                None => self.clone(),
            },
            Term::Complex(c) => Term::Complex(c.replace_variables(ss)),
            Term::List(l) => Term::List(l.replace_variables(ss)),
            Term::Function(fun) => Term::Function(fun.replace_variables(ss)),
            other => other.clone(),
        }
    }

    /// Collect every distinct variable, in order of first appearance.
    pub fn collect_variables(&self, out: &mut Vec<Variable>) {
        match self {
            Term::Var(v) => {
                if !out.iter().any(|seen| seen.id == v.id && seen.name == v.name) {
                    out.push(*v);
                }
            }
            Term::Complex(c) => c.collect_variables(out),
            Term::List(l) => l.collect_variables(out),
            Term::Function(fun) => {
                for arg in &fun.args {
                    arg.collect_variables(out);
                }
            }
            _ => {}
        }
    }
}

/// Format a float so that it always reparses as a float.
pub(crate) fn format_float(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    if value.is_finite() && value == value.trunc() {
        write!(f, "{:.1}", value)
    } else {
        write!(f, "{}", value)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Atom(s) => write!(f, "{}", s),
            Term::Integer(i) => write!(f, "{}", i),
            Term::Float(x) => format_float(f, *x),
            Term::Var(v) => write!(f, "{}", v),
            Term::Anonymous => write!(f, "$_"),
            Term::Complex(c) => write!(f, "{}", c),
            Term::List(l) => write!(f, "{}", l),
            Term::Function(fun) => write!(f, "{}", fun),
        }
    }
}
