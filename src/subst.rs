//! The substitution set: bindings of logic variables.
//!
//! As the inference engine searches for a solution, it adds variable
//! bindings to the substitution set. Because the set contains all variable
//! bindings of the search so far, it can be thought of as the partial or
//! complete solution.
//!
//! Query-time variable ids are small contiguous integers, so bindings live
//! in a vector indexed by id rather than a hash map. The vector is a
//! persistent structure: `extend` returns a new set that shares structure
//! with its parent, so taking a binding is cheap and backtracking is free -
//! the parent set is simply used again.

use crate::symbol::Symbol;
use crate::term::{Complex, Term, TermKind, Variable};
use crate::list::LinkedList;
use im::Vector;
use std::fmt;

/// Bindings of scoped variables, indexed by variable id.
/// `None` means the variable is unbound.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SubstitutionSet {
    bindings: Vector<Option<Term>>,
}

impl SubstitutionSet {
    /// Create an empty substitution set.
    pub fn new() -> SubstitutionSet {
        SubstitutionSet { bindings: Vector::new() }
    }

    /// Number of bound variables.
    pub fn len(&self) -> usize {
        self.bindings.iter().filter(|b| b.is_some()).count()
    }

    /// True when no variable is bound.
    pub fn is_empty(&self) -> bool {
        self.bindings.iter().all(|b| b.is_none())
    }

    /// A variable is bound if there is an entry for it in the set.
    pub fn is_bound(&self, v: &Variable) -> bool {
        self.binding(v).is_some()
    }

    /// The direct binding of a variable, if any. Does not chase chains.
    pub fn binding(&self, v: &Variable) -> Option<&Term> {
        self.bindings.get(v.id).and_then(|slot| slot.as_ref())
    }

    /// Return a new substitution set which also binds `v` to `term`.
    /// The receiver is untouched; the two sets share structure.
    pub fn extend(&self, v: Variable, term: Term) -> SubstitutionSet {
        debug_assert!(v.id != 0, "template variables must never be bound");
        let mut bindings = self.bindings.clone();
        while bindings.len() <= v.id {
            bindings.push_back(None);
        }
        bindings.set(v.id, Some(term));
        SubstitutionSet { bindings }
    }

    /// A variable is ground if it is ultimately bound to something other
    /// than a variable.
    pub fn is_ground_variable(&self, v: &Variable) -> bool {
        let mut current = *v;
        loop {
            match self.binding(&current) {
                Some(Term::Var(next)) => current = *next,
                Some(_) => return true,
                None => return false,
            }
        }
    }

    /// Follow a term to its ground value. For a non-variable the term
    /// itself is returned with `true`. For a variable, the chain of
    /// bindings is followed: the final non-variable term is returned with
    /// `true`, or the unbound variable at the end of the chain with
    /// `false`.
    pub fn ground_term<'a>(&'a self, term: &'a Term) -> (&'a Term, bool) {
        let mut current = term;
        loop {
            match current {
                Term::Var(v) => match self.binding(v) {
                    Some(next) => current = next,
                    None => return (current, false),
                },
                _ => return (current, true),
            }
        }
    }

    /// Resolve the term and return it as a complex term, if it is one.
    pub fn cast_complex<'a>(&'a self, term: &'a Term) -> Option<&'a Complex> {
        let resolved = match term.kind() {
            TermKind::Complex => term,
            TermKind::Variable => {
                let (ground, ok) = self.ground_term(term);
                if !ok {
                    return None;
                }
                ground
            }
            _ => return None,
        };
        match resolved {
            Term::Complex(c) => Some(c),
            _ => None,
        }
    }

    /// Resolve the term and return it as a linked list, if it is one.
    pub fn cast_list<'a>(&'a self, term: &'a Term) -> Option<&'a LinkedList> {
        let resolved = match term.kind() {
            TermKind::List => term,
            TermKind::Variable => {
                let (ground, ok) = self.ground_term(term);
                if !ok {
                    return None;
                }
                ground
            }
            _ => return None,
        };
        match resolved {
            Term::List(l) => Some(l),
            _ => None,
        }
    }

    /// Resolve the term and return it as an atom, if it is one.
    pub fn cast_atom(&self, term: &Term) -> Option<Symbol> {
        let resolved = match term.kind() {
            TermKind::Atom => term,
            TermKind::Variable => {
                let (ground, ok) = self.ground_term(term);
                if !ok {
                    return None;
                }
                ground
            }
            _ => return None,
        };
        match resolved {
            Term::Atom(s) => Some(*s),
            _ => None,
        }
    }
}

impl fmt::Display for SubstitutionSet {
    /// Renders the binding table, for diagnostics.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "----- Bindings -----")?;
        for (id, slot) in self.bindings.iter().enumerate() {
            if let Some(term) = slot {
                writeln!(f, "    {}: {}", id, term)?;
            }
        }
        write!(f, "--------------------")
    }
}
