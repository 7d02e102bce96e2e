//! Singly linked list terms.
//!
//! Lists are written between square brackets, as in Prolog:
//!
//! - `[]` - the empty list
//! - `[a, b, c]`
//! - `[a, b | $T]` - the vertical bar separates head terms from a tail
//!   variable, which unifies with the remainder of another list
//!
//! A list is a chain of shared nodes. Each node carries one term, the rest
//! of the list, and a running count. The `tail_var` flag marks the final
//! node of a `[... | $T]` list; it distinguishes `[$A, $B, $X]` (three
//! elements) from `[$A, $B | $X]` (two elements plus a remainder).

use crate::subst::SubstitutionSet;
use crate::term::{Term, VarGenerator, VarMap, Variable};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, PartialEq)]
struct Node {
    term: Term,
    next: LinkedList,
    count: usize,
    tail_var: bool,
}

/// A singly linked list term. The empty list has no node.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkedList {
    node: Option<Arc<Node>>,
}

impl LinkedList {
    /// The empty list, `[]`.
    pub fn empty() -> LinkedList {
        LinkedList { node: None }
    }

    /// Build a list from terms, front to back.
    ///
    /// When `tail_var` is true the final term is a tail variable:
    /// `from_terms(true, vec![a, b, t])` produces `[a, b | $T]`.
    /// When the final term is itself a list, it becomes the tail:
    /// `from_terms(false, vec![a, [c, d]])` produces `[a, c, d]`.
    pub fn from_terms(tail_var: bool, terms: Vec<Term>) -> LinkedList {
        let mut tail = LinkedList::empty();
        let mut count = 0usize;
        let mut vbar = tail_var;
        let mut last = true;
        for term in terms.into_iter().rev() {
            if last {
                last = false;
                if let Term::List(inner) = term {
                    count = inner.count();
                    tail = inner;
                    vbar = false;
                    continue;
                }
            }
            count += 1;
            tail = LinkedList {
                node: Some(Arc::new(Node { term, next: tail, count, tail_var: vbar })),
            };
            vbar = false;
        }
        tail
    }

    /// Add one term to the front of the list.
    pub fn link_front(term: Term, tail_var: bool, rest: LinkedList) -> LinkedList {
        let count = rest.count() + 1;
        LinkedList {
            node: Some(Arc::new(Node { term, next: rest, count, tail_var })),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.node.is_none()
    }

    /// Number of terms in the list. A tail variable counts as one term.
    pub fn count(&self) -> usize {
        self.node.as_ref().map_or(0, |n| n.count)
    }

    /// The first term, if any.
    pub fn head(&self) -> Option<&Term> {
        self.node.as_ref().map(|n| &n.term)
    }

    /// The rest of the list after the first term. `None` on the empty list.
    pub fn tail(&self) -> Option<&LinkedList> {
        self.node.as_ref().map(|n| &n.next)
    }

    /// True when the head of this (sub)list is a tail variable.
    pub fn head_is_tail_var(&self) -> bool {
        self.node.as_ref().is_some_and(|n| n.tail_var)
    }

    /// Take the first `n` terms. On success the result holds those terms
    /// followed by the remainder of the list (possibly `[]`) as a final
    /// list term. Tail variables are chased through the substitution set.
    pub fn flatten(&self, n: usize, ss: &SubstitutionSet) -> Option<Vec<Term>> {
        if n < 1 {
            return None;
        }
        let mut out = Vec::with_capacity(n + 1);
        let mut current = self.clone();
        for _ in 0..n {
            if current.head_is_tail_var() {
                let continuation =
                    current.head().and_then(|term| ss.cast_list(term)).cloned();
                if let Some(list) = continuation {
                    current = list;
                }
            }
            match current.head() {
                Some(term) => out.push(term.clone()),
                None => return None,
            }
            let next = current.tail().cloned().unwrap_or_else(LinkedList::empty);
            current = next;
        }
        out.push(Term::List(current));
        Some(out)
    }

    /// Rename every variable in the list, preserving the tail-variable flag.
    pub fn recreate_variables(&self, vars: &mut VarMap, gen: &VarGenerator) -> LinkedList {
        let mut terms = Vec::with_capacity(self.count());
        let mut vbar = false;
        let mut current = self;
        while let Some(node) = current.node.as_ref() {
            terms.push(node.term.recreate_variables(vars, gen));
            vbar = node.tail_var;
            current = &node.next;
        }
        LinkedList::from_terms(vbar, terms)
    }

    /// Replace bound variables with their bindings, splicing any list a
    /// tail variable resolved to into a single flat list for display.
    pub fn replace_variables(&self, ss: &SubstitutionSet) -> LinkedList {
        let mut terms = Vec::with_capacity(self.count());
        let mut current = self;
        while let Some(node) = current.node.as_ref() {
            let resolved = node.term.replace_variables(ss);
            if let Term::List(inner) = resolved {
                let mut sub = &inner;
                while let Some(sub_node) = sub.node.as_ref() {
                    terms.push(sub_node.term.clone());
                    sub = &sub_node.next;
                }
            } else {
                terms.push(resolved);
            }
            current = &node.next;
        }
        LinkedList::from_terms(false, terms)
    }

    /// Collect every distinct variable, in order of first appearance.
    pub fn collect_variables(&self, out: &mut Vec<Variable>) {
        let mut current = self;
        while let Some(node) = current.node.as_ref() {
            node.term.collect_variables(out);
            current = &node.next;
        }
    }

    /// Ground every element through the substitution set, following a tail
    /// variable into its continuation list. Fails if a tail variable is
    /// unbound. Used by the list predicates.
    pub fn ground_elements(&self, ss: &SubstitutionSet) -> Option<Vec<Term>> {
        let mut out = Vec::new();
        let mut current = self.clone();
        loop {
            let Some(node) = current.node.clone() else {
                return Some(out);
            };
            if node.tail_var {
                let (ground, ok) = ss.ground_term(&node.term);
                if !ok {
                    return None;
                }
                if let Term::List(cont) = ground {
                    current = cont.clone();
                    continue;
                }
                out.push(ground.clone());
            } else {
                out.push(node.term.clone());
            }
            current = node.next.clone();
        }
    }
}

impl fmt::Display for LinkedList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        let mut first = true;
        let mut current = self;
        while let Some(node) = current.node.as_ref() {
            if node.tail_var {
                write!(f, " | {}", node.term)?;
            } else {
                if !first {
                    write!(f, ", ")?;
                }
                write!(f, "{}", node.term)?;
            }
            first = false;
            current = &node.next;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atoms(names: &[&str]) -> Vec<Term> {
        names.iter().map(|n| Term::atom(n)).collect()
    }

    // ========== CONSTRUCTION TESTS ==========

    #[test]
    fn empty_list_has_no_terms() {
        let l = LinkedList::empty();
        assert!(l.is_empty());
        assert_eq!(l.count(), 0);
        assert!(l.head().is_none());
    }

    #[test]
    fn from_terms_counts_elements() {
        let l = LinkedList::from_terms(false, atoms(&["a", "b", "c"]));
        assert_eq!(l.count(), 3);
        assert_eq!(l.head(), Some(&Term::atom("a")));
    }

    #[test]
    fn from_terms_empty_vec_is_empty_list() {
        let l = LinkedList::from_terms(false, vec![]);
        assert!(l.is_empty());
    }

    #[test]
    fn from_terms_with_tail_variable() {
        let l = LinkedList::from_terms(true, vec![Term::atom("a"), Term::var("$T")]);
        assert_eq!(l.count(), 2);
        assert!(!l.head_is_tail_var());
        let rest = l.tail().unwrap();
        assert!(rest.head_is_tail_var(), "Final node should carry the tail-variable flag");
    }

    #[test]
    fn from_terms_merges_trailing_list() {
        let inner = LinkedList::from_terms(false, atoms(&["c", "d"]));
        let l = LinkedList::from_terms(false, vec![Term::atom("a"), Term::List(inner)]);
        assert_eq!(l.count(), 3);
        assert_eq!(l.to_string(), "[a, c, d]");
    }

    #[test]
    fn from_terms_merges_trailing_empty_list() {
        let l = LinkedList::from_terms(
            false,
            vec![Term::atom("a"), Term::List(LinkedList::empty())],
        );
        assert_eq!(l.count(), 1);
        assert_eq!(l.to_string(), "[a]");
    }

    #[test]
    fn link_front_extends_count() {
        let l = LinkedList::from_terms(false, atoms(&["b", "c"]));
        let l2 = LinkedList::link_front(Term::atom("a"), false, l);
        assert_eq!(l2.count(), 3);
        assert_eq!(l2.to_string(), "[a, b, c]");
    }

    // ========== DISPLAY TESTS ==========

    #[test]
    fn display_empty_list() {
        assert_eq!(LinkedList::empty().to_string(), "[]");
    }

    #[test]
    fn display_plain_list() {
        let l = LinkedList::from_terms(false, atoms(&["red", "green", "blue"]));
        assert_eq!(l.to_string(), "[red, green, blue]");
    }

    #[test]
    fn display_tail_variable_with_bar() {
        let l = LinkedList::from_terms(
            true,
            vec![Term::atom("a"), Term::atom("b"), Term::var("$Z")],
        );
        assert_eq!(l.to_string(), "[a, b | $Z]");
    }

    // ========== EQUALITY TESTS ==========

    #[test]
    fn structural_equality() {
        let a = LinkedList::from_terms(false, atoms(&["x", "y"]));
        let b = LinkedList::from_terms(false, atoms(&["x", "y"]));
        assert_eq!(a, b);
    }

    #[test]
    fn tail_variable_flag_affects_equality() {
        let plain = LinkedList::from_terms(false, vec![Term::atom("a"), Term::var("$X")]);
        let tailed = LinkedList::from_terms(true, vec![Term::atom("a"), Term::var("$X")]);
        assert_ne!(plain, tailed, "[a, $X] and [a | $X] are different lists");
    }

    // ========== FLATTEN TESTS ==========

    #[test]
    fn flatten_splits_head_and_remainder() {
        let l = LinkedList::from_terms(false, atoms(&["a", "b", "c", "d"]));
        let ss = SubstitutionSet::new();
        let parts = l.flatten(2, &ss).expect("flatten should succeed");
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], Term::atom("a"));
        assert_eq!(parts[1], Term::atom("b"));
        match &parts[2] {
            Term::List(rest) => assert_eq!(rest.to_string(), "[c, d]"),
            other => panic!("Expected remainder list, got {:?}", other),
        }
    }

    #[test]
    fn flatten_past_end_fails() {
        let l = LinkedList::from_terms(false, atoms(&["a"]));
        let ss = SubstitutionSet::new();
        assert!(l.flatten(3, &ss).is_none());
    }

    #[test]
    fn flatten_zero_fails() {
        let l = LinkedList::from_terms(false, atoms(&["a"]));
        let ss = SubstitutionSet::new();
        assert!(l.flatten(0, &ss).is_none());
    }

    // ========== RECREATE / REPLACE TESTS ==========

    #[test]
    fn recreate_preserves_tail_variable_flag() {
        let gen = VarGenerator::new();
        let mut vars = VarMap::default();
        let l = LinkedList::from_terms(true, vec![Term::atom("a"), Term::var("$T")]);
        let l2 = l.recreate_variables(&mut vars, &gen);
        assert_eq!(l2.count(), 2);
        assert!(l2.tail().unwrap().head_is_tail_var());
        match l2.tail().unwrap().head() {
            Some(Term::Var(v)) => assert_ne!(v.id, 0),
            other => panic!("Expected renamed variable, got {:?}", other),
        }
    }

    #[test]
    fn replace_splices_bound_tail() {
        let gen = VarGenerator::new();
        let mut vars = VarMap::default();
        let t = Variable::template("$T").recreate(&mut vars, &gen);
        let l = LinkedList::from_terms(true, vec![Term::atom("a"), Term::Var(t)]);
        let rest = LinkedList::from_terms(false, atoms(&["b", "c"]));
        let ss = SubstitutionSet::new().extend(t, Term::List(rest));
        let resolved = l.replace_variables(&ss);
        assert_eq!(resolved.to_string(), "[a, b, c]");
    }

    // ========== GROUND ELEMENTS TESTS ==========

    #[test]
    fn ground_elements_of_plain_list() {
        let l = LinkedList::from_terms(false, atoms(&["a", "b"]));
        let ss = SubstitutionSet::new();
        let elems = l.ground_elements(&ss).expect("grounding should succeed");
        assert_eq!(elems, atoms(&["a", "b"]));
    }

    #[test]
    fn ground_elements_follows_tail_chain() {
        let gen = VarGenerator::new();
        let mut vars = VarMap::default();
        let t = Variable::template("$T").recreate(&mut vars, &gen);
        let l = LinkedList::from_terms(true, vec![Term::atom("a"), Term::Var(t)]);
        let cont = LinkedList::from_terms(false, atoms(&["b", "c"]));
        let ss = SubstitutionSet::new().extend(t, Term::List(cont));
        let elems = l.ground_elements(&ss).expect("grounding should succeed");
        assert_eq!(elems, atoms(&["a", "b", "c"]));
    }

    #[test]
    fn ground_elements_fails_on_unbound_tail() {
        let l = LinkedList::from_terms(
            true,
            vec![Term::atom("a"), Term::Var(Variable { name: crate::symbol::Symbol::intern("$T"), id: 7 })],
        );
        let ss = SubstitutionSet::new();
        assert!(l.ground_elements(&ss).is_none());
    }
}
