//! List predicates: `append`, `count`, `include`, `exclude`.

use crate::list::LinkedList;
use crate::solve::SolveError;
use crate::subst::SubstitutionSet;
use crate::term::Term;
use crate::unify::unify;

/// `append/n` (n >= 2): flatten the first n-1 arguments into a new list
/// and unify it with the last argument. Atoms, numbers and complex terms
/// are appended as single items; lists are spliced element by element.
/// Unbound variables contribute nothing.
pub fn append(args: &[Term], ss: &SubstitutionSet) -> Result<Option<SubstitutionSet>, SolveError> {
    if args.len() < 2 {
        return Ok(None);
    }

    let mut items: Vec<Term> = Vec::new();
    for arg in &args[..args.len() - 1] {
        let term = match arg {
            Term::Var(v) if ss.is_ground_variable(v) => {
                let (ground, _) = ss.ground_term(arg);
                ground.clone()
            }
            other => other.clone(),
        };
        match term {
            Term::Atom(_) | Term::Integer(_) | Term::Float(_) | Term::Complex(_) => {
                items.push(term);
            }
            Term::List(list) => {
                let mut current = &list;
                while let Some(head) = current.head() {
                    items.push(head.clone());
                    match current.tail() {
                        Some(rest) => current = rest,
                        None => break,
                    }
                }
            }
            // Unbound variables and other kinds are skipped.
            _ => {}
        }
    }

    let out = LinkedList::from_terms(false, items);
    unify(&args[args.len() - 1], &Term::List(out), ss)
}

/// `count/2`: count the items of a list, following tail-variable bindings
/// into their continuation lists. An unbound tail variable counts as one
/// item. The count unifies with the second argument.
pub fn count(args: &[Term], ss: &SubstitutionSet) -> Result<Option<SubstitutionSet>, SolveError> {
    let Some(list) = ss.cast_list(&args[0]) else {
        return Ok(None);
    };

    let mut total: i64 = 0;
    let mut current = list.clone();
    loop {
        let Some(head) = current.head().cloned() else {
            break;
        };
        if current.head_is_tail_var() {
            let (ground, ok) = ss.ground_term(&head);
            if !ok {
                return Ok(None);
            }
            if let Term::List(cont) = ground {
                current = cont.clone();
                continue;
            }
            total += 1;
        } else {
            total += 1;
        }
        let next = current.tail().cloned().unwrap_or_else(LinkedList::empty);
        current = next;
    }

    unify(&args[1], &Term::Integer(total), ss)
}

/// Does the filter pattern unify with the term? Probe bindings are
/// discarded; only the yes/no answer matters.
fn passes(
    filter: &Term,
    term: &Term,
    ss: &SubstitutionSet,
) -> Result<bool, SolveError> {
    Ok(unify(filter, term, ss)?.is_some())
}

/// `include/3` and `exclude/3`: filter a list by unifiability with a
/// filter pattern. `keep` selects which side of the test survives. The
/// filtered list unifies with the third argument.
pub fn filter(
    args: &[Term],
    ss: &SubstitutionSet,
    keep: bool,
) -> Result<Option<SubstitutionSet>, SolveError> {
    let filter_term = &args[0];
    let Some(input) = ss.cast_list(&args[1]) else {
        return Ok(None);
    };

    let mut out: Vec<Term> = Vec::new();
    let mut current = input.clone();
    loop {
        let Some(head) = current.head().cloned() else {
            break;
        };
        if current.head_is_tail_var() {
            let (ground, ok) = ss.ground_term(&head);
            if !ok {
                return Ok(None);
            }
            if let Term::List(cont) = ground {
                current = cont.clone();
                continue;
            }
            let ground = ground.clone();
            if passes(filter_term, &ground, ss)? == keep {
                out.push(ground);
            }
        } else if passes(filter_term, &head, ss)? == keep {
            out.push(head);
        }
        let next = current.tail().cloned().unwrap_or_else(LinkedList::empty);
        current = next;
    }

    let out_list = LinkedList::from_terms(false, out);
    unify(&args[2], &Term::List(out_list), ss)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::Symbol;
    use crate::term::{Complex, VarGenerator, Variable};

    fn var(name: &str, gen: &VarGenerator) -> Variable {
        Variable { name: Symbol::intern(name), id: gen.fresh() }
    }

    fn list_of(terms: Vec<Term>) -> Term {
        Term::List(LinkedList::from_terms(false, terms))
    }

    fn complex(functor: &str, args: Vec<Term>) -> Term {
        Term::Complex(Complex::new(Symbol::intern(functor), args))
    }

    // ========== APPEND ==========

    #[test]
    fn append_flattens_atoms_and_lists() {
        let gen = VarGenerator::new();
        let out = var("$Out", &gen);
        let ss = SubstitutionSet::new();
        let args = vec![
            Term::atom("red"),
            Term::atom("orange"),
            list_of(vec![Term::atom("green"), Term::atom("blue"), Term::atom("purple")]),
            Term::Var(out),
        ];
        let result = append(&args, &ss).unwrap().expect("append should succeed");
        match result.binding(&out) {
            Some(Term::List(l)) => {
                assert_eq!(l.to_string(), "[red, orange, green, blue, purple]")
            }
            other => panic!("Expected list, got {:?}", other),
        }
    }

    #[test]
    fn append_accepts_numbers_and_complex_terms() {
        let gen = VarGenerator::new();
        let out = var("$Out", &gen);
        let ss = SubstitutionSet::new();
        let args = vec![
            Term::Integer(1),
            Term::Float(2.5),
            complex("f", vec![Term::atom("a")]),
            Term::Var(out),
        ];
        let result = append(&args, &ss).unwrap().unwrap();
        match result.binding(&out) {
            Some(Term::List(l)) => assert_eq!(l.to_string(), "[1, 2.5, f(a)]"),
            other => panic!("Expected list, got {:?}", other),
        }
    }

    #[test]
    fn append_skips_unbound_variables() {
        let gen = VarGenerator::new();
        let loose = var("$Loose", &gen);
        let out = var("$Out", &gen);
        let ss = SubstitutionSet::new();
        let args = vec![Term::atom("a"), Term::Var(loose), Term::atom("b"), Term::Var(out)];
        let result = append(&args, &ss).unwrap().unwrap();
        match result.binding(&out) {
            Some(Term::List(l)) => assert_eq!(l.to_string(), "[a, b]"),
            other => panic!("Expected list, got {:?}", other),
        }
    }

    #[test]
    fn append_resolves_bound_variables() {
        let gen = VarGenerator::new();
        let x = var("$X", &gen);
        let out = var("$Out", &gen);
        let ss = SubstitutionSet::new()
            .extend(x, list_of(vec![Term::atom("p"), Term::atom("q")]));
        let args = vec![Term::Var(x), Term::atom("r"), Term::Var(out)];
        let result = append(&args, &ss).unwrap().unwrap();
        match result.binding(&out) {
            Some(Term::List(l)) => assert_eq!(l.to_string(), "[p, q, r]"),
            other => panic!("Expected list, got {:?}", other),
        }
    }

    #[test]
    fn append_fails_against_mismatched_output() {
        let ss = SubstitutionSet::new();
        let args = vec![Term::atom("a"), list_of(vec![Term::atom("b")])];
        let result = append(&args, &ss).unwrap();
        assert!(result.is_none(), "[a] does not unify with [b]");
    }

    #[test]
    fn append_needs_two_arguments() {
        let ss = SubstitutionSet::new();
        assert!(append(&[Term::atom("a")], &ss).unwrap().is_none());
    }

    // ========== COUNT ==========

    #[test]
    fn count_plain_list() {
        let gen = VarGenerator::new();
        let n = var("$N", &gen);
        let ss = SubstitutionSet::new();
        let args = vec![
            list_of(vec![Term::atom("a"), Term::atom("b"), Term::atom("c")]),
            Term::Var(n),
        ];
        let result = count(&args, &ss).unwrap().unwrap();
        assert_eq!(result.binding(&n), Some(&Term::Integer(3)));
    }

    #[test]
    fn count_empty_list_is_zero() {
        let gen = VarGenerator::new();
        let n = var("$N", &gen);
        let ss = SubstitutionSet::new();
        let args = vec![list_of(vec![]), Term::Var(n)];
        let result = count(&args, &ss).unwrap().unwrap();
        assert_eq!(result.binding(&n), Some(&Term::Integer(0)));
    }

    #[test]
    fn count_follows_bound_tail_variable() {
        let gen = VarGenerator::new();
        let t = var("$T", &gen);
        let n = var("$N", &gen);
        let ss = SubstitutionSet::new()
            .extend(t, list_of(vec![Term::atom("c"), Term::atom("d")]));
        let head = Term::List(LinkedList::from_terms(
            true,
            vec![Term::atom("a"), Term::atom("b"), Term::Var(t)],
        ));
        let result = count(&[head, Term::Var(n)], &ss).unwrap().unwrap();
        assert_eq!(result.binding(&n), Some(&Term::Integer(4)));
    }

    #[test]
    fn count_fails_on_unbound_tail_variable() {
        let gen = VarGenerator::new();
        let t = var("$T", &gen);
        let n = var("$N", &gen);
        let ss = SubstitutionSet::new();
        let head = Term::List(LinkedList::from_terms(true, vec![Term::atom("a"), Term::Var(t)]));
        assert!(count(&[head, Term::Var(n)], &ss).unwrap().is_none());
    }

    #[test]
    fn count_fails_on_non_list() {
        let gen = VarGenerator::new();
        let n = var("$N", &gen);
        let ss = SubstitutionSet::new();
        assert!(count(&[Term::atom("a"), Term::Var(n)], &ss).unwrap().is_none());
    }

    // ========== INCLUDE / EXCLUDE ==========

    fn people() -> Term {
        list_of(vec![
            complex("male", vec![Term::atom("a")]),
            complex("female", vec![Term::atom("b")]),
            complex("male", vec![Term::atom("c")]),
            complex("female", vec![Term::atom("d")]),
        ])
    }

    #[test]
    fn include_keeps_matching_terms() {
        let gen = VarGenerator::new();
        let w = var("$W", &gen);
        let ss = SubstitutionSet::new();
        let pattern = complex("female", vec![Term::Anonymous]);
        let result = filter(&[pattern, people(), Term::Var(w)], &ss, true)
            .unwrap()
            .unwrap();
        match result.binding(&w) {
            Some(Term::List(l)) => assert_eq!(l.to_string(), "[female(b), female(d)]"),
            other => panic!("Expected list, got {:?}", other),
        }
    }

    #[test]
    fn exclude_drops_matching_terms() {
        let gen = VarGenerator::new();
        let m = var("$M", &gen);
        let ss = SubstitutionSet::new();
        let pattern = complex("female", vec![Term::Anonymous]);
        let result = filter(&[pattern, people(), Term::Var(m)], &ss, false)
            .unwrap()
            .unwrap();
        match result.binding(&m) {
            Some(Term::List(l)) => assert_eq!(l.to_string(), "[male(a), male(c)]"),
            other => panic!("Expected list, got {:?}", other),
        }
    }

    #[test]
    fn filter_probe_bindings_are_discarded() {
        let gen = VarGenerator::new();
        let w = var("$W", &gen);
        let ss = SubstitutionSet::new();
        // A variable pattern unifies with everything; the probe must not
        // leave it bound in the result set.
        let x = var("$X", &gen);
        let pattern = complex("male", vec![Term::Var(x)]);
        let result = filter(&[pattern, people(), Term::Var(w)], &ss, true)
            .unwrap()
            .unwrap();
        assert!(!result.is_bound(&x), "Probe bindings must not leak");
        match result.binding(&w) {
            Some(Term::List(l)) => assert_eq!(l.to_string(), "[male(a), male(c)]"),
            other => panic!("Expected list, got {:?}", other),
        }
    }

    #[test]
    fn filter_fails_on_non_list_input() {
        let gen = VarGenerator::new();
        let w = var("$W", &gen);
        let ss = SubstitutionSet::new();
        let pattern = complex("female", vec![Term::Anonymous]);
        let result = filter(&[pattern, Term::atom("not_a_list"), Term::Var(w)], &ss, true).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn filter_input_via_bound_variable() {
        let gen = VarGenerator::new();
        let p = var("$People", &gen);
        let w = var("$W", &gen);
        let ss = SubstitutionSet::new().extend(p, people());
        let pattern = complex("female", vec![Term::Anonymous]);
        let result = filter(&[pattern, Term::Var(p), Term::Var(w)], &ss, true)
            .unwrap()
            .unwrap();
        match result.binding(&w) {
            Some(Term::List(l)) => assert_eq!(l.to_string(), "[female(b), female(d)]"),
            other => panic!("Expected list, got {:?}", other),
        }
    }
}
