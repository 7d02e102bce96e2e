//! Robinson unification over the term sum type.
//!
//! `unify` attempts to make two terms structurally equal by extending the
//! substitution set with variable bindings. There is no occurs check; the
//! engine accepts the (remote) possibility of cyclic terms in exchange for
//! not paying for the check on every binding.

use crate::list::LinkedList;
use crate::solve::SolveError;
use crate::subst::SubstitutionSet;
use crate::term::{Complex, Term, Variable};

#[cfg(feature = "tracing")]
use crate::trace::trace;

/// Unify two terms against a substitution set.
///
/// `Ok(Some(ss))` carries the extended set on success, `Ok(None)` reports
/// that the terms do not unify, and `Err` carries a semantic error raised
/// while evaluating a function term (e.g. arithmetic on an unbound
/// variable).
pub fn unify(
    t1: &Term,
    t2: &Term,
    ss: &SubstitutionSet,
) -> Result<Option<SubstitutionSet>, SolveError> {
    match (t1, t2) {
        // The anonymous variable unifies with anything and binds nothing.
        (Term::Anonymous, _) | (_, Term::Anonymous) => Ok(Some(ss.clone())),

        // A function term evaluates first; its value is then unified.
        (Term::Function(f), other) => {
            let value = f.eval(ss)?;
            unify(&value, other, ss)
        }
        (other, Term::Function(f)) => {
            let value = f.eval(ss)?;
            unify(other, &value, ss)
        }

        (Term::Var(v), other) => unify_variable(v, other, ss),
        (other, Term::Var(v)) => unify_variable(v, other, ss),

        (Term::Atom(a), Term::Atom(b)) => Ok((a == b).then(|| ss.clone())),
        (Term::Integer(a), Term::Integer(b)) => Ok((a == b).then(|| ss.clone())),
        (Term::Float(a), Term::Float(b)) => Ok((a == b).then(|| ss.clone())),

        (Term::Complex(a), Term::Complex(b)) => unify_complex(a, b, ss),
        (Term::List(a), Term::List(b)) => unify_lists(a, b, ss),

        // Cross-kind pairs never unify; Integer 5 is not Float 5.0.
        _ => Ok(None),
    }
}

/// Unify a variable with a term.
fn unify_variable(
    v: &Variable,
    other: &Term,
    ss: &SubstitutionSet,
) -> Result<Option<SubstitutionSet>, SolveError> {
    // The parser creates variables with an id of 0; they are recreated
    // with unique ids when a goal is made or a rule is fetched. A template
    // variable here would corrupt the substitution set index.
    if v.id == 0 {
        #[cfg(feature = "tracing")]
        trace!(var = %v.name, "unify_rejected_template_variable");
        return Ok(None);
    }

    // A variable unifies with itself without a binding.
    if let Term::Var(o) = other {
        if o.id == v.id {
            return Ok(Some(ss.clone()));
        }
    }

    if let Some(bound) = ss.binding(v) {
        let bound = bound.clone();
        return unify(&bound, other, ss);
    }

    Ok(Some(ss.extend(*v, other.clone())))
}

/// Unify two complex terms: functors equal, arities equal, arguments
/// unify pairwise in order. Aborts on the first failing pair.
pub(crate) fn unify_complex(
    a: &Complex,
    b: &Complex,
    ss: &SubstitutionSet,
) -> Result<Option<SubstitutionSet>, SolveError> {
    if a.functor != b.functor || a.args.len() != b.args.len() {
        return Ok(None);
    }
    let mut new_ss = ss.clone();
    for (x, y) in a.args.iter().zip(&b.args) {
        if matches!(x, Term::Anonymous) || matches!(y, Term::Anonymous) {
            continue;
        }
        match unify(x, y, &new_ss)? {
            Some(next) => new_ss = next,
            None => return Ok(None),
        }
    }
    Ok(Some(new_ss))
}

/// Unify two linked lists element-wise. A tail variable on either side
/// unifies with the remainder of the other list, which may be empty.
fn unify_lists(
    a: &LinkedList,
    b: &LinkedList,
    ss: &SubstitutionSet,
) -> Result<Option<SubstitutionSet>, SolveError> {
    let mut this = a;
    let mut other = b;
    let mut new_ss = ss.clone();
    loop {
        match (this.head(), other.head()) {
            // Both lists exhausted together.
            (None, None) => return Ok(Some(new_ss)),

            (Some(x), Some(y)) => {
                let this_tail = this.head_is_tail_var();
                let other_tail = other.head_is_tail_var();
                if this_tail && other_tail {
                    if matches!(x, Term::Anonymous) || matches!(y, Term::Anonymous) {
                        return Ok(Some(new_ss));
                    }
                    return unify(x, y, &new_ss);
                }
                if this_tail {
                    return unify(x, &Term::List(other.clone()), &new_ss);
                }
                if other_tail {
                    return unify(y, &Term::List(this.clone()), &new_ss);
                }
                match unify(x, y, &new_ss)? {
                    Some(next) => new_ss = next,
                    None => return Ok(None),
                }
                // Both heads matched; both lists are non-empty, so both
                // tails exist.
                match (this.tail(), other.tail()) {
                    (Some(t), Some(o)) => {
                        this = t;
                        other = o;
                    }
                    _ => return Ok(None),
                }
            }

            // A tail variable absorbs the remainder of the other list,
            // including the empty remainder.
            (Some(x), None) if this.head_is_tail_var() => {
                return unify(x, &Term::List(LinkedList::empty()), &new_ss);
            }
            (None, Some(y)) if other.head_is_tail_var() => {
                return unify(y, &Term::List(LinkedList::empty()), &new_ss);
            }

            // One list ran out of terms before the other.
            _ => return Ok(None),
        }
    }
}
