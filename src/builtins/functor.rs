//! The `functor` predicate: decomposes a complex term.
//!
//! `functor(boss(Jack), $F)` binds `$F` to the atom `boss`.
//! `functor(boss(Jack), $F, $A)` also binds `$A` to the arity 1.
//! A name argument ending in `*` prefix-matches the functor:
//! `functor(noun_phrase(...), noun*)` succeeds.

use crate::solve::SolveError;
use crate::subst::SubstitutionSet;
use crate::term::Term;
use crate::unify::unify;

/// Evaluate `functor/2` or `functor/3`.
pub fn solve(args: &[Term], ss: &SubstitutionSet) -> Result<Option<SubstitutionSet>, SolveError> {
    if args.len() < 2 || args.len() > 3 {
        return Err(SolveError::WrongArity {
            op: "functor",
            expected: 2,
            found: args.len(),
        });
    }

    let Some(complex) = ss.cast_complex(&args[0]) else {
        return Ok(None);
    };
    let functor = complex.functor;
    let arity = complex.arity() as i64;

    let after_name = match &args[1] {
        // An atom name matches directly; a trailing `*` is a prefix match.
        Term::Atom(name) => {
            let pattern = name.as_str();
            let matched = match pattern.strip_suffix('*') {
                Some(prefix) => functor.as_str().starts_with(prefix),
                None => functor.as_str() == pattern,
            };
            if !matched {
                return Ok(None);
            }
            ss.clone()
        }
        other => match unify(other, &Term::Atom(functor), ss)? {
            Some(next) => next,
            None => return Ok(None),
        },
    };

    if args.len() == 3 {
        return unify(&args[2], &Term::Integer(arity), &after_name);
    }
    Ok(Some(after_name))
}
