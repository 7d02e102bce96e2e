//! The `join` function: concatenates atoms into a single atom.
//!
//! Words are separated by single spaces, but the punctuation atoms
//! `,` `.` `?` `!` attach directly to the preceding word. Useful when
//! assembling sentences from word lists:
//!
//! `join(cats, eat, fish, .)` evaluates to the atom `cats eat fish.`

use crate::solve::SolveError;
use crate::subst::SubstitutionSet;
use crate::symbol::Symbol;
use crate::term::Term;

fn is_attached_punctuation(s: &str) -> bool {
    matches!(s, "," | "." | "?" | "!")
}

/// Evaluate `join` over its arguments. Every argument must resolve to an
/// atom through the substitution set.
pub fn join(args: &[Term], ss: &SubstitutionSet) -> Result<Term, SolveError> {
    if args.len() < 2 {
        return Err(SolveError::WrongArity { op: "join", expected: 2, found: args.len() });
    }

    let mut out = String::new();
    for (n, arg) in args.iter().enumerate() {
        let Some(atom) = ss.cast_atom(arg) else {
            return Err(SolveError::NotAtom { op: "join", term: arg.to_string() });
        };
        let word = atom.as_str();
        if n > 0 && !is_attached_punctuation(word) {
            out.push(' ');
        }
        out.push_str(word);
    }

    Ok(Term::Atom(Symbol::intern(&out)))
}
