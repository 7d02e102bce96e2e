//! Output predicates: `print`, `print_list`, `nl`.
//!
//! All output goes to the sink carried in the solve context; the engine
//! itself never touches stdout. Each predicate succeeds at most once and
//! never binds anything.

use crate::list::LinkedList;
use crate::solve::{SolveContext, SolveError};
use crate::subst::SubstitutionSet;
use crate::term::Term;
use std::io::Write;

const FORMAT_SPECIFIER: &str = "%s";

/// Resolve a term for printing. Unbound variables print as themselves.
fn ground_for_print<'a>(term: &'a Term, ss: &'a SubstitutionSet) -> &'a Term {
    if let Term::Var(v) = term {
        if ss.is_ground_variable(v) {
            let (ground, _) = ss.ground_term(term);
            return ground;
        }
    }
    term
}

/// `print/*`: when the first argument is an atom containing `%s`, it is a
/// format string and subsequent arguments substitute for each specifier.
/// Otherwise all arguments print comma-separated. No trailing newline;
/// use `nl`.
pub fn print(
    args: &[Term],
    ss: &SubstitutionSet,
    ctx: &SolveContext,
) -> Result<Option<SubstitutionSet>, SolveError> {
    if args.is_empty() {
        return Ok(None);
    }

    let first = ground_for_print(&args[0], ss).to_string();
    let mut out = ctx.out.lock();

    if first.contains(FORMAT_SPECIFIER) {
        let mut next_arg = 1;
        let mut rest = first.as_str();
        while let Some(at) = rest.find(FORMAT_SPECIFIER) {
            let _ = write!(out, "{}", &rest[..at]);
            if next_arg < args.len() {
                let _ = write!(out, "{}", ground_for_print(&args[next_arg], ss));
                next_arg += 1;
            } else {
                let _ = write!(out, "{}", FORMAT_SPECIFIER);
            }
            rest = &rest[at + FORMAT_SPECIFIER.len()..];
        }
        let _ = write!(out, "{}", rest);
    } else {
        let _ = write!(out, "{}", first);
        for arg in &args[1..] {
            let _ = write!(out, ", {}", ground_for_print(arg, ss));
        }
    }

    Ok(Some(ss.clone()))
}

/// `print_list/*`: for each argument that resolves to a list, print its
/// ground elements comma-separated, following tail-variable chains into
/// continuation lists, then a newline.
pub fn print_list(
    args: &[Term],
    ss: &SubstitutionSet,
    ctx: &SolveContext,
) -> Result<Option<SubstitutionSet>, SolveError> {
    if args.is_empty() {
        return Ok(None);
    }

    let mut out = ctx.out.lock();
    for arg in args {
        let (ground, ok) = ss.ground_term(arg);
        if !ok {
            continue;
        }
        if let Term::List(list) = ground {
            show_list(list, ss, &mut **out);
        }
    }
    Ok(Some(ss.clone()))
}

fn show_list(list: &LinkedList, ss: &SubstitutionSet, out: &mut dyn Write) {
    let mut first = true;
    let mut current = list.clone();
    while let Some(head) = current.head().cloned() {
        let resolved = ss.ground_term(&head);
        let mut ground = resolved.0.clone();
        let mut ok = resolved.1;
        if ok && current.head_is_tail_var() {
            if let Term::List(cont) = &ground {
                // A tail variable bound to a list continues there.
                current = cont.clone();
                match current.head().cloned() {
                    Some(cont_head) => {
                        let resolved = ss.ground_term(&cont_head);
                        ground = resolved.0.clone();
                        ok = resolved.1;
                    }
                    None => break,
                }
            }
        }
        if ok {
            if !first {
                let _ = write!(out, ", ");
            }
            first = false;
            let _ = write!(out, "{}", ground);
        }
        let next = current.tail().cloned().unwrap_or_else(LinkedList::empty);
        current = next;
    }
    let _ = writeln!(out);
}

/// `nl`: write a line separator; succeeds once.
pub fn newline(
    ss: &SubstitutionSet,
    ctx: &SolveContext,
) -> Result<Option<SubstitutionSet>, SolveError> {
    let mut out = ctx.out.lock();
    let _ = writeln!(out);
    Ok(Some(ss.clone()))
}
