use lasso::{Spur, ThreadedRodeo};
use std::fmt;
use std::sync::OnceLock;

/// Process-wide interner for atom and functor names.
///
/// Terms store `Symbol` keys instead of strings, so equality checks are a
/// single integer comparison and cloned terms stay cheap. The store only
/// grows; entries live for the lifetime of the process.
fn store() -> &'static ThreadedRodeo {
    static STORE: OnceLock<ThreadedRodeo> = OnceLock::new();
    STORE.get_or_init(ThreadedRodeo::new)
}

/// An interned atom or functor name.
///
/// Guarantees:
/// - Same string always produces the same Symbol
/// - Different strings always produce different Symbols
/// - A Symbol can be resolved back to its original string
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol(Spur);

impl Symbol {
    /// Intern a name, returning its unique Symbol.
    /// If the name was already interned, returns the existing Symbol.
    pub fn intern(name: &str) -> Symbol {
        Symbol(store().get_or_intern(name))
    }

    /// Resolve this Symbol back to its string representation.
    pub fn as_str(self) -> &'static str {
        store().resolve(&self.0)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.as_str())
    }
}
