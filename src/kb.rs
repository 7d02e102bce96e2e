//! The knowledge base: a dictionary of rules and facts.
//!
//! Rules are indexed by a key built from the functor and arity of the
//! head. For the fact `mother(Carla, Caitlyn)` the key is `mother/2`.
//! Within a key, insertion order is the search order for resolution.

use crate::goal::Rule;
use crate::solve::QueryTimer;
use crate::symbol::Symbol;
use crate::term::{Complex, VarGenerator, VarMap};
use hashbrown::HashMap;
use std::fmt;

/// A functor/arity pair, e.g. `loves/2`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Key {
    pub functor: Symbol,
    pub arity: usize,
}

impl Key {
    pub fn of(head: &Complex) -> Key {
        Key { functor: head.functor, arity: head.arity() }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.functor, self.arity)
    }
}

/// Rules and facts, indexed by functor/arity.
#[derive(Debug, Default)]
pub struct KnowledgeBase {
    rules: HashMap<Key, Vec<Rule>>,
}

impl KnowledgeBase {
    pub fn new() -> KnowledgeBase {
        KnowledgeBase { rules: HashMap::new() }
    }

    /// Append a rule or fact under its head's key.
    pub fn add(&mut self, rule: Rule) {
        let key = Key::of(&rule.head);
        self.rules.entry(key).or_default().push(rule);
    }

    /// Number of rules matching the goal's key.
    ///
    /// Once the query timer has expired this reports 0, which reads as
    /// "all rules exhausted" to the resolver and unwinds the proof tree
    /// cooperatively.
    pub fn rule_count(&self, goal: &Complex, timer: &QueryTimer) -> usize {
        if timer.expired() {
            return 0;
        }
        self.rules.get(&Key::of(goal)).map_or(0, |list| list.len())
    }

    /// Fetch the rule at `index` for the goal's key, with every variable
    /// renamed to a fresh id. Head and body share one renaming map, so
    /// variables spanning both stay consistent.
    pub fn get_rule(&self, goal: &Complex, index: usize, gen: &VarGenerator) -> Option<Rule> {
        let list = self.rules.get(&Key::of(goal))?;
        let rule = list.get(index)?;
        let mut vars = VarMap::default();
        Some(rule.recreate_variables(&mut vars, gen))
    }

    /// Total number of stored rules, across all keys.
    pub fn len(&self) -> usize {
        self.rules.values().map(|list| list.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Format the contents for diagnostics, keys sorted.
    pub fn format_kb(&self) -> String {
        let mut out = String::from("\n########## Contents of Knowledge Base ##########\n");
        let mut keys: Vec<&Key> = self.rules.keys().collect();
        keys.sort_by_key(|k| (k.functor.as_str(), k.arity));
        for key in keys {
            out.push_str(&key.to_string());
            out.push('\n');
            for rule in &self.rules[key] {
                out.push_str("    ");
                out.push_str(&rule.to_string());
                out.push('\n');
            }
        }
        out
    }
}
