//! Bidirectional mapping between tracked (trie node, state) pairs and literals.

use std::collections::HashMap;
use std::fmt;

use crate::dawg::DawgId;
use crate::fsm::StateId;
use crate::types::{Lit, Var};

/// The proposition "some string of the trie rooted at `node` ends in `state`".
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TrackedPair {
    pub node: DawgId,
    pub state: StateId,
}

impl fmt::Display for TrackedPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, s{})", self.node, self.state)
    }
}

/// Append-only registry of acceptance literals.
///
/// # Invariants
///
/// - Every registered literal is positive and maps to exactly one pair, and vice versa.
/// - Entries are never removed.
#[derive(Debug, Default)]
pub struct Registry {
    lits: Vec<Lit>,
    forward: HashMap<TrackedPair, Lit>,
    reverse: HashMap<Var, TrackedPair>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lits.is_empty()
    }

    /// Registered literals in creation order.
    pub fn lits(&self) -> &[Lit] {
        &self.lits
    }

    pub fn lit(&self, pair: TrackedPair) -> Option<Lit> {
        self.forward.get(&pair).copied()
    }

    pub fn pair(&self, var: Var) -> Option<TrackedPair> {
        self.reverse.get(&var).copied()
    }

    pub fn contains_var(&self, var: Var) -> bool {
        self.reverse.contains_key(&var)
    }

    /// Binds a fresh literal to an unbound pair.
    ///
    /// # Panics
    ///
    /// Panics if the pair or the literal's variable is already bound.
    pub fn insert(&mut self, pair: TrackedPair, lit: Lit) {
        assert!(lit.is_positive(), "Acceptance literals are positive");
        assert!(
            !self.forward.contains_key(&pair),
            "Pair {} is already bound",
            pair
        );
        let previous = self.reverse.insert(lit.var(), pair);
        assert!(previous.is_none(), "Variable {} is already bound", lit.var());
        self.forward.insert(pair, lit);
        self.lits.push(lit);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Lit, TrackedPair)> + '_ {
        self.lits.iter().map(|&lit| (lit, self.reverse[&lit.var()]))
    }
}
