//! Nondeterministic finite automaton with assignment-gated transitions.
//!
//! Every edge carries one slot per alphabet label. A slot holds a three-valued
//! [`LBool`]: `False` means the transition is absent, `True` means it is
//! present, and `Undef` means the search has not decided it yet. The engine
//! owns the automaton and writes slots as transition variables are assigned
//! or unassigned; the theory only ever reads it through a [`View`].
//!
//! When epsilon moves are enabled, label [`EPSILON`] (`0`) is reserved for
//! them and string symbols start at `1`.

use std::fmt;

use crate::types::LBool;

pub type StateId = usize;
pub type EdgeId = usize;
pub type Label = usize;

/// The label reserved for epsilon moves, when the automaton supports them.
pub const EPSILON: Label = 0;

/// A lens over the automaton deciding which slots count as enabled.
///
/// `Over` is the optimistic view (anything not yet ruled out), `Under` the
/// pessimistic one (only what is already committed). Under-enabled always
/// implies Over-enabled.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum View {
    Under,
    Over,
}

impl View {
    pub fn enables(self, value: LBool) -> bool {
        match self {
            View::Under => value == LBool::True,
            View::Over => value != LBool::False,
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Under => write!(f, "under"),
            View::Over => write!(f, "over"),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Edge {
    pub id: EdgeId,
    pub from: StateId,
    pub to: StateId,
}

/// One (edge, label) slot, i.e. a single labelled transition.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Transition {
    pub edge: EdgeId,
    pub label: Label,
}

impl Transition {
    pub fn new(edge: EdgeId, label: Label) -> Self {
        Self { edge, label }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}:{}", self.edge, self.label)
    }
}

/// A logged slot mutation.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SlotChange {
    pub transition: Transition,
    pub old: LBool,
    pub new: LBool,
}

#[derive(Debug, Clone)]
pub struct DynamicFsm {
    alphabet: usize,
    emoves: bool,
    edges: Vec<Edge>,
    outgoing: Vec<Vec<EdgeId>>,
    incoming: Vec<Vec<EdgeId>>,
    /// Slot values, `alphabet` consecutive entries per edge.
    slots: Vec<LBool>,
    version: u64,
    structure_version: u64,
    history: Vec<SlotChange>,
}

impl DynamicFsm {
    /// Creates an automaton with no states over `alphabet` labels.
    ///
    /// # Panics
    ///
    /// Panics if `alphabet == 0`.
    pub fn new(alphabet: usize, emoves: bool) -> Self {
        assert!(alphabet > 0, "Alphabet must not be empty");
        Self {
            alphabet,
            emoves,
            edges: Vec::new(),
            outgoing: Vec::new(),
            incoming: Vec::new(),
            slots: Vec::new(),
            version: 0,
            structure_version: 0,
            history: Vec::new(),
        }
    }

    pub fn add_state(&mut self) -> StateId {
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        self.version += 1;
        self.structure_version += 1;
        self.outgoing.len() - 1
    }

    /// Adds an edge with all of its label slots absent (`False`).
    pub fn add_edge(&mut self, from: StateId, to: StateId) -> EdgeId {
        assert!(from < self.states(), "Unknown state {}", from);
        assert!(to < self.states(), "Unknown state {}", to);
        let id = self.edges.len();
        self.edges.push(Edge { id, from, to });
        self.outgoing[from].push(id);
        self.incoming[to].push(id);
        self.slots.resize(self.slots.len() + self.alphabet, LBool::False);
        self.version += 1;
        self.structure_version += 1;
        id
    }

    pub fn states(&self) -> usize {
        self.outgoing.len()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge(&self, id: EdgeId) -> Edge {
        self.edges[id]
    }

    pub fn alphabet(&self) -> usize {
        self.alphabet
    }

    pub fn emoves_enabled(&self) -> bool {
        self.emoves
    }

    pub fn outgoing(&self, state: StateId) -> &[EdgeId] {
        &self.outgoing[state]
    }

    pub fn incoming(&self, state: StateId) -> &[EdgeId] {
        &self.incoming[state]
    }

    /// Bumped on every mutation, structural or not.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Bumped only when states or edges are added.
    pub fn structure_version(&self) -> u64 {
        self.structure_version
    }

    fn slot(&self, edge: EdgeId, label: Label) -> usize {
        debug_assert!(label < self.alphabet, "Label {} out of alphabet", label);
        edge * self.alphabet + label
    }

    pub fn value(&self, edge: EdgeId, label: Label) -> LBool {
        self.slots[self.slot(edge, label)]
    }

    pub fn enabled(&self, view: View, edge: EdgeId, label: Label) -> bool {
        view.enables(self.value(edge, label))
    }

    /// Writes a slot, logging the change if the value actually moves.
    pub fn set_value(&mut self, edge: EdgeId, label: Label, value: LBool) {
        let slot = self.slot(edge, label);
        let old = self.slots[slot];
        if old == value {
            return;
        }
        self.slots[slot] = value;
        self.version += 1;
        self.history.push(SlotChange {
            transition: Transition::new(edge, label),
            old,
            new: value,
        });
    }

    /// Length of the change history, usable as a cursor for [`changes_since`][Self::changes_since].
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn changes_since(&self, cursor: usize) -> &[SlotChange] {
        &self.history[cursor.min(self.history.len())..]
    }

    /// Number of enabled (outgoing edge, label) slots at `state` under `view`.
    pub fn count_enabled_outgoing(&self, view: View, state: StateId) -> usize {
        self.outgoing[state]
            .iter()
            .map(|&e| {
                (0..self.alphabet)
                    .filter(|&l| self.enabled(view, e, l))
                    .count()
            })
            .sum()
    }
}
