//! Contract between the acceptance theory and the base search engine.
//!
//! | Trait | Direction | Purpose |
//! |-------|-----------|---------|
//! | [`Engine`] | consumed by the theory | variables, truth values, decision levels, implications, transition literals, the automaton |
//! | [`Theory`] | exposed to the engine | propagation, reasons, decisions, backtracking, final check |
//!
//! The automaton is owned by the engine: it writes transition slots as it
//! assigns and unassigns transition variables, and the theory reads it
//! through [`Engine::fsm`].
//!
//! Two literal spaces meet here. Literals from [`Engine::new_var`] are
//! theory-local and cross into the engine through [`Engine::to_solver`];
//! everything else (values, implications, reasons, transition variables,
//! external literals) lives in the engine's space. Literals the engine hands
//! back to the theory come home through [`Engine::from_solver`].
//!
//! [`BasicEngine`] is a small reference implementation (trail, clause store,
//! chronological backtracking) used to drive the theory in tests and demos.

mod basic;

use std::fmt;

pub use basic::{BasicEngine, Reason};

use crate::fsm::{DynamicFsm, Transition};
use crate::types::{LBool, Lit, Var};

/// Opaque marker attached to an implication, handed back in [`Theory::build_reason`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ReasonTag(u32);

impl ReasonTag {
    pub const fn new(raw: u32) -> Self {
        ReasonTag(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// A conflict clause: a disjunction whose literals are all false under the current assignment.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Conflict(pub Vec<Lit>);

impl Conflict {
    pub fn lits(&self) -> &[Lit] {
        &self.0
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, lit) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", lit)?;
        }
        write!(f, "]")
    }
}

/// What the theory needs from the base search engine.
pub trait Engine {
    /// Allocates a fresh variable in the theory's local space.
    fn new_var(&mut self) -> Var;

    /// Reads a literal of the engine's space.
    fn value(&self, lit: Lit) -> LBool;

    /// Decision level at which `var` was assigned.
    fn level(&self, var: Var) -> usize;

    fn decision_level(&self) -> usize;

    /// Assigns an unassigned literal as an implication of the theory.
    fn enqueue(&mut self, lit: Lit, reason: ReasonTag);

    fn new_reason_tag(&mut self) -> ReasonTag;

    /// Constrains `a` and `b` to take the same value.
    fn make_equal(&mut self, a: Lit, b: Lit);

    /// The variable gating a transition, or `None` if the transition is constant.
    fn transition_var(&self, transition: Transition) -> Option<Var>;

    /// Translates a theory-local literal into the engine's literal space.
    fn to_solver(&self, lit: Lit) -> Lit {
        lit
    }

    /// Inverse of [`to_solver`](Engine::to_solver).
    fn from_solver(&self, lit: Lit) -> Lit {
        lit
    }

    fn fsm(&self) -> &DynamicFsm;
}

/// What a pluggable theory offers to the base search engine.
pub trait Theory {
    /// Runs one propagation round. Implications go through [`Engine::enqueue`];
    /// a conflict is returned as a clause.
    fn propagate<E: Engine>(&mut self, engine: &mut E) -> Result<(), Conflict>;

    /// Explains an implication made with `tag`: the returned clause starts
    /// with `lit` and all its other literals are false.
    fn build_reason<E: Engine>(&mut self, engine: &E, lit: Lit, tag: ReasonTag) -> Vec<Lit>;

    /// Suggests a branching literal, if the theory has a useful one.
    fn decide<E: Engine>(&mut self, engine: &E, level: usize) -> Option<Lit>;

    /// Called after the engine undid every assignment above `level`.
    fn backtrack(&mut self, level: usize);

    /// Final check on a complete assignment.
    fn check_satisfied<E: Engine>(&mut self, engine: &E) -> bool;
}
