//! A minimal search engine for driving a [`Theory`] in isolation.
//!
//! Assignment trail with decision levels, a clause store with naive unit
//! propagation, and chronological backtracking (DPLL without learning).
//! Transition variables are bound to automaton slots: assigning one writes
//! the slot, unassigning it resets the slot to `Undef`.
//!
//! This is test and demo tooling, not a competitive SAT solver.

use std::collections::HashMap;

use log::{debug, trace};

use super::{Conflict, Engine, ReasonTag, Theory};
use crate::fsm::{DynamicFsm, Transition};
use crate::types::{LBool, Lit, Var};

/// Why a variable holds its current value.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Reason {
    Decision,
    Clause(usize),
    Theory(ReasonTag),
}

#[derive(Debug)]
pub struct BasicEngine {
    fsm: DynamicFsm,
    /// Per-variable state, indexed by variable ID (slot 0 unused).
    assigns: Vec<LBool>,
    levels: Vec<usize>,
    reasons: Vec<Option<Reason>>,
    trail: Vec<Lit>,
    trail_lim: Vec<usize>,
    clauses: Vec<Vec<Lit>>,
    transitions: HashMap<Var, Transition>,
    transition_vars: HashMap<Transition, Var>,
    /// Open decisions, flagged once their opposite branch is being explored.
    decisions: Vec<(Lit, bool)>,
    next_tag: u32,
}

impl BasicEngine {
    pub fn new(fsm: DynamicFsm) -> Self {
        Self {
            fsm,
            assigns: vec![LBool::Undef],
            levels: vec![0],
            reasons: vec![None],
            trail: Vec::new(),
            trail_lim: Vec::new(),
            clauses: Vec::new(),
            transitions: HashMap::new(),
            transition_vars: HashMap::new(),
            decisions: Vec::new(),
            next_tag: 0,
        }
    }

    /// Mutable access for building the automaton before search.
    pub fn fsm_mut(&mut self) -> &mut DynamicFsm {
        &mut self.fsm
    }

    pub fn num_vars(&self) -> usize {
        self.assigns.len() - 1
    }

    /// Allocates a variable gating `transition` and marks the slot as undecided.
    pub fn new_transition_var(&mut self, transition: Transition) -> Var {
        assert!(
            !self.transition_vars.contains_key(&transition),
            "Transition {} already has a variable",
            transition
        );
        let var = self.new_var();
        self.transitions.insert(var, transition);
        self.transition_vars.insert(transition, var);
        self.fsm
            .set_value(transition.edge, transition.label, LBool::Undef);
        var
    }

    pub fn transition_of(&self, var: Var) -> Option<Transition> {
        self.transitions.get(&var).copied()
    }

    pub fn add_clause(&mut self, lits: impl IntoIterator<Item = Lit>) -> usize {
        self.clauses.push(lits.into_iter().collect());
        self.clauses.len() - 1
    }

    pub fn reason(&self, var: Var) -> Option<Reason> {
        self.reasons[var.index()]
    }

    pub fn trail(&self) -> &[Lit] {
        &self.trail
    }

    pub fn new_level(&mut self) {
        self.trail_lim.push(self.trail.len());
    }

    /// Opens a new decision level and assigns `lit` there.
    pub fn decide(&mut self, lit: Lit) {
        self.new_level();
        self.assign(lit, Reason::Decision);
    }

    pub fn assign(&mut self, lit: Lit, reason: Reason) {
        let var = lit.var();
        assert!(
            self.assigns[var.index()].is_undef(),
            "Variable {} is already assigned",
            var
        );
        let value = LBool::from(lit.is_positive());
        trace!("assign {} at level {} ({:?})", lit, self.decision_level(), reason);
        self.assigns[var.index()] = value;
        self.levels[var.index()] = self.decision_level();
        self.reasons[var.index()] = Some(reason);
        self.trail.push(lit);
        if let Some(t) = self.transitions.get(&var) {
            self.fsm.set_value(t.edge, t.label, value);
        }
    }

    /// Undoes every assignment above `level`.
    pub fn backtrack(&mut self, level: usize) {
        if self.trail_lim.len() <= level {
            return;
        }
        let keep = self.trail_lim[level];
        for lit in self.trail.drain(keep..).rev() {
            let var = lit.var();
            self.assigns[var.index()] = LBool::Undef;
            self.reasons[var.index()] = None;
            if let Some(t) = self.transitions.get(&var) {
                self.fsm.set_value(t.edge, t.label, LBool::Undef);
            }
        }
        self.trail_lim.truncate(level);
    }

    /// Unit propagation over the clause store, to fixpoint.
    pub fn propagate_clauses(&mut self) -> Result<(), Conflict> {
        loop {
            let mut changed = false;
            for i in 0..self.clauses.len() {
                let mut satisfied = false;
                let mut unassigned = Vec::new();
                for &lit in &self.clauses[i] {
                    match self.value(lit) {
                        LBool::True => {
                            satisfied = true;
                            break;
                        }
                        LBool::Undef => unassigned.push(lit),
                        LBool::False => {}
                    }
                }
                if satisfied {
                    continue;
                }
                match unassigned.as_slice() {
                    [] => return Err(Conflict(self.clauses[i].clone())),
                    &[lit] => {
                        self.assign(lit, Reason::Clause(i));
                        changed = true;
                    }
                    _ => {}
                }
            }
            if !changed {
                return Ok(());
            }
        }
    }

    fn pick_branch(&self) -> Option<Lit> {
        (1..self.assigns.len())
            .find(|&i| self.assigns[i].is_undef())
            .map(|i| Var::new(i as u32).neg())
    }

    /// Flips the most recent unflipped decision. Returns false when none is left.
    fn backjump<T: Theory>(&mut self, theory: &mut T) -> bool {
        while let Some((lit, flipped)) = self.decisions.pop() {
            let level = self.decision_level() - 1;
            self.backtrack(level);
            theory.backtrack(level);
            if !flipped {
                self.decisions.push((!lit, true));
                self.decide(!lit);
                return true;
            }
        }
        false
    }

    /// Searches for an assignment satisfying the clauses and the theory.
    ///
    /// Returns true if one was found; the engine then holds the model.
    pub fn solve<T: Theory>(&mut self, theory: &mut T) -> bool {
        loop {
            let before = self.trail.len();
            let mut result = self.propagate_clauses();
            if result.is_ok() {
                result = theory.propagate(self);
            }
            match result {
                Err(conflict) => {
                    debug!("conflict at level {}: {}", self.decision_level(), conflict);
                    if !self.backjump(theory) {
                        return false;
                    }
                }
                // Theory implications may enable more unit clauses.
                Ok(()) if self.trail.len() != before => continue,
                Ok(()) => {
                    let level = self.decision_level();
                    let next = theory
                        .decide(self, level)
                        .filter(|&lit| self.value(lit).is_undef())
                        .or_else(|| self.pick_branch());
                    match next {
                        Some(lit) => {
                            self.decisions.push((lit, false));
                            self.decide(lit);
                        }
                        None => {
                            assert!(
                                theory.check_satisfied(self),
                                "Theory is not satisfied by a complete assignment"
                            );
                            return true;
                        }
                    }
                }
            }
        }
    }
}

impl Engine for BasicEngine {
    fn new_var(&mut self) -> Var {
        self.assigns.push(LBool::Undef);
        self.levels.push(0);
        self.reasons.push(None);
        Var::new(self.num_vars() as u32)
    }

    fn value(&self, lit: Lit) -> LBool {
        self.assigns[lit.var().index()].under_sign(lit.is_negated())
    }

    fn level(&self, var: Var) -> usize {
        self.levels[var.index()]
    }

    fn decision_level(&self) -> usize {
        self.trail_lim.len()
    }

    fn enqueue(&mut self, lit: Lit, reason: ReasonTag) {
        self.assign(lit, Reason::Theory(reason));
    }

    fn new_reason_tag(&mut self) -> ReasonTag {
        self.next_tag += 1;
        ReasonTag::new(self.next_tag)
    }

    fn make_equal(&mut self, a: Lit, b: Lit) {
        self.add_clause([!a, b]);
        self.add_clause([a, !b]);
    }

    fn transition_var(&self, transition: Transition) -> Option<Var> {
        self.transition_vars.get(&transition).copied()
    }

    fn fsm(&self) -> &DynamicFsm {
        &self.fsm
    }
}
