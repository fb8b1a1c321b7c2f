//! Symmetry breaking between interchangeable states.
//!
//! States other than the source and the accepting states can be relabelled
//! freely, so for every eligible pair `i < j` a canonical order is imposed
//! on their outgoing transitions:
//!
//! - [`PopCount`](SymmetryBreaking::PopCount): the number of Over-enabled
//!   outgoing transitions of `i` is at least the number of Under-enabled
//!   ones of `j`;
//! - [`BitVector`](SymmetryBreaking::BitVector): the Over pattern of `i`
//!   is at least the Under pattern of `j`, where bit `k * alphabet + l`
//!   stands for label `l` on the `k`-th outgoing edge and higher positions
//!   are more significant.
//!
//! A violation is returned as a conflict over the transitions that could
//! still restore the order: disabled ones at `i` (could be enabled) and
//! enabled ones at `j` (could be disabled).

use log::debug;
use num_bigint::BigUint;

use crate::engine::{Conflict, Engine};
use crate::fsm::{DynamicFsm, StateId, Transition, View};
use crate::theory::{AcceptTheory, SymmetryBreaking};
use crate::types::{Lit, Var};

/// Outgoing transition slots of `state`, in bit-position order.
fn slots(fsm: &DynamicFsm, state: StateId) -> impl Iterator<Item = Transition> + '_ {
    fsm.outgoing(state)
        .iter()
        .flat_map(move |&e| (0..fsm.alphabet()).map(move |l| Transition::new(e, l)))
}

fn pattern(fsm: &DynamicFsm, view: View, state: StateId) -> BigUint {
    let mut bits = BigUint::default();
    for (pos, t) in slots(fsm, state).enumerate() {
        if fsm.enabled(view, t.edge, t.label) {
            bits.set_bit(pos as u64, true);
        }
    }
    bits
}

impl AcceptTheory {
    fn eligible_states(&self, fsm: &DynamicFsm) -> Vec<StateId> {
        (0..fsm.states())
            .filter(|&s| s != self.source && !self.accepting.contains(s))
            .collect()
    }

    /// Checks the configured ordering; a violation yields a conflict clause.
    pub(crate) fn break_symmetry<E: Engine>(&self, engine: &E) -> Result<(), Conflict> {
        match self.config.symmetry {
            SymmetryBreaking::None => Ok(()),
            SymmetryBreaking::PopCount => self.break_symmetry_popcount(engine),
            SymmetryBreaking::BitVector => self.break_symmetry_bitvector(engine),
        }
    }

    fn break_symmetry_popcount<E: Engine>(&self, engine: &E) -> Result<(), Conflict> {
        let fsm = engine.fsm();
        let eligible = self.eligible_states(fsm);
        for (n, &i) in eligible.iter().enumerate() {
            let over_i = fsm.count_enabled_outgoing(View::Over, i);
            for &j in &eligible[n + 1..] {
                let under_j = fsm.count_enabled_outgoing(View::Under, j);
                if under_j <= over_i {
                    continue;
                }
                let mut clause = Vec::new();
                for t in slots(fsm, i) {
                    if !fsm.enabled(View::Over, t.edge, t.label) {
                        if let Some(var) = engine.transition_var(t) {
                            clause.push(var.pos());
                        }
                    }
                }
                for t in slots(fsm, j) {
                    if fsm.enabled(View::Under, t.edge, t.label) {
                        if let Some(var) = engine.transition_var(t) {
                            clause.push(var.neg());
                        }
                    }
                }
                debug!(
                    "popcount symmetry: s{} has {} over, s{} has {} under; clause of {} lits",
                    i,
                    over_i,
                    j,
                    under_j,
                    clause.len()
                );
                return Err(Conflict(clause));
            }
        }
        Ok(())
    }

    fn break_symmetry_bitvector<E: Engine>(&self, engine: &E) -> Result<(), Conflict> {
        let fsm = engine.fsm();
        let eligible = self.eligible_states(fsm);
        for (n, &i) in eligible.iter().enumerate() {
            let over_i = pattern(fsm, View::Over, i);
            let vars_i: Vec<Option<Var>> = slots(fsm, i).map(|t| engine.transition_var(t)).collect();
            for &j in &eligible[n + 1..] {
                let under_j = pattern(fsm, View::Under, j);
                if under_j <= over_i {
                    continue;
                }
                let vars_j: Vec<Option<Var>> = slots(fsm, j).map(|t| engine.transition_var(t)).collect();
                let width = vars_i.len().max(vars_j.len());
                let mut clause: Vec<Lit> = Vec::new();
                // From the most significant bit down to the first one already in order.
                for pos in (0..width).rev() {
                    let over = over_i.bit(pos as u64);
                    let under = under_j.bit(pos as u64);
                    if under {
                        if let Some(var) = vars_j.get(pos).copied().flatten() {
                            clause.push(var.neg());
                        }
                    }
                    if !over {
                        if let Some(var) = vars_i.get(pos).copied().flatten() {
                            clause.push(var.pos());
                        }
                    }
                    if over && !under {
                        break;
                    }
                }
                debug!(
                    "bitvector symmetry: s{} over {:b} < s{} under {:b}; clause of {} lits",
                    i,
                    over_i,
                    j,
                    under_j,
                    clause.len()
                );
                return Err(Conflict(clause));
            }
        }
        Ok(())
    }
}
