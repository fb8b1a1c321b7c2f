//! Decision heuristic.
//!
//! Registered variables sit in an activity heap. At decision time the most
//! active one whose value is not yet backed by its detector is examined:
//!
//! - true but not proven by Under: the transitions of an Over witness are
//!   offered as decisions, the first one now and the rest through a pending
//!   buffer that stays valid until the Over detector updates again;
//! - false but not refuted by Over: the first undecided transition of an
//!   Over witness is disabled (any accepting path must lose an edge);
//! - otherwise the variable is consistent and is dropped from the heap
//!   until the next backtrack.

use log::debug;

use crate::engine::Engine;
use crate::fsm::Transition;
use crate::theory::AcceptTheory;
use crate::types::{LBool, Lit};

impl AcceptTheory {
    /// Positive literals of the still undecided transitions on `path`, in path order.
    fn undecided<'a, E: Engine>(engine: &'a E, path: &'a [Transition]) -> impl Iterator<Item = Lit> + 'a {
        path.iter()
            .filter_map(|&t| engine.transition_var(t))
            .map(|var| var.pos())
            .filter(|&lit| engine.value(lit).is_undef())
    }

    fn take_pending<E: Engine>(&mut self, engine: &E) -> Option<Lit> {
        if self.to_decide_stamp != Some(self.over.num_updates()) {
            self.to_decide.clear();
            self.to_decide_stamp = None;
            return None;
        }
        while let Some(lit) = self.to_decide.pop() {
            if engine.value(lit).is_undef() {
                return Some(lit);
            }
        }
        None
    }

    pub(crate) fn pick_decision<E: Engine>(&mut self, engine: &E, level: usize) -> Option<Lit> {
        if let Some(lit) = self.take_pending(engine) {
            debug!("decide {} at level {} (pending)", lit, level);
            self.stats.decisions += 1;
            return Some(lit);
        }

        let mut last_len = None;
        while let Some(var) = self.order.peek() {
            let len = self.order.len();
            if let Some(last) = last_len {
                assert!(len < last, "Decision heap did not shrink while draining");
            }
            last_len = Some(len);
            let Some(pair) = self.registry.pair(var) else {
                panic!("Decision heap holds unregistered variable {}", var);
            };
            let lit = engine.to_solver(var.pos());
            let decision = match engine.value(lit) {
                LBool::True
                    if self.config.decide_positive
                        && !self.under.accepts(pair.node, pair.state) =>
                {
                    debug_assert!(self.over.accepts(pair.node, pair.state));
                    self.over.abstract_path(pair.node, pair.state).and_then(|path| {
                        let mut pending: Vec<Lit> = Self::undecided(engine, &path).collect();
                        pending.reverse();
                        let next = pending.pop();
                        self.to_decide = pending;
                        self.to_decide_stamp = Some(self.over.num_updates());
                        next
                    })
                }
                LBool::False
                    if self.config.decide_negative && self.over.accepts(pair.node, pair.state) =>
                {
                    self.over
                        .abstract_path(pair.node, pair.state)
                        .and_then(|path| Self::undecided(engine, &path).next())
                        .map(|lit| !lit)
                }
                _ => None,
            };
            if let Some(decision) = decision {
                debug!("decide {} at level {} for {}", decision, level, pair);
                self.stats.decisions += 1;
                return Some(decision);
            }

            self.order.pop();
        }
        None
    }
}
