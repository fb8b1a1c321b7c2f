//! Reasons for acceptance and non-acceptance.
//!
//! An *accept* reason negates the transition literals along the Under
//! witness: acceptance holds until one of them is revoked.
//!
//! A *non-accept* reason is a cut in the Over view. For every trie node `N`
//! below the root we compute, bottom-up, the set `B(N)` of states from which
//! reading some word of `N` can end in the target state:
//!
//! - the target is in `B(N)` if `N` is a word node;
//! - `u` is in `B(N)` if an Over-enabled transition `u --c--> v` exists
//!   with `v` in `B(N.child(c))`;
//! - with epsilon moves, `B(N)` is closed backwards under enabled epsilon
//!   transitions.
//!
//! Every *disabled* transition leading into some `B(N)` along a matching
//! label is a candidate for re-enabling acceptance; the reason cites those
//! with a variable assigned above level 0. Since the source is not in
//! `B(root)`, any accepting path must use one of the cited transitions.
//! Sibling subtrees each contribute their own part of the cut.
//!
//! Both kinds are built when the implication is made and kept until the
//! engine backtracks past it, so an explanation only ever cites literals
//! assigned before the implied one.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::bitset::BitSet;
use crate::dawg::DawgId;
use crate::engine::{Engine, ReasonTag};
use crate::fsm::{StateId, Transition, View, EPSILON};
use crate::theory::AcceptTheory;
use crate::types::{Lit, Var};

/// Adds the literal of a disabled transition to `reason`, unless it is constant or fixed at level 0.
fn cite<E: Engine>(engine: &E, transition: Transition, seen: &mut HashSet<Var>, reason: &mut Vec<Lit>) {
    let Some(var) = engine.transition_var(transition) else {
        return;
    };
    if engine.value(var.pos()).is_false() && engine.level(var) > 0 && seen.insert(var) {
        reason.push(var.pos());
    }
}

impl AcceptTheory {
    /// Appends the negated transition literals of the Under witness for `(root, state)`.
    pub(crate) fn build_accept_reason<E: Engine>(
        &self,
        engine: &E,
        root: DawgId,
        state: StateId,
        reason: &mut Vec<Lit>,
    ) {
        let Some(path) = self.under.path(root, state) else {
            panic!("No Under witness for accepted pair ({}, s{})", root, state);
        };
        for transition in path {
            if let Some(var) = engine.transition_var(transition) {
                reason.push(var.neg());
            }
        }
    }

    /// Appends a cut of disabled transition literals separating `(root, source)` from `state`.
    pub(crate) fn build_non_accept_reason<E: Engine>(
        &self,
        engine: &E,
        root: DawgId,
        target: StateId,
        reason: &mut Vec<Lit>,
    ) {
        let fsm = engine.fsm();
        let mut seen = HashSet::new();
        let mut sets: HashMap<DawgId, BitSet> = HashMap::new();

        for node in self.dawg.post_order(root) {
            let mut set = BitSet::new(fsm.states());
            let mut frontier = Vec::new();
            if self.dawg.is_word(node) {
                set.insert(target);
                frontier.push(target);
            }
            for (label, child) in self.dawg.children(node) {
                for v in sets[&child].iter() {
                    for &e in fsm.incoming(v) {
                        if fsm.enabled(View::Over, e, label) {
                            let u = fsm.edge(e).from;
                            if set.insert(u) {
                                frontier.push(u);
                            }
                        } else {
                            cite(engine, Transition::new(e, label), &mut seen, reason);
                        }
                    }
                }
            }
            if fsm.emoves_enabled() {
                while let Some(v) = frontier.pop() {
                    for &e in fsm.incoming(v) {
                        if fsm.enabled(View::Over, e, EPSILON) {
                            let u = fsm.edge(e).from;
                            if set.insert(u) {
                                frontier.push(u);
                            }
                        } else {
                            cite(engine, Transition::new(e, EPSILON), &mut seen, reason);
                        }
                    }
                }
            }
            sets.insert(node, set);
        }

        debug_assert!(
            !sets[&root].contains(self.source),
            "Over view still reaches s{} from the source",
            target
        );
    }

    /// Bumps the activity of a tracked variable involved in a reason or conflict.
    pub(crate) fn bump_activity(&mut self, var: Var) {
        self.order.bump(var);
        self.order.decay();
    }

    /// Returns the clause explaining an implication of `lit` made with `tag`.
    ///
    /// The clause was captured when the implication was made, so later
    /// assignments cannot leak into it.
    ///
    /// # Panics
    ///
    /// Panics if `lit` is not a registered literal, `tag` was not issued by
    /// this theory, or the theory never implied `lit`.
    pub(crate) fn explain<E: Engine>(&mut self, engine: &E, lit: Lit, tag: ReasonTag) -> Vec<Lit> {
        let local = engine.from_solver(lit);
        if self.registry.pair(local.var()).is_none() {
            panic!("Reason requested for unregistered literal {}", lit);
        }
        if tag == self.under_marker {
            debug_assert!(local.is_positive(), "Accept reason for a negative literal");
        } else if tag == self.over_marker {
            debug_assert!(local.is_negated(), "Non-accept reason for a positive literal");
        } else {
            panic!("Unknown reason tag {:?}", tag);
        }
        let reason = match self.implied.get(&local.var()) {
            Some((_, clause)) if clause[0] == lit => clause.clone(),
            _ => panic!("Reason requested for {} which was not implied by this theory", lit),
        };
        debug!("reason for {}: {:?}", lit, reason);
        self.bump_activity(local.var());
        self.stats.reasons += 1;
        reason
    }
}
