//! Conversion of detector flips into pending change records.

use std::fmt;

use crate::dawg::DawgId;
use crate::detector::AcceptFlip;
use crate::engine::Engine;
use crate::fsm::{StateId, View};
use crate::registry::{Registry, TrackedPair};
use crate::types::{LBool, Lit};

/// A flip of a tracked pair towards the answer its detector can prove.
///
/// `lit` is the theory-local registry literal when `polarity` is true
/// (accepted by Under) and its negation otherwise (rejected by Over).
/// `assigned` is the engine's value of `lit` when the record was queued; it
/// is kept for diagnostics only and plays no part in re-validation.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ChangeRecord {
    pub lit: Lit,
    pub state: StateId,
    pub root: DawgId,
    pub polarity: bool,
    pub assigned: LBool,
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, s{}) {} [{}]",
            self.lit,
            self.root,
            self.state,
            if self.polarity { "accept" } else { "reject" },
            self.assigned
        )
    }
}

/// The answer a view is able to prove: acceptance for Under, rejection for Over.
pub fn polarity_of_interest(view: View) -> bool {
    match view {
        View::Under => true,
        View::Over => false,
    }
}

/// Appends a record for every flip of `view` towards its polarity of
/// interest. Flips of unregistered pairs are dropped.
pub fn bridge<E: Engine>(
    view: View,
    flips: &[AcceptFlip],
    registry: &Registry,
    engine: &E,
    records: &mut Vec<ChangeRecord>,
) {
    let polarity = polarity_of_interest(view);
    for flip in flips {
        if flip.accepts != polarity {
            continue;
        }
        let pair = TrackedPair {
            node: flip.root,
            state: flip.state,
        };
        let Some(lit) = registry.lit(pair) else {
            continue;
        };
        let lit = if flip.accepts { lit } else { !lit };
        records.push(ChangeRecord {
            lit,
            state: flip.state,
            root: flip.root,
            polarity,
            assigned: engine.value(engine.to_solver(lit)),
        });
    }
}
