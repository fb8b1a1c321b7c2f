//! The acceptance theory: literals meaning "the automaton, started at
//! `source` and driven by some string of a tracked trie, can end in state `S`".
//!
//! [`AcceptTheory`] owns the trie, the literal registry and the two
//! approximation detectors. Functionality is split over several files that
//! each add an `impl AcceptTheory` block:
//!
//! - this module: configuration, registration, propagation, backtracking,
//!   the final check and the [`Theory`] implementation;
//! - [`explain`](crate::explain): accept and non-accept reasons;
//! - [`decide`](crate::decide): the decision heuristic;
//! - [`symmetry`](crate::symmetry): symmetry-breaking conflicts;
//! - [`dot`](crate::dot): diagnostic dumps.
//!
//! # Propagation round
//!
//! 1. Symmetry breaking, if enabled. A violation ends the round.
//! 2. At decision level 0, tracking polarities are narrowed to what the
//!    permanently assigned literals still need.
//! 3. The Under detector is updated, then the Over detector; their flips go
//!    through the [`bridge`](crate::bridge) into change records.
//! 4. Records are optionally shuffled (seeded), then each one is checked
//!    against the detectors' current answer and turned into a no-op, an
//!    implication or a conflict.

use std::collections::HashMap;
use std::fmt;

use log::{debug, trace};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::bitset::BitSet;
use crate::bridge::{bridge, ChangeRecord};
use crate::dawg::{Dawg, DawgId};
use crate::detector::AcceptDetector;
use crate::engine::{Conflict, Engine, ReasonTag, Theory};
use crate::fsm::{StateId, View};
use crate::heap::VarOrder;
use crate::registry::{Registry, TrackedPair};
use crate::types::{LBool, Lit, Var};

/// Symmetry-breaking strategy over interchangeable states.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum SymmetryBreaking {
    #[default]
    None,
    /// Compare counts of enabled outgoing transitions.
    PopCount,
    /// Compare positional bit patterns of outgoing transitions.
    BitVector,
}

/// Configuration for [`AcceptTheory`].
///
/// # Examples
///
/// ```
/// use fsm_accept::theory::{AcceptConfig, SymmetryBreaking};
///
/// let config = AcceptConfig {
///     symmetry: SymmetryBreaking::PopCount,
///     shuffle: true,
///     seed: 42,
///     ..AcceptConfig::default()
/// };
/// assert!(config.decide_positive);
/// ```
#[derive(Debug, Clone)]
pub struct AcceptConfig {
    pub symmetry: SymmetryBreaking,
    /// Suggest enabling transitions for literals that are true but not yet proven (default: true).
    pub decide_positive: bool,
    /// Suggest disabling transitions for literals that are false but not yet refuted (default: true).
    pub decide_negative: bool,
    /// Skip a detector update when no literal needs its answer (default: false).
    pub detect_pure_lits: bool,
    /// Shuffle change records before processing them (default: false).
    pub shuffle: bool,
    pub seed: u64,
    /// Re-insert true literals into the decision heap as their pairs get proven (default: false).
    pub internal_vsids: bool,
}

impl Default for AcceptConfig {
    fn default() -> Self {
        Self {
            symmetry: SymmetryBreaking::None,
            decide_positive: true,
            decide_negative: true,
            detect_pure_lits: false,
            shuffle: false,
            seed: 0,
            internal_vsids: false,
        }
    }
}

/// Counters for [`AcceptTheory`] work.
#[derive(Debug, Default, Copy, Clone)]
pub struct Stats {
    pub propagations: usize,
    pub under_updates: usize,
    pub under_skips: usize,
    pub over_updates: usize,
    pub over_skips: usize,
    pub implications: usize,
    pub stale_records: usize,
    pub conflicts: usize,
    pub reasons: usize,
    pub decisions: usize,
    pub symmetry_conflicts: usize,
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "propagations:       {}", self.propagations)?;
        writeln!(
            f,
            "under updates:      {} ({} skipped)",
            self.under_updates, self.under_skips
        )?;
        writeln!(
            f,
            "over updates:       {} ({} skipped)",
            self.over_updates, self.over_skips
        )?;
        writeln!(f, "implications:       {}", self.implications)?;
        writeln!(f, "stale records:      {}", self.stale_records)?;
        writeln!(f, "conflicts:          {}", self.conflicts)?;
        writeln!(f, "reasons:            {}", self.reasons)?;
        writeln!(f, "decisions:          {}", self.decisions)?;
        write!(f, "symmetry conflicts: {}", self.symmetry_conflicts)
    }
}

#[derive(Debug)]
pub struct AcceptTheory {
    pub(crate) config: AcceptConfig,
    pub(crate) source: StateId,
    pub(crate) dawg: Dawg,
    pub(crate) registry: Registry,
    pub(crate) under: AcceptDetector,
    pub(crate) over: AcceptDetector,
    pub(crate) under_marker: ReasonTag,
    pub(crate) over_marker: ReasonTag,
    pub(crate) order: VarOrder,
    /// Transition literals extracted from an Over witness, next decision last.
    pub(crate) to_decide: Vec<Lit>,
    /// Over update count at extraction; the buffer is stale once it moves.
    pub(crate) to_decide_stamp: Option<u64>,
    /// States named by some registration.
    pub(crate) accepting: BitSet,
    /// Reason clauses captured when implying, keyed by local variable, with the implication level.
    pub(crate) implied: HashMap<Var, (usize, Vec<Lit>)>,
    rng: ChaCha8Rng,
    pub(crate) stats: Stats,
}

impl AcceptTheory {
    pub fn new<E: Engine>(source: StateId, config: AcceptConfig, engine: &mut E) -> Self {
        assert!(
            source < engine.fsm().states(),
            "Unknown source state {}",
            source
        );
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self {
            config,
            source,
            dawg: Dawg::new(),
            registry: Registry::new(),
            under: AcceptDetector::new(View::Under, source),
            over: AcceptDetector::new(View::Over, source),
            under_marker: engine.new_reason_tag(),
            over_marker: engine.new_reason_tag(),
            order: VarOrder::default(),
            to_decide: Vec::new(),
            to_decide_stamp: None,
            accepting: BitSet::new(engine.fsm().states()),
            implied: HashMap::new(),
            rng,
            stats: Stats::default(),
        }
    }

    pub fn config(&self) -> &AcceptConfig {
        &self.config
    }

    pub fn source(&self) -> StateId {
        self.source
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn dawg(&self) -> &Dawg {
        &self.dawg
    }

    /// The trie, for adding tracked strings. Detectors re-explore after any change.
    pub fn dawg_mut(&mut self) -> &mut Dawg {
        &mut self.dawg
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn under(&self) -> &AcceptDetector {
        &self.under
    }

    pub fn over(&self) -> &AcceptDetector {
        &self.over
    }

    /// Convenience: a fresh root spelling exactly `word`.
    pub fn add_string(&mut self, word: &[usize]) -> DawgId {
        let root = self.dawg.new_root();
        self.dawg.insert(root, word);
        root
    }

    /// Binds `external` to "some string of `node` ends in `state`".
    ///
    /// The first registration of a pair allocates an internal literal and
    /// constrains it equal to `external`; later registrations of the same
    /// pair only add the equivalence. Returns the internal literal, in the
    /// engine's space.
    pub fn register_acceptance<E: Engine>(
        &mut self,
        engine: &mut E,
        state: StateId,
        node: DawgId,
        external: Lit,
    ) -> Lit {
        assert!(state < engine.fsm().states(), "Unknown state {}", state);
        assert!(node.index() < self.dawg.len(), "Unknown trie node {}", node);

        let pair = TrackedPair { node, state };
        if let Some(existing) = self.registry.lit(pair) {
            debug!("pair {} already bound to {}, equating with {}", pair, existing, external);
            let existing = engine.to_solver(existing);
            engine.make_equal(existing, external);
            return existing;
        }

        let lit = engine.new_var().pos();
        debug!("register {} for {} (external {})", lit, pair, external);
        self.registry.insert(pair, lit);
        let global = engine.to_solver(lit);
        engine.make_equal(global, external);
        self.accepting.insert(state);
        self.under.set_tracking(node, state, true, true);
        self.over.set_tracking(node, state, true, true);
        self.order.insert(lit.var());
        global
    }

    /// Narrows tracking to the answers that can still matter for permanently assigned literals.
    fn retrack<E: Engine>(&mut self, engine: &E) {
        for (lit, pair) in self.registry.iter() {
            let (want_true, want_false) = match engine.value(engine.to_solver(lit)) {
                // Only an accepting witness can still conflict.
                LBool::False => (true, false),
                LBool::True => (false, true),
                LBool::Undef => (true, true),
            };
            self.under
                .set_tracking(pair.node, pair.state, want_true, want_false);
            self.over
                .set_tracking(pair.node, pair.state, want_true, want_false);
        }
    }

    /// Does the detector that produced `record` still give the same answer?
    fn still_valid(&self, record: &ChangeRecord) -> bool {
        if record.polarity {
            record.lit.is_positive() && self.under.accepts(record.root, record.state)
        } else {
            record.lit.is_negated() && !self.over.accepts(record.root, record.state)
        }
    }

    fn update_detectors<E: Engine>(&mut self, engine: &E) -> Vec<ChangeRecord> {
        let (need_under, need_over) = if self.config.detect_pure_lits {
            let lits = self.registry.lits();
            (
                lits.iter().any(|&lit| !engine.value(engine.to_solver(lit)).is_true()),
                lits.iter().any(|&lit| !engine.value(engine.to_solver(lit)).is_false()),
            )
        } else {
            (true, true)
        };

        let mut flips = Vec::new();
        let mut records = Vec::new();
        if need_under {
            self.under.update(engine.fsm(), &self.dawg, &mut flips);
            bridge(View::Under, &flips, &self.registry, engine, &mut records);
            self.stats.under_updates += 1;
        } else {
            self.stats.under_skips += 1;
        }
        flips.clear();
        if need_over {
            self.over.update(engine.fsm(), &self.dawg, &mut flips);
            bridge(View::Over, &flips, &self.registry, engine, &mut records);
            self.stats.over_updates += 1;
        } else {
            self.stats.over_skips += 1;
        }
        records
    }

    pub(crate) fn propagate_records<E: Engine>(&mut self, engine: &mut E) -> Result<(), Conflict> {
        self.stats.propagations += 1;

        if self.config.symmetry != SymmetryBreaking::None {
            if let Err(conflict) = self.break_symmetry(&*engine) {
                self.stats.symmetry_conflicts += 1;
                self.order.decay();
                return Err(conflict);
            }
        }

        if engine.decision_level() == 0 {
            self.retrack(&*engine);
        }

        let mut records = self.update_detectors(&*engine);
        if self.config.shuffle {
            records.shuffle(&mut self.rng);
        }

        for record in records {
            if !self.still_valid(&record) {
                trace!("dropping stale record {}", record);
                self.stats.stale_records += 1;
                continue;
            }
            let lit = engine.to_solver(record.lit);
            match engine.value(lit) {
                LBool::True => {
                    if self.config.internal_vsids {
                        self.order.insert(record.lit.var());
                    }
                }
                LBool::Undef => {
                    let mut clause = vec![lit];
                    let tag = if record.polarity {
                        self.build_accept_reason(&*engine, record.root, record.state, &mut clause);
                        self.under_marker
                    } else {
                        self.build_non_accept_reason(&*engine, record.root, record.state, &mut clause);
                        self.over_marker
                    };
                    trace!("imply {}", record);
                    self.implied
                        .insert(record.lit.var(), (engine.decision_level(), clause));
                    engine.enqueue(lit, tag);
                    self.stats.implications += 1;
                }
                LBool::False => {
                    let mut clause = vec![lit];
                    if record.polarity {
                        self.build_accept_reason(&*engine, record.root, record.state, &mut clause);
                    } else {
                        self.build_non_accept_reason(&*engine, record.root, record.state, &mut clause);
                    }
                    self.bump_activity(record.lit.var());
                    self.stats.conflicts += 1;
                    let conflict = Conflict(clause);
                    debug!("conflict on {}: {}", record, conflict);
                    return Err(conflict);
                }
            }
        }
        Ok(())
    }

    /// Checks that every registered literal agrees with both detectors.
    pub fn is_consistent<E: Engine>(&mut self, engine: &E) -> bool {
        let mut flips = Vec::new();
        self.under.update(engine.fsm(), &self.dawg, &mut flips);
        self.over.update(engine.fsm(), &self.dawg, &mut flips);
        // The flips were consumed here; the next propagation must see them again.
        self.under.resync();
        self.over.resync();

        let mut consistent = true;
        for (lit, pair) in self.registry.iter() {
            let under = self.under.accepts(pair.node, pair.state);
            let over = self.over.accepts(pair.node, pair.state);
            assert!(!under || over, "Under accepts {} but Over does not", pair);
            let value = engine.value(engine.to_solver(lit));
            let ok = match value {
                LBool::True => under,
                LBool::False => !over,
                LBool::Undef => false,
            };
            if !ok {
                debug!("{} = {} disagrees with detectors (under {}, over {})", lit, value, under, over);
                consistent = false;
            }
        }
        consistent
    }
}

impl Theory for AcceptTheory {
    fn propagate<E: Engine>(&mut self, engine: &mut E) -> Result<(), Conflict> {
        self.propagate_records(engine)
    }

    fn build_reason<E: Engine>(&mut self, engine: &E, lit: Lit, tag: ReasonTag) -> Vec<Lit> {
        self.explain(engine, lit, tag)
    }

    fn decide<E: Engine>(&mut self, engine: &E, level: usize) -> Option<Lit> {
        self.pick_decision(engine, level)
    }

    fn backtrack(&mut self, level: usize) {
        trace!("backtrack to level {}", level);
        self.under.resync();
        self.over.resync();
        self.to_decide.clear();
        self.to_decide_stamp = None;
        self.implied.retain(|_, (implied_at, _)| *implied_at <= level);
        for &lit in self.registry.lits() {
            self.order.insert(lit.var());
        }
    }

    fn check_satisfied<E: Engine>(&mut self, engine: &E) -> bool {
        self.is_consistent(engine)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::engine::BasicEngine;
    use crate::fsm::{DynamicFsm, Transition};

    /// s0 --a--> s1 with `a` gated by a fresh variable; returns (engine, x).
    fn single_edge() -> (BasicEngine, crate::types::Var) {
        let mut fsm = DynamicFsm::new(2, false);
        let s0 = fsm.add_state();
        let s1 = fsm.add_state();
        let e = fsm.add_edge(s0, s1);
        let mut engine = BasicEngine::new(fsm);
        let x = engine.new_transition_var(Transition::new(e, 1));
        (engine, x)
    }

    #[test]
    fn test_register_twice_reuses_literal() {
        let (mut engine, _) = single_edge();
        let mut theory = AcceptTheory::new(0, AcceptConfig::default(), &mut engine);
        let root = theory.add_string(&[1]);
        let y = engine.new_var();
        let z = engine.new_var();
        let first = theory.register_acceptance(&mut engine, 1, root, y.pos());
        let second = theory.register_acceptance(&mut engine, 1, root, z.pos());
        assert_eq!(first, second);
        assert_eq!(theory.registry().len(), 1);

        engine.decide(y.pos());
        engine.propagate_clauses().unwrap();
        assert!(engine.value(z.pos()).is_true());
        assert!(engine.value(first).is_true());
    }

    #[test]
    fn test_propagate_is_quiet_without_changes() {
        let (mut engine, _) = single_edge();
        let mut theory = AcceptTheory::new(0, AcceptConfig::default(), &mut engine);
        let root = theory.add_string(&[1]);
        let y = engine.new_var();
        let lit = theory.register_acceptance(&mut engine, 1, root, y.pos());

        assert_eq!(theory.propagate(&mut engine), Ok(()));
        assert!(engine.value(lit).is_undef());
        let trail = engine.trail().len();
        assert_eq!(theory.propagate(&mut engine), Ok(()));
        assert_eq!(engine.trail().len(), trail);
    }

    #[test]
    fn test_pure_literal_skipping() {
        let (mut engine, _) = single_edge();
        let config = AcceptConfig {
            detect_pure_lits: true,
            ..AcceptConfig::default()
        };
        let mut theory = AcceptTheory::new(0, config, &mut engine);
        let root = theory.add_string(&[1]);
        let y = engine.new_var();
        let lit = theory.register_acceptance(&mut engine, 1, root, y.pos());

        engine.decide(!lit);
        assert_eq!(theory.propagate(&mut engine), Ok(()));
        assert_eq!(theory.stats().under_updates, 1);
        assert_eq!(theory.stats().over_skips, 1);
    }

    /// Hands out local variables numbered from 1, independent of the engine's numbering.
    struct Remapped {
        inner: BasicEngine,
        globals: Vec<Var>,
    }

    impl Engine for Remapped {
        fn new_var(&mut self) -> Var {
            self.globals.push(self.inner.new_var());
            Var::new(self.globals.len() as u32)
        }
        fn value(&self, lit: Lit) -> LBool {
            self.inner.value(lit)
        }
        fn level(&self, var: Var) -> usize {
            self.inner.level(var)
        }
        fn decision_level(&self) -> usize {
            self.inner.decision_level()
        }
        fn enqueue(&mut self, lit: Lit, reason: ReasonTag) {
            self.inner.enqueue(lit, reason)
        }
        fn new_reason_tag(&mut self) -> ReasonTag {
            self.inner.new_reason_tag()
        }
        fn make_equal(&mut self, a: Lit, b: Lit) {
            self.inner.make_equal(a, b)
        }
        fn transition_var(&self, transition: Transition) -> Option<Var> {
            self.inner.transition_var(transition)
        }
        fn to_solver(&self, lit: Lit) -> Lit {
            self.globals[lit.var().index()].lit(lit.is_negated())
        }
        fn from_solver(&self, lit: Lit) -> Lit {
            match self.globals.iter().position(|&g| g == lit.var()) {
                Some(i) => Var::new(i as u32 + 1).lit(lit.is_negated()),
                None => lit,
            }
        }
        fn fsm(&self) -> &DynamicFsm {
            self.inner.fsm()
        }
    }

    #[test]
    fn test_local_literals_cross_into_engine_space() {
        let (inner, x) = single_edge();
        let mut engine = Remapped {
            inner,
            globals: Vec::new(),
        };
        let mut theory = AcceptTheory::new(0, AcceptConfig::default(), &mut engine);
        let root = theory.add_string(&[1]);
        let y = engine.inner.new_var();
        let lit = theory.register_acceptance(&mut engine, 1, root, y.pos());
        // local 1 shares its number with the transition variable
        assert_eq!(theory.registry().lits(), &[Var::new(1).pos()]);
        assert_ne!(lit.var(), x);

        engine.inner.decide(x.neg());
        assert_eq!(theory.propagate(&mut engine), Ok(()));
        assert!(engine.value(lit).is_false());
        let Some(crate::engine::Reason::Theory(tag)) = engine.inner.reason(lit.var()) else {
            panic!("{} was not implied by the theory", lit);
        };
        assert_eq!(theory.build_reason(&engine, !lit, tag), vec![!lit, x.pos()]);

        let mut out = String::new();
        theory.dump(&engine, &mut out).unwrap();
        assert!(out.contains(" = F "));
        assert!(out.contains("under=false over=false"));
    }

    #[test]
    fn test_unreachable_state_is_rejected_at_level_zero() {
        let (mut engine, _) = single_edge();
        let mut theory = AcceptTheory::new(0, AcceptConfig::default(), &mut engine);
        let root = theory.add_string(&[1, 1]);
        let y = engine.new_var();
        let lit = theory.register_acceptance(&mut engine, 1, root, y.pos());

        assert_eq!(theory.propagate(&mut engine), Ok(()));
        assert!(engine.value(lit).is_false());
        // Nothing leads out of s1, so the cut needs no transition literal.
        let tag = theory.over_marker;
        let reason = theory.build_reason(&engine, !lit, tag);
        assert_eq!(reason, vec![!lit]);
    }
}
