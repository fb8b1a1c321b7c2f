//! Incremental acceptance detection over one view of the automaton.
//!
//! An [`AcceptDetector`] answers "can some string of the trie rooted at
//! `root`, read from the source state, end in `state`?" under a fixed
//! [`View`]. Two instances run side by side: the Under detector proves
//! acceptance (its witnesses only use committed transitions) and the Over
//! detector proves non-acceptance (nothing it cannot reach is reachable in
//! any completion of the current assignment).
//!
//! # Algorithm
//!
//! For every tracked root the detector keeps a breadth-first exploration of
//! the product of automaton states and trie nodes, starting from
//! `(root, source)`. A step along an enabled transition labelled `c` moves
//! `(node, s)` to `(node.child(c), s')`; an enabled epsilon transition moves
//! `(node, s)` to `(node, s')`. A state is accepted once it is paired with a
//! word node. Each reached pair remembers the step that first discovered it,
//! which gives the witness paths.
//!
//! Updates are incremental. The automaton's change log since the previous
//! update is split into transitions that became enabled and transitions that
//! became disabled under this view. A root is explored from scratch only if
//! one of its parent pointers runs through a disabled transition; otherwise
//! the exploration is extended from the newly enabled transitions.
//!
//! Flips of the answer for a tracked (root, state) pair are reported through
//! [`AcceptFlip`]s, filtered by what the pair is currently tracked for.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use log::{debug, trace};

use crate::dawg::{Dawg, DawgId};
use crate::fsm::{DynamicFsm, StateId, Transition, View, EPSILON};

/// A change in a tracked pair's answer, as reported by [`AcceptDetector::update`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AcceptFlip {
    pub root: DawgId,
    pub state: StateId,
    pub accepts: bool,
}

#[derive(Debug, Copy, Clone)]
struct Track {
    want_true: bool,
    want_false: bool,
    /// Last answer seen by `report`.
    last: bool,
}

#[derive(Debug, Copy, Clone)]
struct Step {
    prev: (DawgId, StateId),
    transition: Transition,
}

/// Product reachability for a single root.
#[derive(Debug, Default)]
struct Reach {
    /// Reached pairs with the step that first discovered them (`None` for the start pair).
    parent: HashMap<(DawgId, StateId), Option<Step>>,
    /// Trie nodes reached at each state.
    by_state: HashMap<StateId, Vec<DawgId>>,
    /// First word node reached at each accepted state.
    accepting: HashMap<StateId, DawgId>,
    /// Transitions appearing in parent pointers.
    used: HashSet<Transition>,
}

impl Reach {
    fn clear(&mut self) {
        self.parent.clear();
        self.by_state.clear();
        self.accepting.clear();
        self.used.clear();
    }

    fn visit(
        &mut self,
        dawg: &Dawg,
        node: DawgId,
        state: StateId,
        step: Option<Step>,
        queue: &mut VecDeque<(DawgId, StateId)>,
    ) {
        if self.parent.contains_key(&(node, state)) {
            return;
        }
        self.parent.insert((node, state), step);
        if let Some(step) = step {
            self.used.insert(step.transition);
        }
        self.by_state.entry(state).or_default().push(node);
        if dawg.is_word(node) {
            self.accepting.entry(state).or_insert(node);
        }
        queue.push_back((node, state));
    }

    fn explore(
        &mut self,
        view: View,
        fsm: &DynamicFsm,
        dawg: &Dawg,
        queue: &mut VecDeque<(DawgId, StateId)>,
    ) {
        while let Some((node, state)) = queue.pop_front() {
            for &e in fsm.outgoing(state) {
                let to = fsm.edge(e).to;
                if fsm.emoves_enabled() && fsm.enabled(view, e, EPSILON) {
                    let step = Step {
                        prev: (node, state),
                        transition: Transition::new(e, EPSILON),
                    };
                    self.visit(dawg, node, to, Some(step), queue);
                }
                for (label, child) in dawg.children(node) {
                    debug_assert!(
                        !fsm.emoves_enabled() || label != EPSILON,
                        "Trie uses the epsilon label"
                    );
                    if fsm.enabled(view, e, label) {
                        let step = Step {
                            prev: (node, state),
                            transition: Transition::new(e, label),
                        };
                        self.visit(dawg, child, to, Some(step), queue);
                    }
                }
            }
        }
    }

    fn recompute(&mut self, view: View, source: StateId, root: DawgId, fsm: &DynamicFsm, dawg: &Dawg) {
        self.clear();
        let mut queue = VecDeque::new();
        self.visit(dawg, root, source, None, &mut queue);
        // The empty string only moves along epsilon transitions.
        if dawg.is_leaf(root) && !fsm.emoves_enabled() {
            return;
        }
        self.explore(view, fsm, dawg, &mut queue);
    }

    fn extend(&mut self, view: View, fsm: &DynamicFsm, dawg: &Dawg, added: &[Transition]) {
        let mut queue = VecDeque::new();
        for &t in added {
            let edge = fsm.edge(t.edge);
            let Some(nodes) = self.by_state.get(&edge.from) else {
                continue;
            };
            for node in nodes.clone() {
                let next = if fsm.emoves_enabled() && t.label == EPSILON {
                    Some(node)
                } else {
                    dawg.child(node, t.label)
                };
                if let Some(next) = next {
                    let step = Step {
                        prev: (node, edge.from),
                        transition: t,
                    };
                    self.visit(dawg, next, edge.to, Some(step), &mut queue);
                }
            }
        }
        self.explore(view, fsm, dawg, &mut queue);
    }
}

#[derive(Debug)]
struct Tracked {
    root: DawgId,
    computed: bool,
    reach: Reach,
    states: BTreeMap<StateId, Track>,
}

/// Counters for [`AcceptDetector`] work.
#[derive(Debug, Default, Copy, Clone)]
pub struct DetectorStats {
    pub recomputes: usize,
    pub extensions: usize,
    pub flips: usize,
}

#[derive(Debug)]
pub struct AcceptDetector {
    view: View,
    source: StateId,
    tracked: Vec<Tracked>,
    index: HashMap<DawgId, usize>,
    /// Position in the automaton change log at the last update.
    cursor: usize,
    /// Automaton version at the last update (`None` before the first one).
    fsm_version: Option<u64>,
    structure_version: u64,
    dawg_version: u64,
    /// Re-report every tracked pair on the next update.
    resync: bool,
    /// A pair was added to an already explored root.
    stale: bool,
    num_updates: u64,
    stats: DetectorStats,
}

impl AcceptDetector {
    pub fn new(view: View, source: StateId) -> Self {
        Self {
            view,
            source,
            tracked: Vec::new(),
            index: HashMap::new(),
            cursor: 0,
            fsm_version: None,
            structure_version: 0,
            dawg_version: 0,
            resync: false,
            stale: false,
            num_updates: 0,
            stats: DetectorStats::default(),
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn source(&self) -> StateId {
        self.source
    }

    /// Number of updates that actually did work. Caches derived from this
    /// detector compare against it to detect staleness.
    pub fn num_updates(&self) -> u64 {
        self.num_updates
    }

    pub fn stats(&self) -> DetectorStats {
        self.stats
    }

    /// The answer assumed before anything is known: Under proves nothing, Over rules nothing out.
    fn initial_answer(&self) -> bool {
        self.view == View::Over
    }

    /// Starts (or changes) tracking of a (root, state) pair.
    ///
    /// `want_true` / `want_false` select which answers are worth reporting;
    /// flips towards an unwanted answer are recorded but not reported.
    pub fn set_tracking(&mut self, root: DawgId, state: StateId, want_true: bool, want_false: bool) {
        let initial = self.initial_answer();
        let index = match self.index.get(&root) {
            Some(&index) => index,
            None => {
                self.tracked.push(Tracked {
                    root,
                    computed: false,
                    reach: Reach::default(),
                    states: BTreeMap::new(),
                });
                self.index.insert(root, self.tracked.len() - 1);
                self.tracked.len() - 1
            }
        };
        let states = &mut self.tracked[index].states;
        if !states.contains_key(&state) {
            self.stale = true;
        }
        let track = states.entry(state).or_insert(Track {
            want_true,
            want_false,
            last: initial,
        });
        track.want_true = want_true;
        track.want_false = want_false;
    }

    pub fn is_tracked(&self, root: DawgId, state: StateId) -> bool {
        self.index
            .get(&root)
            .is_some_and(|&i| self.tracked[i].states.contains_key(&state))
    }

    /// Forces the next [`update`][Self::update] to report the current answer
    /// of every tracked pair, whether or not it flipped.
    pub fn resync(&mut self) {
        self.resync = true;
    }

    /// Does `root` have a string that ends in `state` under this view?
    pub fn accepts(&self, root: DawgId, state: StateId) -> bool {
        match self.index.get(&root) {
            Some(&i) if self.tracked[i].computed => self.tracked[i].reach.accepting.contains_key(&state),
            _ => self.initial_answer(),
        }
    }

    /// Number of product pairs explored for `root`.
    pub fn reached_pairs(&self, root: DawgId) -> usize {
        self.index
            .get(&root)
            .map_or(0, |&i| self.tracked[i].reach.parent.len())
    }

    /// The witness path of an Under acceptance. Every transition on it is
    /// enabled in the Under view as of the last update.
    pub fn path(&self, root: DawgId, state: StateId) -> Option<Vec<Transition>> {
        debug_assert_eq!(self.view, View::Under, "Concrete paths come from the Under view");
        self.witness(root, state)
    }

    /// A candidate witness from the Over view, for heuristics only: it may
    /// rely on transitions that are later disabled.
    pub fn abstract_path(&self, root: DawgId, state: StateId) -> Option<Vec<Transition>> {
        debug_assert_eq!(self.view, View::Over, "Abstract paths come from the Over view");
        self.witness(root, state)
    }

    fn witness(&self, root: DawgId, state: StateId) -> Option<Vec<Transition>> {
        let tracked = &self.tracked[*self.index.get(&root)?];
        if !tracked.computed {
            return None;
        }
        let &word = tracked.reach.accepting.get(&state)?;
        let mut path = Vec::new();
        let mut current = (word, state);
        while let Some(step) = tracked.reach.parent[&current] {
            path.push(step.transition);
            current = step.prev;
        }
        debug_assert_eq!(current, (root, self.source));
        path.reverse();
        Some(path)
    }

    /// Transitions that became enabled and disabled under this view since the last update.
    fn diff(&self, fsm: &DynamicFsm) -> (Vec<Transition>, HashSet<Transition>) {
        let mut first_old = BTreeMap::new();
        for change in fsm.changes_since(self.cursor) {
            first_old.entry(change.transition).or_insert(change.old);
        }
        let mut added = Vec::new();
        let mut removed = HashSet::new();
        for (t, old) in first_old {
            let before = self.view.enables(old);
            let now = fsm.enabled(self.view, t.edge, t.label);
            if now && !before {
                added.push(t);
            } else if before && !now {
                removed.insert(t);
            }
        }
        (added, removed)
    }

    /// Brings every tracked root up to date with the automaton and trie, and
    /// pushes the resulting flips onto `flips`.
    ///
    /// Calling it again without an intervening change does nothing.
    pub fn update(&mut self, fsm: &DynamicFsm, dawg: &Dawg, flips: &mut Vec<AcceptFlip>) {
        let pending = self.tracked.iter().any(|t| !t.computed);
        if self.fsm_version == Some(fsm.version())
            && self.dawg_version == dawg.version()
            && !pending
            && !self.stale
            && !self.resync
        {
            return;
        }
        self.num_updates += 1;

        let rebuild = self.fsm_version.is_none()
            || self.structure_version != fsm.structure_version()
            || self.dawg_version != dawg.version()
            || self.cursor > fsm.history_len();
        let (added, removed) = if rebuild {
            (Vec::new(), HashSet::new())
        } else {
            self.diff(fsm)
        };

        for tracked in &mut self.tracked {
            let invalidated = removed.iter().any(|t| tracked.reach.used.contains(t));
            if rebuild || !tracked.computed || invalidated {
                debug!("{} detector: exploring root {} from scratch", self.view, tracked.root);
                tracked
                    .reach
                    .recompute(self.view, self.source, tracked.root, fsm, dawg);
                tracked.computed = true;
                self.stats.recomputes += 1;
            } else if !added.is_empty() {
                tracked.reach.extend(self.view, fsm, dawg, &added);
                self.stats.extensions += 1;
            }
        }

        self.fsm_version = Some(fsm.version());
        self.structure_version = fsm.structure_version();
        self.dawg_version = dawg.version();
        self.cursor = fsm.history_len();
        self.report(flips);
        self.resync = false;
        self.stale = false;
    }

    fn report(&mut self, flips: &mut Vec<AcceptFlip>) {
        let resync = self.resync;
        for tracked in &mut self.tracked {
            for (&state, track) in tracked.states.iter_mut() {
                let accepts = tracked.reach.accepting.contains_key(&state);
                if accepts == track.last && !resync {
                    continue;
                }
                track.last = accepts;
                if (accepts && track.want_true) || (!accepts && track.want_false) {
                    trace!(
                        "{} detector: root {} at state {} -> {}",
                        self.view,
                        tracked.root,
                        state,
                        accepts
                    );
                    self.stats.flips += 1;
                    flips.push(AcceptFlip {
                        root: tracked.root,
                        state,
                        accepts,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::types::LBool;

    /// s0 --a--> s1 with the `a` slot undecided, tracking "a" at s1.
    fn single_edge() -> (DynamicFsm, Dawg, DawgId) {
        let mut fsm = DynamicFsm::new(2, false);
        let s0 = fsm.add_state();
        let s1 = fsm.add_state();
        let e = fsm.add_edge(s0, s1);
        fsm.set_value(e, 1, LBool::Undef);
        let mut dawg = Dawg::new();
        let root = dawg.new_root();
        dawg.insert(root, &[1]);
        (fsm, dawg, root)
    }

    #[test]
    fn test_under_and_over_answers() {
        let (mut fsm, dawg, root) = single_edge();
        let mut under = AcceptDetector::new(View::Under, 0);
        let mut over = AcceptDetector::new(View::Over, 0);
        under.set_tracking(root, 1, true, true);
        over.set_tracking(root, 1, true, true);

        let mut flips = Vec::new();
        under.update(&fsm, &dawg, &mut flips);
        over.update(&fsm, &dawg, &mut flips);
        assert!(flips.is_empty());
        assert!(!under.accepts(root, 1));
        assert!(over.accepts(root, 1));
        assert!(!over.accepts(root, 0));

        fsm.set_value(0, 1, LBool::True);
        under.update(&fsm, &dawg, &mut flips);
        over.update(&fsm, &dawg, &mut flips);
        assert_eq!(
            flips,
            vec![AcceptFlip {
                root,
                state: 1,
                accepts: true
            }]
        );
        assert_eq!(under.path(root, 1), Some(vec![Transition::new(0, 1)]));
    }

    #[test]
    fn test_update_is_idempotent() {
        let (mut fsm, dawg, root) = single_edge();
        let mut over = AcceptDetector::new(View::Over, 0);
        over.set_tracking(root, 1, true, true);
        fsm.set_value(0, 1, LBool::False);

        let mut flips = Vec::new();
        over.update(&fsm, &dawg, &mut flips);
        assert_eq!(flips.len(), 1);
        let updates = over.num_updates();
        let answer = over.accepts(root, 1);

        flips.clear();
        over.update(&fsm, &dawg, &mut flips);
        assert!(flips.is_empty());
        assert_eq!(over.num_updates(), updates);
        assert_eq!(over.accepts(root, 1), answer);
    }

    #[test]
    fn test_disabling_used_transition_recomputes() {
        let (mut fsm, dawg, root) = single_edge();
        let mut over = AcceptDetector::new(View::Over, 0);
        over.set_tracking(root, 1, true, true);
        let mut flips = Vec::new();
        over.update(&fsm, &dawg, &mut flips);
        assert!(over.accepts(root, 1));
        let recomputes = over.stats().recomputes;

        fsm.set_value(0, 1, LBool::False);
        over.update(&fsm, &dawg, &mut flips);
        assert!(!over.accepts(root, 1));
        assert_eq!(over.stats().recomputes, recomputes + 1);
        assert_eq!(flips.len(), 1);
        assert!(!flips[0].accepts);
    }

    #[test]
    fn test_enabling_extends() {
        // s0 --a--> s1 --b--> s2, tracking "ab" at s2
        let mut fsm = DynamicFsm::new(3, false);
        let s0 = fsm.add_state();
        let s1 = fsm.add_state();
        let s2 = fsm.add_state();
        let e01 = fsm.add_edge(s0, s1);
        let e12 = fsm.add_edge(s1, s2);
        fsm.set_value(e01, 1, LBool::True);
        fsm.set_value(e12, 2, LBool::Undef);
        let mut dawg = Dawg::new();
        let root = dawg.new_root();
        dawg.insert(root, &[1, 2]);

        let mut under = AcceptDetector::new(View::Under, s0);
        under.set_tracking(root, s2, true, true);
        let mut flips = Vec::new();
        under.update(&fsm, &dawg, &mut flips);
        assert!(!under.accepts(root, s2));

        fsm.set_value(e12, 2, LBool::True);
        under.update(&fsm, &dawg, &mut flips);
        assert!(under.accepts(root, s2));
        assert_eq!(under.stats().extensions, 1);
        assert_eq!(
            under.path(root, s2),
            Some(vec![Transition::new(e01, 1), Transition::new(e12, 2)])
        );
    }

    #[test]
    fn test_empty_string_without_emoves() {
        let (fsm, mut dawg, _) = single_edge();
        let empty = dawg.new_root();
        let mut over = AcceptDetector::new(View::Over, 0);
        over.set_tracking(empty, 0, true, true);
        over.set_tracking(empty, 1, true, true);
        let mut flips = Vec::new();
        over.update(&fsm, &dawg, &mut flips);
        assert!(over.accepts(empty, 0));
        assert!(!over.accepts(empty, 1));
        assert_eq!(over.reached_pairs(empty), 1);
    }

    #[test]
    fn test_epsilon_moves() {
        let mut fsm = DynamicFsm::new(2, true);
        let s0 = fsm.add_state();
        let s1 = fsm.add_state();
        let s2 = fsm.add_state();
        let eps = fsm.add_edge(s0, s1);
        let a = fsm.add_edge(s1, s2);
        fsm.set_value(eps, EPSILON, LBool::Undef);
        fsm.set_value(a, 1, LBool::True);
        let mut dawg = Dawg::new();
        let empty = dawg.new_root();
        let word = dawg.new_root();
        dawg.insert(word, &[1]);

        let mut under = AcceptDetector::new(View::Under, s0);
        let mut over = AcceptDetector::new(View::Over, s0);
        for detector in [&mut under, &mut over] {
            detector.set_tracking(empty, s1, true, true);
            detector.set_tracking(word, s2, true, true);
        }
        let mut flips = Vec::new();
        under.update(&fsm, &dawg, &mut flips);
        over.update(&fsm, &dawg, &mut flips);
        assert!(over.accepts(empty, s1));
        assert!(over.accepts(word, s2));
        assert!(!under.accepts(empty, s1));
        assert!(!under.accepts(word, s2));

        fsm.set_value(eps, EPSILON, LBool::True);
        under.update(&fsm, &dawg, &mut flips);
        assert!(under.accepts(empty, s1));
        assert!(under.accepts(word, s2));
        assert_eq!(
            under.path(word, s2),
            Some(vec![Transition::new(eps, EPSILON), Transition::new(a, 1)])
        );
    }

    #[test]
    fn test_tracking_filters_and_resync() {
        let (mut fsm, dawg, root) = single_edge();
        let mut under = AcceptDetector::new(View::Under, 0);
        under.set_tracking(root, 1, false, true);
        fsm.set_value(0, 1, LBool::True);

        let mut flips = Vec::new();
        under.update(&fsm, &dawg, &mut flips);
        assert!(under.accepts(root, 1));
        assert!(flips.is_empty());

        under.set_tracking(root, 1, true, true);
        under.update(&fsm, &dawg, &mut flips);
        assert!(flips.is_empty());

        under.resync();
        under.update(&fsm, &dawg, &mut flips);
        assert_eq!(flips.len(), 1);
        assert!(flips[0].accepts);
    }
}
