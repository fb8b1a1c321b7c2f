//! Activity-ordered variable heap for the decision heuristic.
//!
//! A binary max-heap of variables keyed by a decaying activity score, with a
//! position map for O(log n) bumps. Entries are removed lazily: the theory
//! pops a variable only when it is found consistent at decision time.

use crate::types::Var;

const NOT_IN_HEAP: usize = usize::MAX;
const RESCALE_LIMIT: f64 = 1e100;

#[derive(Debug, Clone)]
pub struct VarOrder {
    /// Activity per variable index (grows on demand).
    activities: Vec<f64>,
    heap: Vec<Var>,
    heap_pos: Vec<usize>,
    increment: f64,
    decay: f64,
}

impl Default for VarOrder {
    fn default() -> Self {
        Self::new(0.95)
    }
}

impl VarOrder {
    pub fn new(decay: f64) -> Self {
        assert!(decay > 0.0 && decay <= 1.0, "Decay must be in (0, 1]");
        Self {
            activities: Vec::new(),
            heap: Vec::new(),
            heap_pos: Vec::new(),
            increment: 1.0,
            decay,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    fn ensure(&mut self, var: Var) {
        let needed = var.index() + 1;
        if self.activities.len() < needed {
            self.activities.resize(needed, 0.0);
            self.heap_pos.resize(needed, NOT_IN_HEAP);
        }
    }

    pub fn activity(&self, var: Var) -> f64 {
        self.activities.get(var.index()).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, var: Var) -> bool {
        self.heap_pos
            .get(var.index())
            .is_some_and(|&pos| pos != NOT_IN_HEAP)
    }

    pub fn insert(&mut self, var: Var) {
        self.ensure(var);
        if self.contains(var) {
            return;
        }
        self.heap_pos[var.index()] = self.heap.len();
        self.heap.push(var);
        self.sift_up(self.heap.len() - 1);
    }

    /// The variable with the highest activity.
    pub fn peek(&self) -> Option<Var> {
        self.heap.first().copied()
    }

    pub fn pop(&mut self) -> Option<Var> {
        let top = *self.heap.first()?;
        let last = self.heap.len() - 1;
        self.swap(0, last);
        self.heap.pop();
        self.heap_pos[top.index()] = NOT_IN_HEAP;
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        Some(top)
    }

    pub fn bump(&mut self, var: Var) {
        self.ensure(var);
        self.activities[var.index()] += self.increment;
        if self.activities[var.index()] > RESCALE_LIMIT {
            self.rescale();
        }
        let pos = self.heap_pos[var.index()];
        if pos != NOT_IN_HEAP {
            self.sift_up(pos);
        }
    }

    /// Decays every activity by growing the increment instead.
    pub fn decay(&mut self) {
        self.increment /= self.decay;
    }

    fn rescale(&mut self) {
        for activity in &mut self.activities {
            *activity *= 1e-100;
        }
        self.increment *= 1e-100;
    }

    /// Higher activity first; ties go to the lower variable.
    fn before(&self, a: Var, b: Var) -> bool {
        let (x, y) = (self.activities[a.index()], self.activities[b.index()]);
        x > y || (x == y && a < b)
    }

    fn swap(&mut self, i: usize, j: usize) {
        self.heap.swap(i, j);
        self.heap_pos[self.heap[i].index()] = i;
        self.heap_pos[self.heap[j].index()] = j;
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if !self.before(self.heap[pos], self.heap[parent]) {
                break;
            }
            self.swap(pos, parent);
            pos = parent;
        }
    }

    fn sift_down(&mut self, mut pos: usize) {
        loop {
            let left = 2 * pos + 1;
            let right = left + 1;
            let mut best = pos;
            if left < self.heap.len() && self.before(self.heap[left], self.heap[best]) {
                best = left;
            }
            if right < self.heap.len() && self.before(self.heap[right], self.heap[best]) {
                best = right;
            }
            if best == pos {
                break;
            }
            self.swap(pos, best);
            pos = best;
        }
    }
}
