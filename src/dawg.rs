//! Shared-prefix trie of tracked strings.
//!
//! A [`Dawg`] is an arena of nodes; each node maps alphabet labels to child
//! nodes. A root node represents the empty string, and the strings "spelled"
//! by a root are the label sequences along paths to its *word* nodes. Several
//! acceptance obligations over overlapping prefixes share one subtree, so a
//! single reachability sweep answers all of them.
//!
//! # Example
//!
//! ```
//! use fsm_accept::dawg::Dawg;
//!
//! let mut dawg = Dawg::new();
//! let root = dawg.new_root();
//! dawg.insert(root, &[1, 2]);
//! dawg.insert(root, &[1, 3]);
//!
//! let a = dawg.child(root, 1).unwrap();
//! assert_eq!(dawg.children(a).count(), 2);
//! assert_eq!(dawg.words(root), vec![vec![1, 2], vec![1, 3]]);
//! ```

use std::fmt;

use crate::fsm::Label;

/// A trie node identifier (index into the arena).
///
/// Ids are assigned when a node is created and never change or get reused.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DawgId(u32);

impl DawgId {
    pub const fn new(index: u32) -> Self {
        DawgId(index)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for DawgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

#[derive(Debug, Clone, Default)]
struct DawgNode {
    /// Children sorted by label.
    children: Vec<(Label, DawgId)>,
    /// Set when some inserted string ends exactly here.
    word: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Dawg {
    nodes: Vec<DawgNode>,
    version: u64,
}

impl Dawg {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes ever allocated.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Bumped on every structural change.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Allocates a fresh, childless node.
    pub fn new_root(&mut self) -> DawgId {
        let id = DawgId(self.nodes.len() as u32);
        self.nodes.push(DawgNode::default());
        self.version += 1;
        id
    }

    /// Returns the child of `node` along `label`, creating it if missing.
    pub fn child_or_insert(&mut self, node: DawgId, label: Label) -> DawgId {
        let found = self.nodes[node.index()]
            .children
            .binary_search_by_key(&label, |&(l, _)| l);
        match found {
            Ok(pos) => self.nodes[node.index()].children[pos].1,
            Err(pos) => {
                let child = self.new_root();
                self.nodes[node.index()].children.insert(pos, (label, child));
                child
            }
        }
    }

    /// Adds `word` below `root` and returns the node where it ends.
    pub fn insert(&mut self, root: DawgId, word: &[Label]) -> DawgId {
        let end = word
            .iter()
            .fold(root, |node, &label| self.child_or_insert(node, label));
        if !self.nodes[end.index()].word {
            self.nodes[end.index()].word = true;
            self.version += 1;
        }
        end
    }

    pub fn child(&self, node: DawgId, label: Label) -> Option<DawgId> {
        let children = &self.nodes[node.index()].children;
        children
            .binary_search_by_key(&label, |&(l, _)| l)
            .ok()
            .map(|pos| children[pos].1)
    }

    /// Children of `node` in ascending label order.
    pub fn children(&self, node: DawgId) -> impl Iterator<Item = (Label, DawgId)> + '_ {
        self.nodes[node.index()].children.iter().copied()
    }

    pub fn is_leaf(&self, node: DawgId) -> bool {
        self.nodes[node.index()].children.is_empty()
    }

    /// True if some string ends at `node`. A leaf always spells the empty suffix.
    pub fn is_word(&self, node: DawgId) -> bool {
        let node = &self.nodes[node.index()];
        node.word || node.children.is_empty()
    }

    /// Enumerates the strings spelled below `root`, in label order.
    pub fn words(&self, root: DawgId) -> Vec<Vec<Label>> {
        let mut words = Vec::new();
        let mut stack = vec![(root, Vec::new())];
        while let Some((node, prefix)) = stack.pop() {
            if self.is_word(node) {
                words.push(prefix.clone());
            }
            for (label, child) in self.children(node).collect::<Vec<_>>().into_iter().rev() {
                let mut word = prefix.clone();
                word.push(label);
                stack.push((child, word));
            }
        }
        words
    }

    /// Nodes below `root` (inclusive) in post-order: every node after all of its children.
    pub fn post_order(&self, root: DawgId) -> Vec<DawgId> {
        let mut order = Vec::new();
        let mut visited = vec![false; self.nodes.len()];
        // (node, children already pushed)
        let mut stack = vec![(root, false)];
        while let Some((node, expanded)) = stack.pop() {
            if expanded {
                order.push(node);
                continue;
            }
            if visited[node.index()] {
                continue;
            }
            visited[node.index()] = true;
            stack.push((node, true));
            for (_, child) in self.children(node) {
                if !visited[child.index()] {
                    stack.push((child, false));
                }
            }
        }
        order
    }
}
