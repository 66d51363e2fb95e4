//! # Prefix-Tree Acceptor
//! The PTA module contains the [Pta] struct, a rooted tree whose edges are labelled with single
//! characters and whose paths from the root spell out the positive samples inserted into it. It is
//! the starting point of [RPNI inference](crate::rpni): the learner folds the tree into a DFA by
//! merging states.
//!
//! Positive samples are inserted structurally with [Pta::add_path]; negative samples only
//! contribute their characters to the accumulated alphabet (via [Pta::add_symbols]), since the
//! tree must spell out exactly the positive prefixes.
//!
//! ```
//! use refit::pta::Pta;
//!
//! let mut pta = Pta::new();
//! pta.add_path("ab", true);
//! pta.add_path("ac", true);
//! pta.add_symbols("d");
//! // Nodes: root, "a", "ab", "ac"
//! assert_eq!(pta.len(), 4);
//! // "a" is a proper prefix of a positive sample, not a sample itself
//! assert!(!pta.node(1).is_accepting());
//! assert!(pta.node(2).is_accepting());
//! // The alphabet also covers characters only seen in negative samples
//! assert_eq!(pta.alphabet(), vec!['a', 'b', 'c', 'd']);
//! ```

use std::collections::{BTreeMap, BTreeSet};

/// A prefix-tree acceptor. Node 0 is the root; there is exactly one node per distinct prefix of
/// any inserted positive sample, and a node is accepting iff some positive sample equals that
/// prefix. No two outgoing edges of a node share a label.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pta {
    pub(crate) nodes: Vec<PtaNode>,
    pub(crate) alphabet: BTreeSet<char>,
}

/// A node of a [Pta]: an acceptance flag plus the labelled edges to its children.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PtaNode {
    pub(crate) accepting: bool,
    pub(crate) children: BTreeMap<char, usize>,
}

impl PtaNode {
    /// Checks if this node corresponds to a full positive sample
    pub fn is_accepting(&self) -> bool {
        self.accepting
    }

    /// Gets the labelled edges to the children of this node, in ascending label order
    pub fn children(&self) -> impl Iterator<Item = (char, usize)> + '_ {
        self.children.iter().map(|(&c, &n)| (c, n))
    }
}

impl Default for Pta {
    fn default() -> Self {
        Self::new()
    }
}

impl Pta {
    /// Creates a prefix-tree acceptor containing only the (non-accepting) root
    pub fn new() -> Self {
        Self {
            nodes: vec![PtaNode::default()],
            alphabet: BTreeSet::new(),
        }
    }

    /// Inserts `word` into the tree, creating the missing nodes along its path. The node reached
    /// by the final character is marked accepting iff `is_positive`. All characters of `word`
    /// join the accumulated alphabet. Returns the index of the reached node.
    pub fn add_path(&mut self, word: &str, is_positive: bool) -> usize {
        let mut state = 0;
        for c in word.chars() {
            self.alphabet.insert(c);
            state = match self.nodes[state].children.get(&c) {
                Some(&next) => next,
                None => {
                    let next = self.nodes.len();
                    self.nodes.push(PtaNode::default());
                    self.nodes[state].children.insert(c, next);
                    next
                }
            };
        }
        if is_positive {
            self.nodes[state].accepting = true;
        }
        state
    }

    /// Adds the characters of `word` to the alphabet without inserting the word into the tree.
    /// This is how negative samples contribute to the alphabet.
    pub fn add_symbols(&mut self, word: &str) {
        self.alphabet.extend(word.chars());
    }

    /// Gets the number of nodes in the tree (at least 1, for the root)
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Checks if the tree consists of only the root
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Gets the node with the given index. The root has index 0.
    pub fn node(&self, idx: usize) -> &PtaNode {
        &self.nodes[idx]
    }

    /// Gets the accumulated alphabet in ascending order
    pub fn alphabet(&self) -> Vec<char> {
        self.alphabet.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_prefixes_share_nodes() {
        let mut pta = Pta::new();
        pta.add_path("abc", true);
        pta.add_path("abd", true);
        pta.add_path("ab", true);
        // root, a, ab, abc, abd
        assert_eq!(pta.len(), 5);
        assert!(pta.node(2).is_accepting());
        assert!(!pta.node(1).is_accepting());
    }

    #[test]
    fn empty_word_marks_root() {
        let mut pta = Pta::new();
        pta.add_path("", true);
        assert_eq!(pta.len(), 1);
        assert!(pta.node(0).is_accepting());
    }

    #[test]
    fn negative_symbols_join_alphabet_only() {
        let mut pta = Pta::new();
        pta.add_path("a", true);
        pta.add_symbols("xy");
        assert_eq!(pta.len(), 2);
        assert_eq!(pta.alphabet(), vec!['a', 'x', 'y']);
    }
}
