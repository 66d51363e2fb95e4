//! # Passive DFA inference (blue-fringe RPNI)
//! Given finite sets of positive and negative samples, [learn] produces a [Dfa] accepting every
//! positive and rejecting every negative sample. The algorithm builds a
//! [prefix-tree acceptor](crate::pta) from the positives and then greedily merges its states:
//! RED states form the confirmed kernel, BLUE states are the frontier reachable from RED in one
//! step. Each BLUE state is merged into the first RED state such that the merged automaton still
//! rejects all negatives; if no such RED state exists, the BLUE state is promoted to RED.
//!
//! A merge operates on a *partition* of the tree nodes: merging two nodes unifies their classes,
//! and determinism is restored by *homomorphic propagation* — whenever two nodes share a class
//! and both step on the same symbol, the classes of their successors are unified too, until a
//! fixed point. Candidate partitions are materialised into a DFA (completed with a sink state so
//! that missing edges cannot hide an accepting path) and the negatives are simulated over it;
//! an inconsistent candidate is simply dropped, rolling the merge back.
//!
//! The whole procedure is deterministic: BLUE classes are processed in ascending node order, RED
//! states in the order they were created, and the partition is explored with stable worklists.
//! Two runs over the same samples yield identical automata, state numbering included.
//!
//! ```
//! use refit::rpni;
//!
//! let positives = vec!["a".to_string(), "b".to_string(), "ab".to_string(), "ba".to_string()];
//! let negatives = vec!["".to_string(), "aa".to_string(), "bb".to_string()];
//! let dfa = rpni::learn(&positives, &negatives);
//! // The learned automaton is consistent with both sample sets by construction
//! assert!(positives.iter().all(|p| dfa.accepts(p)));
//! assert!(negatives.iter().all(|n| !dfa.accepts(n)));
//! ```
//!
//! If no merge at all is consistent, the result is the prefix tree itself read as a DFA, which
//! is consistent by construction; `learn` therefore cannot fail on well-formed samples.

use crate::dfa::{Dfa, DfaState};
use crate::grammar::Grammar;
use crate::pta::Pta;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, trace};

/// A union-find partition over PTA nodes, kept as a flat representative vector. Rollback of a
/// failed merge is done by discarding the candidate clone and keeping the snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Partition {
    rep: Vec<usize>,
}

impl Partition {
    fn identity(len: usize) -> Self {
        Self {
            rep: (0..len).collect(),
        }
    }

    fn find(&self, mut v: usize) -> usize {
        while self.rep[v] != v {
            v = self.rep[v];
        }
        v
    }

    /// Points the class of `child` at the class of `parent`. Both arguments may be arbitrary
    /// members of their classes.
    fn union_into(&mut self, child: usize, parent: usize) {
        let child = self.find(child);
        let parent = self.find(parent);
        if child != parent {
            self.rep[child] = parent;
        }
    }
}

/// Learns a DFA consistent with the samples and converts it into a right-linear grammar in one
/// step. This is the usual entry point of the repair pipeline.
pub fn learn_grammar(positives: &[String], negatives: &[String]) -> Grammar {
    Grammar::from_dfa(&learn(positives, negatives))
}

/// Learns a DFA accepting every string in `positives` and rejecting every string in
/// `negatives`, using blue-fringe RPNI state merging. See the
/// [module-level documentation](crate::rpni) for the algorithm.
pub fn learn(positives: &[String], negatives: &[String]) -> Dfa {
    let mut pta = Pta::new();
    for word in positives {
        pta.add_path(word, true);
    }
    for word in negatives {
        pta.add_symbols(word);
    }
    let merger = Merger {
        pta: &pta,
        negatives,
    };
    let dfa = merger.learn();
    debug!(
        nodes = pta.len(),
        states = dfa.states().len(),
        alphabet = dfa.alphabet().len(),
        "rpni finished"
    );
    dfa
}

struct Merger<'a> {
    pta: &'a Pta,
    negatives: &'a [String],
}

impl Merger<'_> {
    fn learn(&self) -> Dfa {
        let n = self.pta.len();
        let mut partition = Partition::identity(n);
        // RED holds node ids in creation order; BLUE is recomputed every round
        let mut red: Vec<usize> = vec![0];

        loop {
            let blue = self.blue_fringe(&partition, &red);
            let Some(&qb) = blue.iter().next() else {
                break;
            };

            let mut merged = false;
            for &qr in &red {
                if partition.find(qr) == partition.find(qb) {
                    continue;
                }
                if let Some(candidate) = self.try_merge(&partition, qr, qb) {
                    trace!(qr, qb, "merge committed");
                    partition = candidate;
                    merged = true;
                    break;
                }
            }
            if !merged {
                trace!(qb, "promoted to red");
                red.push(qb);
            }
        }

        let mut dfa = self.materialize(&partition);
        dfa.complete();
        debug_assert!(self.consistent(&dfa), "committed partition must stay consistent");
        dfa
    }

    /// The classes reachable from a RED class in one step, excluding RED classes themselves,
    /// each named by its least node id. The least id is processed first.
    fn blue_fringe(&self, partition: &Partition, red: &[usize]) -> BTreeSet<usize> {
        let red_classes: BTreeSet<usize> = red.iter().map(|&r| partition.find(r)).collect();
        let mut class_names: HashMap<usize, usize> = HashMap::new();
        for v in 0..self.pta.len() {
            class_names.entry(partition.find(v)).or_insert(v);
        }

        let mut blue = BTreeSet::new();
        for v in 0..self.pta.len() {
            if !red_classes.contains(&partition.find(v)) {
                continue;
            }
            for (_, child) in self.pta.node(v).children() {
                let class = partition.find(child);
                if !red_classes.contains(&class) {
                    blue.insert(class_names[&class]);
                }
            }
        }
        blue
    }

    /// Attempts to merge the class of `qb` into the class of `qr` on a copy of the partition.
    /// Returns the propagated candidate if the materialised automaton still rejects every
    /// negative sample, and `None` (rollback) otherwise.
    fn try_merge(&self, partition: &Partition, qr: usize, qb: usize) -> Option<Partition> {
        let mut candidate = partition.clone();
        candidate.union_into(qb, qr);
        self.propagate(&mut candidate);

        let mut dfa = self.materialize(&candidate);
        dfa.complete();
        self.consistent(&dfa).then_some(candidate)
    }

    /// Homomorphic propagation: as long as two classmates step on the same symbol into
    /// different classes, unify those successor classes. Runs to a fixed point, scanning nodes
    /// in ascending order so the outcome is stable.
    fn propagate(&self, partition: &mut Partition) {
        loop {
            let mut changed = false;
            let mut chosen: HashMap<(usize, char), usize> = HashMap::new();
            for v in 0..self.pta.len() {
                let class = partition.find(v);
                for (symbol, child) in self.pta.node(v).children() {
                    let child_class = partition.find(child);
                    match chosen.get(&(class, symbol)) {
                        Some(&existing) => {
                            let existing = partition.find(existing);
                            if existing != child_class {
                                partition.union_into(child_class, existing);
                                changed = true;
                            }
                        }
                        None => {
                            chosen.insert((class, symbol), child_class);
                        }
                    }
                }
            }
            if !changed {
                break;
            }
        }
    }

    /// Reads the partition off as a DFA: classes become states, numbered densely in ascending
    /// order of their least node id (so the root class is always state 0), a class is accepting
    /// iff it contains an accepting node, and edges follow the (propagated, hence unambiguous)
    /// successor classes.
    fn materialize(&self, partition: &Partition) -> Dfa {
        let alphabet = self.pta.alphabet();
        let mut ids: HashMap<usize, usize> = HashMap::new();
        for v in 0..self.pta.len() {
            let next = ids.len();
            ids.entry(partition.find(v)).or_insert(next);
        }

        let mut states =
            vec![DfaState::new(false, vec![None; alphabet.len()]); ids.len()];
        for v in 0..self.pta.len() {
            let state = ids[&partition.find(v)];
            if self.pta.node(v).is_accepting() {
                states[state].accepting = true;
            }
            for (symbol, child) in self.pta.node(v).children() {
                let sym_idx = alphabet
                    .binary_search(&symbol)
                    .expect("edge label must be in the accumulated alphabet");
                states[state].transitions[sym_idx] = Some(ids[&partition.find(child)]);
            }
        }

        Dfa {
            alphabet: alphabet.into(),
            states,
            initial_state: ids[&partition.find(0)],
        }
    }

    fn consistent(&self, dfa: &Dfa) -> bool {
        self.negatives.iter().all(|negative| !dfa.accepts(negative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn epsilon_positive_makes_root_accepting() {
        let dfa = learn(&strings(&[""]), &strings(&["a"]));
        assert!(dfa.accepts(""));
        assert!(!dfa.accepts("a"));
        assert!(!dfa.accepts("aa"));
    }

    #[test]
    fn empty_positive_set_accepts_nothing() {
        let dfa = learn(&[], &strings(&["a", "b"]));
        assert!(!dfa.accepts(""));
        assert!(!dfa.accepts("a"));
        assert!(!dfa.accepts("ab"));
    }

    #[test]
    fn single_positive_without_negatives_generalises() {
        // With nothing to reject, everything merges into one accepting state
        let dfa = learn(&strings(&["aa"]), &[]);
        assert!(dfa.accepts("aa"));
        assert!(dfa.accepts("aaaa"));
    }

    #[test]
    fn merge_rollback_keeps_consistency() {
        let positives = strings(&["a", "b", "ab", "ba"]);
        let negatives = strings(&["", "aa", "bb", "aba", "bab"]);
        let dfa = learn(&positives, &negatives);
        for p in &positives {
            assert!(dfa.accepts(p), "should accept positive {p:?}");
        }
        for n in &negatives {
            assert!(!dfa.accepts(n), "should reject negative {n:?}");
        }
    }

    #[test]
    fn learning_is_deterministic() {
        let positives = strings(&["ab", "abab", "ba"]);
        let negatives = strings(&["", "a", "aa", "bb"]);
        let first = learn(&positives, &negatives);
        let second = learn(&positives, &negatives);
        assert_eq!(first, second);
    }
}
