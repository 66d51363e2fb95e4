//! Parse-forest walking. After the chart is filled, the finished wrapper-start state with the
//! lowest penalty (or a requested exact penalty) is selected, one minimum-cost derivation tree
//! is extracted from the forest of possible derivations, and the tree is projected back onto
//! the base grammar: `<$[a]>` nodes emit their expected terminal and all other correction
//! machinery disappears, so the projected string is always a member of the base language.

use super::{Chart, Correction, ParseError, StateId};
use crate::earley::cover;
use crate::grammar::Symbol;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::rc::Rc;
use tracing::warn;

/// One element of a derivation path: a completed sub-state or a scanned input character
#[derive(Debug, Clone)]
enum Entry {
    Completed(StateId),
    Scanned(char),
}

/// An extracted derivation tree
#[derive(Debug, Clone)]
enum Tree {
    Node { name: Rc<str>, children: Vec<Tree> },
    Leaf(char),
}

/// Selects a finished start state from the last column and extracts its cheapest projection
pub(crate) fn extract_correction(
    chart: &Chart,
    start: &str,
    target_penalty: Option<u32>,
    seed: Option<u64>,
) -> Result<Correction, ParseError> {
    let last = chart.columns.len() - 1;
    let mut finished: Vec<StateId> = chart.columns[last]
        .entries
        .iter()
        .copied()
        .filter(|&id| {
            let state = &chart.states[id];
            state.finished()
                && &*state.name == start
                && state.start_col == 0
                && chart.is_winner(id)
        })
        .collect();
    if finished.is_empty() {
        return Err(ParseError::NoParse);
    }
    finished.sort_by_key(|&id| chart.states[id].penalty);

    let chosen = match target_penalty {
        Some(target) => finished
            .iter()
            .copied()
            .find(|&id| chart.states[id].penalty == target)
            .unwrap_or_else(|| {
                warn!(target, "no parse with the requested penalty, using the minimum instead");
                finished[0]
            }),
        None => finished[0],
    };
    let penalty = chart.states[chosen].penalty;

    let rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut extractor = Extractor {
        chart,
        rng,
        active: HashSet::new(),
    };
    let tree = extractor.node(chosen);

    let mut output = String::new();
    project(&tree, &mut output);
    Ok(Correction { output, penalty })
}

struct Extractor<'c> {
    chart: &'c Chart,
    rng: StdRng,
    /// States on the current extraction stack. Zero-width derivations can reference themselves
    /// through null productions; paths re-entering an active state are skipped.
    active: HashSet<StateId>,
}

impl Extractor<'_> {
    fn node(&mut self, id: StateId) -> Tree {
        let name = self.chart.states[id].name.clone();
        self.active.insert(id);
        let paths = self.paths(id);
        let tree = if paths.is_empty() {
            Tree::Node {
                name,
                children: vec![],
            }
        } else {
            let path = self.choose_path(paths);
            let children = path
                .into_iter()
                .map(|entry| match entry {
                    Entry::Completed(child) => self.node(child),
                    Entry::Scanned(c) => Tree::Leaf(c),
                })
                .collect();
            Tree::Node { name, children }
        };
        self.active.remove(&id);
        tree
    }

    /// All derivation paths of a completed state, in left-to-right rule order
    fn paths(&self, id: StateId) -> Vec<Vec<Entry>> {
        let state = &self.chart.states[id];
        if state.rule.is_empty() {
            return vec![];
        }
        let mut paths = self.segment(&state.rule, state.start_col, state.end_col);
        paths.retain(|path| {
            path.iter().all(|entry| match entry {
                Entry::Completed(child) => !self.active.contains(child),
                Entry::Scanned(_) => true,
            })
        });
        for path in &mut paths {
            path.reverse();
        }
        paths
    }

    /// Enumerates the ways `expr` spans columns `frm..til`, walking the rule from its last
    /// symbol backwards. Paths come out in reverse rule order.
    fn segment(&self, expr: &[Symbol], frm: usize, til: usize) -> Vec<Vec<Entry>> {
        let (last, prefix) = expr.split_last().expect("segment is called on non-empty rules");

        let mut starts: Vec<(Entry, usize)> = vec![];
        match last {
            Symbol::NonTerminal(name) => {
                for &id in &self.chart.columns[til].entries {
                    let state = &self.chart.states[id];
                    if state.finished()
                        && state.name == *name
                        && state.start_col >= frm
                        && self.chart.is_winner(id)
                    {
                        starts.push((Entry::Completed(id), state.start_col));
                    }
                }
            }
            terminal => {
                if til > 0 && self.chart.columns[til].letter.is_some_and(|l| terminal.matches(l)) {
                    let letter = self.chart.columns[til].letter.expect("checked above");
                    starts.push((Entry::Scanned(letter), til - 1));
                }
            }
        }

        let mut paths = vec![];
        for (entry, start) in starts {
            if prefix.is_empty() {
                if start == frm {
                    paths.push(vec![entry]);
                }
            } else {
                for rest in self.segment(prefix, frm, start) {
                    let mut path = Vec::with_capacity(rest.len() + 1);
                    path.push(entry.clone());
                    path.extend(rest);
                    paths.push(path);
                }
            }
        }
        paths
    }

    /// Picks a minimum-cost path, breaking ties uniformly at random. The cost of a path is the
    /// summed penalty of its completed sub-states; scanned characters are free.
    fn choose_path(&mut self, mut paths: Vec<Vec<Entry>>) -> Vec<Entry> {
        let cost = |path: &[Entry]| -> u32 {
            path.iter()
                .map(|entry| match entry {
                    Entry::Completed(id) => self.chart.states[*id].penalty,
                    Entry::Scanned(_) => 0,
                })
                .sum()
        };
        let costs: Vec<u32> = paths.iter().map(|path| cost(path)).collect();
        let min = *costs.iter().min().expect("choose_path needs at least one path");
        let cheapest: Vec<usize> = costs
            .iter()
            .enumerate()
            .filter_map(|(idx, &c)| (c == min).then_some(idx))
            .collect();
        let pick = cheapest[self.rng.gen_range(0..cheapest.len())];
        paths.swap_remove(pick)
    }
}

/// Projects a covering-grammar derivation tree back onto the base grammar
fn project(tree: &Tree, out: &mut String) {
    match tree {
        // scanned characters only ever appear under correction machinery; the expected
        // terminal is emitted from the <$[a]> node instead
        Tree::Leaf(_) => {}
        Tree::Node { name, children } => {
            if let Some(expected) = cover::expected_terminal(name) {
                out.push(expected);
                return;
            }
            if cover::is_machinery(name) {
                return;
            }
            for child in children {
                project(child, out);
            }
        }
    }
}
