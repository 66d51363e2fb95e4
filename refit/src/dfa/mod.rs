//! # Deterministic Finite Automaton
//! The DFA module includes the [Dfa] struct, the hypothesis representation of the
//! [RPNI learner](crate::rpni). In contrast to a classical, total automaton, the transition
//! function here is *partial*: a missing edge rejects. [Dfa::complete] materialises a sink state
//! so that the function becomes total when an algorithm needs it to be (the learner completes
//! every candidate before simulating the negative samples over it).
//!
//! ## Example
//! A DFA can be built directly from its parts, with the alphabet in ascending order and one
//! transition slot per alphabet symbol:
//! ```
//! use refit::dfa::{Dfa, DfaState};
//!
//! // Accepts 'a'-words of odd length
//! let mut dfa = Dfa::try_new(
//!     vec!['a'],
//!     vec![
//!         DfaState::new(false, vec![Some(1)]),
//!         DfaState::new(true, vec![Some(0)]),
//!     ],
//!     0,
//! )
//! .unwrap();
//! assert!(dfa.accepts("a"));
//! assert!(!dfa.accepts("aa"));
//! assert!(dfa.accepts("aaa"));
//!
//! // Already total: completing it changes nothing
//! assert!(dfa.is_complete());
//! dfa.complete();
//! assert_eq!(dfa.states().len(), 2);
//! ```
//!
//! ## Operations
//! * Checking word acceptance with [Dfa::accepts], or step-by-step with the
//!   [evaluator](DfaEvaluator)
//! * [Completing](Dfa::complete) the transition function with a sink state
//! * Checking [language equivalence](Dfa::equivalent_to) of two automata over the same alphabet
//! * Rendering the transition table as text with [Dfa::to_table]
//!
//! Learned automata come out of [crate::rpni::learn], and convert to right-linear grammars with
//! [crate::grammar::Grammar::from_dfa].

use crate::table::Table;
pub use eval::DfaEvaluator;
use std::collections::HashSet;
use std::rc::Rc;
use thiserror::Error;

pub mod eval;

/// A [Deterministic finite automaton](https://en.wikipedia.org/wiki/Deterministic_finite_automaton)
/// over an alphabet of single characters, defined by its *alphabet*, a *set of states*, one of the
/// states being its *initial state*, a subset of its states being *accepting states*, and a
/// partial *transition function* from each state upon seeing each element of the alphabet. See the
/// [module-level documentation](crate::dfa) for more info.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dfa {
    pub(crate) alphabet: Rc<[char]>,
    pub(crate) states: Vec<DfaState>,
    pub(crate) initial_state: usize,
}

/// A state in a DFA, which consists of whether it is accepting and the transition (if any) for
/// each element of the alphabet, in the alphabet's ordering
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DfaState {
    pub(crate) accepting: bool,
    pub(crate) transitions: Vec<Option<usize>>,
}

/// Errors from assembling a [Dfa] out of parts
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DfaError {
    #[error("alphabet must be strictly ascending (offending symbol {0:?})")]
    AlphabetNotSorted(char),
    #[error("state {0} has {1} transition slots, expected {2}")]
    WrongNumberOfTransitions(usize, usize, usize),
    #[error("state {0} transitions to non-existent state {1}")]
    TransitionOutOfRange(usize, usize),
    #[error("initial state {0} does not exist")]
    InitialOutOfRange(usize),
}

impl DfaState {
    /// Creates a state from its acceptance flag and its transition slots (one per alphabet
    /// symbol, in alphabet order; `None` is a missing edge)
    pub fn new(accepting: bool, transitions: Vec<Option<usize>>) -> Self {
        Self {
            accepting,
            transitions,
        }
    }

    /// Checks if this state is accepting
    pub fn is_accepting(&self) -> bool {
        self.accepting
    }

    /// Gets the transitions, as optional state indices for each element of the alphabet, in the
    /// alphabet's ordering
    pub fn transitions(&self) -> &[Option<usize>] {
        self.transitions.as_slice()
    }
}

impl Dfa {
    /// Assembles a DFA from its parts, checking that the alphabet is strictly ascending, that
    /// every state has one transition slot per alphabet symbol, and that all targets exist.
    pub fn try_new(
        alphabet: Vec<char>,
        states: Vec<DfaState>,
        initial_state: usize,
    ) -> Result<Self, DfaError> {
        use DfaError::*;
        for pair in alphabet.windows(2) {
            if pair[0] >= pair[1] {
                return Err(AlphabetNotSorted(pair[1]));
            }
        }
        if initial_state >= states.len() {
            return Err(InitialOutOfRange(initial_state));
        }
        for (idx, state) in states.iter().enumerate() {
            if state.transitions.len() != alphabet.len() {
                return Err(WrongNumberOfTransitions(
                    idx,
                    state.transitions.len(),
                    alphabet.len(),
                ));
            }
            if let Some(&target) = state
                .transitions
                .iter()
                .flatten()
                .find(|&&t| t >= states.len())
            {
                return Err(TransitionOutOfRange(idx, target));
            }
        }
        Ok(Dfa {
            alphabet: alphabet.into(),
            states,
            initial_state,
        })
    }

    /// Checks if this automaton accepts the given word. This is equivalent to getting the
    /// evaluator, stepping it over the word and checking if it is accepting. A missing edge
    /// along the way rejects.
    pub fn accepts(&self, word: &str) -> bool {
        let mut eval = self.evaluator();
        eval.step_word(word);
        eval.is_accepting()
    }

    /// Gets an evaluator, which is a struct that is used to evaluate words with the automaton
    pub fn evaluator(&self) -> DfaEvaluator<'_> {
        self.into()
    }

    /// Checks if the transition function is total, that is, if no transition slot is empty
    pub fn is_complete(&self) -> bool {
        self.states
            .iter()
            .all(|s| s.transitions.iter().all(Option::is_some))
    }

    /// Makes the transition function total by pointing every missing edge to a fresh,
    /// non-accepting sink state which loops to itself on every symbol. Does nothing when the
    /// function is already total or the alphabet is empty.
    pub fn complete(&mut self) {
        if self.alphabet.is_empty() || self.is_complete() {
            return;
        }
        let sink = self.states.len();
        for state in &mut self.states {
            for slot in &mut state.transitions {
                slot.get_or_insert(sink);
            }
        }
        self.states.push(DfaState {
            accepting: false,
            transitions: vec![Some(sink); self.alphabet.len()],
        });
    }

    /// Looks up the index of a symbol in the alphabet
    pub fn symbol_index(&self, symbol: char) -> Option<usize> {
        self.alphabet.binary_search(&symbol).ok()
    }

    /// Checks if this DFA is equivalent to another DFA, that is, if they accept the same
    /// language. If the automata have different alphabets they are never equivalent; the number
    /// of states and the particular transitions don't matter.
    ///
    /// ```
    /// use refit::dfa::{Dfa, DfaState};
    ///
    /// let odd = Dfa::try_new(
    ///     vec!['a'],
    ///     vec![
    ///         DfaState::new(false, vec![Some(1)]),
    ///         DfaState::new(true, vec![Some(0)]),
    ///     ],
    ///     0,
    /// )
    /// .unwrap();
    /// // Same language with a redundant extra state
    /// let odd_too = Dfa::try_new(
    ///     vec!['a'],
    ///     vec![
    ///         DfaState::new(false, vec![Some(1)]),
    ///         DfaState::new(true, vec![Some(2)]),
    ///         DfaState::new(false, vec![Some(1)]),
    ///     ],
    ///     0,
    /// )
    /// .unwrap();
    /// assert!(odd.equivalent_to(&odd_too));
    /// ```
    // Walks the reachable part of the product automaton. States are Option<usize> so that a
    // missing edge lands on `None`, which behaves as a rejecting sink; partial and completed
    // automata therefore compare correctly.
    pub fn equivalent_to(&self, other: &Dfa) -> bool {
        if self.alphabet != other.alphabet {
            return false;
        }

        let start = (Some(self.initial_state), Some(other.initial_state));
        let mut pending = vec![start];
        let mut visited = HashSet::from([start]);

        while let Some((left, right)) = pending.pop() {
            let left_accepts = left.map_or(false, |idx| self.states[idx].accepting);
            let right_accepts = right.map_or(false, |idx| other.states[idx].accepting);
            if left_accepts != right_accepts {
                // a word reaching this pair distinguishes the two languages
                return false;
            }
            for slot in 0..self.alphabet.len() {
                let pair = (
                    left.and_then(|idx| self.states[idx].transitions[slot]),
                    right.and_then(|idx| other.states[idx].transitions[slot]),
                );
                if visited.insert(pair) {
                    pending.push(pair);
                }
            }
        }
        true
    }

    /// Generates a text rendition of the transition table, suitable for logging. States are
    /// named `q0`, `q1`, ... in index order; `->` marks the initial state and `*` marks
    /// accepting states; missing edges render as `-`.
    pub fn to_table(&self) -> String {
        let mut table = Table::default();

        let mut head = vec![String::new(), String::new(), String::new()];
        head.extend(self.alphabet.iter().map(char::to_string));
        table.row(head);

        for (idx, state) in self.states.iter().enumerate() {
            let mut row = vec![
                if idx == self.initial_state { "->" } else { "" }.to_string(),
                if state.accepting { "*" } else { "" }.to_string(),
                format!("q{idx}"),
            ];
            row.extend(state.transitions.iter().map(|t| match t {
                Some(target) => format!("q{target}"),
                None => "-".to_string(),
            }));
            table.row(row);
        }
        table.render()
    }

    /// Gets the alphabet of this DFA, in ascending order
    pub fn alphabet(&self) -> &[char] {
        &self.alphabet
    }

    /// Gets the states of this DFA
    pub fn states(&self) -> &[DfaState] {
        self.states.as_slice()
    }

    /// Gets the initial state of this DFA
    pub fn initial_state(&self) -> &DfaState {
        &self.states[self.initial_state]
    }

    /// Get the index of the initial state of this DFA
    pub fn initial_state_index(&self) -> usize {
        self.initial_state
    }
}
