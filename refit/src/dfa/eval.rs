use crate::dfa::{Dfa, DfaState};

/// A structure keeping track of the current state during the evaluation of a word. Once a
/// missing edge (or a symbol outside the alphabet) has been seen, the evaluator is *stuck* and
/// rejects everything from then on. The RPNI learner simulates its negative samples through
/// evaluators over completed candidate automata.
#[derive(Debug, Clone)]
pub struct DfaEvaluator<'a> {
    dfa: &'a Dfa,
    current_state: Option<usize>,
}

impl<'a> DfaEvaluator<'a> {
    pub fn is_accepting(&self) -> bool {
        self.current_state().map_or(false, DfaState::is_accepting)
    }

    pub fn current_state(&self) -> Option<&DfaState> {
        self.current_state.map(|idx| &self.dfa.states[idx])
    }

    /// The index of the current state, or `None` when the evaluator is stuck
    pub fn current_state_idx(&self) -> Option<usize> {
        self.current_state
    }

    /// Steps on one symbol, returning the new state, or `None` when the step got (or found the
    /// evaluator already) stuck
    pub fn step(&mut self, symbol: char) -> Option<&DfaState> {
        let state = self.current_state?;
        self.current_state = self
            .dfa
            .symbol_index(symbol)
            .and_then(|idx| self.dfa.states[state].transitions[idx]);
        self.current_state()
    }

    /// Steps over all characters of a word, returning the final state, or `None` when the
    /// evaluator got stuck along the way
    pub fn step_word(&mut self, word: &str) -> Option<&DfaState> {
        for symbol in word.chars() {
            self.step(symbol)?;
        }
        self.current_state()
    }
}

impl<'a> From<&'a Dfa> for DfaEvaluator<'a> {
    fn from(value: &'a Dfa) -> Self {
        Self {
            dfa: value,
            current_state: Some(value.initial_state),
        }
    }
}
