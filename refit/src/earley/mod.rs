//! # Error-correcting Earley parsing
//! The Earley module contains the [Corrector] struct, which repairs a broken string against a
//! learned right-linear grammar. Construction builds a *covering grammar* (see [cover]): every
//! expected terminal gains alternatives for insertion, deletion and substitution, each charged a
//! penalty of 1, and the start symbol gains a trailing-junk wrapper. A broken string is then
//! parsed with an Earley chart that tracks the accumulated penalty of every state, and the
//! cheapest finished parse is projected back onto the base grammar.
//!
//! ## Example
//! ```
//! use refit::earley::Corrector;
//! use refit::grammar::Grammar;
//! use refit::dfa::{Dfa, DfaState};
//! use refit::Config;
//!
//! // A grammar accepting exactly "ab"
//! let dfa = Dfa::try_new(
//!     vec!['a', 'b'],
//!     vec![
//!         DfaState::new(false, vec![Some(1), None]),
//!         DfaState::new(false, vec![None, Some(2)]),
//!         DfaState::new(true, vec![None, None]),
//!     ],
//!     0,
//! )
//! .unwrap();
//! let grammar = Grammar::from_dfa(&dfa);
//! let corrector = Corrector::new(&grammar);
//! let config = Config::default();
//!
//! // Accepted as-is: unchanged at penalty 0
//! let fix = corrector.correct("ab", &config).unwrap();
//! assert_eq!((fix.output.as_str(), fix.penalty), ("ab", 0));
//!
//! // One substituted character
//! let fix = corrector.correct("ax", &config).unwrap();
//! assert_eq!((fix.output.as_str(), fix.penalty), ("ab", 1));
//!
//! // Trailing junk is trimmed, one penalty point per junk character
//! let fix = corrector.correct("abzz", &config).unwrap();
//! assert_eq!((fix.output.as_str(), fix.penalty), ("ab", 2));
//! ```
//!
//! ## Chart
//! The chart holds one column per input position (plus one past the end). States are
//! arena-allocated and de-duplicated per column by (name, rule, dot, origin); when a cheaper
//! duplicate arrives it replaces the costlier one and is re-queued. States whose penalty
//! exceeds the configured cap are pruned, which bounds the chart on long inputs. Each parse
//! attempt runs against a wall-clock deadline; a timed-out attempt is retried with the cap
//! halved, then with cap 1, and only then surfaces [ParseError::Timeout].

use crate::config::Config;
use crate::grammar::{Grammar, Symbol};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, warn};

mod cover;
mod forest;

/// Errors from a repair attempt
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// No finished parse of the wrapped start symbol survived pruning
    #[error("no parse of the input within the penalty cap")]
    NoParse,
    /// Every attempt of the retry ladder exceeded its deadline
    #[error("parsing exceeded the configured deadline")]
    Timeout,
}

/// A repaired string together with the penalty (edit cost) of the chosen parse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correction {
    pub output: String,
    pub penalty: u32,
}

/// An error-correcting parser for one base grammar. Building one is comparatively expensive
/// (the covering grammar has a few rules per distinct terminal), so it is constructed once and
/// reused for every broken input of the same format.
#[derive(Debug, Clone)]
pub struct Corrector {
    /// Covering-grammar productions, pre-shared for cheap state creation
    rules: IndexMap<Rc<str>, Vec<Rc<[Symbol]>>>,
    nullable: HashMap<Rc<str>, u32>,
    start: Rc<str>,
}

type StateId = usize;

/// A dotted production item plus its accumulated correction penalty
#[derive(Debug, Clone)]
pub(crate) struct State {
    pub(crate) name: Rc<str>,
    pub(crate) rule: Rc<[Symbol]>,
    pub(crate) dot: usize,
    pub(crate) start_col: usize,
    pub(crate) end_col: usize,
    pub(crate) penalty: u32,
}

/// The de-duplication key of a state within a column
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StateKey {
    name: Rc<str>,
    rule: Rc<[Symbol]>,
    dot: usize,
    start_col: usize,
}

impl State {
    fn new(name: Rc<str>, rule: Rc<[Symbol]>, start_col: usize) -> Self {
        let penalty = cover::base_penalty(&name);
        Self {
            name,
            rule,
            dot: 0,
            start_col,
            end_col: start_col,
            penalty,
        }
    }

    pub(crate) fn finished(&self) -> bool {
        self.dot >= self.rule.len()
    }

    pub(crate) fn at_dot(&self) -> Option<&Symbol> {
        self.rule.get(self.dot)
    }

    fn advanced(&self) -> Self {
        let mut next = self.clone();
        next.dot += 1;
        next
    }

    fn key(&self) -> StateKey {
        StateKey {
            name: self.name.clone(),
            rule: self.rule.clone(),
            dot: self.dot,
            start_col: self.start_col,
        }
    }
}

/// One column of the chart: the input letter it consumes, the processing queue, and the
/// per-key winners
#[derive(Debug)]
pub(crate) struct Column {
    pub(crate) letter: Option<char>,
    pub(crate) entries: Vec<StateId>,
    unique: HashMap<StateKey, StateId>,
}

#[derive(Debug)]
pub(crate) struct Chart {
    pub(crate) states: Vec<State>,
    pub(crate) columns: Vec<Column>,
}

impl Chart {
    fn new(input: &str) -> Self {
        let mut columns = vec![Column {
            letter: None,
            entries: vec![],
            unique: HashMap::new(),
        }];
        columns.extend(input.chars().map(|c| Column {
            letter: Some(c),
            entries: vec![],
            unique: HashMap::new(),
        }));
        Self {
            states: vec![],
            columns,
        }
    }

    /// Adds a state to a column unless it exceeds the penalty cap. A cheaper state replaces an
    /// existing one with the same key and is queued again; a costlier duplicate is dropped.
    fn add(&mut self, col: usize, mut state: State, cap: u32) -> Option<StateId> {
        if state.penalty > cap {
            return None;
        }
        state.end_col = col;
        let key = state.key();
        if let Some(&existing) = self.columns[col].unique.get(&key) {
            if self.states[existing].penalty <= state.penalty {
                return Some(existing);
            }
        }
        let id = self.states.len();
        self.states.push(state);
        self.columns[col].unique.insert(key, id);
        self.columns[col].entries.push(id);
        Some(id)
    }

    /// Checks that a state is still the per-key winner of its column (it may have been
    /// superseded by a cheaper duplicate after it was queued)
    pub(crate) fn is_winner(&self, id: StateId) -> bool {
        let state = &self.states[id];
        self.columns[state.end_col].unique.get(&state.key()) == Some(&id)
    }
}

impl Corrector {
    /// Builds the error-correcting parser for a base grammar. The covering grammar and the
    /// penalty-weighted nullable map are computed once here.
    pub fn new(base: &Grammar) -> Self {
        let covering = cover::covering(base);
        let nullable = cover::nullable_penalties(&covering);
        let start = covering.start.clone();
        let rules = covering
            .rules
            .iter()
            .map(|(name, productions)| {
                (
                    name.clone(),
                    productions
                        .iter()
                        .map(|production| Rc::from(production.as_slice()))
                        .collect(),
                )
            })
            .collect();
        Self {
            rules,
            nullable,
            start,
        }
    }

    /// Repairs `input` into a string of the base grammar's language, at minimum edit penalty
    /// (or at `config.target_penalty`, when requested and reachable). See the
    /// [module documentation](crate::earley) for the retry and pruning behaviour.
    pub fn correct(&self, input: &str, config: &Config) -> Result<Correction, ParseError> {
        let mut caps = vec![config.max_penalty];
        for cap in [config.max_penalty / 2, 1] {
            if cap >= 1 && cap < *caps.last().expect("ladder starts non-empty") {
                caps.push(cap);
            }
        }

        for (attempt, &cap) in caps.iter().enumerate() {
            let deadline = Instant::now() + config.parse_timeout;
            match self.parse(input, cap, deadline) {
                Ok(chart) => {
                    debug!(
                        cap,
                        columns = chart.columns.len(),
                        states = chart.states.len(),
                        "chart filled"
                    );
                    return forest::extract_correction(
                        &chart,
                        &self.start,
                        config.target_penalty,
                        config.seed,
                    );
                }
                Err(ParseError::Timeout) if attempt + 1 < caps.len() => {
                    // the chart is dropped before the cheaper retry
                    warn!(cap, "parse attempt timed out, retrying with a smaller cap");
                }
                Err(err) => return Err(err),
            }
        }
        Err(ParseError::Timeout)
    }

    /// Fills the chart for an input under a penalty cap, aborting at the deadline
    fn parse(&self, input: &str, cap: u32, deadline: Instant) -> Result<Chart, ParseError> {
        let mut chart = Chart::new(input);
        for rule in self.rules[&self.start].clone() {
            chart.add(0, State::new(self.start.clone(), rule, 0), cap);
        }

        for col in 0..chart.columns.len() {
            let mut next = 0;
            while next < chart.columns[col].entries.len() {
                if Instant::now() > deadline {
                    return Err(ParseError::Timeout);
                }
                let id = chart.columns[col].entries[next];
                next += 1;
                let state = chart.states[id].clone();
                if state.finished() {
                    self.complete(&mut chart, col, &state, cap);
                } else {
                    match state.at_dot().expect("unfinished state has a dot symbol") {
                        Symbol::NonTerminal(name) => {
                            self.predict(&mut chart, col, &name.clone(), &state, cap)
                        }
                        terminal => {
                            if col + 1 < chart.columns.len() {
                                Self::scan(&mut chart, col + 1, &state, &terminal.clone(), cap);
                            }
                        }
                    }
                }
            }
        }
        Ok(chart)
    }

    /// Adds the productions of the predicted nonterminal at this column; if the nonterminal is
    /// nullable, also advances the predicting parent directly, charging the nullable penalty
    fn predict(&self, chart: &mut Chart, col: usize, name: &Rc<str>, parent: &State, cap: u32) {
        if let Some(productions) = self.rules.get(name) {
            for rule in productions {
                chart.add(col, State::new(name.clone(), rule.clone(), col), cap);
            }
        }
        if let Some(&nullable_penalty) = self.nullable.get(name.as_ref()) {
            let mut advanced = parent.advanced();
            advanced.penalty += nullable_penalty;
            chart.add(col, advanced, cap);
        }
    }

    /// Advances every parent in the completed state's origin column that is waiting for its
    /// name, carrying the child's penalty over to the parent
    fn complete(&self, chart: &mut Chart, col: usize, state: &State, cap: u32) {
        let parents: Vec<StateId> = chart.columns[state.start_col]
            .entries
            .iter()
            .copied()
            .filter(|&pid| match chart.states[pid].at_dot() {
                Some(Symbol::NonTerminal(waiting)) => **waiting == *state.name,
                _ => false,
            })
            .collect();
        for pid in parents {
            let mut advanced = chart.states[pid].advanced();
            advanced.penalty += state.penalty;
            chart.add(col, advanced, cap);
        }
    }

    /// Moves a state over the next column's letter when the dot symbol matches it, rewriting a
    /// generic `$.`/`!a` dot symbol to the concrete letter that was seen
    fn scan(chart: &mut Chart, next_col: usize, state: &State, dot_symbol: &Symbol, cap: u32) {
        let letter = chart.columns[next_col]
            .letter
            .expect("every column after the first consumes a letter");
        if !dot_symbol.matches(letter) {
            return;
        }
        let mut advanced = state.advanced();
        if matches!(dot_symbol, Symbol::Any | Symbol::AnyExcept(_)) {
            let mut rule = state.rule.to_vec();
            rule[state.dot] = Symbol::Terminal(letter);
            advanced.rule = rule.into();
        }
        chart.add(next_col, advanced, cap);
    }
}
