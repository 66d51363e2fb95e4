//! # Right-linear grammars
//! The grammar module contains the [Grammar] struct, the exchange format between the
//! [RPNI learner](crate::rpni) and the [error-correcting Earley engine](crate::earley). A learned
//! [Dfa](crate::dfa::Dfa) converts into a right-linear grammar with [Grammar::from_dfa]:
//! every state `i` becomes a nonterminal `<Qi>`, every transition `i --a--> j` becomes a
//! production `<Qi> -> a <Qj>`, and every accepting state contributes the epsilon production
//! `<Qi> -> ε`.
//!
//! ```
//! use refit::dfa::{Dfa, DfaState};
//! use refit::grammar::Grammar;
//!
//! // Accepts 'a'-words of odd length
//! let dfa = Dfa::try_new(
//!     vec!['a'],
//!     vec![
//!         DfaState::new(false, vec![Some(1)]),
//!         DfaState::new(true, vec![Some(0)]),
//!     ],
//!     0,
//! )
//! .unwrap();
//! let grammar = Grammar::from_dfa(&dfa);
//! assert_eq!(grammar.start(), "<Q0>");
//! assert_eq!(
//!     grammar.to_string(),
//!     "<Q0> ::= a <Q1>\n<Q1> ::= ε | a <Q0>\n"
//! );
//!
//! // Right-linear grammars convert back into an equivalent automaton
//! let back = grammar.to_dfa().unwrap();
//! assert!(dfa.equivalent_to(&back));
//! ```
//!
//! The grammar symbols also cover the two *extended terminals* that only appear inside
//! [covering grammars](crate::earley): [Symbol::Any] (matches any single character) and
//! [Symbol::AnyExcept] (matches any single character but one). A grammar containing only
//! [Symbol::Terminal] and [Symbol::NonTerminal] is called a *base* grammar; only base grammars
//! may be [cached](cache).

use crate::dfa::{Dfa, DfaState};
use indexmap::IndexMap;
use std::fmt::{self, Display, Formatter};
use std::rc::Rc;
use thiserror::Error;

pub mod cache;

/// A single grammar symbol
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    /// A concrete single-character terminal
    Terminal(char),
    /// Extended terminal matching any single character (rendered `$.`)
    Any,
    /// Extended terminal matching any single character except the given one (rendered `!a`)
    AnyExcept(char),
    /// A reference to a nonterminal, by its bracketed name
    NonTerminal(Rc<str>),
}

/// One right-hand side of a production; the empty sequence is epsilon
pub type Production = Vec<Symbol>;

/// A context-free grammar with ordered rules. Productions of learned grammars are right-linear
/// (`A -> a B` or `A -> ε`); the covering grammars built by the Earley engine add longer
/// right-hand sides and extended terminals.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grammar {
    pub(crate) rules: IndexMap<Rc<str>, Vec<Production>>,
    pub(crate) start: Rc<str>,
    pub(crate) alphabet: Rc<[char]>,
}

/// Errors from converting a grammar back into a DFA
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GrammarError {
    #[error("production of {0} is not right-linear")]
    NotRightLinear(String),
    #[error("nonterminal {0} is referenced but not defined")]
    UndefinedNonTerminal(String),
    #[error("terminal {0:?} does not appear in the grammar alphabet")]
    UnknownTerminal(char),
    #[error("state {0} has two transitions on {1:?}")]
    Nondeterministic(String, char),
}

impl Symbol {
    /// Checks if this symbol is a nonterminal reference
    pub fn is_nonterminal(&self) -> bool {
        matches!(self, Symbol::NonTerminal(_))
    }

    /// Checks if this (extended) terminal symbol matches an input character. Nonterminals match
    /// nothing.
    pub fn matches(&self, input: char) -> bool {
        match self {
            Symbol::Terminal(c) => *c == input,
            Symbol::Any => true,
            Symbol::AnyExcept(c) => *c != input,
            Symbol::NonTerminal(_) => false,
        }
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Terminal(c) => write!(f, "{c}"),
            Symbol::Any => write!(f, "$."),
            Symbol::AnyExcept(c) => write!(f, "!{c}"),
            Symbol::NonTerminal(name) => write!(f, "{name}"),
        }
    }
}

impl Grammar {
    pub(crate) fn new(
        rules: IndexMap<Rc<str>, Vec<Production>>,
        start: Rc<str>,
        alphabet: Rc<[char]>,
    ) -> Self {
        Self {
            rules,
            start,
            alphabet,
        }
    }

    /// Converts a DFA into a right-linear grammar. Productions are emitted in (state index,
    /// symbol) order, with the epsilon production of an accepting state first, so identical
    /// automata always yield identical grammars.
    pub fn from_dfa(dfa: &Dfa) -> Self {
        let nt = |i: usize| -> Rc<str> { Rc::from(format!("<Q{i}>")) };

        let mut rules: IndexMap<Rc<str>, Vec<Production>> = IndexMap::new();
        for (idx, state) in dfa.states().iter().enumerate() {
            let mut productions = Vec::new();
            if state.is_accepting() {
                productions.push(vec![]);
            }
            for (sym_idx, target) in state.transitions().iter().enumerate() {
                if let Some(target) = target {
                    productions.push(vec![
                        Symbol::Terminal(dfa.alphabet()[sym_idx]),
                        Symbol::NonTerminal(nt(*target)),
                    ]);
                }
            }
            rules.insert(nt(idx), productions);
        }

        Grammar {
            rules,
            start: nt(dfa.initial_state_index()),
            alphabet: dfa.alphabet.clone(),
        }
    }

    /// Converts a right-linear grammar back into a DFA, with one state per nonterminal in rule
    /// order. Fails when a production is not of the form `a <Q>` or `ε`, when a referenced
    /// nonterminal or terminal is unknown, or when two productions of one nonterminal start
    /// with the same terminal.
    pub fn to_dfa(&self) -> Result<Dfa, GrammarError> {
        use GrammarError::*;
        let state_of = |name: &Rc<str>| -> Result<usize, GrammarError> {
            self.rules
                .get_index_of(name.as_ref())
                .ok_or_else(|| UndefinedNonTerminal(name.to_string()))
        };

        let mut states = Vec::with_capacity(self.rules.len());
        for (name, productions) in &self.rules {
            let mut accepting = false;
            let mut transitions: Vec<Option<usize>> = vec![None; self.alphabet.len()];
            for production in productions {
                match production.as_slice() {
                    [] => accepting = true,
                    [Symbol::Terminal(c), Symbol::NonTerminal(target)] => {
                        let sym_idx = self
                            .alphabet
                            .binary_search(c)
                            .map_err(|_| UnknownTerminal(*c))?;
                        let target = state_of(target)?;
                        match transitions[sym_idx] {
                            Some(existing) if existing != target => {
                                return Err(Nondeterministic(name.to_string(), *c));
                            }
                            _ => transitions[sym_idx] = Some(target),
                        }
                    }
                    _ => return Err(NotRightLinear(name.to_string())),
                }
            }
            states.push(DfaState::new(accepting, transitions));
        }

        let initial_state = state_of(&self.start)?;
        Ok(Dfa {
            alphabet: self.alphabet.clone(),
            states,
            initial_state,
        })
    }

    /// Gets the name of the start nonterminal
    pub fn start(&self) -> &str {
        &self.start
    }

    /// Gets the grammar alphabet, in ascending order
    pub fn alphabet(&self) -> &[char] {
        &self.alphabet
    }

    /// Gets the productions of a nonterminal, if it is defined
    pub fn productions(&self, name: &str) -> Option<&[Production]> {
        self.rules.get(name).map(Vec::as_slice)
    }

    /// Checks if a nonterminal is defined
    pub fn is_defined(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Iterates over the rules in insertion order
    pub fn rules(&self) -> impl Iterator<Item = (&Rc<str>, &[Production])> {
        self.rules.iter().map(|(name, prods)| (name, prods.as_slice()))
    }

    /// Gets the number of nonterminals
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Checks if the grammar has no nonterminals at all
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Collects the concrete terminals occurring in any production, in ascending order
    pub fn terminals(&self) -> Vec<char> {
        let mut terminals: Vec<char> = self
            .rules
            .values()
            .flatten()
            .flatten()
            .filter_map(|sym| match sym {
                Symbol::Terminal(c) => Some(*c),
                _ => None,
            })
            .collect();
        terminals.sort_unstable();
        terminals.dedup();
        terminals
    }

    /// Checks that this is a *base* grammar: single-character terminals and defined
    /// nonterminals only, no extended terminals. The Earley engine's covering construction
    /// relies on this shape, so the repair loop validates grammars on the way in.
    pub fn expect_base(&self) -> Result<(), GrammarError> {
        for productions in self.rules.values() {
            for production in productions {
                for symbol in production {
                    match symbol {
                        Symbol::Terminal(c) => {
                            if self.alphabet.binary_search(c).is_err() {
                                return Err(GrammarError::UnknownTerminal(*c));
                            }
                        }
                        Symbol::NonTerminal(name) => {
                            if !self.is_defined(name) {
                                return Err(GrammarError::UndefinedNonTerminal(name.to_string()));
                            }
                        }
                        Symbol::Any | Symbol::AnyExcept(_) => {
                            return Err(GrammarError::NotRightLinear(format!("{symbol}")));
                        }
                    }
                }
            }
        }
        if !self.is_defined(&self.start) {
            return Err(GrammarError::UndefinedNonTerminal(self.start.to_string()));
        }
        Ok(())
    }
}

impl Display for Grammar {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (name, productions) in &self.rules {
            let rendered: Vec<String> = productions
                .iter()
                .map(|production| {
                    if production.is_empty() {
                        "ε".to_string()
                    } else {
                        production
                            .iter()
                            .map(Symbol::to_string)
                            .collect::<Vec<_>>()
                            .join(" ")
                    }
                })
                .collect();
            writeln!(f, "{name} ::= {}", rendered.join(" | "))?;
        }
        Ok(())
    }
}
