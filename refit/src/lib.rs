//!# refit
//!
//! `refit` is a Rust library for repairing malformed strings of small regular "formats" (dates,
//! times, URLs, ISBNs, IP addresses, file paths) against a black-box validator. It combines two
//! algorithms:
//!
//! * **Passive regular-language inference** ([rpni]): from finite positive and negative sample
//!   sets, a deterministic finite automaton consistent with both is learned by state-merging
//!   over a prefix-tree acceptor (blue-fringe RPNI).
//! * **Error-correcting Earley parsing** ([earley]): the learned automaton, read as a
//!   right-linear grammar, is wrapped into a *covering grammar* that also derives strings a
//!   bounded number of single-character edits away, each edit charged a penalty; an Earley
//!   chart tracking penalties finds a minimum-cost parse of the broken input, which projects
//!   back to a repaired string of the learned language.
//!
//! The [repair] loop composes the two with an external [oracle]: candidates the oracle rejects
//! become negative samples, the grammar is relearned, and repair is retried.
//!
//! ## Usage
//!
//! ```rust
//! use refit::earley::Corrector;
//! use refit::grammar::Grammar;
//! use refit::rpni;
//! use refit::Config;
//!
//! // Learn an automaton consistent with the samples
//! let positives = vec!["a".to_string(), "b".into(), "ab".into(), "ba".into()];
//! let negatives = vec!["".to_string(), "aa".into(), "bb".into(), "aba".into(), "bab".into()];
//! let dfa = rpni::learn(&positives, &negatives);
//! assert!(positives.iter().all(|p| dfa.accepts(p)));
//! assert!(negatives.iter().all(|n| !dfa.accepts(n)));
//!
//! // Read it as a right-linear grammar and repair a broken input against it
//! let grammar = Grammar::from_dfa(&dfa);
//! let corrector = Corrector::new(&grammar);
//! let fix = corrector.correct("ab", &Config::default()).unwrap();
//! // "ab" is already in the language: unchanged, at penalty 0
//! assert_eq!((fix.output.as_str(), fix.penalty), ("ab", 0));
//! ```
//!
//! Driving the full loop needs an oracle; any `Fn(&str) -> bool` will do:
//!
//! ```rust
//! use refit::repair::{Repairer, RepairStatus};
//! use refit::Config;
//!
//! let positives = vec!["a".to_string()];
//! let negatives = vec!["".to_string()];
//! let mut repairer = Repairer::learn(positives, negatives, Config::default());
//! let repaired = repairer.repair("x", &|candidate: &str| candidate == "a");
//! assert_eq!(repaired.status, RepairStatus::Ok);
//! assert_eq!(repaired.output.as_deref(), Some("a"));
//! ```
//!
//! ## Pieces
//!
//! This library is made up of:
//!
//! * [Prefix-tree acceptors](pta) built from the positive samples
//! * [DFAs](dfa::Dfa) with [evaluators](dfa::DfaEvaluator), sink
//!   [completion](dfa::Dfa::complete) and [equivalence checking](dfa::Dfa::equivalent_to)
//! * The [blue-fringe learner](rpni::learn)
//! * [Right-linear grammars](grammar::Grammar) converting [from](grammar::Grammar::from_dfa)
//!   and [to](grammar::Grammar::to_dfa) automata, with a [JSON cache](grammar::cache)
//! * The [error-correcting corrector](earley::Corrector)
//! * The [repair loop](repair::Repairer) and the [oracle contract](oracle::Oracle)
//! * [Sample-file reading](samples)
//!
//! All configuration ([Config]) is passed explicitly; the library keeps no global state, so
//! independent repair sessions can run side by side.

pub mod config;
pub mod dfa;
pub mod earley;
pub mod grammar;
pub mod oracle;
pub mod pta;
pub mod repair;
pub mod rpni;
pub mod samples;
mod table;

pub use config::Config;

#[cfg(test)]
mod tests;
