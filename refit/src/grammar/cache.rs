//! # Grammar cache
//! Learned grammars can be persisted as a single JSON document so that later repairs skip the
//! inference step. The document has three fields:
//!
//! ```json
//! { "grammar": { "<Q0>": [["a", "<Q1>"]], "<Q1>": [[]] },
//!   "start_sym": "<Q0>",
//!   "alphabet": ["a"] }
//! ```
//!
//! All symbols are strings; epsilon is the empty list. Serialisation preserves rule order, so
//! identical grammars produce byte-identical documents. Loading validates the string-only
//! invariant the Earley engine relies on — every symbol must be either a bracketed nonterminal
//! that the document defines, or a single character of the listed alphabet — and refuses the
//! document otherwise, since silently repairing against a corrupt grammar would be worse than
//! failing.

use crate::grammar::{Grammar, Production, Symbol};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::rc::Rc;
use thiserror::Error;

/// Errors from loading or saving a grammar cache
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cache is corrupt: {0}")]
    Corrupt(String),
}

/// The on-disk shape of the cache document. Field order is the serialisation order.
#[derive(Debug, Serialize, Deserialize)]
struct CacheDoc {
    grammar: IndexMap<String, Vec<Vec<String>>>,
    start_sym: String,
    alphabet: Vec<String>,
}

/// Serialises a base grammar to the JSON document format
pub fn to_json(grammar: &Grammar) -> Result<String, CacheError> {
    let doc = CacheDoc {
        grammar: grammar
            .rules
            .iter()
            .map(|(name, productions)| {
                (
                    name.to_string(),
                    productions
                        .iter()
                        .map(|production| production.iter().map(Symbol::to_string).collect())
                        .collect(),
                )
            })
            .collect(),
        start_sym: grammar.start.to_string(),
        alphabet: grammar.alphabet.iter().map(char::to_string).collect(),
    };
    Ok(serde_json::to_string(&doc)?)
}

/// Parses and validates a JSON cache document into a base grammar
pub fn from_json(json: &str) -> Result<Grammar, CacheError> {
    let doc: CacheDoc = serde_json::from_str(json)?;
    let corrupt = |msg: String| CacheError::Corrupt(msg);

    let mut alphabet = Vec::with_capacity(doc.alphabet.len());
    for entry in &doc.alphabet {
        let mut chars = entry.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => alphabet.push(c),
            _ => return Err(corrupt(format!("alphabet entry {entry:?} is not one character"))),
        }
    }
    alphabet.sort_unstable();
    alphabet.dedup();

    let decode = |raw: &str| -> Result<Symbol, CacheError> {
        if raw.starts_with('<') && raw.ends_with('>') {
            if !doc.grammar.contains_key(raw) {
                return Err(corrupt(format!("nonterminal {raw} is not defined")));
            }
            return Ok(Symbol::NonTerminal(Rc::from(raw)));
        }
        let mut chars = raw.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => {
                if alphabet.binary_search(&c).is_err() {
                    return Err(corrupt(format!("terminal {c:?} is outside the alphabet")));
                }
                Ok(Symbol::Terminal(c))
            }
            _ => Err(corrupt(format!("symbol {raw:?} is neither a nonterminal nor a single character"))),
        }
    };

    let mut rules: IndexMap<Rc<str>, Vec<Production>> = IndexMap::new();
    for (name, productions) in &doc.grammar {
        let mut decoded = Vec::with_capacity(productions.len());
        for production in productions {
            decoded.push(
                production
                    .iter()
                    .map(|raw| decode(raw))
                    .collect::<Result<Production, _>>()?,
            );
        }
        rules.insert(Rc::from(name.as_str()), decoded);
    }

    if !rules.contains_key(doc.start_sym.as_str()) {
        return Err(corrupt(format!(
            "start symbol {} is not defined",
            doc.start_sym
        )));
    }

    Ok(Grammar::new(
        rules,
        Rc::from(doc.start_sym.as_str()),
        alphabet.into(),
    ))
}

/// Saves a grammar cache document to a file
pub fn save(path: &Path, grammar: &Grammar) -> Result<(), CacheError> {
    fs::write(path, to_json(grammar)?)?;
    Ok(())
}

/// Loads and validates a grammar cache document from a file
pub fn load(path: &Path) -> Result<Grammar, CacheError> {
    from_json(&fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dfa::{Dfa, DfaState};

    fn sample_grammar() -> Grammar {
        let dfa = Dfa::try_new(
            vec!['a', 'b'],
            vec![
                DfaState::new(false, vec![Some(1), None]),
                DfaState::new(true, vec![None, Some(0)]),
            ],
            0,
        )
        .unwrap();
        Grammar::from_dfa(&dfa)
    }

    #[test]
    fn round_trip_preserves_grammar() {
        let grammar = sample_grammar();
        let json = to_json(&grammar).unwrap();
        let reloaded = from_json(&json).unwrap();
        assert_eq!(grammar, reloaded);
        // and re-serialising is byte-identical
        assert_eq!(json, to_json(&reloaded).unwrap());
    }

    #[test]
    fn rejects_multi_character_terminals() {
        let json = r#"{"grammar":{"<Q0>":[["ab","<Q0>"]]},"start_sym":"<Q0>","alphabet":["a","b"]}"#;
        assert!(matches!(from_json(json), Err(CacheError::Corrupt(_))));
    }

    #[test]
    fn rejects_undefined_nonterminals() {
        let json = r#"{"grammar":{"<Q0>":[["a","<Q9>"]]},"start_sym":"<Q0>","alphabet":["a"]}"#;
        assert!(matches!(from_json(json), Err(CacheError::Corrupt(_))));
    }

    #[test]
    fn rejects_undefined_start() {
        let json = r#"{"grammar":{"<Q0>":[[]]},"start_sym":"<Q1>","alphabet":[]}"#;
        assert!(matches!(from_json(json), Err(CacheError::Corrupt(_))));
    }
}
