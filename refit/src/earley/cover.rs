//! Covering-grammar construction. The covering grammar of a base grammar derives every string
//! the base grammar derives, plus strings within a bounded number of single-character edits,
//! with each edit charged a penalty of 1:
//!
//! * `<$[a]>` stands for an expected terminal `a` and has four alternatives: the exact match
//!   `a`, the insertion-then-match `<$.+> a` (junk before the expected character), the deletion
//!   `<$>` (the expected character is missing from the input), and the substitution `<$![a]>`
//!   (some other character stands where `a` should be).
//! * `<$.>` matches any one character, `<$.+>` one or more, `<$>` nothing.
//! * the wrapper start `<@# ...>` additionally allows junk after the base string.
//!
//! Every occurrence of a terminal in the base productions is replaced by its `<$[a]>`
//! nonterminal, so a parse tree of the covering grammar projects back onto the base grammar by
//! emitting the expected terminal of each `<$[a]>` node and dropping the correction machinery.

use crate::grammar::{Grammar, Production, Symbol};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::rc::Rc;

/// Matches any single character, at a penalty of 1
pub(crate) const ANY_ONE: &str = "<$.>";
/// Matches one or more characters, at a penalty equal to their count
pub(crate) const ANY_PLUS: &str = "<$.+>";
/// Matches nothing, at a penalty of 1
pub(crate) const EMPTY: &str = "<$>";

/// The `<$[a]>` nonterminal of an expected terminal
pub(crate) fn this_sym(terminal: char) -> Rc<str> {
    Rc::from(format!("<$[{terminal}]>"))
}

/// The `<$![a]>` nonterminal matching any single character except the given one
pub(crate) fn any_not(terminal: char) -> Rc<str> {
    Rc::from(format!("<$![{terminal}]>"))
}

/// The expected terminal of a `<$[a]>` name, if the name has that shape
pub(crate) fn expected_terminal(name: &str) -> Option<char> {
    let inner = name.strip_prefix("<$[")?.strip_suffix("]>")?;
    let mut chars = inner.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

/// Checks if a name belongs to the correction machinery (everything projected away except
/// `<$[a]>`, which projects to its expected terminal)
pub(crate) fn is_machinery(name: &str) -> bool {
    name == ANY_ONE || name == ANY_PLUS || name == EMPTY || name.starts_with("<$![")
}

/// The intrinsic penalty a freshly predicted state of the given nonterminal carries
pub(crate) fn base_penalty(name: &str) -> u32 {
    if name == EMPTY || name == ANY_ONE || name.starts_with("<$![") {
        1
    } else {
        0
    }
}

fn wrapper_start(start: &str) -> Rc<str> {
    let inner = start.trim_start_matches('<').trim_end_matches('>');
    Rc::from(format!("<@# {inner}>"))
}

/// Builds the covering grammar of a base grammar. The construction is deterministic: the
/// wrapper start comes first, then the translated base rules in their original order, then the
/// correction machinery with the per-terminal rules in ascending terminal order.
pub(crate) fn covering(base: &Grammar) -> Grammar {
    let terminals = base.terminals();
    let start = wrapper_start(&base.start);
    let nt = |name: &str| Symbol::NonTerminal(Rc::from(name));

    let mut rules: IndexMap<Rc<str>, Vec<Production>> = IndexMap::new();
    rules.insert(
        start.clone(),
        vec![
            vec![Symbol::NonTerminal(base.start.clone())],
            vec![Symbol::NonTerminal(base.start.clone()), nt(ANY_PLUS)],
        ],
    );

    for (name, productions) in base.rules() {
        let translated = productions
            .iter()
            .map(|production| {
                production
                    .iter()
                    .map(|symbol| match symbol {
                        Symbol::Terminal(c) => Symbol::NonTerminal(this_sym(*c)),
                        other => other.clone(),
                    })
                    .collect()
            })
            .collect();
        rules.insert(name.clone(), translated);
    }

    rules.insert(Rc::from(ANY_ONE), vec![vec![Symbol::Any]]);
    rules.insert(
        Rc::from(ANY_PLUS),
        vec![vec![nt(ANY_ONE)], vec![nt(ANY_PLUS), nt(ANY_ONE)]],
    );
    for &terminal in &terminals {
        rules.insert(
            this_sym(terminal),
            vec![
                vec![Symbol::Terminal(terminal)],
                vec![nt(ANY_PLUS), Symbol::Terminal(terminal)],
                vec![nt(EMPTY)],
                vec![Symbol::NonTerminal(any_not(terminal))],
            ],
        );
    }
    for &terminal in &terminals {
        rules.insert(any_not(terminal), vec![vec![Symbol::AnyExcept(terminal)]]);
    }
    rules.insert(Rc::from(EMPTY), vec![vec![]]);

    Grammar::new(rules, start, base.alphabet.clone())
}

/// Computes which nonterminals can derive epsilon, and at what minimum penalty. `<$>` is
/// nullable at penalty 1 (a deletion); a nonterminal is nullable when some production consists
/// entirely of nullable members, at the minimum over such productions of the summed member
/// penalties.
pub(crate) fn nullable_penalties(grammar: &Grammar) -> HashMap<Rc<str>, u32> {
    let mut nullable: HashMap<Rc<str>, u32> = HashMap::new();
    loop {
        let mut changed = false;
        for (name, productions) in grammar.rules() {
            for production in productions {
                let Some(penalty) = production_penalty(name, production, &nullable) else {
                    continue;
                };
                match nullable.get(name.as_ref()) {
                    Some(&known) if known <= penalty => {}
                    _ => {
                        nullable.insert(name.clone(), penalty);
                        changed = true;
                    }
                }
            }
        }
        if !changed {
            break;
        }
    }
    nullable
}

/// The penalty of deriving epsilon through one production, if all its members are nullable
fn production_penalty(
    name: &str,
    production: &Production,
    nullable: &HashMap<Rc<str>, u32>,
) -> Option<u32> {
    let mut penalty = if name == EMPTY { 1 } else { 0 };
    for symbol in production {
        match symbol {
            Symbol::NonTerminal(member) => penalty += nullable.get(member.as_ref())?,
            _ => return None,
        }
    }
    Some(penalty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dfa::{Dfa, DfaState};

    fn base() -> Grammar {
        // Accepts exactly "ab"
        let dfa = Dfa::try_new(
            vec!['a', 'b'],
            vec![
                DfaState::new(false, vec![Some(1), None]),
                DfaState::new(false, vec![None, Some(2)]),
                DfaState::new(true, vec![None, None]),
            ],
            0,
        )
        .unwrap();
        Grammar::from_dfa(&dfa)
    }

    #[test]
    fn covering_translates_terminals() {
        let cover = covering(&base());
        assert_eq!(cover.start(), "<@# Q0>");
        let q0 = cover.productions("<Q0>").unwrap();
        let expected: Vec<Production> = vec![vec![
            Symbol::NonTerminal(this_sym('a')),
            Symbol::NonTerminal(Rc::from("<Q1>")),
        ]];
        assert_eq!(q0, expected.as_slice());
        // four correction alternatives per expected terminal
        assert_eq!(cover.productions("<$[a]>").unwrap().len(), 4);
        assert_eq!(cover.productions("<$[b]>").unwrap().len(), 4);
        assert!(cover.productions(EMPTY).is_some());
    }

    #[test]
    fn nullable_penalties_flow_through_corrections() {
        let cover = covering(&base());
        let nullable = nullable_penalties(&cover);
        // a deletion costs 1, and makes the expected-terminal wrappers nullable at 1
        assert_eq!(nullable.get(EMPTY), Some(&1));
        assert_eq!(nullable.get(&this_sym('a')), Some(&1));
        // <Q2> is accepting, hence nullable for free
        assert_eq!(nullable.get("<Q2>"), Some(&0));
        // deriving "ab" out of nothing costs one deletion per expected character
        assert_eq!(nullable.get("<Q1>"), Some(&1));
        assert_eq!(nullable.get("<Q0>"), Some(&2));
        // consuming symbols can never be free
        assert_eq!(nullable.get(ANY_ONE), None);
        assert_eq!(nullable.get(ANY_PLUS), None);
    }

    #[test]
    fn expected_terminal_round_trips() {
        assert_eq!(expected_terminal("<$[x]>"), Some('x'));
        assert_eq!(expected_terminal("<$[[]>"), Some('['));
        assert_eq!(expected_terminal("<$!"), None);
        assert_eq!(expected_terminal("<Q0>"), None);
    }
}
