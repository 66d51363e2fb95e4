use crate::config::Config;
use crate::dfa::{Dfa, DfaState};
use crate::earley::{Corrector, ParseError};
use crate::grammar::{cache, Grammar};
use crate::repair::{CacheOptions, RepairStatus, Repairer};
use crate::rpni;
use ::regex::Regex as LibRegex;
use proptest::prelude::*;
use std::time::Duration;

fn strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

/// A chain automaton for `\d{4}-\d{2}-\d{2}`, the usual Date-format stand-in
fn date_dfa() -> Dfa {
    let alphabet: Vec<char> = "-0123456789".chars().collect();
    let digit_slots = 1..=10;
    let dash_slot = 0;

    let mut states = Vec::new();
    for position in 0..10usize {
        let mut transitions = vec![None; alphabet.len()];
        if position == 4 || position == 7 {
            transitions[dash_slot] = Some(position + 1);
        } else {
            for slot in digit_slots.clone() {
                transitions[slot] = Some(position + 1);
            }
        }
        states.push(DfaState::new(false, transitions));
    }
    states.push(DfaState::new(true, vec![None; alphabet.len()]));
    Dfa::try_new(alphabet, states, 0).unwrap()
}

fn date_corrector() -> Corrector {
    Corrector::new(&Grammar::from_dfa(&date_dfa()))
}

fn date_regex() -> LibRegex {
    LibRegex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap()
}

#[test]
fn learned_dfa_is_behaviourally_stable() {
    // Scenario: the exact states may vary with the implementation, but two runs must agree on
    // everything, including strings from neither sample set
    let positives = strings(&["a", "b", "ab", "ba"]);
    let negatives = strings(&["", "aa", "bb", "aba", "bab"]);
    let first = rpni::learn(&positives, &negatives);
    let second = rpni::learn(&positives, &negatives);
    assert_eq!(first, second);
    for extra in ["aab", "abb", "bba", "baa"] {
        assert_eq!(first.accepts(extra), second.accepts(extra));
    }
}

#[test]
fn date_substitution_is_repaired() {
    let corrector = date_corrector();
    let fix = corrector.correct("2024-1a-05", &Config::default()).unwrap();
    assert!(fix.penalty <= 2, "one substitution should suffice, got {}", fix.penalty);
    assert!(date_regex().is_match(&fix.output), "bad repair {:?}", fix.output);
}

#[test]
fn date_junk_is_trimmed_at_one_penalty_per_character() {
    let corrector = date_corrector();
    let fix = corrector
        .correct("xxxx2024-11-05yyyy", &Config::default())
        .unwrap();
    assert_eq!(fix.penalty, 8);
    assert_eq!(fix.output, "2024-11-05");
}

#[test]
fn accepted_dates_pass_through_unchanged() {
    let corrector = date_corrector();
    let fix = corrector.correct("2024-11-05", &Config::default()).unwrap();
    assert_eq!(fix.output, "2024-11-05");
    assert_eq!(fix.penalty, 0);
}

#[test]
fn empty_input_is_filled_with_deletions_when_the_cap_allows() {
    let corrector = date_corrector();
    // Ten expected characters: below the default cap of 8 there is no parse at all
    assert_eq!(
        corrector.correct("", &Config::default()),
        Err(ParseError::NoParse)
    );
    let generous = Config {
        max_penalty: 12,
        ..Config::default()
    };
    let fix = corrector.correct("", &generous).unwrap();
    assert_eq!(fix.penalty, 10);
    assert!(date_regex().is_match(&fix.output), "bad repair {:?}", fix.output);
}

#[test]
fn empty_positive_set_yields_the_empty_language() {
    let dfa = rpni::learn(&[], &strings(&["a", "b"]));
    assert!(!dfa.accepts(""));
    assert!(!dfa.accepts("ab"));
    let corrector = Corrector::new(&Grammar::from_dfa(&dfa));
    assert_eq!(
        corrector.correct("", &Config::default()),
        Err(ParseError::NoParse)
    );
    assert_eq!(
        corrector.correct("a", &Config::default()),
        Err(ParseError::NoParse)
    );
}

#[test]
fn epsilon_only_language_trims_everything() {
    let dfa = rpni::learn(&strings(&[""]), &strings(&["a"]));
    let corrector = Corrector::new(&Grammar::from_dfa(&dfa));
    let fix = corrector.correct("", &Config::default()).unwrap();
    assert_eq!((fix.output.as_str(), fix.penalty), ("", 0));
    let fix = corrector.correct("aa", &Config::default()).unwrap();
    assert_eq!((fix.output.as_str(), fix.penalty), ("", 2));
}

#[test]
fn seeded_tie_breaking_is_reproducible() {
    // A language with two words at the same distance from the input
    let dfa = Dfa::try_new(
        vec!['a', 'b'],
        vec![
            DfaState::new(false, vec![Some(1), Some(1)]),
            DfaState::new(true, vec![None, None]),
        ],
        0,
    )
    .unwrap();
    let corrector = Corrector::new(&Grammar::from_dfa(&dfa));
    let config = Config {
        seed: Some(42),
        ..Config::default()
    };
    let first = corrector.correct("c", &config).unwrap();
    let second = corrector.correct("c", &config).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.penalty, 1);
    assert!(first.output == "a" || first.output == "b");
}

#[test]
fn target_penalty_selects_a_costlier_repair() {
    let corrector = date_corrector();
    // a valid date also parses at penalty 1, with one digit read as a substitution
    let config = Config {
        target_penalty: Some(1),
        ..Config::default()
    };
    let fix = corrector.correct("2024-11-05", &config).unwrap();
    assert_eq!(fix.penalty, 1);
    assert_ne!(fix.output, "2024-11-05");
    assert!(date_regex().is_match(&fix.output), "bad repair {:?}", fix.output);
}

#[test]
fn unreachable_target_penalty_falls_back_to_minimum() {
    // For the language {"a"} and the input "a" there is no parse of penalty exactly 1
    let dfa = Dfa::try_new(
        vec!['a'],
        vec![
            DfaState::new(false, vec![Some(1)]),
            DfaState::new(true, vec![None]),
        ],
        0,
    )
    .unwrap();
    let corrector = Corrector::new(&Grammar::from_dfa(&dfa));
    let config = Config {
        target_penalty: Some(1),
        ..Config::default()
    };
    let fix = corrector.correct("a", &config).unwrap();
    assert_eq!((fix.output.as_str(), fix.penalty), ("a", 0));
}

#[test]
fn failed_repairs_grow_the_negative_set_monotonically() {
    let positives = strings(&["a"]);
    let config = Config {
        max_attempts: 3,
        ..Config::default()
    };
    let mut repairer = Repairer::learn(positives, vec![], config);
    let reject_all = |_: &str| false;

    let before = repairer.negatives().len();
    let repaired = repairer.repair("b", &reject_all);
    assert_eq!(repaired.status, RepairStatus::Failed);
    // one initial attempt plus max_attempts relearn rounds
    assert_eq!(repaired.attempts, 4);
    assert!(repaired.output.is_some());

    assert!(repairer.negatives().len() > before);
    assert!(repairer.negatives().contains(&"b".to_string()));
    // every relearned hypothesis rejects the rejected input
    let dfa = repairer.grammar().to_dfa().unwrap();
    assert!(!dfa.accepts("b"));
}

#[test]
fn repair_loop_converges_after_adding_negatives() {
    // The initial hypothesis is (ab)*, so "abab" sails through at penalty 0; only after the
    // oracle rejects it and it joins the negatives does the hypothesis shrink to {"ab"}
    let positives = strings(&["ab"]);
    let negatives = strings(&["b", "abb"]);
    let mut repairer = Repairer::learn(positives, negatives, Config::default());
    let oracle = |candidate: &str| candidate == "ab";
    let repaired = repairer.repair("abab", &oracle);
    assert_eq!(repaired.status, RepairStatus::Ok);
    assert_eq!(repaired.output.as_deref(), Some("ab"));
    assert_eq!(repaired.attempts, 2);
    assert!(repairer.negatives().contains(&"abab".to_string()));
}

#[test]
fn cache_backed_repairer_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("date.json");
    let positives = strings(&["ab", "abab"]);
    let negatives = strings(&["", "a"]);

    let options = CacheOptions {
        path: path.clone(),
        refresh: false,
        update_on_relearn: false,
    };
    let first =
        Repairer::with_cache(options.clone(), positives.clone(), negatives.clone(), Config::default())
            .unwrap();
    assert!(path.exists());

    // the second session loads the cache instead of learning
    let second = Repairer::with_cache(options, positives, negatives, Config::default()).unwrap();
    assert_eq!(first.grammar(), second.grammar());

    // and the cached document itself is byte-stable
    let bytes = std::fs::read(&path).unwrap();
    cache::save(&path, second.grammar()).unwrap();
    assert_eq!(bytes, std::fs::read(&path).unwrap());
}

#[test]
fn zero_cap_acts_as_a_recognizer() {
    let dfa = rpni::learn(&strings(&["ab"]), &strings(&["", "a", "b"]));
    let corrector = Corrector::new(&Grammar::from_dfa(&dfa));
    let config = Config {
        max_penalty: 0,
        ..Config::default()
    };
    let fix = corrector.correct("ab", &config).unwrap();
    assert_eq!((fix.output.as_str(), fix.penalty), ("ab", 0));
    assert_eq!(corrector.correct("ba", &config), Err(ParseError::NoParse));
}

#[test]
fn immediate_timeout_surfaces_after_the_retry_ladder() {
    let corrector = date_corrector();
    let config = Config {
        parse_timeout: Duration::ZERO,
        ..Config::default()
    };
    assert_eq!(
        corrector.correct("xxxx2024-11-05yyyy", &config),
        Err(ParseError::Timeout)
    );
}

proptest! {
    /// Learned automata are consistent with both sample sets (RPNI soundness)
    #[test]
    fn rpni_soundness((positives, negatives) in sample_sets()) {
        let dfa = rpni::learn(&positives, &negatives);
        for p in &positives {
            prop_assert!(dfa.accepts(p), "positive {p:?} rejected");
        }
        for n in &negatives {
            prop_assert!(!dfa.accepts(n), "negative {n:?} accepted");
        }
    }

    /// Two runs over the same samples produce identical automata, labels included
    #[test]
    fn rpni_determinism((positives, negatives) in sample_sets()) {
        prop_assert_eq!(
            rpni::learn(&positives, &negatives),
            rpni::learn(&positives, &negatives)
        );
    }

    /// Reading a DFA as a grammar and back preserves the accepted language
    #[test]
    fn grammar_round_trip(dfa in dfa(6)) {
        let grammar = Grammar::from_dfa(&dfa);
        let back = grammar.to_dfa().unwrap();
        prop_assert!(dfa.equivalent_to(&back));
    }

    /// Saving a grammar cache and reloading it preserves the grammar bit-for-bit
    #[test]
    fn cache_round_trip(dfa in dfa(6)) {
        let grammar = Grammar::from_dfa(&dfa);
        let json = cache::to_json(&grammar).unwrap();
        let reloaded = cache::from_json(&json).unwrap();
        prop_assert_eq!(&grammar, &reloaded);
        prop_assert_eq!(json, cache::to_json(&reloaded).unwrap());
    }

    /// Whatever the corrector emits is a member of the base language (projection soundness)
    #[test]
    fn projection_soundness(dfa in dfa(5), input in "[abx]{0,5}") {
        let grammar = Grammar::from_dfa(&dfa);
        let corrector = Corrector::new(&grammar);
        let config = Config { max_penalty: 12, ..Config::default() };
        match corrector.correct(&input, &config) {
            Ok(fix) => prop_assert!(
                dfa.accepts(&fix.output),
                "projected {:?} is outside the language", fix.output
            ),
            // languages can be empty, and twelve edits do not reach every word
            Err(ParseError::NoParse) => {}
            Err(err) => prop_assert!(false, "unexpected error: {err}"),
        }
    }

    /// Strings already in the language come back unchanged at penalty 0
    #[test]
    fn repair_is_idempotent_on_members((positives, negatives) in sample_sets()) {
        let grammar = rpni::learn_grammar(&positives, &negatives);
        let corrector = Corrector::new(&grammar);
        for p in &positives {
            let fix = corrector.correct(p, &Config::default()).unwrap();
            prop_assert_eq!(&fix.output, p);
            prop_assert_eq!(fix.penalty, 0);
        }
    }
}

prop_compose! {
    /// Positive and negative sample sets over a small alphabet, disjoint by construction
    fn sample_sets()(
        positives in prop::collection::btree_set("[ab]{0,4}", 1..5),
        candidates in prop::collection::btree_set("[abc]{0,4}", 0..5),
    ) -> (Vec<String>, Vec<String>) {
        let negatives = candidates
            .into_iter()
            .filter(|c| !positives.contains(c))
            .collect();
        (positives.into_iter().collect(), negatives)
    }
}

prop_compose! {
    /// Random (possibly partial) automata over the alphabet {a, b}
    fn dfa(max_states: usize)(num_states in 1..max_states)(
        accepting in prop::collection::vec(any::<bool>(), num_states..=num_states),
        transitions in prop::collection::vec(
            prop::collection::vec(prop::option::of(0..num_states), 2..=2),
            num_states..=num_states
        ),
        initial_state in 0..num_states,
    ) -> Dfa {
        let states = accepting
            .into_iter()
            .zip(transitions)
            .map(|(accepting, transitions)| DfaState::new(accepting, transitions))
            .collect();
        Dfa::try_new(vec!['a', 'b'], states, initial_state).unwrap()
    }
}
