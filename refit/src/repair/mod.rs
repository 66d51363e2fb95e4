//! # The repair loop
//! The repair module ties the pipeline together: it learns a grammar from the samples (or loads
//! a cached one), repairs broken inputs with the [error-correcting Earley
//! engine](crate::earley), validates every candidate with an [oracle](crate::oracle), and on
//! rejection grows the negative sample set with the broken input and relearns, up to the
//! configured number of rounds.
//!
//! ## Example
//! ```
//! use refit::repair::{Repairer, RepairStatus};
//! use refit::Config;
//!
//! let positives = vec!["a".to_string()];
//! let negatives = vec!["".to_string()];
//! let mut repairer = Repairer::learn(positives, negatives, Config::default());
//!
//! let oracle = |candidate: &str| candidate == "a";
//! let repaired = repairer.repair("b", &oracle);
//! assert_eq!(repaired.status, RepairStatus::Ok);
//! assert_eq!(repaired.output.as_deref(), Some("a"));
//! assert_eq!(repaired.attempts, 1);
//! ```
//!
//! The negative set only ever grows: every broken input the oracle keeps rejecting stays a
//! negative for the rest of the session, so later hypotheses shrink towards the oracle's true
//! language.

use crate::config::Config;
use crate::earley::Corrector;
use crate::grammar::cache::{self, CacheError};
use crate::grammar::Grammar;
use crate::oracle::Oracle;
use crate::rpni;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Whether the oracle accepted the final candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairStatus {
    Ok,
    Failed,
}

/// The outcome of a repair: the last candidate produced (if any attempt yielded one), its
/// penalty, the oracle's verdict and the number of correction attempts that were made
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repaired {
    pub output: Option<String>,
    pub penalty: Option<u32>,
    pub status: RepairStatus,
    pub attempts: u32,
}

/// Where a learned grammar is cached, and whether relearning may rewrite it
#[derive(Debug, Clone)]
pub struct CacheOptions {
    pub path: PathBuf,
    /// Relearn from the samples and overwrite an existing cache instead of loading it
    pub refresh: bool,
    /// Rewrite the cache whenever the loop relearns. Off by default, keeping the warm cache
    /// intact across repair sessions.
    pub update_on_relearn: bool,
}

/// A repair session for one format: the samples, the current grammar hypothesis and the
/// corrector built from it
pub struct Repairer {
    positives: Vec<String>,
    negatives: Vec<String>,
    grammar: Grammar,
    corrector: Corrector,
    config: Config,
    cache: Option<CacheOptions>,
}

impl Repairer {
    /// Learns the initial grammar hypothesis from the sample sets
    pub fn learn(positives: Vec<String>, negatives: Vec<String>, config: Config) -> Self {
        let grammar = infer(&positives, &negatives);
        let corrector = Corrector::new(&grammar);
        Self {
            positives,
            negatives,
            grammar,
            corrector,
            config,
            cache: None,
        }
    }

    /// Like [Repairer::learn], but backed by a grammar cache: an existing cache is loaded
    /// (skipping inference entirely) unless `options.refresh` is set, and a fresh learning
    /// result is saved to the cache path. A cache that fails validation aborts with
    /// [CacheError::Corrupt] rather than repairing against a grammar of unknown shape.
    pub fn with_cache(
        options: CacheOptions,
        positives: Vec<String>,
        negatives: Vec<String>,
        config: Config,
    ) -> Result<Self, CacheError> {
        let grammar = if options.path.exists() && !options.refresh {
            info!(path = %options.path.display(), "loading grammar cache");
            cache::load(&options.path)?
        } else {
            let grammar = infer(&positives, &negatives);
            cache::save(&options.path, &grammar)?;
            info!(path = %options.path.display(), "saved grammar cache");
            grammar
        };
        let corrector = Corrector::new(&grammar);
        Ok(Self {
            positives,
            negatives,
            grammar,
            corrector,
            config,
            cache: Some(options),
        })
    }

    /// Repairs one broken input. The first attempt runs against the current grammar; after an
    /// oracle rejection the broken input joins the negative set and the grammar is relearned,
    /// for up to `config.max_attempts` further rounds. Oracle failures (timeouts, spawn
    /// errors) count as rejections; a round whose parse yields no candidate at all simply
    /// proceeds to the next round.
    pub fn repair(&mut self, broken: &str, oracle: &impl Oracle) -> Repaired {
        let rounds = 1 + self.config.max_attempts;
        let mut last: Option<(String, u32)> = None;

        for round in 0..rounds {
            if round > 0 {
                self.add_negative(broken);
                self.relearn();
            }

            let candidate = match self.corrector.correct(broken, &self.config) {
                Ok(correction) => correction,
                Err(err) => {
                    info!(round, %err, "repair attempt produced no candidate");
                    continue;
                }
            };
            debug!(round, output = %candidate.output, penalty = candidate.penalty, "candidate repair");

            let accepted = match oracle.accepts(&candidate.output) {
                Ok(accepted) => accepted,
                Err(err) => {
                    warn!(%err, "oracle failed, treating the candidate as rejected");
                    false
                }
            };
            if accepted {
                return Repaired {
                    output: Some(candidate.output),
                    penalty: Some(candidate.penalty),
                    status: RepairStatus::Ok,
                    attempts: round + 1,
                };
            }
            last = Some((candidate.output, candidate.penalty));
        }

        let (output, penalty) = match last {
            Some((output, penalty)) => (Some(output), Some(penalty)),
            None => (None, None),
        };
        Repaired {
            output,
            penalty,
            status: RepairStatus::Failed,
            attempts: rounds,
        }
    }

    fn add_negative(&mut self, broken: &str) {
        if !self.negatives.iter().any(|n| n == broken) {
            self.negatives.push(broken.to_string());
        }
    }

    fn relearn(&mut self) {
        info!(
            positives = self.positives.len(),
            negatives = self.negatives.len(),
            "relearning grammar"
        );
        self.grammar = infer(&self.positives, &self.negatives);
        self.corrector = Corrector::new(&self.grammar);
        if let Some(options) = &self.cache {
            if options.update_on_relearn {
                if let Err(err) = cache::save(&options.path, &self.grammar) {
                    warn!(%err, "could not refresh the grammar cache");
                }
            }
        }
    }

    /// The current grammar hypothesis
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// The negative samples accumulated so far (initial ones plus oracle-rejected inputs)
    pub fn negatives(&self) -> &[String] {
        &self.negatives
    }
}

fn infer(positives: &[String], negatives: &[String]) -> Grammar {
    let dfa = rpni::learn(positives, negatives);
    debug!("learned automaton:\n{}", dfa.to_table());
    let grammar = Grammar::from_dfa(&dfa);
    debug_assert!(grammar.expect_base().is_ok());
    grammar
}
