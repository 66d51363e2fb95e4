use std::time::Duration;

/// The knobs of the repair pipeline. A configuration value is passed explicitly into the
/// components that need it; there is no process-wide state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Cap on the penalty any Earley state may accumulate; costlier states are pruned from the
    /// chart. A cap of 0 turns the engine into a plain recognizer.
    pub max_penalty: u32,
    /// Wall-clock deadline for a single parse attempt. On timeout the engine retries with the
    /// cap halved, then with cap 1, before giving up.
    pub parse_timeout: Duration,
    /// How many relearn rounds the repair loop may take after the initial attempt.
    pub max_attempts: u32,
    /// Seed for the tie-breaking RNG used during extraction. Equal-cost repairs are chosen
    /// uniformly at random; a fixed seed makes runs reproducible.
    pub seed: Option<u64>,
    /// Ask extraction for a repair of exactly this penalty. When no finished parse has that
    /// penalty, the minimum-penalty one is used instead.
    pub target_penalty: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_penalty: 8,
            parse_timeout: Duration::from_secs(5),
            max_attempts: 5,
            seed: None,
            target_penalty: None,
        }
    }
}
