use clap::{ArgAction, Parser};
use refit::grammar::cache::CacheError;
use refit::oracle::CommandOracle;
use refit::repair::{CacheOptions, RepairStatus, Repairer};
use refit::samples::{self, SampleError};
use refit::Config;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing::warn;

/// Repairs malformed format strings: learns a DFA from positive/negative samples with RPNI,
/// repairs broken inputs with an error-correcting Earley parser over the learned grammar, and
/// validates every candidate with the given oracle binary.
#[derive(Debug, Parser)]
#[command(name = "refit", version)]
struct RefitArgs {
    /// Validator binary, invoked as `<oracle> <file>`; exit code 0 accepts
    #[arg(long)]
    oracle: PathBuf,
    /// Positive samples, one per line (blank line = empty string). Optional when an existing
    /// grammar cache is given.
    #[arg(long)]
    positives: Option<PathBuf>,
    /// Initial negative samples, one per line
    #[arg(long)]
    negatives: Option<PathBuf>,
    /// A single broken input to repair
    #[arg(long)]
    broken: Option<String>,
    /// Broken inputs, one per line
    #[arg(long)]
    broken_file: Option<PathBuf>,
    /// When exactly one broken input is processed, write the repaired text here
    #[arg(long)]
    output_file: Option<PathBuf>,
    /// Grammar cache path: loaded when it exists, written after learning otherwise
    #[arg(long)]
    grammar_cache: Option<PathBuf>,
    /// Relearn from the samples even when the cache exists, overwriting it
    #[arg(long)]
    init_cache: bool,
    /// Rewrite the grammar cache whenever a repair round relearns
    #[arg(long)]
    update_cache_on_relearn: bool,
    /// Penalty cap for Earley states; higher tolerates longer junk
    #[arg(long, default_value_t = 8)]
    max_penalty: u32,
    /// Select a repair of exactly this penalty instead of the minimum (capped at 8)
    #[arg(long)]
    penalty: Option<u32>,
    /// Seconds each parse attempt may take
    #[arg(long, default_value_t = 5.0)]
    parse_timeout: f64,
    /// Relearn rounds per broken input after the initial attempt
    #[arg(long, default_value_t = 5)]
    max_attempts: u32,
    /// Seconds the oracle may take per candidate
    #[arg(long, default_value_t = 10.0)]
    oracle_timeout: f64,
    /// Seed for deterministic tie-breaking between equal-cost repairs
    #[arg(long)]
    seed: Option<u64>,
    /// Process at most this many broken inputs
    #[arg(long)]
    limit: Option<usize>,
    /// More logging (-v: info, -vv: debug, -vvv: trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Sample(#[from] SampleError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("could not write {path}: {source}")]
    Output {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("nothing to learn from: no positive samples and no existing grammar cache")]
    NoSamples,
}

fn main() -> ExitCode {
    let args = RefitArgs::parse();

    let level = match args.verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    match run(&args) {
        Ok(failures) if failures == 0 => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("refit: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &RefitArgs) -> Result<usize, CliError> {
    let positives = match &args.positives {
        Some(path) => samples::read_sample_file(path)?,
        None => vec![],
    };
    let negatives = match &args.negatives {
        Some(path) => samples::read_sample_file(path)?,
        None => vec![],
    };

    let target_penalty = args.penalty.map(|p| {
        if p > 8 {
            warn!("--penalty {p} exceeds the maximum of 8, capping");
            8
        } else {
            p
        }
    });
    let config = Config {
        max_penalty: args.max_penalty,
        parse_timeout: Duration::from_secs_f64(args.parse_timeout),
        max_attempts: args.max_attempts,
        seed: args.seed,
        target_penalty,
    };

    let cached = args
        .grammar_cache
        .as_ref()
        .map_or(false, |path| path.exists() && !args.init_cache);
    if positives.is_empty() && !cached {
        return Err(CliError::NoSamples);
    }

    let mut repairer = match &args.grammar_cache {
        Some(path) => Repairer::with_cache(
            CacheOptions {
                path: path.clone(),
                refresh: args.init_cache,
                update_on_relearn: args.update_cache_on_relearn,
            },
            positives,
            negatives,
            config,
        )?,
        None => Repairer::learn(positives, negatives, config),
    };

    let mut broken_inputs: Vec<String> = vec![];
    if let Some(path) = &args.broken_file {
        broken_inputs.extend(samples::read_sample_file(path)?);
    }
    if let Some(broken) = &args.broken {
        broken_inputs.push(broken.clone());
    }
    // de-duplicate, preserving order
    let mut seen = std::collections::HashSet::new();
    broken_inputs.retain(|input| seen.insert(input.clone()));
    if let Some(limit) = args.limit {
        broken_inputs.truncate(limit);
    }
    if broken_inputs.is_empty() {
        println!("No broken inputs given; grammar is learned and cached, nothing to repair.");
        return Ok(0);
    }

    let oracle =
        CommandOracle::new(&args.oracle).with_timeout(Duration::from_secs_f64(args.oracle_timeout));

    let mut successes = 0;
    let mut failures = 0;
    let single_input = broken_inputs.len() == 1;
    for (case, broken) in broken_inputs.iter().enumerate() {
        let repaired = repairer.repair(broken, &oracle);
        match (&repaired.status, &repaired.output) {
            (RepairStatus::Ok, Some(output)) => {
                successes += 1;
                println!(
                    "[{}] {broken:?} -> {output:?} (penalty {}, {} attempt{})",
                    case + 1,
                    repaired.penalty.unwrap_or(0),
                    repaired.attempts,
                    if repaired.attempts == 1 { "" } else { "s" },
                );
            }
            (RepairStatus::Failed, Some(output)) => {
                failures += 1;
                println!(
                    "[{}] {broken:?} -> {output:?} REJECTED after {} attempts",
                    case + 1,
                    repaired.attempts,
                );
            }
            (_, None) => {
                failures += 1;
                println!(
                    "[{}] {broken:?} could not be repaired (no parse within the penalty cap)",
                    case + 1,
                );
            }
        }
        if single_input {
            if let (Some(path), Some(output)) = (&args.output_file, &repaired.output) {
                fs::write(path, output).map_err(|source| CliError::Output {
                    path: path.clone(),
                    source,
                })?;
            }
        }
    }

    println!(
        "Processed {}, repaired {successes}, failed {failures}",
        broken_inputs.len()
    );
    Ok(failures)
}
