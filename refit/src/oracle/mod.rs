//! # Validation oracles
//! The repair loop never trusts a repaired string on its own: every candidate is shown to a
//! black-box [Oracle] that accepts or rejects it. The production oracle is an external validator
//! binary ([CommandOracle]); closures implement the trait too, which keeps tests free of
//! subprocesses:
//!
//! ```
//! use refit::oracle::Oracle;
//!
//! let oracle = |candidate: &str| candidate.len() == 2;
//! assert_eq!(oracle.accepts("ab").unwrap(), true);
//! assert_eq!(oracle.accepts("abc").unwrap(), false);
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Errors from consulting an oracle. The repair loop folds every one of these into a plain
/// rejection, so a flaky validator degrades repair quality but never aborts a run.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("could not hand the candidate to the oracle: {0}")]
    Io(#[from] std::io::Error),
    #[error("oracle did not answer within {0:?}")]
    Timeout(Duration),
}

/// A black-box accept/reject decision over candidate strings
pub trait Oracle {
    fn accepts(&self, candidate: &str) -> Result<bool, OracleError>;
}

impl<F: Fn(&str) -> bool> Oracle for F {
    fn accepts(&self, candidate: &str) -> Result<bool, OracleError> {
        Ok(self(candidate))
    }
}

/// An external validator binary. The candidate is written to a temporary file and the binary is
/// invoked as `<oracle> <file>`; exit code 0 accepts, anything else rejects. Standard output
/// and standard error are discarded. A validator that keeps running past the deadline is killed
/// and reported as [OracleError::Timeout].
#[derive(Debug, Clone)]
pub struct CommandOracle {
    program: PathBuf,
    timeout: Duration,
}

/// How often a running validator is checked against its deadline
const POLL_INTERVAL: Duration = Duration::from_millis(10);

impl CommandOracle {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Oracle for CommandOracle {
    fn accepts(&self, candidate: &str) -> Result<bool, OracleError> {
        let mut file = NamedTempFile::new()?;
        file.write_all(candidate.as_bytes())?;
        file.flush()?;

        let mut child = Command::new(&self.program)
            .arg(file.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status.success());
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(OracleError::Timeout(self.timeout));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_oracles() {
        let only_a = |candidate: &str| candidate == "a";
        assert!(only_a.accepts("a").unwrap());
        assert!(!only_a.accepts("b").unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn command_oracle_reads_exit_code() {
        // `true` ignores its argument and exits 0; `false` exits 1
        let accept_all = CommandOracle::new("true");
        assert!(accept_all.accepts("anything").unwrap());
        let reject_all = CommandOracle::new("false");
        assert!(!reject_all.accepts("anything").unwrap());
    }
}
