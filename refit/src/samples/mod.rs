//! # Sample files
//! Positive and negative samples, as well as batches of broken inputs, live in plain text
//! files: one string per line, a blank line denoting the empty string. Files must be UTF-8;
//! a line that is not valid UTF-8 is surfaced as [SampleError::MalformedInput] rather than
//! silently dropped or transliterated, since a sample the learner never saw could otherwise
//! change the inferred language unnoticed.
//!
//! ```
//! use refit::samples;
//!
//! let samples = samples::parse_samples("2024-11-05\n\n1999-01-31\n");
//! assert_eq!(samples, vec!["2024-11-05".to_string(), "".into(), "1999-01-31".into()]);
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from reading a sample file
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("could not read sample file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("sample file {path} is not valid UTF-8")]
    MalformedInput { path: PathBuf },
}

/// Splits sample-file text into one sample per line. A blank line is the empty string; there
/// is no escaping.
pub fn parse_samples(text: &str) -> Vec<String> {
    text.lines().map(str::to_string).collect()
}

/// Reads a sample file, one sample per line
pub fn read_sample_file(path: &Path) -> Result<Vec<String>, SampleError> {
    let bytes = fs::read(path).map_err(|source| SampleError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8(bytes).map_err(|_| SampleError::MalformedInput {
        path: path.to_path_buf(),
    })?;
    Ok(parse_samples(&text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_are_epsilon() {
        assert_eq!(parse_samples("a\n\nb"), vec!["a", "", "b"]);
    }

    #[test]
    fn trailing_newline_adds_no_sample() {
        assert_eq!(parse_samples("a\nb\n"), vec!["a", "b"]);
        assert_eq!(parse_samples(""), Vec::<String>::new());
    }
}
