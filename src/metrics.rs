/// JSON metrics decoding.
///
/// The test script decides what its metrics look like; any JSON value is
/// accepted and nothing is validated beyond decoding.
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Metrics as collected from a script's output.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectedMetrics {
    /// Output decoded as JSON.
    Json(Value),
    /// Output that was not valid JSON, kept verbatim.
    Raw(String),
}

impl fmt::Display for CollectedMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectedMetrics::Json(value) => write!(f, "{value}"),
            CollectedMetrics::Raw(text) => f.write_str(text),
        }
    }
}

/// Where the metrics are read from once the command succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricsSource {
    /// The command's captured stdout.
    Stdout,
    /// A file the command writes, relative to the exec dir unless absolute.
    File(PathBuf),
}

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("failed to read metrics file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode metrics as JSON: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
    },
}

/// Decode `text` as JSON, falling back to the raw text on failure.
pub fn parse_lenient(text: &str) -> CollectedMetrics {
    match parse_strict(text) {
        Ok(value) => CollectedMetrics::Json(value),
        Err(e) => {
            tracing::debug!(error = %e, "output is not JSON, keeping raw text");
            CollectedMetrics::Raw(text.to_string())
        }
    }
}

/// Decode `text` as JSON; a decode failure is an error.
///
/// Bare `NaN`, `Infinity` and `-Infinity` (as written by Python's `json`
/// module) decode to `null`.
pub fn parse_strict(text: &str) -> Result<Value, MetricsError> {
    match serde_json::from_str(text) {
        Ok(value) => Ok(value),
        Err(source) => match replace_non_finite(text) {
            Some(patched) => {
                serde_json::from_str(&patched).map_err(|_| MetricsError::Decode { source })
            }
            None => Err(MetricsError::Decode { source }),
        },
    }
}

const NON_FINITE_TOKENS: [&str; 3] = ["-Infinity", "Infinity", "NaN"];

/// Replace non-finite number tokens outside of string literals with `null`.
/// `None` if there was nothing to replace.
fn replace_non_finite(text: &str) -> Option<String> {
    let mut out = String::with_capacity(text.len());
    let mut replaced = false;
    let mut in_string = false;
    let mut escaped = false;
    let mut rest = text;

    while let Some(c) = rest.chars().next() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
        } else if let Some(token) = NON_FINITE_TOKENS.iter().find(|t| rest.starts_with(**t)) {
            let follows_word = out.chars().last().is_some_and(|p| p.is_alphanumeric());
            let precedes_word = rest[token.len()..]
                .chars()
                .next()
                .is_some_and(|n| n.is_alphanumeric());
            if !follows_word && !precedes_word {
                out.push_str("null");
                rest = &rest[token.len()..];
                replaced = true;
                continue;
            }
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }

    replaced.then_some(out)
}

/// Remove a metrics file left behind by an earlier run.
pub fn clear_file(path: &Path) -> Result<(), MetricsError> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "removed stale metrics file");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(MetricsError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Read and strictly decode a metrics file.
pub fn load_file(path: &Path) -> Result<Value, MetricsError> {
    let contents = std::fs::read_to_string(path).map_err(|source| MetricsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_strict(&contents)
}
