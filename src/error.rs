//! Error types for the scheduler gateway and the record normalizer.
//!
//! Neither kind is fatal: gateway failures degrade to an empty result and
//! malformed lines are dropped one at a time.

use thiserror::Error;

/// A read-only scheduler query that produced no usable output.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("failed to execute {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with code {code}: {stderr}")]
    NonZeroExit {
        command: String,
        code: i32,
        stderr: String,
    },
}

impl GatewayError {
    /// The scheduler command that failed (e.g. "squeue").
    #[must_use]
    pub fn command(&self) -> &str {
        match self {
            GatewayError::Spawn { command, .. } | GatewayError::NonZeroExit { command, .. } => {
                command
            }
        }
    }
}

/// A gateway output line that does not have the expected shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed {kind} line (expected at least {expected} fields, got {found}): '{line}'")]
pub struct MalformedRecord {
    pub kind: &'static str,
    pub expected: usize,
    pub found: usize,
    pub line: String,
}
