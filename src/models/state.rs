//! Job state buckets.
//!
//! The dashboard and the analyzer only distinguish the three states that matter
//! for queue contention. Every other Slurm state (suspended, completed, failed,
//! ...) and every string we fail to recognise collapses into `Other`.

use serde::Serialize;

/// Job state bucket parsed from Slurm state strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum JobState {
    Pending,
    Running,
    Completing,
    #[default]
    Other,
}

impl JobState {
    /// All buckets in display order.
    pub const ALL: [JobState; 4] = [
        JobState::Running,
        JobState::Pending,
        JobState::Completing,
        JobState::Other,
    ];

    /// Create a JobState from a single state string.
    ///
    /// Handles both full names (e.g., "RUNNING") and short codes (e.g., "R").
    /// Also handles state strings with additional info like "PENDING (Priority)".
    #[must_use]
    pub fn from_state_string(state: &str) -> Self {
        match state.split_whitespace().next() {
            Some("RUNNING") | Some("R") => Self::Running,
            Some("PENDING") | Some("PD") => Self::Pending,
            Some("COMPLETING") | Some("CG") => Self::Completing,
            _ => Self::Other,
        }
    }

    /// Return the full Slurm state name (or "OTHER").
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Completing => "COMPLETING",
            Self::Other => "OTHER",
        }
    }

    /// Return the short squeue code for the state.
    #[must_use]
    pub fn short_str(&self) -> &'static str {
        match self {
            Self::Pending => "PD",
            Self::Running => "R",
            Self::Completing => "CG",
            Self::Other => "?",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
