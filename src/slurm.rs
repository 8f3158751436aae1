//! Read-only interface to the Slurm command line tools.
//!
//! This module wraps `squeue`, `scontrol show job` and `sprio` behind the
//! [`SchedulerGateway`] trait. Each query returns the raw text output; turning
//! it into records is the normalizer's job. Nothing here ever modifies
//! scheduler state.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::GatewayError;

/// How the Slurm binary path was resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathResolution {
    /// Explicitly configured via config file or environment variable
    Configured,
    /// Auto-detected via PATH (found squeue in user's PATH)
    AutoDetected,
    /// Fell back to default /usr/bin and squeue was found there
    Fallback,
    /// Fell back to default /usr/bin but squeue was NOT found (likely misconfigured)
    FallbackUnverified,
}

/// Result of finding the Slurm binary path
#[derive(Debug, Clone)]
pub struct SlurmPathResult {
    pub path: PathBuf,
    pub resolution: PathResolution,
}

/// Find the directory containing Slurm binaries.
///
/// Resolution order:
/// 1. Explicit path provided (from config) - validated to be an existing directory.
/// 2. Auto-detect via PATH using the `which` crate to find `squeue`.
/// 3. Fallback to `/usr/bin`.
pub fn find_slurm_bin_path(config_path: Option<&Path>) -> SlurmPathResult {
    if let Some(path) = config_path {
        if path.is_dir() {
            return SlurmPathResult {
                path: path.to_path_buf(),
                resolution: PathResolution::Configured,
            };
        }
        tracing::warn!(
            path = %path.display(),
            "Configured slurm_bin_path is not a valid directory, trying auto-detection"
        );
    }

    if let Ok(squeue_path) = which::which("squeue")
        && let Some(parent) = squeue_path.parent()
    {
        return SlurmPathResult {
            path: parent.to_path_buf(),
            resolution: PathResolution::AutoDetected,
        };
    }

    let fallback_path = PathBuf::from("/usr/bin");
    if fallback_path.join("squeue").exists() {
        SlurmPathResult {
            path: fallback_path,
            resolution: PathResolution::Fallback,
        }
    } else {
        SlurmPathResult {
            path: fallback_path,
            resolution: PathResolution::FallbackUnverified,
        }
    }
}

/// The read-only queries the analyzer and dashboard need from the scheduler.
///
/// Implementations return the raw line-oriented output. Callers are expected
/// to degrade an `Err` to an empty result rather than propagate it.
pub trait SchedulerGateway {
    /// Pending jobs of one user: `<id> <submit> <reason>` per line
    fn user_pending(&self, user: &str, partitions: &[String]) -> Result<String, GatewayError>;

    /// Pending jobs of everyone: `<id> <user> <submit>` per line
    fn cluster_pending(&self, partitions: &[String]) -> Result<String, GatewayError>;

    /// `scontrol show job` output for a single job
    fn job_priority(&self, job_id: &str) -> Result<String, GatewayError>;

    /// `sprio -j` header/value table for a single job
    fn priority_breakdown(&self, job_id: &str) -> Result<String, GatewayError>;

    /// Live listing of all jobs in the partitions, one row per job
    fn queue_listing(&self, partitions: &[String]) -> Result<String, GatewayError>;
}

/// Column layout of the live listing; the normalizer depends on this order.
pub const LISTING_FORMAT: &str = "%i %u %P %t %j %V %D %M %L %R";

/// Slurm interface for calling squeue/scontrol/sprio
#[derive(Debug, Clone)]
pub struct SlurmInterface {
    /// Path to directory containing Slurm binaries
    pub slurm_bin_path: PathBuf,
    resolution: PathResolution,
}

impl Default for SlurmInterface {
    fn default() -> Self {
        Self::with_config(None)
    }
}

impl SlurmInterface {
    /// Create a new SlurmInterface using configuration.
    ///
    /// If the config specifies a slurm_bin_path, use it; otherwise auto-detect.
    pub fn with_config(config_path: Option<&Path>) -> Self {
        let result = find_slurm_bin_path(config_path);
        Self {
            slurm_bin_path: result.path,
            resolution: result.resolution,
        }
    }

    /// Returns true if Slurm binaries were not found at the fallback path,
    /// indicating that every query will likely fail.
    #[must_use]
    pub fn is_unverified_fallback(&self) -> bool {
        self.resolution == PathResolution::FallbackUnverified
    }

    fn command(&self, binary: &str) -> Command {
        Command::new(self.slurm_bin_path.join(binary))
    }

    /// Run a prepared command and return its stdout.
    fn run(&self, mut cmd: Command, name: &str) -> Result<String, GatewayError> {
        tracing::debug!(command = ?cmd, "Running scheduler query");

        let output = cmd.output().map_err(|source| GatewayError::Spawn {
            command: name.to_string(),
            source,
        })?;

        if !output.status.success() {
            return Err(GatewayError::NonZeroExit {
                command: name.to_string(),
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn squeue(&self, partitions: &[String], format: &str) -> Command {
        let mut cmd = self.command("squeue");
        if !partitions.is_empty() {
            cmd.arg("-p").arg(partitions.join(","));
        }
        cmd.arg("-o").arg(format).arg("--noheader");
        cmd
    }
}

impl SchedulerGateway for SlurmInterface {
    fn user_pending(&self, user: &str, partitions: &[String]) -> Result<String, GatewayError> {
        let mut cmd = self.squeue(partitions, "%i %V %R");
        cmd.arg("-u").arg(user).arg("-t").arg("PD");
        self.run(cmd, "squeue")
    }

    fn cluster_pending(&self, partitions: &[String]) -> Result<String, GatewayError> {
        let mut cmd = self.squeue(partitions, "%i %u %V");
        cmd.arg("-t").arg("PD");
        self.run(cmd, "squeue")
    }

    fn job_priority(&self, job_id: &str) -> Result<String, GatewayError> {
        let mut cmd = self.command("scontrol");
        cmd.arg("show").arg("job").arg(job_id);
        self.run(cmd, "scontrol")
    }

    fn priority_breakdown(&self, job_id: &str) -> Result<String, GatewayError> {
        let mut cmd = self.command("sprio");
        cmd.arg("-j").arg(job_id);
        self.run(cmd, "sprio")
    }

    fn queue_listing(&self, partitions: &[String]) -> Result<String, GatewayError> {
        let cmd = self.squeue(partitions, LISTING_FORMAT);
        self.run(cmd, "squeue")
    }
}

/// Turn a failed query into an empty result, logging why.
///
/// Every gateway failure in the analyzer path is recovered from here.
pub fn or_empty(result: Result<String, GatewayError>, what: &str) -> String {
    match result {
        Ok(output) => output,
        Err(e) => {
            tracing::warn!(query = what, error = %e, "Scheduler query failed, using empty result");
            String::new()
        }
    }
}

/// Get current username from environment
pub fn get_current_user() -> Option<String> {
    std::env::var("USER")
        .or_else(|_| std::env::var("LOGNAME"))
        .ok()
        .filter(|u| !u.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_path_wins_when_it_exists() {
        let dir = std::env::temp_dir();
        let result = find_slurm_bin_path(Some(&dir));
        assert_eq!(result.resolution, PathResolution::Configured);
        assert_eq!(result.path, dir);
    }

    #[test]
    fn test_missing_configured_path_is_not_used() {
        let result = find_slurm_bin_path(Some(Path::new("/definitely/not/a/slurm/dir")));
        assert_ne!(result.resolution, PathResolution::Configured);
    }

    #[test]
    fn test_missing_binary_is_a_spawn_error() {
        let slurm = SlurmInterface {
            slurm_bin_path: PathBuf::from("/definitely/not/a/slurm/dir"),
            resolution: PathResolution::FallbackUnverified,
        };
        let err = slurm.cluster_pending(&["cpu".to_string()]).unwrap_err();
        assert!(matches!(err, GatewayError::Spawn { .. }));
        assert_eq!(err.command(), "squeue");
        assert!(slurm.is_unverified_fallback());
    }

    #[test]
    fn test_or_empty_degrades_failures() {
        let err = GatewayError::NonZeroExit {
            command: "sprio".to_string(),
            code: 1,
            stderr: "Unable to contact slurm controller".to_string(),
        };
        assert_eq!(or_empty(Err(err), "sprio"), "");
        assert_eq!(or_empty(Ok("100 x\n".to_string()), "squeue"), "100 x\n");
    }
}
