//! Refresh loop driving the live dashboard.
//!
//! The loop alternates between two states:
//! - Polling: run the blocking scheduler query on the blocking pool, aggregate,
//!   render
//! - Idle-wait: `tokio::select!` between the refresh sleep and cancellation
//!
//! Cancellation comes from a separate watcher task through a
//! [`CancellationToken`]. Both states race the token, so a quit key is acted
//! on within one interval even while squeue hangs.
//! A failed query never ends the loop; it produces an empty snapshot that
//! carries the error for display. A failed draw is shown on the next frame.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tokio_util::sync::CancellationToken;

use crate::error::GatewayError;
use crate::models::ListingRow;
use crate::normalize::{Normalizer, ParsedBatch};
use crate::slurm::{SchedulerGateway, SlurmInterface};
use crate::snapshot::{QueueFilter, Snapshot, aggregate};

/// Consecutive render failures after which the loop gives up
pub const MAX_RENDER_FAILURES: u32 = 3;

/// Where a poll cycle gets its rows from.
pub trait SnapshotSource: Send + Sync + 'static {
    fn poll(&self) -> Result<ParsedBatch<ListingRow>, GatewayError>;
}

/// Live listing straight from squeue.
#[derive(Debug, Clone)]
pub struct SlurmListing {
    pub slurm: SlurmInterface,
    pub normalizer: Normalizer,
    pub partitions: Vec<String>,
}

impl SnapshotSource for SlurmListing {
    fn poll(&self) -> Result<ParsedBatch<ListingRow>, GatewayError> {
        let output = self.slurm.queue_listing(&self.partitions)?;
        Ok(self.normalizer.parse_listing(&output))
    }
}

/// Receives one snapshot per cycle.
pub trait Renderer {
    fn render(&mut self, snapshot: &Snapshot) -> Result<()>;
}

/// Current time in the reference zone.
pub fn system_now(tz: Tz) -> DateTime<Tz> {
    Utc::now().with_timezone(&tz)
}

/// Per-run settings of the refresh loop.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub interval: Duration,
    pub filter: QueueFilter,
    pub timezone: Tz,
    pub long_wait: chrono::Duration,
    /// Sampled once per cycle
    pub clock: fn(Tz) -> DateTime<Tz>,
}

impl LoopSettings {
    #[must_use]
    pub fn new(interval: Duration, filter: QueueFilter, timezone: Tz, long_wait: chrono::Duration) -> Self {
        Self {
            interval,
            filter,
            timezone,
            long_wait,
            clock: system_now,
        }
    }
}

/// What happened over the lifetime of a loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub cycles: u64,
    pub failed_cycles: u64,
    pub render_failures: u64,
}

/// Run one Polling step: query, aggregate, never fail.
pub async fn poll_cycle<S: SnapshotSource>(source: &Arc<S>, settings: &LoopSettings) -> Snapshot {
    let source = Arc::clone(source);
    let result = tokio::task::spawn_blocking(move || source.poll()).await;
    let now = (settings.clock)(settings.timezone);

    match result {
        Ok(Ok(batch)) => {
            let malformed = batch.malformed.len();
            if malformed > 0 {
                tracing::debug!(malformed, "Dropped malformed listing lines");
            }
            let mut snapshot = aggregate(batch.records, &settings.filter, now, settings.long_wait);
            snapshot.malformed_lines = malformed;
            snapshot
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Queue listing failed, showing empty snapshot");
            Snapshot::unavailable(now, e.to_string())
        }
        Err(e) => {
            tracing::warn!(error = %e, "Queue listing task failed");
            Snapshot::unavailable(now, format!("Task join error: {}", e))
        }
    }
}

/// Poll and render until `cancel` fires.
///
/// Returns early only after [`MAX_RENDER_FAILURES`] draws in a row have
/// failed.
pub async fn run_refresh_loop<S, R>(
    source: Arc<S>,
    renderer: &mut R,
    settings: &LoopSettings,
    cancel: CancellationToken,
) -> Result<LoopSummary>
where
    S: SnapshotSource,
    R: Renderer + ?Sized,
{
    let mut summary = LoopSummary::default();
    tracing::info!(interval = ?settings.interval, "Refresh loop started");

    let mut render_error: Option<String> = None;
    let mut failures_in_row = 0;

    while !cancel.is_cancelled() {
        // A hung query is abandoned on cancel; its blocking thread finishes alone
        let mut snapshot = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            snapshot = poll_cycle(&source, settings) => snapshot,
        };
        summary.cycles += 1;
        if snapshot.gateway_error.is_some() {
            summary.failed_cycles += 1;
        }

        snapshot.render_error = render_error.take();
        match renderer.render(&snapshot) {
            Ok(()) => failures_in_row = 0,
            Err(e) => {
                summary.render_failures += 1;
                failures_in_row += 1;
                tracing::warn!(error = %format!("{e:#}"), failures_in_row, "Dashboard render failed");
                if failures_in_row >= MAX_RENDER_FAILURES {
                    return Err(e.context(format!("Rendering failed {failures_in_row} times in a row")));
                }
                render_error = Some(format!("{e:#}"));
            }
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(settings.interval) => {}
        }
    }

    tracing::info!(
        cycles = summary.cycles,
        failed_cycles = summary.failed_cycles,
        render_failures = summary.render_failures,
        "Refresh loop stopped"
    );
    Ok(summary)
}
