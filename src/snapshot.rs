//! Per-cycle aggregation of the live queue listing.
//!
//! [`aggregate`] filters one poll's rows, counts them per state bucket and
//! derives the per-row display facts. It never reorders rows and never touches
//! the canonical record fields.

use chrono::{DateTime, Duration};
use chrono_tz::Tz;
use serde::Serialize;

use crate::models::{JobState, ListingRow};

/// Per-state job counts for one snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotStats {
    pub running: usize,
    pub pending: usize,
    pub completing: usize,
    pub other: usize,
}

impl SnapshotStats {
    pub fn record(&mut self, state: JobState) {
        *self.slot(state) += 1;
    }

    #[must_use]
    pub fn get(&self, state: JobState) -> usize {
        match state {
            JobState::Running => self.running,
            JobState::Pending => self.pending,
            JobState::Completing => self.completing,
            JobState::Other => self.other,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.running + self.pending + self.completing + self.other
    }

    fn slot(&mut self, state: JobState) -> &mut usize {
        match state {
            JobState::Running => &mut self.running,
            JobState::Pending => &mut self.pending,
            JobState::Completing => &mut self.completing,
            JobState::Other => &mut self.other,
        }
    }
}

/// Which rows the caller asked to see. Empty lists mean "everything".
#[derive(Debug, Clone, Default)]
pub struct QueueFilter {
    pub users: Vec<String>,
    pub partitions: Vec<String>,
}

impl QueueFilter {
    #[must_use]
    pub fn matches(&self, row: &ListingRow) -> bool {
        let user_ok = self.users.is_empty() || self.users.iter().any(|u| *u == row.record.user);
        let partition_ok = self.partitions.is_empty()
            || self
                .partitions
                .iter()
                .any(|p| p.eq_ignore_ascii_case(&row.partition));
        user_ok && partition_ok
    }
}

/// A listing row with the facts derived for this cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotRow {
    #[serde(flatten)]
    pub row: ListingRow,
    /// Pending for longer than the long-wait threshold
    pub long_wait: bool,
    /// Time since submission at `taken_at`; `None` without a submit time
    pub waited_secs: Option<i64>,
}

/// Everything the presentation layer needs for one dashboard frame.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub taken_at: DateTime<Tz>,
    pub rows: Vec<SnapshotRow>,
    pub stats: SnapshotStats,
    /// Set when the gateway query failed and `rows` is empty because of it
    pub gateway_error: Option<String>,
    /// Lines of this poll that could not be parsed
    pub malformed_lines: usize,
    /// Set when drawing the previous frame failed
    pub render_error: Option<String>,
}

impl Snapshot {
    /// An empty snapshot for a cycle whose query failed.
    #[must_use]
    pub fn unavailable(taken_at: DateTime<Tz>, error: String) -> Self {
        Self {
            taken_at,
            rows: Vec::new(),
            stats: SnapshotStats::default(),
            gateway_error: Some(error),
            malformed_lines: 0,
            render_error: None,
        }
    }
}

/// Filter, count and annotate one poll's rows.
///
/// `now` is sampled once by the caller for the whole cycle.
#[must_use]
pub fn aggregate(
    rows: Vec<ListingRow>,
    filter: &QueueFilter,
    now: DateTime<Tz>,
    long_wait_after: Duration,
) -> Snapshot {
    let mut stats = SnapshotStats::default();

    let rows: Vec<SnapshotRow> = rows
        .into_iter()
        .filter(|row| filter.matches(row))
        .map(|row| {
            stats.record(row.record.state);
            let waited = row.record.submit_time.map(|submitted| now - submitted);
            let long_wait = row.record.is_pending() && waited.is_some_and(|w| w > long_wait_after);
            SnapshotRow {
                waited_secs: waited.map(|w| w.num_seconds()),
                long_wait,
                row,
            }
        })
        .collect();

    Snapshot {
        taken_at: now,
        rows,
        stats,
        gateway_error: None,
        malformed_lines: 0,
        render_error: None,
    }
}
