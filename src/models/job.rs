//! Job records produced by the normalizer.

use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;

use super::state::JobState;

/// A single job as seen in one query of the scheduler.
///
/// `submit_time` is `None` when the gateway's timestamp could not be parsed;
/// such records are still listed but never take part in time comparisons.
/// `priority` is `None` until it has been resolved from the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRecord {
    pub id: String,
    pub user: String,
    pub submit_time: Option<DateTime<Tz>>,
    pub state: JobState,
    pub reason: String,
    pub priority: Option<i64>,
}

impl JobRecord {
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.state == JobState::Pending
    }

    /// Builder-style priority assignment, used once the scheduler has been asked.
    #[must_use]
    pub fn with_priority(mut self, priority: Option<i64>) -> Self {
        self.priority = priority;
        self
    }
}

/// One row of the live queue listing.
///
/// Wraps the canonical `JobRecord` with the extra columns the dashboard shows.
/// The extra columns are kept verbatim from `squeue`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingRow {
    pub record: JobRecord,
    pub partition: String,
    pub name: String,
    pub nodes: String,
    pub elapsed: String,
    pub time_left: String,
    /// Submit column exactly as squeue printed it
    pub submit_raw: String,
}

/// Well-known `sprio` component columns, in display order.
pub const PRIORITY_COMPONENTS: &[&str] = &["AGE", "FAIRSHARE", "JOBSIZE", "QOS", "TRES"];

/// Decomposition of a job's priority into named factors as reported by `sprio`.
///
/// Columns are kept in the order sprio printed them. A component that is not
/// present is unknown, not zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PriorityBreakdown {
    components: Vec<(String, i64)>,
}

impl PriorityBreakdown {
    #[must_use]
    pub fn new(components: Vec<(String, i64)>) -> Self {
        Self { components }
    }

    /// Look up a component by name, case-insensitively.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<i64> {
        self.components
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| *v)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.components.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breakdown_lookup_is_case_insensitive() {
        let breakdown = PriorityBreakdown::new(vec![
            ("AGE".to_string(), 120),
            ("FAIRSHARE".to_string(), 3400),
        ]);
        assert_eq!(breakdown.get("age"), Some(120));
        assert_eq!(breakdown.get("FairShare"), Some(3400));
    }

    #[test]
    fn test_breakdown_missing_component_is_unknown() {
        let breakdown = PriorityBreakdown::new(vec![("AGE".to_string(), 0)]);
        assert_eq!(breakdown.get("AGE"), Some(0));
        assert_eq!(breakdown.get("QOS"), None);
        assert!(PriorityBreakdown::default().is_empty());
    }
}
