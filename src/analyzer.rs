//! Contention analysis: which pending jobs outrank a user's pending jobs.
//!
//! Everything here is a pure function of the records passed in. Priorities must
//! already be resolved by the caller; a job whose priority is `None` cannot be
//! analysed and gets `None` back, which is different from `Some(vec![])`
//! ("nothing currently ranks ahead of this job").

use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;

use crate::models::JobRecord;

/// Why a blocker ranks ahead of the target job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BlockerLabel {
    /// Submitted after the target job yet ranks ahead of it
    QueueJump,
    /// Submitted earlier (or at the same time) and outranks the target
    NormalWait,
}

/// A job of another user that currently ranks ahead of a target job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockerRelation {
    pub target_job_id: String,
    pub blocking_job_id: String,
    pub blocking_user: String,
    pub blocking_priority: i64,
    pub blocking_submit_time: Option<DateTime<Tz>>,
    pub label: BlockerLabel,
}

/// Analysis result for one of the user's jobs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobContention {
    pub job: JobRecord,
    /// `None` when the job's priority is unresolved
    pub blockers: Option<Vec<BlockerRelation>>,
}

impl JobContention {
    #[must_use]
    pub fn is_unblocked(&self) -> bool {
        self.blockers.as_ref().is_some_and(Vec::is_empty)
    }

    #[must_use]
    pub fn queue_jumps(&self) -> usize {
        self.count(BlockerLabel::QueueJump)
    }

    #[must_use]
    pub fn normal_waits(&self) -> usize {
        self.count(BlockerLabel::NormalWait)
    }

    fn count(&self, label: BlockerLabel) -> usize {
        self.blockers
            .iter()
            .flatten()
            .filter(|b| b.label == label)
            .count()
    }
}

/// Classify a blocker by comparing submit times.
///
/// Only a strictly later submission counts as a jump. Without both timestamps
/// there is no evidence for a jump, so the answer is `NormalWait`.
#[must_use]
pub fn classify(target_submit: Option<&DateTime<Tz>>, blocker_submit: Option<&DateTime<Tz>>) -> BlockerLabel {
    match (target_submit, blocker_submit) {
        (Some(target), Some(blocker)) if blocker > target => BlockerLabel::QueueJump,
        _ => BlockerLabel::NormalWait,
    }
}

/// Find every job of another user that strictly outranks `target`.
///
/// Returns `None` if the target's priority is unresolved. Blockers are sorted by
/// priority, highest first; equal priorities keep their order in `cluster`.
#[must_use]
pub fn find_blockers(target: &JobRecord, cluster: &[JobRecord]) -> Option<Vec<BlockerRelation>> {
    let target_priority = target.priority?;

    let mut blockers: Vec<BlockerRelation> = cluster
        .iter()
        .filter(|other| other.user != target.user)
        .filter_map(|other| {
            let priority = other.priority.filter(|p| *p > target_priority)?;
            Some(BlockerRelation {
                target_job_id: target.id.clone(),
                blocking_job_id: other.id.clone(),
                blocking_user: other.user.clone(),
                blocking_priority: priority,
                blocking_submit_time: other.submit_time,
                label: classify(target.submit_time.as_ref(), other.submit_time.as_ref()),
            })
        })
        .collect();

    // sort_by is stable
    blockers.sort_by(|a, b| b.blocking_priority.cmp(&a.blocking_priority));
    Some(blockers)
}

/// Analyse each of the user's jobs against the cluster pending set.
///
/// The output has one entry per input job, in input order.
#[must_use]
pub fn analyze(user_jobs: &[JobRecord], cluster: &[JobRecord]) -> Vec<JobContention> {
    user_jobs
        .iter()
        .map(|job| JobContention {
            job: job.clone(),
            blockers: find_blockers(job, cluster),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobState;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> Option<DateTime<Tz>> {
        chrono_tz::US::Pacific
            .with_ymd_and_hms(2025, 1, 15, hour, minute, 0)
            .single()
    }

    fn job(id: &str, user: &str, priority: Option<i64>, submit: Option<DateTime<Tz>>) -> JobRecord {
        JobRecord {
            id: id.to_string(),
            user: user.to_string(),
            submit_time: submit,
            state: JobState::Pending,
            reason: "(Priority)".to_string(),
            priority,
        }
    }

    #[test]
    fn test_reference_example() {
        let target = job("100", "alice", Some(500), at(9, 0));
        let cluster = vec![
            job("101", "bob", Some(700), at(9, 30)),
            job("102", "carol", Some(600), at(8, 0)),
        ];

        let blockers = find_blockers(&target, &cluster).unwrap();
        assert_eq!(blockers.len(), 2);
        assert_eq!(blockers[0].blocking_job_id, "101");
        assert_eq!(blockers[0].blocking_priority, 700);
        assert_eq!(blockers[0].label, BlockerLabel::QueueJump);
        assert_eq!(blockers[1].blocking_job_id, "102");
        assert_eq!(blockers[1].blocking_priority, 600);
        assert_eq!(blockers[1].label, BlockerLabel::NormalWait);
        assert!(blockers.iter().all(|b| b.target_job_id == "100"));
    }

    #[test]
    fn test_equal_priority_never_blocks() {
        let target = job("100", "alice", Some(500), at(9, 0));
        let cluster = vec![job("101", "bob", Some(500), at(9, 30))];
        assert_eq!(find_blockers(&target, &cluster), Some(vec![]));
    }

    #[test]
    fn test_lower_and_unresolved_competitors_do_not_block() {
        let target = job("100", "alice", Some(500), at(9, 0));
        let cluster = vec![
            job("101", "bob", Some(499), at(8, 0)),
            job("102", "bob", None, at(8, 0)),
        ];
        let result = find_blockers(&target, &cluster).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_same_user_jobs_are_ignored() {
        let target = job("100", "alice", Some(500), at(9, 0));
        let cluster = vec![
            job("100", "alice", Some(500), at(9, 0)),
            job("103", "alice", Some(900), at(10, 0)),
        ];
        assert_eq!(find_blockers(&target, &cluster), Some(vec![]));
    }

    #[test]
    fn test_unresolved_target_priority_is_undefined_not_empty() {
        let unresolved = job("100", "alice", None, at(9, 0));
        let resolved = job("101", "alice", Some(10_000), at(9, 0));
        let cluster = vec![job("200", "bob", Some(700), at(9, 30))];

        let results = analyze(&[unresolved, resolved], &cluster);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].blockers, None);
        assert!(!results[0].is_unblocked());
        assert_eq!(results[1].blockers, Some(vec![]));
        assert!(results[1].is_unblocked());
    }

    #[test]
    fn test_same_submit_time_is_normal_wait() {
        let target = job("100", "alice", Some(500), at(9, 0));
        let cluster = vec![job("101", "bob", Some(700), at(9, 0))];
        let blockers = find_blockers(&target, &cluster).unwrap();
        assert_eq!(blockers[0].label, BlockerLabel::NormalWait);
    }

    #[test]
    fn test_missing_timestamps_are_normal_wait() {
        let target = job("100", "alice", Some(500), at(9, 0));
        let cluster = vec![job("101", "bob", Some(700), None)];
        assert_eq!(
            find_blockers(&target, &cluster).unwrap()[0].label,
            BlockerLabel::NormalWait
        );

        let untimed_target = job("100", "alice", Some(500), None);
        let cluster = vec![job("101", "bob", Some(700), at(23, 0))];
        assert_eq!(
            find_blockers(&untimed_target, &cluster).unwrap()[0].label,
            BlockerLabel::NormalWait
        );
    }

    #[test]
    fn test_sorted_descending_and_stable_for_ties() {
        let target = job("100", "alice", Some(100), at(9, 0));
        let cluster = vec![
            job("a", "bob", Some(300), at(8, 0)),
            job("b", "carol", Some(900), at(8, 0)),
            job("c", "dave", Some(300), at(10, 0)),
            job("d", "erin", Some(300), at(7, 0)),
            job("e", "frank", Some(500), at(11, 0)),
        ];

        let blockers = find_blockers(&target, &cluster).unwrap();
        let ids: Vec<&str> = blockers.iter().map(|b| b.blocking_job_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "e", "a", "c", "d"]);
        assert!(blockers
            .windows(2)
            .all(|w| w[0].blocking_priority >= w[1].blocking_priority));
    }

    #[test]
    fn test_label_counts() {
        let target = job("100", "alice", Some(500), at(9, 0));
        let cluster = vec![
            job("101", "bob", Some(700), at(9, 30)),
            job("102", "carol", Some(600), at(8, 0)),
            job("103", "carol", Some(800), at(12, 0)),
        ];
        let results = analyze(&[target], &cluster);
        assert_eq!(results[0].queue_jumps(), 2);
        assert_eq!(results[0].normal_waits(), 1);
    }
}
