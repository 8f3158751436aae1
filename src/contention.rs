//! Builds per-user contention reports by driving the gateway.
//!
//! This is the I/O half of the analyzer: it asks the scheduler for the user's
//! pending jobs, the cluster pending set, each job's resolved priority and its
//! priority breakdown, then hands the records to [`analyzer::analyze`].

use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;

use crate::analyzer::{self, JobContention};
use crate::models::{JobRecord, PriorityBreakdown};
use crate::normalize::{Normalizer, parse_priority, parse_priority_breakdown};
use crate::slurm::{SchedulerGateway, or_empty};

/// Analysis of one pending job of the requested user.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    #[serde(flatten)]
    pub contention: JobContention,
    /// Time spent in the queue so far; `None` without a submit time
    pub waited_secs: Option<i64>,
    pub breakdown: PriorityBreakdown,
}

/// Contention report for one user in one set of partitions.
#[derive(Debug, Clone, Serialize)]
pub struct UserReport {
    pub user: String,
    pub partitions: Vec<String>,
    pub generated_at: DateTime<Tz>,
    pub jobs: Vec<JobReport>,
    /// Gateway lines that could not be parsed, across all queries
    pub malformed_lines: usize,
}

impl UserReport {
    #[must_use]
    pub fn total_queue_jumps(&self) -> usize {
        self.jobs.iter().map(|j| j.contention.queue_jumps()).sum()
    }

    #[must_use]
    pub fn total_normal_waits(&self) -> usize {
        self.jobs.iter().map(|j| j.contention.normal_waits()).sum()
    }
}

/// Resolve a job's priority through the gateway.
pub fn resolve_priority<G: SchedulerGateway + ?Sized>(gateway: &G, job_id: &str) -> Option<i64> {
    let priority = parse_priority(&or_empty(gateway.job_priority(job_id), "scontrol show job"));
    if priority.is_none() {
        tracing::debug!(job_id, "Priority unresolved");
    }
    priority
}

/// Fetch the cluster pending set with priorities resolved.
///
/// Returns the records and the number of malformed lines dropped.
pub fn fetch_cluster_pending<G: SchedulerGateway + ?Sized>(
    gateway: &G,
    normalizer: &Normalizer,
    partitions: &[String],
) -> (Vec<JobRecord>, usize) {
    let output = or_empty(gateway.cluster_pending(partitions), "squeue cluster pending");
    let batch = normalizer.parse_cluster_pending(&output);

    let records = batch
        .records
        .into_iter()
        .map(|record| {
            let priority = resolve_priority(gateway, &record.id);
            record.with_priority(priority)
        })
        .collect();

    (records, batch.malformed.len())
}

/// Build the report for one user against an already fetched cluster set.
///
/// `now` is sampled once by the caller so every job's wait is measured against
/// the same instant.
pub fn build_user_report<G: SchedulerGateway + ?Sized>(
    gateway: &G,
    normalizer: &Normalizer,
    user: &str,
    partitions: &[String],
    cluster: &[JobRecord],
    now: DateTime<Tz>,
) -> UserReport {
    let output = or_empty(gateway.user_pending(user, partitions), "squeue user pending");
    let batch = normalizer.parse_user_pending(user, &output);
    let malformed_lines = batch.malformed.len();

    let user_jobs: Vec<JobRecord> = batch
        .records
        .into_iter()
        .map(|record| {
            let priority = resolve_priority(gateway, &record.id);
            record.with_priority(priority)
        })
        .collect();

    let jobs = analyzer::analyze(&user_jobs, cluster)
        .into_iter()
        .map(|contention| {
            let breakdown = parse_priority_breakdown(&or_empty(
                gateway.priority_breakdown(&contention.job.id),
                "sprio",
            ));
            let waited_secs = contention
                .job
                .submit_time
                .map(|submitted| (now - submitted).num_seconds());
            JobReport {
                contention,
                waited_secs,
                breakdown,
            }
        })
        .collect();

    tracing::debug!(user, malformed_lines, "Built contention report");

    UserReport {
        user: user.to_string(),
        partitions: partitions.to_vec(),
        generated_at: now,
        jobs,
        malformed_lines,
    }
}

/// Build reports for every requested user, fetching the cluster set once.
pub fn build_reports<G: SchedulerGateway + ?Sized>(
    gateway: &G,
    normalizer: &Normalizer,
    users: &[String],
    partitions: &[String],
    now: DateTime<Tz>,
) -> Vec<UserReport> {
    let (cluster, cluster_malformed) = fetch_cluster_pending(gateway, normalizer, partitions);

    users
        .iter()
        .map(|user| {
            let mut report = build_user_report(gateway, normalizer, user, partitions, &cluster, now);
            report.malformed_lines += cluster_malformed;
            report
        })
        .collect()
}
