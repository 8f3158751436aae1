//! Parsing of squeue / scontrol / sprio text output into typed records.
//!
//! Every parser works one line at a time and never aborts a batch: a line that
//! does not have the expected shape is reported as [`MalformedRecord`] and the
//! remaining lines are still parsed.

use chrono::{DateTime, NaiveDateTime, TimeZone};
use chrono_tz::Tz;

use crate::error::MalformedRecord;
use crate::models::{JobRecord, JobState, ListingRow, PriorityBreakdown};

/// Timestamp format printed by squeue's `%V` column
pub const SUBMIT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// `squeue -o "%i %V %R"`: id, submit time, reason
const USER_PENDING_FIELDS: usize = 3;
/// `squeue -o "%i %u %V"`: id, user, submit time
const CLUSTER_PENDING_FIELDS: usize = 3;
/// `squeue -o "%i %u %P %t %j %V %D %M %L %R"`
const LISTING_FIELDS: usize = 10;
/// Listing lines need at least id, user, partition and state
const LISTING_MIN_FIELDS: usize = 4;

/// Result of parsing a whole gateway output.
#[derive(Debug, Clone)]
pub struct ParsedBatch<T> {
    pub records: Vec<T>,
    pub malformed: Vec<MalformedRecord>,
}

impl<T> Default for ParsedBatch<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            malformed: Vec::new(),
        }
    }
}

/// Split a line into at most `max_fields` whitespace-delimited fields.
///
/// The last field keeps any embedded whitespace, so a free-text reason such as
/// `(ReqNodeNotAvail, Reserved for maintenance)` survives intact.
#[must_use]
pub fn split_fields(line: &str, max_fields: usize) -> Vec<&str> {
    let mut fields = Vec::with_capacity(max_fields);
    let mut rest = line.trim();

    while !rest.is_empty() && max_fields > 0 {
        if fields.len() + 1 == max_fields {
            fields.push(rest);
            break;
        }
        match rest.find(char::is_whitespace) {
            Some(end) => {
                fields.push(&rest[..end]);
                rest = rest[end..].trim_start();
            }
            None => {
                fields.push(rest);
                break;
            }
        }
    }

    fields
}

/// Parse the first `Priority=<n>` token out of `scontrol show job` output.
#[must_use]
pub fn parse_priority(output: &str) -> Option<i64> {
    output
        .split_whitespace()
        .filter_map(|token| token.strip_prefix("Priority="))
        .find_map(|value| value.parse::<i64>().ok())
}

/// Zip the header and value rows of `sprio -j <id>` into a breakdown.
///
/// The first two lines are zipped by position. Fewer than two lines yields an
/// empty breakdown. Columns whose value is not an integer are left out, so they
/// read as unknown.
#[must_use]
pub fn parse_priority_breakdown(output: &str) -> PriorityBreakdown {
    let mut lines = output.lines();
    let (Some(header), Some(values)) = (lines.next(), lines.next()) else {
        return PriorityBreakdown::default();
    };

    let components = header
        .split_whitespace()
        .zip(values.split_whitespace())
        .filter_map(|(name, value)| match value.parse::<i64>() {
            Ok(v) => Some((name.to_string(), v)),
            Err(_) => {
                tracing::debug!(component = name, raw_value = value, "Skipping non-integer sprio value");
                None
            }
        })
        .collect();

    PriorityBreakdown::new(components)
}

/// Parses gateway lines, interpreting timestamps in a fixed reference zone.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    tz: Tz,
}

impl Normalizer {
    #[must_use]
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    #[must_use]
    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Interpret a `YYYY-MM-DDTHH:MM:SS` wall-clock value as being in the
    /// reference zone.
    ///
    /// An ambiguous local time (DST fall-back) resolves to the earlier instant.
    /// A time inside a DST gap, or anything that fails to parse, yields `None`.
    #[must_use]
    pub fn parse_submit_time(&self, raw: &str) -> Option<DateTime<Tz>> {
        let naive = match NaiveDateTime::parse_from_str(raw.trim(), SUBMIT_TIME_FORMAT) {
            Ok(naive) => naive,
            Err(e) => {
                tracing::debug!(raw_value = raw, error = %e, "Failed to parse submit time");
                return None;
            }
        };
        let local = self.tz.from_local_datetime(&naive).earliest();
        if local.is_none() {
            tracing::debug!(raw_value = raw, tz = %self.tz, "Submit time falls in a DST gap");
        }
        local
    }

    /// Parse one line of the user's pending-job query (`%i %V %R`).
    pub fn parse_user_pending_line(
        &self,
        user: &str,
        line: &str,
    ) -> Result<JobRecord, MalformedRecord> {
        let fields = split_fields(line, USER_PENDING_FIELDS);
        if fields.len() < USER_PENDING_FIELDS {
            return Err(malformed("user pending", USER_PENDING_FIELDS, &fields, line));
        }

        Ok(JobRecord {
            id: fields[0].to_string(),
            user: user.to_string(),
            submit_time: self.parse_submit_time(fields[1]),
            state: JobState::Pending,
            reason: fields[2].to_string(),
            priority: None,
        })
    }

    /// Parse one line of the cluster-wide pending-job query (`%i %u %V`).
    pub fn parse_cluster_pending_line(&self, line: &str) -> Result<JobRecord, MalformedRecord> {
        let fields = split_fields(line, CLUSTER_PENDING_FIELDS);
        if fields.len() < CLUSTER_PENDING_FIELDS {
            return Err(malformed(
                "cluster pending",
                CLUSTER_PENDING_FIELDS,
                &fields,
                line,
            ));
        }

        Ok(JobRecord {
            id: fields[0].to_string(),
            user: fields[1].to_string(),
            submit_time: self.parse_submit_time(fields[2]),
            state: JobState::Pending,
            reason: String::new(),
            priority: None,
        })
    }

    /// Parse one line of the live queue listing.
    ///
    /// Lines with at least id, user, partition and state are accepted and the
    /// missing trailing columns are left empty.
    pub fn parse_listing_line(&self, line: &str) -> Result<ListingRow, MalformedRecord> {
        let fields = split_fields(line, LISTING_FIELDS);
        if fields.len() < LISTING_MIN_FIELDS {
            return Err(malformed("listing", LISTING_MIN_FIELDS, &fields, line));
        }
        let field = |i: usize| fields.get(i).copied().unwrap_or_default();

        let submit_raw = field(5);
        let record = JobRecord {
            id: field(0).to_string(),
            user: field(1).to_string(),
            submit_time: self.parse_submit_time(submit_raw),
            state: JobState::from_state_string(field(3)),
            reason: field(9).to_string(),
            priority: None,
        };

        Ok(ListingRow {
            record,
            partition: field(2).to_string(),
            name: field(4).to_string(),
            submit_raw: submit_raw.to_string(),
            nodes: field(6).to_string(),
            elapsed: field(7).to_string(),
            time_left: field(8).to_string(),
        })
    }

    /// Parse every line of the user's pending-job query.
    #[must_use]
    pub fn parse_user_pending(&self, user: &str, output: &str) -> ParsedBatch<JobRecord> {
        parse_lines(output, |line| self.parse_user_pending_line(user, line))
    }

    /// Parse every line of the cluster-wide pending-job query.
    #[must_use]
    pub fn parse_cluster_pending(&self, output: &str) -> ParsedBatch<JobRecord> {
        parse_lines(output, |line| self.parse_cluster_pending_line(line))
    }

    /// Parse every line of the live queue listing.
    #[must_use]
    pub fn parse_listing(&self, output: &str) -> ParsedBatch<ListingRow> {
        parse_lines(output, |line| self.parse_listing_line(line))
    }
}

/// Apply a per-line parser to every non-blank line, collecting drops.
pub fn parse_lines<T, F>(output: &str, mut parse: F) -> ParsedBatch<T>
where
    F: FnMut(&str) -> Result<T, MalformedRecord>,
{
    let mut batch = ParsedBatch::default();

    for line in output.lines().filter(|l| !l.trim().is_empty()) {
        match parse(line) {
            Ok(record) => batch.records.push(record),
            Err(e) => {
                tracing::debug!(error = %e, "Dropping malformed line");
                batch.malformed.push(e);
            }
        }
    }

    batch
}

fn malformed(kind: &'static str, expected: usize, fields: &[&str], line: &str) -> MalformedRecord {
    MalformedRecord {
        kind,
        expected,
        found: fields.len(),
        line: line.to_string(),
    }
}
