//! Text rendering for `qwatch analyze`.

use owo_colors::OwoColorize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, Width, object::Rows},
};

use crate::analyzer::{BlockerLabel, BlockerRelation, JobContention};
use crate::contention::{JobReport, UserReport};
use crate::formatting::{UNKNOWN, format_priority, format_timestamp, format_wait, layout};
use crate::models::{PRIORITY_COMPONENTS, PriorityBreakdown};

/// Table row for blocker display
#[derive(Tabled)]
struct BlockerRow {
    #[tabled(rename = "#")]
    rank: usize,

    #[tabled(rename = "JobID")]
    job_id: String,

    #[tabled(rename = "User")]
    user: String,

    #[tabled(rename = "Priority")]
    priority: i64,

    #[tabled(rename = "Submitted")]
    submitted: String,

    #[tabled(rename = "Verdict")]
    label: String,
}

fn format_label(label: BlockerLabel) -> String {
    match label {
        BlockerLabel::QueueJump => "❗ possible queue jump".red().bold().to_string(),
        BlockerLabel::NormalWait => "⏳ normal wait".yellow().to_string(),
    }
}

fn format_blockers(blockers: &[BlockerRelation]) -> String {
    let rows: Vec<BlockerRow> = blockers
        .iter()
        .enumerate()
        .map(|(i, b)| BlockerRow {
            rank: i + 1,
            job_id: b.blocking_job_id.clone(),
            user: b.blocking_user.clone(),
            priority: b.blocking_priority,
            submitted: b
                .blocking_submit_time
                .map_or_else(|| UNKNOWN.to_string(), |t| t.format("%m-%d %H:%M").to_string()),
            label: format_label(b.label),
        })
        .collect();

    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Width::wrap(120).keep_words(true))
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    table.to_string()
}

/// Priority components in a fixed order; components sprio did not report show "?".
pub fn format_breakdown(breakdown: &PriorityBreakdown) -> String {
    PRIORITY_COMPONENTS
        .iter()
        .map(|name| {
            let value = breakdown
                .get(name)
                .map_or_else(|| "?".to_string(), |v| v.to_string());
            format!("{}: {}", name, value)
        })
        .collect::<Vec<_>>()
        .join("  ")
}

fn format_job_summary(job: &JobReport) -> String {
    let record = &job.contention.job;
    let mut output = String::new();

    output.push_str(&format!("🔹 Job {}\n", record.id.bold()));
    output.push_str(&format!("    Submitted: {}\n", format_timestamp(record.submit_time.as_ref())));
    output.push_str(&format!("    Waiting:   {}\n", format_wait(job.waited_secs)));
    output.push_str(&format!("    Reason:    {}\n", record.reason));
    output.push_str(&format!("    Priority:  {}\n", format_priority(record.priority)));
    if !job.breakdown.is_empty() {
        output.push_str(&format!("    📊 {}\n", format_breakdown(&job.breakdown).dimmed()));
    }
    output
}

fn format_contention(contention: &JobContention) -> String {
    let id = &contention.job.id;
    match &contention.blockers {
        None => format!(
            "  ❔ Job {} priority could not be resolved, skipping analysis\n",
            id
        )
        .bright_black()
        .to_string(),
        Some(blockers) if blockers.is_empty() => {
            format!("  {} Job {} has no higher-priority competitors\n", "✅", id.green())
        }
        Some(blockers) => format!(
            "  💢 Job {} is behind {} job(s) ({} possible jump(s)):\n{}\n",
            id.bold(),
            blockers.len(),
            contention.queue_jumps(),
            format_blockers(blockers)
        ),
    }
}

pub fn format_user_report(report: &UserReport) -> String {
    let mut output = String::new();
    let partitions = if report.partitions.is_empty() {
        "all partitions".to_string()
    } else {
        report.partitions.join(",")
    };

    output.push_str(&format!(
        "\n🎯 Pending-queue analysis for {} in {}\n",
        report.user.cyan().bold(),
        partitions.cyan()
    ));
    output.push_str(&format!(
        "Current time: {}\n\n",
        report.generated_at.format("%b %d %H:%M:%S %Z")
    ));

    if report.jobs.is_empty() {
        output.push_str(&format!("{}\n", "No pending jobs".yellow()));
        output.push_str(&"-".repeat(layout::BOX_WIDTH));
        output.push('\n');
        return output;
    }

    output.push_str(&format!("{} pending job(s):\n\n", report.jobs.len()));
    for job in &report.jobs {
        output.push_str(&format_job_summary(job));
        output.push('\n');
    }

    output.push_str(&format!("{}\n\n", "🔍 Jobs ranked ahead of yours".bold().underline()));
    for job in &report.jobs {
        output.push_str(&format_contention(&job.contention));
    }

    let jumps = report.total_queue_jumps();
    output.push_str(&format!(
        "\nSummary: {} possible queue jump(s), {} normal wait(s)\n",
        if jumps > 0 { jumps.red().bold().to_string() } else { jumps.green().to_string() },
        report.total_normal_waits()
    ));
    if report.malformed_lines > 0 {
        output.push_str(&format!(
            "{}\n",
            format!("({} unparseable scheduler line(s) skipped)", report.malformed_lines).bright_black()
        ));
    }

    output.push_str(&format!("\n{}\n", "📌 Advice:".bold()));
    output.push_str(" - Reason 'Priority' means a low priority is holding the job; fewer resources or a higher QOS may help\n");
    output.push_str(" - A low FAIRSHARE or QOS component usually means recent heavy usage\n");
    if jumps > 0 {
        output.push_str(" - Repeated queue jumps are worth raising with the cluster admins\n");
    }
    output.push_str(&"-".repeat(layout::BOX_WIDTH));
    output.push('\n');
    output
}

pub fn format_reports(reports: &[UserReport]) -> String {
    reports.iter().map(format_user_report).collect()
}

pub fn reports_to_json(reports: &[UserReport]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(reports)
}
