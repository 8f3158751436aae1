//! Dashboard frame rendering.
//!
//! One frame per snapshot: a header line, the job table, and a two-line status
//! footer. Nothing here reads from the scheduler; it only styles what the
//! aggregator produced.

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table};

use crate::formatting::{format_wait, layout, truncate_string};
use crate::models::JobState;
use crate::snapshot::{QueueFilter, Snapshot, SnapshotRow};
use crate::tui::theme::{Theme, job_state_emoji};

const COLUMNS: [&str; 10] = [
    "JobID", "User", "Partition", "State", "Name", "Submitted", "Nodes", "Elapsed", "Left", "Reason",
];

/// Static presentation settings for one dashboard session.
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub theme: Theme,
    pub highlight_user: Option<String>,
    pub filter: QueueFilter,
    pub interval_secs: f64,
}

impl DashboardView {
    fn is_highlighted(&self, user: &str) -> bool {
        self.highlight_user.as_deref() == Some(user)
    }
}

pub fn render(frame: &mut Frame, snapshot: &Snapshot, view: &DashboardView) {
    let layout = Layout::vertical([
        Constraint::Length(1), // Header
        Constraint::Min(0),    // Job table
        Constraint::Length(2), // Status bar
    ])
    .split(frame.area());

    render_header(frame, layout[0], snapshot, view);
    render_table(frame, layout[1], snapshot, view);
    render_status_bar(frame, layout[2], snapshot, view);
}

fn render_header(frame: &mut Frame, area: Rect, snapshot: &Snapshot, view: &DashboardView) {
    let theme = &view.theme;
    let line = Line::from(vec![
        Span::styled(" qwatch ", Style::default().fg(theme.header_fg).bg(theme.header_bg).bold()),
        Span::raw(" "),
        Span::styled(
            snapshot.taken_at.format("%Y-%m-%d %H:%M:%S %Z").to_string(),
            Style::default().fg(theme.fg),
        ),
        Span::styled(
            format!("  |  {}  |  every {}s", filter_summary(&view.filter), view.interval_secs),
            Style::default().fg(theme.border),
        ),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn render_table(frame: &mut Frame, area: Rect, snapshot: &Snapshot, view: &DashboardView) {
    let theme = &view.theme;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border_focused))
        .title(format!(" Jobs ({}) ", snapshot.rows.len()));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if snapshot.rows.is_empty() {
        let msg = if snapshot.gateway_error.is_some() {
            "Queue unavailable"
        } else {
            "No jobs found"
        };
        let para = Paragraph::new(msg)
            .style(Style::default().fg(theme.border))
            .alignment(Alignment::Center);
        frame.render_widget(para, inner);
        return;
    }

    let header_cells = COLUMNS
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(theme.header_fg).bold()));
    let header = Row::new(header_cells).style(Style::default().bg(theme.header_bg));

    let visible = inner.height.saturating_sub(1) as usize;
    let rows: Vec<Row> = snapshot
        .rows
        .iter()
        .take(visible)
        .map(|row| job_row(row, view))
        .collect();

    let widths = [
        Constraint::Length(10), // JobID
        Constraint::Length(12), // User (crown)
        Constraint::Length(10), // Partition
        Constraint::Length(7),  // State
        Constraint::Min(12),    // Name
        Constraint::Length(19), // Submitted
        Constraint::Length(6),  // Nodes
        Constraint::Length(11), // Elapsed
        Constraint::Length(11), // Left
        Constraint::Min(16),    // Reason
    ];

    frame.render_widget(Table::new(rows, widths).header(header), inner);
}

fn job_row<'a>(row: &'a SnapshotRow, view: &DashboardView) -> Row<'a> {
    let theme = &view.theme;
    let record = &row.row.record;
    let highlighted = view.is_highlighted(&record.user);

    let state_style = Style::default().fg(theme.job_state_color(record.state));
    let submitted_style = if row.long_wait {
        Style::default().fg(theme.long_wait).bold()
    } else {
        Style::default()
    };

    let mut row_widget = Row::new(vec![
        Cell::from(record.id.as_str()),
        Cell::from(user_label(&record.user, highlighted)),
        Cell::from(row.row.partition.as_str()),
        Cell::from(state_label(record.state)).style(state_style),
        Cell::from(truncate_string(&row.row.name, layout::NAME_TRUNCATE_LEN)),
        Cell::from(submitted_label(row)).style(submitted_style),
        Cell::from(row.row.nodes.as_str()),
        Cell::from(row.row.elapsed.as_str()),
        Cell::from(row.row.time_left.as_str()),
        Cell::from(truncate_string(&record.reason, layout::REASON_TRUNCATE_LEN)),
    ]);

    if highlighted {
        row_widget = row_widget.style(Style::default().fg(theme.highlight_user).bold());
    }
    row_widget
}

fn user_label(user: &str, highlighted: bool) -> String {
    if highlighted {
        format!("👑 {user}")
    } else {
        user.to_string()
    }
}

fn state_label(state: JobState) -> String {
    format!("{} {}", job_state_emoji(state), state.short_str())
}

/// Submit time as squeue printed it, flagged when the job has waited too long.
fn submitted_label(row: &SnapshotRow) -> String {
    if row.long_wait {
        format!("⚠️ {} ({})", row.row.submit_raw, format_wait(row.waited_secs))
    } else {
        row.row.submit_raw.clone()
    }
}

fn filter_summary(filter: &QueueFilter) -> String {
    let users = if filter.users.is_empty() {
        "all users".to_string()
    } else {
        filter.users.join(",")
    };
    let partitions = if filter.partitions.is_empty() {
        "all partitions".to_string()
    } else {
        filter.partitions.join(",")
    };
    format!("{users} @ {partitions}")
}

fn stats_line(snapshot: &Snapshot) -> String {
    let s = &snapshot.stats;
    let mut line = format!(
        "Running: {}  Pending: {}  Completing: {}  Other: {}  Total: {}",
        s.running,
        s.pending,
        s.completing,
        s.other,
        s.total()
    );
    let long_waits = snapshot.rows.iter().filter(|r| r.long_wait).count();
    if long_waits > 0 {
        line.push_str(&format!("  |  ⚠️ long wait: {long_waits}"));
    }
    if snapshot.malformed_lines > 0 {
        line.push_str(&format!("  |  skipped lines: {}", snapshot.malformed_lines));
    }
    line
}

fn render_status_bar(frame: &mut Frame, area: Rect, snapshot: &Snapshot, view: &DashboardView) {
    let theme = &view.theme;
    let mut second = Vec::new();
    if let Some(err) = &snapshot.gateway_error {
        second.push(Span::styled(
            format!(" Scheduler query failed: {err} "),
            Style::default().fg(theme.error),
        ));
    }
    if let Some(err) = &snapshot.render_error {
        second.push(Span::styled(
            format!(" Display error: {err} "),
            Style::default().fg(theme.error),
        ));
    }
    let hint = if second.is_empty() { " q: quit" } else { "  q: quit" };
    second.push(Span::styled(hint, Style::default().fg(theme.border)));
    let lines = vec![
        Line::from(Span::styled(format!(" {}", stats_line(snapshot)), Style::default().fg(theme.fg))),
        Line::from(second),
    ];
    frame.render_widget(Paragraph::new(lines), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobRecord, ListingRow};
    use crate::snapshot::aggregate;
    use chrono::{DateTime, Duration, TimeZone};
    use chrono_tz::Tz;
    use ratatui::backend::TestBackend;

    fn noon() -> DateTime<Tz> {
        chrono_tz::US::Pacific
            .with_ymd_and_hms(2025, 1, 15, 12, 0, 0)
            .single()
            .unwrap()
    }

    fn listing_row(id: &str, user: &str, state: &str, minutes_ago: i64) -> ListingRow {
        let submitted = noon() - Duration::minutes(minutes_ago);
        ListingRow {
            record: JobRecord {
                id: id.to_string(),
                user: user.to_string(),
                submit_time: Some(submitted),
                state: JobState::from_state_string(state),
                reason: "(Priority)".to_string(),
                priority: None,
            },
            partition: "xiaojie".to_string(),
            name: "train".to_string(),
            nodes: "1".to_string(),
            elapsed: "0:00".to_string(),
            time_left: "1:00:00".to_string(),
            submit_raw: submitted.format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }

    fn view() -> DashboardView {
        DashboardView {
            theme: Theme::dark(),
            highlight_user: Some("alice".to_string()),
            filter: QueueFilter::default(),
            interval_secs: 1.0,
        }
    }

    fn snapshot() -> Snapshot {
        aggregate(
            vec![
                listing_row("1", "alice", "R", 300),
                listing_row("2", "bob", "PD", 90),
                listing_row("3", "carol", "PD", 5),
            ],
            &QueueFilter::default(),
            noon(),
            Duration::hours(1),
        )
    }

    fn buffer_text(backend: &TestBackend) -> String {
        let buffer = backend.buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn test_labels() {
        assert_eq!(user_label("alice", true), "👑 alice");
        assert_eq!(user_label("bob", false), "bob");
        assert_eq!(state_label(JobState::Pending), "⏳ PD");

        let snap = snapshot();
        assert!(submitted_label(&snap.rows[1]).starts_with("⚠️ 2025-01-15T10:30:00"));
        assert_eq!(submitted_label(&snap.rows[2]), "2025-01-15T11:55:00");
    }

    #[test]
    fn test_stats_line() {
        let line = stats_line(&snapshot());
        assert!(line.contains("Running: 1"));
        assert!(line.contains("Pending: 2"));
        assert!(line.contains("Total: 3"));
        assert!(line.contains("long wait: 1"));
    }

    #[test]
    fn test_filter_summary() {
        assert_eq!(filter_summary(&QueueFilter::default()), "all users @ all partitions");
        let filter = QueueFilter {
            users: vec!["alice".to_string(), "bob".to_string()],
            partitions: vec!["gpu".to_string()],
        };
        assert_eq!(filter_summary(&filter), "alice,bob @ gpu");
    }

    #[test]
    fn test_render_frame() {
        let mut terminal = Terminal::new(TestBackend::new(160, 12)).unwrap();
        terminal.draw(|frame| render(frame, &snapshot(), &view())).unwrap();
        let text = buffer_text(terminal.backend());

        assert!(text.contains("2025-01-15 12:00:00 PST"));
        assert!(text.contains("JobID"));
        assert!(text.contains("carol"));
        assert!(text.contains("q: quit"));
    }

    #[test]
    fn test_render_unavailable_snapshot() {
        let snap = Snapshot::unavailable(noon(), "squeue exited with code 1".to_string());
        let mut terminal = Terminal::new(TestBackend::new(120, 8)).unwrap();
        terminal.draw(|frame| render(frame, &snap, &view())).unwrap();
        let text = buffer_text(terminal.backend());

        assert!(text.contains("Queue unavailable"));
        assert!(text.contains("Scheduler query failed"));
    }

    #[test]
    fn test_render_shows_previous_display_error() {
        let mut snap = snapshot();
        snap.render_error = Some("Failed to draw dashboard".to_string());
        let mut terminal = Terminal::new(TestBackend::new(160, 12)).unwrap();
        terminal.draw(|frame| render(frame, &snap, &view())).unwrap();
        let text = buffer_text(terminal.backend());

        assert!(text.contains("Display error: Failed to draw dashboard"));
        assert!(text.contains("q: quit"));
        assert!(text.contains("carol"));
    }
}
