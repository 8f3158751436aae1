//! qwatch - Slurm pending-queue contention analyzer and live queue dashboard

use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use qwatch::contention::build_reports;
use qwatch::display::{format_reports, reports_to_json};
use qwatch::models::{AppConfig, MIN_REFRESH_INTERVAL, parse_timezone};
use qwatch::normalize::Normalizer;
use qwatch::slurm::{SlurmInterface, get_current_user};
use qwatch::snapshot::QueueFilter;
use qwatch::tui::dashboard::DashboardView;
use qwatch::tui::theme::Theme;
use qwatch::tui::{self, WatchOptions};
use qwatch::utils::{split_csv, split_csv_all};

#[derive(Parser)]
#[command(name = "qwatch")]
#[command(about = "Explain Slurm pending-queue contention and watch the queue live", long_about = None)]
#[command(version)]
struct Cli {
    /// IANA timezone the scheduler's timestamps are in (e.g. US/Pacific)
    #[arg(long, global = true, value_name = "ZONE")]
    timezone: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Explain which pending jobs rank ahead of a user's pending jobs
    #[command(alias = "sqa")]
    Analyze {
        /// Users to analyze (comma-separated, repeatable); defaults to $USER
        #[arg(short, long, value_name = "USERS")]
        user: Vec<String>,

        /// Partitions to query (comma-separated)
        #[arg(short, long, value_name = "PARTITIONS")]
        partition: Option<String>,

        /// Print the reports as JSON
        #[arg(long)]
        json: bool,
    },

    /// Live queue dashboard; press q or Esc to quit
    #[command(alias = "top")]
    Watch {
        /// Only show these users (comma-separated, repeatable)
        #[arg(short, long, value_name = "USERS")]
        user: Vec<String>,

        /// Partitions to watch (comma-separated)
        #[arg(short, long, value_name = "PARTITIONS")]
        partition: Option<String>,

        /// Refresh interval in seconds
        #[arg(short, long, value_name = "SECONDS")]
        refresh: Option<f64>,

        /// Emphasise this user's rows (display only, does not filter)
        #[arg(long, value_name = "USER")]
        highlight_user: Option<String>,
    },
}

impl Commands {
    /// Default log filter; the dashboard logs nothing unless asked so the
    /// alternate screen stays clean.
    fn default_log_filter(&self) -> &'static str {
        match self {
            Commands::Analyze { .. } => "warn",
            Commands::Watch { .. } => "off",
        }
    }
}

fn init_logging(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("QWATCH_LOG").unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.command.default_log_filter());

    let (config, warnings) = AppConfig::load();
    for warning in &warnings {
        eprintln!("Warning: {}", warning);
    }

    let timezone = resolve_timezone(cli.timezone.as_deref(), &config)?;
    let slurm = SlurmInterface::with_config(config.system.slurm_bin_path.as_deref());
    if slurm.is_unverified_fallback() {
        tracing::warn!(
            path = %slurm.slurm_bin_path.display(),
            "Slurm binaries not found, queries will likely fail"
        );
    }

    match cli.command {
        Commands::Analyze { user, partition, json } => {
            let users = resolve_users(&user)?;
            let partitions = resolve_partitions(partition.as_deref(), &config);
            handle_analyze(&slurm, timezone, &users, &partitions, json)
        }
        Commands::Watch {
            user,
            partition,
            refresh,
            highlight_user,
        } => {
            let interval_secs = refresh.unwrap_or(config.refresh.interval_secs);
            if !interval_secs.is_finite() || interval_secs < MIN_REFRESH_INTERVAL {
                bail!(
                    "Refresh interval must be at least {} second(s), got {}",
                    MIN_REFRESH_INTERVAL,
                    interval_secs
                );
            }

            let view = DashboardView {
                theme: Theme::from_name(&config.display.theme),
                highlight_user: highlight_user.or(config.display.highlight_user.clone()),
                filter: QueueFilter {
                    users: split_csv_all(&user),
                    partitions: resolve_partitions(partition.as_deref(), &config),
                },
                interval_secs,
            };
            let options = WatchOptions {
                slurm,
                timezone,
                interval: Duration::from_secs_f64(interval_secs),
                long_wait: config.refresh.long_wait(),
                view,
            };

            let summary = tui::run(options)?;
            tracing::info!(
                cycles = summary.cycles,
                failed_cycles = summary.failed_cycles,
                render_failures = summary.render_failures,
                "Dashboard closed"
            );
            Ok(())
        }
    }
}

fn handle_analyze(
    slurm: &SlurmInterface,
    timezone: Tz,
    users: &[String],
    partitions: &[String],
    json: bool,
) -> Result<()> {
    let normalizer = Normalizer::new(timezone);
    let now = Utc::now().with_timezone(&timezone);
    let reports = build_reports(slurm, &normalizer, users, partitions, now);

    if json {
        println!("{}", reports_to_json(&reports).context("Failed to serialize reports")?);
    } else {
        print!("{}", format_reports(&reports));
    }
    Ok(())
}

fn resolve_timezone(flag: Option<&str>, config: &AppConfig) -> Result<Tz> {
    let zone = match flag {
        Some(name) => parse_timezone(name),
        None => config.query.zone(),
    };
    zone.map_err(anyhow::Error::msg).context("Invalid timezone")
}

fn resolve_users(flags: &[String]) -> Result<Vec<String>> {
    let users = split_csv_all(flags);
    if !users.is_empty() {
        return Ok(users);
    }
    match get_current_user() {
        Some(user) => Ok(vec![user]),
        None => bail!("No user given and $USER is not set; pass -u <user>"),
    }
}

fn resolve_partitions(flag: Option<&str>, config: &AppConfig) -> Vec<String> {
    split_csv(flag.unwrap_or(&config.query.default_partition))
}
