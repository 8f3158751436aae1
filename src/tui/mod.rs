//! Live queue dashboard.
//!
//! Two tasks cooperate through a [`CancellationToken`]:
//! - the refresh loop ([`runtime`]) polls squeue and redraws
//! - a watcher ([`event`]) turns a quit key or a signal into cancellation
//!
//! The terminal is put into raw mode and the alternate screen behind a
//! [`TerminalGuard`], which puts it back exactly once however the dashboard
//! ends.

pub mod dashboard;
pub mod event;
pub mod runtime;
pub mod theme;

use std::io::{self, IsTerminal, stdout};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono_tz::Tz;
use crossterm::{
    cursor::Show,
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use tokio_util::sync::CancellationToken;

use crate::normalize::Normalizer;
use crate::slurm::SlurmInterface;
use crate::snapshot::Snapshot;
use crate::tui::dashboard::DashboardView;
use crate::tui::event::{KeyboardCancel, install_signal_handler, spawn_cancel_watcher};
use crate::tui::runtime::{LoopSettings, LoopSummary, Renderer, SlurmListing, run_refresh_loop};

/// Terminal capability requirements for the dashboard
#[derive(Debug)]
pub struct TerminalCapabilities {
    pub is_tty: bool,
    pub term_type: String,
    pub supports_alternate_screen: bool,
}

impl TerminalCapabilities {
    pub fn detect() -> Self {
        let term_type = std::env::var("TERM").unwrap_or_default();
        Self::from_parts(stdout().is_terminal(), term_type)
    }

    fn from_parts(is_tty: bool, term_type: String) -> Self {
        let supports_alternate_screen = !matches!(term_type.as_str(), "dumb" | "" | "unknown");
        Self {
            is_tty,
            term_type,
            supports_alternate_screen,
        }
    }

    pub fn is_suitable(&self) -> bool {
        self.is_tty && self.supports_alternate_screen
    }

    pub fn error_message(&self) -> String {
        if !self.is_tty {
            "The dashboard requires an interactive terminal (stdout is not a TTY).\n\
             Hint: Use 'qwatch analyze' for a one-shot report instead."
                .to_string()
        } else if !self.supports_alternate_screen {
            format!(
                "Terminal type '{}' may not support the dashboard.\n\
                 Hint: Set TERM to a supported value (e.g., xterm-256color).",
                if self.term_type.is_empty() { "(unset)" } else { &self.term_type }
            )
        } else {
            "Unknown terminal capability issue.".to_string()
        }
    }
}

/// Terminal state that must be undone when the dashboard exits.
pub trait TerminalSession {
    fn restore(&mut self) -> Result<()>;
}

/// Restores its session exactly once: on [`release`](Self::release), or on
/// drop if release never ran (early return, error, panic).
pub struct TerminalGuard<S: TerminalSession> {
    session: S,
    restored: bool,
}

impl<S: TerminalSession> TerminalGuard<S> {
    pub fn new(session: S) -> Self {
        Self {
            session,
            restored: false,
        }
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    pub fn release(&mut self) -> Result<()> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;
        self.session.restore()
    }
}

impl<S: TerminalSession> Drop for TerminalGuard<S> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::error!("Failed to restore terminal: {:#}", e);
        }
    }
}

/// Raw mode + alternate screen on stdout.
pub struct CrosstermSession {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl CrosstermSession {
    pub fn enter() -> Result<Self> {
        enable_raw_mode().context("Failed to enable raw mode")?;
        let setup = (|| -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
            let mut stdout = stdout();
            execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
            let mut terminal =
                Terminal::new(CrosstermBackend::new(stdout)).context("Failed to create terminal")?;
            terminal.hide_cursor().context("Failed to hide cursor")?;
            terminal.clear().context("Failed to clear terminal")?;
            Ok(terminal)
        })();
        let terminal = undo_on_error(setup, || {
            let _ = execute!(stdout(), LeaveAlternateScreen, Show);
            let _ = disable_raw_mode();
        })?;
        Ok(Self { terminal })
    }

    pub fn terminal_mut(&mut self) -> &mut Terminal<CrosstermBackend<io::Stdout>> {
        &mut self.terminal
    }
}

/// Run `undo` when a partially applied setup failed.
fn undo_on_error<T>(result: Result<T>, undo: impl FnOnce()) -> Result<T> {
    if result.is_err() {
        undo();
    }
    result
}

impl TerminalSession for CrosstermSession {
    fn restore(&mut self) -> Result<()> {
        // Keep going on failure so one broken step doesn't leave raw mode on
        let raw = disable_raw_mode();
        let screen = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let cursor = self.terminal.show_cursor();
        raw?;
        screen?;
        cursor?;
        Ok(())
    }
}

/// Draws each snapshot onto a ratatui terminal.
pub struct DashboardRenderer<'a, B: Backend> {
    terminal: &'a mut Terminal<B>,
    view: DashboardView,
}

impl<'a, B: Backend> DashboardRenderer<'a, B> {
    pub fn new(terminal: &'a mut Terminal<B>, view: DashboardView) -> Self {
        Self { terminal, view }
    }
}

impl<B: Backend> Renderer for DashboardRenderer<'_, B> {
    fn render(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.terminal
            .draw(|frame| dashboard::render(frame, snapshot, &self.view))
            .context("Failed to draw dashboard")?;
        Ok(())
    }
}

/// Everything `qwatch watch` needs, resolved from config and flags.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub slurm: SlurmInterface,
    pub timezone: Tz,
    pub interval: Duration,
    pub long_wait: chrono::Duration,
    pub view: DashboardView,
}

/// Run the dashboard until a quit key or signal.
pub async fn run_dashboard(options: WatchOptions) -> Result<LoopSummary> {
    let capabilities = TerminalCapabilities::detect();
    if !capabilities.is_suitable() {
        bail!("{}", capabilities.error_message());
    }

    let cancel = CancellationToken::new();
    if let Err(e) = install_signal_handler(cancel.clone()) {
        tracing::warn!("Could not install signal handler: {}", e);
    }

    let source = Arc::new(SlurmListing {
        slurm: options.slurm,
        normalizer: Normalizer::new(options.timezone),
        partitions: options.view.filter.partitions.clone(),
    });
    let settings = LoopSettings::new(
        options.interval,
        options.view.filter.clone(),
        options.timezone,
        options.long_wait,
    );

    let mut guard = TerminalGuard::new(CrosstermSession::enter()?);
    let watcher = spawn_cancel_watcher(KeyboardCancel, cancel.clone());

    let result = {
        let mut renderer = DashboardRenderer::new(guard.session_mut().terminal_mut(), options.view);
        run_refresh_loop(source, &mut renderer, &settings, cancel.clone()).await
    };

    cancel.cancel();
    if let Err(e) = watcher.await {
        tracing::warn!("Cancellation watcher failed: {}", e);
    }
    guard.release()?;

    result
}

/// Run the dashboard on a fresh tokio runtime (entry point from main)
pub fn run(options: WatchOptions) -> Result<LoopSummary> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_dashboard(options))
}
