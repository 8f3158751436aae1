//! Cancellation sources for the refresh loop.
//!
//! The loop never reads the keyboard itself. It is handed a
//! [`CancellationToken`] and a watcher task feeds that token from a
//! [`CancelSource`]: the terminal in production, a test double in tests.

use std::future::Future;

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Something that eventually asks the refresh loop to stop.
pub trait CancelSource: Send + 'static {
    /// Resolves once cancellation has been requested.
    fn requested(self) -> impl Future<Output = ()> + Send;
}

/// Returns true for the keys that quit the dashboard: `q`, `Q`, `Esc`, `Ctrl+C`.
#[must_use]
pub fn is_quit_key(event: &KeyEvent) -> bool {
    if event.kind != KeyEventKind::Press {
        return false;
    }
    match event.code {
        KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => true,
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => true,
        _ => false,
    }
}

/// Watches the terminal's event stream for a quit key.
///
/// The terminal must already be in raw mode, otherwise keys only arrive after
/// Enter.
#[derive(Debug, Default)]
pub struct KeyboardCancel;

impl CancelSource for KeyboardCancel {
    fn requested(self) -> impl Future<Output = ()> + Send {
        async move {
            let mut reader = EventStream::new();

            while let Some(event) = reader.next().await {
                match event {
                    Ok(Event::Key(key)) if is_quit_key(&key) => {
                        tracing::info!(key = ?key.code, "Quit key pressed");
                        return;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        let is_fatal = matches!(
                            e.kind(),
                            std::io::ErrorKind::BrokenPipe
                                | std::io::ErrorKind::ConnectionReset
                                | std::io::ErrorKind::UnexpectedEof
                        );
                        if is_fatal {
                            tracing::info!("Terminal disconnected: {:?}", e);
                            return;
                        }
                        tracing::warn!("Terminal event read error: {:?}", e);
                    }
                }
            }

            tracing::info!("Terminal event stream ended");
        }
    }
}

/// Spawn a task that cancels `token` once `source` fires.
///
/// The task also ends, without firing, when the token is cancelled by someone
/// else (signal handler, loop shutdown).
pub fn spawn_cancel_watcher<C: CancelSource>(source: C, token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = source.requested() => token.cancel(),
        }
    })
}

/// Cancel `token` on SIGINT or SIGTERM.
///
/// In raw mode Ctrl+C arrives as a key instead, so this mostly covers
/// `kill` from another shell.
pub fn install_signal_handler(token: CancellationToken) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        tracing::info!("Received termination signal");
        token.cancel();
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct Never;

    impl CancelSource for Never {
        fn requested(self) -> impl Future<Output = ()> + Send {
            std::future::pending()
        }
    }

    struct Immediately;

    impl CancelSource for Immediately {
        fn requested(self) -> impl Future<Output = ()> + Send {
            std::future::ready(())
        }
    }

    #[test]
    fn test_quit_keys() {
        assert!(is_quit_key(&KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE)));
        assert!(is_quit_key(&KeyEvent::new(KeyCode::Char('Q'), KeyModifiers::SHIFT)));
        assert!(is_quit_key(&KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)));
        assert!(is_quit_key(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
    }

    #[test]
    fn test_other_keys_do_not_quit() {
        assert!(!is_quit_key(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE)));
        assert!(!is_quit_key(&KeyEvent::new(KeyCode::Char('j'), KeyModifiers::NONE)));
        assert!(!is_quit_key(&KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)));

        let mut release = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        release.kind = KeyEventKind::Release;
        assert!(!is_quit_key(&release));
    }

    #[tokio::test]
    async fn test_watcher_cancels_token_when_source_fires() {
        let token = CancellationToken::new();
        let handle = spawn_cancel_watcher(Immediately, token.clone());
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_watcher_exits_when_token_cancelled_elsewhere() {
        let token = CancellationToken::new();
        let handle = spawn_cancel_watcher(Never, token.clone());
        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
