//! Background reconnection after the audio server drops the session.
//!
//! The monitor only runs while there is no configured connection, so it never
//! overlaps with the capture callback. It polls for the server at a fixed
//! interval, checking the lifecycle at the top of every iteration, and exits
//! as soon as a new connection is configured or the session is closing.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

use crate::models::error::SessionError;
use crate::models::state::LifecycleState;
use crate::session::handle::{configure, release_connection, SessionInner};
use crate::session::lifecycle::Checkpoint;
use crate::traits::audio_server::{ActiveOf, AudioServer, OpenOptions};

/// Shutdown notification from the server.
///
/// Never performs the terminal transition itself: it hands the session over
/// to a fresh monitor, which either reconnects or, if a close is already in
/// progress, answers the close on its first iteration.
pub(crate) fn handle_server_shutdown<S: AudioServer>(inner: &Arc<SessionInner<S>>) {
    match inner.lifecycle.state() {
        LifecycleState::Terminated => return,
        LifecycleState::Draining => {
            // The callback will not run again; let a monitor take the handoff.
            log::debug!("[{}] Audio server shut down during close", inner.id);
        }
        LifecycleState::Working => {
            log::warn!("[{}] Audio server shut down, reconnecting", inner.id);
            if let Some(ref delegate) = inner.delegate {
                delegate.on_connection_lost();
            }
        }
    }

    // Held across the spawn and the store so that a closer taking the slot
    // after its handoff always finds the monitor it has to join.
    let mut slot = inner.monitor.lock();
    if inner.lifecycle.state().is_terminal() {
        return;
    }

    if let Some(handle) = slot.take() {
        if handle.join().is_err() {
            log::error!("[{}] Failed to join previous monitor thread", inner.id);
        }
    }

    // The notifying client cannot be closed while its notification is still
    // running, so it is retired and released by the next monitor or by close.
    let stale = inner.connection.lock().take();
    let older = match stale {
        Some(stale) => inner.retired.lock().replace(stale),
        None => None,
    };

    match spawn_monitor(inner, older) {
        Ok(handle) => *slot = Some(handle),
        Err(e) => {
            drop(slot);
            report_fatal(inner, &e);
        }
    }
}

/// Start a monitor thread. `older` is a connection retired by an earlier
/// notification, released on the monitor thread rather than the server's
/// notification thread.
fn spawn_monitor<S: AudioServer>(
    inner: &Arc<SessionInner<S>>,
    older: Option<ActiveOf<S>>,
) -> Result<thread::JoinHandle<()>, SessionError> {
    let worker = Arc::clone(inner);
    thread::Builder::new()
        .name("audio-input-monitor".into())
        .spawn(move || {
            if let Some(older) = older {
                release_connection(older);
            }
            run_monitor(&worker);
        })
        .map_err(|e| SessionError::SpawnFailed(e.to_string()))
}

fn run_monitor<S: AudioServer>(inner: &Arc<SessionInner<S>>) {
    let _muted = MutedDiagnostics::new(&inner.server);
    let options = OpenOptions {
        start_server: false,
    };
    let mut attempt: u64 = 0;

    loop {
        if inner.lifecycle.checkpoint() == Checkpoint::Exit {
            return;
        }

        attempt += 1;
        inner
            .counters
            .reconnect_attempts
            .fetch_add(1, Ordering::Relaxed);

        let error = match inner.server.open_client(&inner.config.client_name, options) {
            Ok((client, _)) => {
                match configure(inner, client) {
                    Ok(active) => {
                        inner.install_connection(active);
                        inner.counters.reconnects.fetch_add(1, Ordering::Relaxed);
                        log::info!(
                            "[{}] Reconnected to audio server after {} attempt(s)",
                            inner.id,
                            attempt
                        );
                    }
                    Err(e) => {
                        report_fatal(inner, &e);
                        park(inner);
                    }
                }
                return;
            }
            Err(e) => e,
        };

        if inner.config.verbose {
            log::warn!("[{}] Reconnect attempt {} failed: {}", inner.id, attempt, error);
        } else {
            log::debug!("[{}] Reconnect attempt {} failed: {}", inner.id, attempt, error);
        }
        inner.status.lock().last_failure = Some(error.to_string());
        if let Some(ref delegate) = inner.delegate {
            delegate.on_reconnect_failed(attempt, &error);
        }

        // Lets the consumer clear whatever it last drew.
        inner.buffer.mark_modified();

        thread::sleep(inner.config.retry_interval());
    }
}

/// Keep answering the lifecycle after a fatal error the delegate chose to
/// survive, so that a later close still finds a worker to hand off with.
fn park<S: AudioServer>(inner: &SessionInner<S>) {
    while inner.lifecycle.checkpoint() == Checkpoint::Proceed {
        thread::sleep(inner.config.retry_interval());
    }
}

/// Deliver an unrecoverable error. Without a delegate the process exits.
pub(crate) fn report_fatal<S: AudioServer>(inner: &SessionInner<S>, error: &SessionError) {
    log::error!("[{}] Fatal audio input error: {}", inner.id, error);
    match inner.delegate {
        Some(ref delegate) => delegate.on_fatal(error),
        None => std::process::exit(1),
    }
}

/// Silences the server library's own error output while polling.
struct MutedDiagnostics<'a, S: AudioServer> {
    server: &'a S,
}

impl<'a, S: AudioServer> MutedDiagnostics<'a, S> {
    fn new(server: &'a S) -> Self {
        server.set_diagnostics_enabled(false);
        Self { server }
    }
}

impl<S: AudioServer> Drop for MutedDiagnostics<'_, S> {
    fn drop(&mut self) {
        self.server.set_diagnostics_enabled(true);
    }
}
