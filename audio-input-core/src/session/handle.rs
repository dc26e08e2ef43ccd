use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::models::audio_models::{ServerInfo, SessionDiagnostics};
use crate::models::config::SessionConfig;
use crate::models::error::SessionError;
use crate::models::state::LifecycleState;
use crate::processing::shared_buffer::SharedAudioBuffer;
use crate::session::context::CaptureContext;
use crate::session::lifecycle::Lifecycle;
use crate::traits::audio_server::{ActiveClient, ActiveOf, AudioServer, OpenOptions, ServerClient};
use crate::traits::session_delegate::SessionDelegate;

/// Lock-free counters updated from the capture callback and the monitor.
#[derive(Debug, Default)]
pub(crate) struct SessionCounters {
    pub(crate) callback_count: AtomicU64,
    pub(crate) frames_captured: AtomicU64,
    pub(crate) skipped_callbacks: AtomicU64,
    pub(crate) reconnect_attempts: AtomicU64,
    pub(crate) reconnects: AtomicU64,
}

#[derive(Debug, Default)]
pub(crate) struct ConnectionStatus {
    pub(crate) server: Option<ServerInfo>,
    pub(crate) connected_at: Option<DateTime<Utc>>,
    pub(crate) last_failure: Option<String>,
}

/// State shared by the session handle, the capture callback, the shutdown
/// notification and the monitor thread.
pub(crate) struct SessionInner<S: AudioServer> {
    pub(crate) id: String,
    pub(crate) server: S,
    pub(crate) config: SessionConfig,
    pub(crate) buffer: SharedAudioBuffer,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) connection: Mutex<Option<ActiveOf<S>>>,
    /// Connection dropped by the server, kept until its notification is over.
    pub(crate) retired: Mutex<Option<ActiveOf<S>>>,
    pub(crate) monitor: Mutex<Option<thread::JoinHandle<()>>>,
    pub(crate) delegate: Option<Arc<dyn SessionDelegate>>,
    pub(crate) counters: SessionCounters,
    pub(crate) status: Mutex<ConnectionStatus>,
}

impl<S: AudioServer> SessionInner<S> {
    /// Store a freshly activated connection, closing whatever it replaces.
    pub(crate) fn install_connection(&self, active: ActiveOf<S>) {
        let replaced = self.connection.lock().replace(active);
        if let Some(stale) = replaced {
            release_connection(stale);
        }
    }

    pub(crate) fn notify_state(&self, state: LifecycleState) {
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(state);
        }
    }
}

/// Close a connection, logging instead of failing.
pub(crate) fn release_connection<A: ActiveClient>(active: A) {
    if let Err(e) = active.close() {
        log::error!("Failed to close audio server client: {}", e);
    }
}

/// Configure a connected client: validate the buffer against the negotiated
/// period, register the input ports and activate the capture callback.
///
/// Nothing is activated when the buffer is too small.
pub(crate) fn configure<S: AudioServer>(
    inner: &Arc<SessionInner<S>>,
    mut client: S::Client,
) -> Result<ActiveOf<S>, SessionError> {
    let info = ServerInfo {
        sample_rate: client.sample_rate(),
        period_frames: client.period_frames(),
    };

    let layout = {
        let mut buffer = inner.buffer.lock();
        buffer.apply_server_info(&info);
        log::info!(
            "[{}] sample rate/size overwritten by server: {} Hz, {} bytes ({:.1}ms)",
            inner.id,
            info.sample_rate,
            info.sample_size(),
            info.latency_ms()
        );

        if !buffer.fits_period(info.period_frames as usize) {
            let error = SessionError::BufferTooSmall {
                capacity: buffer.capacity(),
                period: info.period_frames as usize,
            };
            log::error!("[{}] {}", inner.id, error);
            return Err(error);
        }
        buffer.channels()
    };

    for name in layout.port_names() {
        client.register_input_port(name)?;
    }

    let active = client.activate(CaptureContext::new(Arc::clone(inner)))?;

    {
        let mut status = inner.status.lock();
        status.server = Some(info);
        status.connected_at = Some(Utc::now());
    }
    if let Some(ref delegate) = inner.delegate {
        delegate.on_connected(&info);
    }

    Ok(active)
}

/// Handle to an open input session.
///
/// Opening connects to the audio server and starts feeding the shared buffer.
/// If the server goes away the session reconnects in the background until it
/// is closed. Closing (or dropping) the handle waits until neither the capture
/// callback nor the monitor can touch the session any more.
///
/// ```text
/// open ──► [callback writes buffer] ──server shutdown──► [monitor retries]
///               ▲                                              │
///               └──────────────── reconnected ◄────────────────┘
/// close ──► draining ──rendezvous with live worker──► terminated
/// ```
pub struct Session<S: AudioServer> {
    inner: Arc<SessionInner<S>>,
    closed: bool,
}

impl<S: AudioServer> Session<S> {
    /// Connect to `server` and start capturing into `buffer`.
    ///
    /// Fails if the server cannot be reached at all, or if `buffer` cannot hold
    /// one period. Both are unrecoverable for the caller.
    pub fn open(
        server: S,
        buffer: SharedAudioBuffer,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        Self::open_inner(server, buffer, config, None)
    }

    /// Like [`open`](Self::open), reporting session events to `delegate`.
    pub fn open_with_delegate(
        server: S,
        buffer: SharedAudioBuffer,
        config: SessionConfig,
        delegate: Arc<dyn SessionDelegate>,
    ) -> Result<Self, SessionError> {
        Self::open_inner(server, buffer, config, Some(delegate))
    }

    fn open_inner(
        server: S,
        buffer: SharedAudioBuffer,
        config: SessionConfig,
        delegate: Option<Arc<dyn SessionDelegate>>,
    ) -> Result<Self, SessionError> {
        config.validate().map_err(SessionError::InvalidConfig)?;

        let inner = Arc::new(SessionInner {
            id: uuid::Uuid::new_v4().to_string(),
            server,
            config,
            buffer,
            lifecycle: Lifecycle::new(),
            connection: Mutex::new(None),
            retired: Mutex::new(None),
            monitor: Mutex::new(None),
            delegate,
            counters: SessionCounters::default(),
            status: Mutex::new(ConnectionStatus::default()),
        });

        let options = OpenOptions {
            start_server: inner.config.start_server,
        };
        let (client, status) = inner
            .server
            .open_client(&inner.config.client_name, options)
            .map_err(|e| {
                log::error!("[{}] Unable to connect to audio server: {}", inner.id, e);
                SessionError::from(e)
            })?;

        if status.server_started && inner.config.verbose {
            log::info!("[{}] Audio server started", inner.id);
        }

        let active = configure(&inner, client)?;
        inner.install_connection(active);
        inner.notify_state(LifecycleState::Working);

        log::debug!(
            "[{}] Session open as '{}'",
            inner.id,
            inner.config.client_name
        );

        Ok(Self {
            inner,
            closed: false,
        })
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn state(&self) -> LifecycleState {
        self.inner.lifecycle.state()
    }

    /// The buffer this session writes into.
    pub fn buffer(&self) -> &SharedAudioBuffer {
        &self.inner.buffer
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Whether a server connection is currently configured.
    pub fn is_connected(&self) -> bool {
        self.inner.connection.lock().is_some()
    }

    pub fn diagnostics(&self) -> SessionDiagnostics {
        let inner = &self.inner;
        let counters = &inner.counters;
        let status = inner.status.lock();
        SessionDiagnostics {
            session_id: inner.id.clone(),
            state: inner.lifecycle.state(),
            callback_count: counters.callback_count.load(Ordering::Relaxed),
            frames_captured: counters.frames_captured.load(Ordering::Relaxed),
            skipped_callbacks: counters.skipped_callbacks.load(Ordering::Relaxed),
            reconnect_attempts: counters.reconnect_attempts.load(Ordering::Relaxed),
            reconnects: counters.reconnects.load(Ordering::Relaxed),
            terminal_transitions: inner.lifecycle.terminal_transitions(),
            rendezvous_waits: inner.lifecycle.rendezvous_waits(),
            server: status.server,
            connected_at: status.connected_at,
            last_failure: status.last_failure.clone(),
        }
    }

    /// Close the session and release the server connection.
    ///
    /// Returns once the capture callback or the monitor, whichever is live,
    /// has acknowledged the shutdown. Returns the final diagnostics.
    pub fn close(mut self) -> SessionDiagnostics {
        self.shutdown();
        self.diagnostics()
    }

    fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let inner = &self.inner;
        if inner.lifecycle.request_drain() {
            inner.notify_state(LifecycleState::Draining);
            inner.lifecycle.await_handoff();
            inner.notify_state(LifecycleState::Terminated);
        }

        let monitor = inner.monitor.lock().take();
        if let Some(handle) = monitor {
            if handle.join().is_err() {
                log::error!("[{}] Failed to join monitor thread", inner.id);
            }
        }

        let connection = inner.connection.lock().take();
        if let Some(active) = connection {
            release_connection(active);
        }
        let retired = inner.retired.lock().take();
        if let Some(active) = retired {
            release_connection(active);
        }

        log::debug!("[{}] Session closed", inner.id);
    }
}

impl<S: AudioServer> Drop for Session<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
