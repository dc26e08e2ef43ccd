use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::session::handle::SessionInner;
use crate::session::lifecycle::Checkpoint;
use crate::session::monitor;
use crate::traits::audio_server::AudioServer;

/// Entry points the server boundary needs from a session.
trait SessionCallbacks: Send + Sync {
    fn process(&self, inputs: &[&[f32]]);
    fn server_shutdown(&self);
}

/// Per-session capability handed to the backend on activation.
///
/// The backend calls [`process`](Self::process) from its real-time thread and
/// [`server_shutdown`](Self::server_shutdown) when the server drops the
/// client. Each session owns its own context; there is no global callback
/// state.
#[derive(Clone)]
pub struct CaptureContext {
    callbacks: Arc<dyn SessionCallbacks>,
}

impl CaptureContext {
    pub(crate) fn new<S: AudioServer>(inner: Arc<SessionInner<S>>) -> Self {
        Self {
            callbacks: Arc::new(Binding(inner)),
        }
    }

    /// Capture callback, invoked once per period.
    ///
    /// `inputs` holds one buffer per registered input port, in registration
    /// order, each `N` frames long. Completes in time proportional to `N`;
    /// blocks only on the shared buffer lock, and on the shutdown rendezvous
    /// when the session is being closed.
    pub fn process(&self, inputs: &[&[f32]]) {
        self.callbacks.process(inputs);
    }

    /// Shutdown notification: the server has dropped this client.
    ///
    /// Must not be called from inside [`process`](Self::process).
    pub fn server_shutdown(&self) {
        self.callbacks.server_shutdown();
    }
}

impl fmt::Debug for CaptureContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureContext").finish_non_exhaustive()
    }
}

struct Binding<S: AudioServer>(Arc<SessionInner<S>>);

impl<S: AudioServer> SessionCallbacks for Binding<S> {
    fn process(&self, inputs: &[&[f32]]) {
        let inner = &self.0;

        if inner.lifecycle.checkpoint() == Checkpoint::Exit {
            inner.counters.skipped_callbacks.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let frames = inputs.first().map_or(0, |port| port.len());
        inner.buffer.lock().push_period(inputs);

        inner.counters.callback_count.fetch_add(1, Ordering::Relaxed);
        inner
            .counters
            .frames_captured
            .fetch_add(frames as u64, Ordering::Relaxed);
    }

    fn server_shutdown(&self) {
        monitor::handle_server_shutdown(&self.0);
    }
}
