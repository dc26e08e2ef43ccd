use crate::models::error::ServerError;
use crate::session::context::CaptureContext;

/// Options for opening a client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenOptions {
    /// Start the audio server if it is not running.
    pub start_server: bool,
}

/// What the server reported while opening a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenStatus {
    /// The server was not running and was started by this open.
    pub server_started: bool,
}

/// Entry point to an audio server (JACK, or the mock server in tests).
///
/// Implemented by:
/// - `JackServer` (Linux, `audio-input-jack`)
/// - `MockServer` (tests, `mock-server` feature)
pub trait AudioServer: Send + Sync + 'static {
    type Client: ServerClient;

    /// Connect a new client under `name`.
    fn open_client(
        &self,
        name: &str,
        options: OpenOptions,
    ) -> Result<(Self::Client, OpenStatus), ServerError>;

    /// Toggle the server library's own error output.
    ///
    /// Reconnection turns this off while it polls for a server so that every
    /// failed attempt does not spam stderr.
    fn set_diagnostics_enabled(&self, _enabled: bool) {}
}

/// A connected but not yet activated client.
pub trait ServerClient: Send + 'static {
    type Active: ActiveClient;

    fn sample_rate(&self) -> u32;

    /// Frames delivered per process callback.
    fn period_frames(&self) -> u32;

    /// Register an audio input port. Port buffers are handed to
    /// [`CaptureContext::process`] in registration order.
    fn register_input_port(&mut self, name: &str) -> Result<(), ServerError>;

    /// Bind the process callback and the shutdown notification to `context`
    /// and start processing.
    ///
    /// From here on the server calls [`CaptureContext::process`] on its
    /// real-time thread every period, and [`CaptureContext::server_shutdown`]
    /// if it drops the client.
    fn activate(self, context: CaptureContext) -> Result<Self::Active, ServerError>;
}

/// An activated client. Dropping it also disconnects, but `close` reports errors.
pub trait ActiveClient: Send + 'static {
    fn close(self) -> Result<(), ServerError>;
}

/// Activated client type of a server.
pub type ActiveOf<S> = <<S as AudioServer>::Client as ServerClient>::Active;
