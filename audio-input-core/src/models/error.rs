use thiserror::Error;

/// Errors reported by an audio server backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServerError {
    /// No server is running, or it refused the connection.
    #[error("unable to connect to audio server: {0}")]
    ServerFailed(String),

    #[error("client rejected by audio server: {0}")]
    ClientRejected(String),

    #[error("failed to register port {port}: {reason}")]
    PortRegistration { port: String, reason: String },

    #[error("failed to activate client: {0}")]
    ActivationFailed(String),

    #[error("failed to close client: {0}")]
    CloseFailed(String),
}

/// Errors that end a session (or prevent one from starting).
///
/// Every variant is a precondition violation rather than a runtime fault:
/// the owning application is expected to exit when it sees one.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("invalid session configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("audio buffer is too small: capacity {capacity} frames, period {period} frames")]
    BufferTooSmall { capacity: usize, period: usize },

    #[error("failed to spawn monitor thread: {0}")]
    SpawnFailed(String),
}
