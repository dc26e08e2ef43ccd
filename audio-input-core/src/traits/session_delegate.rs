use crate::models::audio_models::ServerInfo;
use crate::models::error::{ServerError, SessionError};
use crate::models::state::LifecycleState;

/// Event delegate for session notifications.
///
/// Methods are called from whichever thread caused the event: the owning
/// thread, the monitor thread, or the server's notification thread. Never
/// from the real-time process callback.
pub trait SessionDelegate: Send + Sync {
    /// Called when the lifecycle state changes.
    fn on_state_changed(&self, state: LifecycleState);

    /// Called after a connection has been configured and activated.
    fn on_connected(&self, info: &ServerInfo);

    /// Called when the server dropped the session and reconnection starts.
    fn on_connection_lost(&self);

    /// Called for every failed reconnection attempt (1-based).
    fn on_reconnect_failed(&self, attempt: u64, error: &ServerError);

    /// Called when the monitor hits an unrecoverable error.
    ///
    /// The application is expected to exit. If this returns, the session stays
    /// disconnected until it is closed.
    fn on_fatal(&self, error: &SessionError);
}
