use parking_lot::Mutex;

use crate::models::audio_models::ServerInfo;
use crate::models::error::{ServerError, SessionError};
use crate::models::state::LifecycleState;
use crate::traits::session_delegate::SessionDelegate;

#[derive(Debug, Default)]
struct Recorded {
    states: Vec<LifecycleState>,
    connections: Vec<ServerInfo>,
    connection_losses: usize,
    reconnect_failures: Vec<(u64, ServerError)>,
    fatal_errors: Vec<SessionError>,
}

/// Delegate that records every event. `on_fatal` returns instead of exiting.
#[derive(Debug, Default)]
pub struct RecordingDelegate {
    recorded: Mutex<Recorded>,
}

impl RecordingDelegate {
    pub fn states(&self) -> Vec<LifecycleState> {
        self.recorded.lock().states.clone()
    }

    pub fn connections(&self) -> usize {
        self.recorded.lock().connections.len()
    }

    pub fn connection_losses(&self) -> usize {
        self.recorded.lock().connection_losses
    }

    pub fn reconnect_failures(&self) -> usize {
        self.recorded.lock().reconnect_failures.len()
    }

    pub fn fatal_errors(&self) -> Vec<SessionError> {
        self.recorded.lock().fatal_errors.clone()
    }
}

impl SessionDelegate for RecordingDelegate {
    fn on_state_changed(&self, state: LifecycleState) {
        self.recorded.lock().states.push(state);
    }

    fn on_connected(&self, info: &ServerInfo) {
        self.recorded.lock().connections.push(*info);
    }

    fn on_connection_lost(&self) {
        self.recorded.lock().connection_losses += 1;
    }

    fn on_reconnect_failed(&self, attempt: u64, error: &ServerError) {
        self.recorded
            .lock()
            .reconnect_failures
            .push((attempt, error.clone()));
    }

    fn on_fatal(&self, error: &SessionError) {
        self.recorded.lock().fatal_errors.push(error.clone());
    }
}
