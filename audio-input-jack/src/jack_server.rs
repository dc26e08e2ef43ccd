//! JACK server backend.
//!
//! Opens JACK clients, registers `AudioIn` ports and forwards the process
//! callback and the shutdown notification to the session's `CaptureContext`.

use jack::{AudioIn, Client, ClientOptions, ClientStatus, Control, Port, ProcessScope};

use audio_input_core::models::error::ServerError;
use audio_input_core::session::context::CaptureContext;
use audio_input_core::traits::audio_server::{
    ActiveClient, AudioServer, OpenOptions, OpenStatus, ServerClient,
};

/// Connection factory for the local JACK server.
#[derive(Debug, Clone, Copy, Default)]
pub struct JackServer;

impl JackServer {
    pub fn new() -> Self {
        Self
    }
}

impl AudioServer for JackServer {
    type Client = JackClient;

    fn open_client(
        &self,
        name: &str,
        options: OpenOptions,
    ) -> Result<(JackClient, OpenStatus), ServerError> {
        let flags = if options.start_server {
            ClientOptions::empty()
        } else {
            ClientOptions::NO_START_SERVER
        };

        let (client, status) = Client::new(name, flags).map_err(map_open_error)?;
        log::debug!("JACK client '{}' opened (status {:?})", client.name(), status);

        Ok((
            JackClient {
                client,
                ports: Vec::new(),
            },
            OpenStatus {
                server_started: status.contains(ClientStatus::SERVER_STARTED),
            },
        ))
    }

    fn set_diagnostics_enabled(&self, enabled: bool) {
        if enabled {
            jack::set_logger(jack::LoggerType::Stdio);
        } else {
            jack::set_logger(jack::LoggerType::None);
        }
    }
}

fn map_open_error(error: jack::Error) -> ServerError {
    match error {
        jack::Error::ClientError(status) if status.contains(ClientStatus::SERVER_FAILED) => {
            ServerError::ServerFailed(format!("status = {:?}", status))
        }
        other => ServerError::ClientRejected(other.to_string()),
    }
}

/// A JACK client that has not been activated yet.
pub struct JackClient {
    client: Client,
    ports: Vec<Port<AudioIn>>,
}

impl ServerClient for JackClient {
    type Active = JackActive;

    fn sample_rate(&self) -> u32 {
        self.client.sample_rate() as u32
    }

    fn period_frames(&self) -> u32 {
        self.client.buffer_size() as u32
    }

    fn register_input_port(&mut self, name: &str) -> Result<(), ServerError> {
        let port = self
            .client
            .register_port(name, AudioIn::default())
            .map_err(|e| ServerError::PortRegistration {
                port: name.to_string(),
                reason: e.to_string(),
            })?;
        self.ports.push(port);
        Ok(())
    }

    fn activate(self, context: CaptureContext) -> Result<JackActive, ServerError> {
        let processor = CaptureProcessor {
            ports: self.ports,
            context: context.clone(),
        };
        let notifications = ShutdownNotifier { context };

        let client = self
            .client
            .activate_async(notifications, processor)
            .map_err(|e| ServerError::ActivationFailed(e.to_string()))?;

        Ok(JackActive { client })
    }
}

/// An activated JACK client. Closing deactivates and disconnects it.
pub struct JackActive {
    client: jack::AsyncClient<ShutdownNotifier, CaptureProcessor>,
}

impl ActiveClient for JackActive {
    fn close(self) -> Result<(), ServerError> {
        self.client
            .deactivate()
            .map(|_| ())
            .map_err(|e| ServerError::CloseFailed(e.to_string()))
    }
}

/// Process handler: hands the port buffers of each period to the session.
///
/// Runs on JACK's real-time thread; never allocates.
pub struct CaptureProcessor {
    ports: Vec<Port<AudioIn>>,
    context: CaptureContext,
}

impl jack::ProcessHandler for CaptureProcessor {
    fn process(&mut self, _client: &Client, ps: &ProcessScope) -> Control {
        match self.ports.as_slice() {
            [mono] => self.context.process(&[mono.as_slice(ps)]),
            [left, right] => self
                .context
                .process(&[left.as_slice(ps), right.as_slice(ps)]),
            _ => {}
        }
        Control::Continue
    }
}

/// Notification handler: forwards server shutdown to the session.
///
/// The session retires the dropped client instead of deactivating it from
/// here, so this handler is not freed while `shutdown` is still running.
pub struct ShutdownNotifier {
    context: CaptureContext,
}

impl jack::NotificationHandler for ShutdownNotifier {
    unsafe fn shutdown(&mut self, status: ClientStatus, reason: &str) {
        log::warn!("JACK server shut down the client ({:?}): {}", status, reason);
        self.context.server_shutdown();
    }

    fn xrun(&mut self, _client: &Client) -> Control {
        log::trace!("JACK xrun");
        Control::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_failure_maps_to_server_failed() {
        let err = map_open_error(jack::Error::ClientError(
            ClientStatus::FAILURE | ClientStatus::SERVER_FAILED,
        ));
        assert!(matches!(err, ServerError::ServerFailed(_)));
    }

    #[test]
    fn other_open_errors_reject_the_client() {
        let err = map_open_error(jack::Error::ClientError(ClientStatus::NAME_NOT_UNIQUE));
        assert!(matches!(err, ServerError::ClientRejected(_)));
    }
}
