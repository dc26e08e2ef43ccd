//! Scriptable in-process audio server.
//!
//! Stands in for a real sound server in tests and CI: the test thread plays
//! the server's real-time thread by calling [`MockServer::process`] (or runs a
//! [`MockDriver`]), and can kill the server with [`MockServer::shutdown`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::models::error::ServerError;
use crate::session::context::CaptureContext;
use crate::traits::audio_server::{
    ActiveClient, AudioServer, OpenOptions, OpenStatus, ServerClient,
};

struct Script {
    running: bool,
    start_on_demand: bool,
    failures_left: u32,
    sample_rate: u32,
    period_frames: u32,
    attempts: Vec<(Instant, OpenOptions)>,
    ports: Vec<String>,
}

struct ActiveSlot {
    generation: u64,
    ports: usize,
    context: CaptureContext,
}

struct MockShared {
    script: Mutex<Script>,
    active: Mutex<Option<ActiveSlot>>,
    diagnostics_enabled: AtomicBool,
    activations: AtomicU64,
    closed_clients: AtomicU64,
    generation: AtomicU64,
}

/// Mock audio server. Clones share the same server.
#[derive(Clone)]
pub struct MockServer {
    shared: Arc<MockShared>,
}

impl MockServer {
    /// A running server with a fixed sample rate and period.
    pub fn new(sample_rate: u32, period_frames: u32) -> Self {
        Self {
            shared: Arc::new(MockShared {
                script: Mutex::new(Script {
                    running: true,
                    start_on_demand: false,
                    failures_left: 0,
                    sample_rate,
                    period_frames,
                    attempts: Vec::new(),
                    ports: Vec::new(),
                }),
                active: Mutex::new(None),
                diagnostics_enabled: AtomicBool::new(true),
                activations: AtomicU64::new(0),
                closed_clients: AtomicU64::new(0),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Whether clients can connect.
    pub fn set_running(&self, running: bool) {
        self.shared.script.lock().running = running;
    }

    /// Let an open with `start_server` bring a stopped server up.
    pub fn set_start_on_demand(&self, enabled: bool) {
        self.shared.script.lock().start_on_demand = enabled;
    }

    /// Fail the next `count` connection attempts even if the server is running.
    pub fn fail_next(&self, count: u32) {
        self.shared.script.lock().failures_left = count;
    }

    /// Period size handed to clients opened from now on.
    pub fn set_period_frames(&self, frames: u32) {
        self.shared.script.lock().period_frames = frames;
    }

    /// Run one period on the active client, as the server's real-time thread
    /// would. Returns `false` if no client is active.
    pub fn process(&self, inputs: &[&[f32]]) -> bool {
        let active = self.shared.active.lock();
        match active.as_ref() {
            Some(slot) => {
                slot.context.process(inputs);
                true
            }
            None => false,
        }
    }

    /// Drop the active client the way a dying server does, firing its
    /// shutdown notification. Returns `false` if no client was active.
    pub fn shutdown(&self) -> bool {
        let slot = self.shared.active.lock().take();
        match slot {
            Some(slot) => {
                slot.context.server_shutdown();
                true
            }
            None => false,
        }
    }

    /// Call back the active client every `interval` with `samples` on every
    /// port, until the returned driver is dropped.
    pub fn spawn_driver(&self, interval: Duration, samples: Vec<f32>) -> MockDriver {
        let stop = Arc::new(AtomicBool::new(false));
        let shared = Arc::clone(&self.shared);
        let flag = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("mock-server-rt".into())
            .spawn(move || {
                while !flag.load(Ordering::SeqCst) {
                    {
                        let active = shared.active.lock();
                        if let Some(slot) = active.as_ref() {
                            let inputs: Vec<&[f32]> =
                                (0..slot.ports).map(|_| samples.as_slice()).collect();
                            slot.context.process(&inputs);
                        }
                    }
                    thread::sleep(interval);
                }
            })
            .expect("failed to spawn mock driver thread");

        MockDriver {
            stop,
            handle: Some(handle),
        }
    }

    /// Context bound to the active client, for delivering callbacks late.
    pub fn active_context(&self) -> Option<CaptureContext> {
        self.shared
            .active
            .lock()
            .as_ref()
            .map(|slot| slot.context.clone())
    }

    pub fn is_active(&self) -> bool {
        self.shared.active.lock().is_some()
    }

    pub fn open_attempts(&self) -> usize {
        self.shared.script.lock().attempts.len()
    }

    pub fn attempt_times(&self) -> Vec<Instant> {
        self.shared.script.lock().attempts.iter().map(|(at, _)| *at).collect()
    }

    pub fn open_options_history(&self) -> Vec<OpenOptions> {
        self.shared.script.lock().attempts.iter().map(|(_, o)| *o).collect()
    }

    pub fn last_open_options(&self) -> Option<OpenOptions> {
        self.shared.script.lock().attempts.last().map(|(_, o)| *o)
    }

    /// Ports registered by the most recently opened client.
    pub fn registered_ports(&self) -> Vec<String> {
        self.shared.script.lock().ports.clone()
    }

    pub fn activations(&self) -> u64 {
        self.shared.activations.load(Ordering::SeqCst)
    }

    pub fn closed_clients(&self) -> u64 {
        self.shared.closed_clients.load(Ordering::SeqCst)
    }

    pub fn diagnostics_enabled(&self) -> bool {
        self.shared.diagnostics_enabled.load(Ordering::SeqCst)
    }
}

impl AudioServer for MockServer {
    type Client = MockClient;

    fn open_client(
        &self,
        _name: &str,
        options: OpenOptions,
    ) -> Result<(MockClient, OpenStatus), ServerError> {
        let mut script = self.shared.script.lock();
        script.attempts.push((Instant::now(), options));

        let mut status = OpenStatus::default();
        if !script.running {
            if !(options.start_server && script.start_on_demand) {
                return Err(ServerError::ServerFailed("server not running".into()));
            }
            script.running = true;
            status.server_started = true;
        }
        if script.failures_left > 0 {
            script.failures_left -= 1;
            return Err(ServerError::ServerFailed("scripted failure".into()));
        }

        script.ports.clear();
        let client = MockClient {
            shared: Arc::clone(&self.shared),
            sample_rate: script.sample_rate,
            period_frames: script.period_frames,
            ports: Vec::new(),
        };
        Ok((client, status))
    }

    fn set_diagnostics_enabled(&self, enabled: bool) {
        self.shared.diagnostics_enabled.store(enabled, Ordering::SeqCst);
    }
}

/// A connected mock client.
pub struct MockClient {
    shared: Arc<MockShared>,
    sample_rate: u32,
    period_frames: u32,
    ports: Vec<String>,
}

impl ServerClient for MockClient {
    type Active = MockActive;

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn period_frames(&self) -> u32 {
        self.period_frames
    }

    fn register_input_port(&mut self, name: &str) -> Result<(), ServerError> {
        if self.ports.iter().any(|p| p == name) {
            return Err(ServerError::PortRegistration {
                port: name.to_string(),
                reason: "duplicate port name".into(),
            });
        }
        self.ports.push(name.to_string());
        self.shared.script.lock().ports.push(name.to_string());
        Ok(())
    }

    fn activate(self, context: CaptureContext) -> Result<MockActive, ServerError> {
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst);
        *self.shared.active.lock() = Some(ActiveSlot {
            generation,
            ports: self.ports.len(),
            context,
        });
        self.shared.activations.fetch_add(1, Ordering::SeqCst);

        Ok(MockActive {
            shared: self.shared,
            generation,
        })
    }
}

/// An activated mock client.
pub struct MockActive {
    shared: Arc<MockShared>,
    generation: u64,
}

impl ActiveClient for MockActive {
    fn close(self) -> Result<(), ServerError> {
        let mut active = self.shared.active.lock();
        if active.as_ref().map(|slot| slot.generation) == Some(self.generation) {
            *active = None;
        }
        self.shared.closed_clients.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Background caller started by [`MockServer::spawn_driver`]. Stops on drop.
pub struct MockDriver {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Drop for MockDriver {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopped_server_refuses_clients() {
        let server = MockServer::new(48000, 256);
        server.set_running(false);

        let result = server.open_client("test", OpenOptions::default());

        assert!(matches!(result, Err(ServerError::ServerFailed(_))));
        assert_eq!(server.open_attempts(), 1);
    }

    #[test]
    fn start_on_demand_reports_started_server() {
        let server = MockServer::new(48000, 256);
        server.set_running(false);
        server.set_start_on_demand(true);

        let (_, status) = server
            .open_client("test", OpenOptions { start_server: true })
            .unwrap();
        assert!(status.server_started);

        let (_, status) = server
            .open_client("test", OpenOptions { start_server: true })
            .unwrap();
        assert!(!status.server_started);
    }

    #[test]
    fn scripted_failures_are_consumed() {
        let server = MockServer::new(48000, 256);
        server.fail_next(2);

        assert!(server.open_client("test", OpenOptions::default()).is_err());
        assert!(server.open_client("test", OpenOptions::default()).is_err());
        assert!(server.open_client("test", OpenOptions::default()).is_ok());
    }

    #[test]
    fn duplicate_port_is_rejected() {
        let server = MockServer::new(48000, 256);
        let (mut client, _) = server.open_client("test", OpenOptions::default()).unwrap();

        client.register_input_port("L").unwrap();
        let err = client.register_input_port("L").unwrap_err();

        assert!(matches!(err, ServerError::PortRegistration { .. }));
        assert_eq!(server.registered_ports(), vec!["L".to_string()]);
    }

    #[test]
    fn process_without_active_client_is_a_no_op() {
        let server = MockServer::new(48000, 4);
        assert!(!server.process(&[&[0.0; 4]]));
        assert!(!server.shutdown());
    }
}
