//! # audio-input-core
//!
//! Platform-agnostic audio input core library.
//!
//! Feeds live audio from an audio server into a shared rolling buffer read by
//! a visualizer, and keeps doing so across server restarts: when the server
//! drops the session a background monitor reconnects, and closing the session
//! hands off safely with whichever of the capture callback or the monitor is
//! live at the time. Server backends (JACK) implement the `AudioServer` trait
//! and plug into the generic `Session`.
//!
//! ## Architecture
//!
//! ```text
//! audio-input-core (this crate)
//! ├── traits/       ← AudioServer, ServerClient, ActiveClient, SessionDelegate
//! ├── models/       ← SessionError, LifecycleState, SessionConfig, ServerInfo, etc.
//! ├── processing/   ← AudioBuffer / SharedAudioBuffer
//! ├── session/      ← Session handle, Lifecycle, CaptureContext, monitor
//! └── mock/         ← MockServer (tests, `mock-server` feature)
//! ```
//!
//! ## Threads
//!
//! - **Server RT thread**: calls `CaptureContext::process` every period.
//! - **Monitor thread**: exists only while the server is gone.
//! - **Owner thread**: opens and closes the session.

pub mod models;
pub mod processing;
pub mod session;
pub mod traits;

#[cfg(any(test, feature = "mock-server"))]
pub mod mock;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{ChannelLayout, ServerInfo, SessionDiagnostics};
pub use models::config::SessionConfig;
pub use models::error::{ServerError, SessionError};
pub use models::state::LifecycleState;
pub use processing::shared_buffer::{AudioBuffer, SharedAudioBuffer};
pub use session::context::CaptureContext;
pub use session::handle::Session;
pub use session::lifecycle::{Checkpoint, Lifecycle};
pub use traits::audio_server::{ActiveClient, ActiveOf, AudioServer, OpenOptions, OpenStatus, ServerClient};
pub use traits::session_delegate::SessionDelegate;
