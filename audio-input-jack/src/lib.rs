//! # audio-input-jack
//!
//! JACK backend for audio-input-core.
//!
//! Provides:
//! - `JackServer`: `AudioServer` implementation over the JACK client library
//! - `open_session`: open a `Session` on the local JACK server
//!
//! ## Platform Requirements
//! - Linux with a JACK server, or PipeWire's JACK compatibility layer
//! - Build with `--features jack-backend`
//!
//! ## Usage
//! ```ignore
//! use audio_input_core::{ChannelLayout, SessionConfig, SharedAudioBuffer};
//! use audio_input_jack::open_session;
//!
//! let buffer = SharedAudioBuffer::new(2048, ChannelLayout::Stereo);
//! let session = open_session(buffer.clone(), SessionConfig::default())?;
//! // ... read buffer.lock().left() / right() from the render loop ...
//! session.close();
//! ```

#[cfg(all(target_os = "linux", feature = "jack-backend"))]
pub mod jack_server;

#[cfg(all(target_os = "linux", feature = "jack-backend"))]
pub use jack_server::{JackActive, JackClient, JackServer};

/// Open an input session on the local JACK server.
#[cfg(all(target_os = "linux", feature = "jack-backend"))]
pub fn open_session(
    buffer: audio_input_core::SharedAudioBuffer,
    config: audio_input_core::SessionConfig,
) -> Result<audio_input_core::Session<JackServer>, audio_input_core::SessionError> {
    audio_input_core::Session::open(JackServer::new(), buffer, config)
}
