//! Test doubles for running sessions without a sound server.

mod delegate;
mod server;

pub use delegate::RecordingDelegate;
pub use server::{MockActive, MockClient, MockDriver, MockServer};
