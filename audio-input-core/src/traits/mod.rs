pub mod audio_server;
pub mod session_delegate;
