use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::LifecycleState;

/// Input channel layout of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelLayout {
    Mono,
    Stereo,
}

impl ChannelLayout {
    pub fn from_count(channels: u16) -> Option<Self> {
        match channels {
            1 => Some(Self::Mono),
            2 => Some(Self::Stereo),
            _ => None,
        }
    }

    pub fn channel_count(&self) -> u16 {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
        }
    }

    /// Names of the input ports registered with the server, in delivery order.
    pub fn port_names(&self) -> &'static [&'static str] {
        match self {
            Self::Mono => &["Mono"],
            Self::Stereo => &["L", "R"],
        }
    }
}

/// Parameters negotiated with the audio server after (re)connecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServerInfo {
    pub sample_rate: u32,
    pub period_frames: u32,
}

impl ServerInfo {
    /// Size of one period of 32-bit float samples in bytes.
    pub fn sample_size(&self) -> usize {
        self.period_frames as usize * std::mem::size_of::<f32>()
    }

    pub fn latency_ms(&self) -> f32 {
        (self.period_frames as f32 / self.sample_rate as f32) * 1000.0
    }
}

/// Diagnostics for debugging input sessions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionDiagnostics {
    pub session_id: String,
    pub state: LifecycleState,
    pub callback_count: u64,
    pub frames_captured: u64,
    pub skipped_callbacks: u64,
    pub reconnect_attempts: u64,
    pub reconnects: u64,
    pub terminal_transitions: u64,
    pub rendezvous_waits: u64,
    pub server: Option<ServerInfo>,
    pub connected_at: Option<DateTime<Utc>>,
    pub last_failure: Option<String>,
}

impl SessionDiagnostics {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_from_count() {
        assert_eq!(ChannelLayout::from_count(1), Some(ChannelLayout::Mono));
        assert_eq!(ChannelLayout::from_count(2), Some(ChannelLayout::Stereo));
        assert_eq!(ChannelLayout::from_count(0), None);
        assert_eq!(ChannelLayout::from_count(6), None);
    }

    #[test]
    fn port_names_match_channel_count() {
        for layout in [ChannelLayout::Mono, ChannelLayout::Stereo] {
            assert_eq!(layout.port_names().len(), layout.channel_count() as usize);
        }
        assert_eq!(ChannelLayout::Stereo.port_names(), &["L", "R"]);
    }

    #[test]
    fn sample_size_is_four_bytes_per_frame() {
        let info = ServerInfo {
            sample_rate: 48000,
            period_frames: 256,
        };
        assert_eq!(info.sample_size(), 1024);
    }

    #[test]
    fn latency_from_period() {
        let info = ServerInfo {
            sample_rate: 48000,
            period_frames: 480,
        };
        approx::assert_relative_eq!(info.latency_ms(), 10.0);
    }
}
