
use ice::IceConfig;
use serde::{Deserialize, Serialize};

/// SSRC stamped on every audio packet the relay sends.
pub const DEFAULT_AUDIO_SINK_SSRC: u32 = 44444;
/// SSRC stamped on every video packet and every FIR the relay sends.
pub const DEFAULT_VIDEO_SINK_SSRC: u32 = 55543;
/// Outbound packets held per connection before new ones are dropped.
pub const DEFAULT_SEND_QUEUE_CAPACITY: usize = 1000;

/// Static settings of a `WebRtcConnection`, supplied once at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// STUN server host; empty disables server reflexive candidates.
    pub stun_server: String,
    pub stun_port: u16,
    pub min_port: u16,
    pub max_port: u16,

    pub audio_enabled: bool,
    pub video_enabled: bool,

    pub audio_sink_ssrc: u32,
    pub video_sink_ssrc: u32,

    pub send_queue_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelayConfig {
            stun_server: String::new(),
            stun_port: 0,
            min_port: 0,
            max_port: 0,
            audio_enabled: true,
            video_enabled: true,
            audio_sink_ssrc: DEFAULT_AUDIO_SINK_SSRC,
            video_sink_ssrc: DEFAULT_VIDEO_SINK_SSRC,
            send_queue_capacity: DEFAULT_SEND_QUEUE_CAPACITY,
        }
    }
}

impl RelayConfig {
    /// Connectivity settings handed to every ICE connection of the relay.
    pub fn ice_config(&self) -> IceConfig {
        IceConfig {
            stun_server: self.stun_server.clone(),
            stun_port: self.stun_port,
            min_port: self.min_port,
            max_port: self.max_port,
        }
    }
}

#[derive(Default, Clone)]
pub struct RelayConfigBuilder {
    config: RelayConfig,
}

impl RelayConfigBuilder {
    pub fn new() -> Self {
        RelayConfigBuilder::default()
    }

    pub fn with_stun_server(mut self, stun_server: &str, stun_port: u16) -> Self {
        self.config.stun_server = stun_server.to_owned();
        self.config.stun_port = stun_port;
        self
    }

    pub fn with_port_range(mut self, min_port: u16, max_port: u16) -> Self {
        self.config.min_port = min_port;
        self.config.max_port = max_port;
        self
    }

    pub fn with_audio_enabled(mut self, audio_enabled: bool) -> Self {
        self.config.audio_enabled = audio_enabled;
        self
    }

    pub fn with_video_enabled(mut self, video_enabled: bool) -> Self {
        self.config.video_enabled = video_enabled;
        self
    }

    pub fn with_audio_sink_ssrc(mut self, ssrc: u32) -> Self {
        self.config.audio_sink_ssrc = ssrc;
        self
    }

    pub fn with_video_sink_ssrc(mut self, ssrc: u32) -> Self {
        self.config.video_sink_ssrc = ssrc;
        self
    }

    pub fn with_send_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.send_queue_capacity = capacity;
        self
    }

    pub fn build(self) -> RelayConfig {
        self.config
    }
}
