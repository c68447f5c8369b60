
use ice::Candidate;
use serde::{Deserialize, Serialize};
use shared::MediaKind;
use shared::error::Result;

/// One `a=rtpmap` entry negotiated for a media section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadMapping {
    pub payload_type: u8,
    pub encoding_name: String,
    pub clock_rate: u32,
    pub channels: u16,
    pub media_kind: MediaKind,
}

/// ICE username fragment and password of one side of a stream.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCredentials {
    pub ufrag: String,
    pub pwd: String,
}

/// Structured form of the remote peer's session description.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDescription {
    pub has_audio: bool,
    pub has_video: bool,
    /// Announced source SSRCs, 0 when the offer does not carry them.
    pub audio_ssrc: u32,
    pub video_ssrc: u32,
    /// Audio and video share the video transport.
    pub bundle: bool,
    pub rtcp_mux: bool,
    pub payloads: Vec<PayloadMapping>,
    pub credentials: IceCredentials,
    pub candidates: Vec<Candidate>,
}

impl RemoteDescription {
    pub fn supports_payload_type(&self, payload_type: u8) -> bool {
        self.payloads
            .iter()
            .any(|p| p.payload_type == payload_type)
    }

    pub fn payloads_of(&self, media_kind: MediaKind) -> Vec<PayloadMapping> {
        self.payloads
            .iter()
            .filter(|p| p.media_kind == media_kind)
            .cloned()
            .collect()
    }
}

/// Local answer for one media line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSection {
    pub media_kind: MediaKind,
    pub ssrc: u32,
    pub credentials: IceCredentials,
    pub candidates: Vec<Candidate>,
    pub payloads: Vec<PayloadMapping>,
}

/// Structured local description, rendered to text by an `SdpWriter`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalDescription {
    pub bundle: bool,
    pub rtcp_mux: bool,
    pub audio: Option<MediaSection>,
    pub video: Option<MediaSection>,
}

/// Renders a local description into its textual form.
pub trait SdpWriter: Send + Sync {
    fn write(&self, description: &LocalDescription) -> Result<String>;
}
