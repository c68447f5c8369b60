use serde::{Deserialize, Serialize};
use std::fmt;

const MEDIA_KIND_AUDIO_STR: &str = "audio";
const MEDIA_KIND_VIDEO_STR: &str = "video";

/// Kind of media carried by a transport or an outbound packet.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    #[serde(rename = "audio")]
    Audio,
    #[serde(rename = "video")]
    Video,
}

impl MediaKind {
    /// Returns the media line identifier (`a=mid`) used for this kind.
    pub fn mid(self) -> &'static str {
        match self {
            MediaKind::Audio => MEDIA_KIND_AUDIO_STR,
            MediaKind::Video => MEDIA_KIND_VIDEO_STR,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mid())
    }
}
