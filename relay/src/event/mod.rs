#[cfg(test)]
mod event_test;

use serde::{Deserialize, Serialize};
use shared::error::{Error, Result};
use std::fmt;

use crate::state::ConnectionState;

/// Notifications a `WebRtcConnection` raises towards signaling.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Initial,
    Started,
    Ready,
    Failed,
    Finished,
    /// A local candidate was found; the message is a JSON candidate object.
    CandidateDiscovered,
    /// The local description is available; the message is its text.
    LocalDescriptionReady,
}

impl fmt::Display for ConnectionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            ConnectionEvent::Initial => "initial",
            ConnectionEvent::Started => "started",
            ConnectionEvent::Ready => "ready",
            ConnectionEvent::Failed => "failed",
            ConnectionEvent::Finished => "finished",
            ConnectionEvent::CandidateDiscovered => "candidate",
            ConnectionEvent::LocalDescriptionReady => "sdp",
        };
        write!(f, "{s}")
    }
}

impl From<ConnectionState> for ConnectionEvent {
    fn from(state: ConnectionState) -> Self {
        match state {
            ConnectionState::Initial => ConnectionEvent::Initial,
            ConnectionState::Started => ConnectionEvent::Started,
            ConnectionState::Ready => ConnectionEvent::Ready,
            ConnectionState::Failed => ConnectionEvent::Failed,
            ConnectionState::Finished => ConnectionEvent::Finished,
        }
    }
}

/// Signaling side of a connection. `message` is empty for state events.
pub trait ConnectionEventListener: Send + Sync {
    fn notify_event(&self, event: ConnectionEvent, message: &str);
}

/// Trickle candidate as sent to the remote peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateMessage {
    #[serde(rename = "sdpMid")]
    pub sdp_mid: String,
    pub candidate: String,
}

impl CandidateMessage {
    pub fn new(sdp_mid: &str, candidate: &str) -> Self {
        CandidateMessage {
            sdp_mid: sdp_mid.to_owned(),
            candidate: candidate.to_owned(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Error::from_std)
    }
}
