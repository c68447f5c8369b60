#[cfg(test)]
mod state_test;

use std::fmt;

/// Readiness of one ICE component, and of an `IceConnection` as a whole.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum IceState {
    /// Agent created, nothing gathered yet.
    #[default]
    Initial,

    /// At least one local candidate has been surfaced.
    CandidatesGathered,

    /// Remote candidates have been installed in the agent.
    CandidatesReceived,

    /// Every component has a selected pair and media can flow.
    Ready,

    /// Connectivity checks failed for some component.
    Failed,

    /// The connection was closed and released its agent.
    Finished,
}

impl fmt::Display for IceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            Self::Initial => "Initial",
            Self::CandidatesGathered => "CandidatesGathered",
            Self::CandidatesReceived => "CandidatesReceived",
            Self::Ready => "Ready",
            Self::Failed => "Failed",
            Self::Finished => "Finished",
        };
        write!(f, "{s}")
    }
}

impl From<u8> for IceState {
    fn from(v: u8) -> Self {
        match v {
            1 => Self::CandidatesGathered,
            2 => Self::CandidatesReceived,
            3 => Self::Ready,
            4 => Self::Failed,
            5 => Self::Finished,
            _ => Self::Initial,
        }
    }
}

impl From<IceState> for u8 {
    fn from(state: IceState) -> Self {
        match state {
            IceState::Initial => 0,
            IceState::CandidatesGathered => 1,
            IceState::CandidatesReceived => 2,
            IceState::Ready => 3,
            IceState::Failed => 4,
            IceState::Finished => 5,
        }
    }
}
