
use std::fmt;

/// Aggregate state of a `WebRtcConnection`.
///
/// Progresses `Initial → Started → Ready` and never moves backwards, except
/// that any state may fall into `Failed`, which is terminal. `Finished` is
/// entered once, on teardown.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Initial,
    /// Every required transport has started negotiating.
    Started,
    /// Every required transport can carry media.
    Ready,
    Failed,
    Finished,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            ConnectionState::Initial => "initial",
            ConnectionState::Started => "started",
            ConnectionState::Ready => "ready",
            ConnectionState::Failed => "failed",
            ConnectionState::Finished => "finished",
        };
        write!(f, "{s}")
    }
}

impl From<u8> for ConnectionState {
    fn from(v: u8) -> Self {
        match v {
            1 => ConnectionState::Started,
            2 => ConnectionState::Ready,
            3 => ConnectionState::Failed,
            4 => ConnectionState::Finished,
            _ => ConnectionState::Initial,
        }
    }
}

impl From<ConnectionState> for u8 {
    fn from(state: ConnectionState) -> Self {
        match state {
            ConnectionState::Initial => 0,
            ConnectionState::Started => 1,
            ConnectionState::Ready => 2,
            ConnectionState::Failed => 3,
            ConnectionState::Finished => 4,
        }
    }
}

/// Readiness of a single transport (ICE plus the secure channel on top).
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum TransportState {
    #[default]
    Initial,
    Started,
    Ready,
    Failed,
}

impl TransportState {
    /// Reports whether the transport got at least as far as `other`.
    /// A failed transport has reached nothing.
    pub fn has_reached(self, other: TransportState) -> bool {
        match self {
            TransportState::Failed => false,
            _ => self.rank() >= other.rank(),
        }
    }

    fn rank(self) -> u8 {
        match self {
            TransportState::Initial => 0,
            TransportState::Started => 1,
            TransportState::Ready => 2,
            TransportState::Failed => 3,
        }
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            TransportState::Initial => "initial",
            TransportState::Started => "started",
            TransportState::Ready => "ready",
            TransportState::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl From<u8> for TransportState {
    fn from(v: u8) -> Self {
        match v {
            1 => TransportState::Started,
            2 => TransportState::Ready,
            3 => TransportState::Failed,
            _ => TransportState::Initial,
        }
    }
}

impl From<TransportState> for u8 {
    fn from(state: TransportState) -> Self {
        state.rank()
    }
}

/// Computes the connection state that follows a transport report.
///
/// * `reported` is the state the transport just entered.
/// * `from_bundle_transport` is set when the report comes from the single
///   transport of a bundled session, whose state alone decides.
/// * `required` holds the current state of every transport the session
///   needs: video when present, audio when present and not bundled.
///
/// Returns `None` when the report causes no transition.
pub fn next_connection_state(
    current: ConnectionState,
    reported: TransportState,
    from_bundle_transport: bool,
    required: &[TransportState],
) -> Option<ConnectionState> {
    if matches!(current, ConnectionState::Failed | ConnectionState::Finished) {
        return None;
    }

    let mut next = current;
    if reported == TransportState::Failed {
        next = ConnectionState::Failed;
    } else {
        if reported.has_reached(TransportState::Started)
            && required
                .iter()
                .all(|s| s.has_reached(TransportState::Started))
        {
            next = ConnectionState::Started;
        }

        if reported == TransportState::Ready
            && required.iter().all(|s| *s == TransportState::Ready)
        {
            next = ConnectionState::Ready;
        }

        if from_bundle_transport {
            match reported {
                TransportState::Started => next = ConnectionState::Started,
                TransportState::Ready => next = ConnectionState::Ready,
                _ => {}
            }
        }
    }

    if next == current || (next == ConnectionState::Started && current == ConnectionState::Ready) {
        return None;
    }
    Some(next)
}
