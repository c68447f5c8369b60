
pub mod agent_config;

use bytes::Bytes;
use crossbeam_channel::Sender;
use shared::error::Result;
use std::fmt;
use std::net::SocketAddr;

use crate::candidate::{Candidate, CandidateType};
use agent_config::AgentConfig;

/// Connectivity state of one component as reported by the agent.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ComponentState {
    Disconnected,
    Gathering,
    Connecting,
    Connected,
    Ready,
    Failed,
}

impl fmt::Display for ComponentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            Self::Disconnected => "Disconnected",
            Self::Gathering => "Gathering",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::Ready => "Ready",
            Self::Failed => "Failed",
        };
        write!(f, "{s}")
    }
}

/// A local candidate as the agent knows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentCandidate {
    pub component: u16,
    pub foundation: String,
    pub priority: u32,
    pub candidate_type: CandidateType,
    pub address: SocketAddr,
    /// Address the candidate was derived from; the related address of
    /// reflexive and relayed candidates.
    pub base_address: SocketAddr,
}

/// Notifications an agent raises while it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    /// A local candidate identified by `foundation` was discovered on `component`.
    NewCandidate { component: u16, foundation: String },
    GatheringDone,
    ComponentStateChanged {
        component: u16,
        state: ComponentState,
    },
    NewSelectedPair { component: u16 },
    /// Application data received on `component`.
    Data { component: u16, data: Bytes },
}

pub(crate) enum ReactorMessage {
    Agent(AgentEvent),
    Shutdown,
}

/// Handle an agent uses to post events to the reactor of its `IceConnection`.
#[derive(Clone)]
pub struct EventSender {
    tx: Sender<ReactorMessage>,
}

impl EventSender {
    pub(crate) fn new(tx: Sender<ReactorMessage>) -> Self {
        EventSender { tx }
    }

    /// Posts `event` to the reactor. Returns false once the connection is gone.
    pub fn send(&self, event: AgentEvent) -> bool {
        self.tx.send(ReactorMessage::Agent(event)).is_ok()
    }
}

/// The ICE agent collaborator: STUN/TURN gathering, connectivity checks and
/// the sockets they run on. One agent backs exactly one stream.
pub trait IceAgent: Send + Sync {
    fn configure(&self, config: &AgentConfig) -> Result<()>;

    /// Creates the single stream of the agent with `components` components.
    fn add_stream(&self, components: u16) -> Result<()>;

    /// Returns `(ufrag, pwd)` of the stream.
    fn local_credentials(&self) -> Result<(String, String)>;

    /// Connects the agent to the reactor. Events are posted from any thread.
    fn attach(&self, events: EventSender);

    fn gather_candidates(&self) -> Result<()>;

    fn local_candidates(&self, component: u16) -> Result<Vec<AgentCandidate>>;

    fn set_remote_candidates(&self, component: u16, candidates: &[Candidate]) -> Result<()>;

    /// Sends `data` on `component`, returning how many bytes were written.
    fn send(&self, component: u16, data: &[u8]) -> Result<usize>;

    /// Returns the `(local, remote)` addresses of the selected pair.
    fn selected_pair(&self, component: u16) -> Option<(SocketAddr, SocketAddr)>;

    /// Releases sockets and timers. Called after the reactor stopped.
    fn close(&self);
}
