#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod agent;
pub mod candidate;
pub mod connection;
pub mod rand;
pub mod state;

pub use agent::agent_config::{AgentConfig, IceConfig};
pub use agent::{AgentCandidate, AgentEvent, ComponentState, EventSender, IceAgent};
pub use candidate::{Candidate, CandidateType};
pub use connection::{IceConnection, IceConnectionListener};
pub use state::IceState;
