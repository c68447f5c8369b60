use serde::{Deserialize, Serialize};

/// Upper bound on connectivity checks the agent may run per stream.
pub const DEFAULT_MAX_CONNECTIVITY_CHECKS: u32 = 100;

/// Connectivity settings supplied by the relay configuration.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceConfig {
    /// STUN server host. Empty disables server reflexive gathering.
    pub stun_server: String,
    pub stun_port: u16,
    /// Lower bound of the local port range, 0 for unrestricted.
    pub min_port: u16,
    /// Upper bound of the local port range, 0 for unrestricted.
    pub max_port: u16,
}

/// Collects the settings an `IceAgent` is configured with, for
/// future-proofness of the interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    pub is_controlling: bool,
    pub max_connectivity_checks: u32,
    /// STUN server host and port, when both are set.
    pub stun_server: Option<(String, u16)>,
    /// Local port range, when both bounds are non-zero.
    pub port_range: Option<(u16, u16)>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            is_controlling: true,
            max_connectivity_checks: DEFAULT_MAX_CONNECTIVITY_CHECKS,
            stun_server: None,
            port_range: None,
        }
    }
}

impl From<&IceConfig> for AgentConfig {
    fn from(config: &IceConfig) -> Self {
        let stun_server = if !config.stun_server.is_empty() && config.stun_port != 0 {
            Some((config.stun_server.clone(), config.stun_port))
        } else {
            None
        };

        let port_range = if config.min_port != 0 && config.max_port != 0 {
            Some((config.min_port, config.max_port))
        } else {
            None
        };

        AgentConfig {
            stun_server,
            port_range,
            ..Default::default()
        }
    }
}
