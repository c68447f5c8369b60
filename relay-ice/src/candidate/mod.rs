
use log::trace;
use serde::{Deserialize, Serialize};
use shared::MediaKind;
use shared::error::{Error, Result};
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::agent::AgentCandidate;

/// Component carrying RTP, and RTCP too when muxed.
pub const COMPONENT_RTP: u16 = 1;
/// Component carrying RTCP on sessions without rtcp-mux.
pub const COMPONENT_RTCP: u16 = 2;

/// Network protocol tag carried by every candidate the relay produces.
pub const NETWORK_UDP: &str = "udp";

const CANDIDATE_PREFIX: &str = "candidate:";

/// `typ` of a candidate line (RFC 8839, 5.1).
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateType {
    #[default]
    #[serde(rename = "host")]
    Host,
    #[serde(rename = "srflx")]
    ServerReflexive,
    #[serde(rename = "prflx")]
    PeerReflexive,
    #[serde(rename = "relay")]
    Relay,
}

impl fmt::Display for CandidateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            CandidateType::Host => "host",
            CandidateType::ServerReflexive => "srflx",
            CandidateType::PeerReflexive => "prflx",
            CandidateType::Relay => "relay",
        };
        write!(f, "{s}")
    }
}

impl TryFrom<&str> for CandidateType {
    type Error = Error;

    fn try_from(raw: &str) -> Result<Self> {
        match raw {
            "host" => Ok(CandidateType::Host),
            "srflx" => Ok(CandidateType::ServerReflexive),
            "prflx" => Ok(CandidateType::PeerReflexive),
            "relay" => Ok(CandidateType::Relay),
            _ => Err(Error::ErrUnknownCandidateType),
        }
    }
}

impl CandidateType {
    /// Reflexive and relayed candidates advertise the address they were derived from.
    pub fn has_related_address(self) -> bool {
        matches!(self, CandidateType::ServerReflexive | CandidateType::Relay)
    }
}

/// `raddr`/`rport` of a reflexive or relayed candidate.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRelatedAddress {
    pub address: String,
    pub port: u16,
}

impl fmt::Display for CandidateRelatedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, " related {}:{}", self.address, self.port)
    }
}

/// A local or remote transport address as exchanged over signaling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub foundation: String,
    pub component: u16,
    pub priority: u32,
    pub candidate_type: CandidateType,
    pub address: String,
    pub port: u16,
    pub related_address: Option<CandidateRelatedAddress>,
    /// Username fragment of the agent that owns this candidate.
    pub username: String,
    pub password: String,
    pub network: String,
    /// Name of the transport (`audio` or `video`) the candidate belongs to.
    pub transport_name: String,
    pub media_kind: MediaKind,
}

// String makes the Candidate printable
impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(related_address) = &self.related_address {
            write!(
                f,
                "{} {} {}:{}{}",
                self.network, self.candidate_type, self.address, self.port, related_address,
            )
        } else {
            write!(
                f,
                "{} {} {}:{}",
                self.network, self.candidate_type, self.address, self.port,
            )
        }
    }
}

impl Candidate {
    /// Builds the signaling record for a candidate discovered by the agent.
    /// Returns `None` for IPv6 candidates, which the relay never advertises.
    pub fn from_agent(
        discovered: &AgentCandidate,
        credentials: (&str, &str),
        transport_name: &str,
        media_kind: MediaKind,
    ) -> Option<Candidate> {
        if discovered.address.is_ipv6() {
            trace!("ignoring IPv6 candidate {}", discovered.address);
            return None;
        }

        let related_address = if discovered.candidate_type.has_related_address() {
            Some(CandidateRelatedAddress {
                address: discovered.base_address.ip().to_string(),
                port: discovered.base_address.port(),
            })
        } else {
            None
        };

        Some(Candidate {
            foundation: discovered.foundation.clone(),
            component: discovered.component,
            priority: discovered.priority,
            candidate_type: discovered.candidate_type,
            address: discovered.address.ip().to_string(),
            port: discovered.address.port(),
            related_address,
            username: credentials.0.to_owned(),
            password: credentials.1.to_owned(),
            network: NETWORK_UDP.to_owned(),
            transport_name: transport_name.to_owned(),
            media_kind,
        })
    }

    /// Parses the candidate address into a socket address.
    pub fn addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .address
            .parse()
            .map_err(|_| Error::ErrAddressParseFailed)?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Renders the value of an `a=candidate` attribute.
    pub fn marshal(&self) -> String {
        let mut val = format!(
            "{}{} {} {} {} {} {} typ {}",
            CANDIDATE_PREFIX,
            self.foundation,
            self.component,
            self.network,
            self.priority,
            self.address,
            self.port,
            self.candidate_type
        );

        if let Some(related_address) = &self.related_address {
            val += format!(
                " raddr {} rport {}",
                related_address.address, related_address.port,
            )
            .as_str();
        }

        val += " generation 0";
        val
    }

    /// Parses an `a=candidate` value received from the remote peer. The
    /// `candidate:` prefix is optional; credentials and transport naming are
    /// filled in by the caller.
    pub fn unmarshal(raw: &str, media_kind: MediaKind) -> Result<Candidate> {
        let raw = raw.strip_prefix(CANDIDATE_PREFIX).unwrap_or(raw);
        let split: Vec<&str> = raw.split_whitespace().collect();
        if split.len() < 8 {
            return Err(Error::Other(format!(
                "candidate attribute too short ({})",
                split.len()
            )));
        }

        let foundation = split[0].to_owned();
        let component: u16 = split[1]
            .parse()
            .map_err(|_| Error::Other(format!("invalid component {}", split[1])))?;
        let network = split[2].to_lowercase();
        let priority: u32 = split[3]
            .parse()
            .map_err(|_| Error::Other(format!("invalid priority {}", split[3])))?;
        let address = split[4].to_owned();
        let port: u16 = split[5]
            .parse()
            .map_err(|_| Error::Other(format!("invalid port {}", split[5])))?;
        let candidate_type = CandidateType::try_from(split[7])?;

        let mut related_address = None;
        if split.len() > 8 && split[8] == "raddr" {
            if split.len() < 12 {
                return Err(Error::Other(
                    "related address: incorrect length".to_owned(),
                ));
            }
            let rel_port: u16 = split[11]
                .parse()
                .map_err(|_| Error::Other(format!("invalid related port {}", split[11])))?;
            related_address = Some(CandidateRelatedAddress {
                address: split[9].to_owned(),
                port: rel_port,
            });
        }

        Ok(Candidate {
            foundation,
            component,
            priority,
            candidate_type,
            address,
            port,
            related_address,
            username: String::new(),
            password: String::new(),
            network,
            transport_name: media_kind.mid().to_owned(),
            media_kind,
        })
    }
}
