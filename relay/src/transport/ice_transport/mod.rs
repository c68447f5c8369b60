#[cfg(test)]
mod ice_transport_test;

use ice::candidate::{COMPONENT_RTCP, COMPONENT_RTP};
use ice::{Candidate, IceAgent, IceConfig, IceConnection, IceConnectionListener, IceState};
use log::{debug, error, trace, warn};
use shared::MediaKind;
use shared::error::{Error, Result};
use shared::util::{is_rtcp, match_dtls, match_srtp_or_srtcp};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};

use super::secure_channel::{HandshakeLink, InsecureChannel, SecureChannel};
use super::{Transport, TransportFactory, TransportListener};
use crate::state::TransportState;

/// A transport running over one `IceConnection`, with a `SecureChannel`
/// layered on top once ICE is Ready.
///
/// ICE Initial moves the transport to Started, ICE Ready starts the channel
/// handshake whose completion makes the transport Ready, and ICE Failed fails
/// the transport. Failed is terminal.
pub struct IceTransport {
    media_kind: MediaKind,
    rtcp_mux: bool,

    ice: OnceLock<Arc<IceConnection>>,
    channel: Arc<dyn SecureChannel>,

    state: AtomicU8,
    state_lock: Mutex<()>,
    closed: AtomicBool,

    listener: Weak<dyn TransportListener>,
    weak_self: Weak<IceTransport>,
}

impl IceTransport {
    /// Creates the transport and its ICE stream: one component with rtcp-mux,
    /// two without.
    pub fn new(
        media_kind: MediaKind,
        rtcp_mux: bool,
        agent: Arc<dyn IceAgent>,
        channel: Arc<dyn SecureChannel>,
        config: &IceConfig,
        listener: Weak<dyn TransportListener>,
    ) -> Result<Arc<Self>> {
        let transport = Arc::new_cyclic(|weak_self| IceTransport {
            media_kind,
            rtcp_mux,
            ice: OnceLock::new(),
            channel,
            state: AtomicU8::new(TransportState::Initial.into()),
            state_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
            listener,
            weak_self: weak_self.clone(),
        });

        let components = if rtcp_mux { 1 } else { 2 };
        let ice_listener: Weak<dyn IceConnectionListener> = transport.weak_self.clone();
        let ice = IceConnection::new(
            media_kind,
            media_kind.mid(),
            components,
            agent,
            config,
            ice_listener,
        )?;
        if transport.ice.set(ice).is_err() {
            return Err(Error::Other(format!(
                "{} - ICE connection set twice",
                media_kind.mid()
            )));
        }

        Ok(transport)
    }

    pub fn ice_connection(&self) -> Option<&Arc<IceConnection>> {
        self.ice.get()
    }

    pub fn rtcp_mux(&self) -> bool {
        self.rtcp_mux
    }

    fn ice(&self) -> Result<&Arc<IceConnection>> {
        self.ice
            .get()
            .ok_or_else(|| Error::ErrNoTransport(self.media_kind.to_string()))
    }

    pub(crate) fn send_handshake(&self, data: &[u8]) -> Result<usize> {
        self.ice()?.send_data(COMPONENT_RTP, data)
    }

    pub(crate) fn on_secure_channel_ready(&self) {
        debug!("{} - secure channel established", self.transport_name());
        self.set_state(TransportState::Ready);
    }

    pub(crate) fn on_secure_channel_failed(&self, reason: &str) {
        let err = Error::ErrSecureChannel(reason.to_owned());
        error!("{} - {err}", self.transport_name());
        self.set_state(TransportState::Failed);
    }

    fn set_state(&self, state: TransportState) {
        {
            let Ok(_guard) = self.state_lock.lock() else {
                error!("{} - transport state poisoned", self.transport_name());
                return;
            };
            let current = self.state();
            if current == state || current == TransportState::Failed {
                return;
            }
            self.state.store(state.into(), Ordering::SeqCst);
        }

        debug!("{} - transport state changed to {state}", self.transport_name());
        if let Some(listener) = self.listener.upgrade() {
            listener.update_state(state, self);
        }
    }

    fn start_secure_channel(&self) {
        if self.state() != TransportState::Started {
            trace!(
                "{} - not starting secure channel in state {}",
                self.transport_name(),
                self.state()
            );
            return;
        }

        debug!("{} - starting secure channel", self.transport_name());
        let link = HandshakeLink::new(self.weak_self.clone());
        if let Err(err) = self.channel.start(link) {
            self.on_secure_channel_failed(&err.to_string());
        }
    }
}

impl IceConnectionListener for IceTransport {
    fn on_ice_data(&self, component: u16, data: &[u8], _source: &IceConnection) {
        if match_dtls(data) {
            if let Err(err) = self.channel.handle_handshake(data) {
                warn!("{} - handshake record rejected: {err}", self.transport_name());
            }
        } else if match_srtp_or_srtcp(data) {
            if self.state() != TransportState::Ready {
                trace!(
                    "{} - dropping media on component {component} before ready",
                    self.transport_name()
                );
                return;
            }
            let mut packet = match self.channel.unprotect(data) {
                Ok(packet) => packet,
                Err(err) => {
                    debug!("{} - failed to unprotect: {err}", self.transport_name());
                    return;
                }
            };
            if let Some(listener) = self.listener.upgrade() {
                listener.on_transport_data(&mut packet, self);
            }
        } else {
            trace!("{} - ignoring unknown packet", self.transport_name());
        }
    }

    fn on_candidate(&self, candidate: &Candidate, _source: &IceConnection) {
        if let Some(listener) = self.listener.upgrade() {
            listener.on_candidate(candidate, self);
        }
    }

    fn on_ice_state_change(&self, state: IceState, _source: &IceConnection) {
        match state {
            IceState::Initial => self.set_state(TransportState::Started),
            IceState::Ready => self.start_secure_channel(),
            IceState::Failed => self.set_state(TransportState::Failed),
            _ => trace!("{} - ICE state {state}", self.transport_name()),
        }
    }
}

impl Transport for IceTransport {
    fn media_kind(&self) -> MediaKind {
        self.media_kind
    }

    fn transport_name(&self) -> &str {
        self.media_kind.mid()
    }

    fn state(&self) -> TransportState {
        TransportState::from(self.state.load(Ordering::SeqCst))
    }

    fn start(&self) -> Result<()> {
        self.ice()?.start()
    }

    fn write(&self, data: &[u8]) -> Result<usize> {
        if self.state() != TransportState::Ready {
            return Err(Error::ErrTransportNotReady(self.transport_name().to_owned()));
        }

        let component = if !self.rtcp_mux && is_rtcp(data) {
            COMPONENT_RTCP
        } else {
            COMPONENT_RTP
        };
        let protected = self.channel.protect(data)?;
        self.ice()?.send_data(component, &protected)
    }

    fn set_remote_candidates(&self, candidates: &[Candidate]) -> Result<()> {
        self.ice()?.set_remote_candidates(candidates)
    }

    fn local_candidates(&self) -> Vec<Candidate> {
        self.ice
            .get()
            .map(|ice| ice.local_candidates())
            .unwrap_or_default()
    }

    fn local_credentials(&self) -> (String, String) {
        self.ice
            .get()
            .map(|ice| ice.local_credentials())
            .unwrap_or_default()
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("{} - closing transport", self.transport_name());
        self.channel.close();
        if let Some(ice) = self.ice.get() {
            ice.close();
        }
    }
}

impl Drop for IceTransport {
    fn drop(&mut self) {
        self.close();
    }
}

type AgentBuilder = dyn Fn(MediaKind) -> Result<Arc<dyn IceAgent>> + Send + Sync;
type ChannelBuilder = dyn Fn(MediaKind) -> Result<Arc<dyn SecureChannel>> + Send + Sync;

/// Builds `IceTransport`s from an ICE agent and a secure channel per transport.
pub struct IceTransportFactory {
    config: IceConfig,
    agents: Box<AgentBuilder>,
    channels: Box<ChannelBuilder>,
}

impl IceTransportFactory {
    pub fn new<A, C>(config: IceConfig, agents: A, channels: C) -> Self
    where
        A: Fn(MediaKind) -> Result<Arc<dyn IceAgent>> + Send + Sync + 'static,
        C: Fn(MediaKind) -> Result<Arc<dyn SecureChannel>> + Send + Sync + 'static,
    {
        IceTransportFactory {
            config,
            agents: Box::new(agents),
            channels: Box::new(channels),
        }
    }

    /// A factory whose transports skip the handshake and send media in clear.
    pub fn insecure<A>(config: IceConfig, agents: A) -> Self
    where
        A: Fn(MediaKind) -> Result<Arc<dyn IceAgent>> + Send + Sync + 'static,
    {
        Self::new(config, agents, |_| {
            Ok(Arc::new(InsecureChannel) as Arc<dyn SecureChannel>)
        })
    }
}

impl TransportFactory for IceTransportFactory {
    fn create(
        &self,
        media_kind: MediaKind,
        rtcp_mux: bool,
        listener: Weak<dyn TransportListener>,
    ) -> Result<Arc<dyn Transport>> {
        let agent = (self.agents)(media_kind)?;
        let channel = (self.channels)(media_kind)?;
        let transport = IceTransport::new(
            media_kind,
            rtcp_mux,
            agent,
            channel,
            &self.config,
            listener,
        )?;
        Ok(transport)
    }
}
