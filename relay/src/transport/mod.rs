
pub mod ice_transport;
pub mod secure_channel;

use ice::Candidate;
use log::trace;
use shared::MediaKind;
use shared::error::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, Weak};

use crate::pipeline::{OutboundPacket, PacketWriter};
use crate::state::TransportState;

pub use ice_transport::{IceTransport, IceTransportFactory};
pub use secure_channel::{HandshakeLink, InsecureChannel, SecureChannel};

/// A media path to the remote peer: one ICE stream with a secure channel on
/// top of it.
pub trait Transport: Send + Sync {
    fn media_kind(&self) -> MediaKind;
    /// `audio` or `video`; also the mid used in signaling.
    fn transport_name(&self) -> &str;
    fn state(&self) -> TransportState;

    /// Starts gathering and, once connected, the secure channel handshake.
    fn start(&self) -> Result<()>;

    /// Protects and sends one RTP or RTCP packet.
    fn write(&self, data: &[u8]) -> Result<usize>;

    fn set_remote_candidates(&self, candidates: &[Candidate]) -> Result<()>;
    fn local_candidates(&self) -> Vec<Candidate>;
    /// Returns `(ufrag, pwd)`.
    fn local_credentials(&self) -> (String, String);

    fn close(&self);
}

/// Receives what a transport observes. Implemented by the connection.
pub trait TransportListener: Send + Sync {
    /// Decrypted RTP or RTCP. The buffer may be rewritten in place.
    fn on_transport_data(&self, data: &mut [u8], transport: &dyn Transport);
    fn update_state(&self, state: TransportState, transport: &dyn Transport);
    fn on_candidate(&self, candidate: &Candidate, transport: &dyn Transport);
}

/// Builds the transports of a connection once the remote description is known.
pub trait TransportFactory: Send + Sync {
    fn create(
        &self,
        media_kind: MediaKind,
        rtcp_mux: bool,
        listener: Weak<dyn TransportListener>,
    ) -> Result<Arc<dyn Transport>>;
}

/// The audio and video transports of one connection. In bundle mode only the
/// video slot is used and carries both kinds.
#[derive(Default)]
pub struct TransportSet {
    audio: RwLock<Option<Arc<dyn Transport>>>,
    video: RwLock<Option<Arc<dyn Transport>>>,
    bundle: AtomicBool,
}

impl TransportSet {
    pub fn new() -> Self {
        TransportSet::default()
    }

    pub fn is_bundle(&self) -> bool {
        self.bundle.load(Ordering::SeqCst)
    }

    pub fn set_bundle(&self, bundle: bool) {
        self.bundle.store(bundle, Ordering::SeqCst);
    }

    pub fn get(&self, media_kind: MediaKind) -> Option<Arc<dyn Transport>> {
        let slot = match media_kind {
            MediaKind::Audio => &self.audio,
            MediaKind::Video => &self.video,
        };
        slot.read().ok().and_then(|t| t.clone())
    }

    pub fn audio(&self) -> Option<Arc<dyn Transport>> {
        self.get(MediaKind::Audio)
    }

    pub fn video(&self) -> Option<Arc<dyn Transport>> {
        self.get(MediaKind::Video)
    }

    pub fn insert(&self, media_kind: MediaKind, transport: Arc<dyn Transport>) -> Result<()> {
        let slot = match media_kind {
            MediaKind::Audio => &self.audio,
            MediaKind::Video => &self.video,
        };
        *slot.write()? = Some(transport);
        Ok(())
    }

    /// Transport that carries `media_kind` on the wire.
    pub fn route(&self, media_kind: MediaKind) -> Option<Arc<dyn Transport>> {
        if self.is_bundle() {
            self.video()
        } else {
            self.get(media_kind)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.audio().is_none() && self.video().is_none()
    }

    /// Reports whether `transport` is the shared transport of a bundled session.
    pub fn is_bundle_transport(&self, transport: &dyn Transport) -> bool {
        self.is_bundle()
            && self
                .video()
                .is_some_and(|video| {
                    std::ptr::addr_eq(Arc::as_ptr(&video), transport as *const dyn Transport)
                })
    }

    /// Current state of every transport the connection needs: video when
    /// present, audio when present and not bundled.
    pub fn required_states(&self) -> Vec<TransportState> {
        let mut states = vec![];
        if let Some(video) = self.video() {
            states.push(video.state());
        }
        if !self.is_bundle() {
            if let Some(audio) = self.audio() {
                states.push(audio.state());
            }
        }
        states
    }

    /// Empties both slots, returning what they held.
    pub fn take_all(&self) -> Vec<Arc<dyn Transport>> {
        let mut taken = vec![];
        for slot in [&self.video, &self.audio] {
            if let Ok(mut t) = slot.write() {
                if let Some(t) = t.take() {
                    taken.push(t);
                }
            }
        }
        taken
    }
}

impl PacketWriter for TransportSet {
    fn write_packet(&self, packet: &OutboundPacket) -> Result<usize> {
        let transport = if self.is_bundle() || packet.media_kind == MediaKind::Video {
            self.video()
        } else {
            self.audio()
        };
        let Some(transport) = transport else {
            trace!("no transport for {} packet", packet.media_kind);
            return Err(Error::ErrNoTransport(packet.media_kind.to_string()));
        };
        transport.write(&packet.data)
    }
}
