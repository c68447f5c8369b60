use bytes::{Bytes, BytesMut};
use log::{debug, warn};
use shared::error::{Error, Result};
use std::sync::Weak;

use super::ice_transport::IceTransport;

/// Cryptographic layer of a transport (DTLS-SRTP in a full deployment).
///
/// The channel sees every DTLS record received on the transport and reports
/// the outcome of its handshake through the `HandshakeLink` given to `start`.
/// Media only flows after the handshake completed.
pub trait SecureChannel: Send + Sync {
    /// Begins the handshake. Called once ICE is Ready.
    fn start(&self, link: HandshakeLink) -> Result<()>;

    /// Feeds a handshake record received from the peer.
    fn handle_handshake(&self, data: &[u8]) -> Result<()>;

    /// Encrypts an outbound RTP or RTCP packet.
    fn protect(&self, packet: &[u8]) -> Result<Bytes>;

    /// Decrypts an inbound SRTP or SRTCP packet.
    fn unprotect(&self, packet: &[u8]) -> Result<BytesMut>;

    fn close(&self) {}
}

/// What a `SecureChannel` may do with the transport it runs on.
#[derive(Clone)]
pub struct HandshakeLink {
    transport: Weak<IceTransport>,
}

impl HandshakeLink {
    pub(crate) fn new(transport: Weak<IceTransport>) -> Self {
        HandshakeLink { transport }
    }

    /// Sends a handshake record to the peer, bypassing protection.
    pub fn send(&self, data: &[u8]) -> Result<usize> {
        let transport = self.transport.upgrade().ok_or(Error::ErrConnectionClosed)?;
        transport.send_handshake(data)
    }

    /// Marks the transport Ready.
    pub fn complete(&self) {
        if let Some(transport) = self.transport.upgrade() {
            transport.on_secure_channel_ready();
        }
    }

    /// Marks the transport Failed.
    pub fn fail(&self, reason: &str) {
        if let Some(transport) = self.transport.upgrade() {
            transport.on_secure_channel_failed(reason);
        }
    }
}

/// Pass-through channel: completes immediately and leaves packets untouched.
/// Useful for loopback testing and for peers that terminate crypto elsewhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct InsecureChannel;

impl SecureChannel for InsecureChannel {
    fn start(&self, link: HandshakeLink) -> Result<()> {
        debug!("insecure channel: skipping handshake");
        link.complete();
        Ok(())
    }

    fn handle_handshake(&self, data: &[u8]) -> Result<()> {
        warn!("insecure channel: ignoring {} bytes of handshake", data.len());
        Ok(())
    }

    fn protect(&self, packet: &[u8]) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(packet))
    }

    fn unprotect(&self, packet: &[u8]) -> Result<BytesMut> {
        Ok(BytesMut::from(packet))
    }
}
