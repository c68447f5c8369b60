#[cfg(test)]
#[path = "fir_test.rs"]
mod fir_test;

use bytes::{Buf, BufMut};
use shared::error::{Error, Result};
use shared::marshal::{Marshal, MarshalSize, Unmarshal};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::header::{FORMAT_FIR, HEADER_LENGTH, Header, PacketType, SSRC_LENGTH};

const FIR_ENTRY_LENGTH: usize = 8;
const FIR_LENGTH: usize = HEADER_LENGTH + 2 * SSRC_LENGTH + FIR_ENTRY_LENGTH;

/// A FullIntraRequest (FIR) asks the media sender to emit a full keyframe
/// (RFC 5104, 4.3.1). The relay only ever builds requests with a single
/// FCI entry addressed to one media source.
#[derive(Debug, PartialEq, Eq, Default, Clone)]
pub struct FullIntraRequest {
    pub sender_ssrc: u32,
    /// SSRC the request targets, carried in the FCI entry.
    pub media_ssrc: u32,
    pub sequence_number: u8,
}

impl fmt::Display for FullIntraRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FullIntraRequest {:x} -> {:x} seq = {}",
            self.sender_ssrc, self.media_ssrc, self.sequence_number
        )
    }
}

impl FullIntraRequest {
    fn header(&self) -> Header {
        Header {
            padding: false,
            count: FORMAT_FIR,
            packet_type: PacketType::PayloadSpecificFeedback,
            length: ((self.marshal_size() / 4) - 1) as u16,
        }
    }
}

impl MarshalSize for FullIntraRequest {
    fn marshal_size(&self) -> usize {
        FIR_LENGTH
    }
}

impl Marshal for FullIntraRequest {
    /// Marshal encodes the FullIntraRequest
    fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize> {
        if buf.remaining_mut() < self.marshal_size() {
            return Err(Error::BufferTooShort);
        }

        let h = self.header();
        let n = h.marshal_to(buf)?;
        buf = &mut buf[n..];

        buf.put_u32(self.sender_ssrc);
        // media source field is unused by FIR (RFC 5104, 4.3.1.2)
        buf.put_u32(0);

        buf.put_u32(self.media_ssrc);
        buf.put_u8(self.sequence_number);
        buf.put_u8(0);
        buf.put_u16(0);

        Ok(self.marshal_size())
    }
}

impl Unmarshal for FullIntraRequest {
    /// Unmarshal decodes the FullIntraRequest
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        let raw_packet_len = raw_packet.remaining();
        if raw_packet_len < FIR_LENGTH {
            return Err(Error::PacketTooShort);
        }

        let h = Header::unmarshal(raw_packet)?;
        if h.packet_type != PacketType::PayloadSpecificFeedback || h.count != FORMAT_FIR {
            return Err(Error::WrongType);
        }
        if h.packet_length() < FIR_LENGTH || h.packet_length() > raw_packet_len {
            return Err(Error::PacketTooShort);
        }

        let sender_ssrc = raw_packet.get_u32();
        let _media_source = raw_packet.get_u32();
        let media_ssrc = raw_packet.get_u32();
        let sequence_number = raw_packet.get_u8();
        raw_packet.advance(3);

        Ok(FullIntraRequest {
            sender_ssrc,
            media_ssrc,
            sequence_number,
        })
    }
}

/// Command sequence number shared by every FIR a connection emits.
/// Incremented before use so the first request carries 1; wraps at 255.
#[derive(Debug, Default)]
pub struct FirSequence(AtomicU8);

impl FirSequence {
    pub fn new() -> Self {
        FirSequence::default()
    }

    /// Advances the counter and returns the value to stamp on the next request.
    pub fn next(&self) -> u8 {
        self.0.fetch_add(1, Ordering::SeqCst).wrapping_add(1)
    }

    pub fn current(&self) -> u8 {
        self.0.load(Ordering::SeqCst)
    }
}
