#[cfg(test)]
#[path = "header_test.rs"]
mod header_test;

use byteorder::{BigEndian, ByteOrder};
use bytes::{Buf, BufMut};
use shared::error::{Error, Result};
use shared::marshal::{Marshal, MarshalSize, Unmarshal};
use std::fmt;

/// PacketType specifies the type of an RTCP packet
/// RTCP packet types registered with IANA. See: https://www.iana.org/assignments/rtp-parameters/rtp-parameters.xhtml#rtp-parameters-4
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    #[default]
    Unsupported = 0,
    SenderReport = 200,              // RFC 3550, 6.4.1
    ReceiverReport = 201,            // RFC 3550, 6.4.2
    SourceDescription = 202,         // RFC 3550, 6.5
    Goodbye = 203,                   // RFC 3550, 6.6
    ApplicationDefined = 204,        // RFC 3550, 6.7 (unimplemented)
    TransportSpecificFeedback = 205, // RFC 4585, 6051
    PayloadSpecificFeedback = 206,   // RFC 4585, 6.3
}

/// Full Intra Request format of a payload specific feedback.
pub const FORMAT_FIR: u8 = 4;

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PacketType::Unsupported => "Unsupported",
            PacketType::SenderReport => "SR",
            PacketType::ReceiverReport => "RR",
            PacketType::SourceDescription => "SDES",
            PacketType::Goodbye => "BYE",
            PacketType::ApplicationDefined => "APP",
            PacketType::TransportSpecificFeedback => "TSFB",
            PacketType::PayloadSpecificFeedback => "PSFB",
        };
        write!(f, "{s}")
    }
}

impl From<u8> for PacketType {
    fn from(b: u8) -> Self {
        match b {
            200 => PacketType::SenderReport,
            201 => PacketType::ReceiverReport,
            202 => PacketType::SourceDescription,
            203 => PacketType::Goodbye,
            204 => PacketType::ApplicationDefined,
            205 => PacketType::TransportSpecificFeedback,
            206 => PacketType::PayloadSpecificFeedback,
            _ => PacketType::Unsupported,
        }
    }
}

pub const RTP_VERSION: u8 = 2;
pub const VERSION_SHIFT: u8 = 6;
pub const VERSION_MASK: u8 = 0x3;
pub const PADDING_SHIFT: u8 = 5;
pub const PADDING_MASK: u8 = 0x1;
pub const COUNT_SHIFT: u8 = 0;
pub const COUNT_MASK: u8 = 0x1f;

pub const HEADER_LENGTH: usize = 4;
pub const COUNT_MAX: usize = (1 << 5) - 1;
pub const SSRC_LENGTH: usize = 4;
/// Offset of the packet sender SSRC, present in every packet type the relay handles.
pub const SENDER_SSRC_OFFSET: usize = HEADER_LENGTH;
/// Offset of the media source SSRC of a feedback message.
pub const MEDIA_SSRC_OFFSET: usize = HEADER_LENGTH + SSRC_LENGTH;

/// A Header is the common header shared by all RTCP packets
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct Header {
    /// If the padding bit is set, this individual RTCP packet contains
    /// some additional padding octets at the end which are not part of
    /// the control information but are included in the length field.
    pub padding: bool,
    /// The number of reception reports, sources contained or FMT in this packet (depending on the Type)
    pub count: u8,
    /// The RTCP packet type for this packet
    pub packet_type: PacketType,
    /// The length of this RTCP packet in 32-bit words minus one,
    /// including the header and any padding.
    pub length: u16,
}

impl Header {
    /// Number of bytes this sub-report occupies in a compound packet.
    pub fn packet_length(&self) -> usize {
        (self.length as usize + 1) * 4
    }
}

/// Marshal encodes the Header in binary
impl MarshalSize for Header {
    fn marshal_size(&self) -> usize {
        HEADER_LENGTH
    }
}

impl Marshal for Header {
    fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize> {
        if self.count as usize > COUNT_MAX {
            return Err(Error::InvalidHeader);
        }
        if buf.remaining_mut() < HEADER_LENGTH {
            return Err(Error::BufferTooShort);
        }

        /*
         *  0                   1                   2                   3
         *  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * |V=2|P|    RC   |   PT=SR=200   |             length            |
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         */
        let b0 = (RTP_VERSION << VERSION_SHIFT)
            | ((self.padding as u8) << PADDING_SHIFT)
            | (self.count << COUNT_SHIFT);

        buf.put_u8(b0);
        buf.put_u8(self.packet_type as u8);
        buf.put_u16(self.length);

        Ok(HEADER_LENGTH)
    }
}

impl Unmarshal for Header {
    /// Unmarshal decodes the Header from binary
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        if raw_packet.remaining() < HEADER_LENGTH {
            return Err(Error::PacketTooShort);
        }

        let b0 = raw_packet.get_u8();
        let version = (b0 >> VERSION_SHIFT) & VERSION_MASK;
        if version != RTP_VERSION {
            return Err(Error::BadVersion);
        }

        let padding = ((b0 >> PADDING_SHIFT) & PADDING_MASK) > 0;
        let count = (b0 >> COUNT_SHIFT) & COUNT_MASK;
        let packet_type = PacketType::from(raw_packet.get_u8());
        let length = raw_packet.get_u16();

        Ok(Header {
            padding,
            count,
            packet_type,
            length,
        })
    }
}

/// Reports whether the first packet in `raw` is one the relay treats as
/// receiver feedback: receiver reports and both RFC 4585 feedback types.
pub fn is_feedback(raw: &[u8]) -> bool {
    if raw.len() < HEADER_LENGTH {
        return false;
    }
    matches!(
        PacketType::from(raw[1]),
        PacketType::ReceiverReport
            | PacketType::TransportSpecificFeedback
            | PacketType::PayloadSpecificFeedback
    )
}

pub fn sender_ssrc(raw: &[u8]) -> Result<u32> {
    if raw.len() < SENDER_SSRC_OFFSET + SSRC_LENGTH {
        return Err(Error::PacketTooShort);
    }
    Ok(BigEndian::read_u32(&raw[SENDER_SSRC_OFFSET..]))
}

pub fn set_sender_ssrc(raw: &mut [u8], ssrc: u32) -> Result<()> {
    if raw.len() < SENDER_SSRC_OFFSET + SSRC_LENGTH {
        return Err(Error::PacketTooShort);
    }
    BigEndian::write_u32(&mut raw[SENDER_SSRC_OFFSET..], ssrc);
    Ok(())
}

/// Reads the SSRC that follows the sender SSRC: the media source of a
/// feedback message, or the first report block source of a receiver report.
pub fn media_source_ssrc(raw: &[u8]) -> Result<u32> {
    if raw.len() < MEDIA_SSRC_OFFSET + SSRC_LENGTH {
        return Err(Error::PacketTooShort);
    }
    Ok(BigEndian::read_u32(&raw[MEDIA_SSRC_OFFSET..]))
}
