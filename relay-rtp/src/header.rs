#[cfg(test)]
#[path = "header_test.rs"]
mod header_test;

use byteorder::{BigEndian, ByteOrder};
use bytes::Buf;
use shared::error::{Error, Result};
use shared::marshal::{MarshalSize, Unmarshal};

pub const HEADER_LENGTH: usize = 12;
pub const VERSION_SHIFT: u8 = 6;
pub const VERSION_MASK: u8 = 0x3;
pub const PADDING_SHIFT: u8 = 5;
pub const PADDING_MASK: u8 = 0x1;
pub const EXTENSION_SHIFT: u8 = 4;
pub const EXTENSION_MASK: u8 = 0x1;
pub const CC_MASK: u8 = 0xF;
pub const MARKER_SHIFT: u8 = 7;
pub const MARKER_MASK: u8 = 0x1;
pub const PT_MASK: u8 = 0x7F;
pub const SEQ_NUM_OFFSET: usize = 2;
pub const TIMESTAMP_OFFSET: usize = 4;
pub const SSRC_OFFSET: usize = 8;
pub const CSRC_OFFSET: usize = 12;
pub const CSRC_LENGTH: usize = 4;
pub const EXTENSION_HEADER_LENGTH: usize = 4;

/// Header represents the fixed RTP header plus CSRC list and the shape of
/// any header extension. Extension bytes are not copied; the relay only needs
/// to know where the payload starts.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub padding: bool,
    pub extension: bool,
    pub marker: bool,
    pub payload_type: u8,
    pub sequence_number: u16,
    pub timestamp: u32,
    pub ssrc: u32,
    pub csrc: Vec<u32>,
    pub extension_profile: u16,
    /// Length of the extension body in bytes, excluding its 4 byte preamble.
    pub extension_length: usize,
}

impl MarshalSize for Header {
    /// Size of the header on the wire, which is also the payload offset.
    fn marshal_size(&self) -> usize {
        let mut head_size = HEADER_LENGTH + self.csrc.len() * CSRC_LENGTH;
        if self.extension {
            head_size += EXTENSION_HEADER_LENGTH + self.extension_length;
        }
        head_size
    }
}

impl Unmarshal for Header {
    /// Unmarshal parses the passed byte slice and stores the result in the Header.
    /// It returns the number of bytes read n and any error.
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        let raw_packet_len = raw_packet.remaining();
        if raw_packet_len < HEADER_LENGTH {
            return Err(Error::ErrHeaderSizeInsufficient);
        }
        /*
         *  0                   1                   2                   3
         *  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * |V=2|P|X|  CC   |M|     PT      |       sequence number         |
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * |                           timestamp                           |
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * |           synchronization source (SSRC) identifier            |
         * +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
         * |            contributing source (CSRC) identifiers             |
         * |                             ....                              |
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         */
        let b0 = raw_packet.get_u8();
        let version = b0 >> VERSION_SHIFT & VERSION_MASK;
        let padding = (b0 >> PADDING_SHIFT & PADDING_MASK) > 0;
        let extension = (b0 >> EXTENSION_SHIFT & EXTENSION_MASK) > 0;
        let cc = (b0 & CC_MASK) as usize;

        let mut curr_offset = CSRC_OFFSET + (cc * CSRC_LENGTH);
        if raw_packet_len < curr_offset {
            return Err(Error::ErrHeaderSizeInsufficient);
        }

        let b1 = raw_packet.get_u8();
        let marker = (b1 >> MARKER_SHIFT & MARKER_MASK) > 0;
        let payload_type = b1 & PT_MASK;

        let sequence_number = raw_packet.get_u16();
        let timestamp = raw_packet.get_u32();
        let ssrc = raw_packet.get_u32();

        let mut csrc = Vec::with_capacity(cc);
        for _ in 0..cc {
            csrc.push(raw_packet.get_u32());
        }

        let (extension_profile, extension_length) = if extension {
            if raw_packet_len < curr_offset + EXTENSION_HEADER_LENGTH {
                return Err(Error::ErrHeaderSizeInsufficientForExtension);
            }
            let extension_profile = raw_packet.get_u16();
            let extension_length = raw_packet.get_u16() as usize * 4;
            curr_offset += EXTENSION_HEADER_LENGTH + extension_length;

            if raw_packet_len < curr_offset {
                return Err(Error::ErrHeaderSizeInsufficientForExtension);
            }
            raw_packet.advance(extension_length);
            (extension_profile, extension_length)
        } else {
            (0, 0)
        };

        Ok(Header {
            version,
            padding,
            extension,
            marker,
            payload_type,
            sequence_number,
            timestamp,
            ssrc,
            csrc,
            extension_profile,
            extension_length,
        })
    }
}

impl Header {
    /// Parses the header at the start of `raw` without consuming it.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let mut reader = raw;
        Header::unmarshal(&mut reader)
    }
}

/// Reads the SSRC field of the RTP packet in `raw`.
pub fn ssrc(raw: &[u8]) -> Result<u32> {
    if raw.len() < HEADER_LENGTH {
        return Err(Error::ErrHeaderSizeInsufficient);
    }
    Ok(BigEndian::read_u32(&raw[SSRC_OFFSET..]))
}

/// Overwrites the SSRC field of the RTP packet in `raw`.
pub fn set_ssrc(raw: &mut [u8], ssrc: u32) -> Result<()> {
    if raw.len() < HEADER_LENGTH {
        return Err(Error::ErrHeaderSizeInsufficient);
    }
    BigEndian::write_u32(&mut raw[SSRC_OFFSET..], ssrc);
    Ok(())
}

pub fn payload_type(raw: &[u8]) -> Result<u8> {
    if raw.len() < HEADER_LENGTH {
        return Err(Error::ErrHeaderSizeInsufficient);
    }
    Ok(raw[1] & PT_MASK)
}

/// Overwrites the payload type, keeping the marker bit.
pub fn set_payload_type(raw: &mut [u8], payload_type: u8) -> Result<()> {
    if raw.len() < HEADER_LENGTH {
        return Err(Error::ErrHeaderSizeInsufficient);
    }
    raw[1] = (raw[1] & (MARKER_MASK << MARKER_SHIFT)) | (payload_type & PT_MASK);
    Ok(())
}
