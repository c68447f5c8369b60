#[cfg(test)]
#[path = "red_test.rs"]
mod red_test;

use byteorder::{BigEndian, ByteOrder};
use shared::PacketBuffer;
use shared::error::{Error, Result};
use shared::marshal::MarshalSize;

use crate::header::{self, Header};

/// Payload type the relay negotiates for RED (RFC 2198) video.
pub const RED_PAYLOAD_TYPE: u8 = 116;

const RED_FOLLOW_MASK: u8 = 0x80;
const RED_PT_MASK: u8 = 0x7F;
const RED_BLOCK_LENGTH_MASK: u16 = 0x03FF;
const RED_TIMESTAMP_OFFSET_SHIFT: u32 = 10;
/// Length of a block header that is followed by another block header.
const RED_HEADER_LENGTH: usize = 4;
/// Length of the last block header, which carries only F and block PT.
const RED_PRIMARY_HEADER_LENGTH: usize = 1;

/// One redundant block header of a RED payload.
///
/// ```text
///  0                   1                    2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |F|   block PT  |  timestamp offset         |   block length    |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedBlock {
    pub payload_type: u8,
    pub timestamp_offset: u16,
    pub block_length: usize,
}

/// Result of walking the block headers of a RED payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedPayload {
    pub redundant: Vec<RedBlock>,
    /// Payload type of the final (primary) block.
    pub primary_payload_type: u8,
    /// Bytes taken by all block headers, including the 1 byte primary header.
    pub headers_length: usize,
}

impl RedPayload {
    /// Offset of the primary block data from the start of the RED payload.
    pub fn primary_offset(&self) -> usize {
        self.headers_length
            + self
                .redundant
                .iter()
                .map(|b| b.block_length)
                .sum::<usize>()
    }
}

/// Parses the chain of RED block headers at the start of `payload`.
pub fn parse_red_payload(payload: &[u8]) -> Result<RedPayload> {
    let mut redundant = vec![];
    let mut offset = 0;

    loop {
        let Some(&b0) = payload.get(offset) else {
            return Err(Error::ErrShortPacket);
        };

        if b0 & RED_FOLLOW_MASK == 0 {
            offset += RED_PRIMARY_HEADER_LENGTH;
            let red = RedPayload {
                redundant,
                primary_payload_type: b0 & RED_PT_MASK,
                headers_length: offset,
            };
            if red.primary_offset() > payload.len() {
                return Err(Error::ErrRedBlockOverflow(red.primary_offset()));
            }
            return Ok(red);
        }

        if payload.len() < offset + RED_HEADER_LENGTH {
            return Err(Error::ErrShortPacket);
        }
        let word = BigEndian::read_u32(&payload[offset..]);
        redundant.push(RedBlock {
            payload_type: b0 & RED_PT_MASK,
            timestamp_offset: ((word >> RED_TIMESTAMP_OFFSET_SHIFT) & 0x3FFF) as u16,
            block_length: (word as u16 & RED_BLOCK_LENGTH_MASK) as usize,
        });
        offset += RED_HEADER_LENGTH;
    }
}

/// Rebuilds a RED packet as a plain RTP packet carrying only the primary
/// block. The RTP header (CSRCs and extension included) is copied as is,
/// except for the payload type which becomes the primary block's type.
pub fn unwrap_red(raw: &[u8]) -> Result<PacketBuffer> {
    let header = Header::parse(raw)?;
    if header.payload_type != RED_PAYLOAD_TYPE {
        return Err(Error::ErrNotRedPayload(header.payload_type));
    }

    let header_length = header.marshal_size();
    let payload = &raw[header_length..];
    let red = parse_red_payload(payload)?;

    let mut out = PacketBuffer::with_capacity(raw.len());
    out.extend_from_slice(&raw[..header_length])?;
    out.extend_from_slice(&payload[red.primary_offset()..])?;
    header::set_payload_type(&mut out, red.primary_payload_type)?;

    Ok(out)
}
