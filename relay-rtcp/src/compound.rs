#[cfg(test)]
#[path = "compound_test.rs"]
mod compound_test;

use bytes::BytesMut;
use shared::error::{Error, Result};
use shared::marshal::Unmarshal;

use crate::header::{self, FORMAT_FIR, Header, PacketType, SENDER_SSRC_OFFSET, SSRC_LENGTH};

/// Summary of a compound packet walk.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CompoundRewrite {
    /// Number of sub-reports whose sender SSRC was rewritten.
    pub reports: usize,
    /// Number of Full Intra Requests found in the compound packet.
    pub fir_requests: usize,
}

/// Walks every packet of a compound RTCP packet, stamping `ssrc` as the
/// sender SSRC of each one and counting Full Intra Requests.
///
/// Each sub-report is validated against the remaining buffer before it is
/// touched; a truncated sub-report stops the walk with `PacketTooShort`,
/// leaving earlier sub-reports rewritten.
pub fn rewrite_compound(raw: &mut [u8], ssrc: u32) -> Result<CompoundRewrite> {
    let mut summary = CompoundRewrite::default();
    let mut offset = 0;

    while offset < raw.len() {
        let sub = &mut raw[offset..];
        if sub.len() < SENDER_SSRC_OFFSET + SSRC_LENGTH {
            return Err(Error::PacketTooShort);
        }

        let h = Header::unmarshal(&mut &sub[..])?;
        let packet_length = h.packet_length();
        if packet_length > sub.len() || packet_length < SENDER_SSRC_OFFSET + SSRC_LENGTH {
            return Err(Error::PacketTooShort);
        }

        header::set_sender_ssrc(sub, ssrc)?;
        summary.reports += 1;

        if is_fir(&h) {
            summary.fir_requests += 1;
        }

        offset += packet_length;
    }

    Ok(summary)
}

/// Copies a compound RTCP packet without its Full Intra Requests. The result
/// is empty when the packet held nothing else.
pub fn strip_fir(raw: &[u8]) -> Result<BytesMut> {
    let mut stripped = BytesMut::with_capacity(raw.len());
    let mut offset = 0;

    while offset < raw.len() {
        let sub = &raw[offset..];
        let h = Header::unmarshal(&mut &sub[..])?;
        let packet_length = h.packet_length();
        if packet_length > sub.len() {
            return Err(Error::PacketTooShort);
        }

        if !is_fir(&h) {
            stripped.extend_from_slice(&sub[..packet_length]);
        }
        offset += packet_length;
    }

    Ok(stripped)
}

fn is_fir(h: &Header) -> bool {
    h.packet_type == PacketType::PayloadSpecificFeedback && h.count == FORMAT_FIR
}
