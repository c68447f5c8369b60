#[cfg(test)]
#[path = "util_test.rs"]
mod util_test;

use rand::{Rng, rng};
use std::ops::RangeInclusive;

/// First-byte ranges of RFC 7983, section 7.
const STUN_RANGE: RangeInclusive<u8> = 0..=3;
const DTLS_RANGE: RangeInclusive<u8> = 20..=63;
const RTP_RANGE: RangeInclusive<u8> = 128..=191;
/// Second-byte range of RTCP packet types on a muxed port (RFC 5761, 4).
const RTCP_TYPE_RANGE: RangeInclusive<u8> = 192..=223;

/// What arrived on an ICE component, judged from its first bytes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PacketClass {
    Stun,
    Dtls,
    Rtp,
    Rtcp,
    Unknown,
}

/// Demultiplexes a datagram received on a shared ICE component.
pub fn classify(buf: &[u8]) -> PacketClass {
    let Some(b0) = buf.first() else {
        return PacketClass::Unknown;
    };
    if STUN_RANGE.contains(b0) {
        PacketClass::Stun
    } else if DTLS_RANGE.contains(b0) {
        PacketClass::Dtls
    } else if RTP_RANGE.contains(b0) {
        if is_rtcp(buf) {
            PacketClass::Rtcp
        } else {
            PacketClass::Rtp
        }
    } else {
        PacketClass::Unknown
    }
}

pub fn match_dtls(buf: &[u8]) -> bool {
    classify(buf) == PacketClass::Dtls
}

/// Matches RTP and RTCP, encrypted or not.
pub fn match_srtp_or_srtcp(buf: &[u8]) -> bool {
    matches!(classify(buf), PacketClass::Rtp | PacketClass::Rtcp)
}

/// Reports whether `buf` carries RTCP rather than RTP. Buffers shorter than
/// an RTCP header never do.
pub fn is_rtcp(buf: &[u8]) -> bool {
    buf.len() >= 4 && RTCP_TYPE_RANGE.contains(&buf[1])
}

/// Draws `n` characters uniformly from `alphabet` using the thread-local
/// CSPRNG.
pub fn generate_crypto_random_string(n: usize, alphabet: &[u8]) -> String {
    let mut rng = rng();
    (0..n)
        .map(|_| char::from(alphabet[rng.random_range(0..alphabet.len())]))
        .collect()
}
