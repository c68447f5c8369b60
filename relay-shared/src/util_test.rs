use super::*;

const RUNES_ALPHA: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

#[test]
fn test_classify() {
    let tests = vec![
        (vec![], PacketClass::Unknown),
        (vec![0x00, 0x01, 0x00, 0x00], PacketClass::Stun),
        (vec![0x16, 0xfe, 0xfd, 0x00], PacketClass::Dtls),
        // payload type 96
        (vec![0x80, 0x60, 0x00, 0x01], PacketClass::Rtp),
        // marker bit set, payload type 116
        (vec![0x80, 0xf4, 0x00, 0x01], PacketClass::Rtp),
        // sender report
        (vec![0x80, 0xc8, 0x00, 0x06], PacketClass::Rtcp),
        // payload specific feedback, FIR
        (vec![0x84, 0xce, 0x00, 0x04], PacketClass::Rtcp),
        (vec![0x40, 0x00, 0x00, 0x00], PacketClass::Unknown),
    ];

    for (buf, expected) in tests {
        assert_eq!(classify(&buf), expected, "classify {buf:?}");
        assert_eq!(match_dtls(&buf), expected == PacketClass::Dtls);
        assert_eq!(
            match_srtp_or_srtcp(&buf),
            matches!(expected, PacketClass::Rtp | PacketClass::Rtcp)
        );
    }
}

#[test]
fn test_is_rtcp_short_buffer() {
    assert!(!is_rtcp(&[]));
    assert!(!is_rtcp(&[0x80, 0xc8, 0x00]));
}

#[test]
fn test_random_generator_collision() {
    const N: usize = 10;
    const ITERATION: usize = 100;

    let mut rands = Vec::with_capacity(ITERATION);
    for _ in 0..ITERATION {
        let r = generate_crypto_random_string(N, RUNES_ALPHA);
        assert_eq!(r.len(), N);
        assert!(r.bytes().all(|b| b.is_ascii_alphabetic()));
        rands.push(r);
    }

    for i in 0..ITERATION {
        for j in i + 1..ITERATION {
            assert_ne!(rands[i], rands[j], "generated same value: {}", rands[i]);
        }
    }
}
