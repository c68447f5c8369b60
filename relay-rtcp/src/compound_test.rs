use super::*;
use crate::header::sender_ssrc;

fn receiver_report(ssrc: u32, source: u32) -> Vec<u8> {
    let mut raw = vec![0x81, 0xc9, 0x00, 0x07];
    raw.extend_from_slice(&ssrc.to_be_bytes());
    raw.extend_from_slice(&source.to_be_bytes());
    raw.extend_from_slice(&[0u8; 20]);
    raw
}

fn picture_loss(ssrc: u32, media: u32) -> Vec<u8> {
    let mut raw = vec![0x81, 0xce, 0x00, 0x02];
    raw.extend_from_slice(&ssrc.to_be_bytes());
    raw.extend_from_slice(&media.to_be_bytes());
    raw
}

fn full_intra_request(ssrc: u32, media: u32, seq: u8) -> Vec<u8> {
    let mut raw = vec![0x84, 0xce, 0x00, 0x04];
    raw.extend_from_slice(&ssrc.to_be_bytes());
    raw.extend_from_slice(&[0, 0, 0, 0]);
    raw.extend_from_slice(&media.to_be_bytes());
    raw.extend_from_slice(&[seq, 0, 0, 0]);
    raw
}

#[test]
fn test_rewrite_compound_every_sub_report() -> Result<()> {
    let rr = receiver_report(0x1111, 0x2222);
    let pli = picture_loss(0x1111, 0x2222);

    let mut raw = rr.clone();
    raw.extend_from_slice(&pli);

    let summary = rewrite_compound(&mut raw, 55543)?;
    assert_eq!(
        summary,
        CompoundRewrite {
            reports: 2,
            fir_requests: 0,
        }
    );

    assert_eq!(sender_ssrc(&raw)?, 55543);
    assert_eq!(sender_ssrc(&raw[rr.len()..])?, 55543);
    // media source fields are left alone
    assert_eq!(&raw[8..12], &0x2222u32.to_be_bytes());
    assert_eq!(&raw[rr.len() + 8..rr.len() + 12], &0x2222u32.to_be_bytes());

    Ok(())
}

#[test]
fn test_rewrite_compound_detects_fir() -> Result<()> {
    let mut raw = receiver_report(1, 2);
    raw.extend_from_slice(&full_intra_request(1, 2, 7));

    let summary = rewrite_compound(&mut raw, 44444)?;
    assert_eq!(summary.reports, 2);
    assert_eq!(summary.fir_requests, 1);

    let mut pli_only = picture_loss(1, 2);
    assert_eq!(rewrite_compound(&mut pli_only, 44444)?.fir_requests, 0);

    Ok(())
}

#[test]
fn test_rewrite_compound_truncated() {
    let mut raw = receiver_report(1, 2);
    let mut truncated = picture_loss(1, 2);
    truncated.truncate(10);
    raw.extend_from_slice(&truncated);

    assert_eq!(rewrite_compound(&mut raw, 9), Err(Error::PacketTooShort));
    assert_eq!(
        &raw[4..8],
        &9u32.to_be_bytes(),
        "sub-reports before the truncated one are rewritten"
    );

    // declared length runs past the buffer
    let mut overlong = vec![0x81, 0xc9, 0x00, 0x07, 0, 0, 0, 1, 0, 0, 0, 2];
    assert_eq!(rewrite_compound(&mut overlong, 9), Err(Error::PacketTooShort));
    assert_eq!(&overlong[4..8], &[0, 0, 0, 1], "nothing written on failure");

    // header only, no room for an SSRC
    let mut header_only = vec![0x80, 0xcb, 0x00, 0x00];
    assert_eq!(
        rewrite_compound(&mut header_only, 9),
        Err(Error::PacketTooShort)
    );
}

#[test]
fn test_strip_fir() -> Result<()> {
    let rr = receiver_report(1, 2);
    let pli = picture_loss(1, 2);
    let fir = full_intra_request(1, 2, 7);

    let tests = vec![
        (fir.clone(), vec![]),
        ([rr.clone(), fir.clone()].concat(), rr.clone()),
        ([fir.clone(), pli.clone(), fir.clone()].concat(), pli.clone()),
        ([rr.clone(), pli.clone()].concat(), [rr.clone(), pli.clone()].concat()),
    ];

    for (raw, expected) in tests {
        assert_eq!(&strip_fir(&raw)?[..], &expected[..]);
    }

    let mut truncated = fir.clone();
    truncated.truncate(12);
    assert_eq!(strip_fir(&truncated), Err(Error::PacketTooShort));

    Ok(())
}
