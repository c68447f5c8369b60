use super::*;

#[test]
fn test_basic_header() -> Result<()> {
    let raw_pkt: Vec<u8> = vec![
        0x90, 0xe0, 0x69, 0x8f, 0xd9, 0xc2, 0x93, 0xda, 0x1c, 0x64, 0x27, 0x82, 0x00, 0x01, 0x00,
        0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x98, 0x36, 0xbe, 0x88, 0x9e,
    ];

    let header = Header::parse(&raw_pkt)?;
    assert_eq!(
        header,
        Header {
            version: 2,
            padding: false,
            extension: true,
            marker: true,
            payload_type: 96,
            sequence_number: 27023,
            timestamp: 3653407706,
            ssrc: 476325762,
            csrc: vec![],
            extension_profile: 1,
            extension_length: 4,
        }
    );
    assert_eq!(header.marshal_size(), 20, "payload starts after extension");

    Ok(())
}

#[test]
fn test_header_with_csrc() -> Result<()> {
    let raw_pkt: Vec<u8> = vec![
        0x82, 0x60, 0x00, 0x01, 0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x2a, 0x00, 0x00, 0x00,
        0x01, 0x00, 0x00, 0x00, 0x02, 0xde, 0xad,
    ];

    let header = Header::parse(&raw_pkt)?;
    assert_eq!(header.csrc, vec![1, 2]);
    assert_eq!(header.ssrc, 42);
    assert_eq!(header.marshal_size(), 20);

    Ok(())
}

#[test]
fn test_header_too_short() {
    let tests = vec![
        (vec![0x80, 0x60, 0x00], Error::ErrHeaderSizeInsufficient),
        // CC=2 but no CSRC list
        (
            vec![0x82, 0x60, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1],
            Error::ErrHeaderSizeInsufficient,
        ),
        // X bit set, extension preamble missing
        (
            vec![0x90, 0x60, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1],
            Error::ErrHeaderSizeInsufficientForExtension,
        ),
        // extension declares one word, none present
        (
            vec![0x90, 0x60, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0xbe, 0xde, 0x00, 0x01],
            Error::ErrHeaderSizeInsufficientForExtension,
        ),
    ];

    for (raw, expected) in tests {
        assert_eq!(Header::parse(&raw), Err(expected), "{raw:?}");
    }
}

#[test]
fn test_ssrc_rewrite_in_place() -> Result<()> {
    let mut raw_pkt: Vec<u8> = vec![
        0x80, 0xe0, 0x69, 0x8f, 0xd9, 0xc2, 0x93, 0xda, 0x1c, 0x64, 0x27, 0x82, 0x98, 0x36,
    ];

    assert_eq!(ssrc(&raw_pkt)?, 0x1c642782);
    set_ssrc(&mut raw_pkt, 55543)?;
    assert_eq!(ssrc(&raw_pkt)?, 55543);
    assert_eq!(&raw_pkt[..8], &[0x80, 0xe0, 0x69, 0x8f, 0xd9, 0xc2, 0x93, 0xda]);
    assert_eq!(&raw_pkt[12..], &[0x98, 0x36]);

    assert_eq!(set_ssrc(&mut raw_pkt[..11], 1), Err(Error::ErrHeaderSizeInsufficient));

    Ok(())
}

#[test]
fn test_set_payload_type_keeps_marker() -> Result<()> {
    let mut raw_pkt = vec![0x80, 0xf4, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1];
    assert_eq!(payload_type(&raw_pkt)?, 116);

    set_payload_type(&mut raw_pkt, 100)?;
    assert_eq!(raw_pkt[1], 0x80 | 100);

    raw_pkt[1] = 116;
    set_payload_type(&mut raw_pkt, 100)?;
    assert_eq!(raw_pkt[1], 100);

    Ok(())
}
