use super::*;
use bytes::Bytes;

#[test]
fn test_header_unmarshal() {
    let tests = vec![
        (
            "valid",
            Bytes::from_static(&[
                // v=2, p=0, count=1, RR, len=7
                0x81u8, 0xc9, 0x00, 0x07,
            ]),
            Header {
                padding: false,
                count: 1,
                packet_type: PacketType::ReceiverReport,
                length: 7,
            },
            None,
        ),
        (
            "also padding",
            Bytes::from_static(&[
                // v=2, p=1, count=1, BYE, len=7
                0xa1, 0xcb, 0x00, 0x07,
            ]),
            Header {
                padding: true,
                count: 1,
                packet_type: PacketType::Goodbye,
                length: 7,
            },
            None,
        ),
        (
            "bad version",
            Bytes::from_static(&[
                // v=0, p=0, count=0, RR, len=4
                0x00, 0xc9, 0x00, 0x04,
            ]),
            Header::default(),
            Some(Error::BadVersion),
        ),
        (
            "short",
            Bytes::from_static(&[0x81, 0xc9, 0x00]),
            Header::default(),
            Some(Error::PacketTooShort),
        ),
    ];

    for (name, data, want, want_error) in tests {
        let buf = &mut data.clone();
        let got = Header::unmarshal(buf);

        assert_eq!(
            got.is_err(),
            want_error.is_some(),
            "Unmarshal {name} header: err = {got:?}, want {want_error:?}"
        );

        if let Some(err) = want_error {
            assert_eq!(got, Err(err), "Unmarshal {name} header");
        } else {
            let actual = got.unwrap();
            assert_eq!(
                actual, want,
                "Unmarshal {name} header: got {actual:?}, want {want:?}"
            );
            assert_eq!(actual.packet_length(), 32);
        }
    }
}

#[test]
fn test_header_roundtrip_psfb() -> Result<()> {
    let header = Header {
        padding: false,
        count: FORMAT_FIR,
        packet_type: PacketType::PayloadSpecificFeedback,
        length: 4,
    };

    let data = header.marshal()?;
    assert_eq!(data.as_ref(), &[0x84, 0xce, 0x00, 0x04]);

    let decoded = Header::unmarshal(&mut data.clone())?;
    assert_eq!(decoded, header);

    let too_many = Header {
        count: COUNT_MAX as u8 + 1,
        ..header
    };
    assert_eq!(too_many.marshal(), Err(Error::InvalidHeader));

    Ok(())
}

#[test]
fn test_feedback_classification() {
    let tests = vec![
        (vec![0x80, 200, 0, 6], false),
        (vec![0x81, 201, 0, 7], true),
        (vec![0x81, 202, 0, 2], false),
        (vec![0x81, 205, 0, 3], true),
        (vec![0x84, 206, 0, 4], true),
        (vec![0x84, 206, 0], false),
    ];

    for (raw, expected) in tests {
        assert_eq!(is_feedback(&raw), expected, "{raw:?}");
    }
}

#[test]
fn test_feedback_ssrc_fields() -> Result<()> {
    let mut raw = vec![
        0x81, 0xce, 0x00, 0x02, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x02,
    ];

    assert_eq!(sender_ssrc(&raw)?, 1);
    assert_eq!(media_source_ssrc(&raw)?, 2);

    set_sender_ssrc(&mut raw, 44444)?;
    assert_eq!(sender_ssrc(&raw)?, 44444);
    assert_eq!(media_source_ssrc(&raw)?, 2);

    assert_eq!(media_source_ssrc(&raw[..10]), Err(Error::PacketTooShort));

    Ok(())
}
