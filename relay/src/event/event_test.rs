use super::*;

#[test]
fn test_candidate_message_json() -> Result<()> {
    let tests = vec![
        (
            "audio",
            "candidate:1 1 udp 2130706431 192.168.1.10 50000 typ host generation 0",
            r#"{"sdpMid":"audio","candidate":"candidate:1 1 udp 2130706431 192.168.1.10 50000 typ host generation 0"}"#,
        ),
        (
            "video",
            r#"odd "quoted" line"#,
            r#"{"sdpMid":"video","candidate":"odd \"quoted\" line"}"#,
        ),
    ];

    for (mid, line, expected) in tests {
        let json = CandidateMessage::new(mid, line).to_json()?;
        assert_eq!(json, expected);

        let parsed: CandidateMessage =
            serde_json::from_str(&json).map_err(Error::from_std)?;
        assert_eq!(parsed.sdp_mid, mid);
        assert_eq!(parsed.candidate, line);
    }

    Ok(())
}

#[test]
fn test_connection_event_from_state() {
    let tests = vec![
        (ConnectionState::Initial, ConnectionEvent::Initial),
        (ConnectionState::Started, ConnectionEvent::Started),
        (ConnectionState::Ready, ConnectionEvent::Ready),
        (ConnectionState::Failed, ConnectionEvent::Failed),
        (ConnectionState::Finished, ConnectionEvent::Finished),
    ];

    for (state, event) in tests {
        assert_eq!(ConnectionEvent::from(state), event);
        assert_eq!(event.to_string(), state.to_string());
    }
}
