use super::*;

#[test]
fn test_ice_state_string() {
    let tests = vec![
        (IceState::Initial, "Initial"),
        (IceState::CandidatesGathered, "CandidatesGathered"),
        (IceState::CandidatesReceived, "CandidatesReceived"),
        (IceState::Ready, "Ready"),
        (IceState::Failed, "Failed"),
        (IceState::Finished, "Finished"),
    ];

    for (state, expected_string) in tests {
        assert_eq!(state.to_string(), expected_string);
    }
}

#[test]
fn test_ice_state_u8_conversion() {
    let states = vec![
        IceState::Initial,
        IceState::CandidatesGathered,
        IceState::CandidatesReceived,
        IceState::Ready,
        IceState::Failed,
        IceState::Finished,
    ];

    for state in states {
        assert_eq!(IceState::from(u8::from(state)), state);
    }
    assert_eq!(IceState::from(42), IceState::Initial);
}
