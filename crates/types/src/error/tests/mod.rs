// Path: crates/types/src/error/tests/mod.rs
use super::*;

#[test]
fn transport_errors_synthesize_status_codes() {
    let timeout = TransportError::Timeout {
        url: "grpcs://peer0:7051".into(),
        timeout_ms: 3000,
    };
    assert_eq!(timeout.status(), status::DEADLINE_EXCEEDED);
    assert_eq!(timeout.url(), Some("grpcs://peer0:7051"));

    let conn = TransportError::Connection {
        url: "grpcs://peer0:7051".into(),
        message: "tcp connect error".into(),
    };
    assert_eq!(conn.status(), status::UNAVAILABLE);
    assert_eq!(conn.message(), "tcp connect error");
}

#[test]
fn sdk_error_delegates_codes_and_status() {
    let err: SdkError = LedgerError::LiarSuccess {
        peer: "peer0".into(),
        code: 7,
        message: "identity is not an admin".into(),
    }
    .into();
    assert_eq!(err.code(), "LEDGER_LIAR_SUCCESS");
    assert_eq!(err.status(), 7);

    let err: SdkError = ValidationError::MissingField("msp_id").into();
    assert_eq!(err.code(), "VALIDATION_MISSING_FIELD");
    assert_eq!(err.status(), status::INVALID_ARGUMENT);
}

#[test]
fn partial_endorsement_display_lists_each_peer() {
    let err = PartialEndorsementError {
        failures: vec![EndorsementFailure {
            peer: "peer2".into(),
            status: 14,
            message: "unavailable".into(),
        }],
    };
    assert_eq!(err.len(), 1);
    assert_eq!(
        err.to_string(),
        "1 endorsing peer(s) failed: peer2 (14): unavailable"
    );
}
