// Path: crates/ipc/src/tests.rs

use crate::common::{
    signature_policy, Envelope, HeaderType, NOutOf, PolicyType, SignaturePolicy, Status,
};
use crate::msp::SerializedIdentity;
use crate::orderer::{deliver_response, seek_position, DeliverResponse, SeekPosition, SeekSpecified};
use crate::Message;

#[test]
fn serialized_identity_wire_layout() {
    let identity = SerializedIdentity {
        mspid: "Org1".into(),
        id_bytes: b"cert".to_vec(),
    };
    assert_eq!(
        identity.encode_to_vec(),
        vec![0x0a, 0x04, b'O', b'r', b'g', b'1', 0x12, 0x04, b'c', b'e', b'r', b't']
    );
}

#[test]
fn nested_signature_policy_decodes() {
    let policy = SignaturePolicy {
        r#type: Some(signature_policy::Type::NOutOf(NOutOf {
            n: 1,
            rules: vec![
                SignaturePolicy {
                    r#type: Some(signature_policy::Type::SignedBy(0)),
                },
                SignaturePolicy {
                    r#type: Some(signature_policy::Type::SignedBy(1)),
                },
            ],
        })),
    };
    let decoded = SignaturePolicy::decode(policy.encode_to_vec().as_slice()).unwrap();
    assert_eq!(decoded, policy);
}

#[test]
fn deliver_status_and_seek_position_decode() {
    let status = DeliverResponse {
        r#type: Some(deliver_response::Type::Status(404)),
    };
    let decoded = DeliverResponse::decode(status.encode_to_vec().as_slice()).unwrap();
    assert!(matches!(decoded.r#type, Some(deliver_response::Type::Status(404))));

    let position = SeekPosition {
        r#type: Some(seek_position::Type::Specified(SeekSpecified { number: 7 })),
    };
    assert_eq!(position.encode_to_vec(), vec![0x1a, 0x02, 0x08, 0x07]);
}

#[test]
fn empty_envelope_encodes_to_nothing() {
    assert!(Envelope::default().encode_to_vec().is_empty());
    assert!(Envelope::decode(&b"\xff"[..]).is_err());
}

#[test]
fn generated_enums_keep_wire_names_and_values() {
    assert_eq!(PolicyType::Signature as i32, 1);
    assert_eq!(PolicyType::ImplicitMeta as i32, 3);
    assert_eq!(
        PolicyType::ImplicitMeta.as_str_name(),
        "POLICY_TYPE_IMPLICIT_META"
    );
    assert_eq!(Status::from_str_name("SUCCESS"), Some(Status::Success));
    assert_eq!(Status::Success as i32, 200);
    assert_eq!(HeaderType::EndorserTransaction as i32, 3);
}
