// Path: crates/crypto/src/sign/ecdsa/tests/mod.rs
use super::*;
use crate::der::cert::parse_certificate;
use crate::sign::canonical::{flip_s, is_low_s};
use crate::sign::x509::{issue_leaf, self_signed_root};
use crate::der::oid;
use crate::der::san::GeneralName;
use crate::trust::{find_trusted_root, is_trusted_root, verify_issued_by};

#[test]
fn p256_signature_verifies_through_der() {
    let key = PrivateKeyHandle::generate(Curve::P256);
    let message: Vec<u8> = (0u8..8).collect();

    let der = sign_to_der(&key, &message).unwrap();
    let signature = der_to_signature(&der).unwrap();
    let public = key.public_key().unwrap();
    assert!(verify(&public, &signature, &message).unwrap());
    assert!(!verify(&public, &signature, b"another message").unwrap());
}

#[test]
fn every_curve_emits_low_s() {
    for curve in Curve::ALL {
        let key = PrivateKeyHandle::generate(curve);
        for i in 0u8..16 {
            let signature = sign(&key, &[i; 40]).unwrap();
            assert!(is_low_s(&signature, curve), "{curve} produced high-S");
            assert!(key.public_key().unwrap().verify(&[i; 40], &signature).unwrap());
        }
    }
}

#[test]
fn der_round_trip_matches_canonical_form() {
    let key = PrivateKeyHandle::generate(Curve::P384);
    let signature = key.sign(b"payload").unwrap();
    let high = flip_s(&signature, Curve::P384);
    assert!(!is_low_s(&high, Curve::P384));

    let decoded = der_to_signature(&signature_to_der(&high, Curve::P384)).unwrap();
    assert_eq!(decoded, canonicalize(&high, Curve::P384));
    assert_eq!(decoded, signature);
}

#[test]
fn imported_key_signs_like_the_original() {
    for curve in Curve::ALL {
        let key = PrivateKeyHandle::generate(curve);
        let pem = export_private_pem(&key).unwrap();
        let KeyHandle::Private(imported) = pem_to_key_handle(&pem).unwrap() else {
            panic!("expected a private handle");
        };
        let signature = imported.sign(b"tx").unwrap();
        assert!(key.public_key().unwrap().verify(b"tx", &signature).unwrap());

        let public_pem = export_public_pem(&key.public_key().unwrap()).unwrap();
        let KeyHandle::Public(public) = pem_to_key_handle(&public_pem).unwrap() else {
            panic!("expected a public handle");
        };
        assert!(public.verify(b"tx", &signature).unwrap());
    }
}

#[test]
fn mismatched_public_point_is_rejected() {
    let a = PrivateKeyHandle::generate(Curve::P256).to_ec_key().unwrap();
    let b = PrivateKeyHandle::generate(Curve::P256).to_ec_key().unwrap();
    let mut forged = a.clone();
    forged.x = b.x.clone();
    forged.y = b.y.clone();
    assert!(matches!(
        PrivateKeyHandle::from_ec_key(&forged),
        Err(CryptoError::InvalidKey(_))
    ));
}

#[test]
fn public_key_cannot_sign() {
    let key = PrivateKeyHandle::generate(Curve::P256);
    let public_pem = export_public_pem(&key.public_key().unwrap()).unwrap();
    let handle = pem_to_key_handle(&public_pem).unwrap();
    assert!(handle.private_key().is_none());
    let material = crate::der::key::parse(&public_pem).unwrap();
    assert!(matches!(
        PrivateKeyHandle::from_ec_key(material.ec_key()),
        Err(CryptoError::PrivateKeyRequired)
    ));
}

#[test]
fn trust_picks_the_root_that_signed_the_leaf() {
    let first_key = PrivateKeyHandle::generate(Curve::P256);
    let second_key = PrivateKeyHandle::generate(Curve::P384);
    let first = self_signed_root(&first_key, "CN=ca1,O=Org1", &[0x11], 10).unwrap();
    let second = self_signed_root(&second_key, "CN=ca2,O=Org2", &[0x22], 10).unwrap();
    let second_info = parse_certificate(&second).unwrap();

    let leaf_key = PrivateKeyHandle::generate(Curve::P256);
    let leaf = issue_leaf(
        &second_info,
        &second_key,
        "CN=user1,O=Org2",
        &leaf_key.public_key().unwrap(),
        &[0x33],
        Vec::new(),
    )
    .unwrap();

    let bundle = format!("{first}{second}");
    let root = find_trusted_root(&leaf, &[bundle.as_str()]).unwrap().unwrap();
    assert_eq!(root.serial_hex(), "22");
    assert!(is_trusted_root(&leaf, &["not a pem", second.as_str()]).unwrap());
    assert!(!is_trusted_root(&leaf, &[first.as_str()]).unwrap());
}

#[test]
fn issued_leaf_carries_sans_and_the_issuer_signature() {
    let ca_key = PrivateKeyHandle::generate(Curve::P384);
    let ca_pem = self_signed_root(&ca_key, "CN=ca.org1,O=Org1", &[0x01], 30).unwrap();
    let ca = parse_certificate(&ca_pem).unwrap();
    assert_eq!(ca.signature_algorithm, oid::ECDSA_WITH_SHA384);
    assert!(verify_issued_by(&ca, &ca).unwrap());

    let leaf_key = PrivateKeyHandle::generate(Curve::P256);
    let sans = vec![
        GeneralName::Dns("peer0.org1.example.com".into()),
        GeneralName::Ip("10.0.0.7".parse().unwrap()),
        GeneralName::Email("admin@org1.example.com".into()),
        GeneralName::Uri("spiffe://org1/peer0".into()),
    ];
    let leaf_pem = issue_leaf(
        &ca,
        &ca_key,
        "CN=peer0,OU=peer,O=Org1",
        &leaf_key.public_key().unwrap(),
        &[0x7f, 0x01],
        sans.clone(),
    )
    .unwrap();
    let leaf = parse_certificate(&leaf_pem).unwrap();

    assert_eq!(leaf.serial_hex(), "7f01");
    assert_eq!(leaf.issuer, ca.subject);
    assert_eq!(leaf.subject.common_name(), Some("peer0"));
    assert_eq!(leaf.subject_alt_names, sans);
    assert_eq!(
        leaf.public_key,
        leaf_key.public_key().unwrap().to_ec_key().unwrap()
    );
    assert!(!leaf.basic_constraints.map(|b| b.ca).unwrap_or(false));
    assert!(leaf.is_valid_at(chrono::Utc::now()));
    assert!(verify_issued_by(&leaf, &ca).unwrap());
    assert!(is_trusted_root(&leaf_pem, &[ca_pem.as_str()]).unwrap());
}

#[test]
fn issuance_rejects_mismatched_or_unsupported_keys() {
    let ca_key = PrivateKeyHandle::generate(Curve::P256);
    let ca = parse_certificate(&self_signed_root(&ca_key, "CN=ca", &[0x01], 30).unwrap()).unwrap();
    let other_key = PrivateKeyHandle::generate(Curve::P256);
    let subject = PrivateKeyHandle::generate(Curve::P256).public_key().unwrap();

    assert!(matches!(
        issue_leaf(&ca, &other_key, "CN=user", &subject, &[0x02], Vec::new()),
        Err(CryptoError::Issuance(_))
    ));
    assert!(matches!(
        self_signed_root(&PrivateKeyHandle::generate(Curve::P521), "CN=ca", &[0x01], 30),
        Err(CryptoError::Issuance(_))
    ));
    assert!(matches!(
        issue_leaf(
            &ca,
            &ca_key,
            "CN=user",
            &subject,
            &[0x02],
            vec![GeneralName::RegisteredId("1.2.3".into())],
        ),
        Err(CryptoError::Issuance(_))
    ));
}
