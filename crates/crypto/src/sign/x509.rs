// Path: crates/crypto/src/sign/x509.rs
//! CSR creation and local certificate issuance.
//!
//! Certificates are laid out by `rcgen`; every signature still comes from
//! this crate's ECDSA engine, handed to `rcgen` as a remote key pair.

use super::ecdsa::{PrivateKeyHandle, PublicKeyHandle};
use crate::algorithms::hash::{self, HashFunction};
use crate::curve::Curve;
use crate::der::cert::CertificateInfo;
use crate::der::csr::{assemble_csr, encode_request_info, CsrInfo};
use crate::der::key::EcKey;
use crate::der::name::DistinguishedName;
use crate::der::oid;
use crate::der::san::GeneralName;
use crate::der::signature::{pack_signature, parse_signature};
use crate::error::CryptoError;
use chrono::{DateTime, Datelike, Duration, Utc};
use rcgen::{
    BasicConstraints, CertificateParams, DnType, Ia5String, IsCa, KeyPair, KeyUsagePurpose,
    PublicKeyData, RemoteKeyPair, SanType, SerialNumber, SignatureAlgorithm,
};
use std::fmt;

/// Builds and signs a CSR for `subject` (e.g. `CN=admin,O=IBM`).
pub fn build_csr(
    key: &PrivateKeyHandle,
    subject: &str,
    subject_alt_names: &[GeneralName],
) -> Result<String, CryptoError> {
    let subject = DistinguishedName::parse_str(subject)?;
    let public = key.public_key()?.to_ec_key()?;
    let info = encode_request_info(&subject, &public, subject_alt_names)?;
    let signature = key.sign(&info)?;
    Ok(assemble_csr(
        &info,
        oid::ECDSA_WITH_SHA256,
        &pack_signature(&signature),
    )?)
}

/// Checks a CSR's self-signature.
pub fn verify_csr(csr: &CsrInfo) -> Result<bool, CryptoError> {
    let key = PublicKeyHandle::from_ec_key(&csr.public_key)?;
    let hasher = hash::for_signature_algorithm(&csr.signature_algorithm)?;
    let signature = parse_signature(&csr.signature)?;
    key.verify_prehash(&hasher.hash(&csr.info), &signature)
}

fn issuance_failed(e: impl fmt::Display) -> CryptoError {
    CryptoError::Issuance(e.to_string())
}

/// The `rcgen` algorithm and signature OID for keys on `curve`.
fn algorithm_for(curve: Curve) -> Result<(&'static SignatureAlgorithm, &'static str), CryptoError> {
    match curve {
        Curve::P256 => Ok((&rcgen::PKCS_ECDSA_P256_SHA256, oid::ECDSA_WITH_SHA256)),
        Curve::P384 => Ok((&rcgen::PKCS_ECDSA_P384_SHA384, oid::ECDSA_WITH_SHA384)),
        Curve::P521 => Err(issuance_failed(
            "P-521 keys cannot take part in local issuance",
        )),
    }
}

fn uncompressed_point(key: &EcKey) -> Vec<u8> {
    let mut point = Vec::with_capacity(1 + key.x.len() + key.y.len());
    point.push(0x04);
    point.extend_from_slice(&key.x);
    point.extend_from_slice(&key.y);
    point
}

/// A private key handle that signs on behalf of `rcgen`.
struct EngineKey {
    key: PrivateKeyHandle,
    public: Vec<u8>,
    algorithm: &'static SignatureAlgorithm,
    hasher: Box<dyn HashFunction + Send + Sync>,
}

impl RemoteKeyPair for EngineKey {
    fn public_key(&self) -> &[u8] {
        &self.public
    }

    fn sign(&self, msg: &[u8]) -> Result<Vec<u8>, rcgen::Error> {
        let signature = self
            .key
            .sign_prehash(&self.hasher.hash(msg))
            .map_err(|e| {
                log::warn!("certificate signing failed: {e}");
                rcgen::Error::RemoteKeyError
            })?;
        Ok(pack_signature(&signature))
    }

    fn algorithm(&self) -> &'static SignatureAlgorithm {
        self.algorithm
    }
}

fn engine_key_pair(key: &PrivateKeyHandle) -> Result<KeyPair, CryptoError> {
    let (algorithm, signature_oid) = algorithm_for(key.curve())?;
    let hasher: Box<dyn HashFunction + Send + Sync> = match signature_oid {
        oid::ECDSA_WITH_SHA384 => Box::new(hash::Sha384Hash),
        _ => Box::new(hash::Sha256Hash),
    };
    let material = key.to_ec_key()?;
    let engine = EngineKey {
        public: uncompressed_point(&key.public_key()?.to_ec_key()?),
        key: PrivateKeyHandle::from_ec_key(&material)?,
        algorithm,
        hasher,
    };
    KeyPair::from_remote(Box::new(engine)).map_err(issuance_failed)
}

/// The public half of a certificate subject.
struct SubjectKey {
    point: Vec<u8>,
    algorithm: &'static SignatureAlgorithm,
}

impl SubjectKey {
    fn new(key: &PublicKeyHandle) -> Result<Self, CryptoError> {
        let (algorithm, _) = algorithm_for(key.curve())?;
        Ok(Self {
            point: uncompressed_point(&key.to_ec_key()?),
            algorithm,
        })
    }
}

impl PublicKeyData for SubjectKey {
    fn der_bytes(&self) -> &[u8] {
        &self.point
    }

    fn algorithm(&self) -> &SignatureAlgorithm {
        self.algorithm
    }
}

fn dn_type(attribute: &str) -> DnType {
    match attribute {
        oid::COMMON_NAME => DnType::CommonName,
        oid::COUNTRY => DnType::CountryName,
        oid::LOCALITY => DnType::LocalityName,
        oid::STATE => DnType::StateOrProvinceName,
        oid::ORGANIZATION => DnType::OrganizationName,
        oid::ORGANIZATIONAL_UNIT => DnType::OrganizationalUnitName,
        other => DnType::CustomDnType(
            other.split('.').filter_map(|arc| arc.parse().ok()).collect(),
        ),
    }
}

/// Converts a parsed name. `rcgen` keeps one value per attribute type, the last one wins.
fn rcgen_name(name: &DistinguishedName) -> rcgen::DistinguishedName {
    let mut out = rcgen::DistinguishedName::new();
    for attribute in name.rdns.iter().flat_map(|rdn| &rdn.attributes) {
        out.push(dn_type(&attribute.oid), attribute.value.clone());
    }
    out
}

fn san_type(name: &GeneralName) -> Result<SanType, CryptoError> {
    let ia5 = |value: &str| Ia5String::try_from(value.to_string()).map_err(issuance_failed);
    Ok(match name {
        GeneralName::Dns(host) => SanType::DnsName(ia5(host)?),
        GeneralName::Email(address) => SanType::Rfc822Name(ia5(address)?),
        GeneralName::Uri(uri) => SanType::URI(ia5(uri)?),
        GeneralName::Ip(ip) => SanType::IpAddress(*ip),
        GeneralName::DirectoryName(_) => {
            return Err(issuance_failed("directoryName SANs cannot be issued"))
        }
        GeneralName::RegisteredId(_) => {
            return Err(issuance_failed("registeredID SANs cannot be issued"))
        }
    })
}

/// Certificate parameters shared by roots and leaves.
fn base_params(
    subject: &DistinguishedName,
    serial_number: &[u8],
    days: i64,
) -> CertificateParams {
    // Validity is day-granular; starting a day early absorbs clock skew.
    let day = |at: DateTime<Utc>| {
        rcgen::date_time_ymd(at.year(), at.month() as u8, at.day() as u8)
    };
    let now = Utc::now();
    let mut params = CertificateParams::default();
    params.distinguished_name = rcgen_name(subject);
    params.serial_number = Some(SerialNumber::from_slice(serial_number));
    params.not_before = day(now - Duration::days(1));
    params.not_after = day(now + Duration::days(days));
    params
}

fn ca_params(subject: &DistinguishedName, serial_number: &[u8], days: i64) -> CertificateParams {
    let mut params = base_params(subject, serial_number, days);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];
    params
}

/// Creates a self-signed CA certificate valid for `days` from now.
pub fn self_signed_root(
    key: &PrivateKeyHandle,
    subject: &str,
    serial_number: &[u8],
    days: i64,
) -> Result<String, CryptoError> {
    let subject = DistinguishedName::parse_str(subject)?;
    let key_pair = engine_key_pair(key)?;
    let cert = ca_params(&subject, serial_number, days)
        .self_signed(&key_pair)
        .map_err(issuance_failed)?;
    log::debug!("issued self-signed root {subject}");
    Ok(cert.pem())
}

/// Issues an end-entity certificate, valid for a year, signed by `issuer`.
pub fn issue_leaf(
    issuer: &CertificateInfo,
    issuer_key: &PrivateKeyHandle,
    subject: &str,
    public_key: &PublicKeyHandle,
    serial_number: &[u8],
    subject_alt_names: Vec<GeneralName>,
) -> Result<String, CryptoError> {
    if issuer.public_key != issuer_key.public_key()?.to_ec_key()? {
        return Err(issuance_failed(format!(
            "key does not match issuer {}",
            issuer.subject
        )));
    }
    let issuer_pair = engine_key_pair(issuer_key)?;
    // Only the issuer's name and key are carried into the leaf.
    let issuer_cert = ca_params(&issuer.subject, &issuer.serial_number, 1)
        .self_signed(&issuer_pair)
        .map_err(issuance_failed)?;

    let subject = DistinguishedName::parse_str(subject)?;
    let mut params = base_params(&subject, serial_number, 365);
    params.is_ca = IsCa::ExplicitNoCa;
    params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
    params.subject_alt_names = subject_alt_names
        .iter()
        .map(san_type)
        .collect::<Result<Vec<_>, _>>()?;
    let cert = params
        .signed_by(&SubjectKey::new(public_key)?, &issuer_cert, &issuer_pair)
        .map_err(issuance_failed)?;
    log::debug!("issued {subject} under {}", issuer.subject);
    Ok(cert.pem())
}
