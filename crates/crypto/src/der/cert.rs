// Path: crates/crypto/src/der/cert.rs
//! X.509 certificate decoding.

use super::key::{parse_spki, EcKey};
use super::name::{read_name, DistinguishedName};
use super::san::{parse_san_extension, GeneralName};
use super::{malformed, oid, parse_time, tag, DerReader};
use crate::error::CodecError;
use crate::pem::{self, PemKind};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A raw certificate extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extension {
    /// The extension OID.
    pub oid: String,
    /// The critical flag.
    pub critical: bool,
    /// The DER content of the `extnValue` OCTET STRING.
    #[serde(with = "hex::serde")]
    pub value: Vec<u8>,
}

/// Decoded `basicConstraints`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BasicConstraints {
    /// Whether the subject is a CA.
    pub ca: bool,
    /// The optional path length constraint.
    pub path_len: Option<u64>,
}

/// A decoded X.509 certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificateInfo {
    /// The X.509 version (1, 2 or 3).
    pub version: u8,
    /// The serial number, unsigned, without leading zeros.
    #[serde(with = "hex::serde")]
    pub serial_number: Vec<u8>,
    /// The outer signature algorithm OID.
    pub signature_algorithm: String,
    /// The issuer name.
    pub issuer: DistinguishedName,
    /// The subject name.
    pub subject: DistinguishedName,
    /// Start of validity.
    pub not_before: DateTime<Utc>,
    /// End of validity.
    pub not_after: DateTime<Utc>,
    /// The subject's EC public key.
    pub public_key: EcKey,
    /// All extensions, in order.
    pub extensions: Vec<Extension>,
    /// Decoded subjectAltName entries.
    pub subject_alt_names: Vec<GeneralName>,
    /// Decoded basicConstraints.
    pub basic_constraints: Option<BasicConstraints>,
    /// The subjectKeyIdentifier.
    pub subject_key_id: Option<String>,
    /// The authorityKeyIdentifier key id.
    pub authority_key_id: Option<String>,
    /// The exact `tbsCertificate` bytes the signature covers.
    #[serde(skip)]
    pub tbs: Vec<u8>,
    /// The DER ECDSA signature value.
    #[serde(skip)]
    pub signature: Vec<u8>,
    /// The complete certificate DER.
    #[serde(skip)]
    pub der: Vec<u8>,
}

impl CertificateInfo {
    /// The serial number as lowercase hex.
    pub fn serial_hex(&self) -> String {
        hex::encode(&self.serial_number)
    }

    /// True when `now` is within the validity window.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.not_before <= now && now <= self.not_after
    }

    /// The certificate re-armored as PEM.
    pub fn to_pem(&self) -> String {
        pem::encode(PemKind::Certificate, &self.der)
    }
}

/// Parses a PEM certificate.
pub fn parse_certificate(text: &str) -> Result<CertificateInfo, CodecError> {
    let (kind, der) = pem::decode(text)?;
    if kind != PemKind::Certificate {
        return Err(CodecError::UnknownLabel(kind.label().to_string()));
    }
    parse_certificate_der(&der)
}

/// Parses a DER certificate.
pub fn parse_certificate_der(der: &[u8]) -> Result<CertificateInfo, CodecError> {
    let mut outer = DerReader::new(der);
    let certificate = outer.read(tag::SEQUENCE)?;
    outer.finish()?;
    let mut parts = certificate.reader();
    let tbs = parts.read(tag::SEQUENCE)?;
    let algorithm = parts.read(tag::SEQUENCE)?;
    let signature_algorithm = algorithm.reader().read_oid()?;
    let signature = parts.read_bit_string()?.to_vec();
    parts.finish()?;

    let mut fields = tbs.reader();
    let version = match fields.read_optional(tag::context(0, true))? {
        Some(explicit) => {
            let mut inner = explicit.reader();
            let v = inner.read_small()?;
            inner.finish()?;
            u8::try_from(v + 1).map_err(|_| malformed("certificate version out of range"))?
        }
        None => 1,
    };
    let serial_number = fields.read_unsigned()?;
    fields.read(tag::SEQUENCE)?;
    let issuer = read_name(&mut fields)?;
    let validity = fields.read(tag::SEQUENCE)?;
    let mut times = validity.reader();
    let not_before = parse_time(&times.read_any()?)?;
    let not_after = parse_time(&times.read_any()?)?;
    times.finish()?;
    let subject = read_name(&mut fields)?;
    let public_key = parse_spki(&fields.read(tag::SEQUENCE)?)?;
    fields.read_optional(tag::context(1, false))?;
    fields.read_optional(tag::context(2, false))?;

    let mut extensions = Vec::new();
    if let Some(wrapper) = fields.read_optional(tag::context(3, true))? {
        let mut inner = wrapper.reader();
        let list = inner.read(tag::SEQUENCE)?;
        inner.finish()?;
        let mut items = list.reader();
        while !items.is_empty() {
            let ext = items.read(tag::SEQUENCE)?;
            let mut ext_fields = ext.reader();
            let ext_oid = ext_fields.read_oid()?;
            let critical = match ext_fields.read_optional(tag::BOOLEAN)? {
                Some(flag) => flag.value.first().copied().unwrap_or(0) != 0,
                None => false,
            };
            let value = ext_fields.read(tag::OCTET_STRING)?.value.to_vec();
            ext_fields.finish()?;
            extensions.push(Extension {
                oid: ext_oid,
                critical,
                value,
            });
        }
    }
    fields.finish()?;

    let mut subject_alt_names = Vec::new();
    let mut basic_constraints = None;
    let mut subject_key_id = None;
    let mut authority_key_id = None;
    for ext in &extensions {
        match ext.oid.as_str() {
            oid::SUBJECT_ALT_NAME => subject_alt_names = parse_san_extension(&ext.value)?,
            oid::BASIC_CONSTRAINTS => basic_constraints = Some(parse_basic_constraints(&ext.value)?),
            oid::SUBJECT_KEY_ID => {
                let mut r = DerReader::new(&ext.value);
                subject_key_id = Some(hex::encode(r.read(tag::OCTET_STRING)?.value));
            }
            oid::AUTHORITY_KEY_ID => {
                let mut r = DerReader::new(&ext.value);
                let seq = r.read(tag::SEQUENCE)?;
                if let Some(key_id) = seq.reader().read_optional(tag::context(0, false))? {
                    authority_key_id = Some(hex::encode(key_id.value));
                }
            }
            _ => {}
        }
    }

    Ok(CertificateInfo {
        version,
        serial_number,
        signature_algorithm,
        issuer,
        subject,
        not_before,
        not_after,
        public_key,
        extensions,
        subject_alt_names,
        basic_constraints,
        subject_key_id,
        authority_key_id,
        tbs: tbs.raw.to_vec(),
        signature,
        der: der.to_vec(),
    })
}

fn parse_basic_constraints(value: &[u8]) -> Result<BasicConstraints, CodecError> {
    let mut outer = DerReader::new(value);
    let seq = outer.read(tag::SEQUENCE)?;
    let mut fields = seq.reader();
    let ca = match fields.read_optional(tag::BOOLEAN)? {
        Some(flag) => flag.value.first().copied().unwrap_or(0) != 0,
        None => false,
    };
    let path_len = if fields.peek_tag() == Some(tag::INTEGER) {
        Some(fields.read_small()?)
    } else {
        None
    };
    Ok(BasicConstraints { ca, path_len })
}
