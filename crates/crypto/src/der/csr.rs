// Path: crates/crypto/src/der/csr.rs
//! PKCS#10 certificate signing requests.
//!
//! The SAN list travels as an `extensionRequest` attribute:
//! `[0] { SEQUENCE { extensionRequest, SET { SEQUENCE { SEQUENCE { subjectAltName, OCTET STRING } } } } }`.

use super::key::{encode_spki, parse_spki, EcKey};
use super::name::{read_name, DistinguishedName};
use super::san::{encode_san_extension, parse_san_extension, GeneralName};
use super::{encode, malformed, oid, tag, DerReader};
use crate::error::CodecError;
use crate::pem::{self, PemKind};

/// A decoded certificate signing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrInfo {
    /// The requested subject.
    pub subject: DistinguishedName,
    /// The requester's public key.
    pub public_key: EcKey,
    /// Requested subjectAltName entries.
    pub subject_alt_names: Vec<GeneralName>,
    /// The signature algorithm OID.
    pub signature_algorithm: String,
    /// The exact `certificationRequestInfo` bytes the signature covers.
    pub info: Vec<u8>,
    /// The DER ECDSA signature.
    pub signature: Vec<u8>,
}

/// Encodes `certificationRequestInfo`.
pub fn encode_request_info(
    subject: &DistinguishedName,
    public_key: &EcKey,
    subject_alt_names: &[GeneralName],
) -> Result<Vec<u8>, CodecError> {
    let attributes = if subject_alt_names.is_empty() {
        encode::implicit(0, true, &[])
    } else {
        let san = encode::sequence(&[
            encode::object_identifier(oid::SUBJECT_ALT_NAME)?,
            encode::octet_string(&encode_san_extension(subject_alt_names)?),
        ]);
        let request = encode::sequence(&[
            encode::object_identifier(oid::EXTENSION_REQUEST)?,
            encode::set_of(&[encode::sequence(&[san])]),
        ]);
        encode::implicit(0, true, &request)
    };
    Ok(encode::sequence(&[
        encode::small_integer(0),
        subject.to_der()?,
        encode_spki(public_key)?,
        attributes,
    ]))
}

/// Wraps signed request info into a PEM CSR.
pub fn assemble_csr(
    info: &[u8],
    signature_algorithm: &str,
    signature_der: &[u8],
) -> Result<String, CodecError> {
    let der = encode::sequence(&[
        info.to_vec(),
        encode::signature_algorithm(signature_algorithm)?,
        encode::bit_string(signature_der),
    ]);
    Ok(pem::encode(PemKind::CertificateRequest, &der))
}

/// Parses a PEM CSR.
pub fn parse_csr(text: &str) -> Result<CsrInfo, CodecError> {
    let (kind, der) = pem::decode(text)?;
    if kind != PemKind::CertificateRequest {
        return Err(CodecError::UnknownLabel(kind.label().to_string()));
    }
    let mut outer = DerReader::new(&der);
    let request = outer.read(tag::SEQUENCE)?;
    outer.finish()?;
    let mut parts = request.reader();
    let info = parts.read(tag::SEQUENCE)?;
    let signature_algorithm = parts.read(tag::SEQUENCE)?.reader().read_oid()?;
    let signature = parts.read_bit_string()?.to_vec();
    parts.finish()?;

    let mut fields = info.reader();
    if fields.read_small()? != 0 {
        return Err(malformed("CSR version must be 0"));
    }
    let subject = read_name(&mut fields)?;
    let public_key = parse_spki(&fields.read(tag::SEQUENCE)?)?;
    let mut subject_alt_names = Vec::new();
    if let Some(attributes) = fields.read_optional(tag::context(0, true))? {
        let mut list = attributes.reader();
        while !list.is_empty() {
            let attribute = list.read(tag::SEQUENCE)?;
            let mut attr_fields = attribute.reader();
            if attr_fields.read_oid()? != oid::EXTENSION_REQUEST {
                continue;
            }
            let values = attr_fields.read(tag::SET)?;
            let mut value_reader = values.reader();
            while !value_reader.is_empty() {
                let extensions = value_reader.read(tag::SEQUENCE)?;
                let mut ext_reader = extensions.reader();
                while !ext_reader.is_empty() {
                    let ext = ext_reader.read(tag::SEQUENCE)?;
                    let mut ext_fields = ext.reader();
                    let ext_oid = ext_fields.read_oid()?;
                    ext_fields.read_optional(tag::BOOLEAN)?;
                    let value = ext_fields.read(tag::OCTET_STRING)?;
                    if ext_oid == oid::SUBJECT_ALT_NAME {
                        subject_alt_names = parse_san_extension(value.value)?;
                    }
                }
            }
        }
    }
    fields.finish()?;

    Ok(CsrInfo {
        subject,
        public_key,
        subject_alt_names,
        signature_algorithm,
        info: info.raw.to_vec(),
        signature,
    })
}
