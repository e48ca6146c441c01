// Path: crates/crypto/src/der/key.rs
//! EC keys in PKCS#8 and SubjectPublicKeyInfo form.

use super::cert::{parse_certificate_der, CertificateInfo};
use super::{encode, left_pad, malformed, oid, strip_leading_zeros, tag, DerReader, Tlv};
use crate::curve::Curve;
use crate::error::CodecError;
use crate::pem::{self, PemKind};
use serde::Serialize;
use zeroize::Zeroize;

/// The friendly form of an EC key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EcKey {
    /// The named curve.
    pub curve: Curve,
    /// The key family OID (id-ecPublicKey).
    pub family_oid: String,
    /// The named-curve OID.
    pub curve_oid: String,
    /// Affine x, fixed width. Empty when a private key omits its public point.
    #[serde(with = "hex::serde")]
    pub x: Vec<u8>,
    /// Affine y, fixed width. Empty when a private key omits its public point.
    #[serde(with = "hex::serde")]
    pub y: Vec<u8>,
    /// The private scalar, fixed width.
    #[serde(skip_serializing)]
    pub d: Option<Vec<u8>>,
}

impl Drop for EcKey {
    fn drop(&mut self) {
        if let Some(d) = self.d.as_mut() {
            d.zeroize();
        }
    }
}

impl EcKey {
    /// A public key from its affine coordinates.
    pub fn public(curve: Curve, x: Vec<u8>, y: Vec<u8>) -> Self {
        Self {
            curve,
            family_oid: oid::EC_PUBLIC_KEY.to_string(),
            curve_oid: curve.oid().to_string(),
            x,
            y,
            d: None,
        }
    }

    /// True when x and y are present.
    pub fn has_public_point(&self) -> bool {
        !self.x.is_empty() && !self.y.is_empty()
    }

    /// The SEC1 uncompressed point `04 || x || y`.
    pub fn uncompressed_point(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.x.len() + self.y.len());
        out.push(0x04);
        out.extend_from_slice(&self.x);
        out.extend_from_slice(&self.y);
        out
    }

    /// This key without its private scalar.
    pub fn to_public(&self) -> EcKey {
        EcKey::public(self.curve, self.x.clone(), self.y.clone())
    }
}

/// A parsed PEM object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMaterial {
    /// A PKCS#8 private key.
    Private(EcKey),
    /// A SubjectPublicKeyInfo public key.
    Public(EcKey),
    /// An X.509 certificate.
    Certificate(Box<CertificateInfo>),
}

impl KeyMaterial {
    /// The EC key carried by any variant.
    pub fn ec_key(&self) -> &EcKey {
        match self {
            KeyMaterial::Private(k) | KeyMaterial::Public(k) => k,
            KeyMaterial::Certificate(c) => &c.public_key,
        }
    }
}

/// Parses PEM into key material, dispatching on the armor label.
pub fn parse(text: &str) -> Result<KeyMaterial, CodecError> {
    let (kind, der) = pem::decode(text)?;
    match kind {
        PemKind::PrivateKey => parse_private_key_der(&der).map(KeyMaterial::Private),
        PemKind::PublicKey => parse_public_key_der(&der).map(KeyMaterial::Public),
        PemKind::Certificate => {
            parse_certificate_der(&der).map(|c| KeyMaterial::Certificate(Box::new(c)))
        }
        PemKind::CertificateRequest => Err(CodecError::UnknownLabel(
            "CERTIFICATE REQUEST (use parse_csr)".into(),
        )),
    }
}

/// Packs key material back into PEM.
pub fn pack(material: &KeyMaterial) -> Result<String, CodecError> {
    match material {
        KeyMaterial::Private(key) => Ok(pem::encode(
            PemKind::PrivateKey,
            &encode_private_key_der(key)?,
        )),
        KeyMaterial::Public(key) => Ok(pem::encode(PemKind::PublicKey, &encode_spki(key)?)),
        KeyMaterial::Certificate(cert) => Ok(pem::encode(PemKind::Certificate, &cert.der)),
    }
}

fn read_algorithm(reader: &mut DerReader<'_>) -> Result<(String, String, Curve), CodecError> {
    let algorithm = reader.read(tag::SEQUENCE)?;
    let mut fields = algorithm.reader();
    let family = fields.read_oid()?;
    if family != oid::EC_PUBLIC_KEY {
        return Err(CodecError::UnsupportedAlgorithm(family));
    }
    let curve_oid = fields.read_oid()?;
    let curve = Curve::from_oid(&curve_oid)?;
    Ok((family, curve_oid, curve))
}

fn split_point(bits: &[u8], curve: Curve) -> Result<(Vec<u8>, Vec<u8>), CodecError> {
    let point = strip_leading_zeros(bits);
    let (&prefix, coordinates) = point
        .split_first()
        .ok_or_else(|| CodecError::InvalidPoint("empty point".into()))?;
    if prefix != 0x04 {
        return Err(CodecError::InvalidPoint(format!(
            "expected uncompressed point prefix 0x04, got 0x{prefix:02x}"
        )));
    }
    let total = point.len();
    let coordinate_len = (total - 1) / 2;
    if coordinate_len != curve.field_len() || coordinates.len() != coordinate_len * 2 {
        return Err(CodecError::InvalidPoint(format!(
            "{} point needs {} byte coordinates, got {} bytes",
            curve,
            curve.field_len(),
            coordinates.len()
        )));
    }
    let (x, y) = coordinates.split_at(coordinate_len);
    Ok((x.to_vec(), y.to_vec()))
}

/// Decodes a SubjectPublicKeyInfo element.
pub fn parse_spki(tlv: &Tlv<'_>) -> Result<EcKey, CodecError> {
    let mut reader = tlv.reader();
    let (family_oid, curve_oid, curve) = read_algorithm(&mut reader)?;
    let bits = reader.read_bit_string()?;
    reader.finish()?;
    let (x, y) = split_point(bits, curve)?;
    Ok(EcKey {
        curve,
        family_oid,
        curve_oid,
        x,
        y,
        d: None,
    })
}

/// Decodes a DER SubjectPublicKeyInfo.
pub fn parse_public_key_der(der: &[u8]) -> Result<EcKey, CodecError> {
    let mut outer = DerReader::new(der);
    let spki = outer.read(tag::SEQUENCE)?;
    outer.finish()?;
    parse_spki(&spki)
}

/// Decodes a DER PKCS#8 EC private key.
pub fn parse_private_key_der(der: &[u8]) -> Result<EcKey, CodecError> {
    let mut outer = DerReader::new(der);
    let info = outer.read(tag::SEQUENCE)?;
    outer.finish()?;
    let mut reader = info.reader();
    let version = reader.read_small()?;
    if version > 1 {
        return Err(malformed(format!("unsupported PKCS#8 version {version}")));
    }
    let (family_oid, curve_oid, curve) = read_algorithm(&mut reader)?;
    let wrapped = reader.read(tag::OCTET_STRING)?;

    let mut inner_outer = DerReader::new(wrapped.value);
    let ec_private = inner_outer.read(tag::SEQUENCE)?;
    inner_outer.finish()?;
    let mut fields = ec_private.reader();
    if fields.read_small()? != 1 {
        return Err(malformed("ECPrivateKey version must be 1"));
    }
    let scalar = fields.read(tag::OCTET_STRING)?;
    let digits = strip_leading_zeros(scalar.value);
    if digits.is_empty() || digits.len() > curve.field_len() {
        return Err(malformed(format!(
            "private scalar of {} bytes does not fit {}",
            digits.len(),
            curve
        )));
    }
    let d = left_pad(digits, curve.field_len());

    // [0] parameters is redundant inside PKCS#8 and skipped when present.
    fields.read_optional(tag::context(0, true))?;
    let (x, y) = match fields.read_optional(tag::context(1, true))? {
        Some(public) => {
            let mut inner = public.reader();
            let bits = inner.read_bit_string()?;
            inner.finish()?;
            split_point(bits, curve)?
        }
        None => (Vec::new(), Vec::new()),
    };
    Ok(EcKey {
        curve,
        family_oid,
        curve_oid,
        x,
        y,
        d: Some(d),
    })
}

fn algorithm_identifier(key: &EcKey) -> Result<Vec<u8>, CodecError> {
    Ok(encode::sequence(&[
        encode::object_identifier(&key.family_oid)?,
        encode::object_identifier(&key.curve_oid)?,
    ]))
}

fn check_point(key: &EcKey) -> Result<(), CodecError> {
    let width = key.curve.field_len();
    if key.x.len() != width || key.y.len() != width {
        return Err(CodecError::InvalidPoint(format!(
            "{} coordinates must be {} bytes",
            key.curve, width
        )));
    }
    Ok(())
}

/// Encodes a SubjectPublicKeyInfo.
pub fn encode_spki(key: &EcKey) -> Result<Vec<u8>, CodecError> {
    check_point(key)?;
    Ok(encode::sequence(&[
        algorithm_identifier(key)?,
        encode::bit_string(&key.uncompressed_point()),
    ]))
}

/// Encodes a PKCS#8 private key. The public point is embedded when known.
pub fn encode_private_key_der(key: &EcKey) -> Result<Vec<u8>, CodecError> {
    let d = key
        .d
        .as_ref()
        .ok_or_else(|| malformed("private key has no scalar"))?;
    let mut inner = vec![
        encode::small_integer(1),
        encode::octet_string(&left_pad(strip_leading_zeros(d), key.curve.field_len())),
    ];
    if key.has_public_point() {
        check_point(key)?;
        inner.push(encode::explicit(
            1,
            &encode::bit_string(&key.uncompressed_point()),
        ));
    }
    Ok(encode::sequence(&[
        encode::small_integer(0),
        algorithm_identifier(key)?,
        encode::octet_string(&encode::sequence(&inner)),
    ]))
}
