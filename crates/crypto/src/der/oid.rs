// Path: crates/crypto/src/der/oid.rs
//! Object identifiers and their DER content encoding.

use super::malformed;
use crate::error::CodecError;

/// id-ecPublicKey
pub const EC_PUBLIC_KEY: &str = "1.2.840.10045.2.1";
/// prime256v1 / P-256
pub const PRIME256V1: &str = "1.2.840.10045.3.1.7";
/// secp384r1 / P-384
pub const SECP384R1: &str = "1.3.132.0.34";
/// secp521r1 / P-521
pub const SECP521R1: &str = "1.3.132.0.35";
/// ecdsa-with-SHA256
pub const ECDSA_WITH_SHA256: &str = "1.2.840.10045.4.3.2";
/// ecdsa-with-SHA384
pub const ECDSA_WITH_SHA384: &str = "1.2.840.10045.4.3.3";

/// PKCS#9 extensionRequest
pub const EXTENSION_REQUEST: &str = "1.2.840.113549.1.9.14";
/// PKCS#9 emailAddress
pub const EMAIL_ADDRESS: &str = "1.2.840.113549.1.9.1";

/// subjectKeyIdentifier
pub const SUBJECT_KEY_ID: &str = "2.5.29.14";
/// keyUsage
pub const KEY_USAGE: &str = "2.5.29.15";
/// subjectAltName
pub const SUBJECT_ALT_NAME: &str = "2.5.29.17";
/// basicConstraints
pub const BASIC_CONSTRAINTS: &str = "2.5.29.19";
/// authorityKeyIdentifier
pub const AUTHORITY_KEY_ID: &str = "2.5.29.35";

/// commonName
pub const COMMON_NAME: &str = "2.5.4.3";
/// serialNumber
pub const SERIAL_NUMBER: &str = "2.5.4.5";
/// countryName
pub const COUNTRY: &str = "2.5.4.6";
/// localityName
pub const LOCALITY: &str = "2.5.4.7";
/// stateOrProvinceName
pub const STATE: &str = "2.5.4.8";
/// organizationName
pub const ORGANIZATION: &str = "2.5.4.10";
/// organizationalUnitName
pub const ORGANIZATIONAL_UNIT: &str = "2.5.4.11";
/// domainComponent
pub const DOMAIN_COMPONENT: &str = "0.9.2342.19200300.100.1.25";
/// userId
pub const USER_ID: &str = "0.9.2342.19200300.100.1.1";

const SHORT_NAMES: [(&str, &str); 10] = [
    ("CN", COMMON_NAME),
    ("SERIALNUMBER", SERIAL_NUMBER),
    ("C", COUNTRY),
    ("L", LOCALITY),
    ("ST", STATE),
    ("O", ORGANIZATION),
    ("OU", ORGANIZATIONAL_UNIT),
    ("E", EMAIL_ADDRESS),
    ("DC", DOMAIN_COMPONENT),
    ("UID", USER_ID),
];

/// The short attribute name for an OID, if it has one.
pub fn short_name(dotted: &str) -> Option<&'static str> {
    SHORT_NAMES
        .iter()
        .find(|(_, oid)| *oid == dotted)
        .map(|(name, _)| *name)
}

/// The OID for a short attribute name, case-insensitively.
pub fn from_short_name(name: &str) -> Option<&'static str> {
    let upper = name.to_ascii_uppercase();
    let upper = if upper == "EMAILADDRESS" { "E".to_string() } else { upper };
    SHORT_NAMES
        .iter()
        .find(|(short, _)| *short == upper)
        .map(|(_, oid)| *oid)
}

/// Decodes OID content octets into dotted form.
pub fn decode(content: &[u8]) -> Result<String, CodecError> {
    if content.is_empty() {
        return Err(malformed("empty OBJECT IDENTIFIER"));
    }
    let mut arcs: Vec<u64> = Vec::new();
    let mut current: u64 = 0;
    let mut in_progress = false;
    for byte in content {
        if current > (u64::MAX >> 7) {
            return Err(malformed("OBJECT IDENTIFIER arc overflows"));
        }
        current = (current << 7) | u64::from(byte & 0x7f);
        in_progress = true;
        if byte & 0x80 == 0 {
            if arcs.is_empty() {
                let (first, second) = match current {
                    0..=39 => (0, current),
                    40..=79 => (1, current - 40),
                    _ => (2, current - 80),
                };
                arcs.push(first);
                arcs.push(second);
            } else {
                arcs.push(current);
            }
            current = 0;
            in_progress = false;
        }
    }
    if in_progress {
        return Err(malformed("truncated OBJECT IDENTIFIER"));
    }
    Ok(arcs
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join("."))
}

/// Encodes a dotted OID into content octets.
pub fn encode(dotted: &str) -> Result<Vec<u8>, CodecError> {
    let arcs = dotted
        .split('.')
        .map(|part| part.parse::<u64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| malformed(format!("invalid OID '{dotted}'")))?;
    let (first, second, rest) = match arcs.as_slice() {
        [first, second, rest @ ..] => (*first, *second, rest),
        _ => return Err(malformed(format!("OID '{dotted}' needs at least two arcs"))),
    };
    if first > 2 || (first < 2 && second >= 40) {
        return Err(malformed(format!("invalid leading arcs in OID '{dotted}'")));
    }
    let mut out = Vec::new();
    push_base128(&mut out, first * 40 + second);
    for arc in rest {
        push_base128(&mut out, *arc);
    }
    Ok(out)
}

/// True when `text` looks like a dotted OID.
pub fn is_dotted(text: &str) -> bool {
    !text.is_empty()
        && text.contains('.')
        && text.chars().all(|c| c.is_ascii_digit() || c == '.')
}

fn push_base128(out: &mut Vec<u8>, value: u64) {
    let mut groups = vec![(value & 0x7f) as u8];
    let mut rest = value >> 7;
    while rest > 0 {
        groups.push(((rest & 0x7f) as u8) | 0x80);
        rest >>= 7;
    }
    groups.reverse();
    out.extend_from_slice(&groups);
}
