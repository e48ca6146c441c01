// Path: crates/crypto/src/der/name.rs
//! X.501 distinguished names.
//!
//! A name is an ordered list of RDNs; each RDN holds one or more attribute
//! values. Multi-valued RDNs render joined by `+`, sequential RDNs by `,`,
//! both in DER order. Parsing also accepts the slash form `/CN=a/O=b`.

use super::{encode, malformed, oid, tag, DerReader, Tlv};
use crate::error::CodecError;
use serde::{Serialize, Serializer};
use std::fmt;

/// One `type=value` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeValue {
    /// The attribute type OID.
    pub oid: String,
    /// The decoded value.
    pub value: String,
    /// The universal string tag it was (or will be) encoded with.
    pub string_tag: u8,
}

impl AttributeValue {
    /// Creates a value with the conventional string type for its attribute.
    pub fn new(oid: impl Into<String>, value: impl Into<String>) -> Self {
        let oid = oid.into();
        let string_tag = default_string_tag(&oid);
        Self {
            oid,
            value: value.into(),
            string_tag,
        }
    }

    fn key(&self) -> String {
        oid::short_name(&self.oid)
            .map(str::to_string)
            .unwrap_or_else(|| self.oid.clone())
    }

    fn to_der(&self) -> Result<Vec<u8>, CodecError> {
        Ok(encode::sequence(&[
            encode::object_identifier(&self.oid)?,
            encode::string(self.string_tag, &self.value),
        ]))
    }
}

fn default_string_tag(attribute: &str) -> u8 {
    match attribute {
        oid::COUNTRY | oid::SERIAL_NUMBER => tag::PRINTABLE_STRING,
        oid::EMAIL_ADDRESS | oid::DOMAIN_COMPONENT => tag::IA5_STRING,
        _ => tag::UTF8_STRING,
    }
}

/// A relative distinguished name: a set of attribute values.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Rdn {
    /// The values, in encoded order.
    pub attributes: Vec<AttributeValue>,
}

/// An ordered list of RDNs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DistinguishedName {
    /// The RDNs, in DER order.
    pub rdns: Vec<Rdn>,
}

impl DistinguishedName {
    /// Parses `CN=admin,O=IBM`, `/CN=admin/O=IBM` or `CN=a+OU=b,O=c`.
    pub fn parse_str(text: &str) -> Result<Self, CodecError> {
        let trimmed = text.trim();
        let (body, separator) = match trimmed.strip_prefix('/') {
            Some(rest) => (rest, '/'),
            None => (trimmed, ','),
        };
        if body.is_empty() {
            return Err(CodecError::InvalidName("empty distinguished name".into()));
        }
        let mut rdns = Vec::new();
        for segment in split_unescaped(body, separator) {
            let mut attributes = Vec::new();
            for pair in split_unescaped(&segment, '+') {
                attributes.push(parse_pair(&pair)?);
            }
            rdns.push(Rdn { attributes });
        }
        Ok(Self { rdns })
    }

    /// Decodes a `Name` element.
    pub fn from_der(tlv: &Tlv<'_>) -> Result<Self, CodecError> {
        if tlv.tag != tag::SEQUENCE {
            return Err(CodecError::UnexpectedTag {
                expected: tag::SEQUENCE,
                got: tlv.tag,
            });
        }
        let mut rdns = Vec::new();
        let mut sets = tlv.reader();
        while !sets.is_empty() {
            let set = sets.read(tag::SET)?;
            let mut pairs = set.reader();
            let mut attributes = Vec::new();
            while !pairs.is_empty() {
                let pair = pairs.read(tag::SEQUENCE)?;
                let mut fields = pair.reader();
                let attribute = fields.read_oid()?;
                let value = fields.read_any()?;
                fields.finish()?;
                attributes.push(AttributeValue {
                    oid: attribute,
                    value: decode_string(&value)?,
                    string_tag: value.tag,
                });
            }
            if attributes.is_empty() {
                return Err(malformed("empty RDN"));
            }
            rdns.push(Rdn { attributes });
        }
        Ok(Self { rdns })
    }

    /// Encodes this name as a `Name` element.
    pub fn to_der(&self) -> Result<Vec<u8>, CodecError> {
        let mut sets = Vec::with_capacity(self.rdns.len());
        for rdn in &self.rdns {
            let values = rdn
                .attributes
                .iter()
                .map(|a| {
                    let mut a = a.clone();
                    if !matches!(
                        a.string_tag,
                        tag::UTF8_STRING | tag::PRINTABLE_STRING | tag::IA5_STRING
                    ) {
                        a.string_tag = tag::UTF8_STRING;
                    }
                    a.to_der()
                })
                .collect::<Result<Vec<_>, _>>()?;
            sets.push(encode::set_of(&values));
        }
        Ok(encode::sequence(&sets))
    }

    /// The first value of an attribute, looked up by short name or OID.
    pub fn get(&self, key: &str) -> Option<&str> {
        let wanted = oid::from_short_name(key).unwrap_or(key);
        self.rdns
            .iter()
            .flat_map(|r| r.attributes.iter())
            .find(|a| a.oid == wanted)
            .map(|a| a.value.as_str())
    }

    /// The commonName, if present.
    pub fn common_name(&self) -> Option<&str> {
        self.get("CN")
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .rdns
            .iter()
            .map(|rdn| {
                rdn.attributes
                    .iter()
                    .map(|a| format!("{}={}", a.key(), escape(&a.value)))
                    .collect::<Vec<_>>()
                    .join("+")
            })
            .collect::<Vec<_>>()
            .join(",");
        f.write_str(&rendered)
    }
}

impl Serialize for DistinguishedName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

fn parse_pair(pair: &str) -> Result<AttributeValue, CodecError> {
    let (key, value) = pair
        .split_once('=')
        .ok_or_else(|| CodecError::InvalidName(format!("'{pair}' is not a key=value pair")))?;
    let key = key.trim();
    let attribute = match oid::from_short_name(key) {
        Some(found) => found.to_string(),
        None if oid::is_dotted(key) => key.to_string(),
        None => {
            return Err(CodecError::InvalidName(format!(
                "unknown attribute type '{key}'"
            )))
        }
    };
    Ok(AttributeValue::new(attribute, unescape(value.trim())))
}

fn split_unescaped(text: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut escaped = false;
    for c in text.chars() {
        if escaped {
            current.push('\\');
            current.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == separator {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    if escaped {
        current.push('\\');
    }
    parts.push(current);
    parts
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ',' | '+' | '\\' | '/' | '=') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn decode_string(tlv: &Tlv<'_>) -> Result<String, CodecError> {
    let invalid = || malformed(format!("invalid string encoding for tag 0x{:02x}", tlv.tag));
    match tlv.tag {
        tag::UTF8_STRING | tag::PRINTABLE_STRING | tag::IA5_STRING => {
            String::from_utf8(tlv.value.to_vec()).map_err(|_| invalid())
        }
        tag::TELETEX_STRING => Ok(tlv.value.iter().map(|b| char::from(*b)).collect()),
        tag::BMP_STRING => {
            let units = tlv
                .value
                .chunks(2)
                .map(|c| match c {
                    [hi, lo] => Ok(u16::from_be_bytes([*hi, *lo])),
                    _ => Err(invalid()),
                })
                .collect::<Result<Vec<_>, _>>()?;
            String::from_utf16(&units).map_err(|_| invalid())
        }
        tag::UNIVERSAL_STRING => tlv
            .value
            .chunks(4)
            .map(|c| match c {
                [a, b, cc, d] => {
                    char::from_u32(u32::from_be_bytes([*a, *b, *cc, *d])).ok_or_else(invalid)
                }
                _ => Err(invalid()),
            })
            .collect(),
        _ => Ok(format!("#{}", hex::encode(tlv.raw))),
    }
}

/// Reads a `Name` from the reader.
pub(crate) fn read_name(reader: &mut DerReader<'_>) -> Result<DistinguishedName, CodecError> {
    let tlv = reader.read(tag::SEQUENCE)?;
    DistinguishedName::from_der(&tlv)
}
