// Path: crates/crypto/src/der/san.rs
//! Subject alternative names (the GeneralName kinds used by ledger identities).

use super::name::DistinguishedName;
use super::{encode, malformed, oid, tag, DerReader};
use crate::error::CodecError;
use serde::Serialize;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// A single GeneralName.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum GeneralName {
    /// `[1] rfc822Name`
    Email(String),
    /// `[2] dNSName`
    Dns(String),
    /// `[4] directoryName`
    DirectoryName(DistinguishedName),
    /// `[6] uniformResourceIdentifier`
    Uri(String),
    /// `[7] iPAddress`
    Ip(IpAddr),
    /// `[8] registeredID`
    RegisteredId(String),
}

impl GeneralName {
    /// Parses `dns:host`, `email:a@b`, `uri:...`, `ip:1.2.3.4`, `dirname:CN=x` or `rid:1.2.3`.
    pub fn parse_str(text: &str) -> Result<Self, CodecError> {
        let (kind, value) = text
            .split_once(':')
            .ok_or_else(|| malformed(format!("SAN '{text}' must be written as kind:value")))?;
        let value = value.trim();
        match kind.trim().to_ascii_lowercase().as_str() {
            "dns" => Ok(GeneralName::Dns(value.to_string())),
            "email" => Ok(GeneralName::Email(value.to_string())),
            "uri" => Ok(GeneralName::Uri(value.to_string())),
            "ip" => value
                .parse()
                .map(GeneralName::Ip)
                .map_err(|_| malformed(format!("invalid IP address '{value}'"))),
            "dirname" => DistinguishedName::parse_str(value).map(GeneralName::DirectoryName),
            "rid" => {
                oid::encode(value)?;
                Ok(GeneralName::RegisteredId(value.to_string()))
            }
            other => Err(malformed(format!("unknown SAN kind '{other}'"))),
        }
    }

    fn to_der(&self) -> Result<Vec<u8>, CodecError> {
        Ok(match self {
            GeneralName::Email(v) => encode::implicit(1, false, v.as_bytes()),
            GeneralName::Dns(v) => encode::implicit(2, false, v.as_bytes()),
            GeneralName::DirectoryName(dn) => encode::explicit(4, &dn.to_der()?),
            GeneralName::Uri(v) => encode::implicit(6, false, v.as_bytes()),
            GeneralName::Ip(IpAddr::V4(ip)) => encode::implicit(7, false, &ip.octets()),
            GeneralName::Ip(IpAddr::V6(ip)) => encode::implicit(7, false, &ip.octets()),
            GeneralName::RegisteredId(v) => encode::implicit(8, false, &oid::encode(v)?),
        })
    }
}

impl fmt::Display for GeneralName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneralName::Email(v) => write!(f, "email:{v}"),
            GeneralName::Dns(v) => write!(f, "dns:{v}"),
            GeneralName::DirectoryName(dn) => write!(f, "dirname:{dn}"),
            GeneralName::Uri(v) => write!(f, "uri:{v}"),
            GeneralName::Ip(v) => write!(f, "ip:{v}"),
            GeneralName::RegisteredId(v) => write!(f, "rid:{v}"),
        }
    }
}

fn ascii(value: &[u8]) -> Result<String, CodecError> {
    String::from_utf8(value.to_vec()).map_err(|_| malformed("non-ASCII name in SAN"))
}

/// Decodes the `GeneralNames` sequence carried in a SAN extension value.
pub fn parse_san_extension(value: &[u8]) -> Result<Vec<GeneralName>, CodecError> {
    let mut outer = DerReader::new(value);
    let names = outer.read(tag::SEQUENCE)?;
    outer.finish()?;
    let mut reader = names.reader();
    let mut out = Vec::new();
    while !reader.is_empty() {
        let item = reader.read_any()?;
        if item.tag & 0xc0 != 0x80 {
            return Err(CodecError::UnsupportedSanKind(item.tag));
        }
        let kind = item.tag & 0x1f;
        let name = match kind {
            1 => GeneralName::Email(ascii(item.value)?),
            2 => GeneralName::Dns(ascii(item.value)?),
            4 if item.is_constructed() => {
                let mut inner = item.reader();
                let dn = super::name::read_name(&mut inner)?;
                inner.finish()?;
                GeneralName::DirectoryName(dn)
            }
            6 => GeneralName::Uri(ascii(item.value)?),
            7 => match item.value {
                [a, b, c, d] => GeneralName::Ip(IpAddr::V4(Ipv4Addr::new(*a, *b, *c, *d))),
                bytes if bytes.len() == 16 => {
                    let mut octets = [0u8; 16];
                    octets.copy_from_slice(bytes);
                    GeneralName::Ip(IpAddr::V6(Ipv6Addr::from(octets)))
                }
                _ => return Err(malformed("iPAddress must be 4 or 16 bytes")),
            },
            8 => GeneralName::RegisteredId(oid::decode(item.value)?),
            other => return Err(CodecError::UnsupportedSanKind(other)),
        };
        out.push(name);
    }
    Ok(out)
}

/// Encodes names as the DER `GeneralNames` sequence used as a SAN extension value.
pub fn encode_san_extension(names: &[GeneralName]) -> Result<Vec<u8>, CodecError> {
    let items = names
        .iter()
        .map(GeneralName::to_der)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(encode::sequence(&items))
}
