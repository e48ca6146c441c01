// Path: crates/crypto/src/der/mod.rs
//! A small DER reader and writer covering the ASN.1 used by ledger identities.
//!
//! The reader borrows from the input and hands out [`Tlv`] views that keep the
//! full raw encoding, which is what signature checks over `tbsCertificate` and
//! `certificationRequestInfo` need. The writer in [`encode`] builds owned
//! buffers and supports context-specific tag overrides directly, so callers
//! never patch bytes after encoding.

pub mod cert;
pub mod csr;
pub mod encode;
pub mod key;
pub mod name;
pub mod oid;
pub mod san;
pub mod signature;

use crate::error::CodecError;

/// Universal tags used by the codec.
pub mod tag {
    /// BOOLEAN
    pub const BOOLEAN: u8 = 0x01;
    /// INTEGER
    pub const INTEGER: u8 = 0x02;
    /// BIT STRING
    pub const BIT_STRING: u8 = 0x03;
    /// OCTET STRING
    pub const OCTET_STRING: u8 = 0x04;
    /// NULL
    pub const NULL: u8 = 0x05;
    /// OBJECT IDENTIFIER
    pub const OID: u8 = 0x06;
    /// UTF8String
    pub const UTF8_STRING: u8 = 0x0c;
    /// PrintableString
    pub const PRINTABLE_STRING: u8 = 0x13;
    /// TeletexString (T61)
    pub const TELETEX_STRING: u8 = 0x14;
    /// IA5String
    pub const IA5_STRING: u8 = 0x16;
    /// UTCTime
    pub const UTC_TIME: u8 = 0x17;
    /// GeneralizedTime
    pub const GENERALIZED_TIME: u8 = 0x18;
    /// UniversalString (UCS-4)
    pub const UNIVERSAL_STRING: u8 = 0x1c;
    /// BMPString (UCS-2)
    pub const BMP_STRING: u8 = 0x1e;
    /// SEQUENCE / SEQUENCE OF
    pub const SEQUENCE: u8 = 0x30;
    /// SET / SET OF
    pub const SET: u8 = 0x31;

    /// Builds a context-specific tag `[number]`.
    pub const fn context(number: u8, constructed: bool) -> u8 {
        let form = if constructed { 0x20 } else { 0x00 };
        0x80 | form | (number & 0x1f)
    }
}

pub(crate) fn malformed(reason: impl Into<String>) -> CodecError {
    CodecError::Der(reason.into())
}

/// One decoded tag-length-value element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tlv<'a> {
    /// The identifier octet.
    pub tag: u8,
    /// The content octets.
    pub value: &'a [u8],
    /// The complete encoding, header included.
    pub raw: &'a [u8],
}

impl<'a> Tlv<'a> {
    /// A reader over this element's content.
    pub fn reader(&self) -> DerReader<'a> {
        DerReader::new(self.value)
    }

    /// True for a context-specific tag with the given number.
    pub fn is_context(&self, number: u8) -> bool {
        self.tag & 0xc0 == 0x80 && self.tag & 0x1f == number
    }

    /// True when the constructed bit is set.
    pub fn is_constructed(&self) -> bool {
        self.tag & 0x20 != 0
    }
}

/// A forward-only reader over concatenated DER elements.
#[derive(Debug, Clone)]
pub struct DerReader<'a> {
    data: &'a [u8],
}

impl<'a> DerReader<'a> {
    /// Reads from `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// True when all input has been consumed.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The identifier octet of the next element, if any.
    pub fn peek_tag(&self) -> Option<u8> {
        self.data.first().copied()
    }

    /// Reads the next element whatever its tag.
    pub fn read_any(&mut self) -> Result<Tlv<'a>, CodecError> {
        let input = self.data;
        let (&tag, rest) = input
            .split_first()
            .ok_or_else(|| malformed("unexpected end of input"))?;
        if tag & 0x1f == 0x1f {
            return Err(malformed("multi-byte tag numbers are not supported"));
        }
        let (&first, rest) = rest
            .split_first()
            .ok_or_else(|| malformed("missing length octet"))?;
        let (len, rest) = if first < 0x80 {
            (usize::from(first), rest)
        } else {
            let count = usize::from(first & 0x7f);
            if count == 0 {
                return Err(malformed("indefinite length is not allowed in DER"));
            }
            if count > 4 {
                return Err(malformed(format!("length of {count} octets is too large")));
            }
            if rest.len() < count {
                return Err(malformed("truncated length"));
            }
            let (len_bytes, rest) = rest.split_at(count);
            let len = len_bytes
                .iter()
                .fold(0usize, |acc, b| (acc << 8) | usize::from(*b));
            (len, rest)
        };
        if rest.len() < len {
            return Err(malformed(format!(
                "element claims {len} bytes but only {} remain",
                rest.len()
            )));
        }
        let (value, remaining) = rest.split_at(len);
        let total = input.len() - remaining.len();
        let (raw, _) = input.split_at(total);
        self.data = remaining;
        Ok(Tlv { tag, value, raw })
    }

    /// Reads the next element and checks its tag.
    pub fn read(&mut self, expected: u8) -> Result<Tlv<'a>, CodecError> {
        let tlv = self.read_any()?;
        if tlv.tag != expected {
            return Err(CodecError::UnexpectedTag {
                expected,
                got: tlv.tag,
            });
        }
        Ok(tlv)
    }

    /// Reads the next element only if it carries `expected`.
    pub fn read_optional(&mut self, expected: u8) -> Result<Option<Tlv<'a>>, CodecError> {
        if self.peek_tag() == Some(expected) {
            self.read(expected).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Reads an INTEGER as unsigned big-endian bytes with the leading zero run removed.
    pub fn read_unsigned(&mut self) -> Result<Vec<u8>, CodecError> {
        let tlv = self.read(tag::INTEGER)?;
        if tlv.value.is_empty() {
            return Err(malformed("empty INTEGER"));
        }
        Ok(strip_leading_zeros(tlv.value).to_vec())
    }

    /// Reads a small non-negative INTEGER such as a version number.
    pub fn read_small(&mut self) -> Result<u64, CodecError> {
        let bytes = self.read_unsigned()?;
        if bytes.len() > 8 {
            return Err(malformed("INTEGER does not fit in 64 bits"));
        }
        Ok(bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
    }

    /// Reads an OBJECT IDENTIFIER in dotted form.
    pub fn read_oid(&mut self) -> Result<String, CodecError> {
        let tlv = self.read(tag::OID)?;
        oid::decode(tlv.value)
    }

    /// Reads a BIT STRING, requiring zero unused bits, and returns the payload.
    pub fn read_bit_string(&mut self) -> Result<&'a [u8], CodecError> {
        let tlv = self.read(tag::BIT_STRING)?;
        let (&unused, payload) = tlv
            .value
            .split_first()
            .ok_or_else(|| malformed("empty BIT STRING"))?;
        if unused != 0 {
            return Err(malformed("BIT STRING with unused bits"));
        }
        Ok(payload)
    }

    /// Fails if any input is left.
    pub fn finish(&self) -> Result<(), CodecError> {
        if self.data.is_empty() {
            Ok(())
        } else {
            Err(malformed(format!(
                "{} trailing bytes after structure",
                self.data.len()
            )))
        }
    }
}

/// Returns `bytes` without its leading run of zero octets.
pub fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| *b != 0)
        .unwrap_or(bytes.len());
    let (_, rest) = bytes.split_at(start);
    rest
}

/// Left-pads `bytes` with zeros to `width`. Longer inputs are returned as-is.
pub fn left_pad(bytes: &[u8], width: usize) -> Vec<u8> {
    if bytes.len() >= width {
        return bytes.to_vec();
    }
    let mut out = vec![0u8; width - bytes.len()];
    out.extend_from_slice(bytes);
    out
}

/// Parses a DER UTCTime or GeneralizedTime into UTC.
pub fn parse_time(tlv: &Tlv<'_>) -> Result<chrono::DateTime<chrono::Utc>, CodecError> {
    let text = std::str::from_utf8(tlv.value).map_err(|_| malformed("non-ASCII time"))?;
    let full = match tlv.tag {
        tag::UTC_TIME => {
            let yy: u32 = text
                .get(0..2)
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| malformed(format!("bad UTCTime '{text}'")))?;
            let century = if yy < 50 { "20" } else { "19" };
            format!("{century}{text}")
        }
        tag::GENERALIZED_TIME => text.to_string(),
        other => {
            return Err(CodecError::UnexpectedTag {
                expected: tag::UTC_TIME,
                got: other,
            })
        }
    };
    chrono::NaiveDateTime::parse_from_str(&full, "%Y%m%d%H%M%SZ")
        .map(|t| t.and_utc())
        .map_err(|e| malformed(format!("bad time '{text}': {e}")))
}

#[cfg(test)]
mod tests;
