// Path: crates/crypto/src/der/signature.rs
//! ECDSA signature values: `SEQUENCE { r INTEGER, s INTEGER }`.

use super::{encode, left_pad, malformed, strip_leading_zeros, tag, DerReader};
use crate::error::CodecError;

/// An ECDSA signature as unsigned big-endian integers without leading zeros.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// The `r` component.
    pub r: Vec<u8>,
    /// The `s` component.
    pub s: Vec<u8>,
}

impl Signature {
    /// Builds a signature, dropping any leading zero bytes.
    pub fn new(r: &[u8], s: &[u8]) -> Self {
        Self {
            r: strip_leading_zeros(r).to_vec(),
            s: strip_leading_zeros(s).to_vec(),
        }
    }

    /// Splits the fixed-width `r || s` form.
    pub fn from_raw(raw: &[u8]) -> Result<Self, CodecError> {
        if raw.is_empty() || raw.len() % 2 != 0 {
            return Err(malformed(format!(
                "raw signature of {} bytes is not r || s",
                raw.len()
            )));
        }
        let (r, s) = raw.split_at(raw.len() / 2);
        Ok(Self::new(r, s))
    }

    /// Produces the fixed-width `r || s` form for a field of `width` bytes.
    pub fn to_raw(&self, width: usize) -> Result<Vec<u8>, CodecError> {
        if self.r.len() > width || self.s.len() > width {
            return Err(malformed(format!(
                "signature component exceeds {width} bytes"
            )));
        }
        let mut out = left_pad(&self.r, width);
        out.extend_from_slice(&left_pad(&self.s, width));
        Ok(out)
    }
}

/// Decodes a DER signature.
pub fn parse_signature(der: &[u8]) -> Result<Signature, CodecError> {
    let mut outer = DerReader::new(der);
    let seq = outer.read(tag::SEQUENCE)?;
    outer.finish()?;
    let mut fields = seq.reader();
    let r = fields.read_unsigned()?;
    let s = fields.read_unsigned()?;
    fields.finish()?;
    Ok(Signature { r, s })
}

/// Encodes a signature as DER. Callers wanting canonical output canonicalize first.
pub fn pack_signature(signature: &Signature) -> Vec<u8> {
    encode::sequence(&[
        encode::unsigned_integer(&signature.r),
        encode::unsigned_integer(&signature.s),
    ])
}
