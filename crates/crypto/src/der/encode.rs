// Path: crates/crypto/src/der/encode.rs
//! Builders for DER elements.

use super::{oid, strip_leading_zeros, tag};
use crate::error::CodecError;

fn push_length(out: &mut Vec<u8>, len: usize) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }
    let bytes = len.to_be_bytes();
    let significant = strip_leading_zeros(&bytes);
    out.push(0x80 | significant.len() as u8);
    out.extend_from_slice(significant);
}

/// Encodes one element with an arbitrary identifier octet.
pub fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len() + 6);
    out.push(tag);
    push_length(&mut out, content.len());
    out.extend_from_slice(content);
    out
}

/// SEQUENCE over already-encoded elements, in order.
pub fn sequence(items: &[Vec<u8>]) -> Vec<u8> {
    tlv(tag::SEQUENCE, &items.concat())
}

/// SET OF over already-encoded elements, sorted as DER requires.
pub fn set_of(items: &[Vec<u8>]) -> Vec<u8> {
    let mut sorted = items.to_vec();
    sorted.sort();
    tlv(tag::SET, &sorted.concat())
}

/// INTEGER from unsigned big-endian bytes, minimal and non-negative.
pub fn unsigned_integer(bytes: &[u8]) -> Vec<u8> {
    let digits = strip_leading_zeros(bytes);
    let mut content = Vec::with_capacity(digits.len() + 1);
    match digits.first() {
        None => content.push(0),
        Some(first) if first & 0x80 != 0 => {
            content.push(0);
            content.extend_from_slice(digits);
        }
        Some(_) => content.extend_from_slice(digits),
    }
    tlv(tag::INTEGER, &content)
}

/// INTEGER from a small non-negative value.
pub fn small_integer(value: u64) -> Vec<u8> {
    unsigned_integer(&value.to_be_bytes())
}

/// NULL
pub fn null() -> Vec<u8> {
    tlv(tag::NULL, &[])
}

/// OBJECT IDENTIFIER from dotted form.
pub fn object_identifier(dotted: &str) -> Result<Vec<u8>, CodecError> {
    Ok(tlv(tag::OID, &oid::encode(dotted)?))
}

/// OCTET STRING
pub fn octet_string(bytes: &[u8]) -> Vec<u8> {
    tlv(tag::OCTET_STRING, bytes)
}

/// BIT STRING with zero unused bits.
pub fn bit_string(bytes: &[u8]) -> Vec<u8> {
    let mut content = Vec::with_capacity(bytes.len() + 1);
    content.push(0);
    content.extend_from_slice(bytes);
    tlv(tag::BIT_STRING, &content)
}

/// `[number] EXPLICIT` wrapping a complete inner element.
pub fn explicit(number: u8, inner: &[u8]) -> Vec<u8> {
    tlv(tag::context(number, true), inner)
}

/// `[number] IMPLICIT`, replacing the inner element's tag.
pub fn implicit(number: u8, constructed: bool, content: &[u8]) -> Vec<u8> {
    tlv(tag::context(number, constructed), content)
}

/// A string element with the given universal string tag.
pub fn string(string_tag: u8, value: &str) -> Vec<u8> {
    tlv(string_tag, value.as_bytes())
}

/// AlgorithmIdentifier for an ECDSA signature algorithm (no parameters).
pub fn signature_algorithm(dotted: &str) -> Result<Vec<u8>, CodecError> {
    Ok(sequence(&[object_identifier(dotted)?]))
}
