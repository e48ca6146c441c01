// Path: crates/crypto/src/sign/canonical.rs
//! Low-S normalization of ECDSA signatures.
//!
//! Both `(r, s)` and `(r, n - s)` verify, so the ledger only accepts the form
//! with `s <= n / 2`. The arithmetic works directly on big-endian bytes.

use crate::curve::Curve;
use crate::der::signature::Signature;
use crate::der::{left_pad, strip_leading_zeros};
use std::cmp::Ordering;

fn compare(a: &[u8], b: &[u8]) -> Ordering {
    let a = strip_leading_zeros(a);
    let b = strip_leading_zeros(b);
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// `a - b` for `a >= b`.
fn subtract(a: &[u8], b: &[u8]) -> Vec<u8> {
    let width = a.len().max(b.len());
    let a = left_pad(a, width);
    let b = left_pad(b, width);
    let mut out = vec![0u8; width];
    let mut borrow = 0i16;
    for ((o, x), y) in out.iter_mut().rev().zip(a.iter().rev()).zip(b.iter().rev()) {
        let mut diff = i16::from(*x) - i16::from(*y) - borrow;
        if diff < 0 {
            diff += 256;
            borrow = 1;
        } else {
            borrow = 0;
        }
        *o = diff as u8;
    }
    strip_leading_zeros(&out).to_vec()
}

fn half(value: &[u8]) -> Vec<u8> {
    let mut out = value.to_vec();
    let mut carry = 0u8;
    for byte in out.iter_mut() {
        let low = *byte & 1;
        *byte = (*byte >> 1) | (carry << 7);
        carry = low;
    }
    strip_leading_zeros(&out).to_vec()
}

/// True when `s <= n / 2`.
pub fn is_low_s(signature: &Signature, curve: Curve) -> bool {
    compare(&signature.s, &half(curve.order())) != Ordering::Greater
}

/// Returns the low-S form of `signature`. Idempotent.
pub fn canonicalize(signature: &Signature, curve: Curve) -> Signature {
    if is_low_s(signature, curve) {
        return Signature::new(&signature.r, &signature.s);
    }
    Signature::new(&signature.r, &subtract(curve.order(), &signature.s))
}

/// `n - s`, the high-S twin of a signature. Exposed for tests of verifiers.
pub fn flip_s(signature: &Signature, curve: Curve) -> Signature {
    Signature::new(&signature.r, &subtract(curve.order(), &signature.s))
}
