// Path: crates/crypto/src/algorithms/hash/mod.rs
//! Cryptographic hash functions using the RustCrypto `sha2` crate.

use crate::der::oid;
use crate::error::CodecError;
use sha2::{Digest, Sha256, Sha384};

/// Hash function trait
pub trait HashFunction {
    /// Hash a message and return the digest
    fn hash(&self, message: &[u8]) -> Vec<u8>;

    /// Get the digest size in bytes
    fn digest_size(&self) -> usize;

    /// Get the name of the hash function
    fn name(&self) -> &str;
}

/// SHA-256 hash function implementation
#[derive(Default, Clone, Copy, Debug)]
pub struct Sha256Hash;

impl HashFunction for Sha256Hash {
    fn hash(&self, message: &[u8]) -> Vec<u8> {
        Sha256::digest(message).to_vec()
    }

    fn digest_size(&self) -> usize {
        32
    }

    fn name(&self) -> &str {
        "SHA-256"
    }
}

/// SHA-384 hash function implementation
#[derive(Default, Clone, Copy, Debug)]
pub struct Sha384Hash;

impl HashFunction for Sha384Hash {
    fn hash(&self, message: &[u8]) -> Vec<u8> {
        Sha384::digest(message).to_vec()
    }

    fn digest_size(&self) -> usize {
        48
    }

    fn name(&self) -> &str {
        "SHA-384"
    }
}

/// Selects the message hash for an ECDSA signature algorithm OID.
pub fn for_signature_algorithm(algorithm: &str) -> Result<Box<dyn HashFunction>, CodecError> {
    match algorithm {
        oid::ECDSA_WITH_SHA256 => Ok(Box::new(Sha256Hash)),
        oid::ECDSA_WITH_SHA384 => Ok(Box::new(Sha384Hash)),
        other => Err(CodecError::UnsupportedAlgorithm(other.to_string())),
    }
}

/// SHA-256 of any byte slice.
pub fn sha256<T: AsRef<[u8]>>(data: T) -> [u8; 32] {
    Sha256::digest(data.as_ref()).into()
}
