// Path: crates/crypto/src/sign/ecdsa/mod.rs
//! ECDSA over P-256, P-384 and P-521 using the RustCrypto curve crates.
//!
//! Messages are always hashed with SHA-256 before signing. Every signature
//! leaving this module is in low-S form.

use crate::algorithms::hash::sha256;
use crate::curve::Curve;
use crate::der::key::{self, EcKey, KeyMaterial};
use crate::der::left_pad;
use crate::der::signature::{pack_signature, parse_signature, Signature};
use crate::error::CryptoError;
use crate::sign::canonical::canonicalize;
use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use rand::rngs::OsRng;
use std::fmt;
use zeroize::Zeroizing;

fn invalid_key(e: impl fmt::Display) -> CryptoError {
    CryptoError::InvalidKey(e.to_string())
}

fn signing_failed(e: impl fmt::Display) -> CryptoError {
    CryptoError::SigningFailed(e.to_string())
}

fn invalid_signature(e: impl fmt::Display) -> CryptoError {
    CryptoError::InvalidSignature(e.to_string())
}

/// A native private signing key.
pub enum PrivateKeyHandle {
    /// P-256
    P256(p256::ecdsa::SigningKey),
    /// P-384
    P384(p384::ecdsa::SigningKey),
    /// P-521
    P521(p521::ecdsa::SigningKey),
}

/// A native public verification key.
#[derive(Clone)]
pub enum PublicKeyHandle {
    /// P-256
    P256(p256::ecdsa::VerifyingKey),
    /// P-384
    P384(p384::ecdsa::VerifyingKey),
    /// P-521
    P521(p521::ecdsa::VerifyingKey),
}

/// Either kind of native key, as produced from arbitrary PEM.
#[derive(Debug)]
pub enum KeyHandle {
    /// A signing key.
    Private(PrivateKeyHandle),
    /// A verification key (from a public key or a certificate).
    Public(PublicKeyHandle),
}

impl fmt::Debug for PrivateKeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKeyHandle")
            .field("curve", &self.curve())
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for PublicKeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKeyHandle")
            .field("curve", &self.curve())
            .finish_non_exhaustive()
    }
}

impl PrivateKeyHandle {
    /// Generates a fresh key.
    pub fn generate(curve: Curve) -> Self {
        match curve {
            Curve::P256 => Self::P256(p256::ecdsa::SigningKey::random(&mut OsRng)),
            Curve::P384 => Self::P384(p384::ecdsa::SigningKey::random(&mut OsRng)),
            Curve::P521 => Self::P521(p521::ecdsa::SigningKey::random(&mut OsRng)),
        }
    }

    /// Imports a private key record, checking its embedded public point if present.
    pub fn from_ec_key(material: &EcKey) -> Result<Self, CryptoError> {
        let d = material.d.as_ref().ok_or(CryptoError::PrivateKeyRequired)?;
        let scalar = Zeroizing::new(left_pad(d, material.curve.field_len()));
        let handle = match material.curve {
            Curve::P256 => {
                Self::P256(p256::ecdsa::SigningKey::from_slice(&scalar).map_err(invalid_key)?)
            }
            Curve::P384 => {
                Self::P384(p384::ecdsa::SigningKey::from_slice(&scalar).map_err(invalid_key)?)
            }
            Curve::P521 => {
                Self::P521(p521::ecdsa::SigningKey::from_slice(&scalar).map_err(invalid_key)?)
            }
        };
        if material.has_public_point() {
            let derived = handle.public_key()?.to_ec_key()?;
            if derived.x != material.x || derived.y != material.y {
                return Err(CryptoError::InvalidKey(
                    "embedded public point does not match the private scalar".into(),
                ));
            }
        }
        Ok(handle)
    }

    /// The key's curve.
    pub fn curve(&self) -> Curve {
        match self {
            Self::P256(_) => Curve::P256,
            Self::P384(_) => Curve::P384,
            Self::P521(_) => Curve::P521,
        }
    }

    /// The matching verification key.
    pub fn public_key(&self) -> Result<PublicKeyHandle, CryptoError> {
        Ok(match self {
            Self::P256(k) => PublicKeyHandle::P256(k.verifying_key().clone()),
            Self::P384(k) => PublicKeyHandle::P384(k.verifying_key().clone()),
            Self::P521(k) => {
                let point = p521::ecdsa::VerifyingKey::from(k).to_encoded_point(false);
                PublicKeyHandle::P521(
                    p521::ecdsa::VerifyingKey::from_sec1_bytes(point.as_bytes())
                        .map_err(invalid_key)?,
                )
            }
        })
    }

    /// Exports the key as a friendly record, public point included.
    pub fn to_ec_key(&self) -> Result<EcKey, CryptoError> {
        let public = self.public_key()?.to_ec_key()?;
        let d = match self {
            Self::P256(k) => k.to_bytes().to_vec(),
            Self::P384(k) => k.to_bytes().to_vec(),
            Self::P521(k) => k.to_bytes().to_vec(),
        };
        Ok(EcKey {
            curve: public.curve,
            family_oid: public.family_oid.clone(),
            curve_oid: public.curve_oid.clone(),
            x: public.x.clone(),
            y: public.y.clone(),
            d: Some(d),
        })
    }

    /// Hashes `message` with SHA-256 and signs it.
    pub fn sign(&self, message: &[u8]) -> Result<Signature, CryptoError> {
        self.sign_prehash(&sha256(message))
    }

    /// Signs an already computed digest.
    pub fn sign_prehash(&self, digest: &[u8]) -> Result<Signature, CryptoError> {
        let raw = match self {
            Self::P256(k) => {
                let sig: p256::ecdsa::Signature = k.sign_prehash(digest).map_err(signing_failed)?;
                sig.to_bytes().to_vec()
            }
            Self::P384(k) => {
                let sig: p384::ecdsa::Signature = k.sign_prehash(digest).map_err(signing_failed)?;
                sig.to_bytes().to_vec()
            }
            Self::P521(k) => {
                // The prehash must be at least half the field width.
                let padded = left_pad(digest, Curve::P521.field_len());
                let sig: p521::ecdsa::Signature =
                    k.sign_prehash(&padded).map_err(signing_failed)?;
                sig.to_bytes().to_vec()
            }
        };
        let signature = Signature::from_raw(&raw)?;
        Ok(canonicalize(&signature, self.curve()))
    }
}

impl PublicKeyHandle {
    /// Imports a public key record.
    pub fn from_ec_key(material: &EcKey) -> Result<Self, CryptoError> {
        let point = material.uncompressed_point();
        Ok(match material.curve {
            Curve::P256 => Self::P256(
                p256::ecdsa::VerifyingKey::from_sec1_bytes(&point).map_err(invalid_key)?,
            ),
            Curve::P384 => Self::P384(
                p384::ecdsa::VerifyingKey::from_sec1_bytes(&point).map_err(invalid_key)?,
            ),
            Curve::P521 => Self::P521(
                p521::ecdsa::VerifyingKey::from_sec1_bytes(&point).map_err(invalid_key)?,
            ),
        })
    }

    /// The key's curve.
    pub fn curve(&self) -> Curve {
        match self {
            Self::P256(_) => Curve::P256,
            Self::P384(_) => Curve::P384,
            Self::P521(_) => Curve::P521,
        }
    }

    /// Exports the key as a friendly record.
    pub fn to_ec_key(&self) -> Result<EcKey, CryptoError> {
        let point = match self {
            Self::P256(k) => k.to_encoded_point(false).as_bytes().to_vec(),
            Self::P384(k) => k.to_encoded_point(false).as_bytes().to_vec(),
            Self::P521(k) => k.to_encoded_point(false).as_bytes().to_vec(),
        };
        let curve = self.curve();
        let coordinates = point
            .split_first()
            .map(|(_, rest)| rest)
            .ok_or_else(|| invalid_key("empty encoded point"))?;
        if coordinates.len() != curve.field_len() * 2 {
            return Err(invalid_key("encoded point has unexpected width"));
        }
        let (x, y) = coordinates.split_at(curve.field_len());
        Ok(EcKey::public(curve, x.to_vec(), y.to_vec()))
    }

    /// Hashes `message` with SHA-256 and verifies `signature` over it.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<bool, CryptoError> {
        self.verify_prehash(&sha256(message), signature)
    }

    /// Verifies `signature` over an already computed digest.
    pub fn verify_prehash(&self, digest: &[u8], signature: &Signature) -> Result<bool, CryptoError> {
        let raw = signature.to_raw(self.curve().field_len())?;
        Ok(match self {
            Self::P256(k) => {
                let native = p256::ecdsa::Signature::from_slice(&raw).map_err(invalid_signature)?;
                k.verify_prehash(digest, &native).is_ok()
            }
            Self::P384(k) => {
                let native = p384::ecdsa::Signature::from_slice(&raw).map_err(invalid_signature)?;
                k.verify_prehash(digest, &native).is_ok()
            }
            Self::P521(k) => {
                let native = p521::ecdsa::Signature::from_slice(&raw).map_err(invalid_signature)?;
                let padded = left_pad(digest, Curve::P521.field_len());
                k.verify_prehash(&padded, &native).is_ok()
            }
        })
    }
}

impl KeyHandle {
    /// The verification half of either variant.
    pub fn public_key(&self) -> Result<PublicKeyHandle, CryptoError> {
        match self {
            KeyHandle::Private(k) => k.public_key(),
            KeyHandle::Public(k) => Ok(k.clone()),
        }
    }

    /// The signing key, if this is one.
    pub fn private_key(&self) -> Option<&PrivateKeyHandle> {
        match self {
            KeyHandle::Private(k) => Some(k),
            KeyHandle::Public(_) => None,
        }
    }
}

/// Converts key material into a native handle.
pub fn key_material_to_handle(material: &KeyMaterial) -> Result<KeyHandle, CryptoError> {
    match material {
        KeyMaterial::Private(k) => PrivateKeyHandle::from_ec_key(k).map(KeyHandle::Private),
        KeyMaterial::Public(k) => PublicKeyHandle::from_ec_key(k).map(KeyHandle::Public),
        KeyMaterial::Certificate(c) => {
            PublicKeyHandle::from_ec_key(&c.public_key).map(KeyHandle::Public)
        }
    }
}

/// Parses a PEM private key, public key or certificate into a native handle.
pub fn pem_to_key_handle(pem: &str) -> Result<KeyHandle, CryptoError> {
    let material = key::parse(pem)?;
    let handle = key_material_to_handle(&material)?;
    log::debug!(
        "imported {} {} key",
        handle.public_key()?.curve(),
        match handle {
            KeyHandle::Private(_) => "private",
            KeyHandle::Public(_) => "public",
        }
    );
    Ok(handle)
}

/// Signs `message` (SHA-256) and returns the low-S signature.
pub fn sign(handle: &PrivateKeyHandle, message: &[u8]) -> Result<Signature, CryptoError> {
    handle.sign(message)
}

/// Verifies a signature over `message` (SHA-256).
pub fn verify(
    handle: &PublicKeyHandle,
    signature: &Signature,
    message: &[u8],
) -> Result<bool, CryptoError> {
    handle.verify(message, signature)
}

/// Canonicalizes then DER-packs a signature.
pub fn signature_to_der(signature: &Signature, curve: Curve) -> Vec<u8> {
    pack_signature(&canonicalize(signature, curve))
}

/// Decodes a DER signature.
pub fn der_to_signature(der: &[u8]) -> Result<Signature, CryptoError> {
    Ok(parse_signature(der)?)
}

/// Signs `message` and returns the canonical DER signature in one step.
pub fn sign_to_der(handle: &PrivateKeyHandle, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let signature = handle.sign(message)?;
    Ok(signature_to_der(&signature, handle.curve()))
}

/// Exports a private key as PKCS#8 PEM.
pub fn export_private_pem(handle: &PrivateKeyHandle) -> Result<String, CryptoError> {
    Ok(key::pack(&KeyMaterial::Private(handle.to_ec_key()?))?)
}

/// Exports a public key as SPKI PEM.
pub fn export_public_pem(handle: &PublicKeyHandle) -> Result<String, CryptoError> {
    Ok(key::pack(&KeyMaterial::Public(handle.to_ec_key()?))?)
}

#[cfg(test)]
mod tests;
