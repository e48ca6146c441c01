// Path: crates/client/src/identity.rs
//! The signing identity behind proposals, envelopes and CA tokens.

use prost::Message;
use rand::{rngs::OsRng, RngCore};
use stitch_crypto::der::key::{self, KeyMaterial};
use stitch_crypto::Curve;
use stitch_crypto::key_store::StoredIdentity;
use stitch_crypto::sign::ecdsa::{pem_to_key_handle, sign_to_der, KeyHandle, PrivateKeyHandle};
use stitch_ipc::common::SignatureHeader;
use stitch_ipc::msp::SerializedIdentity;
use stitch_types::config::IdentityConfig;
use stitch_types::error::{ConfigError, CryptoError, SdkError, ValidationError};
use stitch_types::prelude::non_empty;
use std::fmt;
use std::path::Path;

/// Length of the random nonce in every signature header.
pub const NONCE_LEN: usize = 24;

/// An MSP member able to sign.
pub struct SigningIdentity {
    msp_id: String,
    cert_pem: String,
    subject: String,
    key: PrivateKeyHandle,
    creator: Vec<u8>,
}

impl fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("msp_id", &self.msp_id)
            .field("curve", &self.key.curve())
            .finish_non_exhaustive()
    }
}

impl SigningIdentity {
    /// Builds an identity, failing before any I/O when a field is missing or
    /// the key does not belong to the certificate.
    pub fn new(msp_id: &str, cert_pem: &str, key_pem: &str) -> Result<Self, SdkError> {
        let msp_id = non_empty(msp_id, "msp_id")?.to_string();
        let cert_pem = non_empty(cert_pem, "certificate")?.to_string();
        non_empty(key_pem, "private_key")?;

        let KeyHandle::Private(key) = pem_to_key_handle(key_pem)? else {
            return Err(CryptoError::PrivateKeyRequired.into());
        };
        let KeyMaterial::Certificate(cert) = key::parse(&cert_pem)? else {
            return Err(ValidationError::InvalidField {
                field: "certificate",
                reason: "PEM is not a certificate".into(),
            }
            .into());
        };
        let public = key.public_key()?.to_ec_key()?;
        if cert.public_key.curve != public.curve
            || cert.public_key.uncompressed_point() != public.uncompressed_point()
        {
            return Err(CryptoError::InvalidKey(
                "private key does not match the certificate".into(),
            )
            .into());
        }

        let creator = SerializedIdentity {
            mspid: msp_id.clone(),
            id_bytes: cert_pem.as_bytes().to_vec(),
        }
        .encode_to_vec();
        Ok(Self {
            msp_id,
            cert_pem,
            subject: cert.subject.to_string(),
            key,
            creator,
        })
    }

    /// Loads the identity named in the configuration.
    pub fn from_config(config: &IdentityConfig) -> Result<Self, SdkError> {
        let cert = read(&config.cert_path)?;
        let key = read(&config.key_path)?;
        Self::new(&config.msp_id, &cert, &key)
    }

    /// Restores an identity from the local vault.
    pub fn from_stored(stored: &StoredIdentity) -> Result<Self, SdkError> {
        Self::new(&stored.msp_id, &stored.cert, &stored.private_key)
    }

    /// The MSP id.
    pub fn msp_id(&self) -> &str {
        &self.msp_id
    }

    /// The PEM certificate.
    pub fn cert_pem(&self) -> &str {
        &self.cert_pem
    }

    /// The certificate subject, e.g. `CN=admin,OU=admin,O=Org1`.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// The curve of the signing key.
    pub fn curve(&self) -> Curve {
        self.key.curve()
    }

    /// The encoded `SerializedIdentity`.
    pub fn creator(&self) -> &[u8] {
        &self.creator
    }

    /// Signs `message` and returns a low-S DER signature.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        sign_to_der(&self.key, message)
    }

    /// A signature header with a fresh nonce.
    pub fn new_signature_header(&self) -> SignatureHeader {
        let mut nonce = vec![0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        SignatureHeader {
            creator: self.creator.clone(),
            nonce,
        }
    }
}

fn read(path: &Path) -> Result<String, SdkError> {
    std::fs::read_to_string(path).map_err(|e| {
        ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        }
        .into()
    })
}
