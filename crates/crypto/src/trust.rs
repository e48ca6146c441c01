// Path: crates/crypto/src/trust.rs
//! Checks whether a certificate was signed by one of a set of roots.

use crate::algorithms::hash;
use crate::der::cert::{parse_certificate, parse_certificate_der, CertificateInfo};
use crate::der::signature::parse_signature;
use crate::error::CryptoError;
use crate::pem::{self, PemKind};
use crate::sign::ecdsa::PublicKeyHandle;

/// True when `issuer`'s key verifies the signature on `cert`.
pub fn verify_issued_by(cert: &CertificateInfo, issuer: &CertificateInfo) -> Result<bool, CryptoError> {
    let key = PublicKeyHandle::from_ec_key(&issuer.public_key)?;
    let hasher = hash::for_signature_algorithm(&cert.signature_algorithm)?;
    let signature = parse_signature(&cert.signature)?;
    key.verify_prehash(&hasher.hash(&cert.tbs), &signature)
}

/// Returns the first root (in bundle order) whose key verifies `cert_pem`.
///
/// Each entry of `roots` may hold several concatenated PEM certificates.
/// Entries that fail to parse are skipped.
pub fn find_trusted_root(
    cert_pem: &str,
    roots: &[&str],
) -> Result<Option<CertificateInfo>, CryptoError> {
    let cert = parse_certificate(cert_pem)?;
    for bundle in roots {
        let blocks = match pem::decode_all(bundle) {
            Ok(blocks) => blocks,
            Err(e) => {
                log::warn!("skipping unreadable root bundle: {e}");
                continue;
            }
        };
        for (kind, der) in blocks {
            if kind != PemKind::Certificate {
                continue;
            }
            let root = match parse_certificate_der(&der) {
                Ok(root) => root,
                Err(e) => {
                    log::warn!("skipping malformed root certificate: {e}");
                    continue;
                }
            };
            match verify_issued_by(&cert, &root) {
                Ok(true) => {
                    log::debug!(
                        "certificate {} is trusted by root {} ({})",
                        cert.serial_hex(),
                        root.serial_hex(),
                        root.subject
                    );
                    return Ok(Some(root));
                }
                Ok(false) => {}
                Err(e) => log::debug!("root {} not usable: {e}", root.serial_hex()),
            }
        }
    }
    Ok(None)
}

/// True when any root in `roots` signed `cert_pem`.
pub fn is_trusted_root(cert_pem: &str, roots: &[&str]) -> Result<bool, CryptoError> {
    Ok(find_trusted_root(cert_pem, roots)?.is_some())
}
