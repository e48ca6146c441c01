// Path: crates/crypto/src/pem.rs
//! PEM armor classification and encoding.

use crate::error::CodecError;

/// The PEM blocks the codec understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PemKind {
    /// `PRIVATE KEY` (PKCS#8)
    PrivateKey,
    /// `PUBLIC KEY` (SubjectPublicKeyInfo)
    PublicKey,
    /// `CERTIFICATE`
    Certificate,
    /// `CERTIFICATE REQUEST` (PKCS#10)
    CertificateRequest,
}

impl PemKind {
    /// The armor label.
    pub fn label(self) -> &'static str {
        match self {
            PemKind::PrivateKey => "PRIVATE KEY",
            PemKind::PublicKey => "PUBLIC KEY",
            PemKind::Certificate => "CERTIFICATE",
            PemKind::CertificateRequest => "CERTIFICATE REQUEST",
        }
    }

    fn from_label(label: &str) -> Result<Self, CodecError> {
        match label {
            "PRIVATE KEY" => Ok(PemKind::PrivateKey),
            "PUBLIC KEY" => Ok(PemKind::PublicKey),
            "CERTIFICATE" => Ok(PemKind::Certificate),
            "CERTIFICATE REQUEST" => Ok(PemKind::CertificateRequest),
            other => Err(CodecError::UnknownLabel(other.to_string())),
        }
    }
}

/// Decodes the first PEM block in `text`.
pub fn decode(text: &str) -> Result<(PemKind, Vec<u8>), CodecError> {
    let block = ::pem::parse(text.trim()).map_err(|e| CodecError::Pem(e.to_string()))?;
    let kind = PemKind::from_label(block.tag())?;
    Ok((kind, block.into_contents()))
}

/// Decodes every block of a concatenated bundle, in order.
pub fn decode_all(text: &str) -> Result<Vec<(PemKind, Vec<u8>)>, CodecError> {
    let blocks = ::pem::parse_many(text).map_err(|e| CodecError::Pem(e.to_string()))?;
    if blocks.is_empty() {
        return Err(CodecError::Pem("no PEM blocks found".into()));
    }
    blocks
        .into_iter()
        .map(|block| {
            let kind = PemKind::from_label(block.tag())?;
            Ok((kind, block.into_contents()))
        })
        .collect()
}

/// Armors DER with LF line endings and 64-column wrapping.
pub fn encode(kind: PemKind, der: &[u8]) -> String {
    let block = ::pem::Pem::new(kind.label(), der.to_vec());
    ::pem::encode_config(
        &block,
        ::pem::EncodeConfig::new().set_line_ending(::pem::LineEnding::LF),
    )
}

/// Normalizes armor for comparisons: trims lines, drops blanks, joins with LF.
pub fn normalize(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
