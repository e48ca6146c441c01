// Path: crates/types/src/error/mod.rs
//! Core error types for the Stitch ledger client.
//!
//! Every subsystem has its own enum so that callers can match precisely, and
//! `SdkError` unifies them for the public entry points. Each enum implements
//! [`ErrorCode`] so that logs and metrics carry a stable identifier.

use crate::app::status;
use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// Errors raised while parsing or packing PEM/DER structures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The PEM armor could not be decoded.
    #[error("Malformed PEM: {0}")]
    Pem(String),
    /// The PEM label is not one this codec understands.
    #[error("Unrecognized PEM label '{0}'")]
    UnknownLabel(String),
    /// The DER structure is truncated or otherwise invalid.
    #[error("Malformed DER: {0}")]
    Der(String),
    /// A TLV carried a different tag than the structure requires.
    #[error("Unexpected DER tag: expected 0x{expected:02x}, got 0x{got:02x}")]
    UnexpectedTag {
        /// The tag the decoder was looking for.
        expected: u8,
        /// The tag actually found in the input.
        got: u8,
    },
    /// The named curve is not P-256, P-384 or P-521.
    #[error("Unsupported curve: {0}")]
    UnsupportedCurve(String),
    /// The key or signature algorithm OID is not supported.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
    /// A subject alternative name used a context tag outside the supported set.
    #[error("Unsupported subject alternative name kind [{0}]")]
    UnsupportedSanKind(u8),
    /// A distinguished name string or structure could not be interpreted.
    #[error("Invalid distinguished name: {0}")]
    InvalidName(String),
    /// The public point was not an uncompressed point of the curve's width.
    #[error("Invalid point encoding: {0}")]
    InvalidPoint(String),
}

impl ErrorCode for CodecError {
    fn code(&self) -> &'static str {
        match self {
            Self::Pem(_) => "CODEC_MALFORMED_PEM",
            Self::UnknownLabel(_) => "CODEC_UNKNOWN_LABEL",
            Self::Der(_) => "CODEC_MALFORMED_DER",
            Self::UnexpectedTag { .. } => "CODEC_UNEXPECTED_TAG",
            Self::UnsupportedCurve(_) => "CODEC_UNSUPPORTED_CURVE",
            Self::UnsupportedAlgorithm(_) => "CODEC_UNSUPPORTED_ALGORITHM",
            Self::UnsupportedSanKind(_) => "CODEC_UNSUPPORTED_SAN_KIND",
            Self::InvalidName(_) => "CODEC_INVALID_NAME",
            Self::InvalidPoint(_) => "CODEC_INVALID_POINT",
        }
    }
}

/// Errors from cryptographic operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// The provided key material is malformed or invalid for the specified curve.
    #[error("Invalid cryptographic key: {0}")]
    InvalidKey(String),
    /// The provided signature material is malformed.
    #[error("Invalid signature format: {0}")]
    InvalidSignature(String),
    /// The signing primitive refused to produce a signature.
    #[error("Signing failed: {0}")]
    SigningFailed(String),
    /// A public key handle was supplied where a private key is required.
    #[error("Operation requires a private key")]
    PrivateKeyRequired,
    /// Local authenticated encryption failed.
    #[error("Encryption failed: {0}")]
    Encryption(String),
    /// Local decryption failed, either authentication or padding.
    #[error("Decryption failed: {0}")]
    Decryption(String),
    /// The local key/value store could not be read or written.
    #[error("Local store error: {0}")]
    Store(String),
    /// A certificate could not be issued locally.
    #[error("Certificate issuance failed: {0}")]
    Issuance(String),
    /// An underlying codec failure.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

impl ErrorCode for CryptoError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidKey(_) => "CRYPTO_INVALID_KEY",
            Self::InvalidSignature(_) => "CRYPTO_INVALID_SIGNATURE",
            Self::SigningFailed(_) => "CRYPTO_SIGNING_FAILED",
            Self::PrivateKeyRequired => "CRYPTO_PRIVATE_KEY_REQUIRED",
            Self::Encryption(_) => "CRYPTO_ENCRYPTION_FAILED",
            Self::Decryption(_) => "CRYPTO_DECRYPTION_FAILED",
            Self::Store(_) => "CRYPTO_STORE_ERROR",
            Self::Issuance(_) => "CRYPTO_ISSUANCE_FAILED",
            Self::Codec(_) => "CRYPTO_CODEC_ERROR",
        }
    }
}

/// Errors produced by the gRPC and HTTP transports.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The remote returned a non-OK gRPC status.
    #[error("RPC to {url} failed with status {code}: {message}")]
    Rpc {
        /// The node URL.
        url: String,
        /// The gRPC status code.
        code: i32,
        /// The status message.
        message: String,
    },
    /// The connection could not be established (DNS, TCP, TLS, proxy).
    #[error("Connection to {url} failed: {message}")]
    Connection {
        /// The node URL.
        url: String,
        /// The underlying error text.
        message: String,
    },
    /// The client-side deadline expired before a response arrived.
    #[error("Request to {url} timed out after {timeout_ms}ms")]
    Timeout {
        /// The node URL.
        url: String,
        /// The deadline that was applied.
        timeout_ms: u64,
    },
    /// An HTTP endpoint answered with a non-success status.
    #[error("HTTP request to {url} failed with status {status}: {message}")]
    Http {
        /// The request URL.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// The response body or error text.
        message: String,
    },
    /// The node URL could not be parsed into an endpoint.
    #[error("Invalid endpoint '{0}'")]
    InvalidEndpoint(String),
    /// A response stream ended before the expected message.
    #[error("Stream from {url} closed before a response was received")]
    StreamClosed {
        /// The node URL.
        url: String,
    },
}

impl TransportError {
    /// The numeric status carried by this error, synthesizing gRPC codes where
    /// the transport itself did not provide one.
    pub fn status(&self) -> i32 {
        match self {
            Self::Rpc { code, .. } => *code,
            Self::Connection { .. } | Self::StreamClosed { .. } => status::UNAVAILABLE,
            Self::Timeout { .. } => status::DEADLINE_EXCEEDED,
            Self::Http { status, .. } => i32::from(*status),
            Self::InvalidEndpoint(_) => status::INVALID_ARGUMENT,
        }
    }

    /// The URL of the node the failed request targeted, if known.
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Rpc { url, .. }
            | Self::Connection { url, .. }
            | Self::Timeout { url, .. }
            | Self::Http { url, .. }
            | Self::StreamClosed { url } => Some(url),
            Self::InvalidEndpoint(_) => None,
        }
    }

    /// The raw message text reported by the transport.
    pub fn message(&self) -> String {
        match self {
            Self::Rpc { message, .. }
            | Self::Connection { message, .. }
            | Self::Http { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl ErrorCode for TransportError {
    fn code(&self) -> &'static str {
        match self {
            Self::Rpc { .. } => "TRANSPORT_RPC_STATUS",
            Self::Connection { .. } => "TRANSPORT_CONNECTION_FAILED",
            Self::Timeout { .. } => "TRANSPORT_TIMEOUT",
            Self::Http { .. } => "TRANSPORT_HTTP_STATUS",
            Self::InvalidEndpoint(_) => "TRANSPORT_INVALID_ENDPOINT",
            Self::StreamClosed { .. } => "TRANSPORT_STREAM_CLOSED",
        }
    }
}

/// Errors reported by the ledger itself: peers, orderers and the CA.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// An endorser answered with an application status outside the success range.
    #[error("Proposal rejected by {peer} with status {status}: {message}")]
    ProposalRejected {
        /// The endorsing peer.
        peer: String,
        /// The application status.
        status: i32,
        /// The application message.
        message: String,
    },
    /// A transport success whose message reveals an application failure.
    #[error("Response from {peer} reported success but carried an error (code {code}): {message}")]
    LiarSuccess {
        /// The endorsing peer.
        peer: String,
        /// The reclassified status code.
        code: i32,
        /// The original message.
        message: String,
    },
    /// The ordering service refused the envelope.
    #[error("Envelope rejected by {orderer} with status {status}: {info}")]
    OrderRejected {
        /// The orderer URL.
        orderer: String,
        /// The orderer status (common.Status).
        status: i32,
        /// The informational message.
        info: String,
    },
    /// The deliver service ended the stream with a non-success status.
    #[error("Deliver from {orderer} ended with status {status}")]
    DeliverRejected {
        /// The orderer URL.
        orderer: String,
        /// The orderer status (common.Status).
        status: i32,
    },
    /// A response payload could not be decoded.
    #[error("Failed to decode ledger response: {0}")]
    Decode(String),
    /// Not a single endorser produced a usable response.
    #[error("No successful endorsements ({failures} failed)")]
    NoEndorsements {
        /// Number of peers that failed.
        failures: usize,
    },
    /// The certificate authority answered with an error body.
    #[error("Certificate authority error {code}: {message}")]
    Authority {
        /// The CA error code.
        code: i32,
        /// The CA error message.
        message: String,
    },
}

impl LedgerError {
    /// The numeric status to report for this failure.
    pub fn status(&self) -> i32 {
        match self {
            Self::ProposalRejected { status, .. }
            | Self::OrderRejected { status, .. }
            | Self::DeliverRejected { status, .. } => *status,
            Self::LiarSuccess { code, .. } => *code,
            Self::Decode(_) => status::INTERNAL,
            Self::NoEndorsements { .. } => status::FAILED_PRECONDITION,
            Self::Authority { code, .. } => *code,
        }
    }
}

impl ErrorCode for LedgerError {
    fn code(&self) -> &'static str {
        match self {
            Self::ProposalRejected { .. } => "LEDGER_PROPOSAL_REJECTED",
            Self::LiarSuccess { .. } => "LEDGER_LIAR_SUCCESS",
            Self::OrderRejected { .. } => "LEDGER_ORDER_REJECTED",
            Self::DeliverRejected { .. } => "LEDGER_DELIVER_REJECTED",
            Self::Decode(_) => "LEDGER_DECODE_FAILED",
            Self::NoEndorsements { .. } => "LEDGER_NO_ENDORSEMENTS",
            Self::Authority { .. } => "LEDGER_AUTHORITY_ERROR",
        }
    }
}

impl From<prost::DecodeError> for LedgerError {
    fn from(e: prost::DecodeError) -> Self {
        LedgerError::Decode(e.to_string())
    }
}

/// A single peer that failed during a partial-failure-tolerant fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndorsementFailure {
    /// The peer name or URL.
    pub peer: String,
    /// The status the failure was classified as.
    pub status: i32,
    /// The failure message.
    pub message: String,
}

/// Soft failures collected next to a partial success.
#[derive(Error, Debug, Clone, PartialEq, Eq, Default)]
#[error("{} endorsing peer(s) failed: {}", .failures.len(), summarize(.failures))]
pub struct PartialEndorsementError {
    /// The failed peers, in request order.
    pub failures: Vec<EndorsementFailure>,
}

impl PartialEndorsementError {
    /// True when no peer failed.
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of failed peers.
    pub fn len(&self) -> usize {
        self.failures.len()
    }
}

fn summarize(failures: &[EndorsementFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({}): {}", f.peer, f.status, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ErrorCode for PartialEndorsementError {
    fn code(&self) -> &'static str {
        "ENDORSEMENT_PARTIAL_FAILURE"
    }
}

/// Caller input problems detected before any network I/O.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was absent or empty.
    #[error("Missing required field '{0}'")]
    MissingField(&'static str),
    /// A field was present but unusable.
    #[error("Invalid value for '{field}': {reason}")]
    InvalidField {
        /// The offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
    /// A policy expression could not be parsed.
    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),
    /// A state machine was asked to move backwards or skip a state.
    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition {
        /// The current state.
        from: String,
        /// The requested state.
        to: String,
    },
}

impl ErrorCode for ValidationError {
    fn code(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "VALIDATION_MISSING_FIELD",
            Self::InvalidField { .. } => "VALIDATION_INVALID_FIELD",
            Self::InvalidPolicy(_) => "VALIDATION_INVALID_POLICY",
            Self::InvalidTransition { .. } => "VALIDATION_INVALID_TRANSITION",
        }
    }
}

/// Errors raised while loading configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config {path}: {message}")]
    Io {
        /// The path that was read.
        path: String,
        /// The IO error text.
        message: String,
    },
    /// The configuration could not be parsed.
    #[error("Failed to parse config: {0}")]
    Parse(String),
    /// The configuration parsed but is inconsistent.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl ErrorCode for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            Self::Io { .. } => "CONFIG_IO_ERROR",
            Self::Parse(_) => "CONFIG_PARSE_ERROR",
            Self::Invalid(_) => "CONFIG_INVALID",
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e.to_string())
    }
}

/// The umbrella error returned by the SDK's public operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SdkError {
    /// See [`CodecError`].
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// See [`CryptoError`].
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    /// See [`TransportError`].
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// See [`LedgerError`].
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    /// See [`PartialEndorsementError`].
    #[error(transparent)]
    PartialEndorsement(#[from] PartialEndorsementError),
    /// See [`ValidationError`].
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// See [`ConfigError`].
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SdkError {
    /// The numeric status a caller should see for this error.
    pub fn status(&self) -> i32 {
        match self {
            Self::Codec(_) | Self::Validation(_) | Self::Config(_) => status::INVALID_ARGUMENT,
            Self::Crypto(_) => status::INTERNAL,
            Self::Transport(e) => e.status(),
            Self::Ledger(e) => e.status(),
            Self::PartialEndorsement(_) => status::ABORTED,
        }
    }
}

impl ErrorCode for SdkError {
    fn code(&self) -> &'static str {
        match self {
            Self::Codec(e) => e.code(),
            Self::Crypto(e) => e.code(),
            Self::Transport(e) => e.code(),
            Self::Ledger(e) => e.code(),
            Self::PartialEndorsement(e) => e.code(),
            Self::Validation(e) => e.code(),
            Self::Config(e) => e.code(),
        }
    }
}

impl From<prost::DecodeError> for SdkError {
    fn from(e: prost::DecodeError) -> Self {
        SdkError::Ledger(e.into())
    }
}

#[cfg(test)]
mod tests;
