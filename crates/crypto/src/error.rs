// Path: crates/crypto/src/error.rs
//! Local error types for the `stitch-crypto` crate.

// Re-export the canonical error types from the types crate.
pub use stitch_types::error::{CodecError, CryptoError};
