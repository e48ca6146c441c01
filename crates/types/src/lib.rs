// Path: crates/types/src/lib.rs
#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! # Stitch Types
//!
//! This crate is the foundational library for the Stitch ledger client,
//! containing the error taxonomy, shared data structures and configuration
//! objects.
//!
//! ## Architectural Role
//!
//! As the base crate, `stitch-types` has minimal dependencies and is itself a
//! dependency for every other crate in the workspace. Codec, crypto, transport
//! and ledger errors are all declared here so that the client can normalize
//! them through a single `SdkError` without circular dependencies.

/// A top-level, crate-wide `Result` type alias with a default error type.
pub type Result<T, E = crate::error::SdkError> = std::result::Result<T, E>;

/// Shared data structures such as `EndorsementResult` and `ChaincodeDefinition`.
pub mod app;
/// Client configuration (`ClientConfig`) loaded from TOML.
pub mod config;
/// A unified set of all error types used across the SDK.
pub mod error;
/// A prelude containing useful extension traits like `OptionExt`.
pub mod prelude;
