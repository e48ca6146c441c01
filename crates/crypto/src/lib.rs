// Path: crates/crypto/src/lib.rs
//! # Stitch Crypto Crate Lints
//!
//! This crate enforces a strict set of lints to ensure high-quality,
//! panic-free, and well-documented code. Panics are disallowed in non-test
//! code to promote robust error handling.
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing
    )
)]
//! # Stitch Cryptography
//!
//! Key material handling for a permissioned-ledger client: a DER codec for
//! keys, certificates, CSRs and signatures; an ECDSA engine that always emits
//! low-S signatures; local encryption of cached identities; and certificate
//! trust checks against root bundles.

pub mod algorithms;
pub mod curve;
pub mod der;
pub mod error;
pub mod key_store;
pub mod pem;
pub mod sign;
pub mod trust;

pub use curve::Curve;
pub use der::key::{EcKey, KeyMaterial};
pub use der::signature::Signature;
pub use sign::ecdsa::{KeyHandle, PrivateKeyHandle, PublicKeyHandle};
