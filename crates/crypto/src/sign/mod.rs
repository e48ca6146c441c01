// Path: crates/crypto/src/sign/mod.rs
//! ECDSA signing, low-S canonicalization and X.509 issuance helpers.

pub mod canonical;
pub mod ecdsa;
pub mod x509;
