// Path: crates/client/src/lib.rs
//! # Stitch Client Crate Lints
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
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! # Stitch Client
//!
//! Builds signed proposals, gathers endorsements from peers, submits
//! transactions to the ordering service and drives the chaincode lifecycle.

pub mod ca;
pub mod collections;
pub mod config_update;
pub mod context;
pub mod identity;
pub mod lifecycle;
pub mod normalize;
pub mod participation;
pub mod pipeline;
pub mod policy;
pub mod proposal;
mod rest;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use context::ClientContext;
pub use identity::SigningIdentity;
pub use lifecycle::Lifecycle;
pub use normalize::{NormalizedResponse, OperationError};
pub use pipeline::Pipeline;
pub use transport::{GrpcTransport, LedgerTransport};
