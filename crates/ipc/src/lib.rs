// Path: crates/ipc/src/lib.rs
//! # Stitch IPC
//!
//! The protocol schema boundary of the client:
//! 1. **Messages**: `prost` structs generated from `proto/` for envelopes,
//!    proposals, lifecycle arguments, policies and channel configuration.
//! 2. **Stubs**: `tonic` clients for the endorser and ordering services.
//!
//! Each module mirrors one proto package, so cross-package references in the
//! generated code resolve through sibling modules.

/// Identities and principals.
pub mod msp {
    tonic::include_proto!("msp");
}

/// Envelopes, headers, blocks, channel configuration and policies.
pub mod common {
    tonic::include_proto!("common");
}

/// Proposals, responses, transactions, collections and the endorser service.
pub mod protos {
    tonic::include_proto!("protos");
}

// The peer package is named `protos` on the wire; expose it by role.
pub use protos as peer;

/// Broadcast and deliver messages and the ordering service.
pub mod orderer {
    tonic::include_proto!("orderer");
}

/// Arguments and results of the `_lifecycle` system chaincode.
pub mod lifecycle {
    tonic::include_proto!("lifecycle");
}

pub mod rpc;

pub use prost::Message;

#[cfg(test)]
mod tests;
