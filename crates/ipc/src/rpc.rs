// Path: crates/ipc/src/rpc.rs
//! gRPC client stubs for the endorser and ordering services.

pub use crate::orderer::atomic_broadcast_client::AtomicBroadcastClient;
pub use crate::protos::endorser_client::EndorserClient;
