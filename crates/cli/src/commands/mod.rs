// Path: crates/cli/src/commands/mod.rs

pub mod cert;
pub mod channel;
pub mod keys;
pub mod lifecycle;
