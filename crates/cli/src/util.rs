// Path: crates/cli/src/util.rs

use anyhow::{anyhow, Context, Result};
use std::path::Path;
use stitch_client::{ClientContext, GrpcTransport, SigningIdentity};
use stitch_types::config::ClientConfig;

pub fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

pub fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

pub fn write_text(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}

/// Everything a network command needs.
pub struct Session {
    pub ctx: ClientContext,
    pub transport: GrpcTransport,
    pub identity: SigningIdentity,
}

pub fn load_config(path: Option<&Path>) -> Result<ClientConfig> {
    let path = path.ok_or_else(|| anyhow!("--config (or STITCH_CONFIG) is required"))?;
    let config = ClientConfig::load(path)?;
    config.validate()?;
    Ok(config)
}

/// Loads the configuration and its default identity.
pub fn session(path: Option<&Path>) -> Result<Session> {
    let config = load_config(path)?;
    let identity_config = config
        .identity
        .clone()
        .ok_or_else(|| anyhow!("The configuration has no [identity] section"))?;
    let identity = SigningIdentity::from_config(&identity_config)?;
    tracing::debug!(msp_id = %identity.msp_id(), "loaded signing identity");
    Ok(Session {
        ctx: ClientContext::new(config),
        transport: GrpcTransport::new(),
        identity,
    })
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
