// Path: crates/types/src/config/mod.rs

//! Shared configuration structures for the Stitch client.
//!
//! A `ClientConfig` is usually loaded once from a TOML file and handed to the
//! client context, which owns it for the rest of the process.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The hard ceiling on concurrent endorsement requests per fan-out.
pub const MAX_ENDORSEMENT_CONCURRENCY: usize = 4;

/// The RPC families that carry their own client-side deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcKind {
    /// `ProcessProposal` on an endorsing peer.
    Endorse,
    /// `Broadcast` on an orderer.
    Order,
    /// `Deliver` on an orderer.
    Deliver,
    /// `InstallChaincode`, which uploads the whole package.
    Install,
    /// Certificate authority REST calls.
    Ca,
    /// Channel participation REST calls.
    Participation,
}

/// Per-operation client-side deadlines, in milliseconds.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Deadline for a single endorsement.
    #[serde(default = "default_endorse_ms")]
    pub endorse_ms: u64,
    /// Deadline for a broadcast round-trip.
    #[serde(default = "default_order_ms")]
    pub order_ms: u64,
    /// Deadline for a block fetch.
    #[serde(default = "default_deliver_ms")]
    pub deliver_ms: u64,
    /// Deadline for a chaincode package install.
    #[serde(default = "default_install_ms")]
    pub install_ms: u64,
    /// Deadline for certificate authority requests.
    #[serde(default = "default_ca_ms")]
    pub ca_ms: u64,
    /// Deadline for channel participation requests.
    #[serde(default = "default_participation_ms")]
    pub participation_ms: u64,
}

fn default_endorse_ms() -> u64 {
    30_000
}
fn default_order_ms() -> u64 {
    30_000
}
fn default_deliver_ms() -> u64 {
    30_000
}
fn default_install_ms() -> u64 {
    300_000
}
fn default_ca_ms() -> u64 {
    10_000
}
fn default_participation_ms() -> u64 {
    10_000
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            endorse_ms: default_endorse_ms(),
            order_ms: default_order_ms(),
            deliver_ms: default_deliver_ms(),
            install_ms: default_install_ms(),
            ca_ms: default_ca_ms(),
            participation_ms: default_participation_ms(),
        }
    }
}

impl TimeoutConfig {
    /// Looks up the deadline for an RPC family.
    pub fn for_kind(&self, kind: RpcKind) -> Duration {
        let ms = match kind {
            RpcKind::Endorse => self.endorse_ms,
            RpcKind::Order => self.order_ms,
            RpcKind::Deliver => self.deliver_ms,
            RpcKind::Install => self.install_ms,
            RpcKind::Ca => self.ca_ms,
            RpcKind::Participation => self.participation_ms,
        };
        Duration::from_millis(ms)
    }
}

/// The signing identity used for proposals and envelopes.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct IdentityConfig {
    /// The MSP id of the identity's organization.
    pub msp_id: String,
    /// Path to the PEM certificate.
    pub cert_path: PathBuf,
    /// Path to the PEM private key.
    pub key_path: PathBuf,
}

/// A peer or orderer endpoint.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    /// A display name used in logs and soft-error reports.
    pub name: String,
    /// `grpc://`, `grpcs://`, `http://` or `https://` URL.
    pub url: String,
    /// The MSP id of the node's organization.
    #[serde(default)]
    pub msp_id: Option<String>,
    /// PEM file holding the TLS root(s) for this node.
    #[serde(default)]
    pub tls_ca_path: Option<PathBuf>,
    /// Inline TLS root PEM, takes precedence over `tls_ca_path`.
    #[serde(default)]
    pub tls_ca_pem: Option<String>,
    /// Overrides the TLS server name used for verification.
    #[serde(default)]
    pub ssl_target_name_override: Option<String>,
}

impl NodeConfig {
    /// Creates a plain endpoint with no TLS overrides.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            msp_id: None,
            tls_ca_path: None,
            tls_ca_pem: None,
            ssl_target_name_override: None,
        }
    }

    /// True when the URL scheme calls for TLS.
    pub fn uses_tls(&self) -> bool {
        self.url.starts_with("grpcs://") || self.url.starts_with("https://")
    }
}

/// Connection details for a certificate authority.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CaConfig {
    /// Base URL, e.g. `https://ca.org1.example.com:7054`.
    pub url: String,
    /// The CA name for multi-CA servers.
    #[serde(default)]
    pub ca_name: Option<String>,
    /// PEM bundle trusted for the CA's TLS certificate, in addition to the
    /// platform roots.
    #[serde(default)]
    pub tls_ca_path: Option<PathBuf>,
}

/// Connection details for the orderer channel participation API.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ParticipationConfig {
    /// Base URL of the orderer admin endpoint or the proxy in front of it.
    pub url: String,
    /// PEM bundle trusted for the endpoint's TLS certificate.
    #[serde(default)]
    pub tls_ca_path: Option<PathBuf>,
}

fn default_max_concurrency() -> usize {
    MAX_ENDORSEMENT_CONCURRENCY
}

/// The complete client configuration.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// The default signing identity.
    #[serde(default)]
    pub identity: Option<IdentityConfig>,
    /// Known peers.
    #[serde(default)]
    pub peers: Vec<NodeConfig>,
    /// Known orderers.
    #[serde(default)]
    pub orderers: Vec<NodeConfig>,
    /// The certificate authority, if any.
    #[serde(default)]
    pub ca: Option<CaConfig>,
    /// The channel participation endpoint, if any.
    #[serde(default)]
    pub participation: Option<ParticipationConfig>,
    /// Client-side deadlines.
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    /// Maximum in-flight endorsements per fan-out; clamped to 1..=4.
    #[serde(default = "default_max_concurrency")]
    pub max_endorsement_concurrency: usize,
    /// Directory used by the file-backed local store.
    #[serde(default)]
    pub local_store_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            identity: None,
            peers: Vec::new(),
            orderers: Vec::new(),
            ca: None,
            participation: None,
            timeouts: TimeoutConfig::default(),
            max_endorsement_concurrency: default_max_concurrency(),
            local_store_dir: None,
        }
    }
}

impl ClientConfig {
    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    /// Rejects configurations that cannot work at all.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for node in self.peers.iter().chain(self.orderers.iter()) {
            if node.name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "node with url '{}' has no name",
                    node.url
                )));
            }
            let scheme_ok = ["grpc://", "grpcs://", "http://", "https://"]
                .iter()
                .any(|s| node.url.starts_with(s));
            if !scheme_ok {
                return Err(ConfigError::Invalid(format!(
                    "node '{}' has unsupported url '{}'",
                    node.name, node.url
                )));
            }
        }
        let t = &self.timeouts;
        let deadlines = [
            ("endorse_ms", t.endorse_ms),
            ("order_ms", t.order_ms),
            ("deliver_ms", t.deliver_ms),
            ("install_ms", t.install_ms),
            ("ca_ms", t.ca_ms),
            ("participation_ms", t.participation_ms),
        ];
        // A zero deadline expires every call before it is sent.
        if let Some((name, _)) = deadlines.iter().find(|(_, ms)| *ms == 0) {
            return Err(ConfigError::Invalid(format!(
                "timeouts.{name} must be greater than zero"
            )));
        }
        Ok(())
    }

    /// The fan-out limit actually applied.
    pub fn effective_concurrency(&self) -> usize {
        self.max_endorsement_concurrency
            .clamp(1, MAX_ENDORSEMENT_CONCURRENCY)
    }

    /// Finds a peer by name.
    pub fn peer(&self, name: &str) -> Option<&NodeConfig> {
        self.peers.iter().find(|p| p.name == name)
    }

    /// Finds an orderer by name.
    pub fn orderer(&self, name: &str) -> Option<&NodeConfig> {
        self.orderers.iter().find(|o| o.name == name)
    }
}

#[cfg(test)]
mod tests;
