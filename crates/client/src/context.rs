// Path: crates/client/src/context.rs
//! The long-lived state shared by every client operation.

use once_cell::sync::OnceCell;
use stitch_crypto::trust;
use stitch_telemetry::{MetricsSink, NopSink};
use stitch_types::config::{ClientConfig, NodeConfig, RpcKind};
use stitch_types::error::{ConfigError, SdkError, ValidationError};
use std::sync::Arc;
use std::time::Duration;

/// Configuration, metrics and cached trust roots.
#[derive(Debug, Clone)]
pub struct ClientContext {
    config: Arc<ClientConfig>,
    metrics: Arc<dyn MetricsSink>,
    roots: Arc<OnceCell<Vec<String>>>,
}

impl ClientContext {
    /// A context that discards metrics.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_metrics(config, Arc::new(NopSink))
    }

    /// A context reporting to `metrics`.
    pub fn with_metrics(config: ClientConfig, metrics: Arc<dyn MetricsSink>) -> Self {
        Self {
            config: Arc::new(config),
            metrics,
            roots: Arc::new(OnceCell::new()),
        }
    }

    /// The validated configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Where pipeline and RPC metrics are recorded.
    pub fn metrics(&self) -> &dyn MetricsSink {
        self.metrics.as_ref()
    }

    /// The client-side deadline for one RPC family.
    pub fn timeout(&self, kind: RpcKind) -> Duration {
        self.config.timeouts.for_kind(kind)
    }

    /// The endorsement fan-out width, never above the hard ceiling.
    pub fn concurrency(&self) -> usize {
        self.config.effective_concurrency()
    }

    /// Looks up configured peers by name, preserving the requested order.
    pub fn resolve_peers<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<NodeConfig>, SdkError> {
        names
            .iter()
            .map(|name| {
                self.config.peer(name.as_ref()).cloned().ok_or_else(|| {
                    ValidationError::InvalidField {
                        field: "peer",
                        reason: format!("unknown peer '{}'", name.as_ref()),
                    }
                    .into()
                })
            })
            .collect()
    }

    /// Looks up a configured orderer by name.
    pub fn resolve_orderer(&self, name: &str) -> Result<NodeConfig, SdkError> {
        self.config.orderer(name).cloned().ok_or_else(|| {
            ValidationError::InvalidField {
                field: "orderer",
                reason: format!("unknown orderer '{name}'"),
            }
            .into()
        })
    }

    /// TLS root bundles of every configured node, read once.
    pub fn trusted_roots(&self) -> Result<&[String], SdkError> {
        let roots = self.roots.get_or_try_init(|| {
            let mut roots = Vec::new();
            for node in self.config.peers.iter().chain(self.config.orderers.iter()) {
                if let Some(pem) = &node.tls_ca_pem {
                    roots.push(pem.clone());
                } else if let Some(path) = &node.tls_ca_path {
                    let pem = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
                        path: path.display().to_string(),
                        message: e.to_string(),
                    })?;
                    roots.push(pem);
                }
            }
            Ok::<_, SdkError>(roots)
        })?;
        Ok(roots)
    }

    /// True when `cert_pem` was signed by one of the configured roots.
    pub fn is_trusted(&self, cert_pem: &str) -> Result<bool, SdkError> {
        let roots = self.trusted_roots()?;
        let refs: Vec<&str> = roots.iter().map(String::as_str).collect();
        Ok(trust::is_trusted_root(cert_pem, &refs)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stitch_types::config::MAX_ENDORSEMENT_CONCURRENCY;

    #[test]
    fn concurrency_is_capped() {
        let config = ClientConfig {
            max_endorsement_concurrency: 32,
            ..Default::default()
        };
        let ctx = ClientContext::new(config);
        assert_eq!(ctx.concurrency(), MAX_ENDORSEMENT_CONCURRENCY);
    }

    #[test]
    fn peers_resolve_in_request_order() {
        let config = ClientConfig {
            peers: vec![
                NodeConfig::new("peer0", "grpc://a:7051"),
                NodeConfig::new("peer1", "grpc://b:7051"),
            ],
            ..Default::default()
        };
        let ctx = ClientContext::new(config);
        let peers = ctx.resolve_peers(&["peer1", "peer0"]).unwrap();
        assert_eq!(peers[0].name, "peer1");
        assert_eq!(peers[1].name, "peer0");
        assert!(ctx.resolve_peers(&["peer9"]).is_err());
        assert!(ctx.resolve_orderer("orderer0").is_err());
    }

    #[test]
    fn missing_root_file_is_a_config_error() {
        let mut node = NodeConfig::new("peer0", "grpcs://localhost:7051");
        node.tls_ca_path = Some("/nonexistent/ca.pem".into());
        let config = ClientConfig {
            peers: vec![node],
            ..Default::default()
        };
        let ctx = ClientContext::new(config);
        assert!(matches!(
            ctx.trusted_roots(),
            Err(SdkError::Config(ConfigError::Io { .. }))
        ));
    }
}
