// Path: crates/client/src/transport.rs
//! The seam between the pipeline and the wire.
//!
//! [`LedgerTransport`] is the only thing the pipeline and the lifecycle
//! orchestrator know about the network, so tests can substitute an in-memory
//! implementation. [`GrpcTransport`] is the production implementation over
//! tonic channels, cached per node URL.

use async_trait::async_trait;
use dashmap::DashMap;
use futures::StreamExt;
use std::future::Future;
use std::time::Duration;
use stitch_ipc::common::Envelope;
use stitch_ipc::orderer::{deliver_response, BroadcastResponse, DeliverResponse};
use stitch_ipc::peer::{ProposalResponse, SignedProposal};
use stitch_ipc::rpc::{AtomicBroadcastClient, EndorserClient};
use stitch_types::config::NodeConfig;
use stitch_types::error::TransportError;
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint};

/// The RPCs the client needs from peers and orderers.
#[async_trait]
pub trait LedgerTransport: Send + Sync {
    /// `ProcessProposal` on one endorser.
    async fn process_proposal(
        &self,
        peer: &NodeConfig,
        proposal: SignedProposal,
    ) -> Result<ProposalResponse, TransportError>;

    /// `Broadcast` of a single envelope; returns the orderer's first answer.
    async fn broadcast(
        &self,
        orderer: &NodeConfig,
        envelope: Envelope,
    ) -> Result<BroadcastResponse, TransportError>;

    /// `Deliver` for a signed seek envelope; returns every response up to and
    /// including the terminating status.
    async fn deliver(
        &self,
        orderer: &NodeConfig,
        envelope: Envelope,
    ) -> Result<Vec<DeliverResponse>, TransportError>;
}

/// Runs `fut` under a client-side deadline.
pub async fn with_timeout<T, F>(url: &str, timeout: Duration, fut: F) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, TransportError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout {
            url: url.to_string(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

/// tonic-backed transport with one lazily connected channel per URL.
#[derive(Debug, Default)]
pub struct GrpcTransport {
    channels: DashMap<String, Channel>,
}

impl GrpcTransport {
    /// No connection is made until the first call to a node.
    pub fn new() -> Self {
        Self::default()
    }

    fn channel(&self, node: &NodeConfig) -> Result<Channel, TransportError> {
        if let Some(channel) = self.channels.get(&node.url) {
            return Ok(channel.clone());
        }
        let uri = http_uri(&node.url);
        let mut endpoint = Endpoint::from_shared(uri.clone())
            .map_err(|e| TransportError::InvalidEndpoint(format!("{}: {e}", node.url)))?;
        if node.uses_tls() {
            let mut tls = ClientTlsConfig::new();
            if let Some(pem) = tls_root(node)? {
                tls = tls.ca_certificate(Certificate::from_pem(pem));
            }
            if let Some(domain) = &node.ssl_target_name_override {
                tls = tls.domain_name(domain.clone());
            }
            endpoint = endpoint.tls_config(tls).map_err(|e| TransportError::Connection {
                url: node.url.clone(),
                message: e.to_string(),
            })?;
        }
        let channel = endpoint.connect_lazy();
        tracing::debug!(target: "pipeline", url = %node.url, %uri, "opened channel");
        self.channels.insert(node.url.clone(), channel.clone());
        Ok(channel)
    }
}

fn http_uri(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("grpcs://") {
        format!("https://{rest}")
    } else if let Some(rest) = url.strip_prefix("grpc://") {
        format!("http://{rest}")
    } else {
        url.to_string()
    }
}

fn tls_root(node: &NodeConfig) -> Result<Option<String>, TransportError> {
    if let Some(pem) = &node.tls_ca_pem {
        return Ok(Some(pem.clone()));
    }
    match &node.tls_ca_path {
        Some(path) => std::fs::read_to_string(path)
            .map(Some)
            .map_err(|e| TransportError::Connection {
                url: node.url.clone(),
                message: format!("cannot read TLS root {}: {e}", path.display()),
            }),
        None => Ok(None),
    }
}

/// Maps a tonic status; failures to reach the service become connection errors.
pub(crate) fn status_to_error(url: &str, status: tonic::Status) -> TransportError {
    let message = status.message().to_string();
    let unreachable = message.starts_with("Service was not ready")
        || (status.code() == tonic::Code::Unavailable && message.contains("transport error"));
    if unreachable {
        TransportError::Connection {
            url: url.to_string(),
            message,
        }
    } else {
        TransportError::Rpc {
            url: url.to_string(),
            code: status.code() as i32,
            message,
        }
    }
}

#[async_trait]
impl LedgerTransport for GrpcTransport {
    async fn process_proposal(
        &self,
        peer: &NodeConfig,
        proposal: SignedProposal,
    ) -> Result<ProposalResponse, TransportError> {
        let mut client = EndorserClient::new(self.channel(peer)?);
        let response = client
            .process_proposal(proposal)
            .await
            .map_err(|s| status_to_error(&peer.url, s))?;
        Ok(response.into_inner())
    }

    async fn broadcast(
        &self,
        orderer: &NodeConfig,
        envelope: Envelope,
    ) -> Result<BroadcastResponse, TransportError> {
        let mut client = AtomicBroadcastClient::new(self.channel(orderer)?);
        let mut stream = client
            .broadcast(futures::stream::iter(vec![envelope]))
            .await
            .map_err(|s| status_to_error(&orderer.url, s))?
            .into_inner();
        match stream.message().await {
            Ok(Some(response)) => Ok(response),
            Ok(None) => Err(TransportError::StreamClosed {
                url: orderer.url.clone(),
            }),
            Err(s) => Err(status_to_error(&orderer.url, s)),
        }
    }

    async fn deliver(
        &self,
        orderer: &NodeConfig,
        envelope: Envelope,
    ) -> Result<Vec<DeliverResponse>, TransportError> {
        let mut client = AtomicBroadcastClient::new(self.channel(orderer)?);
        let mut stream = client
            .deliver(futures::stream::iter(vec![envelope]))
            .await
            .map_err(|s| status_to_error(&orderer.url, s))?
            .into_inner();
        let mut responses = Vec::new();
        while let Some(item) = stream.next().await {
            let response = item.map_err(|s| status_to_error(&orderer.url, s))?;
            let done = matches!(response.r#type, Some(deliver_response::Type::Status(_)));
            responses.push(response);
            if done {
                return Ok(responses);
            }
        }
        if responses.is_empty() {
            return Err(TransportError::StreamClosed {
                url: orderer.url.clone(),
            });
        }
        Ok(responses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grpc_schemes_map_to_http() {
        assert_eq!(http_uri("grpcs://peer0:7051"), "https://peer0:7051");
        assert_eq!(http_uri("grpc://peer0:7051"), "http://peer0:7051");
        assert_eq!(http_uri("https://peer0:7051"), "https://peer0:7051");
    }

    #[test]
    fn unreachable_service_is_a_connection_error() {
        let status = tonic::Status::unknown("Service was not ready: transport error");
        assert!(matches!(
            status_to_error("grpc://x", status),
            TransportError::Connection { .. }
        ));
        let status = tonic::Status::permission_denied("access denied");
        assert_eq!(status_to_error("grpc://x", status).status(), 7);
    }

    #[tokio::test]
    async fn deadline_yields_status_four() {
        let err = with_timeout("grpc://slow", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<(), TransportError>(())
        })
        .await
        .unwrap_err();
        assert_eq!(err.status(), 4);
        assert_eq!(
            err,
            TransportError::Timeout {
                url: "grpc://slow".into(),
                timeout_ms: 10
            }
        );
    }

    #[tokio::test]
    async fn channels_are_cached_per_url() {
        let transport = GrpcTransport::new();
        let node = NodeConfig::new("peer0", "grpc://127.0.0.1:7051");
        transport.channel(&node).unwrap();
        transport.channel(&node).unwrap();
        assert_eq!(transport.channels.len(), 1);
    }
}
