// Path: crates/client/src/testing.rs
//! Shared fixtures for the client's unit tests.

use crate::identity::SigningIdentity;
use async_trait::async_trait;
use prost::Message;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use stitch_crypto::sign::ecdsa::export_private_pem;
use stitch_crypto::sign::x509::self_signed_root;
use stitch_crypto::{Curve, PrivateKeyHandle};
use stitch_ipc::common::{
    Block, BlockData, ChannelHeader, Config, ConfigEnvelope, Envelope, Header, HeaderType, Payload,
};
use stitch_ipc::orderer::{deliver_response, BroadcastResponse, DeliverResponse};
use stitch_ipc::peer::{
    ChaincodeInvocationSpec, ChaincodeProposalPayload, Endorsement, Proposal, ProposalResponse,
    ProposalResponsePayload, Response, SignedProposal,
};
use stitch_types::config::{ClientConfig, NodeConfig};
use stitch_types::error::TransportError;

use crate::transport::LedgerTransport;

/// A fresh self-signed P-256 certificate and its key.
pub(crate) fn identity_pems() -> (String, String) {
    let key = PrivateKeyHandle::generate(Curve::P256);
    let cert = self_signed_root(&key, "CN=admin,OU=admin,O=Org1", &[0x01], 30).unwrap();
    (cert, export_private_pem(&key).unwrap())
}

pub(crate) fn test_identity() -> SigningIdentity {
    let (cert, key) = identity_pems();
    SigningIdentity::new("Org1MSP", &cert, &key).unwrap()
}

pub(crate) fn peer(name: &str) -> NodeConfig {
    NodeConfig::new(name, format!("grpc://{name}:7051"))
}

pub(crate) fn orderer() -> NodeConfig {
    NodeConfig::new("orderer0", "grpc://orderer0:7050")
}

pub(crate) fn config(peers: &[&str]) -> ClientConfig {
    ClientConfig {
        peers: peers.iter().map(|p| peer(p)).collect(),
        orderers: vec![orderer()],
        ..Default::default()
    }
}

/// A genesis-style block carrying `config`.
pub(crate) fn config_block(config: Config) -> Block {
    let payload = Payload {
        header: Some(Header {
            channel_header: ChannelHeader {
                r#type: HeaderType::Config as i32,
                channel_id: "mychannel".into(),
                ..Default::default()
            }
            .encode_to_vec(),
            signature_header: Vec::new(),
        }),
        data: ConfigEnvelope {
            config: Some(config),
            last_update: None,
        }
        .encode_to_vec(),
    };
    Block {
        data: Some(BlockData {
            data: vec![Envelope {
                payload: payload.encode_to_vec(),
                signature: Vec::new(),
            }
            .encode_to_vec()],
        }),
        ..Default::default()
    }
}

/// An endorsement answer with `payload` as the chaincode result.
pub(crate) fn response(status: i32, message: &str, payload: &[u8]) -> ProposalResponse {
    ProposalResponse {
        version: 1,
        timestamp: None,
        response: Some(Response {
            status,
            message: message.to_string(),
            payload: payload.to_vec(),
        }),
        payload: ProposalResponsePayload {
            proposal_hash: vec![0xAB; 32],
            extension: payload.to_vec(),
        }
        .encode_to_vec(),
        endorsement: Some(Endorsement {
            endorser: b"endorser".to_vec(),
            signature: vec![0x30, 0x00],
        }),
    }
}

/// How the mock peer answers.
#[derive(Clone)]
pub(crate) enum Behavior {
    Respond(ProposalResponse),
    Fail(TransportError),
    Delay(Duration, ProposalResponse),
    Hang,
}

/// An in-memory transport that scripts every node's answer.
pub(crate) struct MockTransport {
    peers: HashMap<String, Behavior>,
    default: Behavior,
    pub broadcast_status: i32,
    pub deliver: Vec<DeliverResponse>,
    pub broadcasts: Mutex<Vec<Envelope>>,
    pub proposals: Mutex<Vec<(String, SignedProposal)>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self {
            peers: HashMap::new(),
            default: Behavior::Respond(response(200, "", b"ok")),
            broadcast_status: 200,
            deliver: vec![DeliverResponse {
                r#type: Some(deliver_response::Type::Status(200)),
            }],
            broadcasts: Mutex::new(Vec::new()),
            proposals: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_default(mut self, behavior: Behavior) -> Self {
        self.default = behavior;
        self
    }

    pub(crate) fn with_peer(mut self, name: &str, behavior: Behavior) -> Self {
        self.peers.insert(name.to_string(), behavior);
        self
    }

    /// The function name of every proposal sent, in arrival order.
    pub(crate) fn functions(&self) -> Vec<String> {
        self.proposals
            .lock()
            .unwrap()
            .iter()
            .map(|(_, signed)| {
                let proposal = Proposal::decode(&signed.proposal_bytes[..]).unwrap();
                let payload = ChaincodeProposalPayload::decode(&proposal.payload[..]).unwrap();
                let spec = ChaincodeInvocationSpec::decode(&payload.input[..])
                    .unwrap()
                    .chaincode_spec
                    .unwrap();
                String::from_utf8(spec.input.unwrap().args[0].clone()).unwrap()
            })
            .collect()
    }

    pub(crate) fn broadcast_payloads(&self) -> Vec<Payload> {
        self.broadcasts
            .lock()
            .unwrap()
            .iter()
            .map(|e| Payload::decode(&e.payload[..]).unwrap())
            .collect()
    }
}

#[async_trait]
impl LedgerTransport for MockTransport {
    async fn process_proposal(
        &self,
        peer: &NodeConfig,
        proposal: SignedProposal,
    ) -> Result<ProposalResponse, TransportError> {
        self.proposals
            .lock()
            .unwrap()
            .push((peer.name.clone(), proposal));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let behavior = self.peers.get(&peer.name).unwrap_or(&self.default).clone();
        let result = match behavior {
            Behavior::Respond(r) => Ok(r),
            Behavior::Fail(e) => Err(e),
            Behavior::Delay(d, r) => {
                tokio::time::sleep(d).await;
                Ok(r)
            }
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(TransportError::StreamClosed {
                    url: peer.url.clone(),
                })
            }
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn broadcast(
        &self,
        _orderer: &NodeConfig,
        envelope: Envelope,
    ) -> Result<BroadcastResponse, TransportError> {
        self.broadcasts.lock().unwrap().push(envelope);
        Ok(BroadcastResponse {
            status: self.broadcast_status,
            info: String::new(),
        })
    }

    async fn deliver(
        &self,
        _orderer: &NodeConfig,
        envelope: Envelope,
    ) -> Result<Vec<DeliverResponse>, TransportError> {
        self.broadcasts.lock().unwrap().push(envelope);
        Ok(self.deliver.clone())
    }
}
