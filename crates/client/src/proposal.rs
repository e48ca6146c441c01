// Path: crates/client/src/proposal.rs
//! Signed chaincode proposals.

use crate::identity::SigningIdentity;
use prost::Message;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use stitch_ipc::common::{ChannelHeader, Header, HeaderType, SignatureHeader};
use stitch_ipc::peer::{
    ChaincodeHeaderExtension, ChaincodeId, ChaincodeInput, ChaincodeInvocationSpec,
    ChaincodeProposalPayload, ChaincodeSpec, ChaincodeType, Proposal as ProposalMessage,
    SignedProposal,
};
use stitch_types::error::SdkError;
use stitch_types::prelude::non_empty;

/// What to invoke, and where.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProposalRequest {
    /// Target channel; empty addresses the peer itself.
    pub channel_id: String,
    /// Chaincode name.
    pub chaincode_id: String,
    /// Function name, sent as the first argument.
    pub function: String,
    /// Remaining arguments, in order.
    pub args: Vec<Vec<u8>>,
    /// Private inputs; signed over but never written to the ledger.
    pub transient_map: BTreeMap<String, Vec<u8>>,
    /// Marks the call as the chaincode's init.
    pub is_init: bool,
}

impl ProposalRequest {
    /// A request with no arguments and an empty transient map.
    pub fn new(
        channel_id: impl Into<String>,
        chaincode_id: impl Into<String>,
        function: impl Into<String>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            chaincode_id: chaincode_id.into(),
            function: function.into(),
            ..Default::default()
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<Vec<u8>>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Replaces the argument list.
    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Vec<u8>>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a transient entry, visible to endorsers but never ordered.
    pub fn transient(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.transient_map.insert(key.into(), value.into());
        self
    }

    /// Sets the init flag.
    pub fn init(mut self, is_init: bool) -> Self {
        self.is_init = is_init;
        self
    }
}

/// A signed proposal and the pieces the envelope needs later.
///
/// Never mutated after signing; one proposal serves exactly one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Proposal {
    tx_id: String,
    channel_id: String,
    channel_header: Vec<u8>,
    signature_header: Vec<u8>,
    payload_without_transient: Vec<u8>,
    signed: SignedProposal,
}

impl Proposal {
    pub fn tx_id(&self) -> &str {
        &self.tx_id
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    /// The encoded `ChannelHeader`.
    pub fn channel_header(&self) -> &[u8] {
        &self.channel_header
    }

    /// The encoded `SignatureHeader`.
    pub fn signature_header(&self) -> &[u8] {
        &self.signature_header
    }

    /// The `ChaincodeProposalPayload` with the transient map removed.
    pub fn payload_without_transient(&self) -> &[u8] {
        &self.payload_without_transient
    }

    /// What goes on the wire to endorsers.
    pub fn signed(&self) -> &SignedProposal {
        &self.signed
    }
}

/// `hex(sha256(nonce || creator))`.
pub fn compute_tx_id(nonce: &[u8], creator: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(nonce);
    hasher.update(creator);
    hex::encode(hasher.finalize())
}

pub(crate) fn now_timestamp() -> prost_types::Timestamp {
    let now = chrono::Utc::now();
    prost_types::Timestamp {
        seconds: now.timestamp(),
        nanos: i32::try_from(now.timestamp_subsec_nanos()).unwrap_or(0),
    }
}

/// Builds and signs a proposal. Fails before any I/O on missing fields.
///
/// An empty channel id addresses the peer itself, as chaincode installation does.
pub fn build_proposal(
    identity: &SigningIdentity,
    request: &ProposalRequest,
) -> Result<Proposal, SdkError> {
    let channel_id = request.channel_id.trim().to_string();
    let chaincode = non_empty(&request.chaincode_id, "chaincode_id")?;
    let function = non_empty(&request.function, "function")?;

    let SignatureHeader { creator, nonce } = identity.new_signature_header();
    let tx_id = compute_tx_id(&nonce, &creator);
    let chaincode_id = ChaincodeId {
        name: chaincode.to_string(),
        ..Default::default()
    };

    let channel_header = ChannelHeader {
        r#type: HeaderType::EndorserTransaction as i32,
        version: 0,
        timestamp: Some(now_timestamp()),
        channel_id: channel_id.clone(),
        tx_id: tx_id.clone(),
        epoch: 0,
        extension: ChaincodeHeaderExtension {
            chaincode_id: Some(chaincode_id.clone()),
        }
        .encode_to_vec(),
        tls_cert_hash: Vec::new(),
    }
    .encode_to_vec();
    let signature_header = SignatureHeader { creator, nonce }.encode_to_vec();

    let mut args = Vec::with_capacity(request.args.len() + 1);
    args.push(function.as_bytes().to_vec());
    args.extend(request.args.iter().cloned());
    let input = ChaincodeInvocationSpec {
        chaincode_spec: Some(ChaincodeSpec {
            r#type: ChaincodeType::Golang as i32,
            chaincode_id: Some(chaincode_id),
            input: Some(ChaincodeInput {
                args,
                decorations: BTreeMap::new(),
                is_init: request.is_init,
            }),
            timeout: 0,
        }),
    }
    .encode_to_vec();

    let payload = ChaincodeProposalPayload {
        input: input.clone(),
        transient_map: request.transient_map.clone(),
    }
    .encode_to_vec();
    let payload_without_transient = ChaincodeProposalPayload {
        input,
        transient_map: BTreeMap::new(),
    }
    .encode_to_vec();

    let proposal_bytes = ProposalMessage {
        header: Header {
            channel_header: channel_header.clone(),
            signature_header: signature_header.clone(),
        }
        .encode_to_vec(),
        payload,
        extension: Vec::new(),
    }
    .encode_to_vec();
    let signature = identity.sign(&proposal_bytes)?;

    Ok(Proposal {
        tx_id,
        channel_id,
        channel_header,
        signature_header,
        payload_without_transient,
        signed: SignedProposal {
            proposal_bytes,
            signature,
        },
    })
}
