// Path: crates/client/src/pipeline/mod.rs
//! The endorse, assemble and order pipeline.
//!
//! Every invocation walks `Building → Signed → Sent → {Succeeded, Failed}`.
//! Endorsement fan-out is bounded by the context's concurrency limit and joins
//! results in peer order. A peer that fails never aborts the others; its
//! failure is carried as a soft error next to the endorsements that did
//! succeed.

use crate::context::ClientContext;
use crate::identity::SigningIdentity;
use crate::normalize::{run, OperationError};
use crate::proposal::{build_proposal, now_timestamp, Proposal, ProposalRequest};
use crate::transport::{with_timeout, LedgerTransport};
use futures::future::join_all;
use prost::Message;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use stitch_ipc::common::{
    Block, ChannelHeader, ConfigUpdateEnvelope, Envelope, Header, HeaderType, Payload,
};
use stitch_ipc::orderer::{
    deliver_response, seek_position, BroadcastResponse, SeekBehavior, SeekInfo,
    SeekNewest, SeekOldest, SeekPosition, SeekSpecified,
};
use stitch_ipc::peer::{
    ChaincodeActionPayload, ChaincodeEndorsedAction, Endorsement, ProposalResponse,
    SignedProposal, Transaction, TransactionAction,
};
use stitch_telemetry::time::Timer;
use stitch_types::app::status;
use stitch_types::config::{NodeConfig, RpcKind};
use stitch_types::error::{
    EndorsementFailure, LedgerError, PartialEndorsementError, SdkError, TransportError,
    ValidationError,
};
use stitch_types::prelude::non_empty;
use tokio::sync::Semaphore;
use tracing::Instrument;

/// Where one pipeline invocation currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    /// The proposal is being assembled.
    Building,
    /// The proposal carries the caller's signature.
    Signed,
    /// The proposal is out to at least one node.
    Sent,
    /// Terminal: the call produced its result.
    Succeeded,
    /// Terminal: the call gave up.
    Failed,
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl CallState {
    /// Whether no further transition is allowed.
    pub fn is_terminal(self) -> bool {
        matches!(self, CallState::Succeeded | CallState::Failed)
    }

    /// Moves forward one step. Any live state may fail; nothing leaves a
    /// terminal state.
    pub fn advance(self, next: CallState) -> Result<CallState, ValidationError> {
        let allowed = matches!(
            (self, next),
            (CallState::Building, CallState::Signed)
                | (CallState::Signed, CallState::Sent)
                | (CallState::Sent, CallState::Succeeded)
        ) || (next == CallState::Failed && !self.is_terminal());
        if allowed {
            Ok(next)
        } else {
            Err(ValidationError::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

/// Substrings that betray an application failure behind a successful status.
pub const LIAR_SUCCESS_TABLE: [(&str, i32); 11] = [
    ("identity is not an admin", status::PERMISSION_DENIED),
    ("access denied", status::PERMISSION_DENIED),
    ("creator certificate is not valid", status::UNAUTHENTICATED),
    ("channel does not exist", status::NOT_FOUND),
    ("cannot retrieve package", status::NOT_FOUND),
    ("could not find chaincode", status::NOT_FOUND),
    ("already successfully installed", status::ALREADY_EXISTS),
    ("already exists", status::ALREADY_EXISTS),
    ("is not the next sequence", status::FAILED_PRECONDITION),
    ("requested sequence is", status::FAILED_PRECONDITION),
    ("timed out", status::DEADLINE_EXCEEDED),
];

/// The code a message maps to, if it matches the table. Case-insensitive.
pub fn liar_success_code(message: &str) -> Option<i32> {
    let lower = message.to_lowercase();
    LIAR_SUCCESS_TABLE
        .iter()
        .find(|(needle, _)| lower.contains(needle))
        .map(|(_, code)| *code)
}

/// Decides whether one endorser's answer is a real success.
pub fn classify_response(
    peer: &str,
    outcome: Result<ProposalResponse, TransportError>,
) -> Result<ProposalResponse, SdkError> {
    let response = match outcome {
        Ok(response) => response,
        Err(TransportError::Rpc { code, message, url })
            if code == status::OK || code == status::UNKNOWN =>
        {
            return Err(match liar_success_code(&message) {
                Some(code) => LedgerError::LiarSuccess {
                    peer: peer.to_string(),
                    code,
                    message,
                }
                .into(),
                None => TransportError::Rpc { url, code, message }.into(),
            });
        }
        Err(e) => return Err(e.into()),
    };
    let Some(inner) = response.response.as_ref() else {
        return Err(LedgerError::Decode(format!("response from {peer} has no status")).into());
    };
    if inner.status >= status::ERROR_THRESHOLD {
        return Err(LedgerError::ProposalRejected {
            peer: peer.to_string(),
            status: inner.status,
            message: inner.message.clone(),
        }
        .into());
    }
    if let Some(code) = liar_success_code(&inner.message) {
        return Err(LedgerError::LiarSuccess {
            peer: peer.to_string(),
            code,
            message: inner.message.clone(),
        }
        .into());
    }
    Ok(response)
}

/// One peer's outcome. Failures are kept, never dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct EndorsementResult {
    /// The configured peer name.
    pub peer: String,
    /// The chaincode status, or the normalized code of the failure.
    pub status: i32,
    /// The chaincode or failure message.
    pub message: String,
    /// The endorsed response; `None` when the peer failed.
    pub response: Option<ProposalResponse>,
    /// Why the peer failed, when it did.
    pub error: Option<SdkError>,
}

impl EndorsementResult {
    /// Whether the peer returned a usable response.
    pub fn is_success(&self) -> bool {
        self.response.is_some()
    }

    /// The chaincode's own response payload.
    pub fn payload(&self) -> Option<&[u8]> {
        self.response
            .as_ref()
            .and_then(|r| r.response.as_ref())
            .map(|r| r.payload.as_slice())
    }

    /// The typed outcome.
    pub fn into_result(self) -> Result<ProposalResponse, SdkError> {
        match (self.response, self.error) {
            (Some(response), _) => Ok(response),
            (None, Some(error)) => Err(error),
            (None, None) => Err(LedgerError::ProposalRejected {
                peer: self.peer,
                status: self.status,
                message: self.message,
            }
            .into()),
        }
    }

    fn failure(&self) -> EndorsementFailure {
        EndorsementFailure {
            peer: self.peer.clone(),
            status: self.status,
            message: self.message.clone(),
        }
    }
}

fn outcome_label(error: &SdkError) -> &'static str {
    match error {
        SdkError::Transport(TransportError::Timeout { .. }) => "timeout",
        SdkError::Transport(_) => "transport",
        SdkError::Ledger(LedgerError::LiarSuccess { .. }) => "liar_success",
        _ => "rejected",
    }
}

/// Sends one proposal to one peer under the endorse deadline.
pub async fn endorse_one(
    ctx: &ClientContext,
    transport: &dyn LedgerTransport,
    peer: &NodeConfig,
    proposal: &SignedProposal,
) -> EndorsementResult {
    endorse_with_deadline(ctx, transport, peer, proposal, RpcKind::Endorse).await
}

/// Sends one proposal to one peer under the deadline of `kind`.
pub async fn endorse_with_deadline(
    ctx: &ClientContext,
    transport: &dyn LedgerTransport,
    peer: &NodeConfig,
    proposal: &SignedProposal,
    kind: RpcKind,
) -> EndorsementResult {
    let sink = ctx.metrics().pipeline();
    let outcome = {
        let _timer = Timer::new(sink, &peer.name);
        with_timeout(
            &peer.url,
            ctx.timeout(kind),
            transport.process_proposal(peer, proposal.clone()),
        )
        .await
    };
    match classify_response(&peer.name, outcome) {
        Ok(response) => {
            sink.inc_endorsements("ok");
            let (status, message) = response
                .response
                .as_ref()
                .map(|r| (r.status, r.message.clone()))
                .unwrap_or_default();
            tracing::debug!(target: "pipeline", peer = %peer.name, status, "endorsed");
            EndorsementResult {
                peer: peer.name.clone(),
                status,
                message,
                response: Some(response),
                error: None,
            }
        }
        Err(error) => {
            sink.inc_endorsements(outcome_label(&error));
            tracing::warn!(
                target: "pipeline",
                peer = %peer.name,
                status = error.status(),
                error = %error,
                "endorsement failed"
            );
            EndorsementResult {
                peer: peer.name.clone(),
                status: error.status(),
                message: error.to_string(),
                response: None,
                error: Some(error),
            }
        }
    }
}

/// Fans a proposal out to `peers`, at most `ctx.concurrency()` at a time.
/// Results come back in `peers` order.
pub async fn endorse_many(
    ctx: &ClientContext,
    transport: &dyn LedgerTransport,
    peers: &[NodeConfig],
    proposal: &SignedProposal,
) -> Vec<EndorsementResult> {
    let semaphore = Semaphore::new(ctx.concurrency());
    let in_flight = AtomicUsize::new(0);
    let sink = ctx.metrics().pipeline();
    let calls = peers.iter().map(|peer| {
        let semaphore = &semaphore;
        let in_flight = &in_flight;
        async move {
            let Ok(_permit) = semaphore.acquire().await else {
                let error = SdkError::from(TransportError::StreamClosed {
                    url: peer.url.clone(),
                });
                return EndorsementResult {
                    peer: peer.name.clone(),
                    status: error.status(),
                    message: error.to_string(),
                    response: None,
                    error: Some(error),
                };
            };
            sink.set_endorsements_in_flight(in_flight.fetch_add(1, Ordering::SeqCst) + 1);
            let result = endorse_one(ctx, transport, peer, proposal).await;
            sink.set_endorsements_in_flight(in_flight.fetch_sub(1, Ordering::SeqCst) - 1);
            result
        }
    });
    join_all(calls).await
}

/// An envelope ready for the orderer plus what went into it.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedTransaction {
    /// The signed envelope for the orderer.
    pub envelope: Envelope,
    /// Peers whose endorsements are inside the envelope.
    pub endorsers: Vec<String>,
    /// Peers left out, with the reason.
    pub soft_errors: PartialEndorsementError,
    /// The chaincode response payload all endorsers agreed on.
    pub payload: Vec<u8>,
}

/// Assembles the transaction from every successful endorsement whose
/// response payload matches the first endorsed one.
pub fn build_transaction_envelope(
    identity: &SigningIdentity,
    proposal: &Proposal,
    results: &[EndorsementResult],
) -> Result<PreparedTransaction, SdkError> {
    let mut soft_errors = PartialEndorsementError::default();
    let mut endorsements: Vec<Endorsement> = Vec::new();
    let mut endorsers = Vec::new();
    let mut agreed: Option<(&[u8], &[u8])> = None;

    for result in results {
        let Some(response) = result.response.as_ref() else {
            soft_errors.failures.push(result.failure());
            continue;
        };
        let Some(endorsement) = response.endorsement.clone() else {
            soft_errors.failures.push(EndorsementFailure {
                peer: result.peer.clone(),
                status: status::INTERNAL,
                message: "response carries no endorsement".into(),
            });
            continue;
        };
        let payload = response.payload.as_slice();
        let chaincode_payload = result.payload().unwrap_or_default();
        match agreed {
            None => agreed = Some((payload, chaincode_payload)),
            Some((expected, _)) if expected != payload => {
                soft_errors.failures.push(EndorsementFailure {
                    peer: result.peer.clone(),
                    status: status::ABORTED,
                    message: "proposal response payload does not match other endorsers".into(),
                });
                continue;
            }
            Some(_) => {}
        }
        endorsements.push(endorsement);
        endorsers.push(result.peer.clone());
    }

    let Some((response_payload, chaincode_payload)) = agreed else {
        return Err(LedgerError::NoEndorsements {
            failures: soft_errors.len(),
        }
        .into());
    };

    let action_payload = ChaincodeActionPayload {
        chaincode_proposal_payload: proposal.payload_without_transient().to_vec(),
        action: Some(ChaincodeEndorsedAction {
            proposal_response_payload: response_payload.to_vec(),
            endorsements,
        }),
    };
    let transaction = Transaction {
        actions: vec![TransactionAction {
            header: proposal.signature_header().to_vec(),
            payload: action_payload.encode_to_vec(),
        }],
    };
    let payload = Payload {
        header: Some(Header {
            channel_header: proposal.channel_header().to_vec(),
            signature_header: proposal.signature_header().to_vec(),
        }),
        data: transaction.encode_to_vec(),
    }
    .encode_to_vec();
    let signature = identity.sign(&payload)?;

    Ok(PreparedTransaction {
        envelope: Envelope { payload, signature },
        endorsers,
        soft_errors,
        payload: chaincode_payload.to_vec(),
    })
}

/// Broadcasts an envelope. `SUCCESS` means accepted for ordering, not committed.
pub async fn order(
    ctx: &ClientContext,
    transport: &dyn LedgerTransport,
    orderer: &NodeConfig,
    envelope: Envelope,
) -> Result<BroadcastResponse, SdkError> {
    let response = with_timeout(
        &orderer.url,
        ctx.timeout(RpcKind::Order),
        transport.broadcast(orderer, envelope),
    )
    .await?;
    ctx.metrics().pipeline().inc_broadcasts(response.status);
    if response.status != status::SUCCESS {
        return Err(LedgerError::OrderRejected {
            orderer: orderer.url.clone(),
            status: response.status,
            info: response.info,
        }
        .into());
    }
    Ok(response)
}

/// The outcome of a submitted transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionResult {
    /// The transaction id the proposal was built with.
    pub tx_id: String,
    /// The orderer status (200).
    pub status: i32,
    /// The orderer's informational text.
    pub info: String,
    /// Peers whose endorsements were included.
    pub endorsers: Vec<String>,
    /// Peers that failed or disagreed; empty on a clean run.
    pub soft_errors: PartialEndorsementError,
    /// The chaincode response payload.
    pub payload: Vec<u8>,
}

/// Which blocks to read from the deliver service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRange {
    /// A single block by number.
    Number(u64),
    /// Inclusive on both ends.
    Range(u64, u64),
    /// The current last block.
    Newest,
    /// The genesis block.
    Oldest,
}

impl BlockRange {
    fn positions(self) -> (seek_position::Type, seek_position::Type) {
        let specified = |number| seek_position::Type::Specified(SeekSpecified { number });
        match self {
            BlockRange::Number(n) => (specified(n), specified(n)),
            BlockRange::Range(start, stop) => (specified(start), specified(stop)),
            BlockRange::Newest => (
                seek_position::Type::Newest(SeekNewest {}),
                seek_position::Type::Newest(SeekNewest {}),
            ),
            BlockRange::Oldest => (
                seek_position::Type::Oldest(SeekOldest {}),
                seek_position::Type::Oldest(SeekOldest {}),
            ),
        }
    }
}

/// One identity driving proposals through one transport.
pub struct Pipeline<'a> {
    ctx: &'a ClientContext,
    transport: &'a dyn LedgerTransport,
    identity: &'a SigningIdentity,
}

impl<'a> Pipeline<'a> {
    /// Binds a context, a transport and a signer. Nothing is contacted yet.
    pub fn new(
        ctx: &'a ClientContext,
        transport: &'a dyn LedgerTransport,
        identity: &'a SigningIdentity,
    ) -> Self {
        Self {
            ctx,
            transport,
            identity,
        }
    }

    /// The shared client context.
    pub fn context(&self) -> &ClientContext {
        self.ctx
    }

    /// The identity that signs every proposal and envelope.
    pub fn identity(&self) -> &SigningIdentity {
        self.identity
    }

    /// Builds and signs a proposal.
    pub fn propose(&self, request: &ProposalRequest) -> Result<Proposal, SdkError> {
        build_proposal(self.identity, request)
    }

    /// Endorses on `peers`, tolerating partial failure, then orders.
    pub async fn submit(
        &self,
        request: &ProposalRequest,
        peers: &[NodeConfig],
        orderer: &NodeConfig,
    ) -> Result<TransactionResult, OperationError> {
        run(self.ctx, "submit", self.try_submit(request, peers, orderer)).await
    }

    /// Endorses on a single peer and returns the chaincode payload without ordering.
    pub async fn evaluate(
        &self,
        request: &ProposalRequest,
        peer: &NodeConfig,
    ) -> Result<Vec<u8>, OperationError> {
        run(self.ctx, "evaluate", self.try_evaluate(request, peer, RpcKind::Endorse)).await
    }

    /// Reads blocks through the deliver service.
    pub async fn fetch_blocks(
        &self,
        channel_id: &str,
        orderer: &NodeConfig,
        range: BlockRange,
    ) -> Result<Vec<Block>, OperationError> {
        run(
            self.ctx,
            "fetchBlocks",
            self.try_fetch_blocks(channel_id, orderer, range),
        )
        .await
    }

    /// Reads one block by number.
    pub async fn fetch_block(
        &self,
        channel_id: &str,
        orderer: &NodeConfig,
        number: u64,
    ) -> Result<Block, OperationError> {
        run(
            self.ctx,
            "fetchBlock",
            self.try_fetch_block(channel_id, orderer, number),
        )
        .await
    }

    /// Broadcasts a signed config update.
    pub async fn submit_config_update(
        &self,
        channel_id: &str,
        orderer: &NodeConfig,
        update: &ConfigUpdateEnvelope,
    ) -> Result<BroadcastResponse, OperationError> {
        run(
            self.ctx,
            "submitConfigUpdate",
            self.try_submit_config_update(channel_id, orderer, update),
        )
        .await
    }

    pub(crate) async fn try_submit(
        &self,
        request: &ProposalRequest,
        peers: &[NodeConfig],
        orderer: &NodeConfig,
    ) -> Result<TransactionResult, SdkError> {
        non_empty(&request.channel_id, "channel_id")?;
        if peers.is_empty() {
            return Err(ValidationError::MissingField("peers").into());
        }
        let mut state = CallState::Building;
        let proposal = self.propose(request)?;
        state = state.advance(CallState::Signed)?;
        let span = tracing::info_span!(
            target: "pipeline",
            "submit",
            tx_id = %proposal.tx_id(),
            channel = %request.channel_id,
            chaincode = %request.chaincode_id,
            function = %request.function,
        );
        self.endorse_and_order(state, &proposal, peers, orderer)
            .instrument(span)
            .await
    }

    async fn endorse_and_order(
        &self,
        state: CallState,
        proposal: &Proposal,
        peers: &[NodeConfig],
        orderer: &NodeConfig,
    ) -> Result<TransactionResult, SdkError> {
        let results = endorse_many(self.ctx, self.transport, peers, proposal.signed()).await;
        let state = state.advance(CallState::Sent)?;
        let prepared = match build_transaction_envelope(self.identity, proposal, &results) {
            Ok(prepared) => prepared,
            Err(e) => {
                state.advance(CallState::Failed)?;
                return Err(e);
            }
        };
        if !prepared.soft_errors.is_empty() {
            tracing::warn!(
                target: "pipeline",
                failed = prepared.soft_errors.len(),
                endorsed = prepared.endorsers.len(),
                "continuing with partial endorsements"
            );
        }
        let broadcast = match order(self.ctx, self.transport, orderer, prepared.envelope).await {
            Ok(broadcast) => broadcast,
            Err(e) => {
                state.advance(CallState::Failed)?;
                return Err(e);
            }
        };
        state.advance(CallState::Succeeded)?;
        tracing::info!(target: "pipeline", status = broadcast.status, "accepted for ordering");
        Ok(TransactionResult {
            tx_id: proposal.tx_id().to_string(),
            status: broadcast.status,
            info: broadcast.info,
            endorsers: prepared.endorsers,
            soft_errors: prepared.soft_errors,
            payload: prepared.payload,
        })
    }

    /// Endorses on one peer, failing with that peer's error, then orders.
    pub(crate) async fn try_submit_single(
        &self,
        request: &ProposalRequest,
        peer: &NodeConfig,
        orderer: &NodeConfig,
    ) -> Result<TransactionResult, SdkError> {
        non_empty(&request.channel_id, "channel_id")?;
        let proposal = self.propose(request)?;
        let result = endorse_one(self.ctx, self.transport, peer, proposal.signed()).await;
        if let Some(error) = result.error.clone() {
            return Err(error);
        }
        let prepared = build_transaction_envelope(self.identity, &proposal, &[result])?;
        let broadcast = order(self.ctx, self.transport, orderer, prepared.envelope).await?;
        Ok(TransactionResult {
            tx_id: proposal.tx_id().to_string(),
            status: broadcast.status,
            info: broadcast.info,
            endorsers: prepared.endorsers,
            soft_errors: prepared.soft_errors,
            payload: prepared.payload,
        })
    }

    pub(crate) async fn try_evaluate(
        &self,
        request: &ProposalRequest,
        peer: &NodeConfig,
        kind: RpcKind,
    ) -> Result<Vec<u8>, SdkError> {
        let proposal = self.propose(request)?;
        let result =
            endorse_with_deadline(self.ctx, self.transport, peer, proposal.signed(), kind).await;
        let response = result.into_result()?;
        Ok(response.response.map(|r| r.payload).unwrap_or_default())
    }

    fn signed_envelope(
        &self,
        header_type: HeaderType,
        channel_id: &str,
        data: Vec<u8>,
    ) -> Result<Envelope, SdkError> {
        let signature_header = self.identity.new_signature_header();
        let tx_id = crate::proposal::compute_tx_id(&signature_header.nonce, &signature_header.creator);
        let payload = Payload {
            header: Some(Header {
                channel_header: ChannelHeader {
                    r#type: header_type as i32,
                    version: 0,
                    timestamp: Some(now_timestamp()),
                    channel_id: channel_id.to_string(),
                    tx_id,
                    epoch: 0,
                    extension: Vec::new(),
                    tls_cert_hash: Vec::new(),
                }
                .encode_to_vec(),
                signature_header: signature_header.encode_to_vec(),
            }),
            data,
        }
        .encode_to_vec();
        let signature = self.identity.sign(&payload)?;
        Ok(Envelope { payload, signature })
    }

    pub(crate) async fn try_fetch_blocks(
        &self,
        channel_id: &str,
        orderer: &NodeConfig,
        range: BlockRange,
    ) -> Result<Vec<Block>, SdkError> {
        let channel_id = non_empty(channel_id, "channel_id")?;
        if let BlockRange::Range(start, stop) = range {
            if start > stop {
                return Err(ValidationError::InvalidField {
                    field: "range",
                    reason: format!("start {start} is after stop {stop}"),
                }
                .into());
            }
        }
        let (start, stop) = range.positions();
        let seek = SeekInfo {
            start: Some(SeekPosition { r#type: Some(start) }),
            stop: Some(SeekPosition { r#type: Some(stop) }),
            behavior: SeekBehavior::FailIfNotReady as i32,
        };
        let envelope =
            self.signed_envelope(HeaderType::DeliverSeekInfo, channel_id, seek.encode_to_vec())?;
        let responses = with_timeout(
            &orderer.url,
            self.ctx.timeout(RpcKind::Deliver),
            self.transport.deliver(orderer, envelope),
        )
        .await?;

        let mut blocks = Vec::new();
        for response in responses {
            match response.r#type {
                Some(deliver_response::Type::Block(block)) => blocks.push(block),
                Some(deliver_response::Type::Status(code)) if code != status::SUCCESS => {
                    return Err(LedgerError::DeliverRejected {
                        orderer: orderer.url.clone(),
                        status: code,
                    }
                    .into());
                }
                _ => {}
            }
        }
        tracing::debug!(target: "pipeline", channel = channel_id, count = blocks.len(), "fetched blocks");
        Ok(blocks)
    }

    pub(crate) async fn try_fetch_block(
        &self,
        channel_id: &str,
        orderer: &NodeConfig,
        number: u64,
    ) -> Result<Block, SdkError> {
        self.try_fetch_blocks(channel_id, orderer, BlockRange::Number(number))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                LedgerError::DeliverRejected {
                    orderer: orderer.url.clone(),
                    status: stitch_ipc::common::Status::NotFound as i32,
                }
                .into()
            })
    }

    pub(crate) async fn try_submit_config_update(
        &self,
        channel_id: &str,
        orderer: &NodeConfig,
        update: &ConfigUpdateEnvelope,
    ) -> Result<BroadcastResponse, SdkError> {
        let channel_id = non_empty(channel_id, "channel_id")?;
        if update.signatures.is_empty() {
            return Err(ValidationError::MissingField("signatures").into());
        }
        let envelope =
            self.signed_envelope(HeaderType::ConfigUpdate, channel_id, update.encode_to_vec())?;
        let response = order(self.ctx, self.transport, orderer, envelope).await?;
        tracing::info!(target: "pipeline", channel = channel_id, "config update accepted");
        Ok(response)
    }
}

#[cfg(test)]
mod tests;
