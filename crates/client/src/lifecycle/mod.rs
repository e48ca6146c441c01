// Path: crates/client/src/lifecycle/mod.rs
//! Chaincode lifecycle: install, approve, check readiness, commit.
//!
//! Each step is a call to the `_lifecycle` system chaincode. Install and
//! approve are fatal on any failure. Commit gathers endorsements from several
//! peers and tolerates the failure of some of them, reporting those as soft
//! errors next to the ordering result.

use crate::collections::collection_package;
use crate::context::ClientContext;
use crate::identity::SigningIdentity;
use crate::normalize::{run, OperationError};
use crate::pipeline::{Pipeline, TransactionResult};
use crate::policy::application_policy;
use crate::proposal::ProposalRequest;
use crate::transport::LedgerTransport;
use dashmap::DashMap;
use prost::Message;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use stitch_ipc::lifecycle::{
    chaincode_source, ApproveChaincodeDefinitionForMyOrgArgs, ChaincodeSource,
    CheckCommitReadinessArgs, CheckCommitReadinessResult, CommitChaincodeDefinitionArgs,
    InstallChaincodeArgs, InstallChaincodeResult, QueryChaincodeDefinitionArgs,
    QueryChaincodeDefinitionResult, QueryChaincodeDefinitionsArgs,
    QueryChaincodeDefinitionsResult, QueryInstalledChaincodesArgs,
    QueryInstalledChaincodesResult,
};
use stitch_ipc::peer::CollectionConfigPackage;
use stitch_types::app::{ChaincodeDefinition, InstalledChaincode, LIFECYCLE_CHAINCODE};
use stitch_types::config::{NodeConfig, RpcKind};
use stitch_types::error::{SdkError, ValidationError};
use stitch_types::prelude::non_empty;

const INSTALL: &str = "InstallChaincode";
const QUERY_INSTALLED: &str = "QueryInstalledChaincodes";
const APPROVE: &str = "ApproveChaincodeDefinitionForMyOrg";
const CHECK_READINESS: &str = "CheckCommitReadiness";
const COMMIT: &str = "CommitChaincodeDefinition";
const QUERY_DEFINITION: &str = "QueryChaincodeDefinition";
const QUERY_DEFINITIONS: &str = "QueryChaincodeDefinitions";

/// `label:hex(sha256(package))`.
pub fn compute_package_id(label: &str, package: &[u8]) -> String {
    format!("{label}:{}", hex::encode(Sha256::digest(package)))
}

/// Where a chaincode stands, as far as this client has observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleState {
    /// A package is installed on at least one peer.
    Installed { package_id: String },
    /// This organization approved the definition at `sequence`.
    ApprovedByOrg { sequence: i64 },
    /// Every organization has approved; `approvals` maps MSP id to approval.
    ReadyToCommit {
        sequence: i64,
        approvals: BTreeMap<String, bool>,
    },
    /// The definition at `sequence` is committed on the channel.
    Committed { sequence: i64 },
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Installed { package_id } => write!(f, "Installed({package_id})"),
            Self::ApprovedByOrg { sequence } => write!(f, "ApprovedByOrg({sequence})"),
            Self::ReadyToCommit { sequence, .. } => write!(f, "ReadyToCommit({sequence})"),
            Self::Committed { sequence } => write!(f, "Committed({sequence})"),
        }
    }
}

impl LifecycleState {
    /// Whether `next` may follow `self`. Definition transitions only move
    /// forward; a repeated commit of the same sequence is allowed, and a
    /// higher sequence after commit starts an upgrade. Install is per peer,
    /// so it may follow any state.
    pub fn can_move_to(&self, next: &LifecycleState) -> bool {
        use LifecycleState::*;
        match (self, next) {
            (_, Installed { .. }) | (Installed { .. }, _) => true,
            (ApprovedByOrg { sequence: a }, ApprovedByOrg { sequence: b })
            | (ApprovedByOrg { sequence: a }, ReadyToCommit { sequence: b, .. })
            | (ApprovedByOrg { sequence: a }, Committed { sequence: b })
            | (ReadyToCommit { sequence: a, .. }, ReadyToCommit { sequence: b, .. })
            | (ReadyToCommit { sequence: a, .. }, Committed { sequence: b })
            | (Committed { sequence: a }, Committed { sequence: b }) => a == b,
            (Committed { sequence: a }, ApprovedByOrg { sequence: b }) => b > a,
            _ => false,
        }
    }
}

/// Observed lifecycle state per chaincode name.
#[derive(Debug, Default)]
pub struct LifecycleTracker {
    states: DashMap<String, LifecycleState>,
}

impl LifecycleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last recorded state, `None` for an unseen chaincode.
    pub fn state(&self, name: &str) -> Option<LifecycleState> {
        self.states.get(name).map(|s| s.value().clone())
    }

    /// Rejects an illegal transition before any I/O.
    pub fn check(&self, name: &str, next: &LifecycleState) -> Result<(), ValidationError> {
        match self.states.get(name) {
            Some(current) if !current.can_move_to(next) => Err(ValidationError::InvalidTransition {
                from: current.to_string(),
                to: next.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Records a transition after the ledger confirmed it.
    pub fn record(&self, name: &str, next: LifecycleState) -> Result<(), ValidationError> {
        self.check(name, &next)?;
        tracing::debug!(target: "lifecycle", chaincode = name, state = %next, "state changed");
        self.states.insert(name.to_string(), next);
        Ok(())
    }

    /// Records an install on one peer. Approval or commit progress already
    /// seen for the chaincode is kept.
    pub fn record_install(&self, name: &str, package_id: String) {
        let next = LifecycleState::Installed { package_id };
        let mut current = self
            .states
            .entry(name.to_string())
            .or_insert_with(|| next.clone());
        if matches!(*current, LifecycleState::Installed { .. }) {
            tracing::debug!(target: "lifecycle", chaincode = name, state = %next, "state changed");
            *current = next;
        }
    }
}

/// Install a package on one peer.
#[derive(Debug, Clone)]
pub struct InstallRequest {
    /// The configured peer to install on.
    pub peer: String,
    /// The chaincode name the package is for; the label is tracked when empty.
    pub chaincode_name: String,
    /// The package label, the first half of the package id.
    pub label: String,
    /// The packaged chaincode tarball.
    pub package: Vec<u8>,
}

/// Approve a definition for the caller's organization.
#[derive(Debug, Clone)]
pub struct ApproveRequest {
    /// The channel the definition is for.
    pub channel_id: String,
    /// The definition being approved.
    pub definition: ChaincodeDefinition,
    /// The installed package to run; `None` approves without a local package.
    pub package_id: Option<String>,
    /// The endorsing peer of this organization.
    pub peer: String,
    /// Where the approval transaction is ordered.
    pub orderer: String,
}

/// Ask one peer which organizations have approved a definition.
#[derive(Debug, Clone)]
pub struct CheckReadinessRequest {
    /// The channel the definition is for.
    pub channel_id: String,
    /// The definition to check.
    pub definition: ChaincodeDefinition,
    /// The peer asked.
    pub peer: String,
}

/// Commit a definition with endorsements from several peers.
#[derive(Debug, Clone)]
pub struct CommitRequest {
    /// The channel to commit on.
    pub channel_id: String,
    /// The definition every organization approved.
    pub definition: ChaincodeDefinition,
    /// Endorsing peers, enough to satisfy the lifecycle endorsement policy.
    pub peers: Vec<String>,
    /// Where the commit transaction is ordered.
    pub orderer: String,
}

/// A definition as committed on a channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommittedDefinition {
    pub name: String,
    pub sequence: i64,
    pub version: String,
    pub endorsement_plugin: String,
    pub validation_plugin: String,
    /// The encoded application endorsement policy.
    #[serde(with = "hex::serde")]
    pub validation_parameter: Vec<u8>,
    /// Private data collections, if any were defined.
    #[serde(skip)]
    pub collections: Option<CollectionConfigPackage>,
    pub init_required: bool,
    /// Empty when listing all definitions.
    pub approvals: BTreeMap<String, bool>,
}

/// The encoded definition fields shared by approve, check and commit.
struct DefinitionArgs {
    validation_parameter: Vec<u8>,
    collections: Option<CollectionConfigPackage>,
}

fn definition_args(definition: &ChaincodeDefinition) -> Result<DefinitionArgs, SdkError> {
    definition.validate()?;
    let validation_parameter = match &definition.endorsement_policy {
        Some(reference) => application_policy(reference)?.encode_to_vec(),
        None => Vec::new(),
    };
    let collections = definition
        .collections
        .as_ref()
        .map(collection_package)
        .transpose()?;
    Ok(DefinitionArgs {
        validation_parameter,
        collections,
    })
}

/// Drives the lifecycle for one identity.
pub struct Lifecycle<'a> {
    pipeline: Pipeline<'a>,
    tracker: LifecycleTracker,
}

impl<'a> Lifecycle<'a> {
    /// Starts with an empty tracker.
    pub fn new(
        ctx: &'a ClientContext,
        transport: &'a dyn LedgerTransport,
        identity: &'a SigningIdentity,
    ) -> Self {
        Self {
            pipeline: Pipeline::new(ctx, transport, identity),
            tracker: LifecycleTracker::new(),
        }
    }

    /// What this driver has observed so far.
    pub fn tracker(&self) -> &LifecycleTracker {
        &self.tracker
    }

    fn ctx(&self) -> &ClientContext {
        self.pipeline.context()
    }

    fn request(channel_id: &str, function: &str, args: Vec<u8>) -> ProposalRequest {
        ProposalRequest::new(channel_id, LIFECYCLE_CHAINCODE, function).arg(args)
    }

    /// Installs a package; the returned id is content-derived.
    pub async fn install(&self, request: &InstallRequest) -> Result<InstalledChaincode, OperationError> {
        run(self.ctx(), "installChaincode", self.try_install(request)).await
    }

    async fn try_install(&self, request: &InstallRequest) -> Result<InstalledChaincode, SdkError> {
        let label = non_empty(&request.label, "label")?;
        if request.package.is_empty() {
            return Err(ValidationError::MissingField("package").into());
        }
        let expected = compute_package_id(label, &request.package);
        let tracked = if request.chaincode_name.trim().is_empty() {
            label
        } else {
            request.chaincode_name.trim()
        };
        let peer = one_peer(self.ctx(), &request.peer)?;

        let args = InstallChaincodeArgs {
            chaincode_install_package: request.package.clone(),
        }
        .encode_to_vec();
        let payload = self
            .pipeline
            .try_evaluate(&Self::request("", INSTALL, args), &peer, RpcKind::Install)
            .await?;
        let result = InstallChaincodeResult::decode(payload.as_slice())?;
        if result.package_id != expected {
            tracing::warn!(
                target: "lifecycle",
                peer = %peer.name,
                reported = %result.package_id,
                expected = %expected,
                "peer reported a different package id"
            );
        }
        tracing::info!(target: "lifecycle", peer = %peer.name, package_id = %result.package_id, "installed");
        self.tracker.record_install(tracked, result.package_id.clone());
        Ok(InstalledChaincode {
            package_id: result.package_id,
            label: result.label,
        })
    }

    /// Approves a definition for this organization and orders the approval.
    pub async fn approve(&self, request: &ApproveRequest) -> Result<TransactionResult, OperationError> {
        run(self.ctx(), "approveChaincodeDefinition", self.try_approve(request)).await
    }

    async fn try_approve(&self, request: &ApproveRequest) -> Result<TransactionResult, SdkError> {
        non_empty(&request.channel_id, "channel_id")?;
        let definition = &request.definition;
        let encoded = definition_args(definition)?;
        let next = LifecycleState::ApprovedByOrg {
            sequence: definition.sequence,
        };
        self.tracker.check(&definition.name, &next)?;
        let peer = one_peer(self.ctx(), &request.peer)?;
        let orderer = self.ctx().resolve_orderer(&request.orderer)?;

        let source = match &request.package_id {
            Some(id) => chaincode_source::Type::LocalPackage(chaincode_source::Local {
                package_id: non_empty(id, "package_id")?.to_string(),
            }),
            None => chaincode_source::Type::Unavailable(chaincode_source::Unavailable {}),
        };
        let args = ApproveChaincodeDefinitionForMyOrgArgs {
            sequence: definition.sequence,
            name: definition.name.clone(),
            version: definition.version.clone(),
            endorsement_plugin: definition.endorsement_plugin.clone(),
            validation_plugin: definition.validation_plugin.clone(),
            validation_parameter: encoded.validation_parameter,
            collections: encoded.collections,
            init_required: definition.init_required,
            source: Some(ChaincodeSource {
                r#type: Some(source),
            }),
        }
        .encode_to_vec();
        let result = self
            .pipeline
            .try_submit_single(
                &Self::request(&request.channel_id, APPROVE, args),
                &peer,
                &orderer,
            )
            .await?;
        tracing::info!(
            target: "lifecycle",
            chaincode = %definition.name,
            sequence = definition.sequence,
            tx_id = %result.tx_id,
            "approved"
        );
        self.tracker.record(&definition.name, next)?;
        Ok(result)
    }

    /// Returns the per-organization approval map for a definition.
    pub async fn check_commit_readiness(
        &self,
        request: &CheckReadinessRequest,
    ) -> Result<BTreeMap<String, bool>, OperationError> {
        run(self.ctx(), "checkCommitReadiness", self.try_check(request)).await
    }

    async fn try_check(&self, request: &CheckReadinessRequest) -> Result<BTreeMap<String, bool>, SdkError> {
        non_empty(&request.channel_id, "channel_id")?;
        let definition = &request.definition;
        let encoded = definition_args(definition)?;
        let peer = one_peer(self.ctx(), &request.peer)?;
        let args = CheckCommitReadinessArgs {
            sequence: definition.sequence,
            name: definition.name.clone(),
            version: definition.version.clone(),
            endorsement_plugin: definition.endorsement_plugin.clone(),
            validation_plugin: definition.validation_plugin.clone(),
            validation_parameter: encoded.validation_parameter,
            collections: encoded.collections,
            init_required: definition.init_required,
        }
        .encode_to_vec();
        let payload = self
            .pipeline
            .try_evaluate(
                &Self::request(&request.channel_id, CHECK_READINESS, args),
                &peer,
                RpcKind::Endorse,
            )
            .await?;
        let approvals = CheckCommitReadinessResult::decode(payload.as_slice())?.approvals;
        let next = LifecycleState::ReadyToCommit {
            sequence: definition.sequence,
            approvals: approvals.clone(),
        };
        if self.tracker.check(&definition.name, &next).is_ok() {
            self.tracker.record(&definition.name, next)?;
        }
        Ok(approvals)
    }

    /// Commits a definition. Peers that fail are reported as soft errors; the
    /// call fails only when no peer endorses.
    pub async fn commit(&self, request: &CommitRequest) -> Result<TransactionResult, OperationError> {
        run(self.ctx(), "commitChaincodeDefinition", self.try_commit(request)).await
    }

    async fn try_commit(&self, request: &CommitRequest) -> Result<TransactionResult, SdkError> {
        non_empty(&request.channel_id, "channel_id")?;
        let definition = &request.definition;
        let encoded = definition_args(definition)?;
        let next = LifecycleState::Committed {
            sequence: definition.sequence,
        };
        self.tracker.check(&definition.name, &next)?;
        if request.peers.is_empty() {
            return Err(ValidationError::MissingField("peers").into());
        }
        let peers = self.ctx().resolve_peers(request.peers.as_slice())?;
        let orderer = self.ctx().resolve_orderer(&request.orderer)?;

        let args = CommitChaincodeDefinitionArgs {
            sequence: definition.sequence,
            name: definition.name.clone(),
            version: definition.version.clone(),
            endorsement_plugin: definition.endorsement_plugin.clone(),
            validation_plugin: definition.validation_plugin.clone(),
            validation_parameter: encoded.validation_parameter,
            collections: encoded.collections,
            init_required: definition.init_required,
        }
        .encode_to_vec();
        let result = self
            .pipeline
            .try_submit(
                &Self::request(&request.channel_id, COMMIT, args),
                &peers,
                &orderer,
            )
            .await?;
        if !result.soft_errors.is_empty() {
            tracing::warn!(
                target: "lifecycle",
                chaincode = %definition.name,
                failed = result.soft_errors.len(),
                error = %result.soft_errors,
                "committed without some endorsers"
            );
        }
        tracing::info!(
            target: "lifecycle",
            chaincode = %definition.name,
            sequence = definition.sequence,
            endorsers = result.endorsers.len(),
            "committed"
        );
        self.tracker.record(&definition.name, next)?;
        Ok(result)
    }

    /// Packages installed on one peer.
    pub async fn query_installed(
        &self,
        peer: &str,
    ) -> Result<Vec<InstalledChaincode>, OperationError> {
        run(self.ctx(), "queryInstalled", self.try_query_installed(peer)).await
    }

    async fn try_query_installed(&self, peer: &str) -> Result<Vec<InstalledChaincode>, SdkError> {
        let peer = one_peer(self.ctx(), peer)?;
        let args = QueryInstalledChaincodesArgs {}.encode_to_vec();
        let payload = self
            .pipeline
            .try_evaluate(&Self::request("", QUERY_INSTALLED, args), &peer, RpcKind::Endorse)
            .await?;
        let result = QueryInstalledChaincodesResult::decode(payload.as_slice())?;
        Ok(result
            .installed_chaincodes
            .into_iter()
            .map(|c| InstalledChaincode {
                package_id: c.package_id,
                label: c.label,
            })
            .collect())
    }

    /// One committed definition with its approvals.
    pub async fn query_committed(
        &self,
        channel_id: &str,
        name: &str,
        peer: &str,
    ) -> Result<CommittedDefinition, OperationError> {
        run(
            self.ctx(),
            "queryCommitted",
            self.try_query_committed(channel_id, name, peer),
        )
        .await
    }

    async fn try_query_committed(
        &self,
        channel_id: &str,
        name: &str,
        peer: &str,
    ) -> Result<CommittedDefinition, SdkError> {
        non_empty(channel_id, "channel_id")?;
        let name = non_empty(name, "name")?;
        let peer = one_peer(self.ctx(), peer)?;
        let args = QueryChaincodeDefinitionArgs {
            name: name.to_string(),
        }
        .encode_to_vec();
        let payload = self
            .pipeline
            .try_evaluate(
                &Self::request(channel_id, QUERY_DEFINITION, args),
                &peer,
                RpcKind::Endorse,
            )
            .await?;
        let d = QueryChaincodeDefinitionResult::decode(payload.as_slice())?;
        Ok(CommittedDefinition {
            name: name.to_string(),
            sequence: d.sequence,
            version: d.version,
            endorsement_plugin: d.endorsement_plugin,
            validation_plugin: d.validation_plugin,
            validation_parameter: d.validation_parameter,
            collections: d.collections,
            init_required: d.init_required,
            approvals: d.approvals,
        })
    }

    /// Every definition committed on a channel.
    pub async fn query_committed_all(
        &self,
        channel_id: &str,
        peer: &str,
    ) -> Result<Vec<CommittedDefinition>, OperationError> {
        run(
            self.ctx(),
            "queryCommittedAll",
            self.try_query_committed_all(channel_id, peer),
        )
        .await
    }

    async fn try_query_committed_all(
        &self,
        channel_id: &str,
        peer: &str,
    ) -> Result<Vec<CommittedDefinition>, SdkError> {
        non_empty(channel_id, "channel_id")?;
        let peer = one_peer(self.ctx(), peer)?;
        let args = QueryChaincodeDefinitionsArgs {}.encode_to_vec();
        let payload = self
            .pipeline
            .try_evaluate(
                &Self::request(channel_id, QUERY_DEFINITIONS, args),
                &peer,
                RpcKind::Endorse,
            )
            .await?;
        let result = QueryChaincodeDefinitionsResult::decode(payload.as_slice())?;
        Ok(result
            .chaincode_definitions
            .into_iter()
            .map(|d| CommittedDefinition {
                name: d.name,
                sequence: d.sequence,
                version: d.version,
                endorsement_plugin: d.endorsement_plugin,
                validation_plugin: d.validation_plugin,
                validation_parameter: d.validation_parameter,
                collections: d.collections,
                init_required: d.init_required,
                approvals: BTreeMap::new(),
            })
            .collect())
    }
}

fn one_peer(ctx: &ClientContext, name: &str) -> Result<NodeConfig, SdkError> {
    let name = non_empty(name, "peer")?;
    let mut peers = ctx.resolve_peers(&[name])?;
    peers
        .pop()
        .ok_or_else(|| ValidationError::MissingField("peer").into())
}

#[cfg(test)]
mod tests;
