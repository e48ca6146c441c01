// Path: crates/cli/src/commands/lifecycle.rs

use crate::util::{print_json, read_bytes, read_text, session};
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};
use stitch_client::lifecycle::{
    ApproveRequest, CheckReadinessRequest, CommitRequest, InstallRequest,
};
use stitch_client::Lifecycle;
use stitch_types::app::{ChaincodeDefinition, EndorsementPolicyRef};

#[derive(Parser, Debug)]
pub struct LifecycleArgs {
    #[clap(subcommand)]
    pub command: LifecycleCommands,
}

/// The chaincode definition every org agrees on.
#[derive(Args, Debug, Clone)]
pub struct DefinitionArgs {
    #[clap(long)]
    pub name: String,
    #[clap(long)]
    pub version: String,
    #[clap(long)]
    pub sequence: i64,
    /// Signature policy, e.g. `OR('Org1MSP.peer','Org2MSP.peer')` or its JSON form.
    #[clap(long, conflicts_with = "channel_policy")]
    pub policy: Option<String>,
    /// Channel config policy reference, e.g. `/Channel/Application/Endorsement`.
    #[clap(long)]
    pub channel_policy: Option<String>,
    /// Collection definitions (JSON array).
    #[clap(long)]
    pub collections: Option<PathBuf>,
    #[clap(long)]
    pub init_required: bool,
}

impl DefinitionArgs {
    fn to_definition(&self) -> Result<ChaincodeDefinition> {
        let mut definition = ChaincodeDefinition::new(&self.name, &self.version, self.sequence);
        definition.endorsement_policy = match (&self.policy, &self.channel_policy) {
            (Some(policy), _) => Some(EndorsementPolicyRef::SignaturePolicy(policy.clone())),
            (None, Some(reference)) => Some(EndorsementPolicyRef::ChannelConfigPolicy(reference.clone())),
            (None, None) => None,
        };
        definition.collections = self
            .collections
            .as_deref()
            .map(read_collections)
            .transpose()?;
        definition.init_required = self.init_required;
        Ok(definition)
    }
}

fn read_collections(path: &Path) -> Result<serde_json::Value> {
    Ok(serde_json::from_str(&read_text(path)?)?)
}

#[derive(Subcommand, Debug)]
pub enum LifecycleCommands {
    /// Install a chaincode package on one peer.
    Install {
        #[clap(long)]
        peer: String,
        #[clap(long)]
        label: String,
        /// The chaincode name, for local state tracking.
        #[clap(long, default_value = "")]
        name: String,
        package: PathBuf,
    },
    /// Approve a definition for this identity's organization.
    Approve {
        #[clap(long)]
        channel: String,
        #[clap(flatten)]
        definition: DefinitionArgs,
        /// Installed package to run; omit to approve without a local package.
        #[clap(long)]
        package_id: Option<String>,
        #[clap(long)]
        peer: String,
        #[clap(long)]
        orderer: String,
    },
    /// Show which organizations have approved a definition.
    Check {
        #[clap(long)]
        channel: String,
        #[clap(flatten)]
        definition: DefinitionArgs,
        #[clap(long)]
        peer: String,
    },
    /// Commit a definition, endorsed by several peers.
    Commit {
        #[clap(long)]
        channel: String,
        #[clap(flatten)]
        definition: DefinitionArgs,
        #[clap(long = "peer", required = true)]
        peers: Vec<String>,
        #[clap(long)]
        orderer: String,
    },
    /// List packages installed on a peer.
    Installed {
        #[clap(long)]
        peer: String,
    },
    /// Show committed definitions on a channel.
    Committed {
        #[clap(long)]
        channel: String,
        #[clap(long)]
        name: Option<String>,
        #[clap(long)]
        peer: String,
    },
}

pub async fn run(config: Option<&Path>, args: LifecycleArgs) -> Result<()> {
    let session = session(config)?;
    let lifecycle = Lifecycle::new(&session.ctx, &session.transport, &session.identity);

    match args.command {
        LifecycleCommands::Install {
            peer,
            label,
            name,
            package,
        } => {
            let installed = lifecycle
                .install(&InstallRequest {
                    peer,
                    chaincode_name: name,
                    label,
                    package: read_bytes(&package)?,
                })
                .await?;
            println!("Installed {}", installed.package_id);
        }
        LifecycleCommands::Approve {
            channel,
            definition,
            package_id,
            peer,
            orderer,
        } => {
            let result = lifecycle
                .approve(&ApproveRequest {
                    channel_id: channel,
                    definition: definition.to_definition()?,
                    package_id,
                    peer,
                    orderer,
                })
                .await?;
            println!("Approved in transaction {}", result.tx_id);
        }
        LifecycleCommands::Check {
            channel,
            definition,
            peer,
        } => {
            let approvals = lifecycle
                .check_commit_readiness(&CheckReadinessRequest {
                    channel_id: channel,
                    definition: definition.to_definition()?,
                    peer,
                })
                .await?;
            print_json(&approvals)?;
        }
        LifecycleCommands::Commit {
            channel,
            definition,
            peers,
            orderer,
        } => {
            let result = lifecycle
                .commit(&CommitRequest {
                    channel_id: channel,
                    definition: definition.to_definition()?,
                    peers,
                    orderer,
                })
                .await?;
            print_json(&json!({
                "tx_id": result.tx_id,
                "status": result.status,
                "endorsers": result.endorsers,
                "failed_peers": result
                    .soft_errors
                    .failures
                    .iter()
                    .map(|f| json!({ "peer": f.peer, "status": f.status, "message": f.message }))
                    .collect::<Vec<_>>(),
            }))?;
        }
        LifecycleCommands::Installed { peer } => {
            let installed = lifecycle.query_installed(&peer).await?;
            for chaincode in installed {
                println!("{}\t{}", chaincode.package_id, chaincode.label);
            }
        }
        LifecycleCommands::Committed {
            channel,
            name,
            peer,
        } => match name {
            Some(name) => print_json(&lifecycle.query_committed(&channel, &name, &peer).await?)?,
            None => print_json(&lifecycle.query_committed_all(&channel, &peer).await?)?,
        },
    }
    Ok(())
}
