// Path: crates/client/src/collections.rs
//! Private data collection definitions.

use crate::policy::{application_policy, Policy};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;
use stitch_ipc::peer::{
    collection_config, collection_policy_config, CollectionConfig, CollectionConfigPackage,
    CollectionPolicyConfig, StaticCollectionConfig,
};
use stitch_types::app::EndorsementPolicyRef;
use stitch_types::error::ValidationError;

/// One collection in its JSON authoring form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CollectionDefinition {
    pub name: String,
    /// Membership policy in either policy syntax.
    pub policy: String,
    /// Peers that must receive the private data before endorsement returns.
    #[serde(default)]
    pub required_peer_count: i32,
    #[serde(default = "default_max_peers")]
    pub max_peer_count: i32,
    /// Blocks after which the data is purged; `0` keeps it forever.
    #[serde(default)]
    pub block_to_live: u64,
    #[serde(default)]
    pub member_only_read: bool,
    #[serde(default)]
    pub member_only_write: bool,
    #[serde(default)]
    pub endorsement_policy: Option<CollectionEndorsementPolicy>,
}

fn default_max_peers() -> i32 {
    1
}

/// A collection-level endorsement policy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CollectionEndorsementPolicy {
    SignaturePolicy(String),
    ChannelConfigPolicy(String),
}

impl CollectionDefinition {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        if self.required_peer_count < 0 {
            return Err(ValidationError::InvalidField {
                field: "requiredPeerCount",
                reason: format!("{} is negative", self.required_peer_count),
            });
        }
        if self.max_peer_count < self.required_peer_count {
            return Err(ValidationError::InvalidField {
                field: "maxPeerCount",
                reason: format!(
                    "{} is below requiredPeerCount {}",
                    self.max_peer_count, self.required_peer_count
                ),
            });
        }
        Ok(())
    }

    /// The wire form of this collection.
    pub fn to_proto(&self) -> Result<CollectionConfig, ValidationError> {
        self.validate()?;
        let membership = Policy::parse(&self.policy)?.to_signature_envelope()?;
        let endorsement_policy = match &self.endorsement_policy {
            None => None,
            Some(CollectionEndorsementPolicy::SignaturePolicy(text)) => Some(application_policy(
                &EndorsementPolicyRef::SignaturePolicy(text.clone()),
            )?),
            Some(CollectionEndorsementPolicy::ChannelConfigPolicy(path)) => Some(
                application_policy(&EndorsementPolicyRef::ChannelConfigPolicy(path.clone()))?,
            ),
        };
        Ok(CollectionConfig {
            payload: Some(collection_config::Payload::StaticCollectionConfig(
                StaticCollectionConfig {
                    name: self.name.clone(),
                    member_orgs_policy: Some(CollectionPolicyConfig {
                        payload: Some(collection_policy_config::Payload::SignaturePolicy(
                            membership,
                        )),
                    }),
                    required_peer_count: self.required_peer_count,
                    maximum_peer_count: self.max_peer_count,
                    block_to_live: self.block_to_live,
                    member_only_read: self.member_only_read,
                    member_only_write: self.member_only_write,
                    endorsement_policy,
                },
            )),
        })
    }
}

/// Parses a JSON array of collections into a config package.
pub fn collection_package(value: &Value) -> Result<CollectionConfigPackage, ValidationError> {
    let definitions: Vec<CollectionDefinition> =
        serde_json::from_value(value.clone()).map_err(|e| ValidationError::InvalidField {
            field: "collections",
            reason: e.to_string(),
        })?;
    let mut seen = BTreeSet::new();
    let mut config = Vec::with_capacity(definitions.len());
    for definition in &definitions {
        if !seen.insert(definition.name.as_str()) {
            return Err(ValidationError::InvalidField {
                field: "collections",
                reason: format!("duplicate collection '{}'", definition.name),
            });
        }
        config.push(definition.to_proto()?);
    }
    Ok(CollectionConfigPackage { config })
}
