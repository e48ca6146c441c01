// Path: crates/client/src/config_update.rs
//! Channel configuration updates: computing, signing and enveloping them.

use crate::identity::SigningIdentity;
use crate::policy::Policy;
use prost::Message;
use stitch_ipc::common::{
    Block, ChannelHeader, Config, ConfigEnvelope, ConfigGroup, ConfigPolicy, ConfigSignature,
    ConfigUpdate, ConfigUpdateEnvelope, ConfigValue, Envelope, HeaderType, Payload,
};
use stitch_types::error::{LedgerError, SdkError, ValidationError};
use stitch_types::prelude::OptionExt;

/// The default modification policy for new elements.
pub const DEFAULT_MOD_POLICY: &str = "Admins";

/// One admin's signature over an encoded `ConfigUpdate`.
pub fn sign_config_update(
    identity: &SigningIdentity,
    config_update: &[u8],
) -> Result<ConfigSignature, SdkError> {
    let signature_header = identity.new_signature_header().encode_to_vec();
    let mut message = Vec::with_capacity(signature_header.len() + config_update.len());
    message.extend_from_slice(&signature_header);
    message.extend_from_slice(config_update);
    let signature = identity.sign(&message)?;
    Ok(ConfigSignature {
        signature_header,
        signature,
    })
}

/// Wraps an encoded update and its collected signatures.
pub fn build_config_update_envelope(
    config_update: Vec<u8>,
    signatures: Vec<ConfigSignature>,
) -> ConfigUpdateEnvelope {
    ConfigUpdateEnvelope {
        config_update,
        signatures,
    }
}

/// Reads the channel configuration out of a config block.
pub fn extract_config(block: &Block) -> Result<Config, SdkError> {
    let first = block
        .data
        .as_ref()
        .and_then(|d| d.data.first())
        .required(LedgerError::Decode("block has no data".into()))?;
    let envelope = Envelope::decode(first.as_slice())?;
    let payload = Payload::decode(envelope.payload.as_slice())?;
    let header = payload
        .header
        .required(LedgerError::Decode("payload has no header".into()))?;
    let channel_header = ChannelHeader::decode(header.channel_header.as_slice())?;
    if channel_header.r#type != HeaderType::Config as i32 {
        return Err(LedgerError::Decode(format!(
            "block carries header type {}, not a config",
            channel_header.r#type
        ))
        .into());
    }
    let config_envelope = ConfigEnvelope::decode(payload.data.as_slice())?;
    Ok(config_envelope
        .config
        .required(LedgerError::Decode("config envelope is empty".into()))?)
}

/// Computes a read set and write set against the current config.
///
/// Only the touched groups appear in either set. Modified or added elements
/// get the next version; their ancestors keep their current version.
#[derive(Debug, Clone)]
pub struct ConfigUpdateBuilder {
    channel_id: String,
    current: ConfigGroup,
    read_set: ConfigGroup,
    write_set: ConfigGroup,
}

impl ConfigUpdateBuilder {
    /// Starts from the current config with an empty change set.
    pub fn new(channel_id: impl Into<String>, config: &Config) -> Self {
        let current = config.channel_group.clone().unwrap_or_default();
        let skeleton = skeleton(&current);
        Self {
            channel_id: channel_id.into(),
            current,
            read_set: skeleton.clone(),
            write_set: skeleton,
        }
    }

    /// The current group at `path`, if it exists.
    pub fn read(&self, path: &[&str]) -> Option<&ConfigGroup> {
        path.iter()
            .try_fold(&self.current, |group, name| group.groups.get(*name))
    }

    fn touch(&mut self, path: &[&str]) -> Result<(&ConfigGroup, &mut ConfigGroup), ValidationError> {
        let mut current = &self.current;
        let mut read = &mut self.read_set;
        let mut write = &mut self.write_set;
        for name in path {
            current = current
                .groups
                .get(*name)
                .ok_or_else(|| ValidationError::InvalidField {
                    field: "path",
                    reason: format!("no config group '{}'", path.join("/")),
                })?;
            read = read
                .groups
                .entry((*name).to_string())
                .or_insert_with(|| skeleton(current));
            write = write
                .groups
                .entry((*name).to_string())
                .or_insert_with(|| skeleton(current));
        }
        Ok((current, write))
    }

    /// Sets a value in the group at `path`.
    pub fn set_value(
        &mut self,
        path: &[&str],
        key: &str,
        value: Vec<u8>,
    ) -> Result<&mut Self, ValidationError> {
        let (current, write) = self.touch(path)?;
        let existing = current.values.get(key);
        let version = existing.map_or(0, |v| v.version + 1);
        let mod_policy = existing.map_or_else(|| DEFAULT_MOD_POLICY.to_string(), |v| v.mod_policy.clone());
        write.values.insert(
            key.to_string(),
            ConfigValue {
                version,
                value,
                mod_policy,
            },
        );
        Ok(self)
    }

    /// Sets a policy in the group at `path`.
    pub fn set_policy(
        &mut self,
        path: &[&str],
        key: &str,
        policy: &Policy,
    ) -> Result<&mut Self, ValidationError> {
        let encoded = policy.to_proto()?;
        let (current, write) = self.touch(path)?;
        let existing = current.policies.get(key);
        let version = existing.map_or(0, |p| p.version + 1);
        let mod_policy = existing.map_or_else(|| DEFAULT_MOD_POLICY.to_string(), |p| p.mod_policy.clone());
        write.policies.insert(
            key.to_string(),
            ConfigPolicy {
                version,
                policy: Some(encoded),
                mod_policy,
            },
        );
        Ok(self)
    }

    /// Adds a new child group under `path`, bumping the parent's version.
    pub fn add_group(
        &mut self,
        path: &[&str],
        name: &str,
        mut group: ConfigGroup,
    ) -> Result<&mut Self, ValidationError> {
        let (current, write) = self.touch(path)?;
        if current.groups.contains_key(name) {
            return Err(ValidationError::InvalidField {
                field: "group",
                reason: format!("group '{name}' already exists"),
            });
        }
        write.version = current.version + 1;
        group.version = 0;
        if group.mod_policy.is_empty() {
            group.mod_policy = DEFAULT_MOD_POLICY.to_string();
        }
        write.groups.insert(name.to_string(), group);
        Ok(self)
    }

    /// The update with read and write sets as staged so far.
    pub fn build(&self) -> ConfigUpdate {
        ConfigUpdate {
            channel_id: self.channel_id.clone(),
            read_set: Some(self.read_set.clone()),
            write_set: Some(self.write_set.clone()),
            isolated_data: Default::default(),
        }
    }
}

fn skeleton(group: &ConfigGroup) -> ConfigGroup {
    ConfigGroup {
        version: group.version,
        mod_policy: group.mod_policy.clone(),
        ..Default::default()
    }
}
