// Path: crates/client/src/participation.rs
//! Orderer channel participation: listing, joining and leaving channels.

use crate::config_update::extract_config;
use crate::context::ClientContext;
use crate::normalize::{run, OperationError};
use crate::rest::RestClient;
use prost::Message;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use stitch_ipc::common::{Block, ChannelHeader, Envelope, Payload};
use stitch_types::config::RpcKind;
use stitch_types::error::{ConfigError, LedgerError, SdkError, TransportError};
use stitch_types::prelude::non_empty;

const CHANNELS_PATH: &str = "/participation/v1/channels";

/// A channel as listed by the orderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSummary {
    /// The channel id.
    pub name: String,
    /// The participation URL for the channel.
    #[serde(default)]
    pub url: String,
}

/// The orderer's channel list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelList {
    /// The system channel, on orderers that still run one.
    #[serde(default)]
    pub system_channel: Option<ChannelSummary>,
    /// Application channels the orderer participates in.
    #[serde(default)]
    pub channels: Vec<ChannelSummary>,
}

/// The orderer's view of one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelInfo {
    /// The channel id.
    pub name: String,
    /// The participation URL for the channel.
    #[serde(default)]
    pub url: String,
    /// `consenter`, `follower` or `config-tracker`.
    #[serde(default)]
    pub consensus_relation: String,
    /// `active`, `onboarding`, `inactive` or `failed`.
    #[serde(default)]
    pub status: String,
    /// Blocks on the orderer's ledger for the channel.
    #[serde(default)]
    pub height: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

fn parse_response<T: DeserializeOwned>(url: &str, status: u16, body: &str) -> Result<T, SdkError> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<ErrorBody>(body)
            .map(|e| e.error)
            .unwrap_or_else(|_| body.trim().to_string());
        return Err(TransportError::Http {
            url: url.to_string(),
            status,
            message,
        }
        .into());
    }
    serde_json::from_str(body)
        .map_err(|e| LedgerError::Decode(format!("participation response from {url}: {e}")).into())
}

/// Checks that `bytes` is a config block and returns its channel id.
fn config_block_channel(bytes: &[u8]) -> Result<String, SdkError> {
    let block = Block::decode(bytes)?;
    let config = extract_config(&block)?;
    let channel_id = block
        .data
        .as_ref()
        .and_then(|d| d.data.first())
        .map(|raw| channel_of(raw))
        .transpose()?
        .unwrap_or_default();
    tracing::debug!(target: "participation", channel = %channel_id, sequence = config.sequence, "config block accepted");
    Ok(channel_id)
}

fn channel_of(raw_envelope: &[u8]) -> Result<String, SdkError> {
    let envelope = Envelope::decode(raw_envelope)?;
    let payload = Payload::decode(envelope.payload.as_slice())?;
    let header = payload.header.unwrap_or_default();
    Ok(ChannelHeader::decode(header.channel_header.as_slice())?.channel_id)
}

/// REST client for an orderer's participation API.
pub struct Participation<'a> {
    ctx: &'a ClientContext,
    rest: RestClient,
}

impl<'a> Participation<'a> {
    /// Fails when the configuration names no participation endpoint.
    pub fn new(ctx: &'a ClientContext) -> Result<Self, SdkError> {
        let config = ctx
            .config()
            .participation
            .as_ref()
            .ok_or_else(|| ConfigError::Invalid("no participation endpoint configured".into()))?;
        let rest = RestClient::new(
            non_empty(&config.url, "participation.url")?,
            ctx.timeout(RpcKind::Participation),
            config.tls_ca_path.as_deref(),
        )?;
        Ok(Self { ctx, rest })
    }

    /// Lists the channels the orderer takes part in.
    pub async fn list(&self) -> Result<ChannelList, OperationError> {
        run(self.ctx, "listChannels", self.get(CHANNELS_PATH.to_string())).await
    }

    /// Fetches one channel's status and height.
    pub async fn get_channel(&self, channel_id: &str) -> Result<ChannelInfo, OperationError> {
        run(self.ctx, "getChannel", self.try_get_channel(channel_id)).await
    }

    async fn try_get_channel(&self, channel_id: &str) -> Result<ChannelInfo, SdkError> {
        let id = non_empty(channel_id, "channel_id")?;
        self.get(format!("{CHANNELS_PATH}/{id}")).await
    }

    /// Joins the orderer to the channel described by a config block.
    pub async fn join(&self, config_block: &[u8]) -> Result<ChannelInfo, OperationError> {
        run(self.ctx, "joinChannel", self.try_join(config_block)).await
    }

    async fn try_join(&self, config_block: &[u8]) -> Result<ChannelInfo, SdkError> {
        let channel_id = config_block_channel(config_block)?;
        let url = self.rest.url(CHANNELS_PATH);
        let part = Part::bytes(config_block.to_vec())
            .file_name("config.block")
            .mime_str("application/octet-stream")
            .map_err(|e| self.rest.error(&url, e))?;
        let response = self
            .rest
            .http()
            .post(&url)
            .multipart(Form::new().part("config-block", part))
            .send()
            .await
            .map_err(|e| self.rest.error(&url, e))?;
        let (status, body) = self.rest.read(&url, response).await?;
        let info: ChannelInfo = parse_response(&url, status, &body)?;
        tracing::info!(
            target: "participation",
            channel = %channel_id,
            relation = %info.consensus_relation,
            status = %info.status,
            "joined channel"
        );
        Ok(info)
    }

    /// Removes the orderer from a channel.
    pub async fn remove(&self, channel_id: &str) -> Result<(), OperationError> {
        run(self.ctx, "removeChannel", self.try_remove(channel_id)).await
    }

    async fn try_remove(&self, channel_id: &str) -> Result<(), SdkError> {
        let id = non_empty(channel_id, "channel_id")?;
        let url = self.rest.url(&format!("{CHANNELS_PATH}/{id}"));
        let response = self
            .rest
            .http()
            .delete(&url)
            .send()
            .await
            .map_err(|e| self.rest.error(&url, e))?;
        let (status, body) = self.rest.read(&url, response).await?;
        if !(200..300).contains(&status) {
            return parse_response::<serde_json::Value>(&url, status, &body).map(|_| ());
        }
        tracing::info!(target: "participation", channel = %id, "left channel");
        Ok(())
    }

    async fn get<T: DeserializeOwned>(&self, path: String) -> Result<T, SdkError> {
        let url = self.rest.url(&path);
        let response = self
            .rest
            .http()
            .get(&url)
            .send()
            .await
            .map_err(|e| self.rest.error(&url, e))?;
        let (status, body) = self.rest.read(&url, response).await?;
        parse_response(&url, status, &body)
    }
}
