// Path: crates/types/src/app/mod.rs
//! Core application-level data structures shared across the client crates.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

/// Numeric status codes used by the transport and the ledger.
///
/// Values below 17 are gRPC status codes. Values at or above 100 are the
/// HTTP-like application statuses peers and orderers put in their responses.
pub mod status {
    /// The call completed successfully.
    pub const OK: i32 = 0;
    /// The operation was cancelled.
    pub const CANCELLED: i32 = 1;
    /// An unknown error.
    pub const UNKNOWN: i32 = 2;
    /// The caller supplied an invalid argument.
    pub const INVALID_ARGUMENT: i32 = 3;
    /// The deadline expired before the operation completed.
    pub const DEADLINE_EXCEEDED: i32 = 4;
    /// A requested entity was not found.
    pub const NOT_FOUND: i32 = 5;
    /// The entity the caller attempted to create already exists.
    pub const ALREADY_EXISTS: i32 = 6;
    /// The caller does not have permission.
    pub const PERMISSION_DENIED: i32 = 7;
    /// A resource has been exhausted.
    pub const RESOURCE_EXHAUSTED: i32 = 8;
    /// The system is not in a state required for the operation.
    pub const FAILED_PRECONDITION: i32 = 9;
    /// The operation was aborted.
    pub const ABORTED: i32 = 10;
    /// The operation was attempted past the valid range.
    pub const OUT_OF_RANGE: i32 = 11;
    /// The operation is not implemented.
    pub const UNIMPLEMENTED: i32 = 12;
    /// An internal error.
    pub const INTERNAL: i32 = 13;
    /// The service is currently unavailable.
    pub const UNAVAILABLE: i32 = 14;
    /// Unrecoverable data loss or corruption.
    pub const DATA_LOSS: i32 = 15;
    /// The request lacks valid authentication credentials.
    pub const UNAUTHENTICATED: i32 = 16;

    /// Application success (common.Status SUCCESS).
    pub const SUCCESS: i32 = 200;
    /// Application statuses at or above this value are errors.
    pub const ERROR_THRESHOLD: i32 = 400;
}

/// The well-known name of the lifecycle system chaincode.
pub const LIFECYCLE_CHAINCODE: &str = "_lifecycle";

fn default_endorsement_plugin() -> String {
    "escc".to_string()
}
fn default_validation_plugin() -> String {
    "vscc".to_string()
}

/// How a chaincode definition names its endorsement policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndorsementPolicyRef {
    /// A reference to a policy in the channel config, e.g. `/Channel/Application/Endorsement`.
    ChannelConfigPolicy(String),
    /// An inline signature policy in either the string or JSON authoring syntax.
    SignaturePolicy(String),
}

/// A chaincode definition as agreed on by the channel members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChaincodeDefinition {
    /// The chaincode name.
    pub name: String,
    /// The chaincode version label.
    pub version: String,
    /// The definition sequence; increments with each upgrade.
    pub sequence: i64,
    /// The endorsement policy, or the channel default when absent.
    #[serde(default)]
    pub endorsement_policy: Option<EndorsementPolicyRef>,
    /// Private data collection definitions in their JSON authoring form.
    #[serde(default)]
    pub collections: Option<serde_json::Value>,
    /// Whether `Init` must be invoked before other transactions.
    #[serde(default)]
    pub init_required: bool,
    /// The endorsement plugin name.
    #[serde(default = "default_endorsement_plugin")]
    pub endorsement_plugin: String,
    /// The validation plugin name.
    #[serde(default = "default_validation_plugin")]
    pub validation_plugin: String,
}

impl ChaincodeDefinition {
    /// Creates a definition with default plugins and no policy or collections.
    pub fn new(name: impl Into<String>, version: impl Into<String>, sequence: i64) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            sequence,
            endorsement_policy: None,
            collections: None,
            init_required: false,
            endorsement_plugin: default_endorsement_plugin(),
            validation_plugin: default_validation_plugin(),
        }
    }

    /// Checks the fields every lifecycle call needs.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        if self.version.trim().is_empty() {
            return Err(ValidationError::MissingField("version"));
        }
        if self.sequence < 1 {
            return Err(ValidationError::InvalidField {
                field: "sequence",
                reason: format!("must be at least 1, got {}", self.sequence),
            });
        }
        Ok(())
    }
}

/// A chaincode package installed on a peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledChaincode {
    /// The content-derived package id (`label:hash`).
    pub package_id: String,
    /// The package label.
    pub label: String,
}
