// Path: crates/client/src/normalize.rs
//! Turns every failure into one response shape with a stable operation name.

use crate::context::ClientContext;
use serde::Serialize;
use std::future::Future;
use stitch_types::app::status;
use stitch_types::error::{ErrorCode, SdkError, TransportError};
use thiserror::Error;

/// The uniform result shape reported to callers and logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedResponse {
    /// The public operation that produced this response.
    pub function_name: &'static str,
    pub is_error: bool,
    /// gRPC-style code; `0` on success.
    pub status: i32,
    /// Human-readable outcome.
    pub message: String,
    /// The untouched transport text, when a transport produced the failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_transport_data: Option<String>,
}

impl NormalizedResponse {
    /// A successful outcome.
    pub fn ok(function_name: &'static str, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.is_empty() {
            default_message(status::OK).to_string()
        } else {
            message
        };
        Self {
            function_name,
            is_error: false,
            status: status::OK,
            message,
            raw_transport_data: None,
        }
    }

    /// The normalized form of `error`.
    pub fn from_error(function_name: &'static str, error: &SdkError) -> Self {
        let status = error.status();
        let (message, raw) = match error {
            SdkError::Transport(t) => {
                let raw = t.message();
                (transport_message(t, &raw), Some(raw))
            }
            other => (other.to_string(), None),
        };
        let message = if message.trim().is_empty() {
            default_message(status).to_string()
        } else {
            message
        };
        Self {
            function_name,
            is_error: true,
            status,
            message,
            raw_transport_data: raw,
        }
    }
}

fn transport_message(error: &TransportError, raw: &str) -> String {
    match connectivity_hint(raw) {
        Some(hint) => format!("{hint} ({raw})"),
        None if raw.trim().is_empty() => String::new(),
        None => error.to_string(),
    }
}

const BROWSER_CORS_MARKERS: [&str; 4] = [
    "Response closed without headers",
    "Failed to fetch",
    "NetworkError",
    "ERR_CERT_",
];

const TLS_MARKERS: [&str; 4] = [
    "UnknownIssuer",
    "invalid peer certificate",
    "self signed certificate",
    "error trying to connect",
];

/// An actionable hint for proxy and certificate failures.
pub fn connectivity_hint(message: &str) -> Option<&'static str> {
    if BROWSER_CORS_MARKERS.iter().any(|m| message.contains(m)) {
        return Some(
            "Unable to reach the node through the proxy; check CORS settings and accept the node's TLS certificate",
        );
    }
    if TLS_MARKERS.iter().any(|m| message.contains(m)) {
        return Some(
            "TLS handshake with the node failed; configure its TLS root certificate or host override",
        );
    }
    None
}

/// The fallback text for a status with no message.
pub fn default_message(code: i32) -> &'static str {
    match code {
        0 => "OK",
        1 => "The operation was cancelled",
        2 => "Unknown error",
        3 => "Invalid argument",
        4 => "Deadline exceeded before the operation completed",
        5 => "Requested entity was not found",
        6 => "Entity already exists",
        7 => "Permission denied",
        8 => "Resource exhausted",
        9 => "Operation rejected because the system is not in the required state",
        10 => "The operation was aborted",
        11 => "Operation attempted past the valid range",
        12 => "Operation is not implemented or not supported",
        13 => "Internal error",
        14 => "The service is currently unavailable",
        15 => "Unrecoverable data loss or corruption",
        16 => "Request lacks valid authentication credentials",
        400 => "Bad request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not found",
        408 => "Request timeout",
        409 => "Conflict",
        429 => "Too many requests",
        500 => "Internal server error",
        502 => "Bad gateway",
        503 => "Service unavailable",
        504 => "Gateway timeout",
        _ => "Unexpected error",
    }
}

/// The error every public operation returns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{function_name} failed: {}", .response.message)]
pub struct OperationError {
    /// The public operation that failed.
    pub function_name: &'static str,
    /// The typed cause.
    #[source]
    pub error: SdkError,
    /// The cause in uniform shape.
    pub response: NormalizedResponse,
}

impl OperationError {
    /// Normalizes `error` for `function_name`.
    pub fn new(function_name: &'static str, error: SdkError) -> Self {
        let response = NormalizedResponse::from_error(function_name, &error);
        Self {
            function_name,
            error,
            response,
        }
    }

    /// The normalized status code.
    pub fn status(&self) -> i32 {
        self.response.status
    }
}

impl ErrorCode for OperationError {
    fn code(&self) -> &'static str {
        self.error.code()
    }
}

/// Runs an operation, normalizing and recording its failure.
pub async fn run<T, F>(ctx: &ClientContext, function_name: &'static str, fut: F) -> Result<T, OperationError>
where
    F: Future<Output = Result<T, SdkError>>,
{
    match fut.await {
        Ok(value) => Ok(value),
        Err(error) => {
            ctx.metrics().errors().inc_error(function_name, error.code());
            let error = OperationError::new(function_name, error);
            tracing::warn!(
                target: "pipeline",
                function = function_name,
                status = error.response.status,
                code = error.code(),
                message = %error.response.message,
                "operation failed"
            );
            Err(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stitch_types::config::ClientConfig;
    use stitch_types::error::{LedgerError, ValidationError};

    #[test]
    fn empty_transport_message_falls_back_to_table() {
        let error = SdkError::Transport(TransportError::Rpc {
            url: "grpc://peer0".into(),
            code: 14,
            message: String::new(),
        });
        let response = NormalizedResponse::from_error("queryInstalled", &error);
        assert!(response.is_error);
        assert_eq!(response.status, 14);
        assert_eq!(response.message, default_message(14));
        assert_eq!(response.raw_transport_data.as_deref(), Some(""));
    }

    #[test]
    fn tls_failures_get_a_hint() {
        let error = SdkError::Transport(TransportError::Connection {
            url: "grpcs://peer0".into(),
            message: "invalid peer certificate: UnknownIssuer".into(),
        });
        let response = NormalizedResponse::from_error("submit", &error);
        assert!(response.message.starts_with("TLS handshake"));
        assert!(response.message.contains("UnknownIssuer"));
        assert_eq!(response.status, 14);
    }

    #[test]
    fn browser_failures_get_a_cors_hint() {
        assert!(connectivity_hint("TypeError: Failed to fetch")
            .unwrap()
            .contains("CORS"));
        assert!(connectivity_hint("ERR_CERT_AUTHORITY_INVALID").is_some());
        assert!(connectivity_hint("chaincode not found").is_none());
    }

    #[test]
    fn http_statuses_have_defaults() {
        for code in [400, 401, 403, 404, 408, 409, 429, 500, 502, 503, 504] {
            assert_ne!(default_message(code), "Unexpected error", "{code}");
        }
        assert_eq!(default_message(299), "Unexpected error");
    }

    #[tokio::test]
    async fn run_wraps_errors_with_the_function_name() {
        let ctx = ClientContext::new(ClientConfig::default());
        let err = run(&ctx, "approve", async {
            Err::<(), _>(SdkError::Ledger(LedgerError::LiarSuccess {
                peer: "peer0".into(),
                code: 7,
                message: "identity is not an admin".into(),
            }))
        })
        .await
        .unwrap_err();
        assert_eq!(err.function_name, "approve");
        assert_eq!(err.status(), 7);
        assert_eq!(err.code(), "LEDGER_LIAR_SUCCESS");

        let ok = run(&ctx, "approve", async { Ok::<_, SdkError>(5) }).await;
        assert_eq!(ok.unwrap(), 5);
        let missing = run(&ctx, "install", async {
            Err::<(), _>(SdkError::Validation(ValidationError::MissingField("peer")))
        })
        .await
        .unwrap_err();
        assert_eq!(missing.response.status, 3);
    }
}
