// Path: crates/client/src/rest.rs
//! Shared plumbing for the REST surfaces (CA and channel participation).

use reqwest::{Client, Response};
use std::path::Path;
use std::time::Duration;
use stitch_types::error::{ConfigError, SdkError, TransportError};

/// A reqwest client bound to one base URL and deadline.
#[derive(Debug, Clone)]
pub(crate) struct RestClient {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl RestClient {
    pub(crate) fn new(
        base_url: &str,
        timeout: Duration,
        tls_ca_path: Option<&Path>,
    ) -> Result<Self, SdkError> {
        let mut builder = Client::builder().timeout(timeout);
        if let Some(path) = tls_ca_path {
            let pem = std::fs::read(path).map_err(|e| ConfigError::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| ConfigError::Invalid(format!("TLS CA {}: {e}", path.display())))?;
            builder = builder.add_root_certificate(cert);
        }
        let http = builder
            .build()
            .map_err(|e| TransportError::InvalidEndpoint(format!("{base_url}: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Maps a reqwest failure onto the transport taxonomy.
    pub(crate) fn error(&self, url: &str, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout {
                url: url.to_string(),
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }
        } else if let Some(status) = e.status() {
            TransportError::Http {
                url: url.to_string(),
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            TransportError::Connection {
                url: url.to_string(),
                message: e.to_string(),
            }
        }
    }

    /// The status and body of a response, with body read failures mapped.
    pub(crate) async fn read(&self, url: &str, response: Response) -> Result<(u16, String), TransportError> {
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.error(url, e))?;
        Ok((status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_doubled_slashes() {
        let client = RestClient::new("https://ca.example.com:7054/", Duration::from_secs(1), None).unwrap();
        assert_eq!(
            client.url("/api/v1/enroll"),
            "https://ca.example.com:7054/api/v1/enroll"
        );
        assert_eq!(
            client.url("participation/v1/channels"),
            "https://ca.example.com:7054/participation/v1/channels"
        );
    }

    #[test]
    fn unreadable_tls_bundle_is_a_config_error() {
        let err = RestClient::new(
            "https://ca.example.com",
            Duration::from_secs(1),
            Some(Path::new("/nonexistent/tls-ca.pem")),
        )
        .unwrap_err();
        assert!(matches!(err, SdkError::Config(ConfigError::Io { .. })));
    }
}
