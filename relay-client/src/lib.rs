//! Relay HTTP Client
//!
//! A small, type-safe HTTP client for the Relay tracker API, shared by the CLI
//! and anything else that needs to drive pipeline runs remotely.
//!
//! # Example
//!
//! ```no_run
//! use relay_client::TrackerClient;
//! use relay_core::dto::run::CreateRun;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = TrackerClient::new("http://localhost:8080");
//!
//!     let run = client.create_run(CreateRun {
//!         branch: "main".to_string(),
//!         environment: "staging".to_string(),
//!         triggered_by: "ci".to_string(),
//!         commit: None,
//!     }).await?;
//!
//!     println!("Triggered run #{}", run.number);
//!     Ok(())
//! }
//! ```

pub mod error;
mod runs;

pub use error::{ClientError, Result};

use reqwest::Client;
use serde::de::DeserializeOwned;

/// HTTP client for the Relay tracker API
#[derive(Debug, Clone)]
pub struct TrackerClient {
    /// Base URL of the tracker (e.g., "http://localhost:8080")
    base_url: String,
    client: Client,
}

impl TrackerClient {
    /// Create a new tracker client
    ///
    /// # Example
    /// ```
    /// use relay_client::TrackerClient;
    ///
    /// let client = TrackerClient::new("http://localhost:8080");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a tracker client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Check the status code and deserialize the JSON body
    ///
    /// Error bodies of the form `{"error": "..."}` are unwrapped into the
    /// returned [`ClientError::ApiError`] message.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::debug!("Tracker returned {}: {}", status, error_text);
            return Err(ClientError::api_error(
                status.as_u16(),
                error_message(&error_text),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}

/// Pull the message out of an `{"error": "..."}` body, or keep the raw text
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}
