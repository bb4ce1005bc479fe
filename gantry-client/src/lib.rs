//! Gantry HTTP Client
//!
//! A type-safe HTTP client for the cluster management REST API.
//!
//! The API returns every entity as a property bag (see `gantry_core::rest`);
//! this crate issues the requests and decodes the bags into domain types. It is
//! the only place in the workspace that knows URLs or payload shapes; the
//! watchers and the CLI both go through it.
//!
//! # Example
//!
//! ```no_run
//! use gantry_client::ClusterClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), gantry_client::ClientError> {
//!     let client = ClusterClient::new("http://head-node:8080");
//!
//!     for node in client.list_nodes().await? {
//!         println!("{} is {}", node.name, node.state);
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
mod jobs;
mod nodes;

// Re-export commonly used types
pub use error::{ClientError, Result};

use reqwest::Client;
use serde::de::DeserializeOwned;

/// HTTP client for the cluster management API
///
/// Cheap to clone; clones share the underlying connection pool. Methods are
/// organized into logical groups:
/// - Node queries and state operations (`nodes.rs`)
/// - Job queries and lifecycle verbs (`jobs.rs`)
#[derive(Debug, Clone)]
pub struct ClusterClient {
    /// Base URL of the cluster API (e.g., "http://head-node:8080")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl ClusterClient {
    /// Create a new cluster client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the cluster API (e.g., "http://head-node:8080")
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// Create a new cluster client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the cluster API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Handle an API response and deserialize JSON
    ///
    /// Checks the status code and returns an appropriate error if the request
    /// failed, or deserializes the response body if successful.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response.json().await.map_err(|e| {
            ClientError::DecodeError(format!("Failed to parse JSON response: {}", e))
        })
    }

    /// Handle an API response that returns no content (the operation verbs)
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = ClusterClient::new("http://head-node:8080");
        assert_eq!(client.base_url(), "http://head-node:8080");
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = ClusterClient::new("http://head-node:8080/");
        assert_eq!(client.base_url(), "http://head-node:8080");
    }

    #[test]
    fn test_client_with_custom_client() {
        let http_client = Client::new();
        let client = ClusterClient::with_client("http://head-node:8080", http_client);
        assert_eq!(client.base_url(), "http://head-node:8080");
    }
}
