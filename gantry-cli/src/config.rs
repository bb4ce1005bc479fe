//! Configuration module
//!
//! Handles CLI configuration including the cluster API URL.

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the cluster management API
    pub cluster_url: String,
}
