//! Engine transport boundary.
//!
//! The normalizer itself never talks to an engine. This module wraps the
//! bollard Docker/Podman API so the CLI and integration tests can send a
//! [`CreateRequest`](crate::normalize::CreateRequest), read back what the
//! engine recorded, and clean up.
//!
//! - `client`: connection handling, create/inspect/run/remove
//! - `attrs`: the subset of inspect output the verifier compares against
//!
//! ## Usage
//!
//! ```rust,no_run
//! use podnorm::container::ContainerClient;
//! use podnorm::normalize::CreateRequestBuilder;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = ContainerClient::new().await?;
//!
//!     let request = CreateRequestBuilder::new("quay.io/libpod/alpine:latest")
//!         .mem_limit("44m")
//!         .build()?;
//!
//!     let id = client.create_container(&request).await?;
//!     let attrs = client.inspect_attrs(&id).await?;
//!     println!("{:?}", attrs.host_config);
//!
//!     client.remove_container(&id, true).await?;
//!     Ok(())
//! }
//! ```

mod attrs;
mod client;

pub use attrs::{ContainerAttrs, ReportedHostConfig, ReportedMount};
pub use client::{ContainerClient, ContainerClientConfig, RunOutput, RuntimeType};

/// Container engine errors.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    /// Docker/Podman API error
    #[error("Container API error: {0}")]
    ApiError(#[from] bollard::errors::Error),

    /// Container not found
    #[error("Container not found: {0}")]
    NotFound(String),

    /// Client configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// General error
    #[error("Container error: {0}")]
    Other(String),
}

/// Result type for container operations.
pub type Result<T> = std::result::Result<T, ContainerError>;
