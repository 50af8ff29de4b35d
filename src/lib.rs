//! # podnorm
//!
//! Normalizes the convenience options users write when creating a
//! Docker/Podman container into the exact create payload the engine
//! expects, and verifies that the engine recorded what was asked for.
//!
//! ## Architecture Overview
//!
//! - **[`normalize`]**: pure translation of sizes, mounts, ports, volumes,
//!   extra hosts and devices into one create request
//! - **[`verify`]**: re-derives expectations from the same options and
//!   compares them with inspect output or in-container command output
//! - **[`container`]**: bollard-based engine client used by the CLI and the
//!   engine-backed tests
//! - **[`cli`]**: argument parsing, options files and configuration discovery
//!
//! ## Quick Start
//!
//! ```rust
//! use podnorm::normalize::{CreateRequestBuilder, VolumeSpec};
//!
//! let request = CreateRequestBuilder::new("quay.io/libpod/alpine:latest")
//!     .mem_limit("44m")
//!     .port("97/tcp", "43")
//!     .extra_host("host1 host3", "127.0.0.2")
//!     .volume("test_bind_1", VolumeSpec::new("/mnt/vol1").with_mode("rw"))
//!     .build()
//!     .unwrap();
//!
//! let host_config = request.host_config().unwrap();
//! assert_eq!(host_config.memory, Some(44 * 1024 * 1024));
//! assert_eq!(
//!     host_config.binds,
//!     Some(vec!["test_bind_1:/mnt/vol1:rw".to_string()])
//! );
//! ```

/// Container option normalization.
pub mod normalize;

/// Verification of engine-reported attributes and runtime output.
pub mod verify;

/// Docker/Podman engine client.
pub mod container;

/// Environment constants and path utilities.
pub mod env;

// CLI module for command-line interface
pub mod cli;

pub use container::{ContainerAttrs, ContainerClient, ContainerClientConfig};
pub use normalize::{
    CreateOptions, CreateRequest, CreateRequestBuilder, NormalizeError, NormalizerConfig,
};
pub use verify::{VerificationReport, VerifyError, verify_all};
