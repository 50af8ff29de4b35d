//! User-facing create options and normalizer policies.

use crate::normalize::hosts::ExtraHostsSpec;
use crate::normalize::mount::MountSpec;
use crate::normalize::ports::PortMap;
use crate::normalize::size::SizeSpec;
use crate::normalize::volume::VolumeMap;
use crate::normalize::{NormalizeError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// How an explicit volume `mode` interacts with `ro`/`rw` in `extended_mode`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModePrecedence {
    /// `mode` wins over a contradicting `extended_mode` token
    #[default]
    ExplicitMode,
    /// Any contradiction is an error
    Strict,
}

/// What happens when two options claim the same container path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Fail with `InvalidOption`
    #[default]
    Reject,
    /// The later claim replaces the earlier one; mounts apply after volumes
    LastWins,
}

/// Normalizer policies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    #[serde(default)]
    pub mode_precedence: ModePrecedence,
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,
}

/// Container options as a user writes them.
///
/// Every field is optional. Maps are ordered so that expansion follows the
/// order of the source document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub environment: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub labels: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// `HostConfig.Memory`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem_limit: Option<SizeSpec>,
    /// `HostConfig.MemorySwap`; requires `mem_limit`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memswap_limit: Option<SizeSpec>,
    /// `HostConfig.MemoryReservation`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem_reservation: Option<SizeSpec>,
    /// `HostConfig.ShmSize`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shm_size: Option<SizeSpec>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub volumes: VolumeMap,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mounts: Vec<MountSpec>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub ports: PortMap,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub extra_hosts: ExtraHostsSpec,
    /// `"<hostPath>:<containerPath>[:<perms>]"`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub devices: Vec<String>,
}

impl CreateOptions {
    /// Parse options from TOML.
    ///
    /// # Errors
    ///
    /// Unknown keys and badly shaped values surface as
    /// [`NormalizeError::InvalidOption`].
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| NormalizeError::InvalidOption(e.to_string()))
    }

    /// Parse options from JSON.
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| NormalizeError::InvalidOption(e.to_string()))
    }

    pub fn to_toml_string(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
