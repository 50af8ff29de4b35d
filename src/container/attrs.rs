//! Engine-reported container attributes.
//!
//! Only the fields the verifier compares are modelled. Raw libpod inspect
//! JSON deserializes directly (including `Mounts[].Options`); bollard's
//! typed inspect response converts via [`From`], in which case mount options
//! are recovered from the `Mode` string.

use bollard::models::{ContainerInspectResponse, DeviceMapping, MountPoint, PortBinding};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Attributes of a created container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerAttrs {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub host_config: Option<ReportedHostConfig>,
    #[serde(default)]
    pub mounts: Option<Vec<ReportedMount>>,
}

impl ContainerAttrs {
    /// Parse raw inspect JSON.
    pub fn from_json_str(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }

    /// Reported mounts, empty when the engine sent none.
    pub fn mounts(&self) -> &[ReportedMount] {
        self.mounts.as_deref().unwrap_or_default()
    }
}

/// Host config fields the verifier reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReportedHostConfig {
    #[serde(default)]
    pub binds: Option<Vec<String>>,
    #[serde(default)]
    pub tmpfs: Option<HashMap<String, String>>,
    #[serde(default)]
    pub port_bindings: Option<HashMap<String, Option<Vec<PortBinding>>>>,
    #[serde(default)]
    pub extra_hosts: Option<Vec<String>>,
    #[serde(default)]
    pub memory: Option<i64>,
    #[serde(default)]
    pub memory_swap: Option<i64>,
    #[serde(default)]
    pub memory_reservation: Option<i64>,
    #[serde(default)]
    pub shm_size: Option<i64>,
    #[serde(default)]
    pub devices: Option<Vec<DeviceMapping>>,
}

/// One mount as reported by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReportedMount {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default, rename = "RW")]
    pub rw: Option<bool>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub options: Option<Vec<String>>,
}

impl ReportedMount {
    pub fn options(&self) -> &[String] {
        self.options.as_deref().unwrap_or_default()
    }
}

impl From<MountPoint> for ReportedMount {
    fn from(mount: MountPoint) -> Self {
        let options = mount.mode.as_deref().map(|mode| {
            mode.split(',')
                .filter(|option| !option.is_empty())
                .map(str::to_string)
                .collect()
        });

        Self {
            name: mount.name,
            source: mount.source,
            destination: mount.destination,
            rw: mount.rw,
            mode: mount.mode,
            options,
        }
    }
}

impl From<ContainerInspectResponse> for ContainerAttrs {
    fn from(inspect: ContainerInspectResponse) -> Self {
        let host_config = inspect.host_config.map(|hc| ReportedHostConfig {
            binds: hc.binds,
            tmpfs: hc.tmpfs,
            port_bindings: hc.port_bindings,
            extra_hosts: hc.extra_hosts,
            memory: hc.memory,
            memory_swap: hc.memory_swap,
            memory_reservation: hc.memory_reservation,
            shm_size: hc.shm_size,
            devices: hc.devices,
        });

        Self {
            id: inspect.id,
            name: inspect.name,
            host_config,
            mounts: inspect
                .mounts
                .map(|mounts| mounts.into_iter().map(ReportedMount::from).collect()),
        }
    }
}
