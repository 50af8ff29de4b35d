//! Create request composition.
//!
//! Collects every normalized option into one engine create payload. The
//! builder follows the same fluent shape as the rest of the crate: set what
//! you need, call [`CreateRequestBuilder::build`], get either a complete
//! payload or the first normalization error.

use crate::normalize::device::parse_device;
use crate::normalize::hosts::expand_extra_hosts;
use crate::normalize::mount::{EncodedMount, MountSpec, encode_mount};
use crate::normalize::ports::{PortSpec, expand_port_map};
use crate::normalize::size::{SizeSpec, parse_size};
use crate::normalize::volume::{VolumeSpec, to_create_params};
use crate::normalize::{ConflictPolicy, CreateOptions, NormalizeError, NormalizerConfig, Result};
use bollard::models::{ContainerCreateBody, HostConfig};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

/// A fully normalized create request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateRequest {
    /// Container name, if the caller chose one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Payload for the engine's create endpoint
    pub body: ContainerCreateBody,
}

impl CreateRequest {
    /// The host config part of the payload.
    pub fn host_config(&self) -> Option<&HostConfig> {
        self.body.host_config.as_ref()
    }

    /// Pretty JSON of the engine payload.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.body)
    }
}

/// Builder for [`CreateRequest`].
#[derive(Debug, Clone)]
pub struct CreateRequestBuilder {
    image: String,
    options: CreateOptions,
    config: NormalizerConfig,
}

impl CreateRequestBuilder {
    /// Start a request for `image`.
    pub fn new<S: Into<String>>(image: S) -> Self {
        Self {
            image: image.into(),
            options: CreateOptions::default(),
            config: NormalizerConfig::default(),
        }
    }

    /// Replace all options at once.
    pub fn options(mut self, options: CreateOptions) -> Self {
        self.options = options;
        self
    }

    /// Set normalizer policies.
    pub fn config(mut self, config: NormalizerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.options.name = Some(name.into());
        self
    }

    pub fn command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.command = Some(command.into_iter().map(Into::into).collect());
        self
    }

    pub fn env<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.options.environment.insert(key.into(), value.into());
        self
    }

    pub fn mem_limit(mut self, size: impl Into<SizeSpec>) -> Self {
        self.options.mem_limit = Some(size.into());
        self
    }

    pub fn memswap_limit(mut self, size: impl Into<SizeSpec>) -> Self {
        self.options.memswap_limit = Some(size.into());
        self
    }

    pub fn mem_reservation(mut self, size: impl Into<SizeSpec>) -> Self {
        self.options.mem_reservation = Some(size.into());
        self
    }

    pub fn shm_size(mut self, size: impl Into<SizeSpec>) -> Self {
        self.options.shm_size = Some(size.into());
        self
    }

    /// Add a shorthand volume entry keyed by volume name or host path.
    pub fn volume<S: Into<String>>(mut self, name: S, spec: VolumeSpec) -> Self {
        self.options.volumes.insert(name.into(), spec);
        self
    }

    pub fn mount(mut self, mount: MountSpec) -> Self {
        self.options.mounts.push(mount);
        self
    }

    /// Map a container port (`"80"`, `"53/udp"`) to host bindings.
    pub fn port<S: Into<String>>(mut self, container_port: S, spec: impl Into<PortSpec>) -> Self {
        self.options.ports.insert(container_port.into(), spec.into());
        self
    }

    /// Add an extra host; `hosts` may list several names separated by spaces.
    pub fn extra_host<H: Into<String>, I: Into<String>>(mut self, hosts: H, ip: I) -> Self {
        self.options.extra_hosts.insert(hosts.into(), ip.into());
        self
    }

    pub fn device<S: Into<String>>(mut self, device: S) -> Self {
        self.options.devices.push(device.into());
        self
    }

    /// Normalize everything into a create request.
    ///
    /// # Errors
    ///
    /// Returns the first [`NormalizeError`] hit by any option.
    pub fn build(&self) -> Result<CreateRequest> {
        let image = self.image.trim();
        if image.is_empty() {
            return Err(NormalizeError::InvalidOption(
                "image is required".to_string(),
            ));
        }

        let options = &self.options;

        let memory = parse_optional_size(options.mem_limit.as_ref())?;
        let memory_swap = parse_optional_size(options.memswap_limit.as_ref())?;
        let memory_reservation = parse_optional_size(options.mem_reservation.as_ref())?;
        let shm_size = parse_optional_size(options.shm_size.as_ref())?;

        if let Some(swap) = memory_swap {
            match memory {
                None => {
                    return Err(NormalizeError::InvalidOption(
                        "memswap_limit requires mem_limit".to_string(),
                    ));
                }
                Some(limit) if swap < limit => {
                    return Err(NormalizeError::InvalidOption(format!(
                        "memswap_limit ({}) must not be smaller than mem_limit ({})",
                        swap, limit
                    )));
                }
                Some(_) => {}
            }
        }

        let (binds, tmpfs) = self.storage()?;
        let port_bindings = expand_port_map(&options.ports)?;
        let extra_hosts = expand_extra_hosts(&options.extra_hosts)?;
        let devices = options
            .devices
            .iter()
            .map(|device| parse_device(device))
            .collect::<Result<Vec<_>>>()?;
        let env = options
            .environment
            .iter()
            .map(|(key, value)| {
                if key.is_empty() || key.contains('=') {
                    return Err(NormalizeError::InvalidOption(format!(
                        "invalid environment variable name: {:?}",
                        key
                    )));
                }
                Ok(format!("{}={}", key, value))
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Normalized create request for {}: {} binds, {} tmpfs, {} ports, {} extra hosts, {} devices",
            image,
            binds.len(),
            tmpfs.len(),
            port_bindings.len(),
            extra_hosts.len(),
            devices.len()
        );

        let host_config = HostConfig {
            memory,
            memory_swap,
            memory_reservation,
            shm_size,
            binds: non_empty(binds),
            tmpfs: if tmpfs.is_empty() { None } else { Some(tmpfs) },
            port_bindings: if port_bindings.is_empty() {
                None
            } else {
                Some(port_bindings)
            },
            extra_hosts: non_empty(extra_hosts),
            devices: non_empty(devices),
            ..Default::default()
        };

        let body = ContainerCreateBody {
            image: Some(image.to_string()),
            cmd: options.command.clone(),
            entrypoint: options.entrypoint.clone(),
            env: non_empty(env),
            labels: if options.labels.is_empty() {
                None
            } else {
                Some(options.labels.clone().into_iter().collect())
            },
            working_dir: options.working_dir.clone(),
            user: options.user.clone(),
            host_config: Some(host_config),
            ..Default::default()
        };

        Ok(CreateRequest {
            name: options.name.clone(),
            body,
        })
    }

    /// Volumes then mounts, resolved against the conflict policy, split into
    /// `Binds` and `Tmpfs`.
    fn storage(&self) -> Result<(Vec<String>, HashMap<String, String>)> {
        let from_volumes = to_create_params(&self.options.volumes, self.config.mode_precedence)?;
        let from_mounts = self
            .options
            .mounts
            .iter()
            .map(encode_mount)
            .collect::<Result<Vec<_>>>()?;

        let mut claimed: Vec<EncodedMount> = Vec::new();
        for encoded in from_volumes.into_iter().chain(from_mounts) {
            if let Some(index) = claimed.iter().position(|c| c.target() == encoded.target()) {
                match self.config.conflict_policy {
                    ConflictPolicy::Reject => {
                        return Err(NormalizeError::InvalidOption(format!(
                            "container path {} is claimed by more than one volume or mount",
                            encoded.target()
                        )));
                    }
                    ConflictPolicy::LastWins => {
                        warn!(
                            "Container path {} claimed again; replacing {:?} with {:?}",
                            encoded.target(),
                            claimed[index],
                            encoded
                        );
                        claimed.remove(index);
                    }
                }
            }
            claimed.push(encoded);
        }

        let mut binds = Vec::new();
        let mut tmpfs = HashMap::new();
        for encoded in claimed {
            match encoded {
                EncodedMount::Bind { bind, .. } => binds.push(bind),
                EncodedMount::Tmpfs { target, options } => {
                    tmpfs.insert(target, options);
                }
            }
        }

        Ok((binds, tmpfs))
    }
}

/// Normalize `options` for `image` with default policies.
pub fn build_create_request(image: &str, options: &CreateOptions) -> Result<CreateRequest> {
    CreateRequestBuilder::new(image)
        .options(options.clone())
        .build()
}

fn parse_optional_size(spec: Option<&SizeSpec>) -> Result<Option<i64>> {
    spec.map(parse_size).transpose()
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() { None } else { Some(items) }
}
