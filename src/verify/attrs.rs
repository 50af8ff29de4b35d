//! Comparisons against engine inspect output.

use crate::container::{ContainerAttrs, ReportedHostConfig, ReportedMount};
use crate::normalize::volume::to_engine_mounts;
use crate::normalize::{
    EncodedMount, ExtraHostsSpec, ModePrecedence, MountSpec, PortMap, SizeSpec, VolumeMap,
    encode_mount, expand_extra_hosts, expand_port_map, parse_device, parse_size,
};
use crate::verify::{Result, VerifyError};
use bollard::models::PortBinding;

/// Memory-like host config fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryField {
    Memory,
    MemorySwap,
    MemoryReservation,
    ShmSize,
}

impl MemoryField {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryField::Memory => "Memory",
            MemoryField::MemorySwap => "MemorySwap",
            MemoryField::MemoryReservation => "MemoryReservation",
            MemoryField::ShmSize => "ShmSize",
        }
    }

    fn reported(&self, host_config: &ReportedHostConfig) -> Option<i64> {
        match self {
            MemoryField::Memory => host_config.memory,
            MemoryField::MemorySwap => host_config.memory_swap,
            MemoryField::MemoryReservation => host_config.memory_reservation,
            MemoryField::ShmSize => host_config.shm_size,
        }
    }
}

fn host_config(attrs: &ContainerAttrs) -> Result<&ReportedHostConfig> {
    attrs
        .host_config
        .as_ref()
        .ok_or_else(|| VerifyError::MissingField("HostConfig".to_string()))
}

fn reported<'a, T>(value: Option<&'a T>, field: &str) -> Result<&'a T> {
    value.ok_or_else(|| VerifyError::MissingField(format!("HostConfig.{}", field)))
}

/// The reported byte count equals the parsed request exactly.
pub fn verify_memory(attrs: &ContainerAttrs, field: MemoryField, expected: &SizeSpec) -> Result<()> {
    let expected = parse_size(expected)?;
    let actual = field
        .reported(host_config(attrs)?)
        .ok_or_else(|| VerifyError::MissingField(format!("HostConfig.{}", field.as_str())))?;

    if actual != expected {
        return Err(VerifyError::mismatch(field.as_str(), expected, actual));
    }
    Ok(())
}

/// Reported port keys and bindings are exactly the requested ones.
///
/// Engines do not keep binding order, so this is set membership in both
/// directions rather than list equality. An unset host IP and an empty one
/// are the same.
pub fn verify_port_bindings(attrs: &ContainerAttrs, ports: &PortMap) -> Result<()> {
    let expected = expand_port_map(ports)?;
    let actual = reported(host_config(attrs)?.port_bindings.as_ref(), "PortBindings")?;

    for (key, bindings) in actual {
        let Some(wanted) = expected.get(key) else {
            return Err(VerifyError::mismatch(
                "PortBindings",
                expected.keys().collect::<Vec<_>>(),
                key,
            ));
        };
        let wanted = wanted.as_deref().unwrap_or_default();
        for binding in bindings.as_deref().unwrap_or_default() {
            if !wanted.iter().any(|w| same_binding(w, binding)) {
                return Err(VerifyError::mismatch(
                    format!("PortBindings[{}]", key),
                    wanted,
                    binding,
                ));
            }
        }
    }

    for (key, wanted) in &expected {
        let Some(bindings) = actual.get(key) else {
            return Err(VerifyError::mismatch(
                "PortBindings",
                key,
                actual.keys().collect::<Vec<_>>(),
            ));
        };
        let bindings = bindings.as_deref().unwrap_or_default();
        for binding in wanted.as_deref().unwrap_or_default() {
            if !bindings.iter().any(|b| same_binding(binding, b)) {
                return Err(VerifyError::mismatch(
                    format!("PortBindings[{}]", key),
                    binding,
                    bindings,
                ));
            }
        }
    }
    Ok(())
}

fn same_binding(a: &PortBinding, b: &PortBinding) -> bool {
    a.host_ip.as_deref().unwrap_or_default() == b.host_ip.as_deref().unwrap_or_default()
        && a.host_port == b.host_port
}

/// Reported extra hosts equal the expansion, in order.
pub fn verify_extra_hosts(attrs: &ContainerAttrs, spec: &ExtraHostsSpec) -> Result<()> {
    let expected = expand_extra_hosts(spec)?;
    let actual = reported(host_config(attrs)?.extra_hosts.as_ref(), "ExtraHosts")?;

    if *actual != expected {
        return Err(VerifyError::mismatch("ExtraHosts", expected, actual));
    }
    Ok(())
}

/// Each bind string encoded from `mounts` appears in reported `Binds`.
pub fn verify_binds(attrs: &ContainerAttrs, mounts: &[MountSpec]) -> Result<()> {
    let binds = reported(host_config(attrs)?.binds.as_ref(), "Binds")?;

    for mount in mounts {
        if let EncodedMount::Bind { bind, .. } = encode_mount(mount)? {
            if !binds.contains(&bind) {
                return Err(VerifyError::mismatch("Binds", bind, binds));
            }
        }
    }
    Ok(())
}

/// Each tmpfs target reports exactly the encoded option string.
pub fn verify_tmpfs(attrs: &ContainerAttrs, mounts: &[MountSpec]) -> Result<()> {
    let tmpfs = reported(host_config(attrs)?.tmpfs.as_ref(), "Tmpfs")?;

    for mount in mounts {
        if let EncodedMount::Tmpfs { target, options } = encode_mount(mount)? {
            let actual = tmpfs.get(&target);
            if actual != Some(&options) {
                return Err(VerifyError::mismatch(
                    format!("Tmpfs[{}]", target),
                    options,
                    actual,
                ));
            }
        }
    }
    Ok(())
}

/// Each requested volume shows up once in the reported mounts.
///
/// Named volumes match on `Name`, host paths on `Source`. The access mode
/// is only asserted when it was requested, and every extra option must be
/// listed in the mount's options. Reported mounts at destinations no volume
/// claimed are ignored.
pub fn verify_volume_mounts(
    attrs: &ContainerAttrs,
    volumes: &VolumeMap,
    precedence: ModePrecedence,
) -> Result<()> {
    let expected = to_engine_mounts(volumes, precedence)?;
    let mounts = attrs.mounts();

    let relevant = mounts
        .iter()
        .filter(|m| {
            expected
                .iter()
                .any(|e| m.destination.as_deref() == Some(e.destination.as_str()))
        })
        .count();
    if relevant != expected.len() {
        return Err(VerifyError::mismatch("Mounts", expected.len(), relevant));
    }

    for wanted in &expected {
        let found = mounts.iter().find(|m| {
            let key = if wanted.host_path { &m.source } else { &m.name };
            key.as_deref() == Some(wanted.name.as_str())
        });
        let Some(found) = found else {
            return Err(VerifyError::mismatch(
                "Mounts",
                &wanted.name,
                mounts.iter().map(mount_key).collect::<Vec<_>>(),
            ));
        };

        if found.destination.as_deref() != Some(wanted.destination.as_str()) {
            return Err(VerifyError::mismatch(
                format!("Mounts[{}].Destination", wanted.name),
                &wanted.destination,
                &found.destination,
            ));
        }

        if let Some(rw) = wanted.rw {
            let actual = found.rw.ok_or_else(|| {
                VerifyError::MissingField(format!("Mounts[{}].RW", wanted.name))
            })?;
            if actual != rw {
                return Err(VerifyError::mismatch(
                    format!("Mounts[{}].RW", wanted.name),
                    rw,
                    actual,
                ));
            }
        }

        for option in &wanted.options {
            if !found.options().contains(option) {
                return Err(VerifyError::mismatch(
                    format!("Mounts[{}].Options", wanted.name),
                    option,
                    found.options(),
                ));
            }
        }
    }
    Ok(())
}

fn mount_key(mount: &ReportedMount) -> &str {
    mount
        .name
        .as_deref()
        .or(mount.source.as_deref())
        .unwrap_or_default()
}

/// Each requested device has a reported mapping with the same paths.
pub fn verify_devices(attrs: &ContainerAttrs, devices: &[String]) -> Result<()> {
    let actual = reported(host_config(attrs)?.devices.as_ref(), "Devices")?;

    for device in devices {
        let wanted = parse_device(device)?;
        let present = actual.iter().any(|d| {
            d.path_on_host == wanted.path_on_host && d.path_in_container == wanted.path_in_container
        });
        if !present {
            return Err(VerifyError::mismatch("Devices", device, actual));
        }
    }
    Ok(())
}
