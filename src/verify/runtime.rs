//! Comparisons against output captured inside a running container.
//!
//! These take plain text (container logs) so they work the same whether
//! the output came from the engine API or from a saved file.

use crate::normalize::device::device_name;
use crate::normalize::{
    CreateOptions, ExtraHostsSpec, MountSpec, expected_hosts_file_lines, parse_device,
};
use crate::verify::{Result, VerifyError};
use regex::Regex;
use std::fmt;
use std::str::FromStr;

/// A command run inside the container whose output can be checked
/// against the options it was created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeProbe {
    /// `cat /etc/hosts`, checked against `extra_hosts`
    Hosts,
    /// `ls -l /dev/`, checked against `devices`
    Devices,
    /// `df -h`, checked against sized tmpfs mounts
    Tmpfs,
}

impl RuntimeProbe {
    pub fn command(&self) -> Vec<String> {
        let command: &[&str] = match self {
            RuntimeProbe::Hosts => &["cat", "/etc/hosts"],
            RuntimeProbe::Devices => &["ls", "-l", "/dev/"],
            RuntimeProbe::Tmpfs => &["df", "-h"],
        };
        command.iter().map(|s| s.to_string()).collect()
    }

    /// Check the probe's output against `options`.
    pub fn check(&self, output: &str, options: &CreateOptions) -> Result<()> {
        match self {
            RuntimeProbe::Hosts => verify_hosts_file(output, &options.extra_hosts),
            RuntimeProbe::Devices => verify_device_numbers(output, &options.devices),
            RuntimeProbe::Tmpfs => {
                for mount in &options.mounts {
                    if let MountSpec::Tmpfs {
                        target,
                        size: Some(size),
                        ..
                    } = mount
                    {
                        verify_tmpfs_usage(output, target, size)?;
                    }
                }
                Ok(())
            }
        }
    }
}

impl FromStr for RuntimeProbe {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hosts" => Ok(RuntimeProbe::Hosts),
            "devices" => Ok(RuntimeProbe::Devices),
            "tmpfs" => Ok(RuntimeProbe::Tmpfs),
            other => Err(format!(
                "unknown probe {:?}, expected hosts, devices or tmpfs",
                other
            )),
        }
    }
}

impl fmt::Display for RuntimeProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeProbe::Hosts => write!(f, "hosts"),
            RuntimeProbe::Devices => write!(f, "devices"),
            RuntimeProbe::Tmpfs => write!(f, "tmpfs"),
        }
    }
}

/// Every expected `ip\thost` line is present in `/etc/hosts`.
pub fn verify_hosts_file(contents: &str, spec: &ExtraHostsSpec) -> Result<()> {
    for line in expected_hosts_file_lines(spec)? {
        if !contents.contains(&line) {
            return Err(VerifyError::mismatch("/etc/hosts", line, contents));
        }
    }
    Ok(())
}

/// Each mapped device has the same major/minor numbers as its host device
/// in the output of `ls -l /dev/`.
pub fn verify_device_numbers(ls_output: &str, devices: &[String]) -> Result<()> {
    for device in devices {
        let mapping = parse_device(device)?;
        let host = device_name(mapping.path_on_host.as_deref().unwrap_or_default());
        let container = device_name(mapping.path_in_container.as_deref().unwrap_or_default());

        let host_numbers = device_numbers(ls_output, host)?;
        let container_numbers = device_numbers(ls_output, container)?;

        if host_numbers != container_numbers {
            return Err(VerifyError::mismatch(
                format!("/dev/{}", container),
                host_numbers,
                container_numbers,
            ));
        }
    }
    Ok(())
}

fn device_numbers(ls_output: &str, name: &str) -> Result<String> {
    let pattern = format!(r"(?m)(\d+, *?\d+)[^\n]*? {}$", regex::escape(name));
    let re = Regex::new(&pattern)
        .map_err(|e| VerifyError::mismatch("device pattern", &pattern, e.to_string()))?;

    re.captures(ls_output)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().split(',').map(str::trim).collect::<Vec<_>>().join(", "))
        .ok_or_else(|| VerifyError::MissingField(format!("/dev/{}", name)))
}

/// `df -h` lists the tmpfs at `target` with the requested size.
///
/// `size` is the value given in the mount, e.g. `456k`, which `df -h`
/// prints as `456.0K`.
pub fn verify_tmpfs_usage(df_output: &str, target: &str, size: &str) -> Result<()> {
    let human = human_size(size);
    let pattern = format!(
        r"(?m){}[^\n]*?{}\s*$",
        regex::escape(&human),
        regex::escape(target)
    );
    let re = Regex::new(&pattern)
        .map_err(|e| VerifyError::mismatch("tmpfs pattern", &pattern, e.to_string()))?;

    if !re.is_match(df_output) {
        return Err(VerifyError::mismatch(
            format!("df {}", target),
            human,
            df_output,
        ));
    }
    Ok(())
}

fn human_size(size: &str) -> String {
    let size = size.trim();
    match size.char_indices().last() {
        Some((i, unit)) if matches!(unit.to_ascii_lowercase(), 'k' | 'm' | 'g') => {
            format!("{}.0{}", &size[..i], unit.to_ascii_uppercase())
        }
        _ => size.to_string(),
    }
}
