//! Checks that an engine honoured a normalized create request.
//!
//! Expectations are always re-derived from the user's [`CreateOptions`]
//! through the normalizer, then compared against what the engine reported:
//!
//! - [`attrs`]: comparisons against inspect output ([`ContainerAttrs`])
//! - [`runtime`]: comparisons against output captured inside a running
//!   container (`/etc/hosts`, `ls -l /dev/`, `df -h`)
//!
//! Every check reports a [`VerifyError`] instead of panicking, and
//! [`verify_all`] collects every failure rather than stopping at the first.

pub mod attrs;
pub mod runtime;

pub use attrs::{
    MemoryField, verify_binds, verify_devices, verify_extra_hosts, verify_memory,
    verify_port_bindings, verify_tmpfs, verify_volume_mounts,
};
pub use runtime::{RuntimeProbe, verify_device_numbers, verify_hosts_file, verify_tmpfs_usage};

use crate::container::ContainerAttrs;
use crate::normalize::{CreateOptions, MountSpec, NormalizeError, NormalizerConfig};
use std::fmt;
use tracing::debug;

/// Verification errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    /// The engine reported something other than what was requested
    #[error("{field}: expected {expected}, got {actual}")]
    Mismatch {
        field: String,
        expected: String,
        actual: String,
    },

    /// A field the check needs is absent from the engine's report
    #[error("{0} missing from container attributes")]
    MissingField(String),

    /// Expectations could not be derived from the options
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}

impl VerifyError {
    pub(crate) fn mismatch(
        field: impl Into<String>,
        expected: impl fmt::Debug,
        actual: impl fmt::Debug,
    ) -> Self {
        VerifyError::Mismatch {
            field: field.into(),
            expected: format!("{:?}", expected),
            actual: format!("{:?}", actual),
        }
    }
}

/// Result type for verification.
pub type Result<T> = std::result::Result<T, VerifyError>;

/// Outcome of [`verify_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationReport {
    /// Names of the checks that ran
    pub checks: Vec<&'static str>,
    /// One entry per failed check
    pub failures: Vec<VerifyError>,
}

impl VerificationReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, check: &'static str, outcome: Result<()>) {
        self.checks.push(check);
        if let Err(e) = outcome {
            debug!("Check {} failed: {}", check, e);
            self.failures.push(e);
        }
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} checks, {} failed",
            self.checks.len(),
            self.failures.len()
        )?;
        for failure in &self.failures {
            writeln!(f, "  - {}", failure)?;
        }
        Ok(())
    }
}

/// Run every check that applies to `options`.
///
/// Checks for options the user did not set are skipped.
pub fn verify_all(
    attrs: &ContainerAttrs,
    options: &CreateOptions,
    config: &NormalizerConfig,
) -> VerificationReport {
    let mut report = VerificationReport::default();

    let memory = [
        (MemoryField::Memory, options.mem_limit.as_ref()),
        (MemoryField::MemorySwap, options.memswap_limit.as_ref()),
        (MemoryField::MemoryReservation, options.mem_reservation.as_ref()),
        (MemoryField::ShmSize, options.shm_size.as_ref()),
    ];
    for (field, spec) in memory {
        if let Some(spec) = spec {
            report.record(field.as_str(), verify_memory(attrs, field, spec));
        }
    }

    if !options.ports.is_empty() {
        report.record("PortBindings", verify_port_bindings(attrs, &options.ports));
    }
    if !options.extra_hosts.is_empty() {
        report.record("ExtraHosts", verify_extra_hosts(attrs, &options.extra_hosts));
    }
    if options
        .mounts
        .iter()
        .any(|m| !matches!(m, MountSpec::Tmpfs { .. }))
    {
        report.record("Binds", verify_binds(attrs, &options.mounts));
    }
    if options
        .mounts
        .iter()
        .any(|m| matches!(m, MountSpec::Tmpfs { .. }))
    {
        report.record("Tmpfs", verify_tmpfs(attrs, &options.mounts));
    }
    if !options.volumes.is_empty() {
        report.record(
            "Mounts",
            verify_volume_mounts(attrs, &options.volumes, config.mode_precedence),
        );
    }
    if !options.devices.is_empty() {
        report.record("Devices", verify_devices(attrs, &options.devices));
    }

    debug!(
        "Verification finished: {} checks, {} failures",
        report.checks.len(),
        report.failures.len()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{ReportedHostConfig, ReportedMount};
    use crate::normalize::{SizeSpec, VolumeSpec};

    fn options() -> CreateOptions {
        let mut options = CreateOptions {
            mem_limit: Some(SizeSpec::from("44m")),
            devices: vec!["/dev/null:/dev/foo".to_string()],
            ..Default::default()
        };
        options
            .volumes
            .insert("data".to_string(), VolumeSpec::new("/data").with_mode("ro"));
        options
            .extra_hosts
            .insert("db".to_string(), "10.0.0.5".to_string());
        options
    }

    fn honoured_attrs() -> ContainerAttrs {
        ContainerAttrs {
            id: Some("abc".to_string()),
            host_config: Some(ReportedHostConfig {
                memory: Some(44 * 1024 * 1024),
                extra_hosts: Some(vec!["db:10.0.0.5".to_string()]),
                devices: Some(vec![bollard::models::DeviceMapping {
                    path_on_host: Some("/dev/null".to_string()),
                    path_in_container: Some("/dev/foo".to_string()),
                    cgroup_permissions: Some(String::new()),
                }]),
                ..Default::default()
            }),
            mounts: Some(vec![ReportedMount {
                name: Some("data".to_string()),
                destination: Some("/data".to_string()),
                rw: Some(false),
                ..Default::default()
            }]),
            ..Default::default()
        }
    }

    #[test]
    fn test_verify_all_passes() {
        let report = verify_all(&honoured_attrs(), &options(), &NormalizerConfig::default());

        assert!(report.is_ok(), "{}", report);
        assert_eq!(report.checks, vec!["Memory", "ExtraHosts", "Mounts", "Devices"]);
    }

    #[test]
    fn test_verify_all_collects_every_failure() {
        let mut attrs = honoured_attrs();
        if let Some(hc) = attrs.host_config.as_mut() {
            hc.memory = Some(1);
            hc.extra_hosts = None;
        }

        let report = verify_all(&attrs, &options(), &NormalizerConfig::default());

        assert_eq!(report.failures.len(), 2);
        assert!(matches!(
            &report.failures[0],
            VerifyError::Mismatch { field, .. } if field == "Memory"
        ));
        assert_eq!(
            report.failures[1],
            VerifyError::MissingField("HostConfig.ExtraHosts".to_string())
        );
        assert!(report.to_string().starts_with("4 checks, 2 failed"));
    }

    #[test]
    fn test_normalize_errors_are_reported() {
        let options = CreateOptions {
            shm_size: Some(SizeSpec::from("12q")),
            ..Default::default()
        };
        let report = verify_all(&honoured_attrs(), &options, &NormalizerConfig::default());

        assert!(matches!(
            report.failures.as_slice(),
            [VerifyError::Normalize(NormalizeError::InvalidSize(_))]
        ));
    }

    #[test]
    fn test_nothing_requested_nothing_checked() {
        let report = verify_all(
            &ContainerAttrs::default(),
            &CreateOptions::default(),
            &NormalizerConfig::default(),
        );
        assert!(report.is_ok());
        assert!(report.checks.is_empty());
    }
}
