//! Shorthand volume translation.
//!
//! A volume map looks like
//!
//! ```toml
//! [volumes.test_bind_1]
//! bind = "/mnt/vol1"
//! mode = "rw"
//!
//! [volumes.test_bind_2]
//! bind = "/mnt/vol2"
//! extended_mode = ["ro", "noexec"]
//! ```
//!
//! Each entry becomes one bind string for the create request and one
//! [`ExpectedMount`] describing what the engine should report afterwards.

use crate::normalize::mount::{EncodedMount, bind_string, check_source, check_target};
use crate::normalize::{ModePrecedence, NormalizeError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One volume entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeSpec {
    /// Container path
    pub bind: String,
    /// `"ro"` or `"rw"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Additional mount options; `ro`/`rw` here also set the access mode
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extended_mode: Vec<String>,
}

impl VolumeSpec {
    pub fn new(bind: impl Into<String>) -> Self {
        Self {
            bind: bind.into(),
            mode: None,
            extended_mode: Vec::new(),
        }
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    pub fn with_extended_mode<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extended_mode = options.into_iter().map(Into::into).collect();
        self
    }

    /// Extended options other than `ro`/`rw`, deduplicated, in order.
    pub fn extra_options(&self) -> Vec<String> {
        let mut extra: Vec<String> = Vec::new();
        for option in &self.extended_mode {
            if option != "ro" && option != "rw" && !extra.contains(option) {
                extra.push(option.clone());
            }
        }
        extra
    }
}

/// Volume name or host path to volume entry, in the caller's order.
pub type VolumeMap = IndexMap<String, VolumeSpec>;

/// What the engine is expected to report for one requested volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedMount {
    /// Volume name, or host path when `host_path` is set
    pub name: String,
    pub host_path: bool,
    pub destination: String,
    /// Only set when the caller asked for a specific access mode
    pub rw: Option<bool>,
    /// Options that must appear in the reported mount options
    pub options: Vec<String>,
}

/// Resolve the read-write flag of a volume entry.
///
/// No `ro`/`rw` signal anywhere means read-write.
///
/// # Errors
///
/// [`NormalizeError::InvalidOption`] when `mode` is neither `ro` nor `rw`;
/// [`NormalizeError::AmbiguousMode`] when `extended_mode` holds both tokens
/// without a `mode`, or when `mode` contradicts `extended_mode` under
/// [`ModePrecedence::Strict`].
pub fn resolve_rw(spec: &VolumeSpec, precedence: ModePrecedence) -> Result<bool> {
    Ok(requested_rw(spec, precedence)?.unwrap_or(true))
}

fn requested_rw(spec: &VolumeSpec, precedence: ModePrecedence) -> Result<Option<bool>> {
    let mode = match spec.mode.as_deref() {
        None => None,
        Some("rw") => Some(true),
        Some("ro") => Some(false),
        Some(other) => {
            return Err(NormalizeError::InvalidOption(format!(
                "volume mode for {} must be 'ro' or 'rw', got {:?}",
                spec.bind, other
            )));
        }
    };
    let has_ro = spec.extended_mode.iter().any(|o| o == "ro");
    let has_rw = spec.extended_mode.iter().any(|o| o == "rw");

    match mode {
        None if has_ro && has_rw => Err(NormalizeError::AmbiguousMode(format!(
            "extended_mode for {} contains both 'ro' and 'rw'",
            spec.bind
        ))),
        None if has_ro => Ok(Some(false)),
        None if has_rw => Ok(Some(true)),
        None => Ok(None),
        Some(rw) => {
            let contradicted = if rw { has_ro } else { has_rw };
            if !contradicted {
                return Ok(Some(rw));
            }
            match precedence {
                ModePrecedence::ExplicitMode => {
                    debug!(
                        "mode {:?} overrides extended_mode for {}",
                        spec.mode, spec.bind
                    );
                    Ok(Some(rw))
                }
                ModePrecedence::Strict => Err(NormalizeError::AmbiguousMode(format!(
                    "mode {:?} contradicts extended_mode {:?} for {}",
                    spec.mode, spec.extended_mode, spec.bind
                ))),
            }
        }
    }
}

/// Bind strings for the create request, one per entry, in map order.
pub fn to_create_params(volumes: &VolumeMap, precedence: ModePrecedence) -> Result<Vec<EncodedMount>> {
    volumes
        .iter()
        .map(|(name, spec)| {
            check_source(name)?;
            check_target(&spec.bind)?;

            let rw = resolve_rw(spec, precedence)?;
            let extra = spec.extra_options();
            let options: Vec<&str> = std::iter::once(if rw { "rw" } else { "ro" })
                .chain(extra.iter().map(String::as_str))
                .collect();

            Ok(EncodedMount::Bind {
                target: spec.bind.clone(),
                bind: bind_string(name, &spec.bind, &options),
            })
        })
        .collect()
}

/// Mounts the engine should report, one per entry, in map order.
pub fn to_engine_mounts(
    volumes: &VolumeMap,
    precedence: ModePrecedence,
) -> Result<Vec<ExpectedMount>> {
    volumes
        .iter()
        .map(|(name, spec)| {
            Ok(ExpectedMount {
                name: name.clone(),
                host_path: name.starts_with('/'),
                destination: spec.bind.clone(),
                rw: requested_rw(spec, precedence)?,
                options: spec.extra_options(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_volumes() -> VolumeMap {
        let mut volumes = VolumeMap::new();
        volumes.insert(
            "test_bind_1".to_string(),
            VolumeSpec::new("/mnt/vol1").with_mode("rw"),
        );
        volumes.insert(
            "test_bind_2".to_string(),
            VolumeSpec::new("/mnt/vol2").with_extended_mode(["ro", "noexec"]),
        );
        volumes.insert(
            "test_bind_3".to_string(),
            VolumeSpec::new("/mnt/vol3")
                .with_extended_mode(["noexec"])
                .with_mode("rw"),
        );
        volumes
    }

    #[test]
    fn test_resolve_rw_from_mode() {
        let ro = VolumeSpec::new("/a").with_mode("ro");
        let rw = VolumeSpec::new("/a").with_mode("rw");
        assert!(!resolve_rw(&ro, ModePrecedence::default()).unwrap());
        assert!(resolve_rw(&rw, ModePrecedence::default()).unwrap());
    }

    #[test]
    fn test_resolve_rw_from_extended_mode() {
        let spec = VolumeSpec::new("/a").with_extended_mode(["ro", "noexec"]);
        assert!(!resolve_rw(&spec, ModePrecedence::default()).unwrap());
    }

    #[test]
    fn test_resolve_rw_defaults_to_read_write() {
        let spec = VolumeSpec::new("/a").with_extended_mode(["noexec"]);
        assert!(resolve_rw(&spec, ModePrecedence::default()).unwrap());
    }

    #[test]
    fn test_both_tokens_without_mode_is_ambiguous() {
        let spec = VolumeSpec::new("/a").with_extended_mode(["ro", "rw"]);
        assert!(matches!(
            resolve_rw(&spec, ModePrecedence::ExplicitMode),
            Err(NormalizeError::AmbiguousMode(_))
        ));
    }

    #[test]
    fn test_explicit_mode_overrides_extended_mode() {
        let spec = VolumeSpec::new("/a")
            .with_mode("rw")
            .with_extended_mode(["ro"]);
        assert!(resolve_rw(&spec, ModePrecedence::ExplicitMode).unwrap());
        assert!(matches!(
            resolve_rw(&spec, ModePrecedence::Strict),
            Err(NormalizeError::AmbiguousMode(_))
        ));
    }

    #[test]
    fn test_invalid_mode() {
        let spec = VolumeSpec::new("/a").with_mode("rx");
        assert!(matches!(
            resolve_rw(&spec, ModePrecedence::default()),
            Err(NormalizeError::InvalidOption(_))
        ));
    }

    #[test]
    fn test_create_params() {
        let binds: Vec<String> = to_create_params(&sample_volumes(), ModePrecedence::default())
            .unwrap()
            .into_iter()
            .map(|encoded| match encoded {
                EncodedMount::Bind { bind, .. } => bind,
                EncodedMount::Tmpfs { .. } => panic!("volumes never encode to tmpfs"),
            })
            .collect();

        assert_eq!(
            binds,
            vec![
                "test_bind_1:/mnt/vol1:rw",
                "test_bind_2:/mnt/vol2:ro,noexec",
                "test_bind_3:/mnt/vol3:rw,noexec",
            ]
        );
    }

    #[test]
    fn test_engine_mounts() {
        let mounts = to_engine_mounts(&sample_volumes(), ModePrecedence::default()).unwrap();

        assert_eq!(mounts.len(), 3);
        assert_eq!(mounts[0].rw, Some(true));
        assert!(mounts[0].options.is_empty());
        assert_eq!(mounts[1].rw, Some(false));
        assert_eq!(mounts[1].options, vec!["noexec"]);
        assert_eq!(mounts[2].rw, Some(true));
        assert_eq!(mounts[2].options, vec!["noexec"]);
        assert!(mounts.iter().all(|m| !m.host_path));
    }

    #[test]
    fn test_host_path_keys() {
        let mut volumes = VolumeMap::new();
        volumes.insert("/srv/data".to_string(), VolumeSpec::new("/data"));
        let mounts = to_engine_mounts(&volumes, ModePrecedence::default()).unwrap();
        assert!(mounts[0].host_path);
        assert_eq!(mounts[0].rw, None);
    }

    #[test]
    fn test_extra_options_deduplicated() {
        let spec = VolumeSpec::new("/a").with_extended_mode(["noexec", "ro", "noexec", "nosuid"]);
        assert_eq!(spec.extra_options(), vec!["noexec", "nosuid"]);
    }

    #[test]
    fn test_relative_bind_rejected() {
        let mut volumes = VolumeMap::new();
        volumes.insert("data".to_string(), VolumeSpec::new("mnt"));
        assert!(matches!(
            to_create_params(&volumes, ModePrecedence::default()),
            Err(NormalizeError::MalformedSpec(_))
        ));
    }
}
