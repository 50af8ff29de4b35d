//! Mount descriptor encoding.
//!
//! Bind and volume mounts become entries of `HostConfig.Binds`, tmpfs mounts
//! become entries of `HostConfig.Tmpfs`. Option order is fixed because the
//! engine echoes these strings back verbatim.

use crate::normalize::{NormalizeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Propagation used for bind mounts when none is given.
pub const DEFAULT_PROPAGATION: Propagation = Propagation::Rprivate;

/// Options appended to every tmpfs mount after the optional size.
pub const TMPFS_OPTIONS: [&str; 5] = ["rw", "rprivate", "nosuid", "nodev", "tmpcopyup"];

/// Mount propagation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Propagation {
    Private,
    Rprivate,
    Shared,
    Rshared,
    Slave,
    Rslave,
}

impl Propagation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Propagation::Private => "private",
            Propagation::Rprivate => "rprivate",
            Propagation::Shared => "shared",
            Propagation::Rshared => "rshared",
            Propagation::Slave => "slave",
            Propagation::Rslave => "rslave",
        }
    }
}

impl fmt::Display for Propagation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mount descriptor, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MountSpec {
    /// Host path bound into the container
    Bind {
        source: String,
        target: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        read_only: Option<bool>,
        /// SELinux relabel flag, `z` or `Z`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        relabel: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        propagation: Option<Propagation>,
    },
    /// In-memory filesystem
    Tmpfs {
        /// Ignored by the engine, kept for parity with other mount types
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<String>,
        target: String,
        /// Passed through as written, e.g. `"456k"`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size: Option<String>,
    },
    /// Named volume
    Volume {
        source: String,
        target: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        read_only: Option<bool>,
    },
}

impl MountSpec {
    /// Container path this mount claims.
    pub fn target(&self) -> &str {
        match self {
            MountSpec::Bind { target, .. }
            | MountSpec::Tmpfs { target, .. }
            | MountSpec::Volume { target, .. } => target,
        }
    }
}

/// Wire form of a mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedMount {
    /// Entry for `HostConfig.Binds`
    Bind { target: String, bind: String },
    /// Entry for `HostConfig.Tmpfs`, keyed by target
    Tmpfs { target: String, options: String },
}

impl EncodedMount {
    pub fn target(&self) -> &str {
        match self {
            EncodedMount::Bind { target, .. } | EncodedMount::Tmpfs { target, .. } => target,
        }
    }
}

/// Encode a mount descriptor into its wire form.
///
/// # Errors
///
/// Returns [`NormalizeError::MalformedSpec`] for empty sources, relative
/// targets or paths containing `:`, and [`NormalizeError::InvalidOption`]
/// for relabel flags other than `z`/`Z`.
pub fn encode_mount(spec: &MountSpec) -> Result<EncodedMount> {
    match spec {
        MountSpec::Bind {
            source,
            target,
            read_only,
            relabel,
            propagation,
        } => {
            check_source(source)?;
            check_target(target)?;

            let mut options = vec![rw_flag(*read_only)];
            if let Some(relabel) = relabel {
                options.push(check_relabel(relabel)?);
            }
            options.push(propagation.unwrap_or(DEFAULT_PROPAGATION).as_str());
            options.push("rbind");

            Ok(EncodedMount::Bind {
                target: target.clone(),
                bind: bind_string(source, target, &options),
            })
        }
        MountSpec::Tmpfs { target, size, .. } => {
            check_target(target)?;

            let size_option = size.as_ref().map(|size| format!("size={}", size));
            let options = size_option
                .iter()
                .map(String::as_str)
                .chain(TMPFS_OPTIONS)
                .collect::<Vec<_>>()
                .join(",");

            Ok(EncodedMount::Tmpfs {
                target: target.clone(),
                options,
            })
        }
        MountSpec::Volume {
            source,
            target,
            read_only,
        } => {
            check_source(source)?;
            check_target(target)?;

            Ok(EncodedMount::Bind {
                target: target.clone(),
                bind: bind_string(source, target, &[rw_flag(*read_only)]),
            })
        }
    }
}

/// Join `source:target:opt1,opt2,...`.
pub(crate) fn bind_string(source: &str, target: &str, options: &[&str]) -> String {
    format!("{}:{}:{}", source, target, options.join(","))
}

pub(crate) fn check_source(source: &str) -> Result<()> {
    if source.is_empty() {
        return Err(NormalizeError::MalformedSpec(
            "mount source must not be empty".to_string(),
        ));
    }
    if source.contains(':') {
        return Err(NormalizeError::MalformedSpec(format!(
            "mount source must not contain ':': {}",
            source
        )));
    }
    Ok(())
}

pub(crate) fn check_target(target: &str) -> Result<()> {
    if !target.starts_with('/') {
        return Err(NormalizeError::MalformedSpec(format!(
            "mount target must be an absolute path: {:?}",
            target
        )));
    }
    if target.contains(':') {
        return Err(NormalizeError::MalformedSpec(format!(
            "mount target must not contain ':': {}",
            target
        )));
    }
    Ok(())
}

fn rw_flag(read_only: Option<bool>) -> &'static str {
    if read_only.unwrap_or(false) { "ro" } else { "rw" }
}

fn check_relabel(relabel: &str) -> Result<&'static str> {
    match relabel {
        "z" => Ok("z"),
        "Z" => Ok("Z"),
        other => Err(NormalizeError::InvalidOption(format!(
            "relabel must be 'z' or 'Z', got {:?}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bind(source: &str, target: &str) -> MountSpec {
        MountSpec::Bind {
            source: source.to_string(),
            target: target.to_string(),
            read_only: None,
            relabel: None,
            propagation: None,
        }
    }

    #[test]
    fn test_bind_with_relabel() {
        let spec = MountSpec::Bind {
            source: "/etc/hosts".to_string(),
            target: "/test".to_string(),
            read_only: Some(true),
            relabel: Some("Z".to_string()),
            propagation: None,
        };

        assert_eq!(
            encode_mount(&spec).unwrap(),
            EncodedMount::Bind {
                target: "/test".to_string(),
                bind: "/etc/hosts:/test:ro,Z,rprivate,rbind".to_string(),
            }
        );
    }

    #[test]
    fn test_bind_defaults_to_read_write() {
        let encoded = encode_mount(&bind("/srv/data", "/data")).unwrap();
        assert_eq!(
            encoded,
            EncodedMount::Bind {
                target: "/data".to_string(),
                bind: "/srv/data:/data:rw,rprivate,rbind".to_string(),
            }
        );
    }

    #[test]
    fn test_bind_custom_propagation() {
        let spec = MountSpec::Bind {
            source: "/srv".to_string(),
            target: "/srv".to_string(),
            read_only: Some(false),
            relabel: Some("z".to_string()),
            propagation: Some(Propagation::Rshared),
        };
        let EncodedMount::Bind { bind, .. } = encode_mount(&spec).unwrap() else {
            panic!("expected bind");
        };
        assert_eq!(bind, "/srv:/srv:rw,z,rshared,rbind");
    }

    #[test]
    fn test_tmpfs_with_size() {
        let spec = MountSpec::Tmpfs {
            source: Some("tmpfs".to_string()),
            target: "/test".to_string(),
            size: Some("456k".to_string()),
        };
        assert_eq!(
            encode_mount(&spec).unwrap(),
            EncodedMount::Tmpfs {
                target: "/test".to_string(),
                options: "size=456k,rw,rprivate,nosuid,nodev,tmpcopyup".to_string(),
            }
        );
    }

    #[test]
    fn test_tmpfs_without_size() {
        let spec = MountSpec::Tmpfs {
            source: None,
            target: "/scratch".to_string(),
            size: None,
        };
        let EncodedMount::Tmpfs { options, .. } = encode_mount(&spec).unwrap() else {
            panic!("expected tmpfs");
        };
        assert_eq!(options, "rw,rprivate,nosuid,nodev,tmpcopyup");
    }

    #[test]
    fn test_volume_mount() {
        let spec = MountSpec::Volume {
            source: "cache".to_string(),
            target: "/cache".to_string(),
            read_only: Some(true),
        };
        let EncodedMount::Bind { bind, .. } = encode_mount(&spec).unwrap() else {
            panic!("expected bind");
        };
        assert_eq!(bind, "cache:/cache:ro");
    }

    #[test]
    fn test_invalid_relabel() {
        let spec = MountSpec::Bind {
            source: "/a".to_string(),
            target: "/b".to_string(),
            read_only: None,
            relabel: Some("x".to_string()),
            propagation: None,
        };
        assert!(matches!(
            encode_mount(&spec),
            Err(NormalizeError::InvalidOption(_))
        ));
    }

    #[test]
    fn test_malformed_paths() {
        assert!(matches!(
            encode_mount(&bind("", "/b")),
            Err(NormalizeError::MalformedSpec(_))
        ));
        assert!(matches!(
            encode_mount(&bind("/a", "relative")),
            Err(NormalizeError::MalformedSpec(_))
        ));
        assert!(matches!(
            encode_mount(&bind("/a:b", "/b")),
            Err(NormalizeError::MalformedSpec(_))
        ));
    }

    #[test]
    fn test_deserialize_tagged() {
        let spec: MountSpec = serde_json::from_str(
            r#"{"type": "bind", "source": "/etc/hosts", "target": "/test", "read_only": true, "relabel": "Z"}"#,
        )
        .unwrap();
        assert_eq!(spec.target(), "/test");

        let spec: MountSpec = toml::from_str(
            r#"
            type = "tmpfs"
            source = "tmpfs"
            target = "/test"
            size = "456k"
            "#,
        )
        .unwrap();
        assert!(matches!(spec, MountSpec::Tmpfs { .. }));
    }
}
