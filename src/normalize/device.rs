//! Device mapping strings.

use crate::normalize::{NormalizeError, Result};
use bollard::models::DeviceMapping;

/// Parse `"<hostPath>:<containerPath>[:<cgroupPermissions>]"`.
///
/// Permissions, when present, must be a non-empty combination of `r`, `w`
/// and `m`.
///
/// # Errors
///
/// Returns [`NormalizeError::MalformedSpec`] when the container path is
/// missing, either path is empty or relative, or the permissions are invalid.
pub fn parse_device(spec: &str) -> Result<DeviceMapping> {
    let mut parts = spec.splitn(3, ':');
    let path_on_host = parts.next().unwrap_or_default();
    let path_in_container = parts.next().ok_or_else(|| {
        NormalizeError::MalformedSpec(format!(
            "device {:?} must be <hostPath>:<containerPath>",
            spec
        ))
    })?;
    let permissions = parts.next();

    for path in [path_on_host, path_in_container] {
        if !path.starts_with('/') {
            return Err(NormalizeError::MalformedSpec(format!(
                "device {:?} needs absolute paths, got {:?}",
                spec, path
            )));
        }
    }

    if let Some(permissions) = permissions {
        let valid = !permissions.is_empty()
            && permissions.len() <= 3
            && permissions.chars().all(|c| matches!(c, 'r' | 'w' | 'm'))
            && !has_repeats(permissions);
        if !valid {
            return Err(NormalizeError::MalformedSpec(format!(
                "device {:?} has invalid cgroup permissions {:?}",
                spec, permissions
            )));
        }
    }

    Ok(DeviceMapping {
        path_on_host: Some(path_on_host.to_string()),
        path_in_container: Some(path_in_container.to_string()),
        cgroup_permissions: permissions.map(str::to_string),
    })
}

fn has_repeats(permissions: &str) -> bool {
    permissions
        .char_indices()
        .any(|(i, c)| permissions[i + 1..].contains(c))
}

/// Base name of a device path, as printed by `ls -l /dev/`.
pub fn device_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_and_container_paths() {
        let mapping = parse_device("/dev/null:/dev/foo").unwrap();
        assert_eq!(mapping.path_on_host.as_deref(), Some("/dev/null"));
        assert_eq!(mapping.path_in_container.as_deref(), Some("/dev/foo"));
        assert_eq!(mapping.cgroup_permissions, None);
    }

    #[test]
    fn test_permissions() {
        let mapping = parse_device("/dev/zero:/dev/bar:rw").unwrap();
        assert_eq!(mapping.cgroup_permissions.as_deref(), Some("rw"));

        for bad in ["/dev/zero:/dev/bar:", "/dev/zero:/dev/bar:rx", "/dev/zero:/dev/bar:rr"] {
            assert!(
                matches!(parse_device(bad), Err(NormalizeError::MalformedSpec(_))),
                "expected MalformedSpec for {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_missing_delimiter() {
        assert!(matches!(
            parse_device("/dev/null"),
            Err(NormalizeError::MalformedSpec(_))
        ));
        assert!(matches!(
            parse_device(":/dev/foo"),
            Err(NormalizeError::MalformedSpec(_))
        ));
        assert!(matches!(
            parse_device("/dev/null:"),
            Err(NormalizeError::MalformedSpec(_))
        ));
    }

    #[test]
    fn test_device_name() {
        assert_eq!(device_name("/dev/null"), "null");
        assert_eq!(device_name("/dev/snd/timer"), "timer");
        assert_eq!(device_name("tty"), "tty");
    }
}
