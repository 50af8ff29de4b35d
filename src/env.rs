//! Environment constants and path utilities.
//!
//! Centralizes the file names, directories and environment variables the
//! CLI and the engine client look at.

use std::path::{Path, PathBuf};

/// Application directory name (hidden directory like .git, .vscode)
pub const PODNORM_DIR_NAME: &str = ".podnorm";

/// Configuration file name inside [`PODNORM_DIR_NAME`]
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration file name at a project root
pub const LOCAL_CONFIG_FILE_NAME: &str = "podnorm.toml";

/// System-wide configuration file (Unix-like systems)
pub const SYSTEM_CONFIG_FILE: &str = "/etc/podnorm/config.toml";

/// Overrides the engine socket from configuration
pub const CONTAINER_HOST_VAR: &str = "CONTAINER_HOST";

/// Rootful Podman API socket
pub const PODMAN_SYSTEM_SOCKET: &str = "unix:///run/podman/podman.sock";

/// Prefix for generated container names
pub const CONTAINER_NAME_PREFIX: &str = "podnorm";

/// Test-related constants
pub mod test {
    /// Skips engine-backed tests when set
    pub const SKIP_CONTAINER_TESTS_VAR: &str = "SKIP_CONTAINER_TESTS";

    /// Image used by engine-backed tests
    pub const TEST_IMAGE: &str = "quay.io/libpod/alpine:latest";
}

/// Build the .podnorm directory path in user's home directory
pub fn user_config_dir_path(home_dir: &Path) -> PathBuf {
    home_dir.join(PODNORM_DIR_NAME)
}

/// Build config file path in user's home directory
pub fn user_config_file_path(home_dir: &Path) -> PathBuf {
    user_config_dir_path(home_dir).join(CONFIG_FILE_NAME)
}

/// Build `./.podnorm/config.toml` from a directory
pub fn local_config_file_path(current_dir: &Path) -> PathBuf {
    current_dir.join(PODNORM_DIR_NAME).join(CONFIG_FILE_NAME)
}

/// Build `./podnorm.toml` from a directory
pub fn project_config_file_path(current_dir: &Path) -> PathBuf {
    current_dir.join(LOCAL_CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_paths() {
        let home_dir = Path::new("/home/user");
        let current_dir = Path::new("/current/project");

        assert_eq!(
            user_config_file_path(home_dir),
            Path::new("/home/user/.podnorm/config.toml")
        );

        assert_eq!(
            local_config_file_path(current_dir),
            Path::new("/current/project/.podnorm/config.toml")
        );

        assert_eq!(
            project_config_file_path(current_dir),
            Path::new("/current/project/podnorm.toml")
        );
    }
}
