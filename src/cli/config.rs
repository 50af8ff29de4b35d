//! Configuration discovery and loading
//!
//! This module handles the configuration discovery hierarchy:
//! 1. Current directory: ./podnorm.toml or ./.podnorm/config.toml
//! 2. User config: ~/.podnorm/config.toml
//! 3. System config: /etc/podnorm/config.toml
//! 4. Built-in defaults

use crate::container::ContainerClientConfig;
use crate::env;
use crate::normalize::NormalizerConfig;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env as std_env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Engine connection settings.
pub type EngineConfig = ContainerClientConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PodnormConfig {
    #[serde(default)]
    pub normalizer: NormalizerConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

impl PodnormConfig {
    /// Load from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: PodnormConfig = toml::from_str(&content)
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Save to TOML file
    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Apply `CONTAINER_HOST` over the configured socket.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(socket) = std_env::var(env::CONTAINER_HOST_VAR)
            && !socket.is_empty()
        {
            debug!("{} overrides engine socket: {}", env::CONTAINER_HOST_VAR, socket);
            self.engine.socket = Some(socket);
        }
        self
    }
}

/// Configuration discovery system
pub struct ConfigDiscovery;

impl ConfigDiscovery {
    /// Load the override when given, otherwise discover.
    pub fn load(config_override: Option<&Path>) -> anyhow::Result<PodnormConfig> {
        let config = match config_override {
            Some(path) => {
                info!("Loading configuration override from: {:?}", path);
                PodnormConfig::from_toml_file(path)?
            }
            None => Self::discover_config()?,
        };
        Ok(config.with_env_overrides())
    }

    /// Discover and load configuration using the hierarchy
    pub fn discover_config() -> anyhow::Result<PodnormConfig> {
        if let Some(config_path) = Self::find_config_file() {
            info!("Loading configuration from: {:?}", config_path);
            return PodnormConfig::from_toml_file(config_path);
        }

        debug!("No configuration file found, using defaults");
        Ok(PodnormConfig::default())
    }

    /// Find configuration file using discovery hierarchy
    pub fn find_config_file() -> Option<PathBuf> {
        Self::find_in(&Self::get_config_candidates())
    }

    fn find_in(candidates: &[PathBuf]) -> Option<PathBuf> {
        for candidate in candidates {
            debug!("Checking for config file: {:?}", candidate);
            if candidate.is_file() {
                debug!("Found config file: {:?}", candidate);
                return Some(candidate.clone());
            }
        }

        debug!("No config file found in discovery hierarchy");
        None
    }

    /// Get list of configuration file candidates in priority order
    fn get_config_candidates() -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Ok(current_dir) = std_env::current_dir() {
            candidates.push(env::project_config_file_path(&current_dir));
            candidates.push(env::local_config_file_path(&current_dir));
        }

        if let Some(home_dir) = Self::get_home_dir() {
            candidates.push(env::user_config_file_path(&home_dir));
        }

        #[cfg(unix)]
        candidates.push(PathBuf::from(env::SYSTEM_CONFIG_FILE));

        #[cfg(windows)]
        if let Ok(program_data) = std_env::var("PROGRAMDATA") {
            candidates.push(
                PathBuf::from(program_data)
                    .join("podnorm")
                    .join(env::CONFIG_FILE_NAME),
            );
        }

        candidates
    }

    /// Get home directory path
    fn get_home_dir() -> Option<PathBuf> {
        std_env::var("HOME")
            .ok()
            .or_else(|| std_env::var("USERPROFILE").ok())
            .map(PathBuf::from)
    }

    /// Show configuration discovery information for debugging
    pub fn show_discovery_info() {
        println!("Configuration Discovery Hierarchy:");
        println!();

        let candidates = Self::get_config_candidates();
        for (i, candidate) in candidates.iter().enumerate() {
            let status = if candidate.exists() {
                if candidate.is_file() {
                    "✓ EXISTS"
                } else {
                    "✗ NOT A FILE"
                }
            } else {
                "✗ NOT FOUND"
            };

            println!("  {}. {:?} - {}", i + 1, candidate, status);
        }

        println!();
        if let Some(found) = Self::find_config_file() {
            println!("Active configuration: {:?}", found);
        } else {
            println!("Active configuration: Built-in defaults");
        }

        match Self::load(None) {
            Ok(config) => match toml::to_string_pretty(&config) {
                Ok(rendered) => {
                    println!();
                    println!("{}", rendered);
                }
                Err(e) => println!("Could not render configuration: {}", e),
            },
            Err(e) => println!("Could not load configuration: {:#}", e),
        }
    }
}
