//! Command line argument parsing
//!
//! This module handles CLI argument parsing with subcommands:
//! - `render`: Print the normalized create payload for an options file
//! - `verify`: Compare saved inspect output against an options file
//! - `create`: Create a container through the engine and verify it, optionally
//!   running a probe command inside it
//! - `show-config`: Show configuration discovery information

use crate::verify::RuntimeProbe;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ExecutionMode {
    Render(RenderConfig),
    Verify(VerifyConfig),
    Create(CreateConfig),
    ShowConfig,
}

impl ExecutionMode {
    pub fn verbose(&self) -> bool {
        match self {
            ExecutionMode::Render(c) => c.verbose,
            ExecutionMode::Verify(c) => c.verbose,
            ExecutionMode::Create(c) => c.verbose,
            ExecutionMode::ShowConfig => false,
        }
    }
}

/// Format of an options file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionsFormat {
    Toml,
    Json,
}

#[derive(Debug)]
pub struct RenderConfig {
    pub options_file: PathBuf,
    pub format: OptionsFormat,
    pub image: String,
    pub config_override: Option<PathBuf>,
    pub verbose: bool,
}

#[derive(Debug)]
pub struct VerifyConfig {
    pub options_file: PathBuf,
    pub format: OptionsFormat,
    pub attrs_file: PathBuf,
    pub config_override: Option<PathBuf>,
    pub verbose: bool,
}

#[derive(Debug)]
pub struct CreateConfig {
    pub options_file: PathBuf,
    pub format: OptionsFormat,
    pub image: String,
    pub config_override: Option<PathBuf>,
    pub verbose: bool,
    pub keep: bool,
    pub probe: Option<RuntimeProbe>,
}

#[derive(Debug, Parser)]
#[command(name = "podnorm")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Normalize container create options and verify what the engine recorded")]
#[command(long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the engine create payload for an options file
    Render {
        /// Options file (TOML or JSON, by extension)
        options: PathBuf,
        /// Image to create the container from
        #[arg(short = 'i', long = "image")]
        image: String,
        /// Configuration file path
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,
        /// Enable verbose output
        #[arg(short = 'v', long = "verbose")]
        verbose: bool,
    },
    /// Check saved inspect output against an options file
    Verify {
        /// Options file (TOML or JSON, by extension)
        options: PathBuf,
        /// Inspect output (JSON object, or the array `podman inspect` prints)
        #[arg(short = 'a', long = "attrs")]
        attrs: PathBuf,
        /// Configuration file path
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,
        /// Enable verbose output
        #[arg(short = 'v', long = "verbose")]
        verbose: bool,
    },
    /// Create a container, verify it, then remove it
    Create {
        /// Options file (TOML or JSON, by extension)
        options: PathBuf,
        /// Image to create the container from
        #[arg(short = 'i', long = "image")]
        image: String,
        /// Configuration file path
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,
        /// Enable verbose output
        #[arg(short = 'v', long = "verbose")]
        verbose: bool,
        /// Keep the container after verification
        #[arg(long = "keep")]
        keep: bool,
        /// Run a probe command (hosts, devices, tmpfs) and check its output
        #[arg(short = 'p', long = "probe")]
        probe: Option<RuntimeProbe>,
    },
    /// Show configuration discovery information
    ShowConfig,
}

impl Args {
    pub fn parse() -> Self {
        Parser::parse()
    }

    pub fn mode(&self) -> Result<ExecutionMode, String> {
        match &self.command {
            Some(Commands::Render {
                options,
                image,
                config,
                verbose,
            }) => Ok(ExecutionMode::Render(RenderConfig {
                options_file: options.clone(),
                format: Self::detect_format(options),
                image: image.clone(),
                config_override: config.clone(),
                verbose: *verbose,
            })),
            Some(Commands::Verify {
                options,
                attrs,
                config,
                verbose,
            }) => Ok(ExecutionMode::Verify(VerifyConfig {
                options_file: options.clone(),
                format: Self::detect_format(options),
                attrs_file: attrs.clone(),
                config_override: config.clone(),
                verbose: *verbose,
            })),
            Some(Commands::Create {
                options,
                image,
                config,
                verbose,
                keep,
                probe,
            }) => Ok(ExecutionMode::Create(CreateConfig {
                options_file: options.clone(),
                format: Self::detect_format(options),
                image: image.clone(),
                config_override: config.clone(),
                verbose: *verbose,
                keep: *keep,
                probe: *probe,
            })),
            Some(Commands::ShowConfig) => Ok(ExecutionMode::ShowConfig),
            None => Err(
                "No command specified. Use 'podnorm --help' to see available commands.".to_string(),
            ),
        }
    }

    /// Detect the options format from the file extension.
    ///
    /// `.json` is JSON, everything else is read as TOML. Matching is
    /// case-insensitive.
    pub fn detect_format(path: &Path) -> OptionsFormat {
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "json" => OptionsFormat::Json,
            _ => OptionsFormat::Toml,
        }
    }
}
