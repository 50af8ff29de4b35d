//! CLI-specific functionality
//!
//! This module contains all CLI-related code including argument parsing,
//! options file loading, and configuration discovery.

pub mod args;
pub mod config;
pub mod options;

pub use args::{Args, CreateConfig, ExecutionMode, OptionsFormat, RenderConfig, VerifyConfig};
pub use config::{ConfigDiscovery, EngineConfig, PodnormConfig};
pub use options::{load_attrs, load_options};
