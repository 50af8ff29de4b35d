//! Options and inspect-output file loading.

use super::args::OptionsFormat;
use crate::container::ContainerAttrs;
use crate::normalize::CreateOptions;
use anyhow::{Context, bail};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Read create options from a TOML or JSON file.
pub fn load_options(path: &Path, format: OptionsFormat) -> anyhow::Result<CreateOptions> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read options file {}", path.display()))?;

    let options = match format {
        OptionsFormat::Toml => CreateOptions::from_toml_str(&content),
        OptionsFormat::Json => CreateOptions::from_json_str(&content),
    }
    .with_context(|| format!("invalid options in {}", path.display()))?;

    debug!("Loaded options from {:?}: {:?}", path, options);
    Ok(options)
}

/// Read saved inspect output.
///
/// Accepts a single inspect object or the one-element array that
/// `podman inspect` and `docker inspect` print.
pub fn load_attrs(path: &Path) -> anyhow::Result<ContainerAttrs> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read inspect output {}", path.display()))?;

    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("{} is not JSON", path.display()))?;

    let object = match value {
        serde_json::Value::Array(mut items) => {
            if items.len() != 1 {
                bail!(
                    "{} holds {} inspect entries, expected exactly one",
                    path.display(),
                    items.len()
                );
            }
            items.remove(0)
        }
        other => other,
    };

    serde_json::from_value(object)
        .with_context(|| format!("unexpected inspect layout in {}", path.display()))
}
