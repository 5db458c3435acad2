mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = ["./cinefilm.toml", "~/.config/cinefilm/config.toml"];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Default output path for a repaired film: `<stem>.<suffix>.<ext>` next to
/// the input.
pub fn repair_output_path(input: &Path, config: &RepairConfig) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let name = match input.extension() {
        Some(ext) => format!("{}.{}.{}", stem, config.output_suffix, ext.to_string_lossy()),
        None => format!("{}.{}", stem, config.output_suffix),
    };

    input.with_file_name(name)
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    let suffix = &config.repair.output_suffix;
    if suffix.is_empty() {
        anyhow::bail!("repair.output_suffix cannot be empty");
    }
    if suffix.contains(['/', '\\']) {
        anyhow::bail!("repair.output_suffix cannot contain path separators: {:?}", suffix);
    }

    Ok(())
}
