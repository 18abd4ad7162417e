use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::render::OutputStyle;

pub(crate) const CONFIG_FILE_NAME: &str = "chainup.toml";
pub(crate) const DEFAULT_LOG_FILTER: &str = "warn";

/// Contents of `chainup.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct CliConfig {
    pub(crate) state_dir: Option<PathBuf>,
    pub(crate) log_filter: Option<String>,
    pub(crate) output: Option<OutputStyle>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Settings {
    pub(crate) state_dir: PathBuf,
    pub(crate) log_filter: String,
    pub(crate) output: OutputStyle,
}

pub(crate) fn default_state_dir() -> Result<PathBuf> {
    resolve_default_state_dir(
        std::env::var("CHAINUP_HOME").ok(),
        std::env::var("HOME").ok(),
    )
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

pub(crate) fn resolve_default_state_dir(
    chainup_home: Option<String>,
    home: Option<String>,
) -> Result<PathBuf> {
    if let Some(chainup_home) = non_empty(chainup_home) {
        return Ok(PathBuf::from(chainup_home));
    }
    let home = non_empty(home)
        .context("neither CHAINUP_HOME nor HOME is set; cannot resolve state directory")?;
    Ok(PathBuf::from(home).join(".chainup"))
}

pub(crate) fn load_config(path: &Path) -> Result<CliConfig> {
    if !path.exists() {
        return Ok(CliConfig::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("failed reading config: {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("failed parsing config: {}", path.display()))
}

/// Flags win over the config file, which wins over built-in defaults. The
/// config file itself is looked up under the flag or default state dir.
pub(crate) fn resolve_settings<F>(
    config_path: Option<&Path>,
    state_dir: Option<&Path>,
    log_level: Option<&str>,
    default_state_dir: F,
) -> Result<Settings>
where
    F: FnOnce() -> Result<PathBuf>,
{
    let base_state_dir = match state_dir {
        Some(state_dir) => state_dir.to_path_buf(),
        None => default_state_dir()?,
    };
    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| base_state_dir.join(CONFIG_FILE_NAME));
    let config = load_config(&config_path)?;

    let state_dir = match state_dir {
        Some(state_dir) => state_dir.to_path_buf(),
        None => config.state_dir.unwrap_or(base_state_dir),
    };
    let log_filter = log_level
        .map(str::to_string)
        .or(config.log_filter)
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

    Ok(Settings {
        state_dir,
        log_filter,
        output: config.output.unwrap_or_default(),
    })
}
