//! Application settings.
//!
//! Values come from built-in defaults, then `config.toml` in the user config
//! directory, then `XSQUAD_*` environment variables.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    squad::HyperspacePolicy,
    store::{DEFAULT_DATA_DIR, DEFAULT_SQUADS_FILE},
};

const CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "XSQUAD";

const DEFAULT_CONFIG: &str = r#"# xsquad configuration

# Directory holding squads.json and logs/.
# data_dir = "/home/me/.local/share/xsquad"

# Card catalog directory. Defaults to <data_dir>/catalog.
# catalog_dir = "/home/me/xwing-data/catalog"

# squads_file = "squads.json"

# What enabling hyperspace-only does with illegal content: "reject" or "strip".
# hyperspace_policy = "reject"

# Overridden by RUST_LOG when set.
# log_level = "info"
"#;

/// Resolved settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding the squad document and logs.
    pub data_dir: PathBuf,
    /// Card catalog directory; `<data_dir>/catalog` when unset.
    #[serde(default)]
    pub catalog_dir: Option<PathBuf>,
    /// Squad document file name inside `data_dir`.
    pub squads_file: String,
    /// Treatment of illegal content when hyperspace-only is enabled.
    pub hyperspace_policy: HyperspacePolicy,
    /// Default tracing filter.
    pub log_level: String,
}

impl AppConfig {
    /// Load settings from the default config file and the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load settings using `path` as the config file. A missing file is fine.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = Config::builder()
            .set_default(
                "data_dir",
                default_data_dir().to_string_lossy().into_owned(),
            )?
            .set_default("squads_file", DEFAULT_SQUADS_FILE)?
            .set_default("hyperspace_policy", "reject")?
            .set_default("log_level", "info")?
            .add_source(
                File::from(path)
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()
            .with_context(|| format!("failed to read settings from {}", path.display()))?;

        config
            .try_deserialize()
            .with_context(|| format!("invalid settings in {}", path.display()))
    }

    /// Directory the card catalog is loaded from.
    pub fn catalog_root(&self) -> PathBuf {
        self.catalog_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("catalog"))
    }

    /// File the squad list is stored in.
    pub fn squads_path(&self) -> PathBuf {
        self.data_dir.join(&self.squads_file)
    }

    /// Directory log files are written to.
    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

/// Location of the user config file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DATA_DIR)
        .join(CONFIG_FILE)
}

/// Write a commented template to the default config location if none exists.
pub fn ensure_default_config() -> Result<()> {
    ensure_config_at(config_path())
}

/// Write a commented template to `path` if nothing is there yet.
pub fn ensure_config_at(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write default config {}", path.display()))?;
    info!(path = %path.display(), "Wrote default configuration");
    Ok(())
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DATA_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_apply_without_a_file() -> Result<()> {
        let dir = tempdir()?;
        let config = AppConfig::load_from(dir.path().join("missing.toml"))?;
        assert_eq!(config.squads_file, "squads.json");
        assert_eq!(config.hyperspace_policy, HyperspacePolicy::Reject);
        assert_eq!(config.catalog_root(), config.data_dir.join("catalog"));
        assert!(config.squads_path().ends_with("squads.json"));
        Ok(())
    }

    #[test]
    fn file_values_override_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            format!(
                "data_dir = {:?}\ncatalog_dir = \"/srv/cards\"\nhyperspace_policy = \"strip\"\nlog_level = \"debug\"\n",
                dir.path().display().to_string()
            ),
        )?;

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.data_dir, dir.path());
        assert_eq!(config.catalog_root(), PathBuf::from("/srv/cards"));
        assert_eq!(config.hyperspace_policy, HyperspacePolicy::Strip);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.squads_path(), dir.path().join("squads.json"));
        assert_eq!(config.log_dir(), dir.path().join("logs"));
        Ok(())
    }

    #[test]
    fn template_is_written_once_and_parses() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("xsquad").join("config.toml");
        ensure_config_at(&path)?;
        assert_eq!(fs::read_to_string(&path)?, DEFAULT_CONFIG);

        fs::write(&path, "log_level = \"warn\"\n")?;
        ensure_config_at(&path)?;
        assert_eq!(AppConfig::load_from(&path)?.log_level, "warn");
        Ok(())
    }

    #[test]
    fn unknown_policy_is_rejected() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "hyperspace_policy = \"ignore\"\n")?;
        assert!(AppConfig::load_from(&path).is_err());
        Ok(())
    }
}
