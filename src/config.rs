use crate::certificate::SchemaProfile;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Data file used by the interactive shell when nothing else is configured
pub const SHELL_DATABASE: &str = "platform_certificates.db";

/// Data file used by the one-shot CLI when nothing else is configured
pub const CLI_DATABASE: &str = "certificates.db";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CertstoreConfig {
    pub database: Option<String>,
    pub profile: Option<SchemaProfile>,
}

impl CertstoreConfig {
    /// Flag value first, then the config file, then the built-in default
    pub fn resolve_database(&self, flag: Option<&Path>, default: &str) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| self.database.as_ref().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(default))
    }

    pub fn resolve_profile(&self, flag: Option<SchemaProfile>, default: SchemaProfile) -> SchemaProfile {
        flag.or(self.profile).unwrap_or(default)
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("certstore.toml")
}

/// Load the config file; a missing file is not an error
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<CertstoreConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: CertstoreConfig = toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("invalid config {}: {}", path.display(), e))?;
    tracing::debug!("Loaded config from {}", path.display());
    Ok(Some(config))
}

/// Create the parent directory of the data file if it is missing
pub fn ensure_db_dir(db_path: &Path) -> crate::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
