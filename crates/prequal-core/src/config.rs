use std::path::{Path, PathBuf};

use directories::BaseDirs;
use thiserror::Error;

use crate::registry::{RegistryError, StepRegistry, load_registry};

const REGISTRY_FILE_NAME: &str = "wizard.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not resolve home directory for config path")]
    HomeDirectoryUnavailable,
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Where the active registry came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrySource {
    File(PathBuf),
    Builtin,
}

impl RegistrySource {
    pub fn describe(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Builtin => "built-in registry".to_string(),
        }
    }
}

pub fn resolve_config_dir() -> Result<PathBuf, ConfigError> {
    let base_dirs = BaseDirs::new().ok_or(ConfigError::HomeDirectoryUnavailable)?;
    Ok(base_dirs.home_dir().join(".config").join("prequal"))
}

pub fn resolve_registry_path() -> Result<PathBuf, ConfigError> {
    Ok(resolve_config_dir()?.join(REGISTRY_FILE_NAME))
}

pub fn resolve_submissions_dir() -> Result<PathBuf, ConfigError> {
    Ok(resolve_config_dir()?.join("submissions"))
}

pub fn resolve_diagnostics_dir() -> Result<PathBuf, ConfigError> {
    Ok(resolve_config_dir()?.join("diagnostics"))
}

/// An explicit path must exist; the default path falls back to the built-in registry.
pub fn load_active_registry(
    explicit: Option<&Path>,
) -> Result<(StepRegistry, RegistrySource), ConfigError> {
    if let Some(path) = explicit {
        let registry = load_registry(path)?;
        return Ok((registry, RegistrySource::File(path.to_path_buf())));
    }

    let default_path = resolve_registry_path()?;
    if default_path.exists() {
        let registry = load_registry(&default_path)?;
        return Ok((registry, RegistrySource::File(default_path)));
    }

    Ok((StepRegistry::builtin()?, RegistrySource::Builtin))
}
