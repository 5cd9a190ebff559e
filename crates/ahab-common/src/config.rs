//! Configuration model for a generation run.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{AhabError, Result};

/// Root configuration of the manifest generator.
///
/// Every field has a default, so a configuration file only needs to name
/// the values it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Directory holding `<name>/module.yml` specs.
    pub modules_dir: PathBuf,
    /// Output path of the generated manifest.
    pub output: PathBuf,
    /// Name of the shared network.
    pub network: String,
    /// Compose file format version.
    pub compose_version: String,
    /// Prefix for default container names.
    pub container_prefix: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            modules_dir: PathBuf::from(constants::DEFAULT_MODULES_DIR),
            output: PathBuf::from(constants::DEFAULT_OUTPUT),
            network: constants::DEFAULT_NETWORK.to_string(),
            compose_version: constants::DEFAULT_COMPOSE_VERSION.to_string(),
            container_prefix: constants::DEFAULT_CONTAINER_PREFIX.to_string(),
        }
    }
}

impl GeneratorConfig {
    /// Loads a configuration file, filling absent fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid YAML, or
    /// names an empty network.
    pub fn from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "loading generator configuration");
        let content = std::fs::read_to_string(path).map_err(|e| AhabError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_yaml::from_str(&content).map_err(|e| AhabError::Config {
            message: format!("{}: {e}", path.display()),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that would make the manifest unusable.
    ///
    /// Runs on every loaded file; callers that override fields afterwards
    /// must call it again.
    ///
    /// # Errors
    ///
    /// Returns [`AhabError::Config`] if the network name is empty or not a
    /// valid docker object name, the compose version is empty, or the
    /// container prefix contains characters docker rejects.
    pub fn validate(&self) -> Result<()> {
        if self.network.trim().is_empty() {
            return Err(AhabError::Config {
                message: "network name must not be empty".into(),
            });
        }
        if !is_docker_name(&self.network) {
            return Err(AhabError::Config {
                message: format!(
                    "network name \"{}\" must start with a letter or digit and contain only letters, digits, '_', '.' or '-'",
                    self.network
                ),
            });
        }
        if self.compose_version.trim().is_empty() {
            return Err(AhabError::Config {
                message: "compose_version must not be empty".into(),
            });
        }
        if !self.container_prefix.chars().all(is_docker_name_char) {
            return Err(AhabError::Config {
                message: format!(
                    "container_prefix \"{}\" may contain only letters, digits, '_', '.' or '-'",
                    self.container_prefix
                ),
            });
        }
        Ok(())
    }
}

/// Docker object names: `[a-zA-Z0-9][a-zA-Z0-9_.-]*`.
fn is_docker_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphanumeric()) && chars.all(is_docker_name_char)
}

const fn is_docker_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
}
