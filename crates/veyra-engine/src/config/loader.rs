use super::error::ConfigError;
use super::schema::AgentConfig;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Config files in lookup order: `./veyra.yaml`, then `~/.veyra/config.yaml`.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./veyra.yaml")];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".veyra").join("config.yaml"));
        }
        paths
    }

    pub async fn load_default() -> Result<AgentConfig, ConfigError> {
        Self::load_first(&Self::search_paths()).await
    }

    /// Load the first of `paths` that exists, or defaults when none does.
    /// A file that exists but is broken is an error, not a reason to move on.
    pub async fn load_first(paths: &[PathBuf]) -> Result<AgentConfig, ConfigError> {
        for path in paths {
            if tokio::fs::try_exists(path).await.unwrap_or(false) {
                info!("Using config file {}", path.display());
                return Self::load_from(path).await;
            }
        }
        debug!("No config file found, using defaults");
        Ok(AgentConfig::default())
    }

    pub async fn load_from(path: &Path) -> Result<AgentConfig, ConfigError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let config: AgentConfig =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }
}
