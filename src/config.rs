//! User configuration.
//!
//! A small JSON document in the platform config directory. Every field is
//! optional; a missing file means defaults.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::crypto::CostParams;
use crate::error::{Error, Result};
use crate::storage::Storage;

const APP_NAME: &str = "lockbox";
const CONFIG_FILE: &str = "config.json";
const CONTAINER_FILE: &str = "lockbox.db";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Container location. Falls back to the platform data directory.
    pub container: Option<PathBuf>,
    /// scrypt cost for newly created containers.
    pub cost: CostParams,
}

impl Config {
    /// Location of the config file in the platform config directory.
    pub fn default_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join(CONFIG_FILE))
    }

    /// Load the config at `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let config: Self = serde_json::from_slice(&bytes)?;
        config
            .cost
            .validate()
            .map_err(|e| Error::Config(e.to_string()))?;
        Ok(config)
    }

    /// Write the config to `path` atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        Storage::new(path.to_path_buf()).save(&json)
    }

    /// The configured container path, or the platform default.
    pub fn container_path(&self) -> Result<PathBuf> {
        match &self.container {
            Some(path) => Ok(path.clone()),
            None => default_container_path(),
        }
    }
}

/// `<data dir>/lockbox.db`
pub fn default_container_path() -> Result<PathBuf> {
    Ok(project_dirs()?.data_dir().join(CONTAINER_FILE))
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", APP_NAME)
        .ok_or_else(|| Error::Config("could not determine platform directories".into()))
}
