//! JSON file configuration adapter.
//!
//! Implements [`ConfigPort`].  A missing file yields defaults; a file
//! that exists but cannot be read or parsed is an error, as is one that
//! parses but fails validation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::info;

use crate::app::ports::ConfigPort;
use crate::config::GreenhouseConfig;
use crate::error::ConfigError;

pub struct JsonConfigFile {
    path: PathBuf,
}

impl JsonConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigPort for JsonConfigFile {
    fn load(&self) -> Result<GreenhouseConfig, ConfigError> {
        let config = match fs::read_to_string(&self.path) {
            Ok(text) => {
                info!("Config: loaded {}", self.path.display());
                serde_json::from_str::<GreenhouseConfig>(&text)
                    .map_err(|e| ConfigError::Malformed(e.to_string()))?
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("Config: {} not found, using defaults", self.path.display());
                GreenhouseConfig::default()
            }
            Err(e) => return Err(ConfigError::Io(format!("{}: {e}", self.path.display()))),
        };
        config.validate()?;
        Ok(config)
    }
}
