//! Config loading for the CLI: `--config` or the platform default.

use std::path::{Path, PathBuf};

use netsync_config::{Config, config_path, load_config};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// A loaded config together with the file it came from.
pub struct LoadedConfig {
    pub config: Config,
    pub path: PathBuf,
}

impl LoadedConfig {
    pub fn load(global: &GlobalOpts) -> Result<Self, CliError> {
        let config = load_config(global.config.as_deref())?;
        let path = global.config.clone().unwrap_or_else(config_path);
        tracing::debug!(path = %path.display(), sources = config.sources.len(), "config loaded");
        Ok(Self { config, path })
    }

    /// Directory relative snapshot paths resolve against.
    pub fn base_dir(&self) -> Option<&Path> {
        self.path.parent()
    }

    pub fn display_path(&self) -> String {
        self.path.display().to_string()
    }
}
