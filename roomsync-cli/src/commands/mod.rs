//! Subcommand implementations.

pub mod check;
pub mod roster;
pub mod sync;
pub mod validate;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use roomsync_core::{config, Config};

/// `--config` if given, otherwise `~/.roomsync/config.yaml`.
pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => config::default_path().context("could not locate the default config file"),
    }
}

/// Load and validate the config.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = config_path(explicit)?;
    tracing::debug!(path = %path.display(), "loading config");
    config::load_at(&path).context("failed to load config")
}
