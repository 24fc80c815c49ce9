//! `roomsync validate` checks the config file without contacting anything.

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use roomsync_core::config;

use super::config_path;

/// Arguments for `roomsync validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    pub fn run(self, explicit: Option<&Path>) -> Result<()> {
        let path = config_path(explicit)?;
        let parsed = config::parse_at(&path).context("failed to read config")?;

        match config::validate(&parsed) {
            Ok(()) => {
                println!(
                    "{} {} is valid ({} rooms, {} admins)",
                    "✓".green(),
                    path.display(),
                    parsed.sync_rooms.len(),
                    parsed.admin_users.len()
                );
                Ok(())
            }
            Err(errors) => {
                for error in &errors {
                    eprintln!("  {} {error}", "✗".red());
                }
                bail!("{} has {} problem(s)", path.display(), errors.len())
            }
        }
    }
}
