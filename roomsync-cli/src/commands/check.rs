//! `roomsync check` exercises the directory side only: bind, whoami, and the
//! group searches of every room.

use std::path::Path;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use roomsync_remote::LdapConnector;
use roomsync_sync::{check_directory, DirectoryContext};

use super::load_config;

/// Arguments for `roomsync check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Value substituted for `<1>` in aliases and group DNs.
    pub arg: Option<String>,
}

impl CheckArgs {
    pub fn run(self, config_path: Option<&Path>) -> Result<()> {
        let config = load_config(config_path)?;
        let connector = LdapConnector::new(&config.ldap);
        let directory = DirectoryContext {
            connector: &connector,
            settings: &config.ldap,
        };

        let arg = self.arg.unwrap_or_default();
        let check = check_directory(directory, &config.sync_rooms, &arg)?;

        println!("Bound to {} as {}", config.ldap.uri, check.bound_as.bold());
        for (alias, members) in &check.rooms {
            println!("{} {} ({} from directory)", "■".cyan(), alias, members.len());
            for (user, level) in members {
                println!("  {user}  {level}");
            }
        }
        Ok(())
    }
}
