//! `roomsync roster` previews the desired roster of every room.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use roomsync_core::{RoomAlias, Visibility};
use roomsync_remote::LdapConnector;
use roomsync_sync::{plan, DesiredRoster, DirectoryContext, PlannedRoom};

use super::load_config;

/// Arguments for `roomsync roster`.
#[derive(Args, Debug)]
pub struct RosterArgs {
    /// Value substituted for `<1>` in aliases, names and group DNs.
    pub arg: Option<String>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl RosterArgs {
    pub fn run(self, config_path: Option<&Path>) -> Result<()> {
        let config = load_config(config_path)?;
        let connector = LdapConnector::new(&config.ldap);
        let directory = DirectoryContext {
            connector: &connector,
            settings: &config.ldap,
        };

        let arg = self.arg.unwrap_or_default();
        let planned = plan(directory, &config.sync_rooms, &arg)?;

        if self.json {
            print_json(&planned)?;
        } else {
            print_tables(&planned);
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct RoomRosterJson<'a> {
    alias: &'a RoomAlias,
    name: &'a str,
    visibility: Visibility,
    members: &'a DesiredRoster,
}

#[derive(Tabled)]
struct RosterRow {
    #[tabled(rename = "user")]
    user: String,
    #[tabled(rename = "power level")]
    level: u32,
}

fn print_json(planned: &[PlannedRoom]) -> Result<()> {
    let payload: Vec<RoomRosterJson<'_>> = planned
        .iter()
        .map(|p| RoomRosterJson {
            alias: &p.room.alias,
            name: &p.room.display_name,
            visibility: p.room.visibility,
            members: &p.roster,
        })
        .collect();
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize roster JSON")?
    );
    Ok(())
}

fn print_tables(planned: &[PlannedRoom]) {
    for p in planned {
        println!(
            "{} {} \"{}\" ({})",
            "■".cyan(),
            p.room.alias.to_string().bold(),
            p.room.display_name,
            p.room.visibility
        );
        if p.roster.is_empty() {
            println!("  no members");
            continue;
        }
        let rows: Vec<RosterRow> = p
            .roster
            .iter()
            .map(|(user, level)| RosterRow {
                user: user.to_string(),
                level: level.0,
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
    }
}
