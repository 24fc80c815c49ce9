//! `roomsync sync` converges every configured room.

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use roomsync_core::UserId;
use roomsync_remote::{LdapConnector, MatrixClient};
use roomsync_sync::{sync, DirectoryContext, RoomReport, SyncReport};

use super::load_config;

/// Arguments for `roomsync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Value substituted for `<1>` in aliases, names and group DNs.
    pub arg: Option<String>,

    /// Only read; report what would change.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit the run report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Refuse to run unless this user is listed in `admin_users`.
    #[arg(long, value_name = "MXID")]
    pub requested_by: Option<String>,
}

impl SyncArgs {
    pub fn run(self, config_path: Option<&Path>) -> Result<()> {
        let config = load_config(config_path)?;

        if let Some(requester) = self.requested_by.as_deref() {
            let requester = UserId::from(requester);
            if !config.is_admin(&requester) {
                tracing::warn!(requester = %requester, "sync refused: requester is not an admin");
                bail!("{requester} is not allowed to run a sync (not listed in admin_users)");
            }
        }

        let arg = self.arg.unwrap_or_default();
        tracing::info!(
            rooms = config.sync_rooms.len(),
            arg = %arg,
            dry_run = self.dry_run,
            "sync requested"
        );
        let connector = LdapConnector::new(&config.ldap);
        let mut client =
            MatrixClient::new(&config.homeserver).context("failed to set up homeserver client")?;
        let directory = DirectoryContext {
            connector: &connector,
            settings: &config.ldap,
        };

        let report = sync(directory, &mut client, &config.sync_rooms, &arg, self.dry_run)?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize sync report")?
            );
        } else {
            print_report(&report);
        }
        Ok(())
    }
}

fn print_report(report: &SyncReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };
    for room in &report.rooms {
        print_room(prefix, room, report.dry_run);
    }

    let elapsed = report.finished_at - report.started_at;
    println!(
        "{prefix}{} rooms, {} changes in {}ms",
        report.rooms.len(),
        report.mutations(),
        elapsed.num_milliseconds()
    );
}

fn print_room(prefix: &str, room: &RoomReport, dry_run: bool) {
    let id = room
        .room_id
        .as_ref()
        .map(|id| format!(" ({id})"))
        .unwrap_or_default();
    if room.is_converged() {
        println!(
            "{prefix}{} {}{id} up to date, {} members",
            "✓".green(),
            room.alias,
            room.roster_size
        );
        return;
    }

    println!(
        "{prefix}{} {}{id} {} changes, {} members",
        "✎".yellow(),
        room.alias,
        room.mutations(),
        room.roster_size
    );
    let verb = |done: &'static str, planned: &'static str| if dry_run { planned } else { done };

    if room.created {
        println!("  {} room", verb("created", "would create"));
    }
    if let Some(name) = &room.renamed_to {
        println!("  {} name to \"{name}\"", verb("set", "would set"));
    }
    for user in &room.invited {
        println!("  {} {user}", verb("invited", "would invite"));
    }
    for change in &room.power_levels {
        let from = change
            .from
            .map(|level| level.to_string())
            .unwrap_or_else(|| "unset".to_string());
        println!(
            "  {} power level of {}: {from} → {}",
            verb("changed", "would change"),
            change.user,
            change.to
        );
    }
    if let Some(visibility) = room.visibility_changed_to {
        println!("  {} visibility to {visibility}", verb("set", "would set"));
    }
}
