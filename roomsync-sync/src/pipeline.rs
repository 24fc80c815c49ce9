//! Sync orchestrator and the read-only diagnostic entrypoints.
//!
//! Rooms are processed one at a time in configured order:
//! render → resolve directory → build roster → converge. The first failure
//! stops the run; rooms already converged stay converged.
//!
//! The directory session is opened by the first room that has group rules
//! and is closed before any of these functions return, on every path.

use std::collections::BTreeMap;

use chrono::Utc;

use roomsync_core::{
    AccessLevel, Directory, DirectoryConnector, GroupAccessRule, LdapConfig, RoomAlias, RoomApi,
    RoomSpec, UserId,
};
use roomsync_renderer::{render_rules, RenderedRoom};

use crate::converge::Converger;
use crate::directory::{self, LazySession};
use crate::error::{RoomError, SyncError, SyncStep};
use crate::report::{RoomReport, SyncReport};
use crate::roster::{self, DesiredRoster};

/// Immutable directory context shared by every room of a run.
pub struct DirectoryContext<'a, C: DirectoryConnector> {
    pub connector: &'a C,
    pub settings: &'a LdapConfig,
}

impl<'a, C: DirectoryConnector> Clone for DirectoryContext<'a, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, C: DirectoryConnector> Copy for DirectoryContext<'a, C> {}

/// A room with its templates resolved and its desired roster computed.
#[derive(Debug, Clone)]
pub struct PlannedRoom {
    pub room: RenderedRoom,
    pub roster: DesiredRoster,
}

/// Directory view of the configured rooms, for diagnostics.
#[derive(Debug, Clone)]
pub struct DirectoryCheck {
    /// Identity the directory session is bound as.
    pub bound_as: String,
    pub rooms: Vec<(RoomAlias, BTreeMap<UserId, AccessLevel>)>,
}

/// Converge every room in `rooms`, in order.
pub fn sync<C, R>(
    directory: DirectoryContext<'_, C>,
    api: &mut R,
    rooms: &[RoomSpec],
    template_arg: &str,
    dry_run: bool,
) -> Result<SyncReport, SyncError>
where
    C: DirectoryConnector,
    R: RoomApi,
{
    let started_at = Utc::now();
    tracing::info!(rooms = rooms.len(), template_arg, dry_run, "starting sync");

    let mut session = LazySession::new(directory.connector);
    let result = sync_rooms(&mut session, directory.settings, api, rooms, template_arg, dry_run);
    session.close();

    let reports = result?;
    Ok(SyncReport {
        template_arg: template_arg.to_owned(),
        dry_run,
        started_at,
        finished_at: Utc::now(),
        rooms: reports,
    })
}

fn sync_rooms<C, R>(
    session: &mut LazySession<'_, C>,
    settings: &LdapConfig,
    api: &mut R,
    rooms: &[RoomSpec],
    template_arg: &str,
    dry_run: bool,
) -> Result<Vec<RoomReport>, SyncError>
where
    C: DirectoryConnector,
    R: RoomApi,
{
    let mut reports = Vec::with_capacity(rooms.len());
    for spec in rooms {
        let planned = plan_room(session, settings, spec, template_arg)?;
        tracing::info!(room = %planned.room.alias, roster = planned.roster.len(), "syncing room");
        let report = Converger::new(api, dry_run).converge(&planned.room, &planned.roster)?;
        reports.push(report);
    }
    Ok(reports)
}

/// Render every room and compute its desired roster without touching the
/// chat platform.
pub fn plan<C: DirectoryConnector>(
    directory: DirectoryContext<'_, C>,
    rooms: &[RoomSpec],
    template_arg: &str,
) -> Result<Vec<PlannedRoom>, SyncError> {
    let mut session = LazySession::new(directory.connector);
    let result = rooms
        .iter()
        .map(|spec| plan_room(&mut session, directory.settings, spec, template_arg))
        .collect();
    session.close();
    result
}

/// Bind, report who we are bound as, and list the directory-resolved members
/// of every room. Static members are not included.
pub fn check_directory<C: DirectoryConnector>(
    directory: DirectoryContext<'_, C>,
    rooms: &[RoomSpec],
    template_arg: &str,
) -> Result<DirectoryCheck, SyncError> {
    let mut session = LazySession::new(directory.connector);
    let result = check_rooms(&mut session, directory.settings, rooms, template_arg);
    session.close();
    result
}

fn check_rooms<C: DirectoryConnector>(
    session: &mut LazySession<'_, C>,
    settings: &LdapConfig,
    rooms: &[RoomSpec],
    template_arg: &str,
) -> Result<DirectoryCheck, SyncError> {
    let fail =
        |cause: RoomError| SyncError::new(settings.uri.clone(), SyncStep::ResolveDirectory, cause);
    let bound_as = session
        .get()
        .map_err(fail)?
        .whoami()
        .map_err(|source| RoomError::DirectoryUnavailable {
            uri: settings.uri.clone(),
            source,
        })
        .map_err(fail)?;

    let mut resolved = Vec::with_capacity(rooms.len());
    for spec in rooms {
        let room = RenderedRoom::render(spec, template_arg)
            .map_err(|e| SyncError::new(spec.alias_template.clone(), SyncStep::Render, e.into()))?;
        let members = resolve_with(session, settings, &room.group_rules)
            .map_err(|e| SyncError::new(room.alias.0.clone(), SyncStep::ResolveDirectory, e))?;
        resolved.push((room.alias, members));
    }
    Ok(DirectoryCheck { bound_as, rooms: resolved })
}

/// Resolve `rules` against the directory for `template_arg`. Read-only.
pub fn resolve_directory_membership<C: DirectoryConnector>(
    directory: DirectoryContext<'_, C>,
    rules: &[GroupAccessRule],
    template_arg: &str,
) -> Result<BTreeMap<UserId, AccessLevel>, RoomError> {
    let rules = render_rules(rules, template_arg)?;
    let mut session = LazySession::new(directory.connector);
    let result = resolve_with(&mut session, directory.settings, &rules);
    session.close();
    result
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn plan_room<C: DirectoryConnector>(
    session: &mut LazySession<'_, C>,
    settings: &LdapConfig,
    spec: &RoomSpec,
    template_arg: &str,
) -> Result<PlannedRoom, SyncError> {
    let room = RenderedRoom::render(spec, template_arg)
        .map_err(|e| SyncError::new(spec.alias_template.clone(), SyncStep::Render, e.into()))?;
    let alias = room.alias.0.as_str();

    let resolved = resolve_with(session, settings, &room.group_rules)
        .map_err(|e| SyncError::new(alias, SyncStep::ResolveDirectory, e))?;
    let roster = roster::build(resolved, &room.static_members)
        .map_err(|e| SyncError::new(alias, SyncStep::BuildRoster, e))?;

    Ok(PlannedRoom { room, roster })
}

/// Rooms without group rules never open the directory session.
fn resolve_with<C: DirectoryConnector>(
    session: &mut LazySession<'_, C>,
    settings: &LdapConfig,
    rules: &[GroupAccessRule],
) -> Result<BTreeMap<UserId, AccessLevel>, RoomError> {
    if rules.is_empty() {
        return Ok(BTreeMap::new());
    }
    directory::resolve(session.get()?, settings, rules)
}
