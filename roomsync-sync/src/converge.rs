//! Room convergence driver.
//!
//! ## Five-step protocol
//!
//! 1. Ensure-Exists: resolve the alias, create the room if it is missing.
//! 2. Ensure-Name: set the display name if it differs (unset reads as `""`).
//! 3. Ensure-Invitees: invite roster members that are neither joined nor invited.
//! 4. Ensure-Power-Levels: overlay the roster onto the current `users` map and
//!    write it back in one call, only if something changed.
//! 5. Ensure-Visibility: set directory visibility if it differs.
//!
//! Every step reads the current remote state before deciding, so a converged
//! room costs only reads. Membership is additive: nobody is kicked, nobody is
//! re-invited, and power-level entries for users outside the roster are kept.
//!
//! In dry-run mode only the reads happen. A room that does not exist yet is
//! planned against an empty, private, nameless room.

use std::collections::HashSet;

use roomsync_core::remote::MEMBER_EVENT_TYPE;
use roomsync_core::{
    AliasLookup, MemberEvent, Membership, PowerLevels, RoomAlias, RoomApi, RoomId, UserId,
    Visibility,
};
use roomsync_renderer::{RenderError, RenderedRoom};

use crate::error::{RoomError, SyncError, SyncStep};
use crate::report::{PowerLevelChange, RoomReport};
use crate::roster::DesiredRoster;

/// Room that steps 2 to 5 operate on.
enum Target {
    Existing(RoomId),
    /// Dry run only: the room would have been created in step 1.
    Planned,
}

/// Joined and invited identities of a room.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MemberSets {
    pub joined: HashSet<String>,
    pub invited: HashSet<String>,
}

impl MemberSets {
    /// Partition membership-state events. Other event types and other
    /// membership values (leave, ban, knock) are ignored.
    pub fn from_events(events: &[MemberEvent]) -> Self {
        let mut sets = MemberSets::default();
        for event in events.iter().filter(|e| e.event_type == MEMBER_EVENT_TYPE) {
            match event.membership {
                Membership::Join => {
                    sets.joined.insert(event.state_key.clone());
                }
                Membership::Invite => {
                    sets.invited.insert(event.state_key.clone());
                }
                _ => {}
            }
        }
        sets
    }

    pub fn is_present(&self, user: &UserId) -> bool {
        self.joined.contains(&user.0) || self.invited.contains(&user.0)
    }
}

/// Overlay the roster onto `levels.users`, returning what changed.
///
/// Entries for users outside the roster are left untouched.
pub fn overlay_power_levels(levels: &mut PowerLevels, roster: &DesiredRoster) -> Vec<PowerLevelChange> {
    let mut changes = Vec::new();
    for (user, level) in roster.iter() {
        let to = level.as_power_level();
        let from = levels.users.get(user).copied();
        if from != Some(to) {
            levels.users.insert(user.clone(), to);
            changes.push(PowerLevelChange { user: user.clone(), from, to });
        }
    }
    changes
}

/// Drives one room toward its desired state.
pub struct Converger<'a, R: RoomApi> {
    api: &'a mut R,
    dry_run: bool,
}

impl<'a, R: RoomApi> Converger<'a, R> {
    pub fn new(api: &'a mut R, dry_run: bool) -> Self {
        Converger { api, dry_run }
    }

    /// Run all five steps in order. The first failure aborts the room.
    pub fn converge(
        &mut self,
        room: &RenderedRoom,
        roster: &DesiredRoster,
    ) -> Result<RoomReport, SyncError> {
        let fail = |step: SyncStep| {
            let alias = room.alias.0.clone();
            move |cause: RoomError| SyncError::new(alias, step, cause)
        };
        let mut report = RoomReport::new(room.alias.clone(), roster.len());

        let target = self
            .ensure_exists(&room.alias, &mut report)
            .map_err(fail(SyncStep::EnsureExists))?;
        self.ensure_name(&target, &room.display_name, &mut report)
            .map_err(fail(SyncStep::EnsureName))?;
        self.ensure_invitees(&target, roster, &mut report)
            .map_err(fail(SyncStep::EnsureInvitees))?;
        self.ensure_power_levels(&target, roster, &mut report)
            .map_err(fail(SyncStep::EnsurePowerLevels))?;
        self.ensure_visibility(&target, room.visibility, &mut report)
            .map_err(fail(SyncStep::EnsureVisibility))?;

        tracing::info!(
            room = %room.alias,
            mutations = report.mutations(),
            dry_run = self.dry_run,
            "room synced"
        );
        Ok(report)
    }

    // -----------------------------------------------------------------------
    // 1. Ensure-Exists
    // -----------------------------------------------------------------------

    fn ensure_exists(
        &mut self,
        alias: &RoomAlias,
        report: &mut RoomReport,
    ) -> Result<Target, RoomError> {
        tracing::debug!(room = %alias, "ensuring room exists");
        match self.api.resolve_alias(alias).map_err(RoomError::read("room alias"))? {
            AliasLookup::Found(room_id) => {
                tracing::debug!(room = %alias, room_id = %room_id, "found room");
                report.room_id = Some(room_id.clone());
                Ok(Target::Existing(room_id))
            }
            AliasLookup::NotFound => {
                let localpart = alias.localpart().ok_or_else(|| {
                    RoomError::Template(RenderError::InvalidAlias { alias: alias.0.clone() })
                })?;
                report.created = true;
                if self.dry_run {
                    tracing::info!(room = %alias, "[dry-run] would create room");
                    return Ok(Target::Planned);
                }
                tracing::info!(room = %alias, "alias not found, creating room");
                let room_id = self.api.create_room(localpart).map_err(|source| {
                    RoomError::RoomNotFoundAndUncreatable { alias: alias.clone(), source }
                })?;
                tracing::info!(room = %alias, room_id = %room_id, "created room");
                report.room_id = Some(room_id.clone());
                Ok(Target::Existing(room_id))
            }
        }
    }

    // -----------------------------------------------------------------------
    // 2. Ensure-Name
    // -----------------------------------------------------------------------

    fn ensure_name(
        &mut self,
        target: &Target,
        name: &str,
        report: &mut RoomReport,
    ) -> Result<(), RoomError> {
        let current = match target {
            Target::Existing(room_id) => self
                .api
                .room_name(room_id)
                .map_err(RoomError::read("room name"))?
                .unwrap_or_default(),
            Target::Planned => String::new(),
        };
        if current == name {
            return Ok(());
        }
        report.renamed_to = Some(name.to_owned());
        if let Target::Existing(room_id) = target {
            if !self.dry_run {
                tracing::info!(room_id = %room_id, from = %current, to = %name, "setting room name");
                self.api
                    .set_room_name(room_id, name)
                    .map_err(RoomError::write("room name"))?;
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // 3. Ensure-Invitees
    // -----------------------------------------------------------------------

    fn ensure_invitees(
        &mut self,
        target: &Target,
        roster: &DesiredRoster,
        report: &mut RoomReport,
    ) -> Result<(), RoomError> {
        let present = match target {
            Target::Existing(room_id) => {
                let events = self.api.members(room_id).map_err(RoomError::read("room members"))?;
                MemberSets::from_events(&events)
            }
            Target::Planned => MemberSets::default(),
        };
        tracing::debug!(
            joined = present.joined.len(),
            invited = present.invited.len(),
            "current membership"
        );

        for (user, _) in roster.iter() {
            if present.is_present(user) {
                continue;
            }
            if let Target::Existing(room_id) = target {
                if !self.dry_run {
                    tracing::info!(room_id = %room_id, user = %user, "inviting");
                    self.api
                        .invite(room_id, user)
                        .map_err(RoomError::write("invite"))?;
                }
            }
            report.invited.push(user.clone());
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // 4. Ensure-Power-Levels
    // -----------------------------------------------------------------------

    fn ensure_power_levels(
        &mut self,
        target: &Target,
        roster: &DesiredRoster,
        report: &mut RoomReport,
    ) -> Result<(), RoomError> {
        let mut levels = match target {
            Target::Existing(room_id) => self
                .api
                .power_levels(room_id)
                .map_err(RoomError::read("power levels"))?,
            Target::Planned => PowerLevels::default(),
        };
        let changes = overlay_power_levels(&mut levels, roster);
        if changes.is_empty() {
            return Ok(());
        }
        if let Target::Existing(room_id) = target {
            if !self.dry_run {
                tracing::info!(room_id = %room_id, changed = changes.len(), "writing power levels");
                self.api
                    .set_power_levels(room_id, &levels)
                    .map_err(RoomError::write("power levels"))?;
            }
        }
        report.power_levels = changes;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // 5. Ensure-Visibility
    // -----------------------------------------------------------------------

    fn ensure_visibility(
        &mut self,
        target: &Target,
        visibility: Visibility,
        report: &mut RoomReport,
    ) -> Result<(), RoomError> {
        let current = match target {
            Target::Existing(room_id) => self
                .api
                .visibility(room_id)
                .map_err(RoomError::read("directory visibility"))?,
            Target::Planned => Visibility::Private,
        };
        if current == visibility {
            return Ok(());
        }
        if let Target::Existing(room_id) = target {
            if !self.dry_run {
                tracing::info!(room_id = %room_id, to = %visibility, "setting directory visibility");
                self.api
                    .set_visibility(room_id, visibility)
                    .map_err(RoomError::write("directory visibility"))?;
            }
        }
        report.visibility_changed_to = Some(visibility);
        Ok(())
    }
}
