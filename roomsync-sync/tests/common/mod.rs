//! In-memory homeserver and directory used by the integration tests.
//!
//! Both fakes record every call so tests can assert exactly which reads and
//! writes the engine issued.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use roomsync_core::remote::MEMBER_EVENT_TYPE;
use roomsync_core::{
    AccessLevel, AliasLookup, ApiError, Directory, DirectoryConnector, DirectoryEntry,
    DirectoryError, GroupAccessRule, LdapConfig, MemberEvent, Membership, PowerLevels, RoomAlias,
    RoomApi, RoomId, RoomSpec, StaticMember, UserId, Visibility,
};

pub const BOT: &str = "@bot:example.org";

// ---------------------------------------------------------------------------
// Homeserver
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ResolveAlias(RoomAlias),
    CreateRoom(String),
    RoomName(RoomId),
    SetRoomName(RoomId, String),
    Members(RoomId),
    Invite(RoomId, UserId),
    PowerLevels(RoomId),
    SetPowerLevels(RoomId),
    Visibility(RoomId),
    SetVisibility(RoomId, Visibility),
}

impl Call {
    pub fn name(&self) -> &'static str {
        match self {
            Call::ResolveAlias(_) => "resolve_alias",
            Call::CreateRoom(_) => "create_room",
            Call::RoomName(_) => "room_name",
            Call::SetRoomName(..) => "set_room_name",
            Call::Members(_) => "members",
            Call::Invite(..) => "invite",
            Call::PowerLevels(_) => "power_levels",
            Call::SetPowerLevels(_) => "set_power_levels",
            Call::Visibility(_) => "visibility",
            Call::SetVisibility(..) => "set_visibility",
        }
    }

    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Call::CreateRoom(_)
                | Call::SetRoomName(..)
                | Call::Invite(..)
                | Call::SetPowerLevels(_)
                | Call::SetVisibility(..)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FakeRoom {
    pub name: Option<String>,
    pub members: BTreeMap<String, Membership>,
    pub power_levels: PowerLevels,
    pub visibility: Visibility,
}

impl FakeRoom {
    pub fn joined(mut self, user: &str) -> Self {
        self.members.insert(user.into(), Membership::Join);
        self
    }

    pub fn invited(mut self, user: &str) -> Self {
        self.members.insert(user.into(), Membership::Invite);
        self
    }

    pub fn level(mut self, user: &str, level: i64) -> Self {
        self.power_levels.users.insert(UserId::from(user), level);
        self
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[derive(Debug, Default)]
pub struct FakeHomeserver {
    pub aliases: HashMap<RoomAlias, RoomId>,
    pub rooms: HashMap<RoomId, FakeRoom>,
    pub calls: Vec<Call>,
    /// Name of a call (see [`Call::name`]) that fails with a 500.
    pub fail_on: Option<&'static str>,
    pub next_id: usize,
}

impl FakeHomeserver {
    pub fn with_room(mut self, alias: &str, room: FakeRoom) -> Self {
        let id = self.allocate_id();
        self.aliases.insert(RoomAlias::from(alias), id.clone());
        self.rooms.insert(id, room);
        self
    }

    pub fn room(&self, alias: &str) -> &FakeRoom {
        let id = &self.aliases[&RoomAlias::from(alias)];
        &self.rooms[id]
    }

    pub fn mutations(&self) -> Vec<&Call> {
        self.calls.iter().filter(|c| c.is_mutation()).collect()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    fn allocate_id(&mut self) -> RoomId {
        self.next_id += 1;
        RoomId(format!("!room{}:example.org", self.next_id))
    }

    fn record(&mut self, call: Call) -> Result<(), ApiError> {
        let fail = self.fail_on == Some(call.name());
        self.calls.push(call);
        if fail {
            return Err(ApiError::Status {
                status: 500,
                errcode: "M_UNKNOWN".into(),
                message: "injected failure".into(),
            });
        }
        Ok(())
    }

    fn get(&mut self, room: &RoomId) -> Result<&mut FakeRoom, ApiError> {
        self.rooms.get_mut(room).ok_or_else(|| ApiError::Status {
            status: 404,
            errcode: "M_NOT_FOUND".into(),
            message: format!("unknown room {room}"),
        })
    }
}

impl RoomApi for FakeHomeserver {
    fn resolve_alias(&mut self, alias: &RoomAlias) -> Result<AliasLookup, ApiError> {
        self.record(Call::ResolveAlias(alias.clone()))?;
        Ok(match self.aliases.get(alias) {
            Some(id) => AliasLookup::Found(id.clone()),
            None => AliasLookup::NotFound,
        })
    }

    fn create_room(&mut self, alias_localpart: &str) -> Result<RoomId, ApiError> {
        self.record(Call::CreateRoom(alias_localpart.into()))?;
        let id = self.allocate_id();
        let alias = RoomAlias(format!("#{alias_localpart}:example.org"));
        self.aliases.insert(alias, id.clone());
        self.rooms
            .insert(id.clone(), FakeRoom::default().joined(BOT).level(BOT, 100));
        Ok(id)
    }

    fn room_name(&mut self, room: &RoomId) -> Result<Option<String>, ApiError> {
        self.record(Call::RoomName(room.clone()))?;
        Ok(self.get(room)?.name.clone())
    }

    fn set_room_name(&mut self, room: &RoomId, name: &str) -> Result<(), ApiError> {
        self.record(Call::SetRoomName(room.clone(), name.into()))?;
        self.get(room)?.name = Some(name.into());
        Ok(())
    }

    fn members(&mut self, room: &RoomId) -> Result<Vec<MemberEvent>, ApiError> {
        self.record(Call::Members(room.clone()))?;
        Ok(self
            .get(room)?
            .members
            .iter()
            .map(|(user, membership)| MemberEvent {
                event_type: MEMBER_EVENT_TYPE.into(),
                state_key: user.clone(),
                membership: membership.clone(),
            })
            .collect())
    }

    fn invite(&mut self, room: &RoomId, user: &UserId) -> Result<(), ApiError> {
        self.record(Call::Invite(room.clone(), user.clone()))?;
        self.get(room)?.members.insert(user.0.clone(), Membership::Invite);
        Ok(())
    }

    fn power_levels(&mut self, room: &RoomId) -> Result<PowerLevels, ApiError> {
        self.record(Call::PowerLevels(room.clone()))?;
        Ok(self.get(room)?.power_levels.clone())
    }

    fn set_power_levels(&mut self, room: &RoomId, levels: &PowerLevels) -> Result<(), ApiError> {
        self.record(Call::SetPowerLevels(room.clone()))?;
        self.get(room)?.power_levels = levels.clone();
        Ok(())
    }

    fn visibility(&mut self, room: &RoomId) -> Result<Visibility, ApiError> {
        self.record(Call::Visibility(room.clone()))?;
        Ok(self.get(room)?.visibility)
    }

    fn set_visibility(&mut self, room: &RoomId, visibility: Visibility) -> Result<(), ApiError> {
        self.record(Call::SetVisibility(room.clone(), visibility))?;
        self.get(room)?.visibility = visibility;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct DirectoryLog {
    pub connects: usize,
    pub closes: usize,
    pub filters: Vec<String>,
}

#[derive(Debug, Default)]
pub struct FakeDirectory {
    /// Group DN → member uids.
    pub groups: HashMap<String, Vec<String>>,
    pub refuse_bind: bool,
    pub log: Rc<RefCell<DirectoryLog>>,
}

impl FakeDirectory {
    pub fn with_group(mut self, dn: &str, uids: &[&str]) -> Self {
        self.groups
            .insert(dn.into(), uids.iter().map(|u| u.to_string()).collect());
        self
    }
}

pub struct FakeSession {
    groups: HashMap<String, Vec<String>>,
    log: Rc<RefCell<DirectoryLog>>,
}

impl DirectoryConnector for FakeDirectory {
    type Session = FakeSession;

    fn connect(&self) -> Result<FakeSession, DirectoryError> {
        self.log.borrow_mut().connects += 1;
        if self.refuse_bind {
            return Err(DirectoryError::Bind {
                dn: "cn=inviter".into(),
                message: "invalid credentials".into(),
            });
        }
        Ok(FakeSession {
            groups: self.groups.clone(),
            log: Rc::clone(&self.log),
        })
    }

    fn uri(&self) -> &str {
        "ldap://fake"
    }
}

impl Directory for FakeSession {
    fn search(
        &mut self,
        _base: &str,
        filter: &str,
        _attrs: &[&str],
    ) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        self.log.borrow_mut().filters.push(filter.to_owned());
        let uids = self
            .groups
            .iter()
            .find(|(dn, _)| filter.ends_with(&format!("(memberOf={dn}))")))
            .map(|(_, uids)| uids.clone())
            .ok_or_else(|| DirectoryError::Search(format!("no such group in {filter}")))?;
        Ok(uids
            .into_iter()
            .map(|uid| {
                let mut entry = DirectoryEntry {
                    dn: format!("uid={uid},ou=people,dc=example,dc=org"),
                    ..Default::default()
                };
                entry.attrs.insert("uid".into(), vec![uid.into_bytes()]);
                entry
            })
            .collect())
    }

    fn whoami(&mut self) -> Result<String, DirectoryError> {
        Ok("dn:cn=inviter,ou=services,dc=example,dc=org".into())
    }

    fn close(self) -> Result<(), DirectoryError> {
        self.log.borrow_mut().closes += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn ldap_settings() -> LdapConfig {
    LdapConfig {
        uri: "ldap://fake".into(),
        connect_dn: "cn=inviter,ou=services,dc=example,dc=org".into(),
        connect_password: "secret".into(),
        base_dn: "ou=people,dc=example,dc=org".into(),
        user_filter: "(objectClass=posixAccount)".into(),
        mxid_homeserver: "example.org".into(),
    }
}

pub fn room_spec(alias: &str, name: &str) -> RoomSpec {
    RoomSpec {
        alias_template: alias.into(),
        display_name: name.into(),
        visibility: Visibility::Private,
        group_rules: vec![],
        static_members: vec![],
    }
}

pub fn rule(group: &str, level: u32) -> GroupAccessRule {
    GroupAccessRule {
        group: group.into(),
        access_level: AccessLevel(level),
    }
}

pub fn member(id: &str, level: u32) -> StaticMember {
    StaticMember {
        identity: Some(id.into()),
        access_level: AccessLevel(level),
    }
}
