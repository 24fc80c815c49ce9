//! Collaborator contracts: the chat platform ([`RoomApi`]) and the directory
//! ([`DirectoryConnector`] / [`Directory`]).
//!
//! The reconciliation engine only ever talks to these traits. Production
//! implementations live in `roomsync-remote`; tests use in-memory fakes.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{ApiError, DirectoryError};
use crate::types::{RoomAlias, RoomId, UserId, Visibility};

/// State event type carrying room membership.
pub const MEMBER_EVENT_TYPE: &str = "m.room.member";

// ---------------------------------------------------------------------------
// Chat platform
// ---------------------------------------------------------------------------

/// Result of resolving an alias. "Not found" is an expected branch, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasLookup {
    Found(RoomId),
    NotFound,
}

/// Membership value of an `m.room.member` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Membership {
    Join,
    Invite,
    Leave,
    Ban,
    Knock,
    #[serde(other)]
    Unknown,
}

/// A membership-state event as returned by member enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberEvent {
    pub event_type: String,
    /// The user the event is about.
    pub state_key: String,
    pub membership: Membership,
}

/// Content of the power-levels state event.
///
/// Only `users` is interpreted; every other field is carried through
/// unchanged so writing the event back never resets room defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PowerLevels {
    #[serde(default)]
    pub users: BTreeMap<UserId, i64>,
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

/// Operations the engine needs from the chat platform.
///
/// Every call is a blocking round trip.
pub trait RoomApi {
    fn resolve_alias(&mut self, alias: &RoomAlias) -> Result<AliasLookup, ApiError>;

    /// Create a room whose canonical alias local part is `alias_localpart`.
    fn create_room(&mut self, alias_localpart: &str) -> Result<RoomId, ApiError>;

    /// Current display name, `None` when the room has no name event.
    fn room_name(&mut self, room: &RoomId) -> Result<Option<String>, ApiError>;

    fn set_room_name(&mut self, room: &RoomId, name: &str) -> Result<(), ApiError>;

    fn members(&mut self, room: &RoomId) -> Result<Vec<MemberEvent>, ApiError>;

    fn invite(&mut self, room: &RoomId, user: &UserId) -> Result<(), ApiError>;

    fn power_levels(&mut self, room: &RoomId) -> Result<PowerLevels, ApiError>;

    fn set_power_levels(&mut self, room: &RoomId, levels: &PowerLevels) -> Result<(), ApiError>;

    fn visibility(&mut self, room: &RoomId) -> Result<Visibility, ApiError>;

    fn set_visibility(&mut self, room: &RoomId, visibility: Visibility) -> Result<(), ApiError>;
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

/// One search result: the entry DN and its raw attribute values.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DirectoryEntry {
    pub dn: String,
    pub attrs: HashMap<String, Vec<Vec<u8>>>,
}

impl DirectoryEntry {
    /// First value of `attr`, if any.
    pub fn first(&self, attr: &str) -> Option<&[u8]> {
        self.attrs.get(attr)?.first().map(Vec::as_slice)
    }
}

/// Opens bound directory sessions.
pub trait DirectoryConnector {
    type Session: Directory;

    /// Connect and bind. Failure means the directory is unavailable.
    fn connect(&self) -> Result<Self::Session, DirectoryError>;

    /// URI shown in error messages.
    fn uri(&self) -> &str;
}

/// A bound directory session.
pub trait Directory {
    /// Subtree search under `base`.
    fn search(
        &mut self,
        base: &str,
        filter: &str,
        attrs: &[&str],
    ) -> Result<Vec<DirectoryEntry>, DirectoryError>;

    /// Identity the session is bound as.
    fn whoami(&mut self) -> Result<String, DirectoryError>;

    /// Unbind and release the connection.
    fn close(self) -> Result<(), DirectoryError>;
}
