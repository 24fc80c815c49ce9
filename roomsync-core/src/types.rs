//! Domain types for roomsync.
//!
//! Identities, aliases and room ids are newtypes over `String`; the
//! configuration structs mirror the YAML config file one-to-one.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Placeholder token substituted by the template argument.
pub const TEMPLATE_PLACEHOLDER: &str = "<1>";

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A chat-platform user handle, `@localpart:homeserver`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Build `@<localpart>:<homeserver>`.
    pub fn from_parts(localpart: &str, homeserver: &str) -> Self {
        Self(format!("@{localpart}:{homeserver}"))
    }

    /// `true` for `@localpart:server` with both halves non-empty.
    pub fn is_well_formed(&self) -> bool {
        sigil_parts(&self.0, '@').is_some()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A human-readable room alias, `#localpart:server`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomAlias(pub String);

impl RoomAlias {
    /// The part between `#` and the first `:`, used as the alias name when
    /// creating the room.
    pub fn localpart(&self) -> Option<&str> {
        sigil_parts(&self.0, '#').map(|(local, _)| local)
    }

    pub fn is_well_formed(&self) -> bool {
        self.localpart().is_some()
    }
}

impl fmt::Display for RoomAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RoomAlias {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RoomAlias {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Opaque internal room identifier assigned by the homeserver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Power level granted inside a room. Non-negative; `0` is an ordinary member.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AccessLevel(pub u32);

impl AccessLevel {
    pub const MEMBER: AccessLevel = AccessLevel(0);

    /// Value as stored in a power-levels state event.
    pub fn as_power_level(self) -> i64 {
        i64::from(self.0)
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u32> for AccessLevel {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Whether a room is listed in the public room directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Public => write!(f, "public"),
            Visibility::Private => write!(f, "private"),
        }
    }
}

// ---------------------------------------------------------------------------
// Room declarations
// ---------------------------------------------------------------------------

/// Members of a directory group receive `access_level` in the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupAccessRule {
    /// Group DN; may contain the template placeholder.
    #[serde(rename = "ldap_group")]
    pub group: String,
    #[serde(rename = "power_level", default)]
    pub access_level: AccessLevel,
}

/// A member declared by hand, independent of directory state.
///
/// `identity` stays optional here so a malformed entry is reported against
/// its room when the roster is built instead of failing the whole config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticMember {
    #[serde(rename = "mxid", default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    #[serde(rename = "power_level", default)]
    pub access_level: AccessLevel,
}

/// Declarative description of one room to keep in sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSpec {
    /// Alias template, e.g. `#ops-<1>:example.org`.
    #[serde(rename = "alias")]
    pub alias_template: String,
    /// Display name template.
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(rename = "ldap_members", default)]
    pub group_rules: Vec<GroupAccessRule>,
    #[serde(rename = "members", default)]
    pub static_members: Vec<StaticMember>,
}

// ---------------------------------------------------------------------------
// Connection settings
// ---------------------------------------------------------------------------

/// Directory connection and search parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LdapConfig {
    pub uri: String,
    pub connect_dn: String,
    pub connect_password: String,
    pub base_dn: String,
    /// Filter every group search is AND-ed with, e.g. `(objectClass=posixAccount)`.
    pub user_filter: String,
    /// Server name appended to each `uid` to form a user handle.
    pub mxid_homeserver: String,
}

/// Chat-platform client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeserverConfig {
    /// Base URL of the client-server API, e.g. `https://matrix.example.org`.
    pub url: String,
    pub access_token: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

/// Root of the YAML config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub homeserver: HomeserverConfig,
    pub ldap: LdapConfig,
    /// Identities allowed to trigger a sync.
    #[serde(default)]
    pub admin_users: Vec<UserId>,
    #[serde(default)]
    pub sync_rooms: Vec<RoomSpec>,
}

impl Config {
    pub fn is_admin(&self, user: &UserId) -> bool {
        self.admin_users.contains(user)
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// Split `<sigil>local:server` into `(local, server)`.
fn sigil_parts(s: &str, sigil: char) -> Option<(&str, &str)> {
    let rest = s.strip_prefix(sigil)?;
    let (local, server) = rest.split_once(':')?;
    if local.is_empty() || server.is_empty() || local.chars().any(char::is_whitespace) {
        return None;
    }
    Some((local, server))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
