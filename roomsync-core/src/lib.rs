//! roomsync core library: domain types, config, collaborator contracts, errors.
//!
//! - [`types`]: newtypes, room declarations, connection settings
//! - [`config`]: load / validate
//! - [`remote`]: [`RoomApi`] and [`DirectoryConnector`] traits
//! - [`error`]: [`ConfigError`], [`ApiError`], [`DirectoryError`]

pub mod config;
pub mod error;
pub mod remote;
pub mod types;

pub use error::{ApiError, ConfigError, DirectoryError};
pub use remote::{
    AliasLookup, Directory, DirectoryConnector, DirectoryEntry, MemberEvent, Membership,
    PowerLevels, RoomApi,
};
pub use types::{
    AccessLevel, Config, GroupAccessRule, HomeserverConfig, LdapConfig, RoomAlias, RoomId,
    RoomSpec, StaticMember, UserId, Visibility,
};
