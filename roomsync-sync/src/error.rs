//! Error types for roomsync-sync.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use roomsync_core::{ApiError, DirectoryError, RoomAlias};
use roomsync_renderer::RenderError;

/// The step of a room's reconciliation that was running when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStep {
    Render,
    ResolveDirectory,
    BuildRoster,
    EnsureExists,
    EnsureName,
    EnsureInvitees,
    EnsurePowerLevels,
    EnsureVisibility,
}

impl fmt::Display for SyncStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncStep::Render => "render",
            SyncStep::ResolveDirectory => "resolve-directory",
            SyncStep::BuildRoster => "build-roster",
            SyncStep::EnsureExists => "ensure-exists",
            SyncStep::EnsureName => "ensure-name",
            SyncStep::EnsureInvitees => "ensure-invitees",
            SyncStep::EnsurePowerLevels => "ensure-power-levels",
            SyncStep::EnsureVisibility => "ensure-visibility",
        };
        f.write_str(s)
    }
}

/// Why a room could not be reconciled.
#[derive(Debug, Error)]
pub enum RoomError {
    /// Template argument missing, or the rendered alias is malformed.
    #[error(transparent)]
    Template(#[from] RenderError),

    #[error("directory {uri} unavailable: {source}")]
    DirectoryUnavailable {
        uri: String,
        #[source]
        source: DirectoryError,
    },

    #[error("directory query for group {group} failed: {source}")]
    DirectoryQueryFailed {
        group: String,
        #[source]
        source: DirectoryError,
    },

    /// A search result without a decodable identity attribute.
    #[error("directory entry {dn} is unusable: {reason}")]
    InvalidDirectoryEntry { dn: String, reason: String },

    #[error("static member #{index} is invalid: {reason}")]
    InvalidStaticMember { index: usize, reason: String },

    #[error("room {alias} not found and could not be created: {source}")]
    RoomNotFoundAndUncreatable {
        alias: RoomAlias,
        #[source]
        source: ApiError,
    },

    #[error("reading {what} failed: {source}")]
    RoomStateReadFailed {
        what: &'static str,
        #[source]
        source: ApiError,
    },

    #[error("writing {what} failed: {source}")]
    RoomStateWriteFailed {
        what: &'static str,
        #[source]
        source: ApiError,
    },
}

impl RoomError {
    pub(crate) fn read(what: &'static str) -> impl FnOnce(ApiError) -> RoomError {
        move |source| RoomError::RoomStateReadFailed { what, source }
    }

    pub(crate) fn write(what: &'static str) -> impl FnOnce(ApiError) -> RoomError {
        move |source| RoomError::RoomStateWriteFailed { what, source }
    }
}

/// A failed sync run: which room, which step, and why.
#[derive(Debug, Error)]
#[error("sync of {room} failed at {step}: {cause}")]
pub struct SyncError {
    /// Rendered alias, or the alias template if rendering itself failed.
    pub room: String,
    pub step: SyncStep,
    #[source]
    pub cause: RoomError,
}

impl SyncError {
    pub fn new(room: impl Into<String>, step: SyncStep, cause: RoomError) -> Self {
        SyncError {
            room: room.into(),
            step,
            cause,
        }
    }
}
