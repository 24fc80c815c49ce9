//! # roomsync-sync
//!
//! Room state reconciliation engine.
//!
//! Call [`sync`] to converge every configured room toward the membership its
//! directory groups and static members describe. [`plan`] and
//! [`check_directory`] are the read-only counterparts used for previews and
//! diagnostics.

pub mod converge;
pub mod directory;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod roster;

pub use error::{RoomError, SyncError, SyncStep};
pub use pipeline::{
    check_directory, plan, resolve_directory_membership, sync, DirectoryCheck, DirectoryContext,
    PlannedRoom,
};
pub use report::{PowerLevelChange, RoomReport, SyncReport};
pub use roster::DesiredRoster;
