//! What a sync run did (or, in dry-run mode, would do).

use chrono::{DateTime, Utc};
use serde::Serialize;

use roomsync_core::{RoomAlias, RoomId, UserId, Visibility};

/// One power-level entry that differs from the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PowerLevelChange {
    pub user: UserId,
    /// Level before the sync; `None` if the user had no explicit entry.
    pub from: Option<i64>,
    pub to: i64,
}

/// Outcome of reconciling one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomReport {
    pub alias: RoomAlias,
    /// `None` only in dry-run mode when the room does not exist yet.
    pub room_id: Option<RoomId>,
    pub roster_size: usize,
    pub created: bool,
    /// New display name, if it was (or would be) changed.
    pub renamed_to: Option<String>,
    pub invited: Vec<UserId>,
    pub power_levels: Vec<PowerLevelChange>,
    pub visibility_changed_to: Option<Visibility>,
}

impl RoomReport {
    pub(crate) fn new(alias: RoomAlias, roster_size: usize) -> Self {
        RoomReport {
            alias,
            room_id: None,
            roster_size,
            created: false,
            renamed_to: None,
            invited: Vec::new(),
            power_levels: Vec::new(),
            visibility_changed_to: None,
        }
    }

    /// Number of mutating calls issued (or planned). Power levels are written
    /// in a single call regardless of how many entries changed.
    pub fn mutations(&self) -> usize {
        usize::from(self.created)
            + usize::from(self.renamed_to.is_some())
            + self.invited.len()
            + usize::from(!self.power_levels.is_empty())
            + usize::from(self.visibility_changed_to.is_some())
    }

    pub fn is_converged(&self) -> bool {
        self.mutations() == 0
    }
}

/// Outcome of a whole sync run. Only produced when every room succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub template_arg: String,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub rooms: Vec<RoomReport>,
}

impl SyncReport {
    pub fn mutations(&self) -> usize {
        self.rooms.iter().map(RoomReport::mutations).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_levels_count_as_one_mutation() {
        let mut report = RoomReport::new(RoomAlias::from("#a:b"), 3);
        assert!(report.is_converged());
        report.invited = vec![UserId::from("@x:b"), UserId::from("@y:b")];
        report.power_levels = vec![
            PowerLevelChange { user: UserId::from("@x:b"), from: None, to: 0 },
            PowerLevelChange { user: UserId::from("@y:b"), from: Some(10), to: 50 },
        ];
        report.visibility_changed_to = Some(Visibility::Public);
        assert_eq!(report.mutations(), 4);
    }

    #[test]
    fn report_serializes_to_json() {
        let now = Utc::now();
        let report = SyncReport {
            template_arg: "eu".into(),
            dry_run: true,
            started_at: now,
            finished_at: now,
            rooms: vec![RoomReport::new(RoomAlias::from("#a:b"), 0)],
        };
        let value = serde_json::to_value(&report).expect("json");
        assert_eq!(value["rooms"][0]["alias"], "#a:b");
        assert_eq!(value["rooms"][0]["room_id"], serde_json::Value::Null);
        assert_eq!(value["dry_run"], true);
    }
}
