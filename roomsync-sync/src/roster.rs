//! Desired roster: who should be in a room, and at which power level.

use std::collections::BTreeMap;

use serde::Serialize;

use roomsync_core::{AccessLevel, StaticMember, UserId};

use crate::error::RoomError;

/// Identity → access level, iterated in identity order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct DesiredRoster(BTreeMap<UserId, AccessLevel>);

impl DesiredRoster {
    pub fn get(&self, user: &UserId) -> Option<AccessLevel> {
        self.0.get(user).copied()
    }

    pub fn contains(&self, user: &UserId) -> bool {
        self.0.contains_key(user)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UserId, AccessLevel)> {
        self.0.iter().map(|(user, level)| (user, *level))
    }
}

impl From<BTreeMap<UserId, AccessLevel>> for DesiredRoster {
    fn from(map: BTreeMap<UserId, AccessLevel>) -> Self {
        Self(map)
    }
}

/// Merge directory-resolved members with static members.
///
/// Static members are applied last, so on a collision the static level wins
/// no matter how the directory rules were ordered. Fails on the first static
/// entry without a well-formed identity.
pub fn build(
    resolved: BTreeMap<UserId, AccessLevel>,
    static_members: &[StaticMember],
) -> Result<DesiredRoster, RoomError> {
    let mut roster = resolved;
    for (index, member) in static_members.iter().enumerate() {
        let identity = match member.identity.as_deref().map(str::trim) {
            None | Some("") => {
                return Err(RoomError::InvalidStaticMember {
                    index,
                    reason: "mxid is missing".into(),
                })
            }
            Some(raw) => UserId::from(raw),
        };
        if !identity.is_well_formed() {
            return Err(RoomError::InvalidStaticMember {
                index,
                reason: format!("'{identity}' is not of the form @user:server"),
            });
        }
        roster.insert(identity, member.access_level);
    }
    Ok(DesiredRoster(roster))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: &str, level: u32) -> StaticMember {
        StaticMember {
            identity: Some(id.into()),
            access_level: AccessLevel(level),
        }
    }

    fn resolved(entries: &[(&str, u32)]) -> BTreeMap<UserId, AccessLevel> {
        entries
            .iter()
            .map(|(id, level)| (UserId::from(*id), AccessLevel(*level)))
            .collect()
    }

    #[test]
    fn static_member_overrides_directory_level() {
        let roster = build(
            resolved(&[("@admin:example.org", 50), ("@bob:example.org", 50)]),
            &[member("@admin:example.org", 100)],
        )
        .unwrap();
        assert_eq!(roster.get(&UserId::from("@admin:example.org")), Some(AccessLevel(100)));
        assert_eq!(roster.get(&UserId::from("@bob:example.org")), Some(AccessLevel(50)));
        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn static_override_can_lower_a_level() {
        let roster = build(
            resolved(&[("@carol:example.org", 100)]),
            &[member("@carol:example.org", 0)],
        )
        .unwrap();
        assert_eq!(roster.get(&UserId::from("@carol:example.org")), Some(AccessLevel::MEMBER));
    }

    #[test]
    fn later_static_entry_wins() {
        let roster = build(
            BTreeMap::new(),
            &[member("@dup:example.org", 10), member("@dup:example.org", 20)],
        )
        .unwrap();
        assert_eq!(roster.get(&UserId::from("@dup:example.org")), Some(AccessLevel(20)));
    }

    #[test]
    fn missing_identity_is_rejected() {
        let members = vec![
            member("@ok:example.org", 0),
            StaticMember { identity: None, access_level: AccessLevel(5) },
        ];
        let err = build(BTreeMap::new(), &members).unwrap_err();
        assert!(matches!(err, RoomError::InvalidStaticMember { index: 1, .. }), "{err}");
    }

    #[test]
    fn malformed_identity_is_rejected() {
        let err = build(BTreeMap::new(), &[member("bob", 0)]).unwrap_err();
        assert!(err.to_string().contains("'bob'"), "{err}");
    }

    #[test]
    fn iteration_is_sorted() {
        let roster = build(
            resolved(&[("@zed:example.org", 0), ("@amy:example.org", 0)]),
            &[],
        )
        .unwrap();
        let ids: Vec<_> = roster.iter().map(|(id, _)| id.0.as_str()).collect();
        assert_eq!(ids, ["@amy:example.org", "@zed:example.org"]);
    }
}
