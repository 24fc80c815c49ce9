//! Directory membership resolution.
//!
//! Every [`GroupAccessRule`] becomes one subtree search for
//! `(&<user_filter>(memberOf=<group>))`; each hit's `uid` is turned into a
//! user handle on the configured homeserver.

use std::collections::BTreeMap;

use roomsync_core::{
    AccessLevel, Directory, DirectoryConnector, DirectoryEntry, GroupAccessRule, LdapConfig,
    UserId,
};

use crate::error::RoomError;

/// Attribute holding a user's login name.
pub const IDENTITY_ATTR: &str = "uid";

/// Resolve already-rendered rules to identity → access level.
///
/// Rules are applied in declaration order; a later rule overwrites the level
/// an earlier one assigned to the same identity. Any failed search aborts the
/// whole resolution.
pub fn resolve<D: Directory>(
    directory: &mut D,
    settings: &LdapConfig,
    rules: &[GroupAccessRule],
) -> Result<BTreeMap<UserId, AccessLevel>, RoomError> {
    let mut members = BTreeMap::new();
    for rule in rules {
        tracing::debug!(group = %rule.group, level = %rule.access_level, "resolving group");
        let filter = group_filter(&settings.user_filter, &rule.group);
        let entries = directory
            .search(&settings.base_dn, &filter, &[IDENTITY_ATTR])
            .map_err(|source| RoomError::DirectoryQueryFailed {
                group: rule.group.clone(),
                source,
            })?;
        tracing::debug!(group = %rule.group, count = entries.len(), "group resolved");
        for entry in &entries {
            let user = identity_of(entry, &settings.mxid_homeserver)?;
            members.insert(user, rule.access_level);
        }
    }
    Ok(members)
}

/// `(&<user_filter>(memberOf=<group>))` with the group value escaped.
pub fn group_filter(user_filter: &str, group: &str) -> String {
    format!("(&{user_filter}(memberOf={}))", escape_filter_value(group))
}

/// Escape an assertion value for use inside a search filter (RFC 4515).
pub fn escape_filter_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\5c"),
            '*' => out.push_str("\\2a"),
            '(' => out.push_str("\\28"),
            ')' => out.push_str("\\29"),
            '\0' => out.push_str("\\00"),
            _ => out.push(c),
        }
    }
    out
}

fn identity_of(entry: &DirectoryEntry, homeserver: &str) -> Result<UserId, RoomError> {
    let unusable = |reason: &str| RoomError::InvalidDirectoryEntry {
        dn: entry.dn.clone(),
        reason: reason.to_owned(),
    };
    let raw = entry
        .first(IDENTITY_ATTR)
        .ok_or_else(|| unusable("no uid attribute"))?;
    let uid = std::str::from_utf8(raw).map_err(|_| unusable("uid is not valid UTF-8"))?;
    if uid.is_empty() {
        return Err(unusable("uid is empty"));
    }
    let user = UserId::from_parts(uid, homeserver);
    if !user.is_well_formed() {
        return Err(unusable("uid does not form a valid user id"));
    }
    Ok(user)
}

/// A directory session opened on first use and closed exactly once.
pub struct LazySession<'a, C: DirectoryConnector> {
    connector: &'a C,
    session: Option<C::Session>,
}

impl<'a, C: DirectoryConnector> LazySession<'a, C> {
    pub fn new(connector: &'a C) -> Self {
        LazySession { connector, session: None }
    }

    /// The bound session, connecting if this is the first use.
    pub fn get(&mut self) -> Result<&mut C::Session, RoomError> {
        let session = match self.session.take() {
            Some(session) => session,
            None => {
                tracing::debug!(uri = self.connector.uri(), "binding to directory");
                self.connector
                    .connect()
                    .map_err(|source| RoomError::DirectoryUnavailable {
                        uri: self.connector.uri().to_owned(),
                        source,
                    })?
            }
        };
        Ok(self.session.insert(session))
    }

    /// Unbind if a session was ever opened. Unbind failures are logged only;
    /// they never mask the outcome of the run.
    pub fn close(self) {
        if let Some(session) = self.session {
            if let Err(err) = session.close() {
                tracing::warn!(error = %err, "directory unbind failed");
            }
        }
    }
}
