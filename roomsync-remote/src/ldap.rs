//! LDAP directory sessions over `ldap3`'s synchronous connection.

use std::collections::HashMap;
use std::time::Duration;

use ldap3::exop::{WhoAmI, WhoAmIResp};
use ldap3::{LdapConn, LdapConnSettings, Scope, SearchEntry};

use roomsync_core::{Directory, DirectoryConnector, DirectoryEntry, DirectoryError, LdapConfig};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens sessions simple-bound as the configured service account.
#[derive(Debug, Clone)]
pub struct LdapConnector {
    settings: LdapConfig,
}

impl LdapConnector {
    pub fn new(settings: &LdapConfig) -> Self {
        Self {
            settings: settings.clone(),
        }
    }
}

impl DirectoryConnector for LdapConnector {
    type Session = LdapSession;

    fn connect(&self) -> Result<LdapSession, DirectoryError> {
        let uri = self.settings.uri.as_str();
        let dn = self.settings.connect_dn.as_str();

        let conn_settings = LdapConnSettings::new().set_conn_timeout(CONNECT_TIMEOUT);
        let mut conn =
            LdapConn::with_settings(conn_settings, uri).map_err(|e| DirectoryError::Connect {
                uri: uri.to_owned(),
                message: e.to_string(),
            })?;

        let bound = conn
            .simple_bind(dn, &self.settings.connect_password)
            .and_then(|result| result.success());
        if let Err(e) = bound {
            let _ = conn.unbind();
            return Err(DirectoryError::Bind {
                dn: dn.to_owned(),
                message: e.to_string(),
            });
        }

        tracing::debug!(uri, dn, "directory bound");
        Ok(LdapSession { conn })
    }

    fn uri(&self) -> &str {
        &self.settings.uri
    }
}

/// A bound connection. Dropping it without [`Directory::close`] leaves the
/// unbind to the server's idle timeout.
pub struct LdapSession {
    conn: LdapConn,
}

impl Directory for LdapSession {
    fn search(
        &mut self,
        base: &str,
        filter: &str,
        attrs: &[&str],
    ) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        tracing::trace!(base, filter, "ldap search");
        let (entries, _) = self
            .conn
            .search(base, Scope::Subtree, filter, attrs.to_vec())
            .and_then(|result| result.success())
            .map_err(|e| DirectoryError::Search(e.to_string()))?;
        Ok(entries
            .into_iter()
            .map(|raw| directory_entry(SearchEntry::construct(raw)))
            .collect())
    }

    fn whoami(&mut self) -> Result<String, DirectoryError> {
        let (exop, _) = self
            .conn
            .extended(WhoAmI)
            .and_then(|result| result.success())
            .map_err(|e| DirectoryError::Protocol(e.to_string()))?;
        Ok(exop.parse::<WhoAmIResp>().authzid)
    }

    fn close(mut self) -> Result<(), DirectoryError> {
        self.conn
            .unbind()
            .map_err(|e| DirectoryError::Protocol(e.to_string()))
    }
}

/// Text and binary attribute values end up in the same map, as raw bytes.
fn directory_entry(entry: SearchEntry) -> DirectoryEntry {
    let mut attrs: HashMap<String, Vec<Vec<u8>>> = entry
        .attrs
        .into_iter()
        .map(|(name, values)| (name, values.into_iter().map(String::into_bytes).collect()))
        .collect();
    for (name, values) in entry.bin_attrs {
        attrs.entry(name).or_default().extend(values);
    }
    DirectoryEntry { dn: entry.dn, attrs }
}
