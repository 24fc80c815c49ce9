//! YAML configuration file.
//!
//! # Storage layout
//!
//! ```text
//! ~/.roomsync/
//!   config.yaml
//! ```
//!
//! # API pattern
//!
//! - `load_at(path)`: explicit path; used in tests with `TempDir`
//! - `load()`: derives the path from `dirs::home_dir()`, delegates to `load_at`
//!
//! Both run [`validate`] after parsing, so a returned [`Config`] is always
//! structurally usable. Room-level template problems and malformed static
//! members are left for sync time, where they are reported against the room.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::error::ConfigError;
use crate::types::{Config, RoomAlias, TEMPLATE_PLACEHOLDER};

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.roomsync/config.yaml`. Pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".roomsync").join("config.yaml")
}

/// `<home>/.roomsync/config.yaml` (convenience, uses `dirs::home_dir()`).
pub fn default_path() -> Result<PathBuf, ConfigError> {
    Ok(config_path_at(&home()?))
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Parse a config file without validating it.
pub fn parse_at(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound { path: path.to_path_buf() });
    }
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load and validate the config file at `path`.
///
/// Returns `ConfigError::NotFound` if absent, `ConfigError::Parse` (with path
/// and line context) if malformed YAML, `ConfigError::Invalid` listing every
/// validation failure otherwise.
pub fn load_at(path: &Path) -> Result<Config, ConfigError> {
    let config = parse_at(path)?;
    validate(&config).map_err(|errors| ConfigError::Invalid {
        path: path.to_path_buf(),
        errors,
    })?;
    Ok(config)
}

/// `load_at(default_path())` convenience wrapper.
pub fn load() -> Result<Config, ConfigError> {
    load_at(&default_path()?)
}

// ---------------------------------------------------------------------------
// 3. Validation
// ---------------------------------------------------------------------------

/// Validation errors for configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("homeserver.url is required")]
    MissingHomeserverUrl,
    #[error("homeserver.url must start with http:// or https://, got '{0}'")]
    InvalidHomeserverUrl(String),
    #[error("homeserver.access_token is required")]
    MissingAccessToken,
    #[error("homeserver.timeout_secs must be greater than 0")]
    ZeroTimeout,
    #[error("ldap.{0} is required")]
    MissingLdapField(&'static str),
    #[error("admin_users entry '{0}' is not a valid user id")]
    InvalidAdmin(String),
    #[error("sync_rooms is empty")]
    NoRooms,
    #[error("sync_rooms[{index}].alias '{alias}' must look like #name:server")]
    InvalidAlias { index: usize, alias: String },
    #[error("sync_rooms[{index}].alias '{alias}' is declared more than once")]
    DuplicateAlias { index: usize, alias: String },
    #[error("sync_rooms[{index}].ldap_members[{rule}].ldap_group is empty")]
    EmptyGroup { index: usize, rule: usize },
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let url = config.homeserver.url.trim();
    if url.is_empty() {
        errors.push(ValidationError::MissingHomeserverUrl);
    } else if !(url.starts_with("http://") || url.starts_with("https://")) {
        errors.push(ValidationError::InvalidHomeserverUrl(url.to_owned()));
    }
    if config.homeserver.access_token.is_empty() {
        errors.push(ValidationError::MissingAccessToken);
    }
    if config.homeserver.timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    let ldap = &config.ldap;
    for (name, value) in [
        ("uri", &ldap.uri),
        ("base_dn", &ldap.base_dn),
        ("user_filter", &ldap.user_filter),
        ("mxid_homeserver", &ldap.mxid_homeserver),
    ] {
        if value.trim().is_empty() {
            errors.push(ValidationError::MissingLdapField(name));
        }
    }

    for admin in &config.admin_users {
        if !admin.is_well_formed() {
            errors.push(ValidationError::InvalidAdmin(admin.0.clone()));
        }
    }

    if config.sync_rooms.is_empty() {
        errors.push(ValidationError::NoRooms);
    }

    let mut seen = HashSet::new();
    for (index, room) in config.sync_rooms.iter().enumerate() {
        // Substitute a dummy argument so templated aliases can be shape-checked.
        let sample = RoomAlias::from(room.alias_template.replace(TEMPLATE_PLACEHOLDER, "x"));
        if !sample.is_well_formed() {
            errors.push(ValidationError::InvalidAlias {
                index,
                alias: room.alias_template.clone(),
            });
        }
        if !seen.insert(room.alias_template.as_str()) {
            errors.push(ValidationError::DuplicateAlias {
                index,
                alias: room.alias_template.clone(),
            });
        }
        for (rule, group) in room.group_rules.iter().enumerate() {
            if group.group.trim().is_empty() {
                errors.push(ValidationError::EmptyGroup { index, rule });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
