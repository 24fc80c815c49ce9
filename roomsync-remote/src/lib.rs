//! # roomsync-remote
//!
//! Network-backed implementations of the collaborator traits in
//! `roomsync-core`:
//!
//! - [`MatrixClient`] speaks the Matrix client-server API over HTTP.
//! - [`LdapConnector`] opens simple-bound LDAP sessions.

pub mod ldap;
pub mod matrix;

pub use ldap::{LdapConnector, LdapSession};
pub use matrix::MatrixClient;
