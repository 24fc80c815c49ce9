//! [`RenderedRoom`]: a [`RoomSpec`] with every template resolved.

use serde::Serialize;

use roomsync_core::types::{GroupAccessRule, RoomAlias, RoomSpec, StaticMember, Visibility};

use crate::error::RenderError;
use crate::template::{render, render_rules};

/// A room declaration ready for reconciliation.
///
/// Built all-or-nothing: if any template of the declaration fails to render, no
/// `RenderedRoom` exists and nothing has touched the network yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedRoom {
    pub alias: RoomAlias,
    pub display_name: String,
    pub visibility: Visibility,
    pub group_rules: Vec<GroupAccessRule>,
    pub static_members: Vec<StaticMember>,
}

impl RenderedRoom {
    pub fn render(spec: &RoomSpec, arg: &str) -> Result<Self, RenderError> {
        let alias = RoomAlias::from(render(&spec.alias_template, arg)?);
        if !alias.is_well_formed() {
            return Err(RenderError::InvalidAlias { alias: alias.0 });
        }
        Ok(RenderedRoom {
            alias,
            display_name: render(&spec.display_name, arg)?,
            visibility: spec.visibility,
            group_rules: render_rules(&spec.group_rules, arg)?,
            static_members: spec.static_members.clone(),
        })
    }
}
