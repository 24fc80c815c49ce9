//! Placeholder substitution.
//!
//! Templates carry at most one kind of placeholder, [`TEMPLATE_PLACEHOLDER`]
//! (`<1>`), which may appear any number of times.

use roomsync_core::types::{GroupAccessRule, TEMPLATE_PLACEHOLDER};

use crate::error::RenderError;

/// `true` if `template` needs an argument to render.
pub fn has_placeholder(template: &str) -> bool {
    template.contains(TEMPLATE_PLACEHOLDER)
}

/// Replace every placeholder in `template` with `arg`.
///
/// An empty `arg` counts as absent: templates without a placeholder come back
/// unchanged, templates with one fail with
/// [`RenderError::MissingTemplateArgument`].
pub fn render(template: &str, arg: &str) -> Result<String, RenderError> {
    if !has_placeholder(template) {
        return Ok(template.to_owned());
    }
    if arg.is_empty() {
        return Err(RenderError::MissingTemplateArgument {
            template: template.to_owned(),
        });
    }
    Ok(template.replace(TEMPLATE_PLACEHOLDER, arg))
}

/// Render the group reference of every rule, in declaration order.
pub fn render_rules(
    rules: &[GroupAccessRule],
    arg: &str,
) -> Result<Vec<GroupAccessRule>, RenderError> {
    rules
        .iter()
        .map(|rule| {
            Ok(GroupAccessRule {
                group: render(&rule.group, arg)?,
                access_level: rule.access_level,
            })
        })
        .collect()
}
