//! Error types for roomsync-renderer.

use thiserror::Error;

/// All errors that can arise from template rendering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The template contains the placeholder but no argument was supplied.
    #[error("template \"{template}\" includes a placeholder, but no argument was provided")]
    MissingTemplateArgument { template: String },

    /// The rendered alias is not of the form `#name:server`.
    #[error("rendered alias \"{alias}\" must look like #name:server")]
    InvalidAlias { alias: String },
}
