//! # roomsync-renderer
//!
//! Resolves the single runtime template argument into room aliases, display
//! names and directory group references.
//!
//! ## Usage
//!
//! ```rust
//! use roomsync_renderer::render;
//!
//! assert_eq!(render("#team-<1>:example.org", "eu").unwrap(), "#team-eu:example.org");
//! assert!(render("#team-<1>:example.org", "").is_err());
//! assert_eq!(render("#team:example.org", "").unwrap(), "#team:example.org");
//! ```

pub mod context;
pub mod error;
pub mod template;

pub use context::RenderedRoom;
pub use error::RenderError;
pub use template::{has_placeholder, render, render_rules};
