//! Navigation system.
//!
//! Navigation items are collected from modules through the runtime, grouped
//! into menus, and handed to the rendering layer sorted and merged.

mod registry;
mod render;

use thiserror::Error;

pub use registry::NavigationRegistry;
pub use render::{RenderContext, render_items};

/// Structural problems found when validating navigation menus.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    /// An item asked for a section no module registered.
    #[error(
        "module '{module}': navigation item '{label}' in menu '{menu}' references section '{section}' which was never registered"
    )]
    UnresolvedSection {
        menu: String,
        label: String,
        section: String,
        module: String,
    },

    /// Two items of one menu carry the same id.
    #[error("navigation item id '{id}' is used more than once in menu '{menu}'")]
    DuplicateItemId { menu: String, id: String },
}
