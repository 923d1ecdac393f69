//! Route system.
//!
//! Routes are collected from modules through the runtime and provide the
//! merged route tree the rendering layer turns into a router.

mod registry;

use thiserror::Error;

pub use registry::{NodeId, ParentRef, RouteRegistry};

/// Structural problems found when validating the route tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// More than one route carries the same id.
    #[error("route id '{id}' is registered more than once (by {})", .modules.join(", "))]
    DuplicateRouteId { id: String, modules: Vec<String> },

    /// A parent reference never matched a registered route.
    #[error(
        "module '{module}': route '{route}' references parent '{parent}' which was never registered"
    )]
    UnresolvedParent {
        module: String,
        route: String,
        parent: String,
    },

    /// Two routes at the same level share a path and cannot be told apart.
    #[error(
        "path '{path}' is registered more than once under {parent} (by {}); give each route a distinct id",
        .modules.join(", ")
    )]
    AmbiguousPath {
        path: String,
        parent: String,
        modules: Vec<String>,
    },

    /// Parent references form a loop.
    #[error("module '{module}': route '{route}' is part of a parent cycle through '{parent}'")]
    CircularParent {
        module: String,
        route: String,
        parent: String,
    },
}
