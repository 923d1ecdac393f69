//! Core types exchanged between modules and the kernel.
//!
//! Modules describe what they contribute (routes, navigation items) with the
//! plain data types below; the kernel decides where and when they become
//! visible to the rendering layer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Id of the placeholder route under which public routes are nested.
pub const PUBLIC_ROUTES_ID: &str = "__public-routes__";

/// Id of the placeholder route under which protected routes are nested.
pub const PROTECTED_ROUTES_ID: &str = "__protected-routes__";

/// Menu used when a navigation item does not name one.
pub const ROOT_MENU_ID: &str = "root";

/// Whether a route requires an authenticated session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteVisibility {
    Public,
    #[default]
    Protected,
}

impl RouteVisibility {
    /// Id of the placeholder route this visibility nests under.
    pub fn placeholder_id(self) -> &'static str {
        match self {
            Self::Public => PUBLIC_ROUTES_ID,
            Self::Protected => PROTECTED_ROUTES_ID,
        }
    }
}

/// Opaque reference to what a route renders.
///
/// The kernel never interprets these keys; the rendering layer maps them to
/// components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "key", rename_all = "lowercase")]
pub enum RouteElement {
    /// Rendered eagerly.
    Component(String),
    /// Loaded on first match.
    Lazy(String),
}

/// A route contributed by a module.
///
/// The same type is used for the materialized tree returned by the kernel,
/// in which case `children` holds the resolved child routes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RouteDefinition {
    /// Path segment or absolute path. `None` for layout and index routes.
    #[serde(default)]
    pub path: Option<String>,
    /// Name other routes can reference as a parent.
    #[serde(default)]
    pub id: Option<String>,
    /// Index route of its parent.
    #[serde(default)]
    pub index: bool,
    #[serde(default)]
    pub element: Option<RouteElement>,
    #[serde(default)]
    pub visibility: RouteVisibility,
    #[serde(default)]
    pub children: Vec<RouteDefinition>,
}

impl RouteDefinition {
    /// Create a route matching `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Create an index route.
    pub fn index() -> Self {
        Self {
            index: true,
            ..Self::default()
        }
    }

    /// Create a pathless layout route.
    pub fn layout() -> Self {
        Self::default()
    }

    /// Placeholder route that collects public routes.
    pub fn public_routes() -> Self {
        Self::layout()
            .id(PUBLIC_ROUTES_ID)
            .visibility(RouteVisibility::Public)
    }

    /// Placeholder route that collects protected routes.
    pub fn protected_routes() -> Self {
        Self::layout().id(PROTECTED_ROUTES_ID)
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn component(mut self, key: impl Into<String>) -> Self {
        self.element = Some(RouteElement::Component(key.into()));
        self
    }

    pub fn lazy(mut self, key: impl Into<String>) -> Self {
        self.element = Some(RouteElement::Lazy(key.into()));
        self
    }

    pub fn visibility(mut self, visibility: RouteVisibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn public(self) -> Self {
        self.visibility(RouteVisibility::Public)
    }

    pub fn child(mut self, child: RouteDefinition) -> Self {
        self.children.push(child);
        self
    }

    /// Human-readable label for log and error messages.
    pub fn describe(&self) -> String {
        match (&self.id, &self.path) {
            (Some(id), _) => format!("#{id}"),
            (None, Some(path)) => path.clone(),
            (None, None) if self.index => "(index)".to_string(),
            (None, None) => "(layout)".to_string(),
        }
    }
}

/// Options for placing a route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteOptions {
    /// Attach at the tree root, outside the shared layouts.
    pub hoist: bool,
    /// Nest under the route registered with this id.
    pub parent_id: Option<String>,
    /// Nest under the route registered with this path.
    pub parent_path: Option<String>,
}

impl RouteOptions {
    pub fn hoisted() -> Self {
        Self {
            hoist: true,
            ..Self::default()
        }
    }

    pub fn under_id(id: impl Into<String>) -> Self {
        Self {
            parent_id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn under_path(path: impl Into<String>) -> Self {
        Self {
            parent_path: Some(path.into()),
            ..Self::default()
        }
    }
}

/// A navigation link pointing at a route.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NavigationLink {
    pub label: String,
    pub to: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub id: Option<String>,
    /// Render-time properties passed through untouched.
    #[serde(default)]
    pub additional_props: serde_json::Map<String, serde_json::Value>,
}

/// A group of navigation items.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NavigationSection {
    pub label: String,
    #[serde(default)]
    pub priority: i32,
    /// Id other modules can reference to add items to this section.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub children: Vec<NavigationItem>,
    #[serde(default)]
    pub additional_props: serde_json::Map<String, serde_json::Value>,
}

/// An entry of a navigation menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NavigationItem {
    Link(NavigationLink),
    Section(NavigationSection),
}

impl NavigationItem {
    /// Create a link item.
    pub fn link(label: impl Into<String>, to: impl Into<String>) -> Self {
        Self::Link(NavigationLink {
            label: label.into(),
            to: to.into(),
            ..NavigationLink::default()
        })
    }

    /// Create an empty section.
    pub fn section(label: impl Into<String>) -> Self {
        Self::Section(NavigationSection {
            label: label.into(),
            ..NavigationSection::default()
        })
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Link(link) => &link.label,
            Self::Section(section) => &section.label,
        }
    }

    pub fn priority(&self) -> i32 {
        match self {
            Self::Link(link) => link.priority,
            Self::Section(section) => section.priority,
        }
    }

    pub fn item_id(&self) -> Option<&str> {
        match self {
            Self::Link(link) => link.id.as_deref(),
            Self::Section(section) => section.id.as_deref(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        match &mut self {
            Self::Link(link) => link.priority = priority,
            Self::Section(section) => section.priority = priority,
        }
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        let id = Some(id.into());
        match &mut self {
            Self::Link(link) => link.id = id,
            Self::Section(section) => section.id = id,
        }
        self
    }

    pub fn with_prop(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        let props = match &mut self {
            Self::Link(link) => &mut link.additional_props,
            Self::Section(section) => &mut section.additional_props,
        };
        props.insert(key.into(), value);
        self
    }

    /// Append a child. Links are turned into sections holding the child.
    pub fn with_child(self, child: NavigationItem) -> Self {
        match self {
            Self::Section(mut section) => {
                section.children.push(child);
                Self::Section(section)
            }
            Self::Link(link) => Self::Section(NavigationSection {
                label: link.label,
                priority: link.priority,
                id: link.id,
                children: vec![child],
                additional_props: link.additional_props,
            }),
        }
    }
}

/// Options for placing a navigation item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationOptions {
    /// Menu to add to; the root menu when `None`.
    pub menu_id: Option<String>,
    /// Nest under the section registered with this id.
    pub section_id: Option<String>,
}

impl NavigationOptions {
    pub fn menu(menu_id: impl Into<String>) -> Self {
        Self {
            menu_id: Some(menu_id.into()),
            section_id: None,
        }
    }

    pub fn section(mut self, section_id: impl Into<String>) -> Self {
        self.section_id = Some(section_id.into());
        self
    }

    /// The effective menu id.
    pub fn menu_id(&self) -> &str {
        self.menu_id.as_deref().unwrap_or(ROOT_MENU_ID)
    }
}

/// Where a module comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleClass {
    /// Built and bundled with the host.
    Local,
    /// Loaded at runtime from a federated remote.
    Remote,
}

impl fmt::Display for ModuleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Remote => f.write_str("remote"),
        }
    }
}

/// Identity of a module within one runtime.
///
/// Ordering is by class, then by position in the bootstrap list. The name
/// only labels the module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleId {
    pub class: ModuleClass,
    pub index: usize,
    pub name: Option<String>,
}

impl ModuleId {
    pub fn local(index: usize) -> Self {
        Self {
            class: ModuleClass::Local,
            index,
            name: None,
        }
    }

    pub fn remote(index: usize, name: impl Into<String>) -> Self {
        Self {
            class: ModuleClass::Remote,
            index,
            name: Some(name.into()),
        }
    }
}

impl PartialOrd for ModuleId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ModuleId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.class, self.index).cmp(&(other.class, other.index))
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}:{name}", self.class),
            None => write!(f, "{}#{}", self.class, self.index),
        }
    }
}

/// Environment the application runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    #[default]
    Development,
    Production,
}

impl std::str::FromStr for RuntimeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!(
                "unknown runtime mode '{other}', expected 'development' or 'production'"
            )),
        }
    }
}

/// Why a deferred callback is being invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeferredOperation {
    /// First invocation, once global data is available.
    Register,
    /// Global data changed after the first invocation.
    Update,
}
