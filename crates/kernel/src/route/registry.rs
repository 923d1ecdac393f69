//! Route registry - collects route definitions from modules and materializes
//! the merged route tree.
//!
//! Routes live in an arena and point at their parent through [`NodeId`]s, so a
//! child can be registered before its parent and attached later. Parent
//! references are kept per target key; whenever a route with a matching id or
//! path arrives, every route waiting on that key is re-pointed.
//!
//! Siblings are ordered by the registering module's position in the bootstrap
//! list, then by registration order within that module. Modules finishing in a
//! different order therefore produce the same tree.

use std::collections::{HashMap, HashSet};
use std::fmt;

use mosaic_sdk::RegistrationError;
use mosaic_sdk::types::{
    ModuleId, PROTECTED_ROUTES_ID, PUBLIC_ROUTES_ID, RouteDefinition, RouteOptions,
};
use tracing::debug;

use super::RouteError;
use crate::registration::{RegistrationOrigin, RegistrationPhase};

/// Index of a route in the registry arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// How a route names its parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParentRef {
    Id(String),
    Path(String),
}

impl fmt::Display for ParentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "#{id}"),
            Self::Path(path) => f.write_str(path),
        }
    }
}

#[derive(Debug, Clone)]
enum Placement {
    /// Hoisted: always a root.
    Root,
    /// Under the placeholder matching the route's visibility, or a root.
    Ambient,
    /// Under the route matching the reference, once it exists.
    Reference(ParentRef),
    /// Declared inline as a child of another route.
    Nested(NodeId),
}

#[derive(Debug)]
struct RouteNode {
    /// The definition without its children; those are nodes of their own.
    route: RouteDefinition,
    origin: RegistrationOrigin,
    seq: u64,
    placement: Placement,
    /// Resolved parent for `Reference` and `Nested` placements.
    parent: Option<NodeId>,
    /// The node or one of its inline children is a placeholder.
    holds_placeholder: bool,
    removed: bool,
}

impl RouteNode {
    fn sort_key(&self) -> (&ModuleId, RegistrationPhase, u64) {
        (&self.origin.module, self.origin.phase, self.seq)
    }

    fn is_pending(&self) -> bool {
        matches!(self.placement, Placement::Reference(_)) && self.parent.is_none()
    }
}

/// Registry of all routes contributed by modules.
#[derive(Debug, Default)]
pub struct RouteRegistry {
    nodes: Vec<RouteNode>,
    by_id: HashMap<String, Vec<NodeId>>,
    by_path: HashMap<String, Vec<NodeId>>,
    /// Routes that named a parent, by the key they named.
    referrers: HashMap<ParentRef, Vec<NodeId>>,
    next_seq: u64,
}

impl RouteRegistry {
    /// Create an empty route registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route and its inline children.
    ///
    /// Rejects only option combinations that can never be valid; anything
    /// depending on other modules is reported by [`validate`](Self::validate).
    pub fn add_route(
        &mut self,
        route: RouteDefinition,
        options: RouteOptions,
        origin: RegistrationOrigin,
    ) -> Result<NodeId, RegistrationError> {
        let parent_ref = match (options.parent_id, options.parent_path) {
            (Some(_), Some(_)) => {
                return Err(RegistrationError::ConflictingParents {
                    module: origin.module.to_string(),
                    route: route.describe(),
                });
            }
            (Some(id), None) => Some(ParentRef::Id(id)),
            (None, Some(path)) => Some(ParentRef::Path(normalize_path(&path))),
            (None, None) => None,
        };

        let placement = match (options.hoist, parent_ref) {
            (true, Some(parent)) => {
                return Err(RegistrationError::HoistWithParent {
                    module: origin.module.to_string(),
                    route: route.describe(),
                    parent: parent.to_string(),
                });
            }
            (true, None) => Placement::Root,
            (false, Some(parent)) => Placement::Reference(parent),
            (false, None) => Placement::Ambient,
        };

        debug!(
            module = %origin.module,
            route = %route.describe(),
            ?placement,
            "registering route"
        );

        Ok(self.insert_tree(route, placement, &origin))
    }

    fn insert_tree(
        &mut self,
        mut route: RouteDefinition,
        placement: Placement,
        origin: &RegistrationOrigin,
    ) -> NodeId {
        let children = std::mem::take(&mut route.children);
        let holds_placeholder =
            is_placeholder(&route) || children.iter().any(subtree_has_placeholder);

        let id = NodeId(self.nodes.len());
        let parent = match &placement {
            Placement::Nested(parent) => Some(*parent),
            Placement::Reference(key) => {
                self.referrers.entry(key.clone()).or_default().push(id);
                None
            }
            Placement::Root | Placement::Ambient => None,
        };

        self.nodes.push(RouteNode {
            route,
            origin: origin.clone(),
            seq: self.next_seq,
            placement,
            parent,
            holds_placeholder,
            removed: false,
        });
        self.next_seq += 1;

        if let Placement::Reference(key) = &self.nodes[id.0].placement {
            let key = key.clone();
            self.nodes[id.0].parent = self.resolve(&key);
        }
        self.index(id);

        for child in children {
            self.insert_tree(child, Placement::Nested(id), origin);
        }

        id
    }

    /// Keys other routes can use to reference this node.
    fn keys_of(&self, id: NodeId) -> Vec<ParentRef> {
        let route = &self.nodes[id.0].route;
        let mut keys = Vec::with_capacity(2);
        if let Some(route_id) = &route.id {
            keys.push(ParentRef::Id(route_id.clone()));
        }
        if let Some(path) = &route.path {
            keys.push(ParentRef::Path(normalize_path(path)));
        }
        keys
    }

    fn index(&mut self, id: NodeId) {
        for key in self.keys_of(id) {
            match &key {
                ParentRef::Id(route_id) => {
                    self.by_id.entry(route_id.clone()).or_default().push(id);
                }
                ParentRef::Path(path) => {
                    self.by_path.entry(path.clone()).or_default().push(id);
                }
            }
            self.refresh_referrers(&key);
        }
    }

    /// Re-point every route waiting on `key` at its current target.
    fn refresh_referrers(&mut self, key: &ParentRef) {
        let target = self.resolve(key);
        let Some(referrers) = self.referrers.get(key) else {
            return;
        };
        for referrer in referrers {
            let node = &mut self.nodes[referrer.0];
            if node.parent != target {
                debug!(
                    route = %node.route.describe(),
                    parent = %key,
                    resolved = target.is_some(),
                    "parent reference updated"
                );
                node.parent = target;
            }
        }
    }

    /// The canonical target of a key: the earliest live route in bootstrap
    /// order carrying it.
    fn resolve(&self, key: &ParentRef) -> Option<NodeId> {
        let candidates = match key {
            ParentRef::Id(route_id) => self.by_id.get(route_id),
            ParentRef::Path(path) => self.by_path.get(path),
        }?;
        candidates
            .iter()
            .filter(|id| !self.nodes[id.0].removed)
            .min_by(|a, b| self.nodes[a.0].sort_key().cmp(&self.nodes[b.0].sort_key()))
            .copied()
    }

    fn ambient_parent(&self, node: &RouteNode) -> Option<NodeId> {
        if node.holds_placeholder {
            return None;
        }
        let placeholder = node.route.visibility.placeholder_id().to_string();
        self.resolve(&ParentRef::Id(placeholder))
    }

    /// Effective parent of a live node. `Err` when its reference is pending.
    fn effective_parent(&self, node: &RouteNode) -> Result<Option<NodeId>, ()> {
        match &node.placement {
            Placement::Root => Ok(None),
            Placement::Ambient => Ok(self.ambient_parent(node)),
            Placement::Reference(_) => node.parent.map(Some).ok_or(()),
            Placement::Nested(parent) => Ok(Some(*parent)),
        }
    }

    /// Roots and per-node child lists, each sorted canonically.
    fn child_lists(&self) -> (Vec<NodeId>, HashMap<NodeId, Vec<NodeId>>) {
        let mut roots = Vec::new();
        let mut children: HashMap<NodeId, Vec<NodeId>> = HashMap::new();

        for (index, node) in self.nodes.iter().enumerate() {
            if node.removed {
                continue;
            }
            match self.effective_parent(node) {
                Ok(None) => roots.push(NodeId(index)),
                Ok(Some(parent)) => children.entry(parent).or_default().push(NodeId(index)),
                Err(()) => {}
            }
        }

        let by_key = |a: &NodeId, b: &NodeId| {
            self.nodes[a.0]
                .sort_key()
                .cmp(&self.nodes[b.0].sort_key())
        };
        roots.sort_by(by_key);
        for list in children.values_mut() {
            list.sort_by(by_key);
        }
        (roots, children)
    }

    fn build(&self, id: NodeId, children: &HashMap<NodeId, Vec<NodeId>>) -> RouteDefinition {
        let mut route = self.nodes[id.0].route.clone();
        route.children = children
            .get(&id)
            .map(|kids| kids.iter().map(|kid| self.build(*kid, children)).collect())
            .unwrap_or_default();
        route
    }

    /// The merged route tree.
    ///
    /// Routes whose parent reference is still unresolved are left out until
    /// the parent is registered.
    pub fn routes(&self) -> Vec<RouteDefinition> {
        let (roots, children) = self.child_lists();
        roots
            .iter()
            .map(|root| self.build(*root, &children))
            .collect()
    }

    /// Check cross-module consistency. Meant to run once every module settled.
    pub fn validate(&self) -> Vec<RouteError> {
        let mut errors = Vec::new();

        let mut ids: Vec<_> = self.by_id.iter().collect();
        ids.sort_by(|a, b| a.0.cmp(b.0));
        for (route_id, nodes) in ids {
            let mut live: Vec<_> = nodes
                .iter()
                .map(|id| &self.nodes[id.0])
                .filter(|node| !node.removed)
                .collect();
            if live.len() > 1 {
                live.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
                errors.push(RouteError::DuplicateRouteId {
                    id: route_id.clone(),
                    modules: live.iter().map(|n| n.origin.module.to_string()).collect(),
                });
            }
        }

        for node in self.live_nodes() {
            if let (Placement::Reference(parent), None) = (&node.placement, node.parent) {
                errors.push(RouteError::UnresolvedParent {
                    module: node.origin.module.to_string(),
                    route: node.route.describe(),
                    parent: parent.to_string(),
                });
            }
        }

        let (roots, children) = self.child_lists();
        let mut reachable = HashSet::new();
        self.check_level(None, &roots, &children, &mut reachable, &mut errors);

        for (index, node) in self.nodes.iter().enumerate() {
            if node.removed || reachable.contains(&NodeId(index)) {
                continue;
            }
            if let Placement::Reference(parent) = &node.placement
                && self.in_cycle(NodeId(index))
            {
                errors.push(RouteError::CircularParent {
                    module: node.origin.module.to_string(),
                    route: node.route.describe(),
                    parent: parent.to_string(),
                });
            }
        }

        errors
    }

    fn check_level(
        &self,
        parent: Option<NodeId>,
        level: &[NodeId],
        children: &HashMap<NodeId, Vec<NodeId>>,
        reachable: &mut HashSet<NodeId>,
        errors: &mut Vec<RouteError>,
    ) {
        let mut by_path: Vec<(String, Vec<&RouteNode>)> = Vec::new();
        for id in level {
            reachable.insert(*id);
            let node = &self.nodes[id.0];
            let Some(path) = node.route.path.as_deref() else {
                continue;
            };
            let path = normalize_path(path);
            match by_path.iter_mut().find(|(p, _)| *p == path) {
                Some((_, group)) => group.push(node),
                None => by_path.push((path, vec![node])),
            }
        }

        for (path, group) in by_path {
            if group.len() > 1 && group.iter().any(|node| node.route.id.is_none()) {
                errors.push(RouteError::AmbiguousPath {
                    path,
                    parent: parent
                        .map(|p| self.nodes[p.0].route.describe())
                        .unwrap_or_else(|| "(root)".to_string()),
                    modules: group.iter().map(|n| n.origin.module.to_string()).collect(),
                });
            }
        }

        for id in level {
            if let Some(kids) = children.get(id) {
                self.check_level(Some(*id), kids, children, reachable, errors);
            }
        }
    }

    /// Whether following parents from `start` loops instead of reaching a
    /// root or a pending reference.
    fn in_cycle(&self, start: NodeId) -> bool {
        let mut current = start;
        for _ in 0..=self.nodes.len() {
            let node = &self.nodes[current.0];
            match self.effective_parent(node) {
                Ok(Some(parent)) if parent == start => return true,
                Ok(Some(parent)) => current = parent,
                Ok(None) | Err(()) => return false,
            }
        }
        false
    }

    /// Drop every route whose origin matches, e.g. a module's deferred routes
    /// before its deferred callback runs again.
    ///
    /// Routes referencing a dropped route become pending again.
    pub fn remove_where(&mut self, matches: impl Fn(&RegistrationOrigin) -> bool) -> usize {
        let mut removed = 0;
        for node in self.nodes.iter_mut().filter(|n| !n.removed) {
            if matches(&node.origin) {
                node.removed = true;
                removed += 1;
            }
        }
        if removed == 0 {
            return 0;
        }

        let keys: Vec<ParentRef> = self.referrers.keys().cloned().collect();
        for key in keys {
            self.refresh_referrers(&key);
        }
        debug!(removed, "routes removed");
        removed
    }

    fn live_nodes(&self) -> impl Iterator<Item = &RouteNode> {
        self.nodes.iter().filter(|node| !node.removed)
    }

    /// Routes still waiting on their parent, as `(route, parent)` labels.
    pub fn pending(&self) -> Vec<(String, String)> {
        self.live_nodes()
            .filter(|node| node.is_pending())
            .filter_map(|node| match &node.placement {
                Placement::Reference(parent) => Some((node.route.describe(), parent.to_string())),
                _ => None,
            })
            .collect()
    }

    /// Whether a live route carries `id`.
    pub fn contains_id(&self, id: &str) -> bool {
        self.resolve(&ParentRef::Id(id.to_string())).is_some()
    }

    /// Number of live routes, inline children included.
    pub fn len(&self) -> usize {
        self.live_nodes().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn is_placeholder(route: &RouteDefinition) -> bool {
    matches!(
        route.id.as_deref(),
        Some(PUBLIC_ROUTES_ID) | Some(PROTECTED_ROUTES_ID)
    )
}

fn subtree_has_placeholder(route: &RouteDefinition) -> bool {
    is_placeholder(route) || route.children.iter().any(subtree_has_placeholder)
}

/// Trim whitespace and any trailing slash, keeping "/" itself.
fn normalize_path(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.len() > 1 {
        trimmed.trim_end_matches('/').to_string()
    } else {
        trimmed.to_string()
    }
}
