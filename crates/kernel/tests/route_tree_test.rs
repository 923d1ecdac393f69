#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Integration tests for the merged route tree.
//!
//! ## Test Coverage
//!
//! - Identical trees for every module arrival order
//! - Forward references to parents registered by later modules
//! - Validation errors: duplicate ids, unresolved parents, ambiguous paths
//! - Placeholders and hoisted routes

mod common;

use std::sync::Arc;

use mosaic_kernel::route::RouteError;
use mosaic_kernel::{Runtime, ValidationError};
use mosaic_sdk::RegisterModule;
use mosaic_sdk::types::{
    NavigationItem, NavigationOptions, ROOT_MENU_ID, RouteDefinition, RouteOptions,
};
use mosaic_test_utils::{TestModule, assert, test_module};

fn shell() -> TestModule {
    test_module()
        .with_route(
            RouteDefinition::layout()
                .id("shell")
                .component("RootLayout")
                .child(RouteDefinition::protected_routes()),
        )
        .with_route_options(RouteDefinition::public_routes(), RouteOptions::under_id("shell"))
        .with_item(NavigationItem::section("Admin").with_id("admin"))
}

fn shop() -> TestModule {
    test_module()
        .with_route(RouteDefinition::new("/shop").id("shop").component("ShopLayout"))
        .with_route_options(RouteDefinition::new("cart"), RouteOptions::under_id("shop"))
        .with_route(RouteDefinition::new("/login").public())
        .with_item(NavigationItem::link("Shop", "/shop").with_priority(10))
}

fn admin() -> TestModule {
    test_module()
        .with_route_options(RouteDefinition::new("orders"), RouteOptions::under_id("shop"))
        .with_route_options(RouteDefinition::new("/print"), RouteOptions::hoisted())
        .with_item_options(
            NavigationItem::link("Users", "/admin/users"),
            NavigationOptions::default().section("admin"),
        )
        .with_item(NavigationItem::link("Help", "/help").with_priority(-5))
}

/// Bootstrap the three modules, the `i`-th finishing after `delays[i]`
/// scheduler turns.
async fn tree_for(delays: &[usize]) -> (Vec<String>, Vec<String>) {
    let modules: Vec<Arc<dyn RegisterModule>> = [shell(), shop(), admin()]
        .into_iter()
        .zip(delays)
        .map(|(module, delay)| module.yielding(*delay).into_module())
        .collect();

    let runtime = Runtime::default();
    common::bootstrap(&runtime, modules, vec![]).await;
    runtime.validate_registrations().unwrap();

    let items = runtime.navigation_items(ROOT_MENU_ID);
    let mut nav = assert::labels(&items);
    if let Some(NavigationItem::Section(section)) = items.iter().find(|i| i.label() == "Admin") {
        nav.extend(assert::labels(&section.children));
    }
    (assert::outline(&runtime.routes()), nav)
}

#[tokio::test]
async fn test_tree_is_identical_for_every_arrival_order() {
    let expected = tree_for(&[0, 0, 0]).await;
    assert_eq!(
        expected.0,
        vec![
            "#shell",
            "  #__protected-routes__",
            "    #shop",
            "      cart",
            "      orders",
            "  #__public-routes__",
            "    /login",
            "/print",
        ]
    );
    assert_eq!(expected.1, vec!["Shop", "Admin", "Help", "Users"]);

    for order in common::permutations(3) {
        let delays: Vec<usize> = order.iter().map(|position| position * 2).collect();
        assert_eq!(tree_for(&delays).await, expected, "arrival order {order:?}");
    }
}

#[tokio::test]
async fn test_parent_registered_by_a_later_module_is_resolved() {
    let runtime = Runtime::default();
    let child = test_module().with_route_options(
        RouteDefinition::new("settings").id("settings"),
        RouteOptions::under_id("account"),
    );
    let parent = test_module()
        .yielding(2)
        .with_route(RouteDefinition::new("/account").id("account"));

    common::bootstrap(&runtime, vec![child.into_module(), parent.into_module()], vec![]).await;

    runtime.validate_registrations().unwrap();
    assert_eq!(
        assert::outline(&runtime.routes()),
        vec!["#account", "  #settings"]
    );
}

#[tokio::test]
async fn test_duplicate_route_ids_fail_validation_in_either_order() {
    for order in common::permutations(2) {
        let modules = [
            test_module().with_route(RouteDefinition::new("/home").id("home")),
            test_module().with_route(RouteDefinition::new("/start").id("home")),
        ];
        let delays = [order[0], order[1]];
        let modules: Vec<Arc<dyn RegisterModule>> = modules
            .into_iter()
            .zip(delays)
            .map(|(module, delay)| module.yielding(delay * 2).into_module())
            .collect();

        let runtime = Runtime::default();
        common::bootstrap(&runtime, modules, vec![]).await;

        let err = runtime.validate_registrations().unwrap_err();
        assert_eq!(
            err.route_errors(),
            &[RouteError::DuplicateRouteId {
                id: "home".into(),
                modules: vec!["local#0".into(), "local#1".into()],
            }],
            "arrival order {order:?}"
        );
    }
}

#[tokio::test]
async fn test_missing_parent_and_ambiguous_paths_are_reported_together() {
    let runtime = Runtime::default();
    common::bootstrap(
        &runtime,
        vec![
            test_module()
                .with_route_options(
                    RouteDefinition::new("reports"),
                    RouteOptions::under_id("analytics"),
                )
                .with_route(RouteDefinition::new("/about"))
                .into_module(),
        ],
        vec![(
            "marketing",
            test_module()
                .with_route(RouteDefinition::new("/about"))
                .into_module(),
        )],
    )
    .await;

    let err = runtime.validate_registrations().unwrap_err();
    let ValidationError::Invalid { routes, navigation } = &err else {
        panic!("expected invalid registrations, got {err}");
    };
    assert!(navigation.is_empty());
    assert!(routes.iter().any(|e| matches!(
        e,
        RouteError::UnresolvedParent { parent, .. } if parent == "#analytics"
    )));
    assert!(routes.iter().any(|e| matches!(
        e,
        RouteError::AmbiguousPath { path, modules, .. }
            if path == "/about" && modules == &vec!["local#0".to_string(), "remote:marketing".to_string()]
    )));
    assert::contains(&err.to_string(), "analytics");

    // The unresolved route stays out of the tree.
    assert_eq!(assert::outline(&runtime.routes()), vec!["/about", "/about"]);
}

#[tokio::test]
async fn test_same_path_with_distinct_ids_is_not_ambiguous() {
    let runtime = Runtime::default();
    common::bootstrap(
        &runtime,
        vec![
            test_module()
                .with_route(RouteDefinition::new("/about").id("about-a"))
                .into_module(),
            test_module()
                .with_route(RouteDefinition::new("/about").id("about-b"))
                .into_module(),
        ],
        vec![],
    )
    .await;

    runtime.validate_registrations().unwrap();
}

#[tokio::test]
async fn test_parent_can_be_named_by_path() {
    let runtime = Runtime::default();
    common::bootstrap(
        &runtime,
        vec![
            test_module()
                .with_route_options(
                    RouteDefinition::new("invoices"),
                    RouteOptions::under_path("/billing/"),
                )
                .into_module(),
            test_module()
                .with_route(RouteDefinition::new("/billing"))
                .into_module(),
        ],
        vec![],
    )
    .await;

    runtime.validate_registrations().unwrap();
    assert_eq!(
        assert::outline(&runtime.routes()),
        vec!["/billing", "  invoices"]
    );
}
