#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Integration tests for navigation menus.
//!
//! ## Test Coverage
//!
//! - Priority ordering across modules
//! - Identical menus for every module arrival order
//! - Sections extended by other modules
//! - Named menus
//! - Rendering through caller-supplied functions
//! - Navigation validation errors

mod common;

use std::sync::Arc;

use mosaic_kernel::navigation::{NavigationError, render_items};
use mosaic_kernel::{Runtime, ValidationError};
use mosaic_sdk::RegisterModule;
use mosaic_sdk::types::{NavigationItem, NavigationOptions, ROOT_MENU_ID};
use mosaic_test_utils::{assert, test_module};

#[tokio::test]
async fn test_priorities_order_items_across_modules() {
    let runtime = Runtime::default();
    common::bootstrap(
        &runtime,
        vec![
            test_module()
                .with_item(NavigationItem::link("A", "/a"))
                .into_module(),
            test_module()
                .yielding(2)
                .with_item(NavigationItem::link("B", "/b").with_priority(999))
                .into_module(),
        ],
        vec![(
            "reports",
            test_module()
                .with_item(NavigationItem::link("C", "/c"))
                .into_module(),
        )],
    )
    .await;

    assert_eq!(
        assert::labels(&runtime.navigation_items(ROOT_MENU_ID)),
        vec!["B", "A", "C"]
    );
}

/// Root labels and the children of the "Tools" section for one arrival order.
async fn menu_for(delays: &[usize]) -> (Vec<String>, Vec<String>) {
    let modules = [
        test_module()
            .with_item(NavigationItem::link("A", "/a"))
            .with_item_options(
                NavigationItem::link("Tool A", "/tools/a"),
                NavigationOptions::default().section("tools"),
            ),
        test_module()
            .with_item(NavigationItem::section("Tools").with_id("tools"))
            .with_item(NavigationItem::link("B", "/b")),
        test_module()
            .with_item(NavigationItem::link("C", "/c"))
            .with_item_options(
                NavigationItem::link("Tool C", "/tools/c"),
                NavigationOptions::default().section("tools"),
            ),
    ];
    let modules: Vec<Arc<dyn RegisterModule>> = modules
        .into_iter()
        .zip(delays)
        .map(|(module, delay)| module.yielding(*delay).into_module())
        .collect();

    let runtime = Runtime::default();
    common::bootstrap(&runtime, modules, vec![]).await;
    runtime.validate_registrations().unwrap();

    let items = runtime.navigation_items(ROOT_MENU_ID);
    let tools = items
        .iter()
        .find_map(|item| match item {
            NavigationItem::Section(section) if section.label == "Tools" => {
                Some(assert::labels(&section.children))
            }
            _ => None,
        })
        .unwrap();
    (assert::labels(&items), tools)
}

#[tokio::test]
async fn test_equal_priorities_are_ordered_by_module_for_every_arrival_order() {
    let expected = menu_for(&[0, 0, 0]).await;
    assert_eq!(expected.0, vec!["A", "Tools", "B", "C"]);
    assert_eq!(expected.1, vec!["Tool A", "Tool C"]);

    for order in common::permutations(3) {
        let delays: Vec<usize> = order.iter().map(|position| position * 2).collect();
        assert_eq!(menu_for(&delays).await, expected, "arrival order {order:?}");
    }
}

#[tokio::test]
async fn test_sections_collect_items_from_other_modules() {
    let runtime = Runtime::default();
    common::bootstrap(
        &runtime,
        vec![
            test_module()
                .with_item_options(
                    NavigationItem::link("Invoices", "/billing/invoices"),
                    NavigationOptions::default().section("billing"),
                )
                .into_module(),
            test_module()
                .yielding(2)
                .with_item(
                    NavigationItem::section("Billing")
                        .with_id("billing")
                        .with_child(NavigationItem::link("Plans", "/billing/plans")),
                )
                .with_item_options(
                    NavigationItem::link("Overview", "/billing").with_priority(100),
                    NavigationOptions::default().section("billing"),
                )
                .into_module(),
        ],
        vec![],
    )
    .await;
    runtime.validate_registrations().unwrap();

    let items = runtime.navigation_items(ROOT_MENU_ID);
    assert_eq!(assert::labels(&items), vec!["Billing"]);
    let NavigationItem::Section(billing) = &items[0] else {
        panic!("expected a section, got {:?}", items[0]);
    };
    assert_eq!(
        assert::labels(&billing.children),
        vec!["Overview", "Plans", "Invoices"]
    );
}

#[tokio::test]
async fn test_named_menus_are_kept_apart() {
    let runtime = Runtime::default();
    common::bootstrap(
        &runtime,
        vec![
            test_module()
                .with_item(NavigationItem::link("Home", "/"))
                .with_item_options(
                    NavigationItem::link("Profile", "/me"),
                    NavigationOptions::menu("user"),
                )
                .with_item_options(
                    NavigationItem::link("Sign out", "/logout").with_priority(-100),
                    NavigationOptions::menu("user"),
                )
                .into_module(),
        ],
        vec![],
    )
    .await;

    assert_eq!(runtime.menu_ids(), vec!["root".to_string(), "user".to_string()]);
    assert_eq!(
        assert::labels(&runtime.navigation_items("user")),
        vec!["Profile", "Sign out"]
    );
    assert_eq!(
        assert::labels(&runtime.navigation_items(ROOT_MENU_ID)),
        vec!["Home"]
    );
    assert!(runtime.navigation_items("footer").is_empty());
}

#[tokio::test]
async fn test_menus_render_through_caller_functions() {
    let runtime = Runtime::default();
    common::bootstrap(
        &runtime,
        vec![
            test_module()
                .with_item(NavigationItem::link("Home", "/").with_priority(10))
                .with_item(
                    NavigationItem::section("Admin")
                        .with_child(NavigationItem::link("Users", "/admin/users")),
                )
                .into_module(),
        ],
        vec![],
    )
    .await;

    let rendered = render_items(
        &runtime.navigation_items(ROOT_MENU_ID),
        |link, ctx| format!("{}:{}@{}", ctx.level, link.label, link.to),
        |section, children, ctx| format!("{}:{}[{}]", ctx.level, section.label, children.join(" ")),
    );
    assert_eq!(
        rendered,
        vec!["0:Home@/", "0:Admin[1:Users@/admin/users]"]
    );
}

#[tokio::test]
async fn test_missing_sections_fail_validation() {
    let runtime = Runtime::default();
    common::bootstrap(
        &runtime,
        vec![
            test_module()
                .with_item(NavigationItem::link("Home", "/"))
                .with_item_options(
                    NavigationItem::link("Audit", "/audit"),
                    NavigationOptions::default().section("security"),
                )
                .into_module(),
        ],
        vec![],
    )
    .await;

    let err = runtime.validate_registrations().unwrap_err();
    let ValidationError::Invalid { routes, navigation } = &err else {
        panic!("expected invalid registrations, got {err}");
    };
    assert!(routes.is_empty());
    assert_eq!(
        navigation,
        &vec![NavigationError::UnresolvedSection {
            menu: ROOT_MENU_ID.into(),
            label: "Audit".into(),
            section: "security".into(),
            module: "local#0".into(),
        }]
    );

    // The orphaned item is not rendered.
    assert_eq!(
        assert::labels(&runtime.navigation_items(ROOT_MENU_ID)),
        vec!["Home"]
    );
}
