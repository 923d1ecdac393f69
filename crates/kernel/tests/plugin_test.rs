#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Integration tests for plugins attached to the runtime.
//!
//! ## Test Coverage
//!
//! - Typed plugin lookup from module code
//! - Mock handlers collected in development mode only
//! - Plugin readiness reported by the runtime
//! - i18n instances registered by modules

mod common;

use std::sync::Arc;

use mosaic_i18n::{DEFAULT_NAMESPACE, I18nInstance, I18nPlugin};
use mosaic_kernel::{Runtime, RuntimeOptions};
use mosaic_mock::{Method, MockError, MockPlugin, RequestHandler};
use mosaic_sdk::types::RuntimeMode;
use mosaic_sdk::{ModuleRuntime, PluginError, RegisterModule};
use serde_json::{Value, json};

fn runtime_with(mode: RuntimeMode, mock: &Arc<MockPlugin>) -> Runtime {
    Runtime::new(
        RuntimeOptions::builder()
            .mode(mode)
            .plugin(Arc::clone(mock))
            .plugin(Arc::new(I18nPlugin::new(["en", "de"], "en").unwrap()))
            .build()
            .unwrap(),
    )
}

fn mocking_module() -> Arc<dyn RegisterModule> {
    let module = |runtime: &dyn ModuleRuntime, _: &Value| -> anyhow::Result<()> {
        mosaic_mock::register_request_handlers(
            runtime,
            [
                RequestHandler::get("/api/orders/:id", json!({"id": 1})),
                RequestHandler::post("/api/orders", json!({})).with_status(201),
            ],
        )?;
        Ok(())
    };
    Arc::new(module)
}

#[tokio::test]
async fn test_modules_register_mock_handlers_in_development() {
    let mock = Arc::new(MockPlugin::new());
    let runtime = runtime_with(RuntimeMode::Development, &mock);

    common::bootstrap(&runtime, vec![mocking_module()], vec![]).await;
    assert!(runtime.registration_errors().is_empty());
    assert_eq!(mock.request_handlers().len(), 2);

    // The host starts its mock server once modules are ready.
    assert!(!runtime.plugins_ready());
    assert!(mock.mark_started());
    assert!(runtime.plugins_ready());

    let response = mock.handle(Method::Get, "/api/orders/7").unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.body["id"], 1);
    assert_eq!(mock.handle(Method::Post, "/api/orders").unwrap().status, 201);
    assert!(mock.handle(Method::Delete, "/api/orders/7").is_none());

    assert_eq!(
        mock.register_request_handlers([RequestHandler::get("/late", json!({}))])
            .unwrap_err(),
        MockError::AlreadyStarted { count: 1 }
    );
}

#[tokio::test]
async fn test_mock_handlers_are_ignored_in_production() {
    let mock = Arc::new(MockPlugin::new());
    let runtime = runtime_with(RuntimeMode::Production, &mock);

    common::bootstrap(&runtime, vec![mocking_module()], vec![]).await;

    assert!(runtime.registration_errors().is_empty());
    assert!(mock.request_handlers().is_empty());
}

#[tokio::test]
async fn test_missing_plugin_fails_only_the_module_asking_for_it() {
    let runtime = Runtime::default();
    common::bootstrap(
        &runtime,
        vec![mocking_module(), mosaic_test_utils::test_module().into_module()],
        vec![],
    )
    .await;

    let errors = runtime.registration_errors();
    assert_eq!(errors.len(), 1);
    mosaic_test_utils::assert::contains(&errors[0].to_string(), "MockPlugin");
    assert!(runtime.is_ready());

    assert!(matches!(
        runtime.get_plugin::<MockPlugin>(),
        Err(PluginError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_modules_register_translations_with_the_i18n_plugin() {
    let mock = Arc::new(MockPlugin::new());
    let runtime = runtime_with(RuntimeMode::Development, &mock);

    let module = |runtime: &dyn ModuleRuntime, _: &Value| -> anyhow::Result<()> {
        let i18n = runtime.get_plugin::<I18nPlugin>()?;
        i18n.register_instance(
            "shop",
            I18nInstance::new()
                .with_resources("en", DEFAULT_NAMESPACE, [("greeting", "Hello {{name}}")])
                .with_resources("de", DEFAULT_NAMESPACE, [("greeting", "Hallo {{name}}")]),
        )?;
        Ok(())
    };
    let module: Arc<dyn RegisterModule> = Arc::new(module);
    common::bootstrap(&runtime, vec![module], vec![]).await;
    assert!(runtime.registration_errors().is_empty());

    let i18n = runtime.get_plugin::<I18nPlugin>().unwrap();
    assert_eq!(i18n.detect_language(&["de-AT", "en"]), "de");
    assert_eq!(
        i18n.translate("shop", "greeting", &json!({"name": "Ada"}))
            .unwrap(),
        "Hallo Ada"
    );
}

#[test]
fn test_plugins_attach_once_per_type() {
    let err = RuntimeOptions::builder()
        .plugin(Arc::new(MockPlugin::new()))
        .plugin(Arc::new(MockPlugin::new()))
        .build()
        .unwrap_err();
    assert!(matches!(err, PluginError::Duplicate { .. }));
}
