#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! Tests drive the real kernel through its public bootstrap functions; the
//! modules themselves are scripted with `mosaic-test-utils`.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use mosaic_kernel::registration::{RemoteDefinition, RemoteModuleLoader};
use mosaic_kernel::{Runtime, register_local_modules, register_remote_modules};
use mosaic_sdk::RegisterModule;
use mosaic_test_utils::StaticRemoteLoader;
use serde_json::{Value, json};

/// Remote loader backed by in-memory modules.
pub struct TestLoader(pub StaticRemoteLoader);

#[async_trait]
impl RemoteModuleLoader for TestLoader {
    async fn load(&self, remote: &RemoteDefinition) -> anyhow::Result<Arc<dyn RegisterModule>> {
        tokio::task::yield_now().await;
        self.0.get(&remote.name)
    }
}

/// Context passed to every module in tests.
pub fn context() -> Value {
    json!({ "app": "mosaic-tests" })
}

/// Bootstrap local modules and named remotes, both classes settling.
pub async fn bootstrap(
    runtime: &Runtime,
    locals: Vec<Arc<dyn RegisterModule>>,
    remotes: Vec<(&str, Arc<dyn RegisterModule>)>,
) {
    let definitions: Vec<RemoteDefinition> = remotes
        .iter()
        .map(|(name, _)| RemoteDefinition::new(*name))
        .collect();
    let loader = TestLoader(
        remotes
            .into_iter()
            .fold(StaticRemoteLoader::new(), |loader, (name, module)| {
                loader.with_remote(name, module)
            }),
    );

    register_local_modules(runtime, locals, &context())
        .await
        .unwrap();
    register_remote_modules(runtime, &definitions, &loader, &context())
        .await
        .unwrap();
}

/// All permutations of `0..n`, for order-independence checks.
pub fn permutations(n: usize) -> Vec<Vec<usize>> {
    fn go(prefix: &mut Vec<usize>, rest: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        if rest.is_empty() {
            out.push(prefix.clone());
            return;
        }
        for i in 0..rest.len() {
            let item = rest.remove(i);
            prefix.push(item);
            go(prefix, rest, out);
            prefix.pop();
            rest.insert(i, item);
        }
    }
    let mut out = Vec::new();
    go(&mut Vec::new(), &mut (0..n).collect(), &mut out);
    out
}
