//! End-to-end registry tests: catalog load, reconciliation, installation,
//! and menu derivation through the public `ModuleManager` surface.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use simhub_core::domain::meta::{ViewMeta, ViewRef};
use simhub_core::domain::module::RawModuleItem;
use simhub_shell::infrastructure::config_client::{ConfigFetcher, FetchError};
use simhub_shell::{MenuEntry, ModuleImplementation, ModuleManager, RouteDef, RouteTable};

/// Catalog source with a scripted sequence of results, one per call.
struct ScriptedFetcher {
    results: Mutex<Vec<Result<Vec<serde_json::Value>, FetchError>>>,
}

impl ScriptedFetcher {
    fn new(results: Vec<Result<Vec<serde_json::Value>, FetchError>>) -> Self {
        Self {
            results: Mutex::new(results),
        }
    }

    fn once(items: Vec<serde_json::Value>) -> Self {
        Self::new(vec![Ok(items)])
    }
}

#[async_trait]
impl ConfigFetcher for ScriptedFetcher {
    async fn fetch_catalog(&self) -> Result<Vec<RawModuleItem>, FetchError> {
        let next = self.results.lock().unwrap().remove(0);
        next.map(|items| {
            items
                .into_iter()
                .map(|v| serde_json::from_value(v).expect("test catalog entry"))
                .collect()
        })
    }
}

fn model_implementation() -> ModuleImplementation {
    ModuleImplementation {
        key: "model".to_string(),
        label: "Models".to_string(),
        icon: Some("Folder".to_string()),
        routes: vec![RouteDef {
            path: "/model".to_string(),
            target: "model-list".to_string(),
            props: json!({"supported_views": ["table"]}),
        }],
        menu: Some(MenuEntry {
            key: "model".to_string(),
            label: "Models".to_string(),
            icon: Some("Folder".to_string()),
            path: "/model".to_string(),
        }),
    }
}

#[tokio::test]
async fn test_unmatched_internal_entry_yields_res_route() {
    // Arrange
    let manager = ModuleManager::new(false);
    let fetcher = ScriptedFetcher::once(vec![
        json!({"type_key": "scenario", "type_name": "Scenario", "integration_mode": "internal"}),
    ]);

    // Act
    manager.load_config(&fetcher).await.unwrap();

    // Assert
    let active = manager.active_modules();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].routes.len(), 1);
    assert_eq!(active[0].routes[0].path, "/res/scenario");
}

#[tokio::test]
async fn test_matched_entry_takes_server_label_with_compiled_fallback() {
    // Arrange
    let manager = ModuleManager::new(false);
    manager.register_implementation(model_implementation());

    // Act: server supplies its own label.
    let fetcher = ScriptedFetcher::once(vec![json!({"type_key": "model", "type_name": "3D Assets"})]);
    manager.load_config(&fetcher).await.unwrap();

    // Assert
    let menus = manager.menus();
    assert_eq!(menus[0].label, "3D Assets");

    // Act: server label empty falls back to the compiled one.
    let fetcher = ScriptedFetcher::once(vec![json!({"type_key": "model", "type_name": ""})]);
    manager.load_config(&fetcher).await.unwrap();

    // Assert
    assert_eq!(manager.menus()[0].label, "Models");
}

#[tokio::test]
async fn test_reload_replaces_rather_than_merges() {
    // Arrange
    let manager = ModuleManager::new(false);
    let fetcher = ScriptedFetcher::new(vec![
        Ok(vec![
            json!({"type_key": "model", "type_name": "Model"}),
            json!({"type_key": "terrain", "type_name": "Terrain"}),
        ]),
        Ok(vec![json!({"type_key": "scenario", "type_name": "Scenario"})]),
    ]);

    // Act
    manager.load_config(&fetcher).await.unwrap();
    manager.load_config(&fetcher).await.unwrap();

    // Assert: only the second catalog remains.
    let keys: Vec<String> = manager
        .active_modules()
        .iter()
        .map(|m| m.descriptor.key.clone())
        .collect();
    assert_eq!(keys, vec!["scenario"]);
}

#[tokio::test]
async fn test_failed_reload_keeps_prior_catalog_observable() {
    // Arrange
    let manager = ModuleManager::new(false);
    let fetcher = ScriptedFetcher::new(vec![
        Ok(vec![json!({"type_key": "model", "type_name": "Model"})]),
        Err(FetchError::Status { status: 502 }),
    ]);
    manager.load_config(&fetcher).await.unwrap();

    // Act
    let result = manager.load_config(&fetcher).await;

    // Assert
    assert!(result.is_err());
    assert_eq!(manager.active_modules().len(), 1);
    assert_eq!(manager.active_modules()[0].descriptor.key, "model");
}

#[tokio::test]
async fn test_registry_replacement_is_visible_through_resolution() {
    // Arrange
    let manager = ModuleManager::new(false);
    manager.register_view(ViewMeta {
        key: "table".to_string(),
        label: "Table".to_string(),
        icon: Some("Grid".to_string()),
    });
    manager.register_view(ViewMeta {
        key: "table".to_string(),
        label: "Spreadsheet".to_string(),
        icon: Some("Sheet".to_string()),
    });

    // Act
    let resolved = manager.resolve_view(&ViewRef::Key("table".to_string()));

    // Assert: the later registration won.
    assert_eq!(resolved.label, "Spreadsheet");
}

#[tokio::test]
async fn test_unknown_view_resolution_is_structurally_complete() {
    let manager = ModuleManager::new(false);
    let resolved = manager.resolve_view(&ViewRef::Key("unknown-key".to_string()));
    assert_eq!(resolved.key, "unknown-key");
    assert_eq!(resolved.label, "unknown-key");
    assert!(resolved.icon.is_some());
}

#[tokio::test]
async fn test_full_catalog_installs_routes_and_menus() {
    // A catalog mixing all three module shapes, driven end to end.
    let manager = ModuleManager::new(true);
    manager.register_implementation(model_implementation());
    let fetcher = ScriptedFetcher::once(vec![
        json!({"type_key": "model", "type_name": "Models"}),
        json!({"type_key": "scenario", "type_name": "Scenario"}),
        json!({
            "type_key": "editor", "type_name": "Terrain Editor",
            "integration_mode": "iframe",
            "meta_data": {
                "external_url": "https://editor.example/app",
                "dev_url": "http://localhost:5174"
            }
        }),
    ]);
    manager.load_config(&fetcher).await.unwrap();

    let mut table = RouteTable::new();
    manager.install(&mut table);

    // Matched route, synthesized fallback route, synthesized embed route.
    assert!(table.contains("/model"));
    assert!(table.contains("/res/scenario"));
    let embed = table.resolve("/ext/editor").expect("embed route");
    // Dev mode picked the dev server URL.
    assert_eq!(embed.props["url"], "http://localhost:5174");

    let menus = manager.menus();
    assert_eq!(menus.len(), 3);
    assert_eq!(menus[2].path, "/ext/editor");
}
