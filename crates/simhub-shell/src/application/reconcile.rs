//! Catalog reconciliation: server descriptors × compiled implementations
//! → active modules.
//!
//! Per module the outcome is one of three shapes:
//!
//! ```text
//! internal + matching implementation  →  Matched   (impl routes, server overlay)
//! internal + no implementation        →  Fallback  (synthesized /res/<key> route)
//! iframe | new-tab                    →  External  (embed container or raw URL)
//! ```
//!
//! The fallback shape is the system's main extensibility mechanism: a new
//! resource type introduced purely through backend configuration gets a
//! generic list route parameterized by its metadata, with zero new compiled
//! code.
//!
//! Reconciliation is a pure function over immutable inputs; all registry
//! mutation happens in the module manager around it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use simhub_core::domain::meta::FALLBACK_MENU_ICON;
use simhub_core::domain::module::{IntegrationMode, ModuleDescriptor};

/// Render target the synthesized fallback route mounts.
pub const GENERIC_LIST_TARGET: &str = "resource-list";
/// Render target the synthesized embed container mounts.
pub const EMBED_TARGET: &str = "embed-frame";

// ── Compiled-in shapes ────────────────────────────────────────────────────────

/// One route a module contributes to the shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteDef {
    /// Navigation path, unique across the shell.
    pub path: String,
    /// Render target the shell mounts at this path.
    pub target: String,
    /// Structured properties handed to the target.  Always a JSON object
    /// for routes this crate synthesizes.
    pub props: Value,
}

/// A navigation menu entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuEntry {
    pub key: String,
    pub label: String,
    pub icon: Option<String>,
    /// Navigation path, or a full URL for new-tab modules.
    pub path: String,
}

/// A module linked into the shell itself: its own routes and menu entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleImplementation {
    /// Module key the server catalog matches against.
    pub key: String,
    pub label: String,
    pub icon: Option<String>,
    pub routes: Vec<RouteDef>,
    pub menu: Option<MenuEntry>,
}

// ── Reconciliation output ─────────────────────────────────────────────────────

/// Which of the three reconciliation shapes produced a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleSource {
    /// Internal descriptor matched a compiled implementation.
    Matched,
    /// Internal descriptor with no implementation; generic list synthesized.
    Fallback,
    /// Embedded or new-tab module; no implementation consulted.
    External,
}

/// One entry of the active-module list.
#[derive(Debug, Clone)]
pub struct ActiveModule {
    pub descriptor: ModuleDescriptor,
    pub source: ModuleSource,
    pub routes: Vec<RouteDef>,
    pub menu: Option<MenuEntry>,
}

/// Reconciles the normalized catalog against the implementation set.
///
/// The output order follows the catalog order.  Callers replace their
/// active list wholesale with the result; nothing here merges with any
/// previous state.
pub fn reconcile(
    catalog: &[ModuleDescriptor],
    implementations: &HashMap<String, ModuleImplementation>,
    dev_mode: bool,
) -> Vec<ActiveModule> {
    catalog
        .iter()
        .map(|descriptor| {
            if descriptor.integration.is_external() {
                external_module(descriptor, dev_mode)
            } else {
                match implementations.get(&descriptor.key) {
                    Some(implementation) => matched_module(descriptor, implementation),
                    None => fallback_module(descriptor),
                }
            }
        })
        .collect()
}

/// Picks the URL an external module is served from.
///
/// Development mode prefers the module's dev server when it declares one,
/// so a locally running guest can be iterated on against a deployed shell.
pub fn embed_url(descriptor: &ModuleDescriptor, dev_mode: bool) -> Option<String> {
    if dev_mode {
        descriptor
            .dev_url
            .clone()
            .or_else(|| descriptor.external_url.clone())
    } else {
        descriptor.external_url.clone()
    }
}

// ── The three shapes ──────────────────────────────────────────────────────────

fn matched_module(descriptor: &ModuleDescriptor, implementation: &ModuleImplementation) -> ActiveModule {
    // Server-declared view/action lists are propagated into any route-level
    // props that declare those keys; routes that never mention them are
    // left alone.
    let routes = implementation
        .routes
        .iter()
        .map(|route| {
            let mut route = route.clone();
            if let Value::Object(props) = &mut route.props {
                if props.contains_key("supported_views") && !descriptor.supported_views.is_empty() {
                    props.insert("supported_views".to_string(), json!(descriptor.supported_views));
                }
                if props.contains_key("custom_actions") && !descriptor.custom_actions.is_empty() {
                    props.insert("custom_actions".to_string(), json!(descriptor.custom_actions));
                }
            }
            route
        })
        .collect();

    // Menu label/icon: server metadata wins over the compiled entry.
    let menu = implementation.menu.as_ref().map(|menu| MenuEntry {
        key: menu.key.clone(),
        label: if descriptor.label.is_empty() {
            menu.label.clone()
        } else {
            descriptor.label.clone()
        },
        icon: descriptor.icon.clone().or_else(|| menu.icon.clone()),
        path: menu.path.clone(),
    });

    ActiveModule {
        descriptor: descriptor.clone(),
        source: ModuleSource::Matched,
        routes,
        menu,
    }
}

fn fallback_module(descriptor: &ModuleDescriptor) -> ActiveModule {
    let path = format!("/res/{}", descriptor.key);
    let route = RouteDef {
        path: path.clone(),
        target: GENERIC_LIST_TARGET.to_string(),
        props: json!({
            "type_key": descriptor.key,
            "type_name": descriptor.label,
            "short_name": descriptor.short_name,
            "upload_mode": descriptor.upload_mode,
            "category_mode": descriptor.category_mode,
            "viewer": descriptor.viewer,
            "supported_views": descriptor.supported_views,
            "custom_actions": descriptor.custom_actions,
            "enable_scope": descriptor.enable_scope,
            "example": descriptor.example,
        }),
    };
    let menu = MenuEntry {
        key: descriptor.key.clone(),
        label: descriptor.label.clone(),
        icon: descriptor
            .icon
            .clone()
            .or_else(|| Some(FALLBACK_MENU_ICON.to_string())),
        path,
    };

    ActiveModule {
        descriptor: descriptor.clone(),
        source: ModuleSource::Fallback,
        routes: vec![route],
        menu: Some(menu),
    }
}

fn external_module(descriptor: &ModuleDescriptor, dev_mode: bool) -> ActiveModule {
    let url = embed_url(descriptor, dev_mode);

    // Iframe modules navigate to an embed container inside the shell;
    // new-tab modules put the URL itself in the menu.
    let menu_path = match descriptor.integration {
        IntegrationMode::Iframe => format!("/ext/{}", descriptor.key),
        _ => url.clone().unwrap_or_else(|| "#".to_string()),
    };

    let menu = MenuEntry {
        key: descriptor.key.clone(),
        label: descriptor.label.clone(),
        icon: descriptor
            .icon
            .clone()
            .or_else(|| Some(FALLBACK_MENU_ICON.to_string())),
        path: menu_path,
    };

    ActiveModule {
        descriptor: descriptor.clone(),
        source: ModuleSource::External,
        // The embed container route is synthesized at install time if the
        // module did not bring one.
        routes: Vec::new(),
        menu: Some(menu),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(key: &str, label: &str) -> ModuleDescriptor {
        ModuleDescriptor {
            key: key.to_string(),
            label: label.to_string(),
            icon: None,
            integration: IntegrationMode::Internal,
            upload_mode: "online".to_string(),
            category_mode: "flat".to_string(),
            enable_scope: None,
            viewer: None,
            supported_views: Vec::new(),
            custom_actions: Vec::new(),
            external_url: None,
            dev_url: None,
            short_name: None,
            example: None,
        }
    }

    fn implementation(key: &str, label: &str) -> ModuleImplementation {
        ModuleImplementation {
            key: key.to_string(),
            label: label.to_string(),
            icon: Some("Folder".to_string()),
            routes: vec![RouteDef {
                path: format!("/{key}"),
                target: format!("{key}-list"),
                props: json!({"supported_views": ["table"], "page_size": 20}),
            }],
            menu: Some(MenuEntry {
                key: key.to_string(),
                label: label.to_string(),
                icon: Some("Folder".to_string()),
                path: format!("/{key}"),
            }),
        }
    }

    #[test]
    fn test_unmatched_internal_module_synthesizes_res_route() {
        let catalog = vec![descriptor("scenario", "Scenario")];
        let active = reconcile(&catalog, &HashMap::new(), false);

        assert_eq!(active.len(), 1);
        assert_eq!(active[0].source, ModuleSource::Fallback);
        assert_eq!(active[0].routes.len(), 1);
        assert_eq!(active[0].routes[0].path, "/res/scenario");
        assert_eq!(active[0].routes[0].target, GENERIC_LIST_TARGET);
    }

    #[test]
    fn test_fallback_route_props_carry_the_full_metadata() {
        let mut d = descriptor("terrain", "Terrain");
        d.viewer = Some("heightmap".to_string());
        d.supported_views = vec!["table".to_string(), "card".to_string()];
        let active = reconcile(&[d], &HashMap::new(), false);

        let props = &active[0].routes[0].props;
        assert_eq!(props["type_key"], "terrain");
        assert_eq!(props["upload_mode"], "online");
        assert_eq!(props["viewer"], "heightmap");
        assert_eq!(props["supported_views"], json!(["table", "card"]));
    }

    #[test]
    fn test_matched_module_uses_server_label_for_its_menu() {
        let mut impls = HashMap::new();
        impls.insert("model".to_string(), implementation("model", "Models"));
        let catalog = vec![descriptor("model", "3D Assets")];

        let active = reconcile(&catalog, &impls, false);
        assert_eq!(active[0].source, ModuleSource::Matched);
        assert_eq!(active[0].menu.as_ref().unwrap().label, "3D Assets");
    }

    #[test]
    fn test_matched_module_keeps_compiled_label_when_server_label_empty() {
        let mut impls = HashMap::new();
        impls.insert("model".to_string(), implementation("model", "Models"));
        let catalog = vec![descriptor("model", "")];

        let active = reconcile(&catalog, &impls, false);
        assert_eq!(active[0].menu.as_ref().unwrap().label, "Models");
    }

    #[test]
    fn test_server_views_propagate_into_declaring_route_props() {
        let mut impls = HashMap::new();
        impls.insert("model".to_string(), implementation("model", "Models"));
        let mut d = descriptor("model", "Models");
        d.supported_views = vec!["gallery".to_string()];

        let active = reconcile(&[d], &impls, false);
        let props = &active[0].routes[0].props;
        assert_eq!(props["supported_views"], json!(["gallery"]));
        // Props the server does not speak about are untouched.
        assert_eq!(props["page_size"], 20);
    }

    #[test]
    fn test_routes_without_declaring_props_are_left_alone() {
        let mut impls = HashMap::new();
        let mut imp = implementation("model", "Models");
        imp.routes[0].props = json!({"page_size": 20});
        impls.insert("model".to_string(), imp);
        let mut d = descriptor("model", "Models");
        d.supported_views = vec!["gallery".to_string()];

        let active = reconcile(&[d], &impls, false);
        assert!(active[0].routes[0].props.get("supported_views").is_none());
    }

    #[test]
    fn test_iframe_module_menu_points_at_embed_container() {
        let mut d = descriptor("editor", "Terrain Editor");
        d.integration = IntegrationMode::Iframe;
        d.external_url = Some("https://editor.example/app".to_string());

        let active = reconcile(&[d], &HashMap::new(), false);
        assert_eq!(active[0].source, ModuleSource::External);
        assert_eq!(active[0].menu.as_ref().unwrap().path, "/ext/editor");
    }

    #[test]
    fn test_new_tab_module_menu_carries_the_raw_url() {
        let mut d = descriptor("docs", "Documentation");
        d.integration = IntegrationMode::NewTab;
        d.external_url = Some("https://docs.example".to_string());

        let active = reconcile(&[d], &HashMap::new(), false);
        assert_eq!(active[0].menu.as_ref().unwrap().path, "https://docs.example");
    }

    #[test]
    fn test_dev_mode_prefers_the_dev_url() {
        let mut d = descriptor("editor", "Editor");
        d.integration = IntegrationMode::Iframe;
        d.external_url = Some("https://editor.example/app".to_string());
        d.dev_url = Some("http://localhost:5174".to_string());

        assert_eq!(embed_url(&d, true).as_deref(), Some("http://localhost:5174"));
        assert_eq!(embed_url(&d, false).as_deref(), Some("https://editor.example/app"));
    }

    #[test]
    fn test_external_module_never_consults_an_implementation() {
        // An implementation with the same key exists, but iframe mode must
        // ignore it entirely.
        let mut impls = HashMap::new();
        impls.insert("editor".to_string(), implementation("editor", "Compiled Editor"));
        let mut d = descriptor("editor", "Hosted Editor");
        d.integration = IntegrationMode::Iframe;

        let active = reconcile(&[d], &impls, false);
        assert_eq!(active[0].source, ModuleSource::External);
        assert!(active[0].routes.is_empty());
        assert_eq!(active[0].menu.as_ref().unwrap().label, "Hosted Editor");
    }
}
