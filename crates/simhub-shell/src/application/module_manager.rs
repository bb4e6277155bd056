//! The module manager: composition engine over implementations,
//! registries, and the server catalog.
//!
//! One manager instance is constructed per shell and passed to whatever
//! needs it.  There is deliberately no global singleton: tests and multiple
//! independent shells coexist by constructing their own managers.
//!
//! # Lifecycle
//!
//! ```text
//! register_implementation / register_view / register_action / register_viewer
//!                     │
//!                     ▼
//!             load_config(fetcher)      fetch → normalize → auto-register
//!                     │                 inline metas → reconcile
//!                     ▼
//!             active modules            replaced atomically, never merged
//!                     │
//!          ┌──────────┴──────────┐
//!      install(route_table)   menus()
//! ```
//!
//! Implementations must be registered before `load_config` to be eligible
//! for matching; there is no retroactive re-matching.  `load_config` is
//! callable repeatedly (manual refresh); each successful call fully
//! replaces the active list, and a failed fetch leaves the previous list
//! in place so the shell keeps running on a stale catalog rather than an
//! empty one.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{info, warn};

use simhub_core::domain::meta::{ActionMeta, ActionRef, ViewMeta, ViewRef, ViewerMeta};
use simhub_core::domain::module::{IntegrationMode, ModuleDescriptor};

use crate::application::reconcile::{
    self, ActiveModule, MenuEntry, ModuleImplementation, RouteDef, EMBED_TARGET,
};
use crate::application::registry::{ActionHandler, Registries, RegisteredAction};
use crate::infrastructure::config_client::{ConfigFetcher, FetchError};
use crate::infrastructure::router::RouteTable;

/// The shell's module registry and reconciliation engine.
pub struct ModuleManager {
    implementations: RwLock<HashMap<String, ModuleImplementation>>,
    registries: Registries,
    active: RwLock<Vec<ActiveModule>>,
    dev_mode: bool,
}

impl ModuleManager {
    pub fn new(dev_mode: bool) -> Self {
        Self {
            implementations: RwLock::new(HashMap::new()),
            registries: Registries::new(),
            active: RwLock::new(Vec::new()),
            dev_mode,
        }
    }

    // ── Registration ─────────────────────────────────────────────────────────

    /// Stores a compiled implementation for catalog matching.
    ///
    /// Must happen before [`Self::load_config`]; a later registration only
    /// takes effect on the next reload.
    pub fn register_implementation(&self, implementation: ModuleImplementation) {
        info!(module = %implementation.key, "implementation registered");
        self.write(&self.implementations)
            .insert(implementation.key.clone(), implementation);
    }

    pub fn register_view(&self, meta: ViewMeta) {
        self.registries.register_view(meta);
    }

    pub fn register_action(&self, meta: ActionMeta, handler: ActionHandler) {
        self.registries.register_action(meta, handler);
    }

    pub fn register_viewer(&self, meta: ViewerMeta) {
        self.registries.register_viewer(meta);
    }

    // ── Resolution (delegated; total functions) ──────────────────────────────

    pub fn resolve_view(&self, reference: &ViewRef) -> ViewMeta {
        self.registries.resolve_view(reference)
    }

    pub fn resolve_action(&self, reference: &ActionRef) -> RegisteredAction {
        self.registries.resolve_action(reference)
    }

    pub fn resolve_viewer(&self, key: &str) -> String {
        self.registries.resolve_viewer(key)
    }

    // ── Catalog loading ───────────────────────────────────────────────────────

    /// Fetches the catalog, reconciles it, and replaces the active list.
    ///
    /// Inline view/action/viewer descriptors found in the metadata are
    /// auto-registered before reconciliation, so a resource type can ship
    /// its own view definitions without a separate registration call.
    ///
    /// # Errors
    ///
    /// Returns the fetch error; on error the previous active list is left
    /// untouched.  Callers treat this as a degraded-but-running state.
    pub async fn load_config(&self, fetcher: &dyn ConfigFetcher) -> Result<usize, FetchError> {
        let raw = match fetcher.fetch_catalog().await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(%err, "catalog load failed, keeping previous module list");
                return Err(err);
            }
        };

        let mut catalog: Vec<ModuleDescriptor> = Vec::with_capacity(raw.len());
        for item in raw {
            let normalized = item.normalize();
            for view in normalized.inline_views {
                self.registries.register_view(view);
            }
            for action in normalized.inline_actions {
                self.registries.register_action_meta(action);
            }
            for viewer in normalized.inline_viewers {
                self.registries.register_viewer(viewer);
            }
            catalog.push(normalized.descriptor);
        }

        let active = {
            let implementations = self.read(&self.implementations);
            reconcile::reconcile(&catalog, &implementations, self.dev_mode)
        };
        let count = active.len();

        // Single write-lock assignment: readers see the old list or the new
        // one, never a partial state.
        *self.write(&self.active) = active;
        info!(modules = count, "module catalog loaded");
        Ok(count)
    }

    /// Snapshot of the current active-module list.
    pub fn active_modules(&self) -> Vec<ActiveModule> {
        self.read(&self.active).clone()
    }

    // ── Installation and menus ────────────────────────────────────────────────

    /// Installs every active module's routes into the table.
    ///
    /// Iframe modules that brought no route of their own get an embed
    /// container synthesized at `/ext/<key>`.
    pub fn install(&self, table: &mut RouteTable) {
        for module in self.read(&self.active).iter() {
            for route in &module.routes {
                table.register(&module.descriptor.key, route.clone());
            }

            if module.descriptor.integration == IntegrationMode::Iframe && module.routes.is_empty()
            {
                let path = format!("/ext/{}", module.descriptor.key);
                if !table.contains(&path) {
                    let url = reconcile::embed_url(&module.descriptor, self.dev_mode);
                    table.register(
                        &module.descriptor.key,
                        RouteDef {
                            path,
                            target: EMBED_TARGET.to_string(),
                            props: serde_json::json!({
                                "type_key": module.descriptor.key,
                                "label": module.descriptor.label,
                                "url": url,
                            }),
                        },
                    );
                }
            }
        }
    }

    /// Derives the navigation menu from the active-module list.
    pub fn menus(&self) -> Vec<MenuEntry> {
        self.read(&self.active)
            .iter()
            .filter_map(|module| module.menu.clone())
            .collect()
    }

    fn read<'a, T>(&self, lock: &'a RwLock<T>) -> RwLockReadGuard<'a, T> {
        match lock.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("module manager lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write<'a, T>(&self, lock: &'a RwLock<T>) -> RwLockWriteGuard<'a, T> {
        match lock.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("module manager lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
