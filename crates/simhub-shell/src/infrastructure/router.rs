//! The shell's route table.
//!
//! A flat map from navigation path to the render target mounted there plus
//! the props handed to it.  Installation replaces a path's entry when a
//! module re-registers it, matching the rest of the registry's
//! last-writer-wins discipline.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use crate::application::reconcile::RouteDef;

/// One installed route.
#[derive(Debug, Clone, PartialEq)]
pub struct InstalledRoute {
    /// Key of the module that contributed the route.
    pub module_key: String,
    pub target: String,
    pub props: Value,
}

/// Path → installed route.  `BTreeMap` keeps iteration deterministic for
/// display and tests.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: BTreeMap<String, InstalledRoute>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs one route on behalf of a module.
    pub fn register(&mut self, module_key: &str, route: RouteDef) {
        debug!(module = module_key, path = %route.path, target = %route.target, "route installed");
        self.routes.insert(
            route.path,
            InstalledRoute {
                module_key: module_key.to_string(),
                target: route.target,
                props: route.props,
            },
        );
    }

    /// Looks up the route installed at a path.
    pub fn resolve(&self, path: &str) -> Option<&InstalledRoute> {
        self.routes.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.routes.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// All installed paths in sorted order.
    pub fn paths(&self) -> Vec<&str> {
        self.routes.keys().map(String::as_str).collect()
    }

    /// Drops every route contributed by one module.
    pub fn remove_module(&mut self, module_key: &str) {
        self.routes.retain(|_, route| route.module_key != module_key);
    }

    /// Drops all routes.  Used before re-installing after a catalog reload.
    pub fn clear(&mut self) {
        self.routes.clear();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
