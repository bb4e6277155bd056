//! View, action, and viewer registries with fallback resolution.
//!
//! Each registry maps a string key to a registered entry.  Registration is
//! insert-or-replace with last-writer-wins semantics and no warning, which
//! lets a plugin re-register itself across reloads without ceremony.
//!
//! Resolution never fails.  An unknown key degrades to a structurally
//! complete fallback (label = key, a generic icon, and for actions a no-op
//! handler that only logs), so the shell never crashes on an unrecognized
//! plugin reference.  When a full descriptor names an already-registered
//! key, the registered entry is the base and the descriptor's fields win,
//! which is how server metadata overrides a plugin's self-registration.
//!
//! Resolution hands out copies, never references into the maps: a resolved
//! entry is immutable from the consumer's point of view even if the
//! registry is later overwritten.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;
use tracing::{info, warn};

use simhub_core::domain::meta::{ActionMeta, ActionRef, ViewMeta, ViewRef, ViewerMeta, ViewerRef};

/// Executable side of an action, paired with its metadata at registration.
pub type ActionHandler = Arc<dyn Fn(Value) + Send + Sync>;

/// A registered action: display metadata plus the handler invoked when an
/// operator triggers it on a resource row.
#[derive(Clone)]
pub struct RegisteredAction {
    pub meta: ActionMeta,
    pub handler: ActionHandler,
}

impl RegisteredAction {
    /// The inert stand-in for an unregistered action key.
    fn fallback(key: &str) -> Self {
        let logged_key = key.to_string();
        Self {
            meta: ActionMeta::fallback(key),
            handler: Arc::new(move |_ctx| {
                info!(action = %logged_key, "no handler registered for action, ignoring");
            }),
        }
    }
}

/// The three plugin registries, shareable across the shell.
#[derive(Default)]
pub struct Registries {
    views: RwLock<HashMap<String, ViewMeta>>,
    actions: RwLock<HashMap<String, RegisteredAction>>,
    viewers: RwLock<HashMap<String, ViewerMeta>>,
}

impl Registries {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Registration (insert-or-replace) ─────────────────────────────────────

    pub fn register_view(&self, meta: ViewMeta) {
        self.write(&self.views).insert(meta.key.clone(), meta);
    }

    pub fn register_action(&self, meta: ActionMeta, handler: ActionHandler) {
        self.write(&self.actions)
            .insert(meta.key.clone(), RegisteredAction { meta, handler });
    }

    /// Registers action metadata shipped by server config, which carries no
    /// executable handler.  The stored handler is the logging no-op.
    pub fn register_action_meta(&self, meta: ActionMeta) {
        let handler = RegisteredAction::fallback(&meta.key).handler;
        self.register_action(meta, handler);
    }

    pub fn register_viewer(&self, meta: ViewerMeta) {
        self.write(&self.viewers).insert(meta.key.clone(), meta);
    }

    // ── Resolution (total, fallback-completing) ──────────────────────────────

    /// Resolves a view reference to complete metadata.
    pub fn resolve_view(&self, reference: &ViewRef) -> ViewMeta {
        let registered = self.read(&self.views).get(reference.key()).cloned();
        match (reference, registered) {
            (ViewRef::Key(_), Some(meta)) => meta,
            (ViewRef::Key(key), None) => ViewMeta::fallback(key),
            (ViewRef::Meta(given), Some(base)) => base.overlaid_with(given),
            (ViewRef::Meta(given), None) => given.clone(),
        }
    }

    /// Resolves an action reference to complete metadata plus a handler.
    pub fn resolve_action(&self, reference: &ActionRef) -> RegisteredAction {
        let registered = self.read(&self.actions).get(reference.key()).cloned();
        match (reference, registered) {
            (ActionRef::Key(_), Some(action)) => action,
            (ActionRef::Key(key), None) => RegisteredAction::fallback(key),
            (ActionRef::Meta(given), Some(base)) => RegisteredAction {
                meta: base.meta.overlaid_with(given),
                handler: base.handler,
            },
            (ActionRef::Meta(given), None) => RegisteredAction {
                meta: given.clone(),
                handler: RegisteredAction::fallback(&given.key).handler,
            },
        }
    }

    /// Resolves a viewer key to its render path, or the key itself when no
    /// viewer is registered (identity passthrough).
    pub fn resolve_viewer(&self, key: &str) -> String {
        match self.read(&self.viewers).get(key) {
            Some(meta) => meta.path.clone(),
            None => key.to_string(),
        }
    }

    pub fn view_count(&self) -> usize {
        self.read(&self.views).len()
    }

    pub fn action_count(&self) -> usize {
        self.read(&self.actions).len()
    }

    pub fn viewer_count(&self) -> usize {
        self.read(&self.viewers).len()
    }

    fn read<'a, T>(&self, lock: &'a RwLock<T>) -> RwLockReadGuard<'a, T> {
        match lock.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("registry lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write<'a, T>(&self, lock: &'a RwLock<T>) -> RwLockWriteGuard<'a, T> {
        match lock.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("registry lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn view(key: &str, label: &str, icon: &str) -> ViewMeta {
        ViewMeta {
            key: key.to_string(),
            label: label.to_string(),
            icon: Some(icon.to_string()),
        }
    }

    #[test]
    fn test_unknown_view_key_resolves_to_complete_fallback() {
        let reg = Registries::new();
        let resolved = reg.resolve_view(&ViewRef::Key("unknown-key".to_string()));
        assert_eq!(resolved.key, "unknown-key");
        assert_eq!(resolved.label, "unknown-key");
        assert!(resolved.icon.is_some(), "fallback must be structurally complete");
    }

    #[test]
    fn test_registered_view_resolves_to_its_entry() {
        let reg = Registries::new();
        reg.register_view(view("table", "Table", "Grid"));

        let resolved = reg.resolve_view(&ViewRef::Key("table".to_string()));
        assert_eq!(resolved.label, "Table");
        assert_eq!(resolved.icon.as_deref(), Some("Grid"));
    }

    #[test]
    fn test_re_registering_a_key_replaces_the_previous_entry() {
        let reg = Registries::new();
        reg.register_view(view("table", "Table", "Grid"));
        reg.register_view(view("table", "Spreadsheet", "Sheet"));

        let resolved = reg.resolve_view(&ViewRef::Key("table".to_string()));
        assert_eq!(resolved.label, "Spreadsheet");
        assert_eq!(reg.view_count(), 1);
    }

    #[test]
    fn test_descriptor_reference_overrides_registered_base() {
        let reg = Registries::new();
        reg.register_view(view("table", "Table", "Grid"));

        // Server config names the same key with a new label and no icon.
        let resolved = reg.resolve_view(&ViewRef::Meta(ViewMeta {
            key: "table".to_string(),
            label: "Inventory".to_string(),
            icon: None,
        }));
        assert_eq!(resolved.label, "Inventory", "config label must win");
        assert_eq!(resolved.icon.as_deref(), Some("Grid"), "base icon must survive");
    }

    #[test]
    fn test_resolution_hands_out_copies_not_references() {
        let reg = Registries::new();
        reg.register_view(view("table", "Table", "Grid"));
        let before = reg.resolve_view(&ViewRef::Key("table".to_string()));

        reg.register_view(view("table", "Changed", "Other"));
        assert_eq!(before.label, "Table", "earlier copy must be unaffected");
    }

    #[test]
    fn test_unknown_action_gets_noop_handler_that_does_not_panic() {
        let reg = Registries::new();
        let resolved = reg.resolve_action(&ActionRef::Key("mystery".to_string()));
        assert_eq!(resolved.meta.label, "mystery");
        (resolved.handler)(Value::Null);
    }

    #[test]
    fn test_registered_action_keeps_its_handler_under_descriptor_override() {
        let reg = Registries::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        reg.register_action(
            ActionMeta {
                key: "approve".to_string(),
                label: "Approve".to_string(),
                icon: Some("Check".to_string()),
            },
            Arc::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let resolved = reg.resolve_action(&ActionRef::Meta(ActionMeta {
            key: "approve".to_string(),
            label: "Sign off".to_string(),
            icon: None,
        }));
        assert_eq!(resolved.meta.label, "Sign off");
        (resolved.handler)(Value::Null);
        assert_eq!(fired.load(Ordering::SeqCst), 1, "handler must come from the registration");
    }

    #[test]
    fn test_viewer_resolution_is_identity_for_unknown_keys() {
        let reg = Registries::new();
        assert_eq!(reg.resolve_viewer("model-3d"), "model-3d");

        reg.register_viewer(ViewerMeta {
            key: "model-3d".to_string(),
            label: "3D Model".to_string(),
            path: "/viewers/model".to_string(),
        });
        assert_eq!(reg.resolve_viewer("model-3d"), "/viewers/model");
    }
}
