//! Module configuration: the backend's raw shape and its normalized form.
//!
//! The module catalog endpoint returns an array of [`RawModuleItem`]s.
//! Field names there are owned by the backend and mirrored exactly
//! (`type_key`, `meta_data`, `integration_mode`, ...).  Before the registry
//! reconciles anything, each raw item passes through one normalization step
//! ([`RawModuleItem::normalize`]) that:
//!
//! - applies defaults (`internal` integration, `online` upload mode,
//!   `flat` category mode),
//! - flattens string-or-object view/action/viewer references down to keys,
//! - and surfaces any inline descriptor objects it found, so the caller can
//!   auto-register them (a resource type can ship its own view definitions
//!   without a separate registration call).
//!
//! Normalization is pure: it performs no registry writes itself.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::meta::{ActionMeta, ActionRef, ViewMeta, ViewRef, ViewerMeta, ViewerRef};

// ── Integration mode ──────────────────────────────────────────────────────────

/// How a configured module is integrated into the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum IntegrationMode {
    /// Compiled-in route set, or a synthesized generic list view when no
    /// compiled implementation matches.
    #[default]
    #[serde(rename = "internal")]
    Internal,
    /// Embedded guest application in an iframe container route.
    #[serde(rename = "iframe")]
    Iframe,
    /// External application opened in a new browser tab.
    #[serde(rename = "new-tab")]
    NewTab,
}

impl IntegrationMode {
    /// True for the two externally hosted variants.
    pub fn is_external(self) -> bool {
        matches!(self, IntegrationMode::Iframe | IntegrationMode::NewTab)
    }
}

// ── Raw backend shape ─────────────────────────────────────────────────────────

/// One entry of the module catalog endpoint, verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawModuleItem {
    /// Resource type key; becomes the module key.
    pub type_key: String,
    /// Display name for the resource type.
    pub type_name: String,
    /// Missing means `internal`.
    #[serde(default)]
    pub integration_mode: IntegrationMode,
    /// Missing means `"online"`.
    #[serde(default)]
    pub upload_mode: Option<String>,
    /// Missing means `"flat"`.
    #[serde(default)]
    pub category_mode: Option<String>,
    /// Free-form metadata bag; absent entirely for minimal entries.
    #[serde(default)]
    pub meta_data: RawModuleMeta,
}

/// The `meta_data` object of a catalog entry.  Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawModuleMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_scope: Option<Value>,
    /// Viewer as a bare key or a full inline descriptor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewer: Option<ViewerRef>,
    /// Views as bare keys and/or full inline descriptors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported_views: Option<Vec<ViewRef>>,
    /// Actions as bare keys and/or full inline descriptors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_actions: Option<Vec<ActionRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

// ── Normalized form ───────────────────────────────────────────────────────────

/// A catalog entry after normalization: defaults applied, references
/// flattened to keys.  This is the shape the registry reconciles against
/// compiled implementations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    /// Unique module key (the backend's `type_key`).
    pub key: String,
    /// Display label (the backend's `type_name`).
    pub label: String,
    pub icon: Option<String>,
    pub integration: IntegrationMode,
    pub upload_mode: String,
    pub category_mode: String,
    pub enable_scope: Option<Value>,
    /// Viewer registry key, if any.
    pub viewer: Option<String>,
    /// View registry keys, in declaration order.
    pub supported_views: Vec<String>,
    /// Action registry keys, in declaration order.
    pub custom_actions: Vec<String>,
    pub external_url: Option<String>,
    pub dev_url: Option<String>,
    pub short_name: Option<String>,
    pub example: Option<Value>,
}

/// Result of normalizing one raw item: the descriptor plus any inline
/// descriptor objects the metadata shipped, ready for auto-registration.
#[derive(Debug, Clone)]
pub struct NormalizedModule {
    pub descriptor: ModuleDescriptor,
    pub inline_views: Vec<ViewMeta>,
    pub inline_actions: Vec<ActionMeta>,
    pub inline_viewers: Vec<ViewerMeta>,
}

impl RawModuleItem {
    /// Normalizes this raw item.  See the module docs for what that means.
    pub fn normalize(self) -> NormalizedModule {
        let meta = self.meta_data;

        let mut inline_views = Vec::new();
        let mut inline_actions = Vec::new();
        let mut inline_viewers = Vec::new();

        let viewer = meta.viewer.map(|v| match v {
            ViewerRef::Key(k) => k,
            ViewerRef::Meta(m) => {
                let key = m.key.clone();
                inline_viewers.push(m);
                key
            }
        });

        let supported_views = meta
            .supported_views
            .unwrap_or_default()
            .into_iter()
            .map(|v| match v {
                ViewRef::Key(k) => k,
                ViewRef::Meta(m) => {
                    let key = m.key.clone();
                    inline_views.push(m);
                    key
                }
            })
            .collect();

        let custom_actions = meta
            .custom_actions
            .unwrap_or_default()
            .into_iter()
            .map(|a| match a {
                ActionRef::Key(k) => k,
                ActionRef::Meta(m) => {
                    let key = m.key.clone();
                    inline_actions.push(m);
                    key
                }
            })
            .collect();

        let descriptor = ModuleDescriptor {
            key: self.type_key,
            label: self.type_name,
            icon: meta.icon,
            integration: self.integration_mode,
            upload_mode: self.upload_mode.unwrap_or_else(|| "online".to_string()),
            category_mode: self.category_mode.unwrap_or_else(|| "flat".to_string()),
            enable_scope: meta.enable_scope,
            viewer,
            supported_views,
            custom_actions,
            external_url: meta.external_url,
            dev_url: meta.dev_url,
            short_name: meta.short_name,
            example: meta.example,
        };

        NormalizedModule {
            descriptor,
            inline_views,
            inline_actions,
            inline_viewers,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
