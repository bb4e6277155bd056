//! View, action, and viewer metadata.
//!
//! Three pluggable extension points share the same registration shape: a
//! string key unique within the registry plus display metadata.  Both
//! plugin self-registration (`registerView(...)` from guest code) and
//! server configuration (`meta_data.supported_views`) speak these types.
//!
//! # String-or-object values
//!
//! The backend may declare a view either as a bare key (`"table"`) or as a
//! full descriptor (`{"key":"table","label":"Table","icon":"Grid"}`).
//! Rather than inspecting JSON shapes at each call site, that polymorphism
//! is represented once as a tagged union ([`ViewRef`] / [`ActionRef`] /
//! [`ViewerRef`]) and resolved through a single normalization step before
//! registry lookup.

use serde::{Deserialize, Serialize};

/// Default icon for a view whose key has no registration.
pub const FALLBACK_VIEW_ICON: &str = "Document";
/// Default icon for an action whose key has no registration.
pub const FALLBACK_ACTION_ICON: &str = "Promotion";
/// Default icon for a synthesized fallback-module menu entry.
pub const FALLBACK_MENU_ICON: &str = "Box";

// ── View ──────────────────────────────────────────────────────────────────────

/// A pluggable list-rendering strategy (table, card grid, gallery, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewMeta {
    /// Registry key, unique among views.
    pub key: String,
    /// Display label.
    pub label: String,
    /// Icon reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl ViewMeta {
    /// The structurally complete stand-in for an unregistered key.
    ///
    /// Resolution never fails: an unknown key degrades to a visible entry
    /// labelled by the key itself.
    pub fn fallback(key: &str) -> Self {
        Self {
            key: key.to_string(),
            label: key.to_string(),
            icon: Some(FALLBACK_VIEW_ICON.to_string()),
        }
    }

    /// Overlays `other`'s present fields on top of `self`.
    ///
    /// Used when server config names an already-registered key with partial
    /// overrides: the registered entry is the base, the config wins.
    pub fn overlaid_with(&self, other: &ViewMeta) -> Self {
        Self {
            key: other.key.clone(),
            label: other.label.clone(),
            icon: other.icon.clone().or_else(|| self.icon.clone()),
        }
    }
}

/// A view named either by key or by full descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ViewRef {
    /// Full descriptor; tried first since a bare string never matches it.
    Meta(ViewMeta),
    /// Bare registry key.
    Key(String),
}

impl ViewRef {
    /// The registry key this reference points at.
    pub fn key(&self) -> &str {
        match self {
            ViewRef::Key(k) => k,
            ViewRef::Meta(m) => &m.key,
        }
    }
}

// ── Action ────────────────────────────────────────────────────────────────────

/// Display metadata for a pluggable row-level operation.
///
/// The executable handler is not part of the wire shape; the host registry
/// pairs this metadata with a handler at registration time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionMeta {
    /// Registry key, unique among actions.
    pub key: String,
    /// Display label.
    pub label: String,
    /// Icon reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl ActionMeta {
    /// The structurally complete stand-in for an unregistered key.
    pub fn fallback(key: &str) -> Self {
        Self {
            key: key.to_string(),
            label: key.to_string(),
            icon: Some(FALLBACK_ACTION_ICON.to_string()),
        }
    }

    /// Overlays `other`'s present fields on top of `self`.
    pub fn overlaid_with(&self, other: &ActionMeta) -> Self {
        Self {
            key: other.key.clone(),
            label: other.label.clone(),
            icon: other.icon.clone().or_else(|| self.icon.clone()),
        }
    }
}

/// An action named either by key or by full descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionRef {
    Meta(ActionMeta),
    Key(String),
}

impl ActionRef {
    pub fn key(&self) -> &str {
        match self {
            ActionRef::Key(k) => k,
            ActionRef::Meta(m) => &m.key,
        }
    }
}

// ── Viewer ────────────────────────────────────────────────────────────────────

/// A pluggable preview renderer for a resource's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerMeta {
    /// Registry key, unique among viewers.
    pub key: String,
    /// Display label.
    pub label: String,
    /// Render target path the shell mounts for previews.
    pub path: String,
}

/// A viewer named either by key or by full descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ViewerRef {
    Meta(ViewerMeta),
    Key(String),
}

impl ViewerRef {
    pub fn key(&self) -> &str {
        match self {
            ViewerRef::Key(k) => k,
            ViewerRef::Meta(m) => &m.key,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
