//! Resource metadata attached to confirmation and completion calls.

use serde::{Deserialize, Serialize};

/// Descriptive metadata for the resource being uploaded.
///
/// Travels with the confirm (single-shot) and complete (multipart) calls
/// so the backend can register the object under the right catalog entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadMetadata {
    /// Display name of the resource.
    pub name: String,
    /// Resource type key (catalog module key).
    pub type_key: String,
    /// Category path or id; backend-owned format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Semantic version of this upload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Keys of resources this one depends on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    /// Owning user or team identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Visibility scope; backend-owned value set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Names of auxiliary files bundled with the main object.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_files: Vec<String>,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
