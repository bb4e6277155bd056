//! # simhub-core
//!
//! Shared library for the SimHub console core containing the cross-frame
//! message envelope types and the module/registry data model.
//!
//! This crate is used by the host shell, the bridge, and guest-side code.
//! It has zero dependencies on async runtimes, network sockets, or UI
//! frameworks.
//!
//! # Architecture overview
//!
//! SimHub is a resource-management console whose shell embeds externally
//! hosted mini-applications ("guests") and activates resource modules from
//! a declarative backend configuration.  This crate is the shared
//! foundation.  It defines:
//!
//! - **`protocol`** – The JSON envelope exchanged between the host shell and
//!   its guests: `{id, type, payload, timestamp}` requests/events and
//!   `{id, success, data, error}` responses, plus the closed set of
//!   recognised message types.
//!
//! - **`domain`** – Pure data model with no I/O.  The raw backend module
//!   configuration shape (`RawModuleItem`), its normalised internal form
//!   (`ModuleDescriptor`), and the view/action/viewer metadata that plugin
//!   registrations and server config both speak.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `simhub_core::Envelope` instead of `simhub_core::protocol::envelope::Envelope`.
pub use domain::meta::{ActionMeta, ActionRef, ViewMeta, ViewRef, ViewerMeta, ViewerRef};
pub use domain::module::{
    IntegrationMode, ModuleDescriptor, NormalizedModule, RawModuleItem, RawModuleMeta,
};
pub use protocol::envelope::{Envelope, MessageType, Response, WireMessage, EVENT_ID};
