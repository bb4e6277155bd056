//! Pure data model for the module catalog.
//!
//! No I/O and no async: everything here is plain data plus the
//! normalization step that turns the backend's raw configuration shape into
//! the internal descriptor the registry reconciles against.

pub mod meta;
pub mod module;
