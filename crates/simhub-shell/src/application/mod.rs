//! Application layer: registries, reconciliation, and the module manager.

pub mod module_manager;
pub mod reconcile;
pub mod registry;
