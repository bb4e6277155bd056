//! Application layer: the upload coordinator.

pub mod coordinator;
