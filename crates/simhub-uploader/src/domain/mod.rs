//! Domain layer: pure upload arithmetic and metadata (no I/O).

pub mod meta;
pub mod plan;
