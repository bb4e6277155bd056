//! Domain layer: pure configuration types (no I/O).

pub mod config;
pub mod origin;

pub use config::BridgeConfig;
pub use origin::OriginPolicy;
