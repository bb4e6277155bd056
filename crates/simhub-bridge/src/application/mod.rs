//! Application layer: the guest and host bridge state machines.

pub mod guest;
pub mod host;

pub use guest::{BridgeError, GuestBridge};
pub use host::{HostBridge, Notification, Notifier, NotifyLevel, TokenStore};
