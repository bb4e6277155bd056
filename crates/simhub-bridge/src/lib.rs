//! simhub-bridge library crate.
//!
//! This crate implements the message bridge between the SimHub host shell
//! and its embedded guest applications: correlated request/response with a
//! timeout, fire-and-forget events, broadcast fan-out, and host capability
//! dispatch.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Guest app                         Host shell
//!   GuestBridge ── WireMessage ──► HostBridge ──► TokenStore / Notifier
//!        ▲                              │
//!        └───────── broadcast ◄─────────┘
//!
//! [simhub-bridge]
//!   ├── domain/           BridgeConfig, OriginPolicy (no I/O)
//!   ├── application/      GuestBridge, HostBridge, capability traits
//!   └── infrastructure/
//!         ├── port/       MessagePort trait + in-memory pair
//!         └── ws_server/  WebSocket guest endpoint (tokio-tungstenite)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain`, `simhub-core`, and the port trait.
//! - `infrastructure` depends on all other layers plus `tokio` and
//!   `tungstenite`.
//!
//! The transport only guarantees asynchronous, unordered, unauthenticated
//! delivery of whole JSON documents.  All reliability the bridge offers
//! (correlation, timeout, single-response) is built in the application
//! layer, which is why it works identically over the in-memory port pair
//! used by tests and embedded guests, and over the WebSocket endpoint used
//! by out-of-process guests.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::guest::{BridgeError, GuestBridge};
pub use application::host::{HostBridge, Notification, Notifier, NotifyLevel, TokenStore};
pub use domain::config::BridgeConfig;
pub use domain::origin::OriginPolicy;
pub use infrastructure::port::{port_pair, MessagePort, PortEnd, PortError};
pub use infrastructure::ws_server::run_guest_endpoint;
