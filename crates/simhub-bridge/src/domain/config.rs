//! Bridge configuration.
//!
//! [`BridgeConfig`] is a plain struct with no global state: build it once at
//! startup (CLI args or defaults) and hand it to whichever bridge end needs
//! it.  Keeping environment reads out of this type makes both bridges easy
//! to embed in tests with aggressive timeouts.

use std::net::SocketAddr;
use std::time::Duration;

use crate::domain::origin::OriginPolicy;

/// All runtime configuration for a bridge end.
///
/// # Example
///
/// ```rust
/// use simhub_bridge::domain::BridgeConfig;
///
/// // Defaults are suitable for local development:
/// let cfg = BridgeConfig::default();
/// assert_eq!(cfg.call_timeout.as_secs(), 30);
/// ```
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// How long a guest `call` waits for its correlated response before
    /// failing with a timeout.  After the deadline the pending entry is
    /// removed, so a late response is ignored.
    pub call_timeout: Duration,

    /// The address the host's WebSocket guest endpoint binds to.
    ///
    /// `0.0.0.0` accepts guests from any interface; set `127.0.0.1` to
    /// accept only local guest processes.
    pub ws_bind_addr: SocketAddr,

    /// Bounded capacity of each peer's inbound message channel.
    ///
    /// A guest that stops draining its inbox eventually makes host posts
    /// toward it await; broadcast skips peers whose channel has closed, not
    /// ones that are merely slow.
    pub channel_capacity: usize,

    /// Which peer origins this end will exchange messages with.
    pub origins: OriginPolicy,
}

impl Default for BridgeConfig {
    /// Returns a config suitable for local development without any external
    /// configuration.
    ///
    /// | Field            | Default        |
    /// |------------------|----------------|
    /// | call_timeout     | 30 seconds     |
    /// | ws_bind_addr     | `0.0.0.0:7810` |
    /// | channel_capacity | 64             |
    /// | origins          | any (dev only) |
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(30),
            // Compile-time-known valid socket address string.
            ws_bind_addr: "0.0.0.0:7810".parse().unwrap(),
            channel_capacity: 64,
            origins: OriginPolicy::any(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
