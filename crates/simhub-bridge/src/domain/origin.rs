//! Origin allow-listing for bridge endpoints.
//!
//! The embedding transports carry an origin string per peer (a web origin
//! for browser frames, a synthetic `ws://addr` origin for socket guests).
//! Both bridge ends validate the peer origin: the guest refuses to attach
//! to a host it does not trust, and the host refuses to register frames
//! from origins outside its allow-list.
//!
//! A wildcard ("talk to anyone") mode exists but is a deliberate opt-in via
//! [`OriginPolicy::any`], intended for local development where guest dev
//! servers run on shifting localhost ports.

use std::collections::BTreeSet;

/// Which peer origins a bridge end accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginPolicy {
    /// Accept every origin.  Development only.
    Any,
    /// Accept exactly the listed origins.
    AllowList(BTreeSet<String>),
}

impl OriginPolicy {
    /// The permissive development policy.
    pub fn any() -> Self {
        OriginPolicy::Any
    }

    /// An explicit allow-list.  An empty list permits nothing.
    pub fn allow_list<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        OriginPolicy::AllowList(origins.into_iter().map(Into::into).collect())
    }

    /// Whether a peer with this origin may exchange messages with us.
    pub fn permits(&self, origin: &str) -> bool {
        match self {
            OriginPolicy::Any => true,
            OriginPolicy::AllowList(set) => set.contains(origin),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
