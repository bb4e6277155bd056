//! The shell's token store.
//!
//! Credential acquisition itself is an external concern; the shell only
//! holds the current session token in memory and serves it to guests
//! through the host bridge's `TokenStore` capability.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use simhub_bridge::TokenStore;

/// In-memory session token holder.
#[derive(Default)]
pub struct InMemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with a token already present.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }

    /// Replaces the stored token.
    pub async fn set(&self, token: impl Into<String>) {
        *self.token.write().await = Some(token.into());
        debug!("session token updated");
    }

    /// Drops the stored token.  Guests asking afterwards get a failure
    /// response from the host bridge.
    pub async fn clear(&self) {
        *self.token.write().await = None;
        debug!("session token cleared");
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn auth_token(&self) -> Option<String> {
        self.token.read().await.clone()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_starts_empty() {
        let store = InMemoryTokenStore::new();
        assert_eq!(store.auth_token().await, None);
    }

    #[tokio::test]
    async fn test_set_then_clear_round_trips() {
        let store = InMemoryTokenStore::new();
        store.set("tok-1").await;
        assert_eq!(store.auth_token().await.as_deref(), Some("tok-1"));

        store.clear().await;
        assert_eq!(store.auth_token().await, None);
    }

    #[tokio::test]
    async fn test_with_token_constructor() {
        let store = InMemoryTokenStore::with_token("boot");
        assert_eq!(store.auth_token().await.as_deref(), Some("boot"));
    }
}
