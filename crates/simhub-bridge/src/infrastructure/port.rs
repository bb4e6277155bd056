//! The message port abstraction and its in-memory implementation.
//!
//! A [`MessagePort`] is one direction of a frame boundary: it posts whole
//! [`WireMessage`]s toward a single remote peer and knows that peer's
//! origin string.  The transport makes no ordering or delivery promises
//! beyond "a post either enqueues or fails"; correlation and timeouts live
//! in the application layer.
//!
//! Two implementations exist:
//!
//! - the in-memory pair here, built on bounded `tokio::sync::mpsc`
//!   channels, used by tests and same-process guests;
//! - the WebSocket port in [`crate::infrastructure::ws_server`], which
//!   feeds an identical channel drained by a socket writer task.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use simhub_core::protocol::envelope::WireMessage;

// ── Error type ────────────────────────────────────────────────────────────────

/// Failures a post can surface.
///
/// There is deliberately no "delivered" acknowledgement: the transport has
/// no delivery guarantee, so the only observable failure is a peer whose
/// channel is gone.
#[derive(Debug, Error)]
pub enum PortError {
    /// The remote peer's inbox has been dropped (frame torn down).
    #[error("message port closed: peer {origin} is gone")]
    Closed {
        /// Origin of the unreachable peer.
        origin: String,
    },
}

// ── Trait ─────────────────────────────────────────────────────────────────────

/// One direction of a frame boundary.
#[async_trait]
pub trait MessagePort: Send + Sync {
    /// Origin of the remote peer this port posts toward.
    fn origin(&self) -> &str;

    /// Posts one message toward the peer.
    ///
    /// # Errors
    ///
    /// [`PortError::Closed`] when the peer has been torn down.
    async fn post(&self, message: WireMessage) -> Result<(), PortError>;
}

// ── In-memory implementation ──────────────────────────────────────────────────

/// In-memory port: posts into the peer's bounded inbox channel.
pub struct InMemoryPort {
    peer_origin: String,
    tx: mpsc::Sender<WireMessage>,
}

#[async_trait]
impl MessagePort for InMemoryPort {
    fn origin(&self) -> &str {
        &self.peer_origin
    }

    async fn post(&self, message: WireMessage) -> Result<(), PortError> {
        self.tx.send(message).await.map_err(|_| PortError::Closed {
            origin: self.peer_origin.clone(),
        })
    }
}

/// One side of an in-memory frame boundary: the port that talks to the
/// peer, and the inbox carrying what the peer posted to us.
pub struct PortEnd {
    /// Posts toward the remote peer.
    pub port: std::sync::Arc<InMemoryPort>,
    /// Receives what the remote peer posts.
    pub inbox: mpsc::Receiver<WireMessage>,
}

/// Builds a connected pair of in-memory ports.
///
/// `a_origin`/`b_origin` name the two peers; the first returned end belongs
/// to peer A (so its port reports `b_origin` as the remote origin), the
/// second to peer B.
pub fn port_pair(a_origin: &str, b_origin: &str, capacity: usize) -> (PortEnd, PortEnd) {
    let (a_tx, a_rx) = mpsc::channel(capacity);
    let (b_tx, b_rx) = mpsc::channel(capacity);

    let a_end = PortEnd {
        port: std::sync::Arc::new(InMemoryPort {
            peer_origin: b_origin.to_string(),
            tx: b_tx,
        }),
        inbox: a_rx,
    };
    let b_end = PortEnd {
        port: std::sync::Arc::new(InMemoryPort {
            peer_origin: a_origin.to_string(),
            tx: a_tx,
        }),
        inbox: b_rx,
    };
    (a_end, b_end)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use simhub_core::protocol::envelope::{Envelope, MessageType};

    #[tokio::test]
    async fn test_post_reaches_the_peer_inbox() {
        let (a, mut b) = port_pair("host.local", "guest.local", 8);
        let msg = WireMessage::Envelope(Envelope::event(MessageType::ThemeUpdate, None));

        a.port.post(msg.clone()).await.unwrap();

        let received = b.inbox.recv().await.expect("peer must receive the post");
        assert_eq!(received, msg);
    }

    #[tokio::test]
    async fn test_each_port_reports_the_remote_origin() {
        let (a, b) = port_pair("host.local", "guest.local", 8);
        assert_eq!(a.port.origin(), "guest.local");
        assert_eq!(b.port.origin(), "host.local");
    }

    #[tokio::test]
    async fn test_post_to_dropped_peer_fails_closed() {
        let (a, b) = port_pair("host.local", "guest.local", 8);
        drop(b); // peer torn down

        let msg = WireMessage::Envelope(Envelope::event(MessageType::ThemeUpdate, None));
        let err = a.port.post(msg).await.unwrap_err();
        assert!(matches!(err, PortError::Closed { .. }));
    }
}
