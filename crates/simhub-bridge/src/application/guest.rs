//! Guest side of the frame bridge.
//!
//! A guest module runs inside a frame owned by the shell and talks to it
//! through one [`MessagePort`].  The bridge gives the module three verbs:
//!
//! - [`GuestBridge::call`]: request/response with correlation and a timeout;
//! - [`GuestBridge::emit`]: fire-and-forget event toward the host;
//! - [`GuestBridge::on`]: subscribe a handler for host-pushed events.
//!
//! Correlation lives in a pending table keyed by request id.  The timeout
//! path and the response path race on that table: whichever removes the
//! entry first wins, so a response arriving after the deadline is a no-op
//! and a response racing the deadline is still delivered.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace, warn};

use simhub_core::protocol::envelope::{Envelope, MessageType, Response, WireMessage};

use crate::domain::config::BridgeConfig;
use crate::infrastructure::port::{MessagePort, PortError};

/// Handler for a host-pushed event.  Receives the envelope payload.
pub type EventHandler = Arc<dyn Fn(Option<Value>) + Send + Sync>;

/// What a call can come back with when it does not come back with data.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// No response arrived within the configured call timeout.
    #[error("{} timed out waiting for the host", .kind.name())]
    Timeout {
        /// The request kind that expired.
        kind: MessageType,
    },

    /// The host answered with `success: false`.
    #[error("{} rejected by host: {message}", .kind.name())]
    Remote {
        /// The request kind that was rejected.
        kind: MessageType,
        /// The host's error description.
        message: String,
    },

    /// The host answered successfully but the data had the wrong shape.
    #[error("{} returned malformed data", .kind.name())]
    MalformedResponse {
        /// The request kind whose data failed to parse.
        kind: MessageType,
    },

    /// The underlying port refused the post.
    #[error(transparent)]
    Port(#[from] PortError),

    /// The peer's origin is outside this bridge's allow-list.
    #[error("refusing to attach to untrusted origin {origin}")]
    OriginDenied {
        /// The rejected origin.
        origin: String,
    },
}

// ── Guest bridge ──────────────────────────────────────────────────────────────

/// The guest end of a frame boundary.
///
/// Cheap to share: wrap in an [`Arc`] and hand clones to whatever parts of
/// the module need to talk to the shell.
pub struct GuestBridge {
    port: Arc<dyn MessagePort>,
    config: BridgeConfig,
    pending: Mutex<HashMap<String, oneshot::Sender<Response>>>,
    handlers: Mutex<HashMap<MessageType, EventHandler>>,
}

impl std::fmt::Debug for GuestBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuestBridge")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl GuestBridge {
    /// Attaches a guest bridge to a port.
    ///
    /// # Errors
    ///
    /// [`BridgeError::OriginDenied`] when the port's remote origin is not
    /// permitted by `config.origins`.
    pub fn attach(port: Arc<dyn MessagePort>, config: BridgeConfig) -> Result<Self, BridgeError> {
        if !config.origins.permits(port.origin()) {
            return Err(BridgeError::OriginDenied {
                origin: port.origin().to_string(),
            });
        }
        Ok(Self {
            port,
            config,
            pending: Mutex::new(HashMap::new()),
            handlers: Mutex::new(HashMap::new()),
        })
    }

    /// Sends a request and waits for its correlated response.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::Timeout`] after `config.call_timeout` with no reply;
    /// - [`BridgeError::Remote`] when the host answers `success: false`;
    /// - [`BridgeError::Port`] when the post itself fails.
    pub async fn call(&self, kind: MessageType, payload: Option<Value>) -> Result<Value, BridgeError> {
        let envelope = Envelope::request(kind, payload);
        let id = envelope.id.clone();

        let (tx, mut rx) = oneshot::channel();
        self.lock_pending().insert(id.clone(), tx);

        if let Err(err) = self.port.post(WireMessage::Envelope(envelope)).await {
            self.lock_pending().remove(&id);
            return Err(err.into());
        }

        let deadline = tokio::time::sleep(self.config.call_timeout);
        tokio::pin!(deadline);

        tokio::select! {
            outcome = &mut rx => match outcome {
                Ok(response) => Self::unwrap_response(kind, response),
                // Sender dropped without a send only happens when the bridge
                // is torn down; surface it as a closed port.
                Err(_) => Err(BridgeError::Port(PortError::Closed {
                    origin: self.port.origin().to_string(),
                })),
            },
            _ = &mut deadline => {
                // Deadline elapsed.  If the entry is still in the table the
                // response never came; if it is gone the response raced the
                // deadline and is already in the channel, so deliver it.
                if self.lock_pending().remove(&id).is_some() {
                    debug!(kind = kind.name(), id = %id, "call timed out");
                    Err(BridgeError::Timeout { kind })
                } else {
                    match rx.await {
                        Ok(response) => Self::unwrap_response(kind, response),
                        Err(_) => Err(BridgeError::Timeout { kind }),
                    }
                }
            }
        }
    }

    /// Sends a fire-and-forget event toward the host.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Port`] when the post fails.
    pub async fn emit(&self, kind: MessageType, payload: Option<Value>) -> Result<(), BridgeError> {
        let envelope = Envelope::event(kind, payload);
        self.port.post(WireMessage::Envelope(envelope)).await?;
        Ok(())
    }

    /// Registers a handler for host-pushed events of one kind.
    ///
    /// Last writer wins: registering a second handler for the same kind
    /// silently replaces the first.
    pub fn on(&self, kind: MessageType, handler: EventHandler) {
        self.lock_handlers().insert(kind, handler);
    }

    /// Feeds one inbound message into the bridge.
    ///
    /// Responses are routed to their pending call; a response whose id has
    /// no pending entry (late, duplicate, or never ours) is a logged no-op.
    /// Envelopes dispatch to the registered handler for their kind, or are
    /// dropped when none is registered.
    pub fn handle_inbound(&self, message: WireMessage) {
        match message {
            WireMessage::Response(response) => {
                let waiter = self.lock_pending().remove(&response.id);
                match waiter {
                    Some(tx) => {
                        // A dropped receiver means the caller already gave
                        // up; nothing left to do.
                        let _ = tx.send(response);
                    }
                    None => {
                        trace!(id = %response.id, "response with no pending call, ignoring");
                    }
                }
            }
            WireMessage::Envelope(envelope) => {
                let handler = self.lock_handlers().get(&envelope.kind).cloned();
                match handler {
                    Some(handler) => handler(envelope.payload),
                    None => {
                        trace!(kind = envelope.kind.name(), "no handler for host event, dropping");
                    }
                }
            }
        }
    }

    /// Pumps an inbox into [`Self::handle_inbound`] until the channel closes.
    pub async fn run(self: Arc<Self>, mut inbox: mpsc::Receiver<WireMessage>) {
        while let Some(message) = inbox.recv().await {
            self.handle_inbound(message);
        }
        debug!(origin = self.port.origin(), "guest inbox closed, bridge stopping");
    }

    // ── Convenience wrappers over `call`/`emit` ──────────────────────────────

    /// Fetches the shell's current auth token.
    ///
    /// # Errors
    ///
    /// Everything [`Self::call`] can fail with, plus
    /// [`BridgeError::MalformedResponse`] when the reply lacks a string
    /// `token` field.
    pub async fn auth_token(&self) -> Result<String, BridgeError> {
        let data = self.call(MessageType::AuthTokenGet, None).await?;
        data.get("token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(BridgeError::MalformedResponse {
                kind: MessageType::AuthTokenGet,
            })
    }

    /// Asks the shell to surface a notification.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Port`] when the post fails.
    pub async fn notify(&self, level: &str, title: Option<&str>, message: &str) -> Result<(), BridgeError> {
        let mut payload = serde_json::Map::new();
        payload.insert("type".into(), Value::String(level.to_string()));
        if let Some(title) = title {
            payload.insert("title".into(), Value::String(title.to_string()));
        }
        payload.insert("message".into(), Value::String(message.to_string()));
        self.emit(MessageType::Notify, Some(Value::Object(payload))).await
    }

    /// Number of calls currently awaiting a response.
    pub fn pending_calls(&self) -> usize {
        self.lock_pending().len()
    }

    fn unwrap_response(kind: MessageType, response: Response) -> Result<Value, BridgeError> {
        if response.success {
            Ok(response.data.unwrap_or(Value::Null))
        } else {
            Err(BridgeError::Remote {
                kind,
                message: response
                    .error
                    .unwrap_or_else(|| "unspecified host error".to_string()),
            })
        }
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, HashMap<String, oneshot::Sender<Response>>> {
        match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("pending table mutex poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn lock_handlers(&self) -> std::sync::MutexGuard<'_, HashMap<MessageType, EventHandler>> {
        match self.handlers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("handler table mutex poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
