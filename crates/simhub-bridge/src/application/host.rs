//! Host side of the frame bridge.
//!
//! The shell owns one [`HostBridge`] for all guest frames.  Each frame is
//! registered with its outbound port and receives a [`FrameId`]; the frame
//! set drives broadcast fan-out and routes request responses back to the
//! frame that asked.
//!
//! The host implements a small capability surface for guests:
//!
//! - `AUTH_TOKEN_GET`: answered from the injected [`TokenStore`];
//! - `NOTIFY`: forwarded to the injected [`Notifier`], no response;
//! - `NAVIGATE`: recognised, logged, and dropped.
//!
//! Capabilities are injected rather than reached for globally, so tests and
//! embedders swap them freely.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use simhub_core::protocol::envelope::{Envelope, MessageType, Response, WireMessage};

use crate::application::guest::BridgeError;
use crate::domain::origin::OriginPolicy;
use crate::infrastructure::port::{MessagePort, PortError};

/// Opaque handle for one registered guest frame.
pub type FrameId = Uuid;

// ── Injected capabilities ─────────────────────────────────────────────────────

/// Source of the shell's current auth token.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// The current token, or `None` when no session is active.
    async fn auth_token(&self) -> Option<String>;
}

/// Sink for guest-raised notifications.
pub trait Notifier: Send + Sync {
    /// Surfaces one notification to the operator.
    fn notify(&self, notification: Notification);
}

/// Severity of a guest notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyLevel {
    Success,
    Warning,
    #[default]
    Info,
    Error,
}

/// A notification a guest asked the shell to surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotifyLevel,
    pub title: String,
    pub message: String,
}

/// Wire shape of a NOTIFY payload.  Every field is optional on the wire;
/// defaults are applied when building the [`Notification`].
#[derive(Debug, Default, Deserialize)]
struct NotifyPayload {
    #[serde(rename = "type", default)]
    level: Option<NotifyLevel>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

const DEFAULT_NOTIFY_TITLE: &str = "Message from module";

// ── Host bridge ───────────────────────────────────────────────────────────────

/// The shell's end of every frame boundary.
pub struct HostBridge {
    frames: RwLock<HashMap<FrameId, Arc<dyn MessagePort>>>,
    policy: OriginPolicy,
    tokens: Arc<dyn TokenStore>,
    notifier: Arc<dyn Notifier>,
}

impl HostBridge {
    /// Builds a host bridge with its capabilities injected.
    pub fn new(policy: OriginPolicy, tokens: Arc<dyn TokenStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            frames: RwLock::new(HashMap::new()),
            policy,
            tokens,
            notifier,
        }
    }

    /// Registers a guest frame's outbound port.
    ///
    /// # Errors
    ///
    /// [`BridgeError::OriginDenied`] when the frame's origin is outside the
    /// allow-list.
    pub async fn register(&self, port: Arc<dyn MessagePort>) -> Result<FrameId, BridgeError> {
        let origin = port.origin().to_string();
        if !self.policy.permits(&origin) {
            warn!(%origin, "rejecting frame from untrusted origin");
            return Err(BridgeError::OriginDenied { origin });
        }
        let id = Uuid::new_v4();
        self.frames.write().await.insert(id, port);
        info!(frame = %id, %origin, "guest frame registered");
        Ok(id)
    }

    /// Removes a frame from the set.  Unknown ids are a no-op.
    pub async fn unregister(&self, id: FrameId) {
        if self.frames.write().await.remove(&id).is_some() {
            info!(frame = %id, "guest frame unregistered");
        }
    }

    /// Number of currently registered frames.
    pub async fn frame_count(&self) -> usize {
        self.frames.read().await.len()
    }

    /// Posts one event envelope to every registered frame.
    ///
    /// Frames whose port has closed are skipped; a torn-down frame is the
    /// transport's problem to report, not a reason to starve its siblings.
    pub async fn broadcast(&self, kind: MessageType, payload: Option<serde_json::Value>) {
        // Snapshot the set first: ports are bounded channels, and a post to
        // a full inbox blocks.  The lock must not be held across that wait
        // or register/unregister stall behind one slow frame.
        let frames: Vec<(FrameId, Arc<dyn MessagePort>)> = self
            .frames
            .read()
            .await
            .iter()
            .map(|(id, port)| (*id, Arc::clone(port)))
            .collect();
        for (id, port) in frames {
            let envelope = Envelope::event(kind, payload.clone());
            if let Err(PortError::Closed { origin }) =
                port.post(WireMessage::Envelope(envelope)).await
            {
                debug!(frame = %id, %origin, "skipping closed frame during broadcast");
            }
        }
    }

    /// Feeds one inbound message from a registered frame into the host.
    ///
    /// Request envelopes are answered on the same frame's port.  Events are
    /// dispatched to the matching capability.  Anything else is logged and
    /// dropped.
    pub async fn handle_inbound(&self, frame: FrameId, message: WireMessage) {
        let envelope = match message {
            WireMessage::Envelope(envelope) => envelope,
            WireMessage::Response(response) => {
                // The host never issues requests toward guests today, so a
                // response from a guest has nothing to correlate with.
                debug!(frame = %frame, id = %response.id, "unsolicited response from guest, dropping");
                return;
            }
        };

        match envelope.kind {
            MessageType::AuthTokenGet if envelope.expects_response() => {
                let reply = match self.tokens.auth_token().await {
                    Some(token) => Response::ok(envelope.id, json!({ "token": token })),
                    None => Response::failure(envelope.id, "auth token unavailable"),
                };
                self.reply(frame, reply).await;
            }
            MessageType::Notify => {
                let payload: NotifyPayload = envelope
                    .payload
                    .and_then(|v| serde_json::from_value(v).ok())
                    .unwrap_or_default();
                self.notifier.notify(Notification {
                    level: payload.level.unwrap_or_default(),
                    title: payload.title.unwrap_or_else(|| DEFAULT_NOTIFY_TITLE.to_string()),
                    message: payload.message.unwrap_or_default(),
                });
            }
            MessageType::Navigate => {
                warn!(frame = %frame, "NAVIGATE is not supported by this shell, dropping");
            }
            other => {
                debug!(frame = %frame, kind = other.name(), "unhandled guest message, dropping");
            }
        }
    }

    async fn reply(&self, frame: FrameId, response: Response) {
        let port = self.frames.read().await.get(&frame).cloned();
        match port {
            Some(port) => {
                if let Err(err) = port.post(WireMessage::Response(response)).await {
                    debug!(frame = %frame, %err, "frame gone before reply could be posted");
                }
            }
            None => {
                debug!(frame = %frame, "reply targeted an unregistered frame, dropping");
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
