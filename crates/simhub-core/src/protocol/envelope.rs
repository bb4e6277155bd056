//! JSON envelope types for host↔guest messaging.
//!
//! Every message that crosses the frame boundary is one of two JSON object
//! shapes:
//!
//! ```json
//! {"id":"<correlation>","type":"AUTH_TOKEN_GET","payload":null,"timestamp":1700000000000}
//! {"id":"<correlation>","success":true,"data":{"token":"..."}}
//! ```
//!
//! The first is an [`Envelope`]: a request that expects a correlated
//! [`Response`], or a fire-and-forget event carrying the sentinel id
//! [`EVENT_ID`].  The second is a [`Response`]: the single reply the host
//! owes a request.
//!
//! # Discrimination
//!
//! The transport delivers whole JSON documents with no outer tag.  The two
//! shapes are told apart structurally: a response always carries `success`,
//! an envelope always carries `type` and `timestamp`.  [`WireMessage`] is a
//! serde-untagged union that encodes this rule once so receivers do not
//! re-implement it.
//!
//! # Correlation invariants
//!
//! - A request id is unique among the sender's currently pending requests
//!   (ids are fresh UUID v4 strings; reuse would misroute responses).
//! - Exactly one response is applied per request id.  Receivers must treat
//!   a response whose id has no pending entry as a no-op.
//! - `data` is present iff `success` is true; `error` iff it is false.
//!   The [`Response::ok`] / [`Response::failure`] constructors enforce this.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};

/// Sentinel id carried by fire-and-forget event envelopes.
///
/// Events expect no response, so they all share this id instead of
/// consuming a fresh correlation token.
pub const EVENT_ID: &str = "evt";

// ── Message types ─────────────────────────────────────────────────────────────

/// The closed set of message kinds recognised on the bridge.
///
/// Serialized as the exact SCREAMING_SNAKE strings the wire protocol uses,
/// e.g. `"AUTH_TOKEN_GET"`.  An envelope whose `type` is not in this set
/// fails deserialization and is dropped by the receiving bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    /// Host → guest broadcast: the shell theme changed.
    ThemeUpdate,
    /// Guest → host request: fetch the current auth token.
    AuthTokenGet,
    /// Guest → host event: surface a toast/notification in the shell.
    Notify,
    /// Guest → host event: ask the shell to change route.
    ///
    /// Recognised but intentionally unimplemented on the host side; the
    /// host logs and drops it.
    Navigate,
    /// Reserved for 3D viewport synchronisation.  Unused.
    ViewportSync,
}

impl MessageType {
    /// Short name for log lines.
    pub fn name(self) -> &'static str {
        match self {
            MessageType::ThemeUpdate => "THEME_UPDATE",
            MessageType::AuthTokenGet => "AUTH_TOKEN_GET",
            MessageType::Notify => "NOTIFY",
            MessageType::Navigate => "NAVIGATE",
            MessageType::ViewportSync => "VIEWPORT_SYNC",
        }
    }
}

// ── Envelope (request/event) ──────────────────────────────────────────────────

/// A request or event envelope.
///
/// Requests carry a fresh UUID v4 `id` and expect exactly one [`Response`]
/// with the same id.  Events carry [`EVENT_ID`] and expect nothing back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Correlation token.  Unique per pending request; `"evt"` for events.
    pub id: String,
    /// Message kind, serialized into the JSON `type` field.
    #[serde(rename = "type")]
    pub kind: MessageType,
    /// Kind-dependent structured data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Capture time in milliseconds since the Unix epoch.  Informational
    /// only; receivers never branch on it.
    pub timestamp: u64,
}

impl Envelope {
    /// Builds a request envelope with a fresh correlation id.
    pub fn request(kind: MessageType, payload: Option<Value>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            payload,
            timestamp: now_millis(),
        }
    }

    /// Builds a fire-and-forget event envelope carrying the sentinel id.
    pub fn event(kind: MessageType, payload: Option<Value>) -> Self {
        Self {
            id: EVENT_ID.to_string(),
            kind,
            payload,
            timestamp: now_millis(),
        }
    }

    /// True when this envelope is a request that expects a response.
    pub fn expects_response(&self) -> bool {
        self.id != EVENT_ID
    }
}

// ── Response ──────────────────────────────────────────────────────────────────

/// The single reply a request envelope is owed.
///
/// `data` and `error` are mutually exclusive; use [`Response::ok`] and
/// [`Response::failure`] rather than building the struct by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Must equal the originating request's id.
    pub id: String,
    /// Outcome flag.
    pub success: bool,
    /// Result value.  Present iff `success`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Human-readable failure description.  Present iff not `success`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    /// Builds a success response for the given request id.
    pub fn ok(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Builds a failure response carrying an error description.
    pub fn failure(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

// ── Untagged union ────────────────────────────────────────────────────────────

/// Either wire shape, resolved structurally.
///
/// Serde tries [`Response`] first: the `success` field is required there
/// and absent from envelopes, so the two never collide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireMessage {
    /// `{id, success, data?, error?}`
    Response(Response),
    /// `{id, type, payload?, timestamp}`
    Envelope(Envelope),
}

/// Milliseconds since the Unix epoch, saturating at zero for a clock set
/// before 1970.
fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_type_serializes_to_screaming_snake() {
        let json = serde_json::to_string(&MessageType::AuthTokenGet).unwrap();
        assert_eq!(json, r#""AUTH_TOKEN_GET""#);
    }

    #[test]
    fn test_message_type_round_trips_all_variants() {
        for kind in [
            MessageType::ThemeUpdate,
            MessageType::AuthTokenGet,
            MessageType::Notify,
            MessageType::Navigate,
            MessageType::ViewportSync,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            let decoded: MessageType = serde_json::from_str(&json).unwrap();
            assert_eq!(kind, decoded);
        }
    }

    #[test]
    fn test_unknown_message_type_fails_deserialization() {
        let result: Result<MessageType, _> = serde_json::from_str(r#""SELF_DESTRUCT""#);
        assert!(result.is_err(), "unknown type must not parse");
    }

    #[test]
    fn test_request_envelope_gets_fresh_unique_ids() {
        let a = Envelope::request(MessageType::AuthTokenGet, None);
        let b = Envelope::request(MessageType::AuthTokenGet, None);
        assert_ne!(a.id, b.id, "every request must get a fresh correlation id");
        assert!(a.expects_response());
    }

    #[test]
    fn test_event_envelope_uses_sentinel_id() {
        let e = Envelope::event(MessageType::Notify, Some(json!({"message": "hi"})));
        assert_eq!(e.id, EVENT_ID);
        assert!(!e.expects_response());
    }

    #[test]
    fn test_envelope_serializes_type_field_name() {
        // The wire field is `type`, not `kind`.
        let e = Envelope::request(MessageType::Notify, None);
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["type"], "NOTIFY");
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn test_envelope_without_payload_omits_the_field() {
        let e = Envelope::request(MessageType::AuthTokenGet, None);
        let json = serde_json::to_value(&e).unwrap();
        assert!(json.get("payload").is_none());
    }

    #[test]
    fn test_response_ok_carries_data_and_no_error() {
        let r = Response::ok("abc", json!({"token": "t"}));
        assert!(r.success);
        assert_eq!(r.data, Some(json!({"token": "t"})));
        assert!(r.error.is_none());
    }

    #[test]
    fn test_response_failure_carries_error_and_no_data() {
        let r = Response::failure("abc", "auth token unavailable");
        assert!(!r.success);
        assert!(r.data.is_none());
        assert_eq!(r.error.as_deref(), Some("auth token unavailable"));
    }

    #[test]
    fn test_wire_message_decodes_response_shape() {
        let json = r#"{"id":"r1","success":true,"data":{"token":"t"}}"#;
        let msg: WireMessage = serde_json::from_str(json).unwrap();
        match msg {
            WireMessage::Response(r) => {
                assert_eq!(r.id, "r1");
                assert!(r.success);
            }
            other => panic!("expected Response, got {:?}", other),
        }
    }

    #[test]
    fn test_wire_message_decodes_envelope_shape() {
        let json = r#"{"id":"evt","type":"NOTIFY","payload":{"message":"hi"},"timestamp":1700000000000}"#;
        let msg: WireMessage = serde_json::from_str(json).unwrap();
        match msg {
            WireMessage::Envelope(e) => {
                assert_eq!(e.kind, MessageType::Notify);
                assert_eq!(e.id, EVENT_ID);
            }
            other => panic!("expected Envelope, got {:?}", other),
        }
    }

    #[test]
    fn test_wire_message_rejects_untyped_garbage() {
        // Neither shape: has an id but no success/type/timestamp.
        let result: Result<WireMessage, _> = serde_json::from_str(r#"{"id":"x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_failure_response_round_trips() {
        let original = Response::failure("r9", "timeout");
        let json = serde_json::to_string(&original).unwrap();
        let decoded: Response = serde_json::from_str(&json).unwrap();
        assert_eq!(original, decoded);
    }
}
