//! The host↔guest wire protocol.
//!
//! Everything that crosses the frame boundary is one of two JSON object
//! shapes, defined in [`envelope`].  There is no binary framing: the
//! embedding transport (in-memory port, WebSocket text frame, browser
//! `postMessage`) delivers whole JSON documents.

pub mod envelope;
