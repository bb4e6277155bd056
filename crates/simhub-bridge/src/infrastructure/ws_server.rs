//! WebSocket endpoint for out-of-process guests.
//!
//! Browser-embedded guests talk to the shell through their frame's message
//! port; guests running as separate processes (dev servers, headless tools)
//! connect here instead.  Each accepted socket becomes one registered frame
//! on the [`HostBridge`]:
//!
//! ```text
//!   guest process ──ws──▶ accept ──▶ register(WsPort) ──▶ HostBridge
//!                           │
//!                           ├─ writer task: outbound channel → socket text
//!                           └─ read loop:   socket text → handle_inbound
//! ```
//!
//! The socket's `Origin` header is the frame's origin for allow-list
//! checks; sockets without one get a synthetic `ws://<peer-addr>` origin.
//! When the socket closes, errors, or the process is shutting down, the
//! frame is unregistered so broadcasts stop targeting it.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response as HandshakeResponse};
use tokio_tungstenite::tungstenite::Message as WsFrame;
use tracing::{debug, info, warn};

use simhub_core::protocol::envelope::WireMessage;

use crate::application::host::HostBridge;
use crate::domain::config::BridgeConfig;
use crate::infrastructure::port::{MessagePort, PortError};

use async_trait::async_trait;

/// A registered frame backed by a WebSocket writer task.
struct WsPort {
    peer_origin: String,
    tx: mpsc::Sender<WireMessage>,
}

#[async_trait]
impl MessagePort for WsPort {
    fn origin(&self) -> &str {
        &self.peer_origin
    }

    async fn post(&self, message: WireMessage) -> Result<(), PortError> {
        self.tx.send(message).await.map_err(|_| PortError::Closed {
            origin: self.peer_origin.clone(),
        })
    }
}

/// Accepts guest sockets until `running` goes false.
///
/// # Errors
///
/// Returns an error only when the listener cannot be bound; per-connection
/// failures are logged and do not stop the endpoint.
pub async fn run_guest_endpoint(
    host: Arc<HostBridge>,
    config: BridgeConfig,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.ws_bind_addr)
        .await
        .with_context(|| format!("failed to bind guest endpoint on {}", config.ws_bind_addr))?;
    info!(addr = %config.ws_bind_addr, "guest endpoint listening");

    while running.load(Ordering::Relaxed) {
        // Short accept timeout so shutdown is noticed promptly.
        let accepted = tokio::time::timeout(Duration::from_millis(200), listener.accept()).await;
        let (stream, peer_addr) = match accepted {
            Ok(Ok(conn)) => conn,
            Ok(Err(err)) => {
                warn!(%err, "accept failed");
                continue;
            }
            Err(_) => continue,
        };

        let host = host.clone();
        let config = config.clone();
        tokio::spawn(async move {
            if let Err(err) = serve_guest(host, config, stream, peer_addr).await {
                debug!(%peer_addr, %err, "guest connection ended with error");
            }
        });
    }

    info!("guest endpoint stopped");
    Ok(())
}

/// Runs one guest socket from handshake to unregistration.
async fn serve_guest(
    host: Arc<HostBridge>,
    config: BridgeConfig,
    stream: TcpStream,
    peer_addr: SocketAddr,
) -> anyhow::Result<()> {
    // The Origin header is only visible inside the handshake callback.
    let origin_slot = Arc::new(Mutex::new(None::<String>));
    let slot = origin_slot.clone();
    let ws = tokio_tungstenite::accept_hdr_async(stream, move |req: &Request, res: HandshakeResponse| {
        if let Some(value) = req.headers().get("Origin").and_then(|v| v.to_str().ok()) {
            if let Ok(mut guard) = slot.lock() {
                *guard = Some(value.to_string());
            }
        }
        Ok(res)
    })
    .await
    .context("websocket handshake failed")?;

    let origin = origin_slot
        .lock()
        .ok()
        .and_then(|guard| guard.clone())
        .unwrap_or_else(|| format!("ws://{peer_addr}"));

    let (mut sink, mut source) = ws.split();
    let (tx, mut rx) = mpsc::channel::<WireMessage>(config.channel_capacity);

    let frame_id = match host
        .register(Arc::new(WsPort {
            peer_origin: origin.clone(),
            tx,
        }))
        .await
    {
        Ok(id) => id,
        Err(err) => {
            // Denied frames get a close, not a protocol-level error.
            let _ = sink.send(WsFrame::Close(None)).await;
            return Err(anyhow::anyhow!(err));
        }
    };
    debug!(frame = %frame_id, %origin, "guest socket registered");

    // Writer: host-originated messages out to the socket.
    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(err) => {
                    warn!(%err, "failed to encode outbound message, skipping");
                    continue;
                }
            };
            if sink.send(WsFrame::Text(text)).await.is_err() {
                break;
            }
        }
    });

    // Reader: socket text in to the host bridge.
    while let Some(frame) = source.next().await {
        match frame {
            Ok(WsFrame::Text(text)) => match serde_json::from_str::<WireMessage>(&text) {
                Ok(message) => host.handle_inbound(frame_id, message).await,
                Err(err) => {
                    warn!(frame = %frame_id, %err, "undecodable guest message, skipping");
                }
            },
            Ok(WsFrame::Close(_)) => break,
            Ok(WsFrame::Ping(_)) | Ok(WsFrame::Pong(_)) | Ok(WsFrame::Binary(_)) | Ok(WsFrame::Frame(_)) => {}
            Err(err) => {
                debug!(frame = %frame_id, %err, "guest socket error");
                break;
            }
        }
    }

    host.unregister(frame_id).await;
    writer.abort();
    info!(frame = %frame_id, %origin, "guest socket closed");
    Ok(())
}
