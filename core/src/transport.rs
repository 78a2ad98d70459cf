// Transport: socket activity turned into typed events on a channel
use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::{Result, SnooperError};

/// Default endpoint of the local telemetry server
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8765";

/// Lifecycle and data events delivered by a transport
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Opened,
    /// Text payload
    Message(String),
    /// Binary payload, expected to hold UTF-8 JSON
    Binary(Vec<u8>),
    Closed,
    Errored(String),
}

/// Receive-only duplex channel
#[async_trait]
pub trait Transport: Send {
    /// Request closure without waiting. A no-op when already closed or errored.
    fn close(&mut self);

    /// Wait until the transport has stopped delivering events
    async fn closed(&mut self);
}

/// WebSocket client transport.
///
/// A background task owns the socket and forwards frames as [`TransportEvent`]s.
pub struct WebSocketTransport {
    close_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl WebSocketTransport {
    /// Start connecting to `endpoint`; events go to `events`
    pub fn connect(endpoint: &str, events: mpsc::Sender<TransportEvent>) -> Result<Self> {
        validate_endpoint(endpoint)?;
        let (close_tx, close_rx) = oneshot::channel();
        info!(endpoint = %endpoint, "Connecting");
        let task = tokio::spawn(run_socket(endpoint.to_string(), events, close_rx));
        Ok(Self {
            close_tx: Some(close_tx),
            task: Some(task),
        })
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    fn close(&mut self) {
        if let Some(tx) = self.close_tx.take() {
            // receiver is gone once the socket task finished on its own
            let _ = tx.send(());
        }
    }

    async fn closed(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Socket task ended abnormally");
            }
        }
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.close();
    }
}

/// Accepts plain `ws://` URLs with a non-empty host part.
/// The socket is built without TLS, so `wss://` is refused here.
pub fn validate_endpoint(endpoint: &str) -> Result<()> {
    if endpoint.starts_with("wss://") {
        return Err(SnooperError::Config(format!(
            "TLS endpoints are not supported, use ws://: {}",
            endpoint
        )));
    }
    let rest = endpoint.strip_prefix("ws://").ok_or_else(|| {
        SnooperError::Config(format!("endpoint must be a ws:// URL: {}", endpoint))
    })?;
    if rest.is_empty() || rest.starts_with('/') {
        return Err(SnooperError::Config(format!(
            "endpoint has no host: {}",
            endpoint
        )));
    }
    Ok(())
}

async fn run_socket(
    endpoint: String,
    events: mpsc::Sender<TransportEvent>,
    mut close_rx: oneshot::Receiver<()>,
) {
    let mut ws = tokio::select! {
        connected = connect_async(endpoint.as_str()) => match connected {
            Ok((ws, _)) => ws,
            Err(e) => {
                let _ = events.send(TransportEvent::Errored(e.to_string())).await;
                return;
            }
        },
        _ = &mut close_rx => {
            debug!("Closed before the connection was established");
            let _ = events.send(TransportEvent::Closed).await;
            return;
        }
    };

    if events.send(TransportEvent::Opened).await.is_err() {
        let _ = ws.close(None).await;
        return;
    }

    loop {
        let event = tokio::select! {
            _ = &mut close_rx => {
                if let Err(e) = ws.close(None).await {
                    debug!(error = %e, "Close handshake failed");
                }
                let _ = events.send(TransportEvent::Closed).await;
                break;
            }
            frame = ws.next() => match frame {
                Some(Ok(Message::Text(text))) => TransportEvent::Message(text),
                Some(Ok(Message::Binary(bytes))) => TransportEvent::Binary(bytes),
                Some(Ok(Message::Close(_))) | None => {
                    let _ = events.send(TransportEvent::Closed).await;
                    break;
                }
                // ping/pong are answered by tungstenite
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    let _ = events.send(TransportEvent::Errored(e.to_string())).await;
                    break;
                }
            }
        };
        if events.send(event).await.is_err() {
            debug!("Event receiver dropped; closing socket");
            let _ = ws.close(None).await;
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_endpoint() {
        assert!(validate_endpoint("ws://localhost:8765").is_ok());
        assert!(validate_endpoint("ws://10.0.0.2:9000/stream").is_ok());
        assert!(validate_endpoint("http://localhost:8765").is_err());
        assert!(validate_endpoint("ws://").is_err());
        assert!(validate_endpoint("localhost:8765").is_err());
    }

    #[test]
    fn test_tls_endpoint_rejected() {
        let err = validate_endpoint("wss://127.0.0.1:8765").unwrap_err();
        assert!(matches!(err, SnooperError::Config(_)));
        assert!(err.to_string().contains("TLS"));
    }
}
