//! WebSocket client capability implementation.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Notify, mpsc};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, trace, warn};

use retort_core::{
    BoxedConnectionHandler, ClientConfig, ConnectionHandle, ConnectionInfo, TransportError,
    TransportResult, WsClientCapability,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// WebSocket client capability implementation.
pub struct WsClientCapabilityImpl;

impl WsClientCapabilityImpl {
    /// Creates a new WebSocket client capability.
    pub fn new() -> Self {
        Self
    }
}

impl Default for WsClientCapabilityImpl {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WsClientCapability for WsClientCapabilityImpl {
    async fn connect(
        &self,
        url: &str,
        handler: BoxedConnectionHandler,
        config: ClientConfig,
    ) -> TransportResult<ConnectionHandle> {
        let url = url.to_string();

        let (message_tx, message_rx) = mpsc::channel::<Vec<u8>>(256);
        let reconnect = Arc::new(Notify::new());
        let shutdown = CancellationToken::new();
        let handle = ConnectionHandle::new(message_tx, Arc::clone(&reconnect), shutdown.clone());

        info!(url = %url, "Connecting to WebSocket server");

        let (ws_stream, _response) =
            connect_async(&url)
                .await
                .map_err(|e| TransportError::ConnectionFailed {
                    url: url.clone(),
                    reason: format!("WebSocket connection failed: {e}"),
                })?;

        info!(url = %url, "WebSocket client connected");
        handler.on_connect(connection_info(&url), handle.clone()).await;

        tokio::spawn(run_client_loop(
            ws_stream,
            message_rx,
            reconnect,
            shutdown,
            handler,
            handle.clone(),
            url,
            config,
        ));

        Ok(handle)
    }
}

fn connection_info(url: &str) -> ConnectionInfo {
    ConnectionInfo::new("websocket").with_metadata("url", url)
}

/// Runs the WebSocket client loop with reconnection support.
#[allow(clippy::too_many_arguments)]
async fn run_client_loop(
    ws_stream: WsStream,
    mut message_rx: mpsc::Receiver<Vec<u8>>,
    reconnect: Arc<Notify>,
    shutdown: CancellationToken,
    handler: BoxedConnectionHandler,
    handle: ConnectionHandle,
    url: String,
    config: ClientConfig,
) {
    let (mut ws_tx, mut ws_rx): (WsSink, WsSource) = ws_stream.split();

    loop {
        let reason = tokio::select! {
            () = shutdown.cancelled() => {
                info!(url = %url, "WebSocket client shutting down");
                let _ = ws_tx.close().await;
                break;
            }

            () = reconnect.notified() => {
                let _ = ws_tx.close().await;
                "reconnect requested"
            }

            Some(data) = message_rx.recv() => {
                let msg = Message::Text(String::from_utf8_lossy(&data).to_string().into());
                if let Err(e) = ws_tx.send(msg).await {
                    warn!(error = %e, "Failed to send frame");
                }
                continue;
            }

            msg = ws_rx.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    trace!(len = text.len(), "Received text");
                    handler.on_message(text.as_bytes()).await;
                    continue;
                }
                Some(Ok(Message::Binary(data))) => {
                    trace!(len = data.len(), "Received binary");
                    handler.on_message(&data).await;
                    continue;
                }
                Some(Ok(Message::Ping(data))) => {
                    trace!("Received ping, sending pong");
                    let _ = ws_tx.send(Message::Pong(data)).await;
                    continue;
                }
                Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => continue,
                Some(Ok(Message::Close(frame))) => {
                    info!(url = %url, frame = ?frame, "Server closed connection");
                    "server closed connection"
                }
                Some(Err(e)) => {
                    warn!(url = %url, error = %e, "WebSocket error");
                    "websocket error"
                }
                None => "stream ended",
            },
        };

        let requested = reason == "reconnect requested";
        if !requested && !config.auto_reconnect {
            info!(url = %url, reason, "Connection lost, not reconnecting");
            break;
        }

        match reconnect_with_backoff(&url, &config, &shutdown).await {
            Some(stream) => {
                (ws_tx, ws_rx) = stream.split();
                handler.on_connect(connection_info(&url), handle.clone()).await;
            }
            None => break,
        }
    }

    handler.on_disconnect().await;
}

/// Reconnects with exponential backoff.
///
/// Returns `None` when retries are exhausted or shutdown was requested.
async fn reconnect_with_backoff(
    url: &str,
    config: &ClientConfig,
    shutdown: &CancellationToken,
) -> Option<WsStream> {
    let mut retry_count = 0u32;
    let mut delay = config.initial_delay;

    loop {
        if let Some(max) = config.max_retries
            && retry_count >= max
        {
            error!(url = %url, retries = retry_count, "Max retries reached, giving up");
            return None;
        }

        warn!(url = %url, delay = ?delay, "Reconnecting...");
        tokio::select! {
            () = shutdown.cancelled() => return None,
            () = tokio::time::sleep(delay) => {}
        }

        match connect_async(url).await {
            Ok((stream, _)) => {
                info!(url = %url, "Reconnected successfully");
                return Some(stream);
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Reconnection failed");
                retry_count += 1;
                delay = config.next_delay(delay);
            }
        }
    }
}
