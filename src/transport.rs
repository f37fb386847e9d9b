//! Socket transport: a WebSocket client speaking the JSON envelope of [`crate::protocol`].
//!
//! ## Design
//! - `connect` splits the socket; a writer task drains an outbound channel, a
//!   reader task decodes frames into an inbound channel
//! - `Inbound::Connected` is always the first inbound event
//! - When the peer closes, the inbound channel ends; nothing is retried

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

use crate::error::{ChatError, Result};
use crate::protocol::{Inbound, Outbound, WireDialect};

/// Outbound side of a connection, as seen by the controller.
pub trait Transport {
    /// Queue an event for sending. Never blocks.
    fn emit(&mut self, event: Outbound) -> Result<()>;
}

impl Transport for mpsc::UnboundedSender<Outbound> {
    fn emit(&mut self, event: Outbound) -> Result<()> {
        self.send(event).map_err(|_| ChatError::TransportClosed)
    }
}

/// A live WebSocket connection.
pub struct SocketTransport {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl SocketTransport {
    /// Connect to `url` and spawn the reader and writer tasks.
    ///
    /// Returns the transport plus the ordered stream of inbound events.
    pub async fn connect(
        url: &str,
        dialect: WireDialect,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Inbound>)> {
        let (ws, _response) = tokio_tungstenite::connect_async(url).await?;
        info!(url, %dialect, "connected");
        let (mut sink, mut stream) = ws.split();

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Outbound>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<Inbound>();
        let _ = in_tx.send(Inbound::Connected);

        tokio::spawn(async move {
            while let Some(event) = out_rx.recv().await {
                let text = event.to_frame(dialect).to_string();
                if let Err(e) = sink.send(WsMessage::Text(text)).await {
                    warn!(error = %e, "send failed; writer stopping");
                    break;
                }
            }
            let _ = sink.close().await;
        });

        tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(WsMessage::Text(text)) => match Inbound::from_frame(&text, dialect) {
                        Some(event) => {
                            if in_tx.send(event).is_err() {
                                break;
                            }
                        }
                        None => debug!(frame = %text, "ignored inbound frame"),
                    },
                    Ok(WsMessage::Close(_)) => break,
                    Ok(_) => {} // binary / ping / pong
                    Err(e) => {
                        warn!(error = %e, "socket read failed");
                        break;
                    }
                }
            }
            info!("connection closed");
        });

        Ok((SocketTransport { tx: out_tx }, in_rx))
    }
}

impl Transport for SocketTransport {
    fn emit(&mut self, event: Outbound) -> Result<()> {
        self.tx.emit(event)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::OutboundMessage;
    use tokio::net::TcpListener;

    #[test]
    fn test_channel_transport_forwards() {
        let (mut tx, mut rx) = mpsc::unbounded_channel::<Outbound>();
        tx.emit(Outbound::Handshake).unwrap();
        assert_eq!(rx.try_recv().unwrap(), Outbound::Handshake);
    }

    #[test]
    fn test_channel_transport_closed_errors() {
        let (mut tx, rx) = mpsc::unbounded_channel::<Outbound>();
        drop(rx);
        assert!(matches!(tx.emit(Outbound::Handshake), Err(ChatError::TransportClosed)));
    }

    #[tokio::test]
    async fn test_connect_refused_errors() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let result = SocketTransport::connect(&format!("ws://127.0.0.1:{port}"), WireDialect::Portuguese).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_socket_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            let first = ws.next().await.unwrap().unwrap();
            for ev in [Inbound::StreamChunk("oi".into()), Inbound::StreamEnd] {
                let frame = ev.to_frame(WireDialect::Portuguese).unwrap().to_string();
                ws.send(WsMessage::Text(frame)).await.unwrap();
            }
            ws.close(None).await.unwrap();
            first.into_text().unwrap()
        });

        let (mut transport, mut inbound) =
            SocketTransport::connect(&format!("ws://127.0.0.1:{port}"), WireDialect::Portuguese)
                .await
                .unwrap();
        transport
            .emit(Outbound::Send(OutboundMessage {
                text: "olá".into(),
                attachment: None,
            }))
            .unwrap();

        assert_eq!(inbound.recv().await, Some(Inbound::Connected));
        assert_eq!(inbound.recv().await, Some(Inbound::StreamChunk("oi".into())));
        assert_eq!(inbound.recv().await, Some(Inbound::StreamEnd));
        assert_eq!(inbound.recv().await, None);

        let sent: serde_json::Value = serde_json::from_str(&server.await.unwrap()).unwrap();
        assert_eq!(sent["event"], "enviar_mensagem");
        assert_eq!(sent["data"]["mensagem"], "olá");
    }
}
