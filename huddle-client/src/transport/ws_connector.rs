use crate::error::ConnectionError;
use crate::transport::{
    DisconnectReason, SignalingConnection, SignalingConnector, SignalingEvents, SignalingSender,
    TransportEvent,
};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use huddle_core::SignalMessage;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, error, info, warn};

/// WebSocket signaling transport: one JSON text frame per message.
#[derive(Debug, Clone, Default)]
pub struct WsConnector;

#[async_trait]
impl SignalingConnector for WsConnector {
    async fn connect(&self, endpoint: &str) -> Result<SignalingConnection, ConnectionError> {
        let (socket, _) = tokio_tungstenite::connect_async(endpoint)
            .await
            .map_err(|e| ConnectionError::Connect {
                endpoint: endpoint.to_owned(),
                reason: e.to_string(),
            })?;
        info!("Signaling connected: {}", endpoint);

        let (mut sink, mut stream) = socket.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<SignalMessage>();
        let (in_tx, in_rx) = mpsc::unbounded_channel();

        let mut send_task = tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                let json = match serde_json::to_string(&msg) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Failed to serialize signal message: {}", e);
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(json.into())).await {
                    return DisconnectReason::Error(e.to_string());
                }
            }
            let _ = sink.send(Message::Close(None)).await;
            DisconnectReason::Normal
        });

        let mut recv_task = tokio::spawn({
            let in_tx = in_tx.clone();
            async move {
                while let Some(frame) = stream.next().await {
                    match frame {
                        Ok(Message::Text(text)) => {
                            match serde_json::from_str::<SignalMessage>(&text) {
                                Ok(msg) => {
                                    debug!("Signal in: {}", msg.kind());
                                    if in_tx.send(TransportEvent::Message(msg)).is_err() {
                                        break;
                                    }
                                }
                                Err(e) => warn!("Invalid SignalMessage: {}", e),
                            }
                        }
                        Ok(Message::Close(_)) => break,
                        Ok(_) => {}
                        Err(e) => return DisconnectReason::Error(e.to_string()),
                    }
                }
                DisconnectReason::Normal
            }
        });

        tokio::spawn(async move {
            let finished = tokio::select! {
                res = (&mut send_task) => {
                    recv_task.abort();
                    res
                }
                res = (&mut recv_task) => {
                    send_task.abort();
                    res
                }
            };
            let reason =
                finished.unwrap_or_else(|e| DisconnectReason::Error(format!("io task failed: {e}")));
            info!("Signaling disconnected: {:?}", reason);
            let _ = in_tx.send(TransportEvent::Closed(reason));
        });

        Ok(SignalingConnection {
            sender: SignalingSender::new(out_tx),
            events: SignalingEvents::new(in_rx),
        })
    }
}
