use crate::error::ConnectionError;
use async_trait::async_trait;
use huddle_core::SignalMessage;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    Normal,
    Error(String),
}

/// Inbound side of a signaling connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Message(SignalMessage),
    /// Terminal. Nothing follows it.
    Closed(DisconnectReason),
}

/// Opens signaling connections. Each call yields an independent connection.
#[async_trait]
pub trait SignalingConnector: Send + Sync {
    async fn connect(&self, endpoint: &str) -> Result<SignalingConnection, ConnectionError>;
}

/// Outbound half. Cloneable; sends never wait for delivery and keep
/// FIFO order per connection.
#[derive(Debug, Clone)]
pub struct SignalingSender {
    tx: mpsc::UnboundedSender<SignalMessage>,
}

impl SignalingSender {
    pub(crate) fn new(tx: mpsc::UnboundedSender<SignalMessage>) -> Self {
        Self { tx }
    }

    pub fn send(&self, msg: SignalMessage) -> Result<(), ConnectionError> {
        self.tx.send(msg).map_err(|_| ConnectionError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Inbound half: messages in arrival order, then exactly one `Closed`.
#[derive(Debug)]
pub struct SignalingEvents {
    rx: mpsc::UnboundedReceiver<TransportEvent>,
    finished: bool,
}

impl SignalingEvents {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<TransportEvent>) -> Self {
        Self {
            rx,
            finished: false,
        }
    }

    pub async fn next(&mut self) -> Option<TransportEvent> {
        if self.finished {
            return None;
        }

        match self.rx.recv().await {
            Some(TransportEvent::Closed(reason)) => {
                self.finished = true;
                Some(TransportEvent::Closed(reason))
            }
            Some(event) => Some(event),
            None => {
                self.finished = true;
                Some(TransportEvent::Closed(DisconnectReason::Error(
                    "signaling transport dropped".to_owned(),
                )))
            }
        }
    }
}

pub struct SignalingConnection {
    pub sender: SignalingSender,
    pub events: SignalingEvents,
}

impl SignalingConnection {
    /// Connection backed by in-process channels. The returned endpoint plays
    /// the server's role.
    pub fn in_memory() -> (Self, ChannelEndpoint) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();

        let connection = Self {
            sender: SignalingSender::new(out_tx),
            events: SignalingEvents::new(in_rx),
        };
        let endpoint = ChannelEndpoint {
            outgoing: out_rx,
            incoming: in_tx,
        };

        (connection, endpoint)
    }
}

/// Far end of an in-memory connection.
pub struct ChannelEndpoint {
    /// Frames the client sent.
    pub outgoing: mpsc::UnboundedReceiver<SignalMessage>,
    /// Events delivered to the client.
    pub incoming: mpsc::UnboundedSender<TransportEvent>,
}

impl ChannelEndpoint {
    pub fn deliver(&self, msg: SignalMessage) -> bool {
        self.incoming.send(TransportEvent::Message(msg)).is_ok()
    }

    pub fn close(&self, reason: DisconnectReason) {
        let _ = self.incoming.send(TransportEvent::Closed(reason));
    }

    pub async fn next_sent(&mut self) -> Option<SignalMessage> {
        self.outgoing.recv().await
    }
}
