use async_trait::async_trait;
use huddle_client::error::ConnectionError;
use huddle_client::transport::{
    ChannelEndpoint, SignalingConnection, SignalingConnector, TransportEvent,
};
use huddle_core::SignalMessage;
use huddle_server::SignalingService;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

/// Hands the server side of every connection to the test.
pub struct ScriptedConnector {
    endpoints: mpsc::UnboundedSender<ChannelEndpoint>,
    refuse: AtomicBool,
    attempts: AtomicUsize,
}

impl ScriptedConnector {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<ChannelEndpoint>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            endpoints: tx,
            refuse: AtomicBool::new(false),
            attempts: AtomicUsize::new(0),
        });
        (connector, rx)
    }

    pub fn refuse(&self) {
        self.refuse.store(true, Ordering::SeqCst);
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SignalingConnector for ScriptedConnector {
    async fn connect(&self, endpoint: &str) -> Result<SignalingConnection, ConnectionError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.refuse.load(Ordering::SeqCst) {
            return Err(ConnectionError::Connect {
                endpoint: endpoint.to_owned(),
                reason: "refused".to_owned(),
            });
        }
        let (connection, server_side) = SignalingConnection::in_memory();
        let _ = self.endpoints.send(server_side);
        Ok(connection)
    }
}

/// Connects straight into an in-process [`SignalingService`].
#[derive(Clone)]
pub struct HubConnector {
    pub service: SignalingService,
}

impl HubConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            service: SignalingService::new(),
        })
    }
}

#[async_trait]
impl SignalingConnector for HubConnector {
    async fn connect(&self, _endpoint: &str) -> Result<SignalingConnection, ConnectionError> {
        let (connection, server_side) = SignalingConnection::in_memory();
        let ChannelEndpoint {
            mut outgoing,
            incoming,
        } = server_side;

        let (tx, mut rx) = mpsc::unbounded_channel::<SignalMessage>();
        let id = self.service.register(tx);

        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if incoming.send(TransportEvent::Message(msg)).is_err() {
                    break;
                }
            }
        });

        let service = self.service.clone();
        tokio::spawn(async move {
            while let Some(msg) = outgoing.recv().await {
                service.handle_message(id, msg);
            }
            service.disconnect(id);
        });

        Ok(connection)
    }
}

/// Next frame the client sent, or panic after a timeout.
pub async fn next_sent(endpoint: &mut ChannelEndpoint) -> SignalMessage {
    tokio::time::timeout(Duration::from_secs(2), endpoint.next_sent())
        .await
        .expect("Timeout waiting for client frame")
        .expect("Client dropped its sender")
}
