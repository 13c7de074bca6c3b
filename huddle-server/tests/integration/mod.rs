
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::Level;

use huddle_server::{SignalingService, serve_on};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub service: SignalingService,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

pub async fn spawn_server() -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");
    let service = SignalingService::new();
    let (tx, rx) = oneshot::channel::<()>();

    tokio::spawn(serve_on(listener, service.clone(), async move {
        let _ = rx.await;
    }));

    TestServer {
        addr,
        service,
        shutdown: Some(tx),
    }
}
