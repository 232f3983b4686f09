#![allow(dead_code)]

use std::future::Future;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use sospf_router::message::{MessageKind, read_message, write_message};
use sospf_router::{Lsa, Router, RouterConfig, RouterIdentity, WireMessage};

pub async fn router(id: &str) -> Router {
    let config = RouterConfig::new(id, 0).with_timeouts(Some(2_000), Some(2_000));
    Router::bind(config).await.unwrap()
}

pub fn port_of(router: &Router) -> u16 {
    router.local_addr().port()
}

/// Connects `from` to `to` over loopback.
pub async fn link(from: &Router, to: &Router) -> usize {
    from.connect("127.0.0.1", port_of(to), &to.identity().simulated_ip)
        .await
        .unwrap()
}

/// Polls `check` until it holds or five seconds pass.
pub async fn eventually<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if check().await {
            return;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for: {}", what);
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

pub async fn stored(router: &Router, origin: &str) -> Option<Lsa> {
    router.database().await.into_iter().find(|lsa| lsa.origin == origin)
}

/// A hand-driven peer: answers every HELLO and records every LSUPDATE it receives.
pub struct FakePeer {
    pub identity: RouterIdentity,
    pub updates: mpsc::UnboundedReceiver<WireMessage>,
}

impl FakePeer {
    pub async fn spawn(id: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let identity = RouterIdentity::new("127.0.0.1", port, id);
        let (tx, updates) = mpsc::unbounded_channel();

        let me = identity.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let (reader, mut writer) = stream.into_split();
                let mut reader = BufReader::new(reader);
                let Ok(Some(message)) = read_message(&mut reader).await else {
                    continue;
                };
                match message.kind {
                    MessageKind::Hello => {
                        let reply = WireMessage::hello(&me, &message.announced_id);
                        let _ = write_message(&mut writer, &reply).await;
                    }
                    MessageKind::Lsupdate => {
                        let _ = tx.send(message);
                    }
                }
            }
        });

        Self { identity, updates }
    }

    pub fn id(&self) -> &str {
        &self.identity.simulated_ip
    }

    /// Sends `lsa` to `router` as if this peer were flooding it.
    pub async fn send_lsa(&self, router: &Router, lsa: Lsa) {
        let message = WireMessage::lsupdate(&self.identity, &router.identity().simulated_ip, lsa);
        send_raw(router, &message).await;
    }

    /// Drains what has arrived so far, waiting `settle` for stragglers.
    pub async fn drain(&mut self, settle: Duration) -> Vec<WireMessage> {
        tokio::time::sleep(settle).await;
        let mut received = Vec::new();
        while let Ok(message) = self.updates.try_recv() {
            received.push(message);
        }
        received
    }
}

pub async fn send_raw(router: &Router, message: &WireMessage) {
    let mut stream = tokio::net::TcpStream::connect(router.local_addr()).await.unwrap();
    write_message(&mut stream, message).await.unwrap();
}
