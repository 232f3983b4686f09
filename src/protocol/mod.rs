pub mod flood;
pub mod handshake;
pub mod message_handler;

use std::future::Future;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, RwLock};

use crate::config::RouterConfig;
use crate::error::{Result, RouterError};
use crate::neighbor::LinkTable;
use crate::network::LinkStateDatabase;
use crate::types::RouterIdentity;

/// State shared by the acceptor, every connection handler and the command side.
///
/// Lock order is `links` then `lsdb`. Neither lock is held across network I/O.
#[derive(Debug)]
pub struct ProtocolContext {
    pub identity: RouterIdentity,
    pub links: Mutex<LinkTable>,
    pub lsdb: RwLock<LinkStateDatabase>,
    pub connect_timeout: Option<Duration>,
    pub read_timeout: Option<Duration>,
}

impl ProtocolContext {
    pub fn new(identity: RouterIdentity, config: &RouterConfig) -> Self {
        let lsdb = LinkStateDatabase::bootstrap(identity.simulated_ip.clone());
        Self {
            identity,
            links: Mutex::new(LinkTable::new()),
            lsdb: RwLock::new(lsdb),
            connect_timeout: config.connect_timeout(),
            read_timeout: config.read_timeout(),
        }
    }

    pub fn self_id(&self) -> &str {
        &self.identity.simulated_ip
    }

    /// Opens a fresh connection to `peer`; every HELLO and LSUPDATE gets its own.
    pub async fn dial(&self, peer: &RouterIdentity) -> Result<TcpStream> {
        let addr = peer.transport_addr();
        with_timeout(self.connect_timeout, TcpStream::connect(addr.as_str()))
            .await
            .map_err(|e| RouterError::unreachable(addr, e))
    }
}

/// Runs `fut`, bounded by `limit` when one is configured.
pub async fn with_timeout<T, E, F>(limit: Option<Duration>, fut: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, E>>,
    RouterError: From<E>,
{
    match limit {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(RouterError::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("timed out after {:?}", limit),
            ))),
        },
        None => Ok(fut.await?),
    }
}
