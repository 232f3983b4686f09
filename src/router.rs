use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::{JoinHandle, JoinSet};

use crate::algorithms::PathResult;
use crate::config::RouterConfig;
use crate::error::{Result, RouterError};
use crate::message::Lsa;
use crate::neighbor::{NeighborLink, NeighborState};
use crate::protocol::{ProtocolContext, flood, handshake, message_handler};
use crate::types::{RouterId, RouterIdentity};

/// A simulated router process: its listener plus the operations the console drives.
pub struct Router {
    ctx: Arc<ProtocolContext>,
    local_addr: SocketAddr,
    listener: JoinHandle<()>,
}

impl Router {
    /// Binds the router's port and starts accepting connections right away, so
    /// neighbors can reach it before `start` is issued. Port 0 picks a free port.
    pub async fn bind(config: RouterConfig) -> Result<Self> {
        let listener = TcpListener::bind((config.process_ip.as_str(), config.process_port)).await?;
        let local_addr = listener.local_addr()?;

        let identity = RouterIdentity::new(
            config.process_ip.clone(),
            local_addr.port(),
            config.simulated_ip.clone(),
        );
        let ctx = Arc::new(ProtocolContext::new(identity, &config));
        let listener = tokio::spawn(message_handler::run_listener(listener, ctx.clone()));

        info!("router {} bound to {}", ctx.self_id(), local_addr);
        Ok(Self {
            ctx,
            local_addr,
            listener,
        })
    }

    pub fn identity(&self) -> &RouterIdentity {
        &self.ctx.identity
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Registers a neighbor in state INIT without any network traffic.
    pub async fn attach(
        &self,
        process_ip: &str,
        process_port: u16,
        simulated_ip: &str,
    ) -> Result<usize> {
        if simulated_ip.trim().is_empty() {
            return Err(RouterError::InvalidNeighbor("empty simulated IP".into()));
        }
        if simulated_ip == self.ctx.self_id() {
            return Err(RouterError::InvalidNeighbor(format!(
                "{} is this router's own simulated IP",
                simulated_ip
            )));
        }

        let mut links = self.ctx.links.lock().await;
        if let Some(existing) = links.find_by_id(simulated_ip) {
            return Err(RouterError::AlreadyAttached {
                neighbor: simulated_ip.to_string(),
                slot: existing.slot,
            });
        }

        let slot = links.add_link(RouterIdentity::new(process_ip, process_port, simulated_ip))?;
        info!("attached {} ({}:{}) on port {}", simulated_ip, process_ip, process_port, slot);
        Ok(slot)
    }

    /// Attach, handshake and flood in one step. A failed handshake leaves the
    /// INIT link in place so a later `start` can retry it.
    pub async fn connect(
        &self,
        process_ip: &str,
        process_port: u16,
        simulated_ip: &str,
    ) -> Result<usize> {
        let slot = match self.attach(process_ip, process_port, simulated_ip).await {
            Ok(slot) => slot,
            Err(RouterError::AlreadyAttached { slot, .. }) => slot,
            Err(e) => return Err(e),
        };

        let neighbor = self
            .ctx
            .links
            .lock()
            .await
            .get(slot)
            .map(|l| l.remote.clone())
            .ok_or(RouterError::LinkNotFound(slot))?;

        let new_adjacency = handshake::initiate(&self.ctx, &neighbor).await?;
        if new_adjacency {
            flood::originate(&self.ctx).await?;
        }
        flood::sync_database(&self.ctx, &neighbor).await;
        Ok(slot)
    }

    /// Handshakes every attached neighbor concurrently, then floods once.
    /// Individual handshake failures are logged and skipped.
    pub async fn start(&self) -> Result<()> {
        let neighbors: Vec<RouterIdentity> = self
            .ctx
            .links
            .lock()
            .await
            .iter()
            .map(|l| l.remote.clone())
            .collect();

        let mut handshakes = JoinSet::new();
        for neighbor in neighbors {
            let ctx = self.ctx.clone();
            handshakes.spawn(async move {
                let result = handshake::initiate(&ctx, &neighbor).await;
                (neighbor, result)
            });
        }

        let mut established = Vec::new();
        while let Some(joined) = handshakes.join_next().await {
            match joined {
                Ok((neighbor, Ok(_))) => established.push(neighbor),
                Ok((neighbor, Err(e))) => {
                    warn!("handshake with {} failed: {}", neighbor.simulated_ip, e)
                }
                Err(e) => error!("handshake task failed: {}", e),
            }
        }

        flood::originate(&self.ctx).await?;
        for neighbor in &established {
            flood::sync_database(&self.ctx, neighbor).await;
        }
        Ok(())
    }

    /// Removes the link on `slot` and floods the withdrawal.
    pub async fn disconnect(&self, slot: usize) -> Result<RouterIdentity> {
        flood::withdraw(&self.ctx, slot).await.map(|link| link.remote)
    }

    pub async fn detect(&self, destination: &str) -> PathResult {
        self.ctx.lsdb.read().await.shortest_path(destination)
    }

    pub async fn neighbors(&self) -> Vec<NeighborLink> {
        self.ctx.links.lock().await.list()
    }

    pub async fn neighbor_states(&self) -> Vec<(RouterId, NeighborState)> {
        self.neighbors()
            .await
            .into_iter()
            .map(|l| (l.remote.simulated_ip, l.state))
            .collect()
    }

    pub async fn database(&self) -> Vec<Lsa> {
        self.ctx.lsdb.read().await.snapshot()
    }

    pub async fn self_lsa(&self) -> Lsa {
        self.ctx.lsdb.read().await.self_lsa().clone()
    }

    pub fn shutdown(&self) {
        self.listener.abort();
    }
}

impl Drop for Router {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neighbor::MAX_LINKS;

    async fn router(id: &str) -> Router {
        Router::bind(RouterConfig::new(id, 0)).await.unwrap()
    }

    #[tokio::test]
    async fn test_bind_advertises_bound_port() {
        let r = router("10.0.0.1").await;
        assert_ne!(r.identity().process_port, 0);
        assert_eq!(r.identity().process_port, r.local_addr().port());
        assert_eq!(r.self_lsa().await.sequence, i32::MIN);
    }

    #[tokio::test]
    async fn test_attach_beyond_capacity_is_full() {
        let r = router("10.0.0.1").await;
        for n in 0..MAX_LINKS as u16 {
            let slot = r.attach("127.0.0.1", 9000 + n, &format!("10.0.1.{}", n)).await.unwrap();
            assert_eq!(slot, n as usize);
        }

        let before = r.neighbors().await;
        let err = r.attach("127.0.0.1", 9100, "10.0.1.100").await.unwrap_err();
        assert!(matches!(err, RouterError::CapacityExceeded { .. }));
        let err = r.connect("127.0.0.1", 9101, "10.0.1.101").await.unwrap_err();
        assert!(matches!(err, RouterError::CapacityExceeded { .. }));

        let after = r.neighbors().await;
        assert_eq!(after.len(), MAX_LINKS);
        assert_eq!(
            before.iter().map(|l| &l.remote).collect::<Vec<_>>(),
            after.iter().map(|l| &l.remote).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn test_attach_does_not_flood() {
        let r = router("10.0.0.1").await;
        r.attach("127.0.0.1", 9000, "10.0.0.2").await.unwrap();

        assert_eq!(r.self_lsa().await.sequence, i32::MIN);
        assert_eq!(
            r.neighbor_states().await,
            vec![("10.0.0.2".to_string(), NeighborState::Init)]
        );
    }

    #[tokio::test]
    async fn test_attach_rejects_self_and_duplicates() {
        let r = router("10.0.0.1").await;
        assert!(matches!(
            r.attach("127.0.0.1", 9000, "10.0.0.1").await,
            Err(RouterError::InvalidNeighbor(_))
        ));

        r.attach("127.0.0.1", 9000, "10.0.0.2").await.unwrap();
        assert!(matches!(
            r.attach("127.0.0.1", 9001, "10.0.0.2").await,
            Err(RouterError::AlreadyAttached { slot: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_disconnect_empty_slot() {
        let r = router("10.0.0.1").await;
        assert!(matches!(r.disconnect(2).await, Err(RouterError::LinkNotFound(2))));
        assert_eq!(r.self_lsa().await.sequence, i32::MIN);
    }

    #[tokio::test]
    async fn test_detect_unknown_destination() {
        let r = router("10.0.0.1").await;
        assert_eq!(r.detect("10.9.9.9").await, PathResult::NotFound);
    }
}
