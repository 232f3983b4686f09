//! LSA origination, forwarding and database synchronization.

use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinSet;

use super::ProtocolContext;
use crate::error::{Result, RouterError};
use crate::message::{Lsa, WireMessage, write_message};
use crate::neighbor::{LinkTable, NeighborLink};
use crate::network::MergeOutcome;
use crate::types::RouterIdentity;

/// Rebuilds the self-LSA from `links` and stores it. Must be called with the
/// link table locked so that republished link sets follow topology changes in order.
async fn republish(ctx: &ProtocolContext, links: &LinkTable) -> Result<(Lsa, Vec<RouterIdentity>)> {
    let descriptors = links.descriptors(&ctx.identity.simulated_ip);
    let recipients = links.two_way_neighbors();
    let lsa = ctx.lsdb.write().await.republish_self(descriptors)?;
    info!(
        "originating LSA seq {} with {} neighbor(s)",
        lsa.sequence,
        lsa.neighbor_ids().count()
    );
    Ok((lsa, recipients))
}

/// Republishes the self-LSA and floods it to every TWO_WAY neighbor.
pub async fn originate(ctx: &Arc<ProtocolContext>) -> Result<Lsa> {
    let (lsa, recipients) = {
        let links = ctx.links.lock().await;
        republish(ctx, &links).await?
    };
    broadcast(ctx, &lsa, recipients).await;
    Ok(lsa)
}

/// Removes the link on `slot` and floods the rebuilt self-LSA, including to
/// the neighbor just removed so it learns about the withdrawal directly.
pub async fn withdraw(ctx: &Arc<ProtocolContext>, slot: usize) -> Result<NeighborLink> {
    let (removed, lsa, mut recipients) = {
        let mut links = ctx.links.lock().await;
        let removed = links.remove_link(slot).ok_or(RouterError::LinkNotFound(slot))?;
        info!("disconnected {} from port {}", removed.remote.simulated_ip, slot);
        let (lsa, recipients) = republish(ctx, &links).await?;
        (removed, lsa, recipients)
    };

    recipients.push(removed.remote.clone());
    broadcast(ctx, &lsa, recipients).await;
    Ok(removed)
}

/// Handles an inbound LSUPDATE. Returns `None` when the message was discarded
/// before reaching the database.
pub async fn on_receive(
    ctx: &Arc<ProtocolContext>,
    message: WireMessage,
) -> Result<Option<MergeOutcome>> {
    let arrived_from = message.sender_ip.clone();
    if arrived_from == ctx.self_id() {
        debug!("discarding LSUPDATE looped back to its sender");
        return Ok(None);
    }

    let lsa = message
        .lsa
        .ok_or_else(|| RouterError::MalformedMessage("LSUPDATE without an LSA".into()))?;
    if lsa.origin == ctx.self_id() {
        debug!("ignoring copy of our own LSA (seq {}) from {}", lsa.sequence, arrived_from);
        return Ok(None);
    }

    let (outcome, is_current) = {
        let mut lsdb = ctx.lsdb.write().await;
        let outcome = lsdb.merge(lsa.clone());
        let is_current = lsdb
            .lookup(&lsa.origin)
            .map(|stored| stored.sequence == lsa.sequence)
            .unwrap_or(false);
        (outcome, is_current)
    };

    if outcome.changed() {
        info!(
            "merged LSA of {} seq {} from {} ({:?})",
            lsa.origin, lsa.sequence, arrived_from, outcome
        );
        let recipients: Vec<RouterIdentity> = ctx
            .links
            .lock()
            .await
            .two_way_neighbors()
            .into_iter()
            .filter(|peer| peer.simulated_ip != arrived_from)
            .collect();
        broadcast(ctx, &lsa, recipients).await;
    } else {
        debug!(
            "stale LSA of {} seq {} from {}",
            lsa.origin, lsa.sequence, arrived_from
        );
    }

    // Only the origin itself can withdraw our adjacency; relayed copies may predate it.
    if arrived_from == lsa.origin && is_current && !lsa.lists(ctx.self_id()) {
        drop_neighbor(ctx, &lsa.origin).await?;
    }

    Ok(Some(outcome))
}

/// Removes the link to `neighbor_id` and floods the rebuilt self-LSA, the
/// dropped neighbor included so its copy of our LSA stops listing it.
async fn drop_neighbor(ctx: &Arc<ProtocolContext>, neighbor_id: &str) -> Result<()> {
    let (removed, lsa, mut recipients) = {
        let mut links = ctx.links.lock().await;
        let Some(removed) = links.remove_by_id(neighbor_id) else {
            return Ok(());
        };
        info!("removing link to {}: it no longer lists us", neighbor_id);
        let (lsa, recipients) = republish(ctx, &links).await?;
        (removed, lsa, recipients)
    };

    recipients.push(removed.remote);
    broadcast(ctx, &lsa, recipients).await;
    Ok(())
}

/// Sends every stored LSA not authored by us or by `neighbor` to `neighbor`,
/// so a router joining an existing topology learns what was flooded before it arrived.
pub async fn sync_database(ctx: &Arc<ProtocolContext>, neighbor: &RouterIdentity) -> usize {
    let lsas: Vec<Lsa> = {
        let lsdb = ctx.lsdb.read().await;
        lsdb.iter()
            .filter(|lsa| lsa.origin != ctx.self_id() && lsa.origin != neighbor.simulated_ip)
            .cloned()
            .collect()
    };
    if lsas.is_empty() {
        return 0;
    }

    debug!("synchronizing {} LSA(s) to {}", lsas.len(), neighbor.simulated_ip);
    let deliveries = lsas.into_iter().map(|lsa| (neighbor.clone(), lsa)).collect();
    deliver(ctx, deliveries).await
}

async fn broadcast(
    ctx: &Arc<ProtocolContext>,
    lsa: &Lsa,
    recipients: Vec<RouterIdentity>,
) -> usize {
    let deliveries = recipients.into_iter().map(|peer| (peer, lsa.clone())).collect();
    deliver(ctx, deliveries).await
}

/// Sends each `(peer, lsa)` pair on its own connection, concurrently.
/// Returns how many were delivered; failures are logged and abandoned.
async fn deliver(ctx: &Arc<ProtocolContext>, deliveries: Vec<(RouterIdentity, Lsa)>) -> usize {
    let mut sends = JoinSet::new();
    for (peer, lsa) in deliveries {
        let ctx = Arc::clone(ctx);
        sends.spawn(async move {
            let result = send_lsa(&ctx, &peer, lsa).await;
            (peer, result)
        });
    }

    let mut delivered = 0;
    while let Some(joined) = sends.join_next().await {
        match joined {
            Ok((_, Ok(()))) => delivered += 1,
            Ok((peer, Err(e))) => {
                warn!("failed to send LSA update to {}: {}", peer.simulated_ip, e)
            }
            Err(e) => error!("LSA send task failed: {}", e),
        }
    }
    delivered
}

pub async fn send_lsa(ctx: &ProtocolContext, peer: &RouterIdentity, lsa: Lsa) -> Result<()> {
    let mut stream = ctx.dial(peer).await?;
    let (origin, sequence) = (lsa.origin.clone(), lsa.sequence);
    let message = WireMessage::lsupdate(&ctx.identity, &peer.simulated_ip, lsa);

    write_message(&mut stream, &message)
        .await
        .map_err(|e| RouterError::unreachable(peer.transport_addr(), e))?;
    let _ = stream.shutdown().await;

    debug!("sent LSA of {} seq {} to {}", origin, sequence, peer);
    Ok(())
}
