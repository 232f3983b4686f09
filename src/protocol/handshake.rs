//! HELLO exchange establishing TWO_WAY adjacencies.
//!
//! The exchange is a single round trip on one connection: the initiator sends
//! HELLO, the responder registers the link and replies with its own HELLO.
//! The responder is TWO_WAY once its reply is written, the initiator once the
//! reply is read.

use log::{debug, info, warn};
use tokio::io::{AsyncWrite, BufReader};

use super::{ProtocolContext, with_timeout};
use crate::error::{Result, RouterError};
use crate::message::{MessageKind, WireMessage, read_message, write_message};
use crate::types::RouterIdentity;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeOutcome {
    Established {
        slot: usize,
        remote: RouterIdentity,
        /// The link moved INIT -> TWO_WAY during this exchange.
        new_adjacency: bool,
    },
    /// Link table full; the connection is closed without a reply.
    Rejected,
}

/// Initiator side. Returns whether the link became TWO_WAY during this call.
///
/// Failures never touch the link table.
pub async fn initiate(ctx: &ProtocolContext, neighbor: &RouterIdentity) -> Result<bool> {
    let addr = neighbor.transport_addr();
    let stream = ctx.dial(neighbor).await?;
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    let hello = WireMessage::hello(&ctx.identity, &neighbor.simulated_ip);
    write_message(&mut writer, &hello)
        .await
        .map_err(|e| RouterError::unreachable(addr.as_str(), e))?;
    debug!("sent HELLO to {}", neighbor);

    let reply = with_timeout(ctx.read_timeout, read_message(&mut reader))
        .await
        .map_err(|e| match e {
            RouterError::MalformedMessage(_) => e,
            other => RouterError::unreachable(addr.as_str(), other),
        })?
        .ok_or_else(|| RouterError::unreachable(addr.as_str(), "closed without a HELLO reply"))?;

    if reply.kind != MessageKind::Hello
        || reply.announced_id != neighbor.simulated_ip
        || reply.destination_ip != ctx.self_id()
    {
        return Err(RouterError::MalformedMessage(format!(
            "unexpected handshake reply from {}: {:?} announcing {}",
            addr, reply.kind, reply.announced_id
        )));
    }
    info!("received HELLO from {};", reply.announced_id);

    let mut links = ctx.links.lock().await;
    let was_init = links
        .find_by_id(&neighbor.simulated_ip)
        .map(|l| !l.is_two_way())
        .unwrap_or(false);

    if !links.mark_two_way(&neighbor.simulated_ip) {
        warn!("link to {} was removed during the handshake", neighbor.simulated_ip);
        return Ok(false);
    }
    if was_init {
        info!("set {} STATE to TWO_WAY", neighbor.simulated_ip);
    }
    Ok(was_init)
}

/// Responder side, run by the connection handler on a decoded HELLO.
pub async fn respond<W>(
    ctx: &ProtocolContext,
    hello: &WireMessage,
    writer: &mut W,
) -> Result<HandshakeOutcome>
where
    W: AsyncWrite + Unpin,
{
    let remote = hello.sender_identity();
    info!("received HELLO from {};", remote.simulated_ip);

    if remote.simulated_ip == ctx.self_id() {
        return Err(RouterError::MalformedMessage("HELLO announcing our own simulated IP".into()));
    }

    let (slot, added) = {
        let mut links = ctx.links.lock().await;
        match links.find_by_id(&remote.simulated_ip) {
            Some(link) => (link.slot, false),
            None => match links.add_link(remote.clone()) {
                Ok(slot) => {
                    info!("set {} STATE to INIT", remote.simulated_ip);
                    (slot, true)
                }
                Err(RouterError::CapacityExceeded { capacity }) => {
                    warn!(
                        "link not established with {}: all {} ports in use",
                        remote, capacity
                    );
                    return Ok(HandshakeOutcome::Rejected);
                }
                Err(e) => return Err(e),
            },
        }
    };

    let reply = WireMessage::hello(&ctx.identity, &remote.simulated_ip);
    if let Err(e) = write_message(writer, &reply).await {
        if added {
            let mut links = ctx.links.lock().await;
            if links.get(slot).is_some_and(|l| l.remote == remote) {
                links.remove_link(slot);
                debug!(
                    "released port {} after failed HELLO reply to {}",
                    slot, remote.simulated_ip
                );
            }
        }
        return Err(e);
    }

    let mut links = ctx.links.lock().await;
    let was_init = links
        .find_by_id(&remote.simulated_ip)
        .map(|l| !l.is_two_way())
        .unwrap_or(false);
    if !links.mark_two_way(&remote.simulated_ip) {
        warn!("link to {} was removed during the handshake", remote.simulated_ip);
        return Ok(HandshakeOutcome::Rejected);
    }
    if was_init {
        info!("set {} STATE to TWO_WAY", remote.simulated_ip);
    }

    Ok(HandshakeOutcome::Established {
        slot,
        remote,
        new_adjacency: was_init,
    })
}
