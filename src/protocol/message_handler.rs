use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};

use super::handshake::{self, HandshakeOutcome};
use super::{ProtocolContext, flood, with_timeout};
use crate::error::{Result, RouterError};
use crate::message::{MessageKind, read_message};

/// Accept loop: one task per inbound connection, each handling exactly one message.
pub async fn run_listener(listener: TcpListener, ctx: Arc<ProtocolContext>) {
    match listener.local_addr() {
        Ok(addr) => info!("router {} listening on {}", ctx.self_id(), addr),
        Err(e) => warn!("router {} listening on an unknown address: {}", ctx.self_id(), e),
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                debug!("connection from {}", addr);
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, &ctx).await {
                        warn!("dropping connection from {}: {}", addr, e);
                    }
                });
            }
            Err(e) => {
                error!("failed to accept connection: {}", e);
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
    }
}

/// Decodes one message and dispatches it. Errors end this connection only.
pub async fn handle_connection(stream: TcpStream, ctx: &Arc<ProtocolContext>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    let message = match with_timeout(ctx.read_timeout, read_message(&mut reader)).await? {
        Some(message) => message,
        None => {
            debug!("connection closed before any message");
            return Ok(());
        }
    };

    if message.destination_ip != ctx.self_id() {
        return Err(RouterError::MalformedMessage(format!(
            "{:?} from {} addressed to {}",
            message.kind, message.sender_ip, message.destination_ip
        )));
    }

    match message.kind {
        MessageKind::Hello => {
            let outcome = handshake::respond(ctx, &message, &mut writer).await?;
            // The exchange is complete; release the connection before flooding.
            drop(writer);
            drop(reader);

            if let HandshakeOutcome::Established { remote, new_adjacency, .. } = outcome {
                if new_adjacency {
                    flood::originate(ctx).await?;
                }
                flood::sync_database(ctx, &remote).await;
            }
        }
        MessageKind::Lsupdate => {
            flood::on_receive(ctx, message).await?;
        }
    }

    Ok(())
}
