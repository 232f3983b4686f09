use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Result, RouterError};
use crate::types::{RouterId, RouterIdentity};

/// Upper bound on one encoded message, newline included.
pub const MAX_FRAME_LEN: u64 = 64 * 1024;

/// Port number reserved for the self-referencing descriptor of a router's own LSA.
pub const SELF_PORT: i16 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    Hello,
    Lsupdate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkDescriptor {
    pub neighbor_id: RouterId,
    /// Local interface slot of the neighbor, or [`SELF_PORT`].
    pub port_num: i16,
}

impl LinkDescriptor {
    pub fn new(neighbor_id: impl Into<RouterId>, port_num: i16) -> Self {
        Self {
            neighbor_id: neighbor_id.into(),
            port_num,
        }
    }

    pub fn is_self(&self) -> bool {
        self.port_num == SELF_PORT
    }
}

/// Link-state advertisement: one router's statement of its current neighbor set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lsa {
    pub origin: RouterId,
    pub sequence: i32,
    pub links: Vec<LinkDescriptor>,
}

impl Lsa {
    pub fn lists(&self, neighbor: &str) -> bool {
        self.links.iter().any(|l| !l.is_self() && l.neighbor_id == neighbor)
    }

    pub fn neighbor_ids(&self) -> impl Iterator<Item = &RouterId> + '_ {
        self.links.iter().filter(|l| !l.is_self()).map(|l| &l.neighbor_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub kind: MessageKind,
    pub sender_process_ip: String,
    pub sender_process_port: u16,
    pub sender_ip: RouterId,
    pub destination_ip: RouterId,
    pub announced_id: RouterId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lsa: Option<Lsa>,
}

impl WireMessage {
    pub fn hello(sender: &RouterIdentity, destination: &str) -> Self {
        Self {
            kind: MessageKind::Hello,
            sender_process_ip: sender.process_ip.clone(),
            sender_process_port: sender.process_port,
            sender_ip: sender.simulated_ip.clone(),
            destination_ip: destination.to_string(),
            announced_id: sender.simulated_ip.clone(),
            lsa: None,
        }
    }

    pub fn lsupdate(sender: &RouterIdentity, destination: &str, lsa: Lsa) -> Self {
        Self {
            kind: MessageKind::Lsupdate,
            lsa: Some(lsa),
            ..Self::hello(sender, destination)
        }
    }

    /// Identity of the router that put this message on the wire.
    pub fn sender_identity(&self) -> RouterIdentity {
        RouterIdentity::new(
            self.sender_process_ip.clone(),
            self.sender_process_port,
            self.announced_id.clone(),
        )
    }

    /// Checks the shape rules a decoded message must satisfy before dispatch.
    pub fn validate(&self) -> Result<()> {
        match (self.kind, &self.lsa) {
            (MessageKind::Hello, Some(_)) => {
                return Err(RouterError::MalformedMessage("HELLO carries an LSA".into()));
            }
            (MessageKind::Lsupdate, None) => {
                return Err(RouterError::MalformedMessage("LSUPDATE without an LSA".into()));
            }
            _ => {}
        }

        if self.sender_ip.is_empty()
            || self.announced_id.is_empty()
            || self.sender_process_ip.is_empty()
        {
            return Err(RouterError::MalformedMessage("missing sender identity".into()));
        }

        if let Some(lsa) = &self.lsa {
            if lsa.origin.is_empty() {
                return Err(RouterError::MalformedMessage("LSA without origin".into()));
            }
        }

        Ok(())
    }
}

/// Writes one message as a single JSON line.
pub async fn write_message<W>(writer: &mut W, message: &WireMessage) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(message)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one message. `Ok(None)` means the peer closed before sending anything.
pub async fn read_message<R>(reader: &mut R) -> Result<Option<WireMessage>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let read = reader
        .take(MAX_FRAME_LEN)
        .read_line(&mut line)
        .await
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidData => {
                RouterError::MalformedMessage(format!("frame is not UTF-8: {}", e))
            }
            _ => RouterError::Io(e),
        })?;
    if read == 0 {
        return Ok(None);
    }
    if !line.ends_with('\n') && read as u64 >= MAX_FRAME_LEN {
        return Err(RouterError::MalformedMessage(format!(
            "frame exceeds {} bytes",
            MAX_FRAME_LEN
        )));
    }

    let message: WireMessage = serde_json::from_str(line.trim_end())
        .map_err(|e| RouterError::MalformedMessage(e.to_string()))?;
    message.validate()?;
    Ok(Some(message))
}
