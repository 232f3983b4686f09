//! Error types shared by every protocol component.

use crate::types::RouterId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouterError {
    /// All interface slots are occupied
    #[error("link table is full ({capacity} links)")]
    CapacityExceeded { capacity: usize },

    #[error("neighbor {neighbor} is already attached on port {slot}")]
    AlreadyAttached { neighbor: RouterId, slot: usize },

    #[error("invalid neighbor: {0}")]
    InvalidNeighbor(String),

    #[error("no link on port {0}")]
    LinkNotFound(usize),

    /// Outbound connect/send failed; the operation is abandoned without retry
    #[error("neighbor {addr} unreachable: {reason}")]
    PeerUnreachable { addr: String, reason: String },

    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("sequence number space exhausted for {0}")]
    SequenceExhausted(RouterId),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

impl RouterError {
    pub fn unreachable(addr: impl Into<String>, reason: impl ToString) -> Self {
        Self::PeerUnreachable {
            addr: addr.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RouterError>;
