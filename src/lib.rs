pub mod algorithms;
pub mod config;
pub mod console;
pub mod error;
pub mod message;
pub mod neighbor;
pub mod network;
pub mod protocol;
pub mod router;
pub mod types;

pub use algorithms::PathResult;
pub use config::RouterConfig;
pub use error::{Result, RouterError};
pub use message::{LinkDescriptor, Lsa, WireMessage};
pub use neighbor::{MAX_LINKS, NeighborLink, NeighborState};
pub use router::Router;
pub use types::{RouterId, RouterIdentity};
