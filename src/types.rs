use serde::{Deserialize, Serialize};
use std::fmt;

/// Simulated IP of a router. Stable key across the whole simulation.
pub type RouterId = String;

/// Static description of a router endpoint: who it is and where its process listens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouterIdentity {
    pub simulated_ip: RouterId,
    pub process_ip: String,
    pub process_port: u16,
}

impl RouterIdentity {
    pub fn new(
        process_ip: impl Into<String>,
        process_port: u16,
        simulated_ip: impl Into<RouterId>,
    ) -> Self {
        Self {
            simulated_ip: simulated_ip.into(),
            process_ip: process_ip.into(),
            process_port,
        }
    }

    /// `host:port` of the router process, usable with `TcpStream::connect`.
    pub fn transport_addr(&self) -> String {
        format!("{}:{}", self.process_ip, self.process_port)
    }
}

impl fmt::Display for RouterIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.simulated_ip, self.transport_addr())
    }
}
