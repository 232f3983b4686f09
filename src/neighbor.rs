use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, RouterError};
use crate::message::{LinkDescriptor, SELF_PORT};
use crate::types::{RouterId, RouterIdentity};

/// Every router has four interfaces.
pub const MAX_LINKS: usize = 4;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NeighborState {
    Init,
    TwoWay,
}

impl fmt::Display for NeighborState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NeighborState::Init => write!(f, "INIT"),
            NeighborState::TwoWay => write!(f, "TWO_WAY"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeighborLink {
    pub slot: usize,
    pub remote: RouterIdentity,
    pub state: NeighborState,
    pub since: DateTime<Utc>,
}

impl NeighborLink {
    pub fn is_two_way(&self) -> bool {
        self.state == NeighborState::TwoWay
    }

    pub fn time_in_state(&self) -> Duration {
        Utc::now().signed_duration_since(self.since)
    }
}

/// Fixed-capacity set of links of the local router, indexed by interface slot.
#[derive(Debug)]
pub struct LinkTable {
    slots: [Option<NeighborLink>; MAX_LINKS],
}

impl Default for LinkTable {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkTable {
    pub fn new() -> Self {
        Self {
            slots: Default::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() >= MAX_LINKS
    }

    /// Places `remote` in the lowest free slot in state INIT and returns that slot.
    pub fn add_link(&mut self, remote: RouterIdentity) -> Result<usize> {
        let slot = self
            .slots
            .iter()
            .position(|s| s.is_none())
            .ok_or(RouterError::CapacityExceeded { capacity: MAX_LINKS })?;

        self.slots[slot] = Some(NeighborLink {
            slot,
            remote,
            state: NeighborState::Init,
            since: Utc::now(),
        });
        Ok(slot)
    }

    pub fn remove_link(&mut self, slot: usize) -> Option<NeighborLink> {
        self.slots.get_mut(slot).and_then(Option::take)
    }

    pub fn remove_by_id(&mut self, remote_id: &str) -> Option<NeighborLink> {
        let slot = self.find_by_id(remote_id)?.slot;
        self.remove_link(slot)
    }

    pub fn get(&self, slot: usize) -> Option<&NeighborLink> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub fn find_by_id(&self, remote_id: &str) -> Option<&NeighborLink> {
        self.iter().find(|l| l.remote.simulated_ip == remote_id)
    }

    pub fn find_by_port(&self, process_port: u16) -> Option<&NeighborLink> {
        self.iter().find(|l| l.remote.process_port == process_port)
    }

    /// INIT -> TWO_WAY. Already TWO_WAY is left untouched and still succeeds.
    pub fn mark_two_way(&mut self, remote_id: &str) -> bool {
        match self
            .slots
            .iter_mut()
            .flatten()
            .find(|l| l.remote.simulated_ip == remote_id)
        {
            Some(link) => {
                if link.state != NeighborState::TwoWay {
                    link.state = NeighborState::TwoWay;
                    link.since = Utc::now();
                }
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &NeighborLink> + '_ {
        self.slots.iter().flatten()
    }

    /// Snapshot of occupied slots in slot order.
    pub fn list(&self) -> Vec<NeighborLink> {
        self.iter().cloned().collect()
    }

    pub fn two_way_neighbors(&self) -> Vec<RouterIdentity> {
        self.iter()
            .filter(|l| l.is_two_way())
            .map(|l| l.remote.clone())
            .collect()
    }

    /// Link set advertised in the self-LSA: the self descriptor, then every TWO_WAY link.
    pub fn descriptors(&self, self_id: &RouterId) -> Vec<LinkDescriptor> {
        let mut links = vec![LinkDescriptor::new(self_id.clone(), SELF_PORT)];
        links.extend(
            self.iter()
                .filter(|l| l.is_two_way())
                .map(|l| LinkDescriptor::new(l.remote.simulated_ip.clone(), l.slot as i16)),
        );
        links
    }
}
