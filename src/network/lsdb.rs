use std::collections::HashMap;

use crate::algorithms::dijkstra::{self, PathResult, TopologyGraph};
use crate::error::{Result, RouterError};
use crate::message::{LinkDescriptor, Lsa, SELF_PORT};
use crate::types::RouterId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Replaced,
    /// Sequence number not newer than the stored copy; nothing changed.
    IgnoredStale,
}

impl MergeOutcome {
    pub fn changed(self) -> bool {
        self != MergeOutcome::IgnoredStale
    }
}

/// Latest advertisement per origin, always including the local router's own.
#[derive(Debug, Clone)]
pub struct LinkStateDatabase {
    self_id: RouterId,
    store: HashMap<RouterId, Lsa>,
}

impl LinkStateDatabase {
    /// Seeds the self-LSA at the lowest sequence number with only the self descriptor.
    pub fn bootstrap(self_id: impl Into<RouterId>) -> Self {
        let self_id = self_id.into();
        let lsa = Lsa {
            origin: self_id.clone(),
            sequence: i32::MIN,
            links: vec![LinkDescriptor::new(self_id.clone(), SELF_PORT)],
        };

        let mut store = HashMap::new();
        store.insert(self_id.clone(), lsa);
        Self { self_id, store }
    }

    pub fn self_id(&self) -> &RouterId {
        &self.self_id
    }

    pub fn self_lsa(&self) -> &Lsa {
        // Inserted by bootstrap and never removed
        &self.store[&self.self_id]
    }

    pub fn merge(&mut self, lsa: Lsa) -> MergeOutcome {
        match self.store.get(&lsa.origin) {
            None => {
                self.store.insert(lsa.origin.clone(), lsa);
                MergeOutcome::Inserted
            }
            Some(stored) if lsa.sequence > stored.sequence => {
                self.store.insert(lsa.origin.clone(), lsa);
                MergeOutcome::Replaced
            }
            Some(_) => MergeOutcome::IgnoredStale,
        }
    }

    /// Bumps the self-LSA sequence by one, replaces its links and returns the new LSA.
    pub fn republish_self(&mut self, links: Vec<LinkDescriptor>) -> Result<Lsa> {
        let current = self.self_lsa().sequence;
        let sequence = current
            .checked_add(1)
            .ok_or_else(|| RouterError::SequenceExhausted(self.self_id.clone()))?;

        let lsa = Lsa {
            origin: self.self_id.clone(),
            sequence,
            links,
        };
        self.store.insert(self.self_id.clone(), lsa.clone());
        Ok(lsa)
    }

    pub fn lookup(&self, origin: &str) -> Option<&Lsa> {
        self.store.get(origin)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Lsa> + '_ {
        self.store.values()
    }

    /// All stored LSAs ordered by origin.
    pub fn snapshot(&self) -> Vec<Lsa> {
        let mut lsas: Vec<Lsa> = self.store.values().cloned().collect();
        lsas.sort_by(|a, b| a.origin.cmp(&b.origin));
        lsas
    }

    pub fn graph(&self) -> TopologyGraph {
        TopologyGraph::from_lsas(self.store.values())
    }

    pub fn shortest_path(&self, destination: &str) -> PathResult {
        dijkstra::shortest_path(&self.graph(), &self.self_id, destination)
    }
}
