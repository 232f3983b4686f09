use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap, HashSet};
use std::fmt;

use crate::message::Lsa;
use crate::types::RouterId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathResult {
    /// Hops from source to destination, both inclusive.
    Found(Vec<RouterId>),
    /// No advertisement mentions the destination.
    NotFound,
    /// The destination is known but not connected to the source.
    Unreachable,
}

impl fmt::Display for PathResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathResult::Found(path) => write!(f, "{}", path.join(" -> ")),
            PathResult::NotFound => write!(f, "destination not found"),
            PathResult::Unreachable => write!(f, "destination unreachable"),
        }
    }
}

/// Undirected unit-cost graph implied by a set of LSAs.
///
/// An edge exists as soon as one side lists the other, so transient one-sided
/// states between floods still connect the graph.
#[derive(Debug, Default)]
pub struct TopologyGraph {
    adjacency: BTreeMap<RouterId, BTreeSet<RouterId>>,
}

impl TopologyGraph {
    pub fn from_lsas<'a>(lsas: impl IntoIterator<Item = &'a Lsa>) -> Self {
        let mut graph = Self::default();
        for lsa in lsas {
            graph.adjacency.entry(lsa.origin.clone()).or_default();
            for neighbor in lsa.neighbor_ids() {
                if *neighbor == lsa.origin {
                    continue;
                }
                graph.add_edge(&lsa.origin, neighbor);
            }
        }
        graph
    }

    fn add_edge(&mut self, a: &RouterId, b: &RouterId) {
        self.adjacency.entry(a.clone()).or_default().insert(b.clone());
        self.adjacency.entry(b.clone()).or_default().insert(a.clone());
    }

    pub fn contains(&self, node: &str) -> bool {
        self.adjacency.contains_key(node)
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(BTreeSet::len).sum::<usize>() / 2
    }

    pub fn neighbors(&self, node: &str) -> impl Iterator<Item = &RouterId> + '_ {
        self.adjacency.get(node).into_iter().flatten()
    }
}

/// Single-source Dijkstra from `source` to `destination`.
///
/// Among equal distances the lexicographically smaller node is settled first and
/// relaxation only accepts strictly shorter candidates, so the first equal-cost
/// path found is kept.
pub fn shortest_path(graph: &TopologyGraph, source: &str, destination: &str) -> PathResult {
    if !graph.contains(destination) {
        return PathResult::NotFound;
    }
    if !graph.contains(source) {
        return PathResult::Unreachable;
    }

    let mut distances: HashMap<&str, u32> = HashMap::new();
    let mut previous: HashMap<&str, &str> = HashMap::new();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut heap = BinaryHeap::new();

    distances.insert(source, 0);
    heap.push(Reverse((0u32, source)));

    while let Some(Reverse((cost, node))) = heap.pop() {
        if !visited.insert(node) {
            continue;
        }
        if node == destination {
            break;
        }

        for neighbor in graph.neighbors(node) {
            let neighbor = neighbor.as_str();
            if visited.contains(neighbor) {
                continue;
            }
            let candidate = cost + 1;
            if candidate < *distances.get(neighbor).unwrap_or(&u32::MAX) {
                distances.insert(neighbor, candidate);
                previous.insert(neighbor, node);
                heap.push(Reverse((candidate, neighbor)));
            }
        }
    }

    if !distances.contains_key(destination) {
        return PathResult::Unreachable;
    }

    PathResult::Found(reconstruct_path(&previous, source, destination))
}

fn reconstruct_path(
    previous: &HashMap<&str, &str>,
    source: &str,
    destination: &str,
) -> Vec<RouterId> {
    let mut path = vec![destination.to_string()];
    let mut current = destination;

    while current != source {
        match previous.get(current) {
            Some(prev) => {
                path.push(prev.to_string());
                current = *prev;
            }
            None => break,
        }
    }

    path.reverse();
    path
}
