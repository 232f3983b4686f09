pub mod dijkstra;

pub use dijkstra::{PathResult, TopologyGraph};
