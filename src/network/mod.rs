pub mod lsdb;

pub use lsdb::{LinkStateDatabase, MergeOutcome};
