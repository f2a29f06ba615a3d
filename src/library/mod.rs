//! Library model: item snapshots, rating enrichment, metadata source boundary.

pub mod enrichment;
pub mod item;
pub mod source;
