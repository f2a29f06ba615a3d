//! Deletion decisions: scoring, protection, authorization, execution, analysis.

pub mod analysis;
pub mod authorization;
pub mod deletion;
pub mod protection;
pub mod scoring;
