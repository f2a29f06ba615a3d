//! Activity logging: append-only JSONL behind a non-blocking background thread.

pub mod activity;
pub mod jsonl;
