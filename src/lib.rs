#![forbid(unsafe_code)]

//! media_cull: deletion-decision core for media libraries.
//!
//! 1. **Scoring**: explainable multi-factor deletion priority with a
//!    never-delete rating veto
//! 2. **Protection**: an authoritative registry of untouchable items
//! 3. **Authorization**: three ordered confirmations plus a shared secret
//!    before anything is deleted
//! 4. **Execution**: partial-failure-tolerant batch deletion through an
//!    injected media-server collaborator
//!
//! # Library usage
//!
//! ```rust,no_run
//! use media_cull::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use media_cull::core::config::Config;
//! use media_cull::curation::scoring::{NormalizationContext, ScoringEngine};
//! ```

pub mod prelude;

pub mod api;
pub mod core;
pub mod curation;
pub mod library;
pub mod logger;
