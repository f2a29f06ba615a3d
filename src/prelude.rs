//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use media_cull::prelude::*;
//! ```

// Core
pub use crate::core::config::{Config, Secret};
pub use crate::core::errors::{CullError, Result};

// Library
pub use crate::library::enrichment::{ProviderRating, RatingEnricher, RatingProvider, RatingSource};
pub use crate::library::item::{ItemId, MediaItem, QualityRank};
pub use crate::library::source::{MetadataSource, collect_library};

// Curation
pub use crate::curation::analysis::{Analyzer, LibraryAnalysis, LibraryStats};
pub use crate::curation::authorization::{
    AuthorizationSession, AuthorizationState, AuthorizedBatch, DeletionAuthorizer,
    DeletionRequest, RejectionReason,
};
pub use crate::curation::deletion::{
    DeleteCollaborator, DeletedItem, DeletionExecutor, DeletionPlan, DeletionResult,
    ExecutionFailure,
};
pub use crate::curation::protection::{ProtectionRegistry, ProtectionSnapshot};
pub use crate::curation::scoring::{
    DeletionScore, NormalizationContext, ScoreThresholds, ScoringEngine, ScoringWeights,
};

// Logging
pub use crate::logger::activity::{ActivityEvent, ActivityLoggerHandle, spawn_logger};

// API
pub use crate::api::DeleteService;
