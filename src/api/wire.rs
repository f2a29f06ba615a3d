//! JSON bodies exchanged with an HTTP front end.
//!
//! Field names follow the established client contract (`rating_keys`,
//! `password`, `untouchables`, `space_freed_gb`, ...).

#![allow(missing_docs)]
#![allow(clippy::cast_precision_loss)]

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::errors::CullError;
use crate::curation::analysis::{AnalyzedItem, LibraryStats};
use crate::curation::authorization::{DeletionRequest, RejectionReason};
use crate::curation::deletion::{DeletionResult, ExecutionFailure};
use crate::curation::protection::ProtectionSnapshot;
use crate::library::item::ItemId;

const GIB: f64 = 1_073_741_824.0;

/// Bytes to GiB rounded to two decimals.
#[must_use]
pub fn bytes_to_gb(bytes: u64) -> f64 {
    (bytes as f64 / GIB * 100.0).round() / 100.0
}

// ──────────────────── delete request ────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRequestBody {
    pub rating_keys: Vec<u64>,
    pub password: String,
    #[serde(default)]
    pub delete_files: bool,
    /// The client's cached protection list.
    #[serde(default)]
    pub untouchables: Vec<u64>,
    /// Missing confirmations count as not given.
    #[serde(default)]
    pub confirmations: [bool; 3],
}

impl DeleteRequestBody {
    #[must_use]
    pub fn to_request(&self) -> DeletionRequest {
        DeletionRequest::new(self.rating_keys.iter().copied().map(ItemId))
            .with_confirmations(self.confirmations)
            .with_secret(self.password.clone())
            .deleting_files(self.delete_files)
    }

    /// The authoritative snapshot widened by whatever the client considers untouchable.
    #[must_use]
    pub fn effective_snapshot(&self, authoritative: &ProtectionSnapshot) -> ProtectionSnapshot {
        authoritative.union_with(self.untouchables.iter().copied().map(ItemId))
    }
}

// ──────────────────── delete response ────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SucceededBody {
    pub rating_key: u64,
    pub title: String,
    pub year: Option<i32>,
    pub size_gb: f64,
    pub files_deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedBody {
    pub rating_key: u64,
    pub title: Option<String>,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteResponseBody {
    pub total: usize,
    pub succeeded: Vec<SucceededBody>,
    pub failed: Vec<FailedBody>,
    pub space_freed_gb: f64,
    /// Present only when a connectivity failure stopped the batch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aborted_by: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub dry_run: bool,
    /// Ids a dry run would have deleted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub would_delete: Vec<u64>,
}

impl DeleteResponseBody {
    #[must_use]
    pub fn from_result(result: &DeletionResult, files_deleted: bool) -> Self {
        Self {
            total: result.total(),
            succeeded: result
                .succeeded
                .iter()
                .map(|item| SucceededBody {
                    rating_key: item.id.0,
                    title: item.title.clone(),
                    year: item.year,
                    size_gb: bytes_to_gb(item.bytes_freed),
                    files_deleted,
                })
                .collect(),
            failed: result
                .failed
                .iter()
                .map(|item| FailedBody {
                    rating_key: item.id.0,
                    title: item.title.clone(),
                    error: failure_message(&item.reason),
                })
                .collect(),
            space_freed_gb: bytes_to_gb(result.total_bytes_freed),
            aborted_by: result.aborted_by.clone(),
            dry_run: result.dry_run,
            would_delete: result.would_delete.iter().map(|id| id.0).collect(),
        }
    }

    /// 200, or 502 when the media server became unreachable mid-batch.
    #[must_use]
    pub const fn status(&self) -> u16 {
        if self.aborted_by.is_some() { 502 } else { 200 }
    }
}

fn failure_message(reason: &ExecutionFailure) -> String {
    match reason {
        ExecutionFailure::NotFound => "Item not found".to_string(),
        other => other.to_string(),
    }
}

// ──────────────────── errors ────────────────────

/// Error body. `code` separates policy rejections from execution failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status: u16,
    pub code: String,
    pub error: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub protected_ids: Vec<u64>,
}

impl ErrorBody {
    #[must_use]
    pub fn from_rejection(reason: &RejectionReason) -> Self {
        Self {
            status: reason.http_status(),
            code: reason.code().to_string(),
            error: reason.to_string(),
            protected_ids: reason.protected_ids().iter().map(|id| id.0).collect(),
        }
    }

    #[must_use]
    pub fn from_error(err: &CullError) -> Self {
        if let CullError::Unauthorized { reason } = err {
            return Self::from_rejection(reason);
        }
        let status = match err {
            CullError::Validation { .. } => 400,
            CullError::Connectivity { .. } => 502,
            _ => 500,
        };
        Self {
            status,
            code: err.code().to_string(),
            error: err.to_string(),
            protected_ids: Vec::new(),
        }
    }
}

// ──────────────────── analysis views ────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedItemBody {
    pub rating_key: u64,
    pub title: String,
    pub year: Option<i32>,
    pub size_gb: f64,
    pub play_count: u32,
    pub rating: Option<f64>,
    pub quality: String,
    pub deletion_score: f64,
    pub recommended: bool,
    pub protected: bool,
    pub vetoed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub veto_reason: Option<String>,
    pub rationale: BTreeMap<String, f64>,
    pub notes: Vec<String>,
}

impl From<&AnalyzedItem> for AnalyzedItemBody {
    fn from(analyzed: &AnalyzedItem) -> Self {
        let item = &analyzed.item;
        let score = &analyzed.score;
        Self {
            rating_key: score.id.0,
            title: item.title.clone(),
            year: item.year,
            size_gb: bytes_to_gb(item.file_size_bytes),
            play_count: item.play_count,
            rating: item.external_rating_avg,
            quality: item.quality.label().to_string(),
            deletion_score: (score.value * 1000.0).round() / 1000.0,
            recommended: analyzed.recommended,
            protected: analyzed.protected,
            vetoed: score.vetoed,
            veto_reason: score.veto_reason.clone(),
            rationale: score
                .ledger
                .rationale()
                .into_iter()
                .map(|(name, contribution)| (name.to_string(), contribution))
                .collect(),
            notes: score
                .ledger
                .terms
                .iter()
                .map(|term| term.note.clone())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityCounts {
    pub high_priority: usize,
    pub medium_priority: usize,
    pub low_priority: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceRecovery {
    pub top_50_gb: f64,
    pub top_100_gb: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryStatsBody {
    pub total_movies: usize,
    pub total_size_gb: f64,
    pub never_watched: usize,
    pub delete_candidates: PriorityCounts,
    pub space_recovery: SpaceRecovery,
    pub last_updated: Option<DateTime<Utc>>,
}

impl LibraryStatsBody {
    #[must_use]
    pub fn new(stats: &LibraryStats, last_updated: Option<DateTime<Utc>>) -> Self {
        Self {
            total_movies: stats.total_items,
            total_size_gb: bytes_to_gb(stats.total_bytes),
            never_watched: stats.never_watched,
            delete_candidates: PriorityCounts {
                high_priority: stats.high_priority,
                medium_priority: stats.medium_priority,
                low_priority: stats.low_priority,
            },
            space_recovery: SpaceRecovery {
                top_50_gb: bytes_to_gb(stats.top_50_bytes),
                top_100_gb: bytes_to_gb(stats.top_100_bytes),
            },
            last_updated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curation::deletion::{DeletedItem, FailedItem};

    #[test]
    fn request_body_defaults_confirmations_to_not_given() {
        let body: DeleteRequestBody = serde_json::from_str(
            r#"{"rating_keys": [1, 2], "password": "pw", "delete_files": true, "untouchables": [9]}"#,
        )
        .unwrap();
        assert_eq!(body.confirmations, [false; 3]);
        let request = body.to_request();
        assert_eq!(request.candidate_ids, vec![ItemId(1), ItemId(2)]);
        assert!(request.also_delete_physical_files);
        assert_eq!(request.secret_attempt.expose(), "pw");
    }

    #[test]
    fn client_untouchables_only_widen_protection() {
        let body = DeleteRequestBody {
            rating_keys: vec![1],
            password: String::new(),
            delete_files: false,
            untouchables: vec![5],
            confirmations: [true; 3],
        };
        let authoritative: ProtectionSnapshot = [ItemId(4)].into_iter().collect();
        let effective = body.effective_snapshot(&authoritative);
        assert!(effective.contains(ItemId(4)));
        assert!(effective.contains(ItemId(5)));
    }

    #[test]
    fn response_body_matches_contract() {
        let result = DeletionResult {
            succeeded: vec![DeletedItem {
                id: ItemId(1),
                title: "Heat".into(),
                year: Some(1995),
                bytes_freed: 2 * 1_073_741_824,
            }],
            failed: vec![FailedItem {
                id: ItemId(2),
                title: None,
                reason: ExecutionFailure::NotFound,
            }],
            total_bytes_freed: 2 * 1_073_741_824,
            ..DeletionResult::default()
        };
        let body = DeleteResponseBody::from_result(&result, true);
        assert_eq!(body.status(), 200);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["total"], 2);
        assert_eq!(json["succeeded"][0]["rating_key"], 1);
        assert_eq!(json["succeeded"][0]["files_deleted"], true);
        assert_eq!(json["failed"][0]["error"], "Item not found");
        assert_eq!(json["space_freed_gb"], 2.0);
        assert!(json.get("aborted_by").is_none());
        assert!(json.get("dry_run").is_none());
    }

    #[test]
    fn dry_run_lists_would_be_deletions() {
        let result = DeletionResult {
            dry_run: true,
            would_delete: vec![ItemId(4), ItemId(8)],
            ..DeletionResult::default()
        };
        let body = DeleteResponseBody::from_result(&result, false);
        assert_eq!(body.status(), 200);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["total"], 2);
        assert_eq!(json["dry_run"], true);
        assert_eq!(json["would_delete"], serde_json::json!([4, 8]));
        assert_eq!(json["space_freed_gb"], 0.0);
    }

    #[test]
    fn aborted_batches_answer_bad_gateway() {
        let result = DeletionResult {
            aborted_by: Some("connection refused".into()),
            ..DeletionResult::default()
        };
        assert_eq!(DeleteResponseBody::from_result(&result, false).status(), 502);
    }

    #[test]
    fn policy_rejections_and_connectivity_have_distinct_statuses() {
        let protected = ErrorBody::from_rejection(&RejectionReason::ProtectedItemsIncluded {
            ids: vec![ItemId(3)],
        });
        assert_eq!(protected.status, 403);
        assert_eq!(protected.protected_ids, vec![3]);

        let secret = ErrorBody::from_error(&CullError::from(RejectionReason::InvalidSecret));
        assert_eq!(secret.status, 401);
        assert_eq!(secret.code, "invalid_secret");

        let incomplete = ErrorBody::from_rejection(&RejectionReason::IncompleteConfirmation {
            first_missing: 2,
        });
        assert_eq!(incomplete.status, 400);

        let offline = ErrorBody::from_error(&CullError::Connectivity {
            details: "timeout".into(),
        });
        assert_eq!(offline.status, 502);
        assert_eq!(offline.code, "MCL-2101");
        let json = serde_json::to_value(&offline).unwrap();
        assert!(json.get("protected_ids").is_none());
    }

    #[test]
    fn gb_rounding() {
        assert!((bytes_to_gb(1_610_612_736) - 1.5).abs() < f64::EPSILON);
        assert!(bytes_to_gb(0).abs() < f64::EPSILON);
    }
}
