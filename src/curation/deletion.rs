//! Deletion executor: per-item deletion of an authorized batch through an
//! injected media-server collaborator.
//!
//! Pipeline: scored items -> [`DeletionPlan::select`] -> authorization ->
//! [`DeletionExecutor::execute_batch`] -> [`DeletionResult`].
//!
//! - Items fail independently; nothing is rolled back.
//! - A connectivity failure stops the batch: no new attempts start and the
//!   rest are recorded as not attempted.
//! - Deletes run on a small bounded worker pool. Results come back in input order.
//! - In dry-run mode nothing reaches the media server; the result lists what
//!   would have been deleted.

#![allow(missing_docs)]

use std::cmp::Ordering as CmpOrdering;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::unbounded;
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;

use crate::core::config::{Config, MAX_DELETE_PARALLELISM};
use crate::curation::authorization::{AuthorizedBatch, DeletionRequest};
use crate::curation::protection::{ProtectionRegistry, ProtectionSnapshot};
use crate::curation::scoring::DeletionScore;
use crate::library::item::{ItemId, MediaItem};
use crate::logger::activity::{ActivityEvent, ActivityLoggerHandle};

// ──────────────────── collaborator ────────────────────

/// What the media server reports for a successful delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletedItem {
    pub id: ItemId,
    pub title: String,
    pub year: Option<i32>,
    pub bytes_freed: u64,
}

/// Why a single item was not deleted.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "details", rename_all = "snake_case")]
pub enum ExecutionFailure {
    #[error("item no longer exists on the media server")]
    NotFound,

    #[error("media server rejected the delete: {0}")]
    RemoteRejected(String),

    #[error("media server unreachable: {0}")]
    Connectivity(String),

    #[error("not attempted: {cause}")]
    NotAttempted { cause: String },

    #[error("item became protected after authorization")]
    Protected,
}

impl ExecutionFailure {
    /// Whether this failure stops the rest of the batch.
    #[must_use]
    pub const fn is_batch_fatal(&self) -> bool {
        matches!(self, Self::Connectivity(_))
    }
}

/// The single per-item operation the executor depends on.
///
/// Implementations talk to the media server; they must be callable from
/// several worker threads at once.
pub trait DeleteCollaborator: Sync {
    fn delete(&self, id: ItemId, also_delete_files: bool) -> Result<DeletedItem, ExecutionFailure>;

    /// Display title for failure records, when known.
    fn title_of(&self, _id: ItemId) -> Option<String> {
        None
    }
}

// ──────────────────── result ────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedItem {
    pub id: ItemId,
    pub title: Option<String>,
    pub reason: ExecutionFailure,
}

/// Outcome of one batch. `succeeded` and `failed` keep input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeletionResult {
    pub succeeded: Vec<DeletedItem>,
    pub failed: Vec<FailedItem>,
    pub total_bytes_freed: u64,
    /// Connectivity failure that stopped the batch early.
    pub aborted_by: Option<String>,
    /// Set when the batch ran in dry-run mode.
    pub dry_run: bool,
    /// Ids a dry run would have deleted.
    pub would_delete: Vec<ItemId>,
    #[serde(skip)]
    pub duration: Duration,
}

impl DeletionResult {
    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len() + self.would_delete.len()
    }

    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    #[must_use]
    pub fn not_attempted(&self) -> usize {
        self.failed
            .iter()
            .filter(|failed| matches!(failed.reason, ExecutionFailure::NotAttempted { .. }))
            .count()
    }
}

// ──────────────────── plan ────────────────────

/// One selected candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedDeletion {
    pub id: ItemId,
    pub title: String,
    pub size_bytes: u64,
    pub score: f64,
}

/// Selection stage: which scored items are worth putting in front of the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeletionPlan {
    /// Highest score first.
    pub candidates: Vec<PlannedDeletion>,
    pub total_reclaimable_bytes: u64,
    /// Items that would have qualified but are protected.
    pub skipped_protected: Vec<ItemId>,
    pub skipped_vetoed: usize,
}

impl DeletionPlan {
    /// Keep non-vetoed, unprotected items scoring at least `min_score`.
    pub fn select<'a>(
        scored: impl IntoIterator<Item = (&'a MediaItem, &'a DeletionScore)>,
        min_score: f64,
        snapshot: &ProtectionSnapshot,
    ) -> Self {
        let mut plan = Self::default();
        for (item, score) in scored {
            if score.vetoed {
                plan.skipped_vetoed += 1;
                continue;
            }
            if score.value < min_score {
                continue;
            }
            if snapshot.contains(score.id) {
                plan.skipped_protected.push(score.id);
                continue;
            }
            plan.candidates.push(PlannedDeletion {
                id: score.id,
                title: item.title.clone(),
                size_bytes: item.file_size_bytes,
                score: score.value,
            });
        }

        plan.candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(CmpOrdering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        plan.total_reclaimable_bytes = plan.candidates.iter().map(|c| c.size_bytes).sum();
        plan
    }

    #[must_use]
    pub fn ids(&self) -> Vec<ItemId> {
        self.candidates.iter().map(|c| c.id).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// An unconfirmed request for every planned item.
    #[must_use]
    pub fn to_request(&self) -> DeletionRequest {
        DeletionRequest::new(self.ids())
    }
}

// ──────────────────── executor ────────────────────

enum Outcome {
    Deleted(DeletedItem),
    Failed(FailedItem),
}

/// Runs authorized batches against a [`DeleteCollaborator`].
#[derive(Debug, Clone)]
pub struct DeletionExecutor {
    parallelism: usize,
    dry_run: bool,
    protection: Option<Arc<ProtectionRegistry>>,
    logger: Option<ActivityLoggerHandle>,
}

impl Default for DeletionExecutor {
    fn default() -> Self {
        Self::new(1)
    }
}

impl DeletionExecutor {
    /// `parallelism` is clamped to `1..=MAX_DELETE_PARALLELISM`.
    #[must_use]
    pub fn new(parallelism: usize) -> Self {
        Self {
            parallelism: parallelism.clamp(1, MAX_DELETE_PARALLELISM),
            dry_run: false,
            protection: None,
            logger: None,
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.deletion.parallelism).dry_run(config.deletion.dry_run)
    }

    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Re-check each id against the live registry right before deleting it.
    #[must_use]
    pub fn with_protection(mut self, registry: Arc<ProtectionRegistry>) -> Self {
        self.protection = Some(registry);
        self
    }

    #[must_use]
    pub fn with_logger(mut self, logger: ActivityLoggerHandle) -> Self {
        self.logger = Some(logger);
        self
    }

    #[must_use]
    pub const fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Delete every id in `batch`.
    ///
    /// Physical files are removed only if both the authorized request and
    /// `also_delete_files` ask for it; callers can narrow the authorization,
    /// never widen it.
    pub fn execute_batch(
        &self,
        batch: &AuthorizedBatch,
        also_delete_files: bool,
        collaborator: &dyn DeleteCollaborator,
    ) -> DeletionResult {
        let start = Instant::now();
        let delete_files = batch.also_delete_files() && also_delete_files;
        let ids = batch.ids();
        self.log_event(ActivityEvent::BatchStarted {
            item_count: ids.len(),
            also_delete_files: delete_files,
            dry_run: self.dry_run,
        });

        if self.dry_run {
            let mut result = self.preview(ids, collaborator);
            result.duration = start.elapsed();
            self.log_completion(&result);
            return result;
        }

        let aborted = AtomicBool::new(false);
        let abort_cause: Mutex<Option<String>> = Mutex::new(None);
        let (job_tx, job_rx) = unbounded::<(usize, ItemId)>();
        let (result_tx, result_rx) = unbounded::<(usize, Outcome)>();
        for job in ids.iter().copied().enumerate() {
            let _ = job_tx.send(job);
        }
        drop(job_tx);

        let workers = self.parallelism.min(ids.len()).max(1);
        thread::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                let aborted = &aborted;
                let abort_cause = &abort_cause;
                scope.spawn(move || {
                    while let Ok((index, id)) = job_rx.recv() {
                        let outcome = if aborted.load(Ordering::Acquire) {
                            let cause = abort_cause.lock().clone().unwrap_or_default();
                            let reason = ExecutionFailure::NotAttempted { cause };
                            Outcome::Failed(failure(collaborator, id, reason))
                        } else {
                            self.attempt(id, delete_files, collaborator, aborted, abort_cause)
                        };
                        if result_tx.send((index, outcome)).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(result_tx);

        let mut ordered: Vec<Option<Outcome>> = (0..ids.len()).map(|_| None).collect();
        for (index, outcome) in result_rx.iter() {
            if let Some(slot) = ordered.get_mut(index) {
                *slot = Some(outcome);
            }
        }

        let mut result = DeletionResult::default();
        for outcome in ordered.into_iter().flatten() {
            match outcome {
                Outcome::Deleted(item) => {
                    result.total_bytes_freed += item.bytes_freed;
                    result.succeeded.push(item);
                }
                Outcome::Failed(failed) => result.failed.push(failed),
            }
        }
        result.aborted_by = abort_cause.into_inner();
        result.duration = start.elapsed();
        self.log_completion(&result);
        result
    }

    /// Dry run: protection is still re-checked, the collaborator is never called.
    fn preview(&self, ids: &[ItemId], collaborator: &dyn DeleteCollaborator) -> DeletionResult {
        let mut result = DeletionResult {
            dry_run: true,
            ..DeletionResult::default()
        };
        for &id in ids {
            if self.protected_now(id) {
                result
                    .failed
                    .push(self.record_failure(collaborator, id, ExecutionFailure::Protected));
            } else {
                result.would_delete.push(id);
            }
        }
        result
    }

    fn log_completion(&self, result: &DeletionResult) {
        match &result.aborted_by {
            Some(cause) => self.log_event(ActivityEvent::BatchAborted {
                cause: cause.clone(),
                not_attempted: result.not_attempted(),
            }),
            None => self.log_event(ActivityEvent::BatchCompleted {
                succeeded: result.succeeded.len(),
                failed: result.failed.len(),
                bytes_freed: result.total_bytes_freed,
                duration_ms: u64::try_from(result.duration.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }

    fn protected_now(&self, id: ItemId) -> bool {
        self.protection
            .as_ref()
            .is_some_and(|registry| registry.contains(id))
    }

    fn attempt(
        &self,
        id: ItemId,
        delete_files: bool,
        collaborator: &dyn DeleteCollaborator,
        aborted: &AtomicBool,
        abort_cause: &Mutex<Option<String>>,
    ) -> Outcome {
        if self.protected_now(id) {
            let failed = self.record_failure(collaborator, id, ExecutionFailure::Protected);
            return Outcome::Failed(failed);
        }

        match collaborator.delete(id, delete_files) {
            Ok(deleted) => {
                self.log_event(ActivityEvent::ItemDeleted {
                    id: id.0,
                    title: deleted.title.clone(),
                    bytes_freed: deleted.bytes_freed,
                });
                Outcome::Deleted(deleted)
            }
            Err(reason) => {
                if let ExecutionFailure::Connectivity(details) = &reason {
                    let mut cause = abort_cause.lock();
                    if cause.is_none() {
                        *cause = Some(details.clone());
                    }
                    aborted.store(true, Ordering::Release);
                }
                Outcome::Failed(self.record_failure(collaborator, id, reason))
            }
        }
    }

    fn record_failure(
        &self,
        collaborator: &dyn DeleteCollaborator,
        id: ItemId,
        reason: ExecutionFailure,
    ) -> FailedItem {
        self.log_event(ActivityEvent::ItemDeletionFailed {
            id: id.0,
            reason: reason.to_string(),
        });
        failure(collaborator, id, reason)
    }

    fn log_event(&self, event: ActivityEvent) {
        if let Some(logger) = &self.logger {
            logger.send(event);
        }
    }
}

fn failure(
    collaborator: &dyn DeleteCollaborator,
    id: ItemId,
    reason: ExecutionFailure,
) -> FailedItem {
    FailedItem {
        id,
        title: collaborator.title_of(id),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Secret;
    use crate::curation::authorization::DeletionAuthorizer;
    use crate::curation::scoring::{NormalizationContext, ScoringEngine};
    use crate::core::config::ScoringConfig;
    use chrono::{Duration as ChronoDuration, Utc};
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;

    const SECRET: &str = "s3cret";

    #[derive(Default)]
    struct FakeServer {
        failures: HashMap<u64, ExecutionFailure>,
        calls: AtomicUsize,
        files_requested: AtomicBool,
    }

    impl FakeServer {
        fn failing(mut self, id: u64, failure: ExecutionFailure) -> Self {
            self.failures.insert(id, failure);
            self
        }
    }

    impl DeleteCollaborator for FakeServer {
        fn delete(
            &self,
            id: ItemId,
            also_delete_files: bool,
        ) -> Result<DeletedItem, ExecutionFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if also_delete_files {
                self.files_requested.store(true, Ordering::SeqCst);
            }
            if let Some(failure) = self.failures.get(&id.0) {
                return Err(failure.clone());
            }
            Ok(DeletedItem {
                id,
                title: format!("Movie {id}"),
                year: Some(2000),
                bytes_freed: id.0 * 1_000,
            })
        }

        fn title_of(&self, id: ItemId) -> Option<String> {
            Some(format!("Movie {id}"))
        }
    }

    fn authorize(raw: &[u64], delete_files: bool) -> AuthorizedBatch {
        DeletionAuthorizer::new(&Secret::new(SECRET))
            .authorize(
                &DeletionRequest::new(raw.iter().copied().map(ItemId))
                    .confirmed()
                    .with_secret(SECRET)
                    .deleting_files(delete_files),
                &ProtectionSnapshot::default(),
            )
            .unwrap()
    }

    #[test]
    fn partial_failure_keeps_siblings_and_order() {
        let server = FakeServer::default().failing(2, ExecutionFailure::NotFound);
        let result =
            DeletionExecutor::new(1).execute_batch(&authorize(&[1, 2, 3], false), false, &server);

        let succeeded: Vec<u64> = result.succeeded.iter().map(|s| s.id.0).collect();
        assert_eq!(succeeded, vec![1, 3]);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].id, ItemId(2));
        assert_eq!(result.failed[0].reason, ExecutionFailure::NotFound);
        assert_eq!(result.failed[0].title.as_deref(), Some("Movie 2"));
        assert_eq!(result.total_bytes_freed, 4_000);
        assert!(result.aborted_by.is_none());
        assert_eq!(result.total(), 3);
    }

    #[test]
    fn remote_rejection_is_per_item() {
        let server =
            FakeServer::default().failing(1, ExecutionFailure::RemoteRejected("403".into()));
        let result =
            DeletionExecutor::new(1).execute_batch(&authorize(&[1, 2], false), false, &server);
        assert_eq!(result.succeeded.len(), 1);
        assert_eq!(server.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn connectivity_failure_aborts_the_remainder() {
        let server =
            FakeServer::default().failing(2, ExecutionFailure::Connectivity("refused".into()));
        let batch = authorize(&[1, 2, 3, 4], false);
        let result = DeletionExecutor::new(1).execute_batch(&batch, false, &server);

        assert_eq!(server.calls.load(Ordering::SeqCst), 2);
        assert_eq!(result.succeeded.len(), 1);
        assert_eq!(result.aborted_by.as_deref(), Some("refused"));
        let reasons: Vec<&ExecutionFailure> = result.failed.iter().map(|f| &f.reason).collect();
        assert_eq!(
            reasons,
            vec![
                &ExecutionFailure::Connectivity("refused".into()),
                &ExecutionFailure::NotAttempted {
                    cause: "refused".into()
                },
                &ExecutionFailure::NotAttempted {
                    cause: "refused".into()
                },
            ]
        );
        assert_eq!(result.not_attempted(), 2);
    }

    #[test]
    fn parallel_execution_preserves_input_order() {
        let raw: Vec<u64> = (1..=40).rev().collect();
        let server = FakeServer::default().failing(17, ExecutionFailure::NotFound);
        let result =
            DeletionExecutor::new(4).execute_batch(&authorize(&raw, false), false, &server);

        let expected: Vec<u64> = raw.iter().copied().filter(|id| *id != 17).collect();
        let succeeded: Vec<u64> = result.succeeded.iter().map(|s| s.id.0).collect();
        assert_eq!(succeeded, expected);
        assert_eq!(server.calls.load(Ordering::SeqCst), 40);
    }

    #[test]
    fn connectivity_abort_under_parallelism_accounts_for_every_id() {
        let raw: Vec<u64> = (1..=200).collect();
        for _ in 0..20 {
            let server =
                FakeServer::default().failing(20, ExecutionFailure::Connectivity("reset".into()));
            let result =
                DeletionExecutor::new(4).execute_batch(&authorize(&raw, false), false, &server);

            let mut seen: Vec<u64> = result
                .succeeded
                .iter()
                .map(|s| s.id.0)
                .chain(result.failed.iter().map(|f| f.id.0))
                .collect();
            seen.sort_unstable();
            assert_eq!(seen, raw);
            assert_eq!(result.total(), 200);
            assert_eq!(result.aborted_by.as_deref(), Some("reset"));

            let calls = server.calls.load(Ordering::SeqCst);
            assert!(calls < 200);
            assert_eq!(result.not_attempted(), 200 - calls);
            assert!(result.failed.iter().any(|f| {
                f.id == ItemId(20) && f.reason == ExecutionFailure::Connectivity("reset".into())
            }));

            let failed: Vec<u64> = result.failed.iter().map(|f| f.id.0).collect();
            assert!(failed.windows(2).all(|pair| pair[0] < pair[1]));
        }
    }

    #[test]
    fn dry_run_never_calls_the_media_server() {
        let registry = Arc::new(ProtectionRegistry::new());
        let batch = authorize(&[1, 2, 3], true);
        registry.add(ItemId(2));

        let mut config = Config::default();
        config.deletion.dry_run = true;
        let executor = DeletionExecutor::from_config(&config).with_protection(registry);
        assert!(executor.is_dry_run());

        let server = FakeServer::default();
        let result = executor.execute_batch(&batch, true, &server);
        assert_eq!(server.calls.load(Ordering::SeqCst), 0);
        assert!(result.dry_run);
        assert_eq!(result.would_delete, vec![ItemId(1), ItemId(3)]);
        assert!(result.succeeded.is_empty());
        assert_eq!(result.failed[0].reason, ExecutionFailure::Protected);
        assert_eq!(result.total_bytes_freed, 0);
        assert_eq!(result.total(), 3);
    }

    #[test]
    fn dry_run_is_logged_as_such() {
        let (handle, rx) = ActivityLoggerHandle::channel(16);
        DeletionExecutor::new(1)
            .dry_run(true)
            .with_logger(handle)
            .execute_batch(&authorize(&[1], false), false, &FakeServer::default());

        let events: Vec<ActivityEvent> = rx.try_iter().collect();
        assert!(matches!(events[0], ActivityEvent::BatchStarted { dry_run: true, .. }));
        assert!(matches!(
            events[1],
            ActivityEvent::BatchCompleted {
                succeeded: 0,
                failed: 0,
                ..
            }
        ));
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn parallelism_is_bounded() {
        assert_eq!(DeletionExecutor::new(0).parallelism(), 1);
        assert_eq!(DeletionExecutor::new(64).parallelism(), MAX_DELETE_PARALLELISM);
    }

    #[test]
    fn file_deletion_requires_authorization_and_caller() {
        let server = FakeServer::default();
        DeletionExecutor::new(1).execute_batch(&authorize(&[1], false), true, &server);
        assert!(!server.files_requested.load(Ordering::SeqCst));

        let server = FakeServer::default();
        DeletionExecutor::new(1).execute_batch(&authorize(&[1], true), true, &server);
        assert!(server.files_requested.load(Ordering::SeqCst));
    }

    #[test]
    fn items_protected_after_authorization_are_skipped() {
        let registry = Arc::new(ProtectionRegistry::new());
        let batch = authorize(&[1, 2], false);
        registry.add(ItemId(2));

        let server = FakeServer::default();
        let result = DeletionExecutor::new(1)
            .with_protection(Arc::clone(&registry))
            .execute_batch(&batch, false, &server);
        assert_eq!(server.calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.failed[0].reason, ExecutionFailure::Protected);
    }

    #[test]
    fn batch_outcomes_are_logged() {
        let (handle, rx) = ActivityLoggerHandle::channel(16);
        let server = FakeServer::default().failing(2, ExecutionFailure::NotFound);
        DeletionExecutor::new(1)
            .with_logger(handle)
            .execute_batch(&authorize(&[1, 2], false), false, &server);

        let events: Vec<ActivityEvent> = rx.try_iter().collect();
        assert!(matches!(events[0], ActivityEvent::BatchStarted { item_count: 2, .. }));
        assert!(matches!(events[1], ActivityEvent::ItemDeleted { id: 1, .. }));
        assert!(matches!(events[2], ActivityEvent::ItemDeletionFailed { id: 2, .. }));
        assert!(matches!(
            events[3],
            ActivityEvent::BatchCompleted {
                succeeded: 1,
                failed: 1,
                ..
            }
        ));
    }

    #[test]
    fn plan_filters_and_orders_candidates() {
        let now = Utc::now();
        let old = now - ChronoDuration::days(900);
        let items = vec![
            MediaItem::new(1_u64, "stale", old).with_rating(2.0).with_size(5_000),
            MediaItem::new(2_u64, "beloved", old).with_rating(9.1).with_size(9_000),
            MediaItem::new(3_u64, "protected", old).with_rating(2.0).with_size(7_000),
            MediaItem::new(4_u64, "fresh", now).with_play_count(12).with_rating(6.0),
            MediaItem::new(5_u64, "staler", old).with_rating(1.0).with_size(6_000),
        ];
        let engine = ScoringEngine::new(Default::default(), Default::default()).unwrap();
        let ctx = NormalizationContext::from_batch(&items, &ScoringConfig::default());
        let scores: Vec<DeletionScore> = items
            .iter()
            .map(|item| engine.score_item(item, &ctx, now).unwrap())
            .collect();
        let snapshot: ProtectionSnapshot = [ItemId(3)].into_iter().collect();

        let plan = DeletionPlan::select(items.iter().zip(scores.iter()), 0.7, &snapshot);
        assert_eq!(plan.ids(), vec![ItemId(5), ItemId(1)]);
        assert_eq!(plan.skipped_protected, vec![ItemId(3)]);
        assert_eq!(plan.skipped_vetoed, 1);
        assert_eq!(plan.total_reclaimable_bytes, 11_000);
        assert_eq!(plan.to_request().candidate_ids, plan.ids());
    }
}
