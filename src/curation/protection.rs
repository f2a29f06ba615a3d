//! Authoritative registry of never-delete ("untouchable") items.
//!
//! The registry is the single source of truth. Client-side caches are read
//! replicas: they may add protection for a request (see
//! [`ProtectionSnapshot::union_with`]) but can never remove it.

#![allow(missing_docs)]

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::library::item::ItemId;
use crate::logger::activity::{ActivityEvent, ActivityLoggerHandle};

/// Optional metadata recorded alongside a protection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProtectionMetadata {
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub protected_by: Option<String>,
    #[serde(default)]
    pub protected_at: Option<DateTime<Utc>>,
}

impl ProtectionMetadata {
    #[must_use]
    pub fn because(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            protected_by: None,
            protected_at: Some(Utc::now()),
        }
    }
}

/// A single protection entry for listing purposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtectionEntry {
    pub id: ItemId,
    pub metadata: ProtectionMetadata,
}

/// Immutable point-in-time copy of the protected ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectionSnapshot {
    ids: BTreeSet<ItemId>,
}

impl ProtectionSnapshot {
    #[must_use]
    pub fn contains(&self, id: ItemId) -> bool {
        self.ids.contains(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.ids.iter().copied()
    }

    /// Ids of `candidates` that are protected, in candidate order, without repeats.
    #[must_use]
    pub fn intersection(&self, candidates: &[ItemId]) -> Vec<ItemId> {
        let mut seen = HashSet::new();
        candidates
            .iter()
            .copied()
            .filter(|id| self.ids.contains(id) && seen.insert(*id))
            .collect()
    }

    /// Widen the snapshot with ids a client claims are protected.
    #[must_use]
    pub fn union_with(&self, extra: impl IntoIterator<Item = ItemId>) -> Self {
        let mut ids = self.ids.clone();
        ids.extend(extra);
        Self { ids }
    }
}

impl FromIterator<ItemId> for ProtectionSnapshot {
    fn from_iter<I: IntoIterator<Item = ItemId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

/// Difference between the registry and a client-held replica.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Protected in the registry but absent from the replica; the client must add these.
    pub missing_from_replica: Vec<ItemId>,
    /// Present in the replica only. Still honored for the client's own requests.
    pub unknown_to_registry: Vec<ItemId>,
}

impl ReconcileReport {
    #[must_use]
    pub fn in_sync(&self) -> bool {
        self.missing_from_replica.is_empty() && self.unknown_to_registry.is_empty()
    }
}

/// Thread-safe set of protected ids. Mutations are serialized by the lock and
/// idempotent; nothing ever clears the set implicitly.
#[derive(Debug, Default)]
pub struct ProtectionRegistry {
    entries: RwLock<BTreeMap<ItemId, ProtectionMetadata>>,
    logger: Option<ActivityLoggerHandle>,
}

impl ProtectionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the registry, e.g. from a persisted list loaded by the caller.
    #[must_use]
    pub fn from_ids(ids: impl IntoIterator<Item = ItemId>) -> Self {
        let entries = ids
            .into_iter()
            .map(|id| (id, ProtectionMetadata::default()))
            .collect();
        Self {
            entries: RwLock::new(entries),
            logger: None,
        }
    }

    /// Record every change of protection in the activity log.
    #[must_use]
    pub fn with_logger(mut self, logger: ActivityLoggerHandle) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Protect `id`. Returns `true` if it was not already protected.
    pub fn add(&self, id: ItemId) -> bool {
        self.add_with(id, ProtectionMetadata::default())
    }

    /// Protect `id` with metadata. An existing protection keeps its original metadata.
    pub fn add_with(&self, id: ItemId, metadata: ProtectionMetadata) -> bool {
        let reason = metadata.reason.clone();
        {
            let mut entries = self.entries.write();
            if entries.contains_key(&id) {
                return false;
            }
            entries.insert(id, metadata);
        }
        self.log_change(id, true, reason);
        true
    }

    /// Remove protection. Returns `true` if `id` was protected.
    pub fn remove(&self, id: ItemId) -> bool {
        let removed = self.entries.write().remove(&id).is_some();
        if removed {
            self.log_change(id, false, None);
        }
        removed
    }

    fn log_change(&self, id: ItemId, protected: bool, reason: Option<String>) {
        if let Some(logger) = &self.logger {
            logger.send(ActivityEvent::ProtectionChanged {
                id: id.0,
                protected,
                reason,
            });
        }
    }

    #[must_use]
    pub fn contains(&self, id: ItemId) -> bool {
        self.entries.read().contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    #[must_use]
    pub fn snapshot(&self) -> ProtectionSnapshot {
        self.entries.read().keys().copied().collect()
    }

    /// All protections with their metadata, ordered by id.
    #[must_use]
    pub fn list_protections(&self) -> Vec<ProtectionEntry> {
        self.entries
            .read()
            .iter()
            .map(|(id, metadata)| ProtectionEntry {
                id: *id,
                metadata: metadata.clone(),
            })
            .collect()
    }

    /// Split `ids` into (allowed, protected), preserving order.
    #[must_use]
    pub fn partition(&self, ids: &[ItemId]) -> (Vec<ItemId>, Vec<ItemId>) {
        let entries = self.entries.read();
        ids.iter()
            .copied()
            .partition(|id| !entries.contains_key(id))
    }

    /// Compare a client replica against the registry. The registry is not modified.
    #[must_use]
    pub fn reconcile(&self, client_replica: &[ItemId]) -> ReconcileReport {
        let entries = self.entries.read();
        let replica: BTreeSet<ItemId> = client_replica.iter().copied().collect();
        ReconcileReport {
            missing_from_replica: entries
                .keys()
                .filter(|id| !replica.contains(id))
                .copied()
                .collect(),
            unknown_to_registry: replica
                .iter()
                .filter(|id| !entries.contains_key(id))
                .copied()
                .collect(),
        }
    }
}
