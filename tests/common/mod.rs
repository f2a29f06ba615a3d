//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use media_cull::curation::deletion::{DeleteCollaborator, DeletedItem, ExecutionFailure};
use media_cull::library::item::{ItemId, MediaItem, QualityRank};
use media_cull::library::source::MetadataSource;

pub const SECRET: &str = "let me delete";

pub fn fixed_now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-09-01T08:00:00Z")
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap()
}

/// A small movie library with an obvious deletion candidate, a vetoed
/// classic, a recently watched title and a mid-range one.
pub fn sample_library() -> Vec<MediaItem> {
    let now = fixed_now();
    vec![
        MediaItem::new(101_u64, "Forgettable Sequel", now - Duration::days(800))
            .with_year(2017)
            .with_rating(3.2)
            .with_size(10_000_000_000)
            .with_quality(QualityRank::Sd),
        MediaItem::new(102_u64, "Acclaimed Classic", now - Duration::days(800))
            .with_year(1972)
            .with_rating(8.5)
            .with_size(10_000_000_000)
            .with_quality(QualityRank::Sd),
        MediaItem::new(103_u64, "Weekend Rewatch", now - Duration::days(400))
            .with_year(2021)
            .with_play_count(6)
            .with_last_viewed_at(now - Duration::days(2))
            .with_rating(7.1)
            .with_size(4_000_000_000)
            .with_quality(QualityRank::FullHd),
        MediaItem::new(104_u64, "Background Noise", now - Duration::days(1_500))
            .with_year(2009)
            .with_rating(4.0)
            .with_size(14_000_000_000)
            .with_quality(QualityRank::Hd),
    ]
}

/// In-memory media server.
#[derive(Default)]
pub struct FakeMediaServer {
    items: HashMap<ItemId, MediaItem>,
    failures: HashMap<ItemId, ExecutionFailure>,
    pub deleted: Mutex<Vec<(ItemId, bool)>>,
}

impl FakeMediaServer {
    pub fn with_items(items: &[MediaItem]) -> Self {
        Self {
            items: items
                .iter()
                .filter_map(|item| item.id.map(|id| (id, item.clone())))
                .collect(),
            ..Self::default()
        }
    }

    pub fn failing(mut self, id: u64, failure: ExecutionFailure) -> Self {
        self.failures.insert(ItemId(id), failure);
        self
    }

    pub fn deleted_ids(&self) -> Vec<ItemId> {
        self.deleted.lock().iter().map(|(id, _)| *id).collect()
    }
}

impl DeleteCollaborator for FakeMediaServer {
    fn delete(&self, id: ItemId, also_delete_files: bool) -> Result<DeletedItem, ExecutionFailure> {
        if let Some(failure) = self.failures.get(&id) {
            return Err(failure.clone());
        }
        let item = self.items.get(&id).ok_or(ExecutionFailure::NotFound)?;
        self.deleted.lock().push((id, also_delete_files));
        Ok(DeletedItem {
            id,
            title: item.title.clone(),
            year: item.year,
            bytes_freed: item.file_size_bytes,
        })
    }

    fn title_of(&self, id: ItemId) -> Option<String> {
        self.items.get(&id).map(|item| item.title.clone())
    }
}

impl MetadataSource for FakeMediaServer {
    fn fetch_library_items(
        &self,
        _library: &str,
    ) -> media_cull::core::errors::Result<Vec<MediaItem>> {
        let mut items: Vec<MediaItem> = self.items.values().cloned().collect();
        items.sort_by_key(|item| item.id);
        Ok(items)
    }
}
