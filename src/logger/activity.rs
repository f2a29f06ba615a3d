//! Background activity logger.
//!
//! A dedicated thread owns the [`JsonlWriter`]. Everything else holds an
//! [`ActivityLoggerHandle`] and sends [`ActivityEvent`]s over a bounded
//! crossbeam channel with `try_send`, so authorization and deletion are never
//! slowed down by log I/O. Events that do not fit are counted and reported in
//! the log once space frees up.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::core::errors::{CullError, Result};
use crate::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, Severity};

// ──────────────────── channel capacity ────────────────────

const CHANNEL_CAPACITY: usize = 512;

// ──────────────────── events ────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ActivityEvent {
    AnalysisCompleted {
        items: usize,
        recommended: usize,
        reclaimable_bytes: u64,
    },
    ProtectionChanged {
        id: u64,
        protected: bool,
        reason: Option<String>,
    },
    AuthorizationGranted {
        item_count: usize,
    },
    AuthorizationRejected {
        reason: String,
        protected_ids: Vec<u64>,
    },
    BatchStarted {
        item_count: usize,
        also_delete_files: bool,
        dry_run: bool,
    },
    ItemDeleted {
        id: u64,
        title: String,
        bytes_freed: u64,
    },
    ItemDeletionFailed {
        id: u64,
        reason: String,
    },
    BatchCompleted {
        succeeded: usize,
        failed: usize,
        bytes_freed: u64,
        duration_ms: u64,
    },
    BatchAborted {
        cause: String,
        not_attempted: usize,
    },
    Error {
        code: String,
        message: String,
    },
    /// Control message: stops the logger thread after everything queued before
    /// it is written. Never recorded.
    Shutdown,
}

// ──────────────────── handle ────────────────────

/// Cloneable sender side of the activity log.
#[derive(Debug, Clone)]
pub struct ActivityLoggerHandle {
    tx: Sender<ActivityEvent>,
    dropped_events: Arc<AtomicU64>,
}

impl ActivityLoggerHandle {
    /// A handle plus the receiving end, for embedders that consume events themselves.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, Receiver<ActivityEvent>) {
        let (tx, rx) = bounded(capacity.max(1));
        (
            Self {
                tx,
                dropped_events: Arc::new(AtomicU64::new(0)),
            },
            rx,
        )
    }

    /// Queue an event without blocking. A full channel drops the event.
    pub fn send(&self, event: ActivityEvent) {
        if let Err(TrySendError::Full(_)) = self.tx.try_send(event) {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Events dropped since the logger last reported them.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Ask the logger thread to drain and stop. Blocks only if the queue is full.
    ///
    /// Fails with `ChannelClosed` when the logger thread is already gone.
    pub fn shutdown(&self) -> Result<()> {
        self.tx
            .send(ActivityEvent::Shutdown)
            .map_err(|_| CullError::ChannelClosed {
                component: "activity-logger",
            })
    }
}

// ──────────────────── spawn ────────────────────

#[derive(Debug, Clone)]
pub struct ActivityLoggerConfig {
    pub jsonl: JsonlConfig,
    pub channel_capacity: usize,
}

impl ActivityLoggerConfig {
    #[must_use]
    pub fn new(jsonl: JsonlConfig) -> Self {
        Self {
            jsonl,
            channel_capacity: CHANNEL_CAPACITY,
        }
    }
}

/// Start the logger thread.
///
/// The thread exits on [`ActivityLoggerHandle::shutdown`] or when every handle is dropped.
pub fn spawn_logger(
    config: ActivityLoggerConfig,
) -> Result<(ActivityLoggerHandle, thread::JoinHandle<()>)> {
    let (handle, rx) = ActivityLoggerHandle::channel(config.channel_capacity);
    let dropped = Arc::clone(&handle.dropped_events);
    let jsonl = config.jsonl;

    let join = thread::Builder::new()
        .name("mcl-activity".to_string())
        .spawn(move || run_logger(&rx, jsonl, &dropped))
        .map_err(|err| CullError::Runtime {
            details: format!("failed to spawn activity logger thread: {err}"),
        })?;

    Ok((handle, join))
}

fn run_logger(rx: &Receiver<ActivityEvent>, jsonl: JsonlConfig, dropped: &AtomicU64) {
    let mut writer = JsonlWriter::open(jsonl);

    while let Ok(event) = rx.recv() {
        let lost = dropped.swap(0, Ordering::Relaxed);
        if lost > 0 {
            let mut warning = LogEntry::new(EventType::Error, Severity::Warning);
            warning.details = Some(format!("{lost} activity events dropped under back-pressure"));
            writer.write_entry(&warning);
        }

        match to_log_entry(&event) {
            Some(entry) => writer.write_entry(&entry),
            None => break,
        }
    }

    writer.sync();
}

// ──────────────────── conversion ────────────────────

/// Render an event as a JSONL record. `Shutdown` has no record.
#[must_use]
pub fn to_log_entry(event: &ActivityEvent) -> Option<LogEntry> {
    let entry = match event {
        ActivityEvent::AnalysisCompleted {
            items,
            recommended,
            reclaimable_bytes,
        } => {
            let mut e = LogEntry::new(EventType::AnalysisCompleted, Severity::Info);
            e.item_count = Some(*items);
            e.bytes = Some(*reclaimable_bytes);
            e.details = Some(format!("recommended={recommended}"));
            e
        }
        ActivityEvent::ProtectionChanged {
            id,
            protected,
            reason,
        } => {
            let event = if *protected {
                EventType::ProtectionAdded
            } else {
                EventType::ProtectionRemoved
            };
            let mut e = LogEntry::new(event, Severity::Info);
            e.item_id = Some(*id);
            e.details.clone_from(reason);
            e
        }
        ActivityEvent::AuthorizationGranted { item_count } => {
            let mut e = LogEntry::new(EventType::AuthorizationGranted, Severity::Info);
            e.item_count = Some(*item_count);
            e.ok = Some(true);
            e
        }
        ActivityEvent::AuthorizationRejected {
            reason,
            protected_ids,
        } => {
            let mut e = LogEntry::new(EventType::AuthorizationRejected, Severity::Warning);
            e.ok = Some(false);
            e.error_code = Some("MCL-2001".to_string());
            e.error_message = Some(reason.clone());
            if !protected_ids.is_empty() {
                e.details = Some(format!("protected_ids={protected_ids:?}"));
            }
            e
        }
        ActivityEvent::BatchStarted {
            item_count,
            also_delete_files,
            dry_run,
        } => {
            let mut e = LogEntry::new(EventType::BatchStarted, Severity::Info);
            e.item_count = Some(*item_count);
            e.details = Some(format!(
                "also_delete_files={also_delete_files} dry_run={dry_run}"
            ));
            e
        }
        ActivityEvent::ItemDeleted {
            id,
            title,
            bytes_freed,
        } => {
            let mut e = LogEntry::new(EventType::ItemDeleted, Severity::Info);
            e.item_id = Some(*id);
            e.title = Some(title.clone());
            e.bytes = Some(*bytes_freed);
            e.ok = Some(true);
            e
        }
        ActivityEvent::ItemDeletionFailed { id, reason } => {
            let mut e = LogEntry::new(EventType::ItemDeletionFailed, Severity::Warning);
            e.item_id = Some(*id);
            e.ok = Some(false);
            e.error_message = Some(reason.clone());
            e
        }
        ActivityEvent::BatchCompleted {
            succeeded,
            failed,
            bytes_freed,
            duration_ms,
        } => {
            let mut e = LogEntry::new(EventType::BatchCompleted, Severity::Info);
            e.item_count = Some(succeeded + failed);
            e.bytes = Some(*bytes_freed);
            e.ok = Some(*failed == 0);
            e.details = Some(format!(
                "succeeded={succeeded} failed={failed} duration_ms={duration_ms}"
            ));
            e
        }
        ActivityEvent::BatchAborted {
            cause,
            not_attempted,
        } => {
            let mut e = LogEntry::new(EventType::BatchAborted, Severity::Critical);
            e.ok = Some(false);
            e.error_code = Some("MCL-2101".to_string());
            e.error_message = Some(cause.clone());
            e.item_count = Some(*not_attempted);
            e
        }
        ActivityEvent::Error { code, message } => {
            let mut e = LogEntry::new(EventType::Error, Severity::Critical);
            e.ok = Some(false);
            e.error_code = Some(code.clone());
            e.error_message = Some(message.clone());
            e
        }
        ActivityEvent::Shutdown => return None,
    };
    Some(entry)
}
