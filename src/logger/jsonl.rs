//! Append-only JSONL activity log.
//!
//! One self-contained JSON object per line, written with a single `write_all`
//! so a tailing reader never sees half a record. When the primary file cannot
//! be written the writer degrades: fallback file, then stderr with an
//! `[MCL-JSONL]` prefix, then silent discard. Logging never fails a deletion.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::core::errors::{CullError, Result};

const WRITE_BUFFER_BYTES: usize = 16 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Kinds of records in the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    AnalysisCompleted,
    ProtectionAdded,
    ProtectionRemoved,
    AuthorizationGranted,
    AuthorizationRejected,
    BatchStarted,
    ItemDeleted,
    ItemDeletionFailed,
    BatchCompleted,
    BatchAborted,
    Error,
}

/// One log line. Only `ts`, `event` and `severity` are always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// RFC 3339 UTC timestamp with millisecond precision.
    pub ts: String,
    pub event: EventType,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Factor name → contribution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factors: Option<BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LogEntry {
    /// Empty entry stamped with the current UTC time.
    #[must_use]
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self {
            ts: format_utc_now(),
            event,
            severity,
            item_id: None,
            title: None,
            bytes: None,
            score: None,
            factors: None,
            item_count: None,
            ok: None,
            error_code: None,
            error_message: None,
            details: None,
        }
    }
}

/// Where lines are currently going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sink {
    Primary,
    Fallback,
    Stderr,
    Discard,
}

impl Sink {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
            Self::Stderr => "stderr",
            Self::Discard => "discard",
        }
    }
}

#[derive(Debug, Clone)]
pub struct JsonlConfig {
    pub path: PathBuf,
    pub fallback_path: Option<PathBuf>,
    /// Rotate once the active file would exceed this size. Default 32 MiB.
    pub max_size_bytes: u64,
    /// Rotated generations kept (`activity.jsonl.1` ...). Default 3.
    pub max_rotated_files: u32,
    /// Seconds between forced `sync_data` calls. Default 5.
    pub fsync_interval_secs: u64,
}

impl JsonlConfig {
    /// Defaults around a primary path, with a fallback next to the system temp dir.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            fallback_path: Some(std::env::temp_dir().join("media-cull-activity.jsonl")),
            max_size_bytes: 32 * 1024 * 1024,
            max_rotated_files: 3,
            fsync_interval_secs: 5,
        }
    }
}

/// JSONL writer with size-based rotation and a degradation chain.
pub struct JsonlWriter {
    config: JsonlConfig,
    file: Option<BufWriter<File>>,
    sink: Sink,
    active_bytes: u64,
    last_sync: Instant,
}

impl JsonlWriter {
    /// Open the primary file, degrading as needed. Never fails.
    #[must_use]
    pub fn open(config: JsonlConfig) -> Self {
        let mut writer = Self {
            config,
            file: None,
            sink: Sink::Discard,
            active_bytes: 0,
            last_sync: Instant::now(),
        };
        writer.open_primary();
        writer
    }

    pub fn write_entry(&mut self, entry: &LogEntry) {
        match serde_json::to_string(entry) {
            Ok(json) => self.emit(&format!("{json}\n")),
            Err(err) => {
                let _ = writeln!(io::stderr(), "[MCL-JSONL] cannot serialize entry: {err}");
            }
        }
    }

    pub fn flush(&mut self) {
        if let Some(file) = self.file.as_mut() {
            let _ = file.flush();
        }
    }

    /// Flush and `sync_data` the active file.
    pub fn sync(&mut self) {
        if let Some(file) = self.file.as_mut() {
            let _ = file.flush();
            let _ = file.get_ref().sync_data();
        }
        self.last_sync = Instant::now();
    }

    #[must_use]
    pub const fn sink(&self) -> Sink {
        self.sink
    }

    /// Size of the active file, including bytes written before it was opened.
    #[must_use]
    pub const fn active_bytes(&self) -> u64 {
        self.active_bytes
    }

    /// Try to return to the primary file after a degradation.
    pub fn try_recover(&mut self) {
        if self.sink == Sink::Primary {
            return;
        }
        if let Ok((file, size)) = open_append(&self.config.path) {
            self.attach(file, size, Sink::Primary);
            let _ = writeln!(
                io::stderr(),
                "[MCL-JSONL] recovered primary log {}",
                self.config.path.display()
            );
        }
    }

    // ──────────────────────── internals ────────────────────────

    fn emit(&mut self, line: &str) {
        let len = line.len() as u64;
        if matches!(self.sink, Sink::Primary | Sink::Fallback)
            && self.active_bytes > 0
            && self.active_bytes + len > self.config.max_size_bytes
        {
            self.rotate();
        }

        match self.sink {
            Sink::Primary | Sink::Fallback => {
                let written = self
                    .file
                    .as_mut()
                    .is_some_and(|file| file.write_all(line.as_bytes()).is_ok());
                if written {
                    self.active_bytes += len;
                    if self.last_sync.elapsed().as_secs() >= self.config.fsync_interval_secs {
                        self.sync();
                    }
                } else {
                    self.degrade();
                    self.emit(line);
                }
            }
            Sink::Stderr => {
                let _ = write!(io::stderr(), "[MCL-JSONL] {line}");
            }
            Sink::Discard => {}
        }
    }

    fn attach(&mut self, file: File, size: u64, sink: Sink) {
        self.file = Some(BufWriter::with_capacity(WRITE_BUFFER_BYTES, file));
        self.active_bytes = size;
        self.sink = sink;
    }

    fn open_primary(&mut self) {
        match open_append(&self.config.path) {
            Ok((file, size)) => self.attach(file, size, Sink::Primary),
            Err(_) => self.open_fallback(),
        }
    }

    fn open_fallback(&mut self) {
        self.file = None;
        let opened = self
            .config
            .fallback_path
            .clone()
            .map(|path| (open_append(&path), path));
        match opened {
            Some((Ok((file, size)), path)) => {
                let _ = writeln!(
                    io::stderr(),
                    "[MCL-JSONL] primary log unavailable, writing to {}",
                    path.display()
                );
                self.attach(file, size, Sink::Fallback);
            }
            _ => {
                let _ = writeln!(
                    io::stderr(),
                    "[MCL-JSONL] no writable log file, writing to stderr"
                );
                self.sink = Sink::Stderr;
            }
        }
    }

    fn degrade(&mut self) {
        self.file = None;
        match self.sink {
            Sink::Primary => self.open_fallback(),
            Sink::Fallback => {
                let _ = writeln!(
                    io::stderr(),
                    "[MCL-JSONL] fallback log failed, writing to stderr"
                );
                self.sink = Sink::Stderr;
            }
            Sink::Stderr | Sink::Discard => self.sink = Sink::Discard,
        }
    }

    fn rotate(&mut self) {
        self.flush();
        self.file = None;
        let base = match self.sink {
            Sink::Primary => self.config.path.clone(),
            Sink::Fallback => match &self.config.fallback_path {
                Some(path) => path.clone(),
                None => return,
            },
            Sink::Stderr | Sink::Discard => return,
        };

        let keep = self.config.max_rotated_files;
        if keep == 0 {
            let _ = fs::remove_file(&base);
        } else {
            let _ = fs::remove_file(generation(&base, keep));
            for index in (1..keep).rev() {
                let _ = fs::rename(generation(&base, index), generation(&base, index + 1));
            }
            let _ = fs::rename(&base, generation(&base, 1));
        }

        match open_append(&base) {
            Ok((file, size)) => {
                let sink = self.sink;
                self.attach(file, size, sink);
            }
            Err(_) => self.degrade(),
        }
    }
}

impl Drop for JsonlWriter {
    fn drop(&mut self) {
        self.flush();
    }
}

// ──────────────────────── helpers ────────────────────────

fn open_append(path: &Path) -> Result<(File, u64)> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| CullError::io(parent, source))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| CullError::io(path, source))?;
    let size = file.metadata().map_or(0, |meta| meta.len());
    Ok((file, size))
}

/// `activity.jsonl` → `activity.jsonl.2`
fn generation(base: &Path, index: u32) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

pub(crate) fn format_utc_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &Path) -> JsonlConfig {
        JsonlConfig {
            path: dir.join("activity.jsonl"),
            fallback_path: None,
            max_size_bytes: 1024 * 1024,
            max_rotated_files: 2,
            fsync_interval_secs: 0,
        }
    }

    fn read_lines(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn entries_are_one_json_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let path = config.path.clone();
        {
            let mut writer = JsonlWriter::open(config);
            assert_eq!(writer.sink(), Sink::Primary);
            let mut deleted = LogEntry::new(EventType::ItemDeleted, Severity::Info);
            deleted.item_id = Some(42);
            deleted.bytes = Some(1_000);
            writer.write_entry(&deleted);
            writer.write_entry(&LogEntry::new(EventType::BatchCompleted, Severity::Info));
        }
        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(first["event"], "item_deleted");
        assert_eq!(first["item_id"], 42);
        let second: LogEntry = serde_json::from_str(&lines[1]).unwrap();
        assert_eq!(second.event, EventType::BatchCompleted);
    }

    #[test]
    fn absent_fields_are_omitted() {
        let entry = LogEntry::new(EventType::Error, Severity::Critical);
        let json = serde_json::to_string(&entry).unwrap();
        assert!(!json.contains("item_id"));
        assert!(!json.contains("error_code"));
        assert!(json.contains("\"severity\":\"critical\""));
    }

    #[test]
    fn rotation_keeps_bounded_generations() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.max_size_bytes = 200;
        let path = config.path.clone();
        {
            let mut writer = JsonlWriter::open(config);
            for id in 0..20 {
                let mut entry = LogEntry::new(EventType::ItemDeleted, Severity::Info);
                entry.item_id = Some(id);
                writer.write_entry(&entry);
                writer.flush();
            }
        }
        assert!(path.exists());
        assert!(generation(&path, 1).exists());
        assert!(generation(&path, 2).exists());
        assert!(!generation(&path, 3).exists());
    }

    #[test]
    fn unwritable_primary_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, b"file").unwrap();
        let fallback = dir.path().join("fallback.jsonl");
        let config = JsonlConfig {
            path: blocker.join("activity.jsonl"),
            fallback_path: Some(fallback.clone()),
            ..config_in(dir.path())
        };
        {
            let mut writer = JsonlWriter::open(config);
            assert_eq!(writer.sink(), Sink::Fallback);
            writer.write_entry(&LogEntry::new(EventType::AnalysisCompleted, Severity::Info));
        }
        assert_eq!(read_lines(&fallback).len(), 1);
    }

    #[test]
    fn no_fallback_degrades_to_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"file").unwrap();
        let writer = JsonlWriter::open(JsonlConfig {
            path: blocker.join("x.jsonl"),
            fallback_path: None,
            ..config_in(dir.path())
        });
        assert_eq!(writer.sink(), Sink::Stderr);
        assert_eq!(writer.sink().label(), "stderr");
    }
}
