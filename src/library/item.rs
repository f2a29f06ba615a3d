//! Media item snapshot consumed by the deletion-decision core.
//!
//! Items are produced by an external collector and treated as read-only. The
//! identifier and the added-at timestamp are optional here because collectors
//! hand over whatever the media server returned; the score engine rejects
//! records that lack them.

#![allow(missing_docs)]

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Identifier in the media server's namespace (the server's rating key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ItemId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Ordinal video quality. Lower ranks are worse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QualityRank {
    #[default]
    Unknown,
    Sd,
    Hd,
    FullHd,
    Uhd,
}

impl QualityRank {
    /// Lowest known ordinal.
    pub const MIN_ORDINAL: u8 = 0;
    /// Highest known ordinal.
    pub const MAX_ORDINAL: u8 = 3;

    /// Ordinal rank, `None` when the quality could not be determined.
    #[must_use]
    pub const fn ordinal(self) -> Option<u8> {
        match self {
            Self::Unknown => None,
            Self::Sd => Some(0),
            Self::Hd => Some(1),
            Self::FullHd => Some(2),
            Self::Uhd => Some(3),
        }
    }

    /// Derive a rank from the media server's resolution label and video codec.
    ///
    /// Legacy codecs drop the rank by one step, never below `Sd`.
    #[must_use]
    pub fn from_media(resolution: Option<&str>, video_codec: Option<&str>) -> Self {
        let base = resolution.map_or(Self::Unknown, Self::from_resolution);
        if base != Self::Unknown && video_codec.is_some_and(is_legacy_codec) {
            base.step_down()
        } else {
            base
        }
    }

    /// Parse resolution labels such as `sd`, `480`, `720p`, `1080`, `4k`, `2160p`.
    #[must_use]
    pub fn from_resolution(label: &str) -> Self {
        let lower = label.trim().to_ascii_lowercase();
        match lower.as_str() {
            "sd" => return Self::Sd,
            "hd" => return Self::Hd,
            "4k" | "uhd" => return Self::Uhd,
            _ => {}
        }
        let Some(lines) = resolution_pattern()
            .and_then(|re| re.captures(&lower))
            .and_then(|caps| caps.get(1))
            .and_then(|digits| digits.as_str().parse::<u32>().ok())
        else {
            return Self::Unknown;
        };
        match lines {
            2000.. => Self::Uhd,
            1000..=1999 => Self::FullHd,
            700..=999 => Self::Hd,
            1..=699 => Self::Sd,
            0 => Self::Unknown,
        }
    }

    fn step_down(self) -> Self {
        match self {
            Self::Uhd => Self::FullHd,
            Self::FullHd => Self::Hd,
            Self::Hd | Self::Sd => Self::Sd,
            Self::Unknown => Self::Unknown,
        }
    }

    /// Display label used in rationale notes.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Sd => "SD",
            Self::Hd => "720p",
            Self::FullHd => "1080p",
            Self::Uhd => "4K",
        }
    }
}

fn resolution_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(\d{3,4})\s*[pi]?$").ok())
        .as_ref()
}

fn is_legacy_codec(codec: &str) -> bool {
    let lower = codec.to_ascii_lowercase();
    ["mpeg1", "mpeg2", "h263", "divx", "xvid"]
        .iter()
        .any(|legacy| lower.contains(legacy))
}

/// Immutable snapshot of one library item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: Option<ItemId>,
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub play_count: u32,
    #[serde(default)]
    pub last_viewed_at: Option<DateTime<Utc>>,
    pub added_at: Option<DateTime<Utc>>,
    /// Average external rating on a 0–10 scale; `None` means unknown.
    #[serde(default)]
    pub external_rating_avg: Option<f64>,
    #[serde(default)]
    pub file_size_bytes: u64,
    #[serde(default)]
    pub quality: QualityRank,
}

impl MediaItem {
    /// Minimal well-formed item: never played, unrated, unknown quality.
    #[must_use]
    pub fn new(id: impl Into<ItemId>, title: impl Into<String>, added_at: DateTime<Utc>) -> Self {
        Self {
            id: Some(id.into()),
            title: title.into(),
            year: None,
            play_count: 0,
            last_viewed_at: None,
            added_at: Some(added_at),
            external_rating_avg: None,
            file_size_bytes: 0,
            quality: QualityRank::Unknown,
        }
    }

    #[must_use]
    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    #[must_use]
    pub fn with_play_count(mut self, play_count: u32) -> Self {
        self.play_count = play_count;
        self
    }

    #[must_use]
    pub fn with_last_viewed_at(mut self, at: DateTime<Utc>) -> Self {
        self.last_viewed_at = Some(at);
        self
    }

    #[must_use]
    pub fn with_rating(mut self, rating: f64) -> Self {
        self.external_rating_avg = Some(rating);
        self
    }

    #[must_use]
    pub fn with_size(mut self, bytes: u64) -> Self {
        self.file_size_bytes = bytes;
        self
    }

    #[must_use]
    pub fn with_quality(mut self, quality: QualityRank) -> Self {
        self.quality = quality;
        self
    }

    /// Timestamp staleness is measured from: last view, else when the item was added.
    #[must_use]
    pub fn staleness_anchor(&self) -> Option<DateTime<Utc>> {
        self.last_viewed_at.or(self.added_at)
    }
}
