//! Library analysis: score a whole collection, rank it, and summarize it.

#![allow(missing_docs)]
#![allow(clippy::cast_precision_loss)]

use std::cmp::Ordering;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::config::ScoringConfig;
use crate::curation::deletion::DeletionPlan;
use crate::curation::protection::ProtectionSnapshot;
use crate::curation::scoring::{DeletionScore, NormalizationContext, ScoringEngine};
use crate::library::item::MediaItem;
use crate::logger::activity::{ActivityEvent, ActivityLoggerHandle};

/// Score boundary between medium and high deletion priority.
pub const HIGH_PRIORITY_SCORE: f64 = 0.7;
/// Score boundary between low and medium deletion priority.
pub const MEDIUM_PRIORITY_SCORE: f64 = 0.4;

const GIB: f64 = 1_073_741_824.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    #[must_use]
    pub fn of(score: f64) -> Self {
        if score >= HIGH_PRIORITY_SCORE {
            Self::High
        } else if score >= MEDIUM_PRIORITY_SCORE {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// One scored item with its selection annotations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyzedItem {
    pub item: MediaItem,
    pub score: DeletionScore,
    pub protected: bool,
    pub recommended: bool,
}

/// An item the score engine refused, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedItem {
    pub title: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisSummary {
    pub scored: usize,
    pub rejected: usize,
    pub recommended: usize,
    pub vetoed: usize,
    pub protected: usize,
    pub mean_score: f64,
    pub median_score: f64,
    pub recommended_bytes: u64,
}

/// Collection-level statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LibraryStats {
    pub total_items: usize,
    pub total_bytes: u64,
    pub never_watched: usize,
    pub high_priority: usize,
    pub medium_priority: usize,
    pub low_priority: usize,
    /// Bytes held by the 50 highest-scoring deletable items.
    pub top_50_bytes: u64,
    pub top_100_bytes: u64,
}

/// Ranked result of one analysis run, highest score first.
#[derive(Debug, Clone, Serialize)]
pub struct LibraryAnalysis {
    pub items: Vec<AnalyzedItem>,
    pub rejected: Vec<RejectedItem>,
    pub summary: AnalysisSummary,
    pub min_deletion_score: f64,
    pub generated_at: DateTime<Utc>,
}

impl LibraryAnalysis {
    pub fn recommendations(&self) -> impl Iterator<Item = &AnalyzedItem> {
        self.items.iter().filter(|analyzed| analyzed.recommended)
    }

    #[must_use]
    pub fn stats(&self) -> LibraryStats {
        let mut stats = LibraryStats {
            total_items: self.items.len(),
            ..LibraryStats::default()
        };
        for analyzed in &self.items {
            stats.total_bytes += analyzed.item.file_size_bytes;
            if analyzed.item.play_count == 0 {
                stats.never_watched += 1;
            }
            match Priority::of(analyzed.score.value) {
                Priority::High => stats.high_priority += 1,
                Priority::Medium => stats.medium_priority += 1,
                Priority::Low => stats.low_priority += 1,
            }
        }
        let deletable = || {
            self.items
                .iter()
                .filter(|analyzed| !analyzed.protected && !analyzed.score.vetoed)
                .map(|analyzed| analyzed.item.file_size_bytes)
        };
        stats.top_50_bytes = deletable().take(50).sum();
        stats.top_100_bytes = deletable().take(100).sum();
        stats
    }

    /// Selection stage over this analysis.
    #[must_use]
    pub fn plan(&self, snapshot: &ProtectionSnapshot) -> DeletionPlan {
        DeletionPlan::select(
            self.items.iter().map(|analyzed| (&analyzed.item, &analyzed.score)),
            self.min_deletion_score,
            snapshot,
        )
    }

    /// Plain-text report. `show_all` includes items that are not recommended.
    #[must_use]
    pub fn render_report(&self, show_all: bool) -> String {
        let rule = "=".repeat(72);
        let mut out = String::new();
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "Deletion analysis report");
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(
            out,
            "Generated: {}",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        let summary = &self.summary;
        let _ = writeln!(
            out,
            "Scored: {}  Recommended: {}  Vetoed: {}  Protected: {}  Rejected: {}",
            summary.scored, summary.recommended, summary.vetoed, summary.protected, summary.rejected
        );
        let _ = writeln!(
            out,
            "Mean score: {:.3}  Median score: {:.3}  Reclaimable: {:.2} GB",
            summary.mean_score,
            summary.median_score,
            summary.recommended_bytes as f64 / GIB
        );
        let _ = writeln!(out);

        let shown = self
            .items
            .iter()
            .filter(|analyzed| show_all || analyzed.recommended);
        for (rank, analyzed) in shown.enumerate() {
            let year = analyzed
                .item
                .year
                .map_or_else(|| "unknown".to_string(), |year| year.to_string());
            let _ = writeln!(out, "[{}] {} ({year})", rank + 1, analyzed.item.title);
            let _ = writeln!(
                out,
                "    score {:.3}  recommended {}",
                analyzed.score.value,
                if analyzed.recommended { "YES" } else { "NO" }
            );
            if analyzed.protected {
                let _ = writeln!(out, "    protected");
            }
            if let Some(reason) = &analyzed.score.veto_reason {
                let _ = writeln!(out, "    vetoed: {reason}");
            }
            for term in &analyzed.score.ledger.terms {
                let _ = writeln!(
                    out,
                    "    {:<10} {:+.3}  {}",
                    term.factor.name(),
                    term.contribution,
                    term.note
                );
            }
        }

        for rejected in &self.rejected {
            let _ = writeln!(out, "skipped {}: {}", rejected.title, rejected.error);
        }
        out
    }
}

/// Scores and ranks a library.
pub struct Analyzer<'a> {
    engine: &'a ScoringEngine,
    scoring: ScoringConfig,
    logger: Option<ActivityLoggerHandle>,
}

impl<'a> Analyzer<'a> {
    #[must_use]
    pub const fn new(engine: &'a ScoringEngine, scoring: ScoringConfig) -> Self {
        Self {
            engine,
            scoring,
            logger: None,
        }
    }

    #[must_use]
    pub fn with_logger(mut self, logger: ActivityLoggerHandle) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Score `items`, mark protected ones, and rank everything by score.
    ///
    /// Items the engine rejects are reported in `rejected` instead of failing
    /// the run.
    #[must_use]
    pub fn analyze(
        &self,
        items: &[MediaItem],
        snapshot: &ProtectionSnapshot,
        now: DateTime<Utc>,
    ) -> LibraryAnalysis {
        let context = NormalizationContext::for_items(items, &self.scoring);
        let min_deletion_score = self.engine.thresholds().min_deletion_score;

        let mut analyzed = Vec::with_capacity(items.len());
        let mut rejected = Vec::new();
        for item in items {
            match self.engine.score_item(item, &context, now) {
                Ok(score) => {
                    let protected = snapshot.contains(score.id);
                    let recommended = !protected && score.is_recommended(min_deletion_score);
                    analyzed.push(AnalyzedItem {
                        item: item.clone(),
                        score,
                        protected,
                        recommended,
                    });
                }
                Err(err) => {
                    if let Some(logger) = &self.logger {
                        logger.send(ActivityEvent::Error {
                            code: err.code().to_string(),
                            message: format!("{:?} not scored: {err}", item.title),
                        });
                    }
                    rejected.push(RejectedItem {
                        title: item.title.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }

        analyzed.sort_by(|a, b| {
            b.score
                .value
                .partial_cmp(&a.score.value)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.score.id.cmp(&b.score.id))
        });

        let summary = summarize(&analyzed, rejected.len());
        if let Some(logger) = &self.logger {
            logger.send(ActivityEvent::AnalysisCompleted {
                items: summary.scored,
                recommended: summary.recommended,
                reclaimable_bytes: summary.recommended_bytes,
            });
        }

        LibraryAnalysis {
            items: analyzed,
            rejected,
            summary,
            min_deletion_score,
            generated_at: now,
        }
    }
}

fn summarize(items: &[AnalyzedItem], rejected: usize) -> AnalysisSummary {
    let mut summary = AnalysisSummary {
        scored: items.len(),
        rejected,
        ..AnalysisSummary::default()
    };
    for analyzed in items {
        if analyzed.recommended {
            summary.recommended += 1;
            summary.recommended_bytes += analyzed.item.file_size_bytes;
        }
        if analyzed.score.vetoed {
            summary.vetoed += 1;
        }
        if analyzed.protected {
            summary.protected += 1;
        }
    }

    // Items arrive sorted descending, so the median needs no extra sort.
    let values: Vec<f64> = items.iter().map(|analyzed| analyzed.score.value).collect();
    if !values.is_empty() {
        summary.mean_score = values.iter().sum::<f64>() / values.len() as f64;
        let mid = values.len() / 2;
        summary.median_score = if values.len() % 2 == 0 {
            (values[mid - 1] + values[mid]) / 2.0
        } else {
            values[mid]
        };
    }
    summary
}
