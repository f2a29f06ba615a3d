//! Multi-factor deletion scoring: play count, rating, size, age, quality weights
//! with a never-delete rating veto.

#![allow(missing_docs)]
#![allow(clippy::cast_precision_loss)]

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::config::{Config, NormalizationMode, ScoringConfig, ThresholdConfig};
use crate::core::errors::{CullError, Result};
use crate::library::item::{ItemId, MediaItem, QualityRank};

/// Weight sums further than this from 1.0 produce a warning.
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.05;

const NEUTRAL: f64 = 0.5;
const GIB: f64 = 1_073_741_824.0;
const SECS_PER_DAY: f64 = 86_400.0;

/// The five scoring factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    PlayCount,
    Rating,
    Size,
    Age,
    Quality,
}

impl Factor {
    pub const ALL: [Self; 5] = [
        Self::PlayCount,
        Self::Rating,
        Self::Size,
        Self::Age,
        Self::Quality,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PlayCount => "play_count",
            Self::Rating => "rating",
            Self::Size => "size",
            Self::Age => "age",
            Self::Quality => "quality",
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub play_count: f64,
    pub rating: f64,
    pub size: f64,
    pub age: f64,
    pub quality: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self::from_config(&ScoringConfig::default())
    }
}

impl ScoringWeights {
    #[must_use]
    pub fn from_config(scoring: &ScoringConfig) -> Self {
        Self {
            play_count: scoring.play_count_weight,
            rating: scoring.rating_weight,
            size: scoring.size_weight,
            age: scoring.age_weight,
            quality: scoring.quality_weight,
        }
    }

    #[must_use]
    pub const fn get(&self, factor: Factor) -> f64 {
        match factor {
            Factor::PlayCount => self.play_count,
            Factor::Rating => self.rating,
            Factor::Size => self.size,
            Factor::Age => self.age,
            Factor::Quality => self.quality,
        }
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        Factor::ALL.iter().map(|factor| self.get(*factor)).sum()
    }
}

/// Veto and recommendation thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreThresholds {
    pub never_delete_rating: f64,
    pub min_deletion_score: f64,
}

impl Default for ScoreThresholds {
    fn default() -> Self {
        Self::from_config(&ThresholdConfig::default())
    }
}

impl ScoreThresholds {
    #[must_use]
    pub fn from_config(thresholds: &ThresholdConfig) -> Self {
        Self {
            never_delete_rating: thresholds.never_delete_rating,
            min_deletion_score: thresholds.min_deletion_score,
        }
    }
}

/// References the comparative factors are normalized against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizationContext {
    pub size_reference_bytes: u64,
    /// Inclusive (worst, best) quality ordinals; `None` means no usable range.
    pub quality_range: Option<(u8, u8)>,
    pub age_saturation_days: u32,
}

impl NormalizationContext {
    /// Fixed references: scores stay comparable across separate runs.
    #[must_use]
    pub fn absolute(scoring: &ScoringConfig) -> Self {
        Self {
            size_reference_bytes: scoring.size_reference_bytes,
            quality_range: Some((QualityRank::MIN_ORDINAL, QualityRank::MAX_ORDINAL)),
            age_saturation_days: scoring.age_saturation_days,
        }
    }

    /// Largest size and observed quality range of `items`.
    #[must_use]
    pub fn from_batch(items: &[MediaItem], scoring: &ScoringConfig) -> Self {
        let size_reference_bytes = items
            .iter()
            .map(|item| item.file_size_bytes)
            .max()
            .unwrap_or(0);
        let ordinals = items.iter().filter_map(|item| item.quality.ordinal());
        let quality_range = ordinals.fold(None, |range: Option<(u8, u8)>, ordinal| {
            Some(range.map_or((ordinal, ordinal), |(lo, hi)| {
                (lo.min(ordinal), hi.max(ordinal))
            }))
        });
        Self {
            size_reference_bytes,
            quality_range,
            age_saturation_days: scoring.age_saturation_days,
        }
    }

    /// Context for `items` according to the configured normalization mode.
    #[must_use]
    pub fn for_items(items: &[MediaItem], scoring: &ScoringConfig) -> Self {
        match scoring.normalization {
            NormalizationMode::Absolute => Self::absolute(scoring),
            NormalizationMode::Batch => Self::from_batch(items, scoring),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceTerm {
    pub factor: Factor,
    /// Weight after normalization by the weight total.
    pub weight: f64,
    /// Normalized factor value in [0, 1].
    pub value: f64,
    pub contribution: f64,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceLedger {
    pub terms: Vec<EvidenceTerm>,
    pub summary: String,
}

impl EvidenceLedger {
    #[must_use]
    pub fn contribution(&self, factor: Factor) -> Option<f64> {
        self.terms
            .iter()
            .find(|term| term.factor == factor)
            .map(|term| term.contribution)
    }

    /// Factor name → normalized contribution.
    #[must_use]
    pub fn rationale(&self) -> BTreeMap<&'static str, f64> {
        self.terms
            .iter()
            .map(|term| (term.factor.name(), term.contribution))
            .collect()
    }

    /// The factor contributing most to the score, if any contributes at all.
    #[must_use]
    pub fn dominant_term(&self) -> Option<&EvidenceTerm> {
        self.terms
            .iter()
            .filter(|term| term.contribution > 0.0)
            .max_by(|a, b| a.contribution.total_cmp(&b.contribution))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletionScore {
    pub id: ItemId,
    /// Final priority in [0, 1]; forced to 0.0 when vetoed.
    pub value: f64,
    /// Weighted sum before any veto, kept for transparency.
    pub weighted_value: f64,
    pub vetoed: bool,
    pub veto_reason: Option<String>,
    pub ledger: EvidenceLedger,
}

impl DeletionScore {
    /// A vetoed score is never a recommendation, whatever its numbers say.
    #[must_use]
    pub fn is_recommended(&self, min_deletion_score: f64) -> bool {
        !self.vetoed && self.value >= min_deletion_score
    }
}

/// Deterministic, side-effect free score engine.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    weights: ScoringWeights,
    thresholds: ScoreThresholds,
    weight_warning: Option<String>,
}

impl ScoringEngine {
    /// Build an engine, rejecting unusable weights or thresholds and warning on
    /// a weight sum far from 1.0.
    pub fn new(weights: ScoringWeights, thresholds: ScoreThresholds) -> Result<Self> {
        let never_delete = thresholds.never_delete_rating;
        if !(0.0..=10.0).contains(&never_delete) {
            return Err(CullError::validation(
                "thresholds",
                format!("never_delete_rating must be in [0,10], got {never_delete}"),
            ));
        }
        let min_score = thresholds.min_deletion_score;
        if !(0.0..=1.0).contains(&min_score) {
            return Err(CullError::validation(
                "thresholds",
                format!("min_deletion_score must be in [0,1], got {min_score}"),
            ));
        }
        for factor in Factor::ALL {
            let weight = weights.get(factor);
            if !weight.is_finite() || weight < 0.0 {
                return Err(CullError::validation(
                    "weights",
                    format!("{factor} weight must be a finite value >= 0.0, got {weight}"),
                ));
            }
        }
        let total = weights.total();
        if total <= 0.0 {
            return Err(CullError::validation(
                "weights",
                "at least one factor weight must be positive",
            ));
        }
        let weight_warning = ((total - 1.0).abs() > WEIGHT_SUM_TOLERANCE).then(|| {
            format!(
                "factor weights sum to {total:.3}, expected ~1.0; \
                 scores are normalized by the total"
            )
        });
        if let Some(warning) = &weight_warning {
            eprintln!("[MCL-SCORE] WARNING: {warning}");
        }
        Ok(Self {
            weights,
            thresholds,
            weight_warning,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            ScoringWeights::from_config(&config.scoring),
            ScoreThresholds::from_config(&config.thresholds),
        )
    }

    #[must_use]
    pub const fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    #[must_use]
    pub const fn thresholds(&self) -> &ScoreThresholds {
        &self.thresholds
    }

    /// Set when the configured weights did not sum to ~1.0.
    #[must_use]
    pub fn weight_warning(&self) -> Option<&str> {
        self.weight_warning.as_deref()
    }

    /// Score one item.
    ///
    /// `now` is passed in so scoring is reproducible.
    pub fn score_item(
        &self,
        item: &MediaItem,
        context: &NormalizationContext,
        now: DateTime<Utc>,
    ) -> Result<DeletionScore> {
        let id = item.id.ok_or_else(|| {
            CullError::validation("id", format!("{:?} has no identifier", item.title))
        })?;
        let added_at = item.added_at.ok_or_else(|| {
            CullError::validation("added_at", format!("item {id} has no added-at timestamp"))
        })?;
        let anchor = item.staleness_anchor().unwrap_or(added_at);
        if let Some(rating) = item.external_rating_avg
            && !(rating.is_finite() && (0.0..=10.0).contains(&rating))
        {
            return Err(CullError::validation(
                "external_rating_avg",
                format!("item {id} rating {rating} is outside [0, 10]"),
            ));
        }

        let stale_days = days_between(anchor, now);
        let factors = [
            (
                Factor::PlayCount,
                factor_play_count(item.play_count),
                note_play_count(item.play_count),
            ),
            (
                Factor::Rating,
                factor_rating(item.external_rating_avg),
                note_rating(item.external_rating_avg, self.thresholds.never_delete_rating),
            ),
            (
                Factor::Size,
                factor_size(item.file_size_bytes, context.size_reference_bytes),
                note_size(item.file_size_bytes),
            ),
            (
                Factor::Age,
                factor_age(stale_days, context.age_saturation_days),
                note_age(stale_days, item.last_viewed_at.is_some()),
            ),
            (
                Factor::Quality,
                factor_quality(item.quality, context.quality_range),
                format!("quality {}", item.quality.label()),
            ),
        ];

        let total_weight = self.weights.total();
        let terms: Vec<EvidenceTerm> = factors
            .into_iter()
            .map(|(factor, value, note)| {
                let weight = self.weights.get(factor) / total_weight;
                EvidenceTerm {
                    factor,
                    weight,
                    value,
                    contribution: weight * value,
                    note,
                }
            })
            .collect();

        let weighted_value = clamp_unit(terms.iter().map(|term| term.contribution).sum());

        let veto_reason = item
            .external_rating_avg
            .filter(|rating| *rating >= self.thresholds.never_delete_rating)
            .map(|rating| {
                format!(
                    "average rating {rating:.1} >= never-delete threshold {:.1}",
                    self.thresholds.never_delete_rating
                )
            });
        let vetoed = veto_reason.is_some();
        let value = if vetoed { 0.0 } else { weighted_value };

        let summary = format!(
            "score={value:.3}; weighted={weighted_value:.3}; vetoed={vetoed}; \
             stale_days={stale_days:.0}"
        );

        Ok(DeletionScore {
            id,
            value,
            weighted_value,
            vetoed,
            veto_reason,
            ledger: EvidenceLedger { terms, summary },
        })
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let secs = to.signed_duration_since(from).num_seconds().max(0);
    secs as f64 / SECS_PER_DAY
}

fn factor_play_count(play_count: u32) -> f64 {
    1.0 / (1.0 + f64::from(play_count))
}

fn factor_rating(rating: Option<f64>) -> f64 {
    rating.map_or(NEUTRAL, |avg| clamp_unit((10.0 - avg) / 10.0))
}

fn factor_size(size_bytes: u64, reference_bytes: u64) -> f64 {
    if reference_bytes == 0 {
        return 0.0;
    }
    clamp_unit(size_bytes as f64 / reference_bytes as f64)
}

fn factor_age(stale_days: f64, saturation_days: u32) -> f64 {
    if saturation_days == 0 {
        return 1.0;
    }
    clamp_unit(stale_days / f64::from(saturation_days))
}

fn factor_quality(quality: QualityRank, range: Option<(u8, u8)>) -> f64 {
    match (quality.ordinal(), range) {
        (Some(rank), Some((worst, best))) if best > worst => {
            let rank = rank.clamp(worst, best);
            f64::from(best - rank) / f64::from(best - worst)
        }
        _ => NEUTRAL,
    }
}

fn note_play_count(play_count: u32) -> String {
    match play_count {
        0 => "never watched".to_string(),
        1 => "watched once".to_string(),
        2..=3 => format!("{play_count} plays (occasional)"),
        _ => format!("{play_count} plays (frequently watched)"),
    }
}

fn note_rating(rating: Option<f64>, never_delete: f64) -> String {
    match rating {
        None => "no external ratings, neutral".to_string(),
        Some(avg) if avg >= never_delete => format!("rated {avg:.1}/10, protected as highly rated"),
        Some(avg) if avg >= 7.0 => format!("rated {avg:.1}/10, low priority"),
        Some(avg) if avg >= 5.0 => format!("rated {avg:.1}/10, moderate priority"),
        Some(avg) => format!("rated {avg:.1}/10, high priority"),
    }
}

fn note_size(size_bytes: u64) -> String {
    let gb = size_bytes as f64 / GIB;
    let tier = if gb < 1.0 {
        "small"
    } else if gb < 5.0 {
        "medium"
    } else if gb < 10.0 {
        "large"
    } else {
        "very large"
    };
    format!("{gb:.2} GB ({tier})")
}

fn note_age(stale_days: f64, viewed: bool) -> String {
    if viewed {
        format!("last watched {stale_days:.0} days ago")
    } else {
        format!("added {stale_days:.0} days ago, never watched")
    }
}
