//! Configuration system: TOML file + env var overrides + safe defaults.

#![allow(missing_docs)]

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::errors::{CullError, Result};

/// Upper bound on concurrent delete calls against the media server.
pub const MAX_DELETE_PARALLELISM: usize = 8;

/// Full media_cull configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub scoring: ScoringConfig,
    pub thresholds: ThresholdConfig,
    pub deletion: DeletionConfig,
    pub paths: PathsConfig,
}

/// Factor weights and normalization references for the score engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringConfig {
    pub play_count_weight: f64,
    pub rating_weight: f64,
    pub size_weight: f64,
    pub age_weight: f64,
    pub quality_weight: f64,
    /// Whether size/quality are normalized against fixed references or the current batch.
    pub normalization: NormalizationMode,
    /// Size that maps to a size factor of 1.0 in absolute mode.
    pub size_reference_bytes: u64,
    /// Days of staleness that saturate the age factor at 1.0.
    pub age_saturation_days: u32,
}

/// Reference frame for the comparative factors (size, quality).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NormalizationMode {
    /// Fixed references: scores are comparable across separate analysis runs.
    #[default]
    Absolute,
    /// Largest size / observed quality range of the batch being scored.
    Batch,
}

impl FromStr for NormalizationMode {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "absolute" => Ok(Self::Absolute),
            "batch" => Ok(Self::Batch),
            other => Err(format!("expected \"absolute\" or \"batch\", got {other:?}")),
        }
    }
}

/// Recommendation and veto thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Minimum score for an item to be recommended for deletion.
    pub min_deletion_score: f64,
    /// Average external rating at or above which an item is never recommended.
    pub never_delete_rating: f64,
}

/// Deletion gate and executor settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeletionConfig {
    /// Shared secret that must accompany every deletion request.
    pub secret: Secret,
    /// Concurrent delete calls against the media server.
    pub parallelism: usize,
    /// Report what would be deleted without calling the media server.
    pub dry_run: bool,
}

/// Filesystem paths used by media_cull.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub activity_log: PathBuf,
}

/// Deletion secret. `Debug` never prints the value.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("Secret(<unset>)")
        } else {
            f.write_str("Secret(***)")
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            play_count_weight: 0.30,
            rating_weight: 0.25,
            size_weight: 0.20,
            age_weight: 0.15,
            quality_weight: 0.10,
            normalization: NormalizationMode::Absolute,
            size_reference_bytes: 20 * 1_073_741_824,
            age_saturation_days: 730,
        }
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            min_deletion_score: 0.7,
            never_delete_rating: 8.0,
        }
    }
}

impl Default for DeletionConfig {
    fn default() -> Self {
        Self {
            secret: Secret::default(),
            parallelism: 1,
            dry_run: false,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!(
                    "[MCL-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths"
                );
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        Self {
            config_file: home_dir
                .join(".config")
                .join("media-cull")
                .join("config.toml"),
            activity_log: home_dir
                .join(".local")
                .join("share")
                .join("media-cull")
                .join("activity.jsonl"),
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf)
                .map_err(|source| CullError::io(&path_buf, source))?;
            toml::from_str::<Self>(&raw)?
        } else if path.is_some() {
            return Err(CullError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a TOML document and validate it without touching the environment.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deterministic hash of the effective config for logging.
    ///
    /// FNV-1a over canonical JSON with the secret blanked out.
    pub fn stable_hash(&self) -> Result<String> {
        let mut redacted = self.clone();
        redacted.deletion.secret = Secret::default();
        let canonical = serde_json::to_string(&redacted)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        // scoring
        for (name, slot) in [
            (
                "MCL_SCORING_PLAY_COUNT_WEIGHT",
                &mut self.scoring.play_count_weight,
            ),
            ("MCL_SCORING_RATING_WEIGHT", &mut self.scoring.rating_weight),
            ("MCL_SCORING_SIZE_WEIGHT", &mut self.scoring.size_weight),
            ("MCL_SCORING_AGE_WEIGHT", &mut self.scoring.age_weight),
            ("MCL_SCORING_QUALITY_WEIGHT", &mut self.scoring.quality_weight),
        ] {
            if let Some(raw) = lookup(name) {
                *slot = parse_env(name, &raw)?;
            }
        }
        if let Some(raw) = lookup("MCL_SCORING_NORMALIZATION") {
            self.scoring.normalization = raw.parse().map_err(|details| CullError::ConfigParse {
                context: "env",
                details: format!("MCL_SCORING_NORMALIZATION={raw:?}: {details}"),
            })?;
        }
        if let Some(raw) = lookup("MCL_SCORING_SIZE_REFERENCE_BYTES") {
            self.scoring.size_reference_bytes =
                parse_env("MCL_SCORING_SIZE_REFERENCE_BYTES", &raw)?;
        }
        if let Some(raw) = lookup("MCL_SCORING_AGE_SATURATION_DAYS") {
            self.scoring.age_saturation_days = parse_env("MCL_SCORING_AGE_SATURATION_DAYS", &raw)?;
        }

        // thresholds
        if let Some(raw) = lookup("MCL_THRESHOLDS_MIN_DELETION_SCORE") {
            self.thresholds.min_deletion_score =
                parse_env("MCL_THRESHOLDS_MIN_DELETION_SCORE", &raw)?;
        }
        if let Some(raw) = lookup("MCL_THRESHOLDS_NEVER_DELETE_RATING") {
            self.thresholds.never_delete_rating =
                parse_env("MCL_THRESHOLDS_NEVER_DELETE_RATING", &raw)?;
        }

        // deletion
        if let Some(raw) = lookup("MCL_DELETION_SECRET") {
            self.deletion.secret = Secret::new(raw);
        }
        if let Some(raw) = lookup("MCL_DELETION_PARALLELISM") {
            self.deletion.parallelism = parse_env("MCL_DELETION_PARALLELISM", &raw)?;
        }
        if let Some(raw) = lookup("MCL_DELETION_DRY_RUN") {
            self.deletion.dry_run = parse_env("MCL_DELETION_DRY_RUN", &raw)?;
        }

        // paths
        if let Some(raw) = lookup("MCL_PATHS_ACTIVITY_LOG") {
            self.paths.activity_log = PathBuf::from(raw);
        }

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let weights = [
            ("play_count_weight", self.scoring.play_count_weight),
            ("rating_weight", self.scoring.rating_weight),
            ("size_weight", self.scoring.size_weight),
            ("age_weight", self.scoring.age_weight),
            ("quality_weight", self.scoring.quality_weight),
        ];
        for (name, val) in weights {
            if !val.is_finite() || val < 0.0 {
                return Err(CullError::InvalidConfig {
                    details: format!("scoring.{name} must be a finite value >= 0.0, got {val}"),
                });
            }
        }
        // Deviation from 1.0 is only warned about by the engine; all-zero is unusable.
        let sum: f64 = weights.iter().map(|(_, val)| val).sum();
        if sum <= 0.0 {
            return Err(CullError::InvalidConfig {
                details: "scoring weights must not all be zero".to_string(),
            });
        }

        if self.scoring.normalization == NormalizationMode::Absolute
            && self.scoring.size_reference_bytes == 0
        {
            return Err(CullError::InvalidConfig {
                details: "scoring.size_reference_bytes must be > 0 in absolute mode".to_string(),
            });
        }
        if self.scoring.age_saturation_days == 0 {
            return Err(CullError::InvalidConfig {
                details: "scoring.age_saturation_days must be > 0".to_string(),
            });
        }

        let min_score = self.thresholds.min_deletion_score;
        if !(0.0..=1.0).contains(&min_score) {
            return Err(CullError::InvalidConfig {
                details: format!("thresholds.min_deletion_score must be in [0,1], got {min_score}"),
            });
        }
        let never_delete = self.thresholds.never_delete_rating;
        if !(0.0..=10.0).contains(&never_delete) {
            return Err(CullError::InvalidConfig {
                details: format!(
                    "thresholds.never_delete_rating must be in [0,10], got {never_delete}"
                ),
            });
        }

        if !(1..=MAX_DELETE_PARALLELISM).contains(&self.deletion.parallelism) {
            return Err(CullError::InvalidConfig {
                details: format!(
                    "deletion.parallelism must be in [1, {MAX_DELETE_PARALLELISM}], got {}",
                    self.deletion.parallelism
                ),
            });
        }

        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env<T>(name: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.trim().parse::<T>().map_err(|error| CullError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}
