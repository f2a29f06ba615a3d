//! External rating enrichment.
//!
//! Each provider reports on its own scale; everything is normalized to 0–10
//! and averaged into `MediaItem::external_rating_avg`. A provider with no data
//! for an item contributes nothing, so an item with no ratings at all keeps
//! `None` and scores neutral.

#![allow(missing_docs)]

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::library::item::MediaItem;

/// Where a rating came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingSource {
    Imdb,
    Tmdb,
    RottenTomatoes,
    MediaServer,
}

impl fmt::Display for RatingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Imdb => "IMDb",
            Self::Tmdb => "TMDb",
            Self::RottenTomatoes => "RT",
            Self::MediaServer => "server",
        })
    }
}

/// Native scale of a provider's rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingScale {
    /// 0.0–10.0
    TenPoint,
    /// 0–100
    Percent,
}

/// One provider's rating for one item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProviderRating {
    pub source: RatingSource,
    pub value: f64,
    pub scale: RatingScale,
}

impl ProviderRating {
    #[must_use]
    pub const fn ten_point(source: RatingSource, value: f64) -> Self {
        Self {
            source,
            value,
            scale: RatingScale::TenPoint,
        }
    }

    #[must_use]
    pub const fn percent(source: RatingSource, value: f64) -> Self {
        Self {
            source,
            value,
            scale: RatingScale::Percent,
        }
    }

    /// Providers report unrated titles as 0.
    #[must_use]
    pub fn is_unrated(&self) -> bool {
        self.value.abs() < f64::EPSILON
    }

    /// Value on the 0–10 scale, or `None` when the provider reported garbage.
    ///
    /// Zero is treated as "no data": providers report unrated titles as 0.
    #[must_use]
    pub fn normalized(&self) -> Option<f64> {
        let ten_point = match self.scale {
            RatingScale::TenPoint => self.value,
            RatingScale::Percent => self.value / 10.0,
        };
        (ten_point.is_finite() && ten_point > 0.0 && ten_point <= 10.0).then_some(ten_point)
    }
}

/// A rating provider variant (IMDb via OMDb, TMDb, Rotten Tomatoes, the server itself, ...).
///
/// Implementations live outside the core; they must not fail loudly, a missing
/// rating is `None`.
pub trait RatingProvider: Send + Sync {
    /// Attribution for every rating this provider returns.
    fn source(&self) -> RatingSource;

    fn rating_for(&self, item: &MediaItem) -> Option<ProviderRating>;
}

/// Result of combining every provider's rating for one item.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingAggregate {
    pub average: Option<f64>,
    pub accepted: Vec<ProviderRating>,
    /// Values outside the provider's scale. Unrated zeros are not listed.
    pub rejected: Vec<ProviderRating>,
}

/// Average the normalized ratings; unusable values are set aside, not averaged.
#[must_use]
pub fn aggregate(ratings: &[ProviderRating]) -> RatingAggregate {
    let (accepted, rejected): (Vec<ProviderRating>, Vec<ProviderRating>) = ratings
        .iter()
        .copied()
        .filter(|rating| !rating.is_unrated())
        .partition(|rating| rating.normalized().is_some());

    let values: Vec<f64> = accepted.iter().filter_map(ProviderRating::normalized).collect();
    let average = if values.is_empty() {
        None
    } else {
        #[allow(clippy::cast_precision_loss)]
        let count = values.len() as f64;
        Some(values.iter().sum::<f64>() / count)
    };

    RatingAggregate {
        average,
        accepted,
        rejected,
    }
}

/// Runs every configured provider over items and fills in the average rating.
#[derive(Default)]
pub struct RatingEnricher {
    providers: Vec<Box<dyn RatingProvider>>,
}

impl RatingEnricher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_provider(mut self, provider: impl RatingProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Collect and combine ratings for one item.
    pub fn ratings_for(&self, item: &MediaItem) -> RatingAggregate {
        let ratings: Vec<ProviderRating> = self
            .providers
            .iter()
            .filter_map(|provider| {
                provider.rating_for(item).map(|rating| ProviderRating {
                    source: provider.source(),
                    ..rating
                })
            })
            .collect();
        aggregate(&ratings)
    }

    /// Return an enriched copy of `item`.
    ///
    /// When no provider has data the item's existing rating (if any) is kept.
    pub fn enrich(&self, item: &MediaItem) -> MediaItem {
        let aggregate = self.ratings_for(item);
        for rejected in &aggregate.rejected {
            eprintln!(
                "[MCL-ENRICH] ignoring out-of-range {} rating {} for {:?}",
                rejected.source, rejected.value, item.title
            );
        }
        let mut enriched = item.clone();
        if let Some(average) = aggregate.average {
            enriched.external_rating_avg = Some(average);
        }
        enriched
    }

    pub fn enrich_all(&self, items: &[MediaItem]) -> Vec<MediaItem> {
        items.iter().map(|item| self.enrich(item)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;

    struct FixedProvider {
        source: RatingSource,
        by_title: HashMap<String, ProviderRating>,
    }

    impl FixedProvider {
        fn new(source: RatingSource, entries: &[(&str, ProviderRating)]) -> Self {
            Self {
                source,
                by_title: entries
                    .iter()
                    .map(|(title, rating)| ((*title).to_string(), *rating))
                    .collect(),
            }
        }
    }

    impl RatingProvider for FixedProvider {
        fn source(&self) -> RatingSource {
            self.source
        }

        fn rating_for(&self, item: &MediaItem) -> Option<ProviderRating> {
            self.by_title.get(&item.title).copied()
        }
    }

    fn item(title: &str) -> MediaItem {
        MediaItem::new(1_u64, title, Utc::now())
    }

    #[test]
    fn percent_ratings_are_scaled_to_ten_point() {
        let rating = ProviderRating::percent(RatingSource::RottenTomatoes, 85.0);
        assert!((rating.normalized().unwrap() - 8.5).abs() < 1e-9);
    }

    #[test]
    fn zero_and_out_of_range_ratings_are_rejected() {
        assert!(
            ProviderRating::ten_point(RatingSource::Imdb, 0.0)
                .normalized()
                .is_none()
        );
        assert!(
            ProviderRating::ten_point(RatingSource::Imdb, 11.0)
                .normalized()
                .is_none()
        );
        assert!(
            ProviderRating::ten_point(RatingSource::Imdb, f64::NAN)
                .normalized()
                .is_none()
        );
    }

    #[test]
    fn aggregate_averages_mixed_scales() {
        let agg = aggregate(&[
            ProviderRating::ten_point(RatingSource::Imdb, 5.0),
            ProviderRating::ten_point(RatingSource::Tmdb, 5.5),
            ProviderRating::percent(RatingSource::RottenTomatoes, 50.0),
        ]);
        assert!((agg.average.unwrap() - 5.166_666_666).abs() < 1e-6);
        assert_eq!(agg.accepted.len(), 3);
        assert!(agg.rejected.is_empty());
    }

    #[test]
    fn unrated_zeros_are_neither_averaged_nor_rejected() {
        let agg = aggregate(&[
            ProviderRating::ten_point(RatingSource::Imdb, 0.0),
            ProviderRating::percent(RatingSource::RottenTomatoes, 0.0),
            ProviderRating::ten_point(RatingSource::Tmdb, 7.0),
            ProviderRating::percent(RatingSource::RottenTomatoes, 140.0),
        ]);
        assert!((agg.average.unwrap() - 7.0).abs() < 1e-9);
        assert_eq!(agg.accepted.len(), 1);
        assert_eq!(
            agg.rejected,
            vec![ProviderRating::percent(RatingSource::RottenTomatoes, 140.0)]
        );
    }

    #[test]
    fn ratings_are_attributed_to_the_answering_provider() {
        let enricher = RatingEnricher::new().with_provider(FixedProvider::new(
            RatingSource::Tmdb,
            &[("Heat", ProviderRating::ten_point(RatingSource::Imdb, 7.9))],
        ));
        let agg = enricher.ratings_for(&item("Heat"));
        assert_eq!(agg.accepted[0].source, RatingSource::Tmdb);
    }

    #[test]
    fn aggregate_of_nothing_is_unknown() {
        let agg = aggregate(&[]);
        assert!(agg.average.is_none());
    }

    #[test]
    fn enricher_combines_providers_and_degrades_to_unknown() {
        let enricher = RatingEnricher::new()
            .with_provider(FixedProvider::new(
                RatingSource::Imdb,
                &[("Heat", ProviderRating::ten_point(RatingSource::Imdb, 8.3))],
            ))
            .with_provider(FixedProvider::new(
                RatingSource::RottenTomatoes,
                &[(
                    "Heat",
                    ProviderRating::percent(RatingSource::RottenTomatoes, 87.0),
                )],
            ));
        assert_eq!(enricher.provider_count(), 2);

        let enriched = enricher.enrich_all(&[item("Heat"), item("Obscure")]);
        assert!((enriched[0].external_rating_avg.unwrap() - 8.5).abs() < 1e-9);
        assert!(enriched[1].external_rating_avg.is_none());
    }

    #[test]
    fn enricher_keeps_existing_rating_when_providers_are_silent() {
        let enricher = RatingEnricher::new();
        let rated = item("Known").with_rating(6.0);
        assert_eq!(enricher.enrich(&rated).external_rating_avg, Some(6.0));
    }
}
