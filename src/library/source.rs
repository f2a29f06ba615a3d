//! Metadata collection boundary.

use crate::core::errors::Result;
use crate::library::enrichment::RatingEnricher;
use crate::library::item::MediaItem;

/// Fetches item snapshots for a named library from the media server.
///
/// Implementations own the network and authentication; an unreachable server
/// is reported as `CullError::Connectivity`.
pub trait MetadataSource {
    /// All items currently in `library`.
    fn fetch_library_items(&self, library: &str) -> Result<Vec<MediaItem>>;
}

/// Fetch a library and run the enricher over it.
pub fn collect_library(
    source: &dyn MetadataSource,
    library: &str,
    enricher: &RatingEnricher,
) -> Result<Vec<MediaItem>> {
    let items = source.fetch_library_items(library)?;
    Ok(enricher.enrich_all(&items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::CullError;
    use crate::library::enrichment::{ProviderRating, RatingProvider, RatingSource};
    use chrono::Utc;

    struct Offline;

    impl MetadataSource for Offline {
        fn fetch_library_items(&self, _library: &str) -> Result<Vec<MediaItem>> {
            Err(CullError::Connectivity {
                details: "connection refused".to_string(),
            })
        }
    }

    struct Movies;

    impl MetadataSource for Movies {
        fn fetch_library_items(&self, library: &str) -> Result<Vec<MediaItem>> {
            assert_eq!(library, "Movies");
            Ok(vec![MediaItem::new(10_u64, "Alien", Utc::now())])
        }
    }

    struct FlatSeven;

    impl RatingProvider for FlatSeven {
        fn source(&self) -> RatingSource {
            RatingSource::Tmdb
        }

        fn rating_for(&self, _item: &MediaItem) -> Option<ProviderRating> {
            Some(ProviderRating::ten_point(RatingSource::Tmdb, 7.0))
        }
    }

    #[test]
    fn collect_propagates_connectivity_failures() {
        let err = collect_library(&Offline, "Movies", &RatingEnricher::new()).unwrap_err();
        assert_eq!(err.code(), "MCL-2101");
    }

    #[test]
    fn collect_enriches_fetched_items() {
        let enricher = RatingEnricher::new().with_provider(FlatSeven);
        let items = collect_library(&Movies, "Movies", &enricher).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].external_rating_avg, Some(7.0));
    }
}
