//! Cache freshness reporting and forced refresh
//!
//! The refresh controller answers "how stale is this county's data" from
//! cache entry timestamps and implements the forced-refresh cascade that
//! clears every cache namespace scoped to a county.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::cache::{keys, FarmCache};

/// Freshness of a county's comprehensive record
#[derive(Debug, Clone, Serialize)]
pub struct RefreshStatus {
    /// When the comprehensive record was assembled, if one exists
    pub last_updated: Option<DateTime<Utc>>,
    /// Whether the record is missing or past its expiry
    pub needs_refresh: bool,
    /// Age of the record in hours, rounded to one decimal place
    pub cache_age_hours: f64,
}

/// Inspects and invalidates a county's cached data
#[derive(Debug, Clone)]
pub struct RefreshController {
    cache: FarmCache,
}

impl RefreshController {
    pub fn new(cache: FarmCache) -> Self {
        Self { cache }
    }

    /// Reports the freshness of a county's comprehensive record
    ///
    /// Works from raw entry timestamps rather than a validating read, so an
    /// expired record still reports its age instead of looking absent.
    pub fn status(&self, fips: &str) -> RefreshStatus {
        let Some(metadata) = self.cache.entry_metadata(&keys::comprehensive(fips)) else {
            return RefreshStatus {
                last_updated: None,
                needs_refresh: true,
                cache_age_hours: 0.0,
            };
        };

        let now = Utc::now();
        let age_hours = (now - metadata.cached_at).num_seconds() as f64 / 3600.0;

        RefreshStatus {
            last_updated: Some(metadata.cached_at),
            needs_refresh: metadata.expires_at < now,
            cache_age_hours: (age_hours * 10.0).round() / 10.0,
        }
    }

    /// Clears every cache entry scoped to a county
    ///
    /// Removes the comprehensive record and all per-source entries, so the
    /// next aggregation re-fetches every source instead of reassembling the
    /// same stale inputs.
    pub fn refresh(&self, fips: &str) {
        for prefix in keys::region_prefixes(fips) {
            self.cache.delete_prefix(&prefix);
        }
        info!(fips, "cleared cached data for county");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ComprehensiveCountyData, SoilData, TerrainData};
    use std::time::Duration;
    use tempfile::TempDir;

    fn create_test_controller() -> (RefreshController, FarmCache, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let cache = FarmCache::with_dir(temp_dir.path().to_path_buf());
        (RefreshController::new(cache.clone()), cache, temp_dir)
    }

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    #[test]
    fn test_status_without_cached_record() {
        let (controller, _cache, _temp_dir) = create_test_controller();

        let status = controller.status("19169");
        assert!(status.last_updated.is_none());
        assert!(status.needs_refresh);
        assert!((status.cache_age_hours - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_status_with_fresh_record() {
        let (controller, cache, _temp_dir) = create_test_controller();
        cache.set(&keys::comprehensive("19169"), &serde_json::json!({"x": 1}), DAY);

        let status = controller.status("19169");
        assert!(status.last_updated.is_some());
        assert!(!status.needs_refresh);
        assert!(status.cache_age_hours < 0.1);
    }

    #[test]
    fn test_status_reports_expired_record_with_age() {
        let (controller, cache, _temp_dir) = create_test_controller();
        cache.set(
            &keys::comprehensive("19169"),
            &serde_json::json!({"x": 1}),
            Duration::from_millis(10),
        );
        std::thread::sleep(Duration::from_millis(30));

        let status = controller.status("19169");
        assert!(status.last_updated.is_some(), "age must survive expiry");
        assert!(status.needs_refresh);
    }

    #[test]
    fn test_refresh_clears_every_county_namespace() {
        let (controller, cache, _temp_dir) = create_test_controller();
        cache.set(&keys::comprehensive("19169"), &serde_json::json!({"x": 1}), DAY);
        cache.set(&keys::agricultural("19169", "crops", 2025), &Vec::<u32>::new(), DAY);
        cache.set(&keys::climate("19169", "normals"), &Vec::<u32>::new(), DAY);
        cache.set(&keys::terrain("19169"), &TerrainData::empty(), DAY);
        cache.set(&keys::soil("19169"), &SoilData::empty(), DAY);
        cache.set(&keys::water("19169"), &serde_json::json!({}), DAY);
        // Another county's data must survive.
        cache.set(&keys::terrain("19153"), &TerrainData::empty(), DAY);

        controller.refresh("19169");

        assert!(cache
            .get::<ComprehensiveCountyData>(&keys::comprehensive("19169"))
            .is_none());
        assert!(cache.get::<Vec<u32>>(&keys::agricultural("19169", "crops", 2025)).is_none());
        assert!(cache.get::<Vec<u32>>(&keys::climate("19169", "normals")).is_none());
        assert!(cache.get::<TerrainData>(&keys::terrain("19169")).is_none());
        assert!(cache.get::<SoilData>(&keys::soil("19169")).is_none());
        assert!(controller.status("19169").needs_refresh);

        assert!(
            cache.get::<TerrainData>(&keys::terrain("19153")).is_some(),
            "refresh must be scoped to one county"
        );
    }
}
