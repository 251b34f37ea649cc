//! County data aggregation
//!
//! Fans out to the five source adapters concurrently, degrades gracefully
//! when sources fail, and assembles the comprehensive county record. The
//! only hard failure is an unknown FIPS code; anything else becomes a
//! per-source error string alongside whatever data did arrive.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use crate::analysis::analyze;
use crate::cache::{keys, CacheStats, FarmCache};
use crate::data::{
    get_county_by_fips, AgriculturalClient, AgriculturalData, ClimateClient, ClimateData,
    ComprehensiveCountyData, CountyInfo, FetchStatus, OverallStatus, SoilClient, SoilData,
    SourceStatus, TerrainClient, TerrainData, WaterQualityClient, WaterQualityData,
};

/// Time-to-live for the merged comprehensive record
const COMPREHENSIVE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default per-source fetch timeout
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that fail an aggregation outright
#[derive(Debug, Error)]
pub enum AggregatorError {
    /// The FIPS code is not in the county table
    #[error("county not found for FIPS code {0}")]
    CountyNotFound(String),
}

/// Result of an aggregation pass
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// The assembled record; sources that failed are filled with neutral
    /// defaults
    pub data: ComprehensiveCountyData,
    /// Per-source and overall statuses
    pub status: FetchStatus,
    /// Human-readable error per failed source, prefixed with the source name
    pub errors: Vec<String>,
}

/// Aggregates the five data sources into comprehensive county records
#[derive(Debug, Clone)]
pub struct FarmDataService {
    cache: FarmCache,
    agricultural: AgriculturalClient,
    climate: ClimateClient,
    terrain: TerrainClient,
    soil: SoilClient,
    water_quality: WaterQualityClient,
    fetch_timeout: Duration,
}

impl FarmDataService {
    /// Creates a service whose adapters share the given cache
    pub fn new(cache: FarmCache) -> Self {
        Self {
            agricultural: AgriculturalClient::new(cache.clone()),
            climate: ClimateClient::new(cache.clone()),
            terrain: TerrainClient::new(cache.clone()),
            soil: SoilClient::new(cache.clone()),
            water_quality: WaterQualityClient::new(cache.clone()),
            cache,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Overrides the per-source fetch timeout
    pub fn with_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Creates a service from pre-built clients (for testing)
    #[cfg(test)]
    fn with_clients(
        cache: FarmCache,
        agricultural: AgriculturalClient,
        climate: ClimateClient,
        terrain: TerrainClient,
        soil: SoilClient,
        water_quality: WaterQualityClient,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            agricultural,
            climate,
            terrain,
            soil,
            water_quality,
            fetch_timeout,
        }
    }

    /// Fetches or assembles the comprehensive record for a county
    ///
    /// A fresh cached comprehensive record short-circuits the fetch and
    /// reports every source as cached. Otherwise all five sources are
    /// queried concurrently, each bounded by the fetch timeout; failures
    /// are recorded and their slots filled with neutral defaults so the
    /// analysis always has something to work with.
    pub async fn comprehensive_data(&self, fips: &str) -> Result<FetchOutcome, AggregatorError> {
        let comprehensive_key = keys::comprehensive(fips);
        if let Some(data) = self.cache.get::<ComprehensiveCountyData>(&comprehensive_key) {
            info!(fips, "serving comprehensive record from cache");
            return Ok(FetchOutcome {
                data,
                status: FetchStatus::all_cached(),
                errors: Vec::new(),
            });
        }

        let county = get_county_by_fips(fips)
            .ok_or_else(|| AggregatorError::CountyNotFound(fips.to_string()))?;

        info!(fips, county = county.name, "fetching county data from all sources");

        let mut status = FetchStatus::pending();
        let mut errors = Vec::new();

        let (agricultural, climate, terrain, soil, water) = tokio::join!(
            self.run_source("USDA", self.agricultural.fetch_agricultural_data(county)),
            self.run_source("NOAA", self.climate.fetch_climate_data(county)),
            self.run_source("USGS", self.terrain.fetch_terrain_data(county)),
            self.run_source("Soil", self.soil.fetch_soil_data(county)),
            self.run_source("EPA", self.water_quality.fetch_water_quality(county)),
        );

        let agricultural = settle(agricultural, &mut status.agricultural, &mut errors);
        let climate = settle(climate, &mut status.climate, &mut errors);
        let terrain = settle(terrain, &mut status.terrain, &mut errors);
        let soil = settle(soil, &mut status.soil, &mut errors);
        let water = settle(water, &mut status.water, &mut errors);

        let analysis = analyze(
            terrain.as_ref(),
            soil.as_ref(),
            climate.as_ref(),
            agricultural.as_ref(),
            water.as_ref(),
        );

        let data = ComprehensiveCountyData {
            county: CountyInfo {
                fips: county.fips.to_string(),
                name: county.name.to_string(),
                state: county.state.to_string(),
                last_updated: Utc::now(),
            },
            agricultural: agricultural.unwrap_or_else(AgriculturalData::empty),
            climate: climate.unwrap_or_else(ClimateData::empty),
            terrain: terrain.unwrap_or_else(TerrainData::empty),
            soil: soil.unwrap_or_else(SoilData::empty),
            water_quality: water.unwrap_or_else(WaterQualityData::empty),
            analysis,
        };

        self.cache.set(&comprehensive_key, &data, COMPREHENSIVE_TTL);
        status.overall = OverallStatus::Success;

        Ok(FetchOutcome {
            data,
            status,
            errors,
        })
    }

    /// Runs one source fetch under the configured timeout, flattening
    /// timeouts and adapter errors into a source-prefixed message
    async fn run_source<T, E: Display>(
        &self,
        source: &str,
        fut: impl Future<Output = Result<T, E>>,
    ) -> Result<T, String> {
        match tokio::time::timeout(self.fetch_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(format!("{source}: {err}")),
            Err(_) => Err(format!(
                "{source}: request timed out after {}s",
                self.fetch_timeout.as_secs()
            )),
        }
    }

    /// Returns diagnostic counters for the shared cache
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

/// Records a source outcome in the status block, collecting the error if any
fn settle<T>(
    result: Result<T, String>,
    status: &mut SourceStatus,
    errors: &mut Vec<String>,
) -> Option<T> {
    match result {
        Ok(value) => {
            *status = SourceStatus::Success;
            Some(value)
        }
        Err(message) => {
            warn!(%message, "source fetch failed");
            *status = SourceStatus::Error;
            errors.push(message);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{FarmAnalysis, Grade, SoilData};
    use tempfile::TempDir;

    /// A service whose every adapter points at an unreachable address, so
    /// anything not already cached fails fast with a connection error.
    fn offline_service(cache: FarmCache) -> FarmDataService {
        let dead = || "http://127.0.0.1:1".to_string();
        FarmDataService::with_clients(
            cache.clone(),
            AgriculturalClient::with_base_url(cache.clone(), dead()),
            ClimateClient::with_base_url(cache.clone(), dead()),
            TerrainClient::with_base_url(cache.clone(), dead()),
            SoilClient::with_base_url(cache.clone(), dead()),
            WaterQualityClient::with_base_url(cache, dead()),
            Duration::from_secs(5),
        )
    }

    fn create_test_cache() -> (FarmCache, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let cache = FarmCache::with_dir(temp_dir.path().to_path_buf());
        (cache, temp_dir)
    }

    fn sample_comprehensive(fips: &str) -> ComprehensiveCountyData {
        ComprehensiveCountyData {
            county: CountyInfo {
                fips: fips.to_string(),
                name: "Story County".to_string(),
                state: "IA".to_string(),
                last_updated: Utc::now(),
            },
            agricultural: AgriculturalData::empty(),
            climate: ClimateData::empty(),
            terrain: TerrainData::empty(),
            soil: SoilData::empty(),
            water_quality: WaterQualityData::empty(),
            analysis: FarmAnalysis {
                overall_score: 82,
                grade: Grade::B,
                strengths: vec!["Good natural drainage".to_string()],
                limitations: Vec::new(),
                recommended_crops: vec!["Corn".to_string()],
                risk_factors: Vec::new(),
                recommendations: vec!["Regular soil testing".to_string()],
            },
        }
    }

    #[tokio::test]
    async fn test_unknown_fips_is_the_only_hard_failure() {
        let (cache, _temp_dir) = create_test_cache();
        let service = offline_service(cache);

        let result = service.comprehensive_data("99999").await;
        assert!(matches!(result, Err(AggregatorError::CountyNotFound(_))));
    }

    #[tokio::test]
    async fn test_cached_comprehensive_record_short_circuits() {
        let (cache, _temp_dir) = create_test_cache();
        cache.set(
            &keys::comprehensive("19169"),
            &sample_comprehensive("19169"),
            COMPREHENSIVE_TTL,
        );

        let service = offline_service(cache);
        let outcome = service.comprehensive_data("19169").await.unwrap();

        assert_eq!(outcome.status.agricultural, SourceStatus::Cached);
        assert_eq!(outcome.status.climate, SourceStatus::Cached);
        assert_eq!(outcome.status.terrain, SourceStatus::Cached);
        assert_eq!(outcome.status.soil, SourceStatus::Cached);
        assert_eq!(outcome.status.water, SourceStatus::Cached);
        assert_eq!(outcome.status.overall, OverallStatus::Success);
        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.data.analysis.overall_score, 82);
    }

    #[tokio::test]
    async fn test_all_sources_failing_yields_default_record() {
        let (cache, _temp_dir) = create_test_cache();
        let service = offline_service(cache);

        let outcome = service.comprehensive_data("19169").await.unwrap();

        assert_eq!(outcome.errors.len(), 5, "errors: {:?}", outcome.errors);
        assert_eq!(outcome.status.agricultural, SourceStatus::Error);
        assert_eq!(outcome.status.water, SourceStatus::Error);
        // Degradation still yields a usable record with neutral defaults.
        assert_eq!(outcome.status.overall, OverallStatus::Success);
        assert_eq!(outcome.data.county.name, "Story County");
        assert_eq!(outcome.data.analysis.overall_score, 70);
        assert_eq!(outcome.data.analysis.grade, Grade::C);

        // Every error names its source.
        for prefix in ["USDA:", "NOAA:", "USGS:", "Soil:", "EPA:"] {
            assert!(
                outcome.errors.iter().any(|e| e.starts_with(prefix)),
                "missing {prefix} error in {:?}",
                outcome.errors
            );
        }
    }

    #[tokio::test]
    async fn test_degraded_record_is_cached_and_served_on_refetch() {
        let (cache, _temp_dir) = create_test_cache();
        let service = offline_service(cache);

        let first = service.comprehensive_data("19169").await.unwrap();
        assert_eq!(first.errors.len(), 5);

        // The assembled record was cached, so the next call is a pure
        // cache hit even though every source is still down.
        let second = service.comprehensive_data("19169").await.unwrap();
        assert!(second.errors.is_empty());
        assert_eq!(second.status.agricultural, SourceStatus::Cached);
        assert_eq!(second.data.analysis.overall_score, first.data.analysis.overall_score);
    }

    #[tokio::test]
    async fn test_partial_failure_uses_per_source_caches() {
        let (cache, _temp_dir) = create_test_cache();

        // Terrain, soil, and water have fresh adapter-level cache entries;
        // USDA and NOAA have nothing and will fail.
        let month = Duration::from_secs(30 * 24 * 60 * 60);
        cache.set(&keys::terrain("19169"), &TerrainData::empty(), month);
        cache.set(&keys::soil("19169"), &SoilData::empty(), month);
        cache.set(&keys::water("19169"), &WaterQualityData::empty(), month);

        let service = offline_service(cache);
        let outcome = service.comprehensive_data("19169").await.unwrap();

        assert_eq!(outcome.status.terrain, SourceStatus::Success);
        assert_eq!(outcome.status.soil, SourceStatus::Success);
        assert_eq!(outcome.status.water, SourceStatus::Success);
        assert_eq!(outcome.status.agricultural, SourceStatus::Error);
        assert_eq!(outcome.status.climate, SourceStatus::Error);
        assert_eq!(outcome.errors.len(), 2);

        // mean(70, 75, 50) = 65: a D, driven by the unknown water rating.
        assert_eq!(outcome.data.analysis.overall_score, 65);
        assert_eq!(outcome.data.analysis.grade, Grade::D);
    }

    #[tokio::test]
    async fn test_single_source_failure_defaults_only_that_domain() {
        use chrono::Datelike;
        use crate::data::{DailyWeather, MonthlyNormal};

        let (cache, _temp_dir) = create_test_cache();

        // Every source except USDA has a fresh adapter-level cache entry.
        let month = Duration::from_secs(30 * 24 * 60 * 60);
        let year = Utc::now().year() - 1;
        cache.set(
            &keys::climate("19169", &format!("historical_{year}")),
            &Vec::<DailyWeather>::new(),
            month,
        );
        cache.set(&keys::climate("19169", "normals"), &Vec::<MonthlyNormal>::new(), month);
        cache.set(&keys::terrain("19169"), &TerrainData::empty(), month);
        cache.set(&keys::soil("19169"), &SoilData::empty(), month);
        cache.set(&keys::water("19169"), &WaterQualityData::empty(), month);

        let service = offline_service(cache);
        let outcome = service.comprehensive_data("19169").await.unwrap();

        assert_eq!(outcome.errors.len(), 1, "errors: {:?}", outcome.errors);
        assert!(outcome.errors[0].starts_with("USDA:"));
        assert_eq!(outcome.status.agricultural, SourceStatus::Error);
        assert_eq!(outcome.status.climate, SourceStatus::Success);
        assert_eq!(outcome.status.terrain, SourceStatus::Success);
        assert_eq!(outcome.status.soil, SourceStatus::Success);
        assert_eq!(outcome.status.water, SourceStatus::Success);
        assert_eq!(outcome.status.overall, OverallStatus::Success);

        // Only the failed domain falls back to its neutral record.
        assert!(outcome.data.agricultural.crops.is_empty());
        assert_eq!(outcome.data.agricultural.data_year, AgriculturalData::empty().data_year);
    }

    #[tokio::test]
    async fn test_cache_stats_exposed() {
        let (cache, _temp_dir) = create_test_cache();
        cache.set(
            &keys::comprehensive("19169"),
            &sample_comprehensive("19169"),
            COMPREHENSIVE_TTL,
        );

        let service = offline_service(cache);
        let stats = service.cache_stats();
        assert_eq!(stats.durable_entries, 1);
    }
}
