//! USDA NASS Quick Stats client
//!
//! Fetches county-level agricultural census statistics (crops, livestock,
//! economics) from the USDA National Agricultural Statistics Service.

use super::{AgriculturalData, CommodityStat, County};
use crate::cache::{keys, FarmCache};
use chrono::{Datelike, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Time-to-live for agricultural cache entries
const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Environment variable holding the Quick Stats API key
const API_KEY_ENV: &str = "USDA_NASS_API_KEY";

/// Errors that can occur when fetching agricultural data
#[derive(Debug, Error)]
pub enum AgriculturalError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// No API key configured
    #[error("no USDA NASS API key set (export {API_KEY_ENV})")]
    MissingApiKey,
}

/// Response envelope from the Quick Stats API
#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    data: Vec<QuickStatsRecord>,
}

/// A single Quick Stats record
#[derive(Debug, Deserialize)]
struct QuickStatsRecord {
    commodity_desc: Option<String>,
    statisticcat_desc: Option<String>,
    unit_desc: Option<String>,
    /// Numeric value formatted with thousands separators, or a disclosure
    /// code like "(D)" when the figure is withheld
    #[serde(rename = "Value")]
    value: Option<String>,
    year: Option<i32>,
}

/// Client for the USDA NASS Quick Stats API
#[derive(Debug, Clone)]
pub struct AgriculturalClient {
    /// HTTP client for making requests
    http_client: Client,
    /// Shared response cache
    cache: FarmCache,
    /// Base URL for the API (allows override for testing)
    base_url: String,
    /// API key, read from the environment at construction
    api_key: Option<String>,
}

impl AgriculturalClient {
    /// Creates a new AgriculturalClient sharing the given cache
    pub fn new(cache: FarmCache) -> Self {
        Self {
            http_client: Client::new(),
            cache,
            base_url: "https://quickstats.nass.usda.gov/api/api_GET".to_string(),
            api_key: std::env::var(API_KEY_ENV).ok(),
        }
    }

    /// Creates a new AgriculturalClient with a custom base URL (for testing)
    #[cfg(test)]
    pub fn with_base_url(cache: FarmCache, base_url: String) -> Self {
        Self {
            http_client: Client::new(),
            cache,
            base_url,
            api_key: Some("test-key".to_string()),
        }
    }

    /// Fetches the agricultural census record for a county
    ///
    /// The three census sectors (crops, livestock, economics) are fetched
    /// concurrently and cached independently, so a partial failure does not
    /// discard the sectors that succeeded on a later retry.
    ///
    /// An empty response is a valid record: many metro counties simply have
    /// no census rows.
    pub async fn fetch_agricultural_data(
        &self,
        county: &County,
    ) -> Result<AgriculturalData, AgriculturalError> {
        // The census lags the calendar; last year is the newest plausible set.
        let year = Utc::now().year() - 1;

        let (crops, livestock, economics) = tokio::try_join!(
            self.fetch_sector(county, "CROPS", "crops", year),
            self.fetch_sector(county, "ANIMALS & PRODUCTS", "livestock", year),
            self.fetch_sector(county, "ECONOMICS", "economics", year),
        )?;

        let data_year = crops
            .iter()
            .chain(&livestock)
            .chain(&economics)
            .map(|stat| stat.year)
            .max()
            .unwrap_or(year);

        Ok(AgriculturalData {
            crops,
            livestock,
            economics,
            data_year,
        })
    }

    /// Fetches one census sector, going through the cache
    async fn fetch_sector(
        &self,
        county: &County,
        sector: &str,
        sector_slug: &str,
        year: i32,
    ) -> Result<Vec<CommodityStat>, AgriculturalError> {
        let cache_key = keys::agricultural(county.fips, sector_slug, year);
        self.cache
            .cached(&cache_key, CACHE_TTL, || self.fetch_sector_from_api(county, sector, year))
            .await
    }

    async fn fetch_sector_from_api(
        &self,
        county: &County,
        sector: &str,
        year: i32,
    ) -> Result<Vec<CommodityStat>, AgriculturalError> {
        let api_key = self.api_key.as_deref().ok_or(AgriculturalError::MissingApiKey)?;

        let response = self
            .http_client
            .get(&self.base_url)
            .query(&[
                ("key", api_key),
                ("source_desc", "CENSUS"),
                ("sector_desc", sector),
                ("agg_level_desc", "COUNTY"),
                ("state_alpha", county.state),
                ("county_code", county.county_code()),
                ("year", &year.to_string()),
                ("format", "JSON"),
            ])
            .send()
            .await?;

        // Quick Stats answers 400 for queries matching zero rows; treat that
        // as an empty sector rather than a failure.
        if response.status() == reqwest::StatusCode::BAD_REQUEST {
            return Ok(Vec::new());
        }

        let response = response.error_for_status()?.json::<ApiResponse>().await?;
        Ok(parse_records(&response.data))
    }
}

/// Converts Quick Stats records into commodity statistics
fn parse_records(records: &[QuickStatsRecord]) -> Vec<CommodityStat> {
    records
        .iter()
        .map(|record| CommodityStat {
            commodity: record.commodity_desc.clone().unwrap_or_default(),
            category: record.statisticcat_desc.clone().unwrap_or_default(),
            unit: record.unit_desc.clone().unwrap_or_default(),
            value: record.value.as_deref().and_then(parse_value),
            year: record.year.unwrap_or(0),
        })
        .collect()
}

/// Parses a Quick Stats value string
///
/// Values arrive formatted with thousands separators ("1,234,567").
/// Disclosure codes such as "(D)" and "(Z)" mean the figure was withheld
/// and parse to `None`.
fn parse_value(raw: &str) -> Option<f64> {
    raw.trim().replace(',', "").parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::get_county_by_fips;
    use tempfile::TempDir;

    fn create_test_cache() -> (FarmCache, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let cache = FarmCache::with_dir(temp_dir.path().to_path_buf());
        (cache, temp_dir)
    }

    const SAMPLE_RESPONSE: &str = r#"{
        "data": [
            {
                "commodity_desc": "CORN",
                "statisticcat_desc": "AREA HARVESTED",
                "unit_desc": "ACRES",
                "Value": "1,234,567",
                "year": 2024
            },
            {
                "commodity_desc": "SOYBEANS",
                "statisticcat_desc": "SALES",
                "unit_desc": "$",
                "Value": "(D)",
                "year": 2024
            }
        ]
    }"#;

    #[test]
    fn test_parse_value_strips_thousands_separators() {
        assert_eq!(parse_value("1,234,567"), Some(1234567.0));
        assert_eq!(parse_value("42"), Some(42.0));
        assert_eq!(parse_value(" 3.14 "), Some(3.14));
    }

    #[test]
    fn test_parse_value_treats_disclosure_codes_as_missing() {
        assert_eq!(parse_value("(D)"), None);
        assert_eq!(parse_value("(Z)"), None);
        assert_eq!(parse_value(""), None);
    }

    #[test]
    fn test_parse_sample_response() {
        let response: ApiResponse =
            serde_json::from_str(SAMPLE_RESPONSE).expect("Failed to parse sample");
        let stats = parse_records(&response.data);

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].commodity, "CORN");
        assert_eq!(stats[0].category, "AREA HARVESTED");
        assert_eq!(stats[0].unit, "ACRES");
        assert_eq!(stats[0].value, Some(1234567.0));
        assert_eq!(stats[0].year, 2024);

        assert_eq!(stats[1].commodity, "SOYBEANS");
        assert_eq!(stats[1].value, None, "withheld values must parse to None");
    }

    #[test]
    fn test_parse_empty_response() {
        let response: ApiResponse = serde_json::from_str("{}").expect("Failed to parse");
        assert!(parse_records(&response.data).is_empty());
    }

    #[tokio::test]
    async fn test_fetch_sector_returns_cached_data_without_network() {
        let (cache, _temp_dir) = create_test_cache();
        let county = get_county_by_fips("19169").unwrap();
        let year = Utc::now().year() - 1;

        let seeded = vec![CommodityStat {
            commodity: "CORN".to_string(),
            category: "AREA HARVESTED".to_string(),
            unit: "ACRES".to_string(),
            value: Some(100.0),
            year,
        }];
        cache.set(&keys::agricultural("19169", "crops", year), &seeded, CACHE_TTL);

        // Unreachable base URL: any network attempt would fail.
        let client =
            AgriculturalClient::with_base_url(cache, "http://127.0.0.1:1".to_string());
        let result = client.fetch_sector(county, "CROPS", "crops", year).await.unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].commodity, "CORN");
    }

    #[tokio::test]
    async fn test_fetch_fails_without_api_key() {
        let (cache, _temp_dir) = create_test_cache();
        let county = get_county_by_fips("19169").unwrap();

        let client = AgriculturalClient {
            http_client: Client::new(),
            cache,
            base_url: "http://127.0.0.1:1".to_string(),
            api_key: None,
        };

        let result = client.fetch_agricultural_data(county).await;
        assert!(matches!(result, Err(AgriculturalError::MissingApiKey)));
    }
}
