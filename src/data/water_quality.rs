//! EPA ATTAINS water quality client
//!
//! Fetches state water body assessments from EPA ATTAINS and summarizes them
//! into a county-level rating and an irrigation safety verdict.

use std::time::Duration;

use super::{County, IrrigationSafety, WaterQualityData, WaterRating};
use crate::cache::{keys, FarmCache};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Time-to-live for water quality cache entries
const CACHE_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Pollutants reported per county
const MAX_POLLUTANTS: usize = 5;

/// Errors that can occur when fetching water quality data
#[derive(Debug, Error)]
pub enum WaterQualityError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Every candidate organization query failed
    #[error("all assessment queries failed, last error: {0}")]
    AllQueriesFailed(String),
}

/// Response envelope from the ATTAINS assessments endpoint
#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    items: Vec<Assessment>,
}

/// A single water body assessment
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Assessment {
    assessment_unit_name: Option<String>,
    /// EPA Integrated Report category; "1" and "2" mean the water body
    /// supports its uses, everything else indicates impairment
    #[serde(rename = "epaIRCategory")]
    epa_ir_category: Option<String>,
    #[serde(default)]
    pollutants: Vec<String>,
}

impl Assessment {
    fn is_impaired(&self) -> bool {
        !matches!(self.epa_ir_category.as_deref(), Some("1") | Some("2"))
    }
}

/// Client for the EPA ATTAINS public API
#[derive(Debug, Clone)]
pub struct WaterQualityClient {
    /// HTTP client for making requests
    http_client: Client,
    /// Shared response cache
    cache: FarmCache,
    /// Base URL for the API (allows override for testing)
    base_url: String,
}

impl WaterQualityClient {
    /// Creates a new WaterQualityClient sharing the given cache
    pub fn new(cache: FarmCache) -> Self {
        Self {
            http_client: Client::new(),
            cache,
            base_url: "https://attains.epa.gov/attains-public/api".to_string(),
        }
    }

    /// Creates a new WaterQualityClient with a custom base URL (for testing)
    #[cfg(test)]
    pub fn with_base_url(cache: FarmCache, base_url: String) -> Self {
        Self {
            http_client: Client::new(),
            cache,
            base_url,
        }
    }

    /// Fetches the water quality summary for a county
    ///
    /// ATTAINS indexes assessments by state organization, and organization
    /// naming varies by state, so several candidate identifiers are tried
    /// and their results merged. The fetch fails only when every candidate
    /// query fails; an empty merge is a valid Unknown summary.
    pub async fn fetch_water_quality(
        &self,
        county: &County,
    ) -> Result<WaterQualityData, WaterQualityError> {
        let cache_key = keys::water(county.fips);
        self.cache
            .cached(&cache_key, CACHE_TTL, || self.fetch_from_api(county))
            .await
    }

    async fn fetch_from_api(&self, county: &County) -> Result<WaterQualityData, WaterQualityError> {
        let state = county.state;
        let candidates = [
            format!("{state}_DENR"),
            format!("{state}DENR"),
            format!("{state}_DEQ"),
            state.to_string(),
        ];

        let mut assessments = Vec::new();
        let mut any_succeeded = false;
        let mut last_error = String::new();

        for organization_id in &candidates {
            match self.fetch_assessments(organization_id).await {
                Ok(mut items) => {
                    any_succeeded = true;
                    assessments.append(&mut items);
                }
                Err(err) => {
                    debug!(organization_id, %err, "assessment query failed");
                    last_error = err.to_string();
                }
            }
        }

        if !any_succeeded {
            return Err(WaterQualityError::AllQueriesFailed(last_error));
        }

        Ok(summarize_assessments(&assessments))
    }

    async fn fetch_assessments(
        &self,
        organization_id: &str,
    ) -> Result<Vec<Assessment>, reqwest::Error> {
        let response = self
            .http_client
            .get(format!("{}/assessments", self.base_url))
            .query(&[("organizationId", organization_id)])
            .send()
            .await?
            .error_for_status()?
            .json::<ApiResponse>()
            .await?;
        Ok(response.items)
    }
}

/// Summarizes raw assessments into a county water quality record
fn summarize_assessments(assessments: &[Assessment]) -> WaterQualityData {
    let assessed = assessments.len() as u32;
    let impaired_names: Vec<String> = assessments
        .iter()
        .filter(|a| a.is_impaired())
        .filter_map(|a| a.assessment_unit_name.clone())
        .collect();
    let impaired = assessments.iter().filter(|a| a.is_impaired()).count() as u32;

    let mut major_pollutants = Vec::new();
    for pollutant in assessments.iter().flat_map(|a| &a.pollutants) {
        if !major_pollutants.contains(pollutant) {
            major_pollutants.push(pollutant.clone());
        }
        if major_pollutants.len() == MAX_POLLUTANTS {
            break;
        }
    }

    let overall_rating = if assessed == 0 {
        WaterRating::Unknown
    } else {
        let impaired_ratio = impaired as f64 / assessed as f64;
        if impaired_ratio < 0.2 {
            WaterRating::Good
        } else if impaired_ratio < 0.5 {
            WaterRating::Fair
        } else {
            WaterRating::Poor
        }
    };

    let (water_suitability_score, irrigation_suitability) = match overall_rating {
        WaterRating::Good => (0.9, IrrigationSafety::Safe),
        WaterRating::Fair => (0.7, IrrigationSafety::Moderate),
        WaterRating::Poor => (0.3, IrrigationSafety::HighRisk),
        WaterRating::Unknown => (0.5, IrrigationSafety::Unknown),
    };

    WaterQualityData {
        assessed_water_bodies: assessed,
        impaired_water_bodies: impaired,
        major_pollutants,
        overall_rating,
        impaired_uses: impaired_names,
        water_suitability_score,
        irrigation_suitability,
    }
}
