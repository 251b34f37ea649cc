//! Elevation and terrain analysis client
//!
//! Samples a grid of elevations across a county from the Open-Elevation API
//! and derives slope, drainage, flood, and erosion characteristics from the
//! profile.

use std::time::Duration;

use super::{County, DrainagePattern, RiskLevel, SlopeCategory, TerrainData};
use crate::cache::{keys, FarmCache};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

/// Time-to-live for terrain cache entries; topography does not change
const CACHE_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Grid edge length; the profile samples GRID_SIZE^2 points
const GRID_SIZE: usize = 5;

/// Half-extent of the sampling box around the county centroid, in degrees
const LAT_EXTENT: f64 = 0.25;
const LON_EXTENT: f64 = 0.35;

/// Point pairs farther apart than this are skipped when averaging slopes
const MAX_SLOPE_DISTANCE_M: f64 = 5000.0;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Errors that can occur when fetching terrain data
#[derive(Debug, Error)]
pub enum TerrainError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The elevation service returned no usable points
    #[error("no elevation data returned for the sampled grid")]
    NoData,
}

/// Response envelope from the Open-Elevation API
#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    results: Vec<ElevationPoint>,
}

/// A single sampled elevation
#[derive(Debug, Clone, Copy, Deserialize)]
struct ElevationPoint {
    latitude: f64,
    longitude: f64,
    elevation: f64,
}

/// Client for the Open-Elevation API
#[derive(Debug, Clone)]
pub struct TerrainClient {
    /// HTTP client for making requests
    http_client: Client,
    /// Shared response cache
    cache: FarmCache,
    /// Base URL for the API (allows override for testing)
    base_url: String,
}

impl TerrainClient {
    /// Creates a new TerrainClient sharing the given cache
    pub fn new(cache: FarmCache) -> Self {
        Self {
            http_client: Client::new(),
            cache,
            base_url: "https://api.open-elevation.com".to_string(),
        }
    }

    /// Creates a new TerrainClient with a custom base URL (for testing)
    #[cfg(test)]
    pub fn with_base_url(cache: FarmCache, base_url: String) -> Self {
        Self {
            http_client: Client::new(),
            cache,
            base_url,
        }
    }

    /// Fetches the terrain analysis for a county
    pub async fn fetch_terrain_data(&self, county: &County) -> Result<TerrainData, TerrainError> {
        let cache_key = keys::terrain(county.fips);
        self.cache
            .cached(&cache_key, CACHE_TTL, || self.fetch_from_api(county))
            .await
    }

    async fn fetch_from_api(&self, county: &County) -> Result<TerrainData, TerrainError> {
        let locations = grid_points(county.latitude, county.longitude)
            .map(|(lat, lon)| format!("{lat:.4},{lon:.4}"))
            .collect::<Vec<_>>()
            .join("|");

        let response = self
            .http_client
            .get(format!("{}/api/v1/lookup", self.base_url))
            .query(&[("locations", locations.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json::<ApiResponse>()
            .await?;

        if response.results.is_empty() {
            return Err(TerrainError::NoData);
        }

        Ok(analyze_elevation_profile(&response.results))
    }
}

/// Yields a GRID_SIZE x GRID_SIZE lattice centered on the county centroid
fn grid_points(latitude: f64, longitude: f64) -> impl Iterator<Item = (f64, f64)> {
    let min_lat = latitude - LAT_EXTENT;
    let min_lon = longitude - LON_EXTENT;
    let lat_step = 2.0 * LAT_EXTENT / (GRID_SIZE - 1) as f64;
    let lon_step = 2.0 * LON_EXTENT / (GRID_SIZE - 1) as f64;

    (0..GRID_SIZE).flat_map(move |i| {
        (0..GRID_SIZE)
            .map(move |j| (min_lat + lat_step * i as f64, min_lon + lon_step * j as f64))
    })
}

/// Derives terrain characteristics from a sampled elevation profile
fn analyze_elevation_profile(points: &[ElevationPoint]) -> TerrainData {
    let elevations: Vec<f64> = points.iter().map(|p| p.elevation).collect();
    let elevation_min = elevations.iter().copied().fold(f64::INFINITY, f64::min);
    let elevation_max = elevations.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let elevation_avg = elevations.iter().sum::<f64>() / elevations.len() as f64;

    // Average slope over nearby point pairs, in degrees.
    let mut slopes = Vec::new();
    for (i, a) in points.iter().enumerate() {
        for b in &points[i + 1..] {
            let distance = haversine_m(a.latitude, a.longitude, b.latitude, b.longitude);
            if distance > 0.0 && distance < MAX_SLOPE_DISTANCE_M {
                let rise = (b.elevation - a.elevation).abs();
                slopes.push((rise / distance).atan().to_degrees());
            }
        }
    }
    let slope_avg = if slopes.is_empty() {
        0.0
    } else {
        slopes.iter().sum::<f64>() / slopes.len() as f64
    };

    let variance = elevations
        .iter()
        .map(|e| (e - elevation_avg).powi(2))
        .sum::<f64>()
        / elevations.len() as f64;
    let terrain_roughness = variance.sqrt();

    let slope_category = categorize_slope(slope_avg);
    let drainage_pattern = assess_drainage(terrain_roughness, slope_avg);
    let flood_risk = assess_flood_risk(elevation_avg, slope_avg, terrain_roughness);
    let erosion_risk = assess_erosion_risk(slope_avg);
    let farm_suitability_score =
        suitability_score(slope_avg, drainage_pattern, flood_risk, erosion_risk);

    TerrainData {
        elevation_min,
        elevation_max,
        elevation_avg,
        slope_avg,
        slope_category,
        terrain_roughness,
        drainage_pattern,
        flood_risk,
        erosion_risk,
        farm_suitability_score,
    }
}

fn categorize_slope(slope_degrees: f64) -> SlopeCategory {
    if slope_degrees <= 2.0 {
        SlopeCategory::Flat
    } else if slope_degrees <= 5.0 {
        SlopeCategory::Gentle
    } else if slope_degrees <= 8.0 {
        SlopeCategory::Moderate
    } else if slope_degrees <= 15.0 {
        SlopeCategory::Steep
    } else {
        SlopeCategory::VerySteep
    }
}

/// Good drainage needs moderate slope and some terrain variation
fn assess_drainage(roughness: f64, slope: f64) -> DrainagePattern {
    if (2.0..=8.0).contains(&slope) && roughness > 10.0 {
        DrainagePattern::Excellent
    } else if (1.0..=12.0).contains(&slope) && roughness > 5.0 {
        DrainagePattern::Good
    } else if (0.5..=15.0).contains(&slope) {
        DrainagePattern::Moderate
    } else {
        DrainagePattern::Poor
    }
}

/// Higher ground with relief sheds water; low flat terrain pools it
fn assess_flood_risk(elevation: f64, slope: f64, roughness: f64) -> RiskLevel {
    if elevation > 500.0 && slope > 3.0 && roughness > 20.0 {
        RiskLevel::Low
    } else if elevation > 200.0 || slope > 1.0 || roughness > 15.0 {
        RiskLevel::Moderate
    } else {
        RiskLevel::High
    }
}

fn assess_erosion_risk(slope: f64) -> RiskLevel {
    if slope <= 2.0 {
        RiskLevel::Low
    } else if slope <= 8.0 {
        RiskLevel::Moderate
    } else {
        RiskLevel::High
    }
}

fn suitability_score(
    slope_avg: f64,
    drainage: DrainagePattern,
    flood: RiskLevel,
    erosion: RiskLevel,
) -> f64 {
    let mut score: f64 = 100.0;

    if slope_avg > 8.0 {
        score -= 30.0;
    } else if slope_avg > 5.0 {
        score -= 15.0;
    } else if slope_avg > 2.0 {
        score -= 5.0;
    }

    match drainage {
        DrainagePattern::Excellent => score += 10.0,
        DrainagePattern::Good => score += 5.0,
        DrainagePattern::Poor => score -= 20.0,
        DrainagePattern::Moderate => {}
    }

    match flood {
        RiskLevel::High => score -= 25.0,
        RiskLevel::Moderate => score -= 10.0,
        RiskLevel::Low => {}
    }

    match erosion {
        RiskLevel::High => score -= 20.0,
        RiskLevel::Moderate => score -= 10.0,
        RiskLevel::Low => {}
    }

    score.clamp(0.0, 100.0)
}

/// Great-circle distance between two points in meters
fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}
