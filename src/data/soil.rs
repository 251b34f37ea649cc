//! USDA Soil Data Access client
//!
//! Queries the SSURGO tabular service for a county's soil map units and
//! components, and aggregates them into a county-level soil profile with
//! fertility and suitability ratings.

use std::collections::BTreeMap;
use std::time::Duration;

use super::{County, DrainageClass, FertilityRating, PhRange, SoilData};
use crate::cache::{keys, FarmCache};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Time-to-live for soil cache entries; survey data is effectively static
const CACHE_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Limitations reported per county, after deduplication
const MAX_LIMITATIONS: usize = 5;

/// Crops reported per county
const MAX_CROPS: usize = 8;

/// Errors that can occur when fetching soil data
#[derive(Debug, Error)]
pub enum SoilError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The survey returned no rows for the county
    #[error("no soil survey rows returned for the county")]
    NoData,
}

/// Response envelope from the Soil Data Access tabular service
#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(rename = "Table", default)]
    table: Vec<SoilRow>,
}

/// One joined mapunit/component/horizon row
///
/// Every field is optional; SSURGO rows are sparse and any column can be
/// NULL for a given component.
#[derive(Debug, Clone, Deserialize)]
struct SoilRow {
    mukey: Option<String>,
    #[allow(dead_code)]
    muname: Option<String>,
    muacres: Option<f64>,
    compname: Option<String>,
    comppct_r: Option<f64>,
    ph1to1h2o_r: Option<f64>,
    om_r: Option<f64>,
    drainagecl: Option<String>,
    texdesc: Option<String>,
    resdept_r: Option<f64>,
}

/// Client for the USDA Soil Data Access service
#[derive(Debug, Clone)]
pub struct SoilClient {
    /// HTTP client for making requests
    http_client: Client,
    /// Shared response cache
    cache: FarmCache,
    /// Base URL for the service (allows override for testing)
    base_url: String,
}

impl SoilClient {
    /// Creates a new SoilClient sharing the given cache
    pub fn new(cache: FarmCache) -> Self {
        Self {
            http_client: Client::new(),
            cache,
            base_url: "https://sdmdataaccess.sc.egov.usda.gov".to_string(),
        }
    }

    /// Creates a new SoilClient with a custom base URL (for testing)
    #[cfg(test)]
    pub fn with_base_url(cache: FarmCache, base_url: String) -> Self {
        Self {
            http_client: Client::new(),
            cache,
            base_url,
        }
    }

    /// Fetches the soil profile for a county
    pub async fn fetch_soil_data(&self, county: &County) -> Result<SoilData, SoilError> {
        let cache_key = keys::soil(county.fips);
        self.cache
            .cached(&cache_key, CACHE_TTL, || self.fetch_from_api(county))
            .await
    }

    async fn fetch_from_api(&self, county: &County) -> Result<SoilData, SoilError> {
        let query = survey_query(county);
        let response = self
            .http_client
            .post(format!("{}/Tabular/post.rest", self.base_url))
            .json(&json!({ "query": query, "format": "JSON" }))
            .send()
            .await?
            .error_for_status()?
            .json::<ApiResponse>()
            .await?;

        if response.table.is_empty() {
            return Err(SoilError::NoData);
        }

        Ok(aggregate_rows(&response.table))
    }
}

/// Builds the SSURGO query for a county's major soil components
///
/// The survey area symbol is the state abbreviation plus the three-digit
/// county code, e.g. "IA169".
fn survey_query(county: &County) -> String {
    let areasymbol = format!("{}{}", county.state, county.county_code());
    format!(
        "SELECT mu.mukey, mu.muname, mu.muacres, co.compname, co.comppct_r, \
         ch.ph1to1h2o_r, ch.om_r, co.drainagecl, cht.texdesc, cr.resdept_r \
         FROM legend l \
         INNER JOIN mapunit mu ON l.lkey = mu.lkey \
         INNER JOIN component co ON mu.mukey = co.mukey \
         LEFT JOIN chorizon ch ON co.cokey = ch.cokey \
         LEFT JOIN chtexturegrp chtg ON ch.chkey = chtg.chkey \
         LEFT JOIN chtexture cht ON chtg.chtgkey = cht.chtgkey \
         LEFT JOIN corestrictions cr ON co.cokey = cr.cokey \
         WHERE l.areasymbol = '{areasymbol}' AND co.majcompflag = 'Yes' \
         ORDER BY co.comppct_r DESC"
    )
}

/// Aggregates survey rows into a county soil profile
fn aggregate_rows(rows: &[SoilRow]) -> SoilData {
    // Acreage per map unit; units with no reported acreage count as one acre
    // so they still contribute to the weighting.
    let mut acres_by_unit: BTreeMap<&str, f64> = BTreeMap::new();
    for row in rows {
        let mukey = row.mukey.as_deref().unwrap_or("unknown");
        let acres = row.muacres.filter(|a| *a > 0.0).unwrap_or(1.0);
        acres_by_unit.insert(mukey, acres);
    }
    let total_acres: f64 = acres_by_unit.values().sum();

    let mut weighted_ph = 0.0;
    let mut weighted_om = 0.0;
    let mut total_weight = 0.0;
    let mut ph_values = Vec::new();
    let mut textures = Vec::new();
    let mut drainage_classes = Vec::new();
    let mut depths = Vec::new();
    let mut limitations = Vec::new();

    for row in rows {
        if row.compname.is_none() {
            continue;
        }

        let mukey = row.mukey.as_deref().unwrap_or("unknown");
        let unit_weight = acres_by_unit[mukey] / total_acres;
        let weight = unit_weight * row.comppct_r.unwrap_or(0.0) / 100.0;

        let ph = row.ph1to1h2o_r.unwrap_or(7.0);
        let om = row.om_r.unwrap_or(2.5);
        let drainage = standardize_drainage(row.drainagecl.as_deref());
        let texture = row.texdesc.clone().unwrap_or_else(|| "loam".to_string());
        let depth = row.resdept_r.filter(|d| *d > 0.0).unwrap_or(150.0);

        weighted_ph += ph * weight;
        weighted_om += om * weight;
        total_weight += weight;
        ph_values.push(ph);
        depths.push(depth);

        for limitation in component_limitations(ph, om, depth, drainage) {
            if !limitations.contains(&limitation) {
                limitations.push(limitation);
            }
        }

        textures.push(texture);
        drainage_classes.push(drainage);
    }

    // Components with no reported percentage carry zero weight; fall back to
    // a simple mean so an all-sparse county still gets a profile.
    let (ph_avg, organic_matter_avg) = if total_weight > 0.0 {
        (weighted_ph / total_weight, weighted_om / total_weight)
    } else if !ph_values.is_empty() {
        let n = ph_values.len() as f64;
        (ph_values.iter().sum::<f64>() / n, 2.5)
    } else {
        (7.0, 2.5)
    };

    let ph_range = PhRange {
        min: ph_values.iter().copied().fold(f64::INFINITY, f64::min).min(ph_avg),
        max: ph_values.iter().copied().fold(f64::NEG_INFINITY, f64::max).max(ph_avg),
    };

    let dominant_soil_type = most_common(&textures).unwrap_or_else(|| "loam".to_string());
    let drainage_class = most_common(&drainage_classes).unwrap_or(DrainageClass::ModeratelyWellDrained);

    let depth_to_bedrock = if depths.is_empty() {
        150.0
    } else {
        depths.iter().sum::<f64>() / depths.len() as f64
    };

    let available_water_capacity = awc_from_texture(&dominant_soil_type);
    let permeability = estimate_permeability(&dominant_soil_type, drainage_class);
    let erosion_factor = erosion_factor(&dominant_soil_type, organic_matter_avg);
    let fertility_rating = assess_fertility(ph_avg, organic_matter_avg, drainage_class);
    limitations.truncate(MAX_LIMITATIONS);
    let suitable_crops = suitable_crops(ph_avg, drainage_class, &dominant_soil_type);
    let soil_suitability_score = suitability_score(
        ph_avg,
        organic_matter_avg,
        drainage_class,
        fertility_rating,
        limitations.len(),
    );

    SoilData {
        dominant_soil_type,
        ph_avg,
        ph_range,
        organic_matter_avg,
        drainage_class,
        depth_to_bedrock,
        available_water_capacity,
        permeability: permeability.to_string(),
        erosion_factor,
        fertility_rating,
        limitations,
        suitable_crops,
        soil_suitability_score,
    }
}

/// Maps free-text SSURGO drainage descriptions onto the four classes
fn standardize_drainage(raw: Option<&str>) -> DrainageClass {
    let Some(raw) = raw else {
        return DrainageClass::ModeratelyWellDrained;
    };
    let normalized = raw.to_lowercase();
    if normalized.contains("somewhat poorly") {
        DrainageClass::SomewhatPoorlyDrained
    } else if normalized.contains("poorly") {
        DrainageClass::PoorlyDrained
    } else if normalized.contains("moderately well") {
        DrainageClass::ModeratelyWellDrained
    } else if normalized.contains("well") {
        DrainageClass::WellDrained
    } else {
        DrainageClass::ModeratelyWellDrained
    }
}

fn component_limitations(ph: f64, om: f64, depth: f64, drainage: DrainageClass) -> Vec<String> {
    let mut limitations = Vec::new();
    if ph < 5.5 {
        limitations.push("High acidity".to_string());
    }
    if ph > 8.5 {
        limitations.push("High alkalinity".to_string());
    }
    if om < 1.0 {
        limitations.push("Low organic matter".to_string());
    }
    if depth < 50.0 {
        limitations.push("Shallow to bedrock".to_string());
    }
    if is_poorly_drained(drainage) {
        limitations.push("Poor drainage".to_string());
    }
    limitations
}

fn is_well_drained(drainage: DrainageClass) -> bool {
    matches!(
        drainage,
        DrainageClass::WellDrained | DrainageClass::ModeratelyWellDrained
    )
}

fn is_poorly_drained(drainage: DrainageClass) -> bool {
    matches!(
        drainage,
        DrainageClass::SomewhatPoorlyDrained | DrainageClass::PoorlyDrained
    )
}

/// Most frequent item; earlier occurrences win ties
fn most_common<T: Clone + Eq + std::hash::Hash>(items: &[T]) -> Option<T> {
    let mut counts = std::collections::HashMap::new();
    for item in items {
        *counts.entry(item).or_insert(0usize) += 1;
    }
    let mut best: Option<&T> = None;
    let mut best_count = 0;
    for item in items {
        let count = counts[&item];
        if count > best_count {
            best = Some(item);
            best_count = count;
        }
    }
    best.cloned()
}

/// Available water capacity by texture class, in cm of water per cm of soil
fn awc_from_texture(texture: &str) -> f64 {
    let normalized = texture.to_lowercase();
    // Order matters: more specific names first.
    let table = [
        ("loamy sand", 0.08),
        ("sandy loam", 0.12),
        ("sandy clay loam", 0.15),
        ("silty clay loam", 0.20),
        ("clay loam", 0.18),
        ("silt loam", 0.20),
        ("sandy clay", 0.12),
        ("silty clay", 0.15),
        ("sand", 0.05),
        ("silt", 0.18),
        ("loam", 0.18),
        ("clay", 0.10),
    ];
    for (name, awc) in table {
        if normalized.contains(name) {
            return awc;
        }
    }
    0.15
}

fn estimate_permeability(texture: &str, drainage: DrainageClass) -> &'static str {
    let normalized = texture.to_lowercase();
    if normalized.contains("sand") {
        "rapid"
    } else if normalized.contains("clay") {
        "slow"
    } else if is_well_drained(drainage) {
        "moderate"
    } else if is_poorly_drained(drainage) {
        "very slow"
    } else {
        "moderate"
    }
}

fn erosion_factor(texture: &str, organic_matter: f64) -> f64 {
    let normalized = texture.to_lowercase();
    let mut factor: f64 = 0.3;
    if normalized.contains("sand") {
        factor += 0.2;
    }
    if normalized.contains("clay") {
        factor -= 0.1;
    }
    if organic_matter > 3.0 {
        factor -= 0.1;
    }
    if organic_matter < 2.0 {
        factor += 0.1;
    }
    factor.clamp(0.1, 0.8)
}

/// Scores pH, organic matter, and drainage on a shared point scale
fn assess_fertility(ph: f64, organic_matter: f64, drainage: DrainageClass) -> FertilityRating {
    let mut points = 0;

    if (6.0..=7.5).contains(&ph) {
        points += 3;
    } else if (5.5..=8.0).contains(&ph) {
        points += 2;
    } else if (5.0..=8.5).contains(&ph) {
        points += 1;
    }

    if organic_matter >= 4.0 {
        points += 3;
    } else if organic_matter >= 2.5 {
        points += 2;
    } else if organic_matter >= 1.5 {
        points += 1;
    }

    if is_well_drained(drainage) {
        points += 2;
    } else if drainage == DrainageClass::SomewhatPoorlyDrained {
        points += 1;
    }

    if points >= 7 {
        FertilityRating::Excellent
    } else if points >= 5 {
        FertilityRating::Good
    } else if points >= 3 {
        FertilityRating::Fair
    } else {
        FertilityRating::Poor
    }
}

fn suitable_crops(ph: f64, drainage: DrainageClass, texture: &str) -> Vec<String> {
    let normalized = texture.to_lowercase();
    let mut crops = vec!["Corn".to_string(), "Soybeans".to_string()];
    let push = |crop: &str, crops: &mut Vec<String>| {
        if !crops.iter().any(|c| c == crop) {
            crops.push(crop.to_string());
        }
    };

    if (6.0..=7.5).contains(&ph) {
        push("Wheat", &mut crops);
        push("Alfalfa", &mut crops);
        push("Vegetables", &mut crops);
    }
    if ph < 6.5 {
        push("Blueberries", &mut crops);
        push("Potatoes", &mut crops);
    }
    if is_well_drained(drainage) {
        push("Cotton", &mut crops);
        push("Tobacco", &mut crops);
        push("Tree fruits", &mut crops);
    }
    if is_poorly_drained(drainage) {
        push("Rice", &mut crops);
        push("Cranberries", &mut crops);
    }
    if normalized.contains("sand") {
        push("Peanuts", &mut crops);
        push("Sweet potatoes", &mut crops);
    }
    if normalized.contains("clay") {
        push("Cotton", &mut crops);
        push("Sugarcane", &mut crops);
    }

    crops.truncate(MAX_CROPS);
    crops
}

fn suitability_score(
    ph: f64,
    organic_matter: f64,
    drainage: DrainageClass,
    fertility: FertilityRating,
    limitation_count: usize,
) -> f64 {
    let mut score: f64 = 100.0;

    if !(5.5..=8.0).contains(&ph) {
        score -= 20.0;
    } else if !(6.0..=7.5).contains(&ph) {
        score -= 10.0;
    }

    if organic_matter >= 4.0 {
        score += 10.0;
    } else if organic_matter < 2.0 {
        score -= 15.0;
    }

    match drainage {
        DrainageClass::PoorlyDrained => score -= 25.0,
        DrainageClass::SomewhatPoorlyDrained => score -= 10.0,
        _ => {}
    }

    match fertility {
        FertilityRating::Excellent => score += 15.0,
        FertilityRating::Good => score += 5.0,
        FertilityRating::Poor => score -= 20.0,
        FertilityRating::Fair => {}
    }

    score -= limitation_count as f64 * 5.0;

    score.clamp(0.0, 100.0)
}
