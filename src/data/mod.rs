//! Core data models for farmscope
//!
//! This module contains all the data types used throughout the application
//! for representing county agricultural, climate, terrain, soil, and water
//! quality information, plus the source adapters that fetch them.

pub mod agricultural;
pub mod climate;
pub mod county;
pub mod soil;
pub mod terrain;
pub mod water_quality;

pub use agricultural::{AgriculturalClient, AgriculturalError};
pub use climate::{ClimateClient, ClimateError};
pub use county::{all_counties, get_county_by_fips, County};
pub use soil::{SoilClient, SoilError};
pub use terrain::{TerrainClient, TerrainError};
pub use water_quality::{WaterQualityClient, WaterQualityError};

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// County identity attached to every comprehensive record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountyInfo {
    /// Five-digit FIPS code
    pub fips: String,
    /// County name
    pub name: String,
    /// Two-letter state abbreviation
    pub state: String,
    /// When the comprehensive record was assembled
    pub last_updated: DateTime<Utc>,
}

/// A single commodity statistic from the agricultural census
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommodityStat {
    /// Commodity description, e.g. "CORN"
    pub commodity: String,
    /// Statistic category, e.g. "AREA HARVESTED"
    pub category: String,
    /// Unit of measure, e.g. "ACRES"
    pub unit: String,
    /// Reported value; `None` when withheld to avoid disclosure
    pub value: Option<f64>,
    /// Census year the statistic covers
    pub year: i32,
}

/// Agricultural census statistics for a county
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgriculturalData {
    /// Crop production statistics
    pub crops: Vec<CommodityStat>,
    /// Livestock statistics
    pub livestock: Vec<CommodityStat>,
    /// Economic statistics (sales, operations, land values)
    pub economics: Vec<CommodityStat>,
    /// Census year the statistics cover
    pub data_year: i32,
}

impl AgriculturalData {
    /// A record with no statistics, used when the source is unavailable
    pub fn empty() -> Self {
        Self {
            crops: Vec::new(),
            livestock: Vec::new(),
            economics: Vec::new(),
            data_year: 0,
        }
    }
}

/// One day of observed weather
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyWeather {
    /// Observation date
    pub date: NaiveDate,
    /// Daily maximum temperature in Celsius
    pub temperature_max: Option<f64>,
    /// Daily minimum temperature in Celsius
    pub temperature_min: Option<f64>,
    /// Daily mean temperature in Celsius, when both extremes are known
    pub temperature_avg: Option<f64>,
    /// Daily precipitation in millimeters
    pub precipitation: Option<f64>,
    /// Growing degree days accumulated this day (base 10C)
    pub growing_degree_days: f64,
    /// Whether the minimum temperature reached freezing
    pub frost_day: bool,
}

/// Thirty-year monthly climate normal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyNormal {
    /// Month number (1-12)
    pub month: u32,
    /// Average daily maximum temperature in Celsius
    pub temperature_max_avg: f64,
    /// Average daily minimum temperature in Celsius
    pub temperature_min_avg: f64,
    /// Average monthly precipitation in millimeters
    pub precipitation_avg: f64,
    /// USDA plant hardiness zone estimate, e.g. "5b"
    pub hardiness_zone: String,
}

/// Growing-season summary derived from the historical record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrowingSeason {
    /// First fall frost (min temperature at or below 0C in Jul-Dec)
    pub first_frost: Option<NaiveDate>,
    /// Last spring frost (min temperature at or below 0C in Jan-Jun)
    pub last_frost: Option<NaiveDate>,
    /// Days between last spring frost and first fall frost
    pub growing_season_length: u32,
    /// Season total growing degree days (base 10C)
    pub growing_degree_days: f64,
    /// Count of observed days without frost
    pub frost_free_days: u32,
}

/// Climate record combining observations, normals, and derived season data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClimateData {
    /// Recent daily observations
    pub historical: Vec<DailyWeather>,
    /// Monthly climate normals
    pub normals: Vec<MonthlyNormal>,
    /// Derived growing-season summary
    pub growing_season: GrowingSeason,
}

impl ClimateData {
    /// A record with conservative season defaults, used when the source is
    /// unavailable
    pub fn empty() -> Self {
        Self {
            historical: Vec::new(),
            normals: Vec::new(),
            growing_season: GrowingSeason {
                first_frost: None,
                last_frost: None,
                growing_season_length: 180,
                growing_degree_days: 2000.0,
                frost_free_days: 200,
            },
        }
    }
}

/// Slope steepness categories derived from average grade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlopeCategory {
    Flat,
    Gentle,
    Moderate,
    Steep,
    VerySteep,
}

/// Natural surface drainage inferred from slope and roughness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainagePattern {
    Excellent,
    Good,
    Moderate,
    Poor,
}

/// Three-level risk scale used for flood and erosion risk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

/// Terrain characteristics derived from an elevation grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainData {
    /// Minimum elevation in meters
    pub elevation_min: f64,
    /// Maximum elevation in meters
    pub elevation_max: f64,
    /// Mean elevation in meters
    pub elevation_avg: f64,
    /// Average slope as a percentage grade
    pub slope_avg: f64,
    /// Slope category
    pub slope_category: SlopeCategory,
    /// Surface roughness (standard deviation of elevations)
    pub terrain_roughness: f64,
    /// Inferred natural drainage
    pub drainage_pattern: DrainagePattern,
    /// Flood risk level
    pub flood_risk: RiskLevel,
    /// Erosion risk level
    pub erosion_risk: RiskLevel,
    /// Terrain suitability for farming, 0-100
    pub farm_suitability_score: f64,
}

impl TerrainData {
    /// A neutral record, used when the source is unavailable
    pub fn empty() -> Self {
        Self {
            elevation_min: 0.0,
            elevation_max: 100.0,
            elevation_avg: 50.0,
            slope_avg: 2.0,
            slope_category: SlopeCategory::Gentle,
            terrain_roughness: 20.0,
            drainage_pattern: DrainagePattern::Good,
            flood_risk: RiskLevel::Moderate,
            erosion_risk: RiskLevel::Low,
            farm_suitability_score: 70.0,
        }
    }
}

impl fmt::Display for SlopeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SlopeCategory::Flat => "flat",
            SlopeCategory::Gentle => "gentle",
            SlopeCategory::Moderate => "moderate",
            SlopeCategory::Steep => "steep",
            SlopeCategory::VerySteep => "very steep",
        };
        write!(f, "{label}")
    }
}

impl fmt::Display for DrainagePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DrainagePattern::Excellent => "excellent",
            DrainagePattern::Good => "good",
            DrainagePattern::Moderate => "moderate",
            DrainagePattern::Poor => "poor",
        };
        write!(f, "{label}")
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::High => "high",
        };
        write!(f, "{label}")
    }
}

/// USDA soil survey drainage classes, coarsened to four levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainageClass {
    WellDrained,
    ModeratelyWellDrained,
    SomewhatPoorlyDrained,
    PoorlyDrained,
}

/// Composite fertility rating from pH, organic matter, and drainage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FertilityRating {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl fmt::Display for DrainageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DrainageClass::WellDrained => "well drained",
            DrainageClass::ModeratelyWellDrained => "moderately well drained",
            DrainageClass::SomewhatPoorlyDrained => "somewhat poorly drained",
            DrainageClass::PoorlyDrained => "poorly drained",
        };
        write!(f, "{label}")
    }
}

impl fmt::Display for FertilityRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FertilityRating::Excellent => "excellent",
            FertilityRating::Good => "good",
            FertilityRating::Fair => "fair",
            FertilityRating::Poor => "poor",
        };
        write!(f, "{label}")
    }
}

/// Inclusive pH range observed across soil components
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PhRange {
    pub min: f64,
    pub max: f64,
}

/// Soil characteristics aggregated over a county's map units
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoilData {
    /// Dominant surface texture, e.g. "silty clay loam"
    pub dominant_soil_type: String,
    /// Acreage-weighted average pH
    pub ph_avg: f64,
    /// Observed pH range across components
    pub ph_range: PhRange,
    /// Acreage-weighted average organic matter percentage
    pub organic_matter_avg: f64,
    /// Dominant drainage class
    pub drainage_class: DrainageClass,
    /// Typical depth to a restrictive layer in centimeters
    pub depth_to_bedrock: f64,
    /// Available water capacity in cm of water per cm of soil
    pub available_water_capacity: f64,
    /// Qualitative permeability, e.g. "moderate"
    pub permeability: String,
    /// Soil erodibility factor estimate
    pub erosion_factor: f64,
    /// Composite fertility rating
    pub fertility_rating: FertilityRating,
    /// Notable agronomic limitations, at most five
    pub limitations: Vec<String>,
    /// Crops this soil suits
    pub suitable_crops: Vec<String>,
    /// Soil suitability for farming, 0-100
    pub soil_suitability_score: f64,
}

impl SoilData {
    /// A typical-loam record, used when the source is unavailable
    pub fn empty() -> Self {
        Self {
            dominant_soil_type: "loam".to_string(),
            ph_avg: 6.5,
            ph_range: PhRange { min: 6.0, max: 7.0 },
            organic_matter_avg: 3.0,
            drainage_class: DrainageClass::ModeratelyWellDrained,
            depth_to_bedrock: 150.0,
            available_water_capacity: 0.15,
            permeability: "moderate".to_string(),
            erosion_factor: 0.3,
            fertility_rating: FertilityRating::Good,
            limitations: Vec::new(),
            suitable_crops: vec![
                "Corn".to_string(),
                "Soybeans".to_string(),
                "Wheat".to_string(),
            ],
            soil_suitability_score: 75.0,
        }
    }
}

/// Overall surface water condition rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaterRating {
    Good,
    Fair,
    Poor,
    Unknown,
}

/// Whether surface water is safe to draw for irrigation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrrigationSafety {
    Safe,
    Moderate,
    HighRisk,
    Unknown,
}

impl fmt::Display for WaterRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WaterRating::Good => "good",
            WaterRating::Fair => "fair",
            WaterRating::Poor => "poor",
            WaterRating::Unknown => "unknown",
        };
        write!(f, "{label}")
    }
}

impl fmt::Display for IrrigationSafety {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            IrrigationSafety::Safe => "safe",
            IrrigationSafety::Moderate => "moderate",
            IrrigationSafety::HighRisk => "high risk",
            IrrigationSafety::Unknown => "unknown",
        };
        write!(f, "{label}")
    }
}

/// Surface water quality summary from state assessments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterQualityData {
    /// Number of assessed water bodies
    pub assessed_water_bodies: u32,
    /// Number of impaired water bodies
    pub impaired_water_bodies: u32,
    /// Most frequently reported pollutants, at most five
    pub major_pollutants: Vec<String>,
    /// Overall water condition rating
    pub overall_rating: WaterRating,
    /// Names of impaired water bodies
    pub impaired_uses: Vec<String>,
    /// Water suitability for farming, 0-1
    pub water_suitability_score: f64,
    /// Irrigation safety assessment
    pub irrigation_suitability: IrrigationSafety,
}

impl WaterQualityData {
    /// A record with no assessments, used when the source is unavailable
    pub fn empty() -> Self {
        Self {
            assessed_water_bodies: 0,
            impaired_water_bodies: 0,
            major_pollutants: Vec::new(),
            overall_rating: WaterRating::Unknown,
            impaired_uses: Vec::new(),
            water_suitability_score: 0.5,
            irrigation_suitability: IrrigationSafety::Unknown,
        }
    }
}

/// Letter grade assigned to the overall suitability score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    /// Assigns a letter grade from an unrounded 0-100 score
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Grade::A
        } else if score >= 80.0 {
            Grade::B
        } else if score >= 70.0 {
            Grade::C
        } else if score >= 60.0 {
            Grade::D
        } else {
            Grade::F
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        };
        write!(f, "{letter}")
    }
}

/// Per-source outcome of a fetch pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Pending,
    Success,
    Cached,
    Error,
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SourceStatus::Pending => "pending",
            SourceStatus::Success => "success",
            SourceStatus::Cached => "cached",
            SourceStatus::Error => "error",
        };
        write!(f, "{label}")
    }
}

/// Overall outcome of a fetch pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Pending,
    Success,
    Error,
}

/// Status for each source plus the overall verdict
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FetchStatus {
    pub agricultural: SourceStatus,
    pub climate: SourceStatus,
    pub terrain: SourceStatus,
    pub soil: SourceStatus,
    pub water: SourceStatus,
    pub overall: OverallStatus,
}

impl FetchStatus {
    pub fn pending() -> Self {
        Self {
            agricultural: SourceStatus::Pending,
            climate: SourceStatus::Pending,
            terrain: SourceStatus::Pending,
            soil: SourceStatus::Pending,
            water: SourceStatus::Pending,
            overall: OverallStatus::Pending,
        }
    }

    /// Status reported when the comprehensive record came straight from cache
    pub fn all_cached() -> Self {
        Self {
            agricultural: SourceStatus::Cached,
            climate: SourceStatus::Cached,
            terrain: SourceStatus::Cached,
            soil: SourceStatus::Cached,
            water: SourceStatus::Cached,
            overall: OverallStatus::Success,
        }
    }
}

/// Narrative analysis derived from the assembled data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarmAnalysis {
    /// Overall suitability score, 0-100
    pub overall_score: u8,
    /// Letter grade for the overall score
    pub grade: Grade,
    /// Notable advantages, at most five
    pub strengths: Vec<String>,
    /// Notable constraints, at most five
    pub limitations: Vec<String>,
    /// Crops recommended for the county, at most six
    pub recommended_crops: Vec<String>,
    /// Identified risks, at most four
    pub risk_factors: Vec<String>,
    /// Management recommendations, at most five
    pub recommendations: Vec<String>,
}

/// Everything known about a county, assembled from all five sources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComprehensiveCountyData {
    /// County identity
    pub county: CountyInfo,
    /// Agricultural census statistics
    pub agricultural: AgriculturalData,
    /// Climate observations and normals
    pub climate: ClimateData,
    /// Terrain characteristics
    pub terrain: TerrainData,
    /// Soil characteristics
    pub soil: SoilData,
    /// Surface water quality
    pub water_quality: WaterQualityData,
    /// Narrative analysis
    pub analysis: FarmAnalysis,
}
