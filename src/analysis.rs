//! Farm suitability analysis
//!
//! Turns whatever subset of source data is available into a scored,
//! graded narrative. Sources that failed to fetch are simply absent; the
//! analysis works from what it has and falls back to a neutral 70 when
//! nothing scored at all.

use crate::data::{
    AgriculturalData, ClimateData, DrainagePattern, FarmAnalysis, FertilityRating, Grade,
    IrrigationSafety, RiskLevel, SlopeCategory, SoilData, TerrainData, WaterQualityData,
    WaterRating,
};

/// Score used when no source contributed a sub-score
const NEUTRAL_SCORE: f64 = 70.0;

const MAX_STRENGTHS: usize = 5;
const MAX_LIMITATIONS: usize = 5;
const MAX_CROPS: usize = 6;
const MAX_RISK_FACTORS: usize = 4;
const MAX_RECOMMENDATIONS: usize = 5;

/// Builds the farm analysis from the available source data
///
/// The overall score is the mean of the sub-scores of the sources that
/// produced one (terrain, soil, water). Agricultural census data feeds no
/// score today but is accepted so the signature covers every source.
pub fn analyze(
    terrain: Option<&TerrainData>,
    soil: Option<&SoilData>,
    climate: Option<&ClimateData>,
    _agricultural: Option<&AgriculturalData>,
    water: Option<&WaterQualityData>,
) -> FarmAnalysis {
    let mut scores = Vec::new();
    let mut strengths = Vec::new();
    let mut limitations = Vec::new();
    let mut risk_factors = Vec::new();
    let mut recommendations = Vec::new();
    let mut recommended_crops = Vec::new();

    if let Some(terrain) = terrain {
        scores.push(terrain.farm_suitability_score);

        match terrain.slope_category {
            SlopeCategory::Flat | SlopeCategory::Gentle => {
                strengths.push("Excellent topography for farming".to_string());
            }
            SlopeCategory::Steep | SlopeCategory::VerySteep => {
                limitations.push("Challenging terrain with steep slopes".to_string());
                risk_factors.push("Erosion risk from steep slopes".to_string());
            }
            SlopeCategory::Moderate => {}
        }

        match terrain.drainage_pattern {
            DrainagePattern::Excellent | DrainagePattern::Good => {
                strengths.push("Good natural drainage".to_string());
            }
            DrainagePattern::Poor => {
                limitations.push("Poor natural drainage".to_string());
                risk_factors.push("Potential flooding issues".to_string());
            }
            DrainagePattern::Moderate => {}
        }

        if terrain.flood_risk == RiskLevel::High {
            risk_factors.push("High flood risk".to_string());
            recommendations
                .push("Consider flood-resistant crops and drainage improvements".to_string());
        }
    }

    if let Some(soil) = soil {
        scores.push(soil.soil_suitability_score);

        match soil.fertility_rating {
            FertilityRating::Excellent => strengths.push("excellent soil fertility".to_string()),
            FertilityRating::Good => strengths.push("good soil fertility".to_string()),
            FertilityRating::Poor => {
                limitations.push("Poor soil fertility".to_string());
                recommendations.push("Soil improvement and fertilization needed".to_string());
            }
            FertilityRating::Fair => {}
        }

        if (6.0..=7.5).contains(&soil.ph_avg) {
            strengths.push("Optimal soil pH for most crops".to_string());
        } else if soil.ph_avg < 5.5 {
            limitations.push("Acidic soil conditions".to_string());
            recommendations.push("Consider soil pH adjustment with lime".to_string());
        } else if soil.ph_avg > 8.0 {
            limitations.push("Alkaline soil conditions".to_string());
            recommendations
                .push("Consider soil pH adjustment or alkali-tolerant crops".to_string());
        }

        if soil.organic_matter_avg >= 3.0 {
            strengths.push("Good organic matter content".to_string());
        } else if soil.organic_matter_avg < 2.0 {
            limitations.push("Low organic matter".to_string());
            recommendations
                .push("Increase organic matter through cover crops and compost".to_string());
        }

        if !soil.suitable_crops.is_empty() {
            recommended_crops = soil.suitable_crops.clone();
        }

        limitations.extend(soil.limitations.iter().take(3).cloned());
    }

    if let Some(climate) = climate {
        let season = &climate.growing_season;
        if season.growing_season_length >= 180 {
            strengths.push("Long growing season".to_string());
        } else if season.growing_season_length < 120 {
            limitations.push("Short growing season".to_string());
            risk_factors.push("Frost risk limits crop options".to_string());
        }

        if season.growing_degree_days >= 2000.0 {
            strengths.push("Adequate heat units for warm-season crops".to_string());
        } else if season.growing_degree_days < 1500.0 {
            limitations.push("Limited heat units for warm-season crops".to_string());
            recommendations.push("Focus on cool-season crops".to_string());
        }

        if !climate.normals.is_empty() {
            let annual_precip: f64 = climate.normals.iter().map(|m| m.precipitation_avg).sum();
            if annual_precip >= 500.0 {
                strengths.push("Adequate precipitation".to_string());
            } else if annual_precip < 300.0 {
                limitations.push("Low precipitation".to_string());
                risk_factors.push("Drought risk".to_string());
                recommendations
                    .push("Consider drought-tolerant crops and irrigation".to_string());
            }
        }
    }

    if let Some(water) = water {
        scores.push(water.water_suitability_score * 100.0);

        match water.overall_rating {
            WaterRating::Good => {
                strengths.push("Excellent water quality for irrigation".to_string());
            }
            WaterRating::Fair => strengths.push("Adequate water quality".to_string()),
            WaterRating::Poor => {
                limitations.push("Poor water quality".to_string());
                risk_factors.push("Water contamination risk".to_string());
                recommendations.push("Consider water treatment for irrigation".to_string());
            }
            WaterRating::Unknown => {}
        }

        match water.irrigation_suitability {
            IrrigationSafety::HighRisk => {
                risk_factors.push("High irrigation water contamination risk".to_string());
                recommendations.push("Avoid direct irrigation of food crops".to_string());
            }
            IrrigationSafety::Moderate => {
                recommendations.push("Monitor irrigation water quality regularly".to_string());
            }
            IrrigationSafety::Safe | IrrigationSafety::Unknown => {}
        }

        if !water.major_pollutants.is_empty() {
            let pollutants = water
                .major_pollutants
                .iter()
                .take(3)
                .cloned()
                .collect::<Vec<_>>()
                .join(", ");
            limitations.push(format!("Water pollution concerns: {pollutants}"));
        }

        if f64::from(water.impaired_water_bodies)
            > f64::from(water.assessed_water_bodies) * 0.5
        {
            risk_factors.push("High percentage of impaired water bodies in area".to_string());
        }
    }

    let overall = if scores.is_empty() {
        NEUTRAL_SCORE
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    };

    // Grade from the unrounded score, so 89.6 stays a B.
    let grade = Grade::from_score(overall);

    if recommended_crops.is_empty() {
        recommended_crops = vec![
            "Corn".to_string(),
            "Soybeans".to_string(),
            "Wheat".to_string(),
        ];
    }

    if recommendations.is_empty() {
        recommendations = vec![
            "Regular soil testing".to_string(),
            "Integrated pest management".to_string(),
            "Conservation practices".to_string(),
        ];
    }

    strengths.truncate(MAX_STRENGTHS);
    limitations.truncate(MAX_LIMITATIONS);
    recommended_crops.truncate(MAX_CROPS);
    risk_factors.truncate(MAX_RISK_FACTORS);
    recommendations.truncate(MAX_RECOMMENDATIONS);

    FarmAnalysis {
        overall_score: overall.round() as u8,
        grade,
        strengths,
        limitations,
        recommended_crops,
        risk_factors,
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DrainageClass, GrowingSeason, MonthlyNormal, PhRange};

    fn strong_terrain() -> TerrainData {
        TerrainData {
            farm_suitability_score: 82.0,
            ..TerrainData::empty()
        }
    }

    fn strong_soil() -> SoilData {
        SoilData {
            soil_suitability_score: 75.0,
            ..SoilData::empty()
        }
    }

    fn good_water() -> WaterQualityData {
        WaterQualityData {
            assessed_water_bodies: 10,
            impaired_water_bodies: 1,
            overall_rating: WaterRating::Good,
            water_suitability_score: 0.9,
            irrigation_suitability: IrrigationSafety::Safe,
            ..WaterQualityData::empty()
        }
    }

    #[test]
    fn test_overall_score_is_mean_of_available_sub_scores() {
        let terrain = strong_terrain();
        let soil = strong_soil();
        let water = good_water();

        let analysis = analyze(Some(&terrain), Some(&soil), None, None, Some(&water));
        // mean(82, 75, 90) = 82.33, rounds to 82, grades B.
        assert_eq!(analysis.overall_score, 82);
        assert_eq!(analysis.grade, Grade::B);
    }

    #[test]
    fn test_no_sources_scores_neutral() {
        let analysis = analyze(None, None, None, None, None);
        assert_eq!(analysis.overall_score, 70);
        assert_eq!(analysis.grade, Grade::C);
        assert_eq!(analysis.recommended_crops, vec!["Corn", "Soybeans", "Wheat"]);
        assert_eq!(
            analysis.recommendations,
            vec![
                "Regular soil testing",
                "Integrated pest management",
                "Conservation practices"
            ]
        );
        assert!(analysis.strengths.is_empty());
        assert!(analysis.risk_factors.is_empty());
    }

    #[test]
    fn test_grade_computed_before_rounding() {
        // Sub-scores averaging 89.6 must grade B even though the displayed
        // score rounds to 90.
        let terrain = TerrainData {
            farm_suitability_score: 89.6,
            ..TerrainData::empty()
        };

        let analysis = analyze(Some(&terrain), None, None, None, None);
        assert_eq!(analysis.overall_score, 90);
        assert_eq!(analysis.grade, Grade::B);
    }

    #[test]
    fn test_terrain_findings() {
        let terrain = TerrainData {
            slope_category: SlopeCategory::Steep,
            drainage_pattern: DrainagePattern::Poor,
            flood_risk: RiskLevel::High,
            ..TerrainData::empty()
        };

        let analysis = analyze(Some(&terrain), None, None, None, None);
        assert!(analysis
            .limitations
            .contains(&"Challenging terrain with steep slopes".to_string()));
        assert!(analysis
            .risk_factors
            .contains(&"Erosion risk from steep slopes".to_string()));
        assert!(analysis.limitations.contains(&"Poor natural drainage".to_string()));
        assert!(analysis.risk_factors.contains(&"High flood risk".to_string()));
        assert!(analysis
            .recommendations
            .contains(&"Consider flood-resistant crops and drainage improvements".to_string()));
    }

    #[test]
    fn test_soil_findings_and_crops() {
        let soil = SoilData {
            ph_avg: 5.2,
            ph_range: PhRange { min: 4.8, max: 5.8 },
            organic_matter_avg: 1.5,
            drainage_class: DrainageClass::PoorlyDrained,
            fertility_rating: FertilityRating::Poor,
            limitations: vec![
                "High acidity".to_string(),
                "Low organic matter".to_string(),
                "Poor drainage".to_string(),
                "Shallow to bedrock".to_string(),
            ],
            suitable_crops: vec!["Rice".to_string(), "Cranberries".to_string()],
            soil_suitability_score: 30.0,
            ..SoilData::empty()
        };

        let analysis = analyze(None, Some(&soil), None, None, None);
        assert!(analysis.limitations.contains(&"Poor soil fertility".to_string()));
        assert!(analysis.limitations.contains(&"Acidic soil conditions".to_string()));
        assert!(analysis.limitations.contains(&"Low organic matter".to_string()));
        assert!(analysis
            .recommendations
            .contains(&"Consider soil pH adjustment with lime".to_string()));
        assert_eq!(analysis.recommended_crops, vec!["Rice", "Cranberries"]);
        // Soil-reported limitations beyond three are dropped, and the list
        // caps at five overall.
        assert!(analysis.limitations.len() <= 5);
        assert_eq!(analysis.grade, Grade::F);
    }

    #[test]
    fn test_climate_findings() {
        let mut climate = ClimateData::empty();
        climate.growing_season = GrowingSeason {
            first_frost: None,
            last_frost: None,
            growing_season_length: 100,
            growing_degree_days: 1200.0,
            frost_free_days: 150,
        };
        climate.normals = (1..=12)
            .map(|month| MonthlyNormal {
                month,
                temperature_max_avg: 15.0,
                temperature_min_avg: 2.0,
                precipitation_avg: 20.0,
                hardiness_zone: "5a".to_string(),
            })
            .collect();

        let analysis = analyze(None, None, Some(&climate), None, None);
        assert!(analysis.limitations.contains(&"Short growing season".to_string()));
        assert!(analysis
            .risk_factors
            .contains(&"Frost risk limits crop options".to_string()));
        assert!(analysis
            .limitations
            .contains(&"Limited heat units for warm-season crops".to_string()));
        // 12 * 20mm = 240mm annual: drought territory.
        assert!(analysis.limitations.contains(&"Low precipitation".to_string()));
        assert!(analysis.risk_factors.contains(&"Drought risk".to_string()));
        // Climate contributes no sub-score, so the overall stays neutral.
        assert_eq!(analysis.overall_score, 70);
    }

    #[test]
    fn test_water_findings() {
        let water = WaterQualityData {
            assessed_water_bodies: 10,
            impaired_water_bodies: 6,
            major_pollutants: vec![
                "Nitrates".to_string(),
                "E. coli".to_string(),
                "Sediment".to_string(),
                "Mercury".to_string(),
            ],
            overall_rating: WaterRating::Poor,
            impaired_uses: Vec::new(),
            water_suitability_score: 0.3,
            irrigation_suitability: IrrigationSafety::HighRisk,
        };

        let analysis = analyze(None, None, None, None, Some(&water));
        assert!(analysis.limitations.contains(&"Poor water quality".to_string()));
        assert!(analysis
            .limitations
            .contains(&"Water pollution concerns: Nitrates, E. coli, Sediment".to_string()));
        assert!(analysis
            .risk_factors
            .contains(&"High irrigation water contamination risk".to_string()));
        assert!(analysis
            .risk_factors
            .contains(&"High percentage of impaired water bodies in area".to_string()));
        // Water alone: score 0.3 * 100 = 30.
        assert_eq!(analysis.overall_score, 30);
        assert_eq!(analysis.grade, Grade::F);
    }

    #[test]
    fn test_output_caps() {
        // Pile on findings from every source and verify the caps hold.
        let terrain = TerrainData {
            slope_category: SlopeCategory::VerySteep,
            drainage_pattern: DrainagePattern::Poor,
            flood_risk: RiskLevel::High,
            ..TerrainData::empty()
        };
        let soil = SoilData {
            ph_avg: 4.5,
            organic_matter_avg: 1.0,
            fertility_rating: FertilityRating::Poor,
            limitations: vec![
                "High acidity".to_string(),
                "Low organic matter".to_string(),
                "Poor drainage".to_string(),
            ],
            ..SoilData::empty()
        };
        let water = WaterQualityData {
            assessed_water_bodies: 4,
            impaired_water_bodies: 4,
            major_pollutants: vec!["Nitrates".to_string()],
            overall_rating: WaterRating::Poor,
            impaired_uses: Vec::new(),
            water_suitability_score: 0.3,
            irrigation_suitability: IrrigationSafety::HighRisk,
        };
        let climate = ClimateData::empty();

        let analysis = analyze(Some(&terrain), Some(&soil), Some(&climate), None, Some(&water));
        assert!(analysis.strengths.len() <= 5);
        assert!(analysis.limitations.len() <= 5);
        assert!(analysis.recommended_crops.len() <= 6);
        assert!(analysis.risk_factors.len() <= 4);
        assert!(analysis.recommendations.len() <= 5);
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let terrain = strong_terrain();
        let soil = strong_soil();

        let a = analyze(Some(&terrain), Some(&soil), None, None, None);
        let b = analyze(Some(&terrain), Some(&soil), None, None, None);
        assert_eq!(a.overall_score, b.overall_score);
        assert_eq!(a.strengths, b.strengths);
        assert_eq!(a.recommendations, b.recommendations);
    }
}
