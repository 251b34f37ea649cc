//! Static county reference data
//!
//! This module contains the static list of supported counties with their
//! FIPS codes and centroid coordinates.

use serde::Serialize;

/// A county with known coordinates
///
/// Uses `&'static str` for string fields to allow static initialization
/// of the COUNTIES array.
///
/// Note: This struct only implements `Serialize` (not `Deserialize`) because
/// the static string references cannot be safely deserialized. Use
/// `get_county_by_fips` to look up counties from deserialized FIPS codes.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct County {
    /// Five-digit FIPS code (state + county)
    pub fips: &'static str,
    /// County name
    pub name: &'static str,
    /// Two-letter state abbreviation
    pub state: &'static str,
    /// Centroid latitude
    pub latitude: f64,
    /// Centroid longitude
    pub longitude: f64,
}

/// Static array of supported counties
///
/// Weighted toward agricultural counties in the corn belt, with a few
/// non-agricultural metro counties for contrast.
pub static COUNTIES: [County; 12] = [
    County {
        fips: "19169",
        name: "Story County",
        state: "IA",
        latitude: 42.0362,
        longitude: -93.4650,
    },
    County {
        fips: "19153",
        name: "Polk County",
        state: "IA",
        latitude: 41.6853,
        longitude: -93.5734,
    },
    County {
        fips: "17019",
        name: "Champaign County",
        state: "IL",
        latitude: 40.1398,
        longitude: -88.1962,
    },
    County {
        fips: "31109",
        name: "Lancaster County",
        state: "NE",
        latitude: 40.7840,
        longitude: -96.6887,
    },
    County {
        fips: "20177",
        name: "Shawnee County",
        state: "KS",
        latitude: 39.0417,
        longitude: -95.7565,
    },
    County {
        fips: "55025",
        name: "Dane County",
        state: "WI",
        latitude: 43.0674,
        longitude: -89.4181,
    },
    County {
        fips: "38017",
        name: "Cass County",
        state: "ND",
        latitude: 46.9335,
        longitude: -97.2480,
    },
    County {
        fips: "48001",
        name: "Anderson County",
        state: "TX",
        latitude: 31.8133,
        longitude: -95.6527,
    },
    County {
        fips: "27013",
        name: "Blue Earth County",
        state: "MN",
        latitude: 44.0340,
        longitude: -94.0672,
    },
    County {
        fips: "29019",
        name: "Boone County",
        state: "MO",
        latitude: 38.9906,
        longitude: -92.3095,
    },
    County {
        fips: "06037",
        name: "Los Angeles County",
        state: "CA",
        latitude: 34.1964,
        longitude: -118.2619,
    },
    County {
        fips: "36061",
        name: "New York County",
        state: "NY",
        latitude: 40.7830,
        longitude: -73.9712,
    },
];

/// Get a county by its five-digit FIPS code
///
/// # Arguments
///
/// * `fips` - The five-digit FIPS code (e.g., "19169")
///
/// # Returns
///
/// Returns `Some(&County)` if found, `None` otherwise
pub fn get_county_by_fips(fips: &str) -> Option<&'static County> {
    COUNTIES.iter().find(|county| county.fips == fips)
}

/// Get all supported counties
pub fn all_counties() -> &'static [County] {
    &COUNTIES
}

impl County {
    /// The three-digit county portion of the FIPS code
    pub fn county_code(&self) -> &'static str {
        &self.fips[2..]
    }

    /// The two-digit state portion of the FIPS code
    pub fn state_code(&self) -> &'static str {
        &self.fips[..2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counties_array_has_12_entries() {
        assert_eq!(COUNTIES.len(), 12);
        assert_eq!(all_counties().len(), 12);
    }

    #[test]
    fn test_get_county_by_fips_returns_correct_county() {
        let county = get_county_by_fips("19169");
        assert!(county.is_some());
        let county = county.unwrap();
        assert_eq!(county.name, "Story County");
        assert_eq!(county.state, "IA");
        assert!((county.latitude - 42.0362).abs() < 0.0001);
        assert!((county.longitude - (-93.4650)).abs() < 0.0001);
    }

    #[test]
    fn test_get_county_by_fips_returns_none_for_unknown_code() {
        assert!(get_county_by_fips("99999").is_none());
        assert!(get_county_by_fips("").is_none());
        assert!(get_county_by_fips("1916").is_none());
    }

    #[test]
    fn test_all_counties_have_unique_fips() {
        let mut codes: Vec<&str> = all_counties().iter().map(|c| c.fips).collect();
        codes.sort();
        let original_len = codes.len();
        codes.dedup();
        assert_eq!(codes.len(), original_len, "FIPS codes are not unique");
    }

    #[test]
    fn test_all_fips_codes_are_five_digits() {
        for county in all_counties() {
            assert_eq!(county.fips.len(), 5, "County {} has malformed FIPS", county.name);
            assert!(
                county.fips.chars().all(|c| c.is_ascii_digit()),
                "County {} has non-numeric FIPS",
                county.name
            );
        }
    }

    #[test]
    fn test_fips_code_splits() {
        let county = get_county_by_fips("19169").unwrap();
        assert_eq!(county.state_code(), "19");
        assert_eq!(county.county_code(), "169");

        let county = get_county_by_fips("06037").unwrap();
        assert_eq!(county.state_code(), "06");
        assert_eq!(county.county_code(), "037");
    }

    #[test]
    fn test_all_counties_have_plausible_coordinates() {
        // Continental US bounds
        for county in all_counties() {
            assert!(
                county.latitude > 24.0 && county.latitude < 50.0,
                "County {} has invalid latitude: {}",
                county.name,
                county.latitude
            );
            assert!(
                county.longitude > -125.0 && county.longitude < -66.0,
                "County {} has invalid longitude: {}",
                county.name,
                county.longitude
            );
        }
    }
}
