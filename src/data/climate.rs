//! NOAA Climate Data Online client
//!
//! Fetches daily weather observations (GHCND) and monthly climate normals
//! (NORMAL_MLY) for a county, and derives growing-season metrics from the
//! observed record.

use std::collections::BTreeMap;
use std::time::Duration;

use super::{ClimateData, County, DailyWeather, GrowingSeason, MonthlyNormal};
use crate::cache::{keys, FarmCache};
use chrono::{Datelike, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

/// Time-to-live for historical observations
const HISTORICAL_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Time-to-live for climate normals; they change once a decade
const NORMALS_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Base temperature for growing degree day accumulation, in Celsius
const GDD_BASE_TEMP: f64 = 10.0;

/// Environment variable holding the Climate Data Online token
const API_TOKEN_ENV: &str = "NOAA_API_TOKEN";

/// Errors that can occur when fetching climate data
#[derive(Debug, Error)]
pub enum ClimateError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Response envelope from the CDO API
#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    results: Vec<ObservationRecord>,
}

/// A single observation or normal from the CDO API
#[derive(Debug, Deserialize)]
struct ObservationRecord {
    /// ISO timestamp; only the date portion is meaningful
    date: String,
    datatype: String,
    value: f64,
}

/// Client for the NOAA Climate Data Online API
#[derive(Debug, Clone)]
pub struct ClimateClient {
    /// HTTP client for making requests
    http_client: Client,
    /// Shared response cache
    cache: FarmCache,
    /// Base URL for the API (allows override for testing)
    base_url: String,
    /// API token, read from the environment at construction
    api_token: Option<String>,
}

impl ClimateClient {
    /// Creates a new ClimateClient sharing the given cache
    pub fn new(cache: FarmCache) -> Self {
        Self {
            http_client: Client::new(),
            cache,
            base_url: "https://www.ncdc.noaa.gov/cdo-web/api/v2".to_string(),
            api_token: std::env::var(API_TOKEN_ENV).ok(),
        }
    }

    /// Creates a new ClimateClient with a custom base URL (for testing)
    #[cfg(test)]
    pub fn with_base_url(cache: FarmCache, base_url: String) -> Self {
        Self {
            http_client: Client::new(),
            cache,
            base_url,
            api_token: None,
        }
    }

    /// Fetches the climate record for a county
    ///
    /// Historical observations cover the last full calendar year; normals are
    /// the published thirty-year monthly averages. The two data sets are
    /// cached independently under different TTLs.
    pub async fn fetch_climate_data(&self, county: &County) -> Result<ClimateData, ClimateError> {
        let year = Utc::now().year() - 1;

        let historical_key = keys::climate(county.fips, &format!("historical_{year}"));
        let normals_key = keys::climate(county.fips, "normals");

        let (historical, normals) = tokio::try_join!(
            self.cache.cached(&historical_key, HISTORICAL_TTL, || {
                self.fetch_historical(county, year)
            }),
            self.cache.cached(&normals_key, NORMALS_TTL, || self.fetch_normals(county)),
        )?;

        let growing_season = derive_growing_season(&historical);

        Ok(ClimateData {
            historical,
            normals,
            growing_season,
        })
    }

    async fn fetch_historical(
        &self,
        county: &County,
        year: i32,
    ) -> Result<Vec<DailyWeather>, ClimateError> {
        let response = self
            .get_data(&[
                ("datasetid", "GHCND"),
                ("locationid", &format!("FIPS:{}", county.fips)),
                ("startdate", &format!("{year}-01-01")),
                ("enddate", &format!("{year}-12-31")),
                ("datatypeid", "TMAX,TMIN,PRCP"),
                ("units", "standard"),
                ("limit", "1000"),
            ])
            .await?;

        Ok(process_observations(&response.results))
    }

    async fn fetch_normals(&self, county: &County) -> Result<Vec<MonthlyNormal>, ClimateError> {
        let response = self
            .get_data(&[
                ("datasetid", "NORMAL_MLY"),
                ("locationid", &format!("FIPS:{}", county.fips)),
                ("startdate", "2010-01-01"),
                ("enddate", "2010-12-31"),
                ("limit", "1000"),
            ])
            .await?;

        Ok(process_normals(&response.results))
    }

    async fn get_data(&self, params: &[(&str, &str)]) -> Result<ApiResponse, ClimateError> {
        let mut request = self
            .http_client
            .get(format!("{}/data", self.base_url))
            .query(params);

        if let Some(token) = &self.api_token {
            request = request.header("token", token);
        }

        let response = request
            .send()
            .await?
            .error_for_status()?
            .json::<ApiResponse>()
            .await?;
        Ok(response)
    }
}

/// Merges per-datatype observation rows into one record per day
///
/// CDO reports temperatures in tenths of degrees Fahrenheit and
/// precipitation in tenths of millimeters; both are scaled down and
/// temperatures converted to Celsius.
fn process_observations(records: &[ObservationRecord]) -> Vec<DailyWeather> {
    let mut by_date: BTreeMap<NaiveDate, (Option<f64>, Option<f64>, Option<f64>)> = BTreeMap::new();

    for record in records {
        let Some(date) = parse_record_date(&record.date) else {
            continue;
        };
        let entry = by_date.entry(date).or_default();
        match record.datatype.as_str() {
            "TMAX" => entry.0 = Some(fahrenheit_to_celsius(record.value / 10.0)),
            "TMIN" => entry.1 = Some(fahrenheit_to_celsius(record.value / 10.0)),
            "PRCP" => entry.2 = Some(record.value / 10.0),
            _ => {}
        }
    }

    by_date
        .into_iter()
        .map(|(date, (temperature_max, temperature_min, precipitation))| {
            let temperature_avg = match (temperature_max, temperature_min) {
                (Some(max), Some(min)) => Some((max + min) / 2.0),
                _ => None,
            };
            let growing_degree_days = temperature_avg
                .map(|avg| (avg - GDD_BASE_TEMP).max(0.0))
                .unwrap_or(0.0);
            let frost_day = temperature_min.map(|min| min <= 0.0).unwrap_or(false);

            DailyWeather {
                date,
                temperature_max,
                temperature_min,
                temperature_avg,
                precipitation,
                growing_degree_days,
                frost_day,
            }
        })
        .collect()
}

/// Builds twelve monthly normals, filling unreported months with mild
/// mid-latitude defaults
fn process_normals(records: &[ObservationRecord]) -> Vec<MonthlyNormal> {
    let mut by_month: BTreeMap<u32, (Option<f64>, Option<f64>, Option<f64>)> = BTreeMap::new();

    for record in records {
        let Some(date) = parse_record_date(&record.date) else {
            continue;
        };
        let entry = by_month.entry(date.month()).or_default();
        match record.datatype.as_str() {
            "MLY-TMAX-NORMAL" => entry.0 = Some(fahrenheit_to_celsius(record.value / 10.0)),
            "MLY-TMIN-NORMAL" => entry.1 = Some(fahrenheit_to_celsius(record.value / 10.0)),
            "MLY-PRCP-NORMAL" => entry.2 = Some(record.value / 10.0),
            _ => {}
        }
    }

    (1..=12)
        .map(|month| {
            let (tmax, tmin, prcp) = by_month.get(&month).copied().unwrap_or_default();
            let temperature_min_avg = tmin.unwrap_or(10.0);
            MonthlyNormal {
                month,
                temperature_max_avg: tmax.unwrap_or(20.0),
                temperature_min_avg,
                precipitation_avg: prcp.unwrap_or(50.0),
                hardiness_zone: hardiness_zone(temperature_min_avg).to_string(),
            }
        })
        .collect()
}

/// Derives growing-season metrics from one calendar year of observations
///
/// A frost day is any day whose minimum temperature reached 0C. The last
/// spring frost is the latest frost in January through June; the first fall
/// frost is the earliest frost in July through December. When either is
/// unobserved the season length falls back to 180 days.
fn derive_growing_season(historical: &[DailyWeather]) -> GrowingSeason {
    let last_frost = historical
        .iter()
        .filter(|day| day.frost_day && day.date.month() <= 6)
        .map(|day| day.date)
        .max();
    let first_frost = historical
        .iter()
        .filter(|day| day.frost_day && day.date.month() >= 7)
        .map(|day| day.date)
        .min();

    let growing_season_length = match (last_frost, first_frost) {
        (Some(last), Some(first)) => (first - last).num_days().max(0) as u32,
        _ => 180,
    };

    let growing_degree_days = historical.iter().map(|day| day.growing_degree_days).sum();
    let frost_free_days = historical.iter().filter(|day| !day.frost_day).count() as u32;

    GrowingSeason {
        first_frost,
        last_frost,
        growing_season_length,
        growing_degree_days,
        frost_free_days,
    }
}

/// Estimates a USDA plant hardiness zone from the average minimum temperature
fn hardiness_zone(min_temp: f64) -> &'static str {
    if min_temp >= 15.0 {
        "10a"
    } else if min_temp >= 10.0 {
        "9a"
    } else if min_temp >= 5.0 {
        "8a"
    } else if min_temp >= 0.0 {
        "7a"
    } else if min_temp >= -5.0 {
        "6a"
    } else if min_temp >= -10.0 {
        "5a"
    } else {
        "4a"
    }
}

fn fahrenheit_to_celsius(f: f64) -> f64 {
    (f - 32.0) * 5.0 / 9.0
}

fn parse_record_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.get(..10)?, "%Y-%m-%d").ok()
}
