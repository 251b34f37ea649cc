//! Command-line interface parsing for farmscope
//!
//! This module handles parsing of CLI arguments using clap, including the
//! county FIPS argument and the refresh/status/output flags.

use clap::Parser;
use thiserror::Error;

/// Error types for CLI argument validation
#[derive(Debug, Error)]
pub enum CliError {
    /// The FIPS argument is not a five-digit numeric code
    #[error("Invalid FIPS code: '{0}'. Expected a five-digit code like 19169")]
    InvalidFips(String),
}

/// farmscope - View county agricultural suitability
#[derive(Parser, Debug)]
#[command(name = "farmscope")]
#[command(about = "County agricultural suitability from climate, terrain, soil, and water data")]
#[command(version)]
pub struct Cli {
    /// Five-digit county FIPS code (e.g., 19169 for Story County, IA)
    pub fips: Option<String>,

    /// Clear cached data for the county before fetching
    #[arg(long)]
    pub refresh: bool,

    /// Show cache freshness for the county instead of fetching
    #[arg(long)]
    pub status: bool,

    /// Emit the comprehensive record as JSON instead of a report
    #[arg(long)]
    pub json: bool,

    /// List supported counties and exit
    #[arg(long)]
    pub list: bool,

    /// Per-source fetch timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,
}

/// Validates a FIPS argument: exactly five ASCII digits.
///
/// Validation is purely syntactic; whether the county is supported is
/// decided by the lookup table at fetch time.
pub fn validate_fips(s: &str) -> Result<&str, CliError> {
    if s.len() == 5 && s.chars().all(|c| c.is_ascii_digit()) {
        Ok(s)
    } else {
        Err(CliError::InvalidFips(s.to_string()))
    }
}
