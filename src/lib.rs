//! Farmscope Library
//!
//! County agricultural suitability built from public climate, terrain,
//! soil, water quality, and census data sources.

pub mod aggregator;
pub mod analysis;
pub mod cache;
pub mod cli;
pub mod data;
pub mod refresh;
