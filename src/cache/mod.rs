//! Two-tier TTL cache for API responses
//!
//! This module provides a cache backed by a process-local map and a durable
//! JSON-file store. Entries carry explicit `cached_at`/`expires_at` timestamps;
//! expired entries are purged on read, so callers only ever see valid data.
//! Durable-store I/O failures are logged and treated as cache misses, so
//! the cache is never the reason a read fails.

mod store;

pub use store::{CacheStats, EntryMetadata, FarmCache};

/// Cache key builders, kept in one place so the per-source namespaces used by
/// the adapters and the refresh controller's invalidation cascade stay in sync.
pub mod keys {
    /// Key for the merged comprehensive record of a county.
    pub fn comprehensive(fips: &str) -> String {
        format!("comprehensive_{fips}")
    }

    /// Key for one USDA NASS sector (crops, livestock, economics) and year.
    pub fn agricultural(fips: &str, sector: &str, year: i32) -> String {
        format!("usda_{fips}_{sector}_{year}")
    }

    /// Key for one climate data set (historical weather or normals).
    pub fn climate(fips: &str, data_type: &str) -> String {
        format!("climate_{fips}_{data_type}")
    }

    /// Key for the terrain analysis of a county.
    pub fn terrain(fips: &str) -> String {
        format!("terrain_{fips}")
    }

    /// Key for the soil analysis of a county.
    pub fn soil(fips: &str) -> String {
        format!("soil_{fips}")
    }

    /// Key for the water quality summary of a county.
    pub fn water(fips: &str) -> String {
        format!("water_{fips}")
    }

    /// Every key prefix holding data scoped to a county. Deleting these
    /// prefixes guarantees the next aggregation re-fetches all five sources.
    pub fn region_prefixes(fips: &str) -> [String; 6] {
        [
            format!("comprehensive_{fips}"),
            format!("usda_{fips}"),
            format!("climate_{fips}"),
            format!("terrain_{fips}"),
            format!("soil_{fips}"),
            format!("water_{fips}"),
        ]
    }
}
