//! farmscope - County agricultural suitability reports
//!
//! Fetches climate, terrain, soil, water quality, and census data for a
//! county and renders a suitability report on stdout.

use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use farmscope::aggregator::FarmDataService;
use farmscope::cache::FarmCache;
use farmscope::cli::{self, Cli};
use farmscope::data::{all_counties, ComprehensiveCountyData, FetchStatus};
use farmscope::refresh::{RefreshController, RefreshStatus};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.list {
        print_county_list();
        return Ok(());
    }

    let fips = match cli.fips.as_deref() {
        Some(raw) => cli::validate_fips(raw)?.to_string(),
        None => {
            return Err("missing county FIPS code; run with --list to see supported counties".into())
        }
    };

    let cache = FarmCache::new().ok_or("could not determine a cache directory")?;
    let _cleanup = cache.spawn_cleanup_task();

    let controller = RefreshController::new(cache.clone());
    if cli.status {
        print_status(&fips, &controller.status(&fips));
        return Ok(());
    }
    if cli.refresh {
        controller.refresh(&fips);
    }

    let service = FarmDataService::new(cache).with_timeout(Duration::from_secs(cli.timeout));
    let outcome = service.comprehensive_data(&fips).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome.data)?);
    } else {
        print_report(&outcome.data, &outcome.status, &outcome.errors);
    }

    Ok(())
}

fn print_county_list() {
    println!("Supported counties:");
    for county in all_counties() {
        println!("  {}  {}, {}", county.fips, county.name, county.state);
    }
}

fn print_status(fips: &str, status: &RefreshStatus) {
    match status.last_updated {
        Some(updated) => {
            println!("County {fips}");
            println!("  Last updated:  {}", updated.format("%Y-%m-%d %H:%M UTC"));
            println!("  Cache age:     {:.1} hours", status.cache_age_hours);
            println!(
                "  Needs refresh: {}",
                if status.needs_refresh { "yes" } else { "no" }
            );
        }
        None => {
            println!("County {fips}");
            println!("  No cached record. Run without --status to fetch.");
        }
    }
}

fn print_report(data: &ComprehensiveCountyData, status: &FetchStatus, errors: &[String]) {
    let analysis = &data.analysis;

    println!("{}, {} ({})", data.county.name, data.county.state, data.county.fips);
    println!(
        "Overall suitability: {} / 100 (grade {})",
        analysis.overall_score, analysis.grade
    );
    println!();

    println!("Sources:");
    println!("  USDA census:   {}", status.agricultural);
    println!("  NOAA climate:  {}", status.climate);
    println!("  USGS terrain:  {}", status.terrain);
    println!("  SSURGO soil:   {}", status.soil);
    println!("  EPA water:     {}", status.water);
    println!();

    let season = &data.climate.growing_season;
    println!("Climate:");
    println!("  Growing season:      {} days", season.growing_season_length);
    println!("  Growing degree days: {:.0}", season.growing_degree_days);
    if let Some(last) = season.last_frost {
        println!("  Last spring frost:   {last}");
    }
    if let Some(first) = season.first_frost {
        println!("  First fall frost:    {first}");
    }
    println!();

    let terrain = &data.terrain;
    println!("Terrain:");
    println!(
        "  Elevation:  {:.0}-{:.0} m (avg {:.0} m)",
        terrain.elevation_min, terrain.elevation_max, terrain.elevation_avg
    );
    println!(
        "  Slope:      {:.1} degrees ({})",
        terrain.slope_avg, terrain.slope_category
    );
    println!("  Drainage:   {}", terrain.drainage_pattern);
    println!("  Flood risk: {}", terrain.flood_risk);
    println!();

    let soil = &data.soil;
    println!("Soil:");
    println!("  Dominant type:  {}", soil.dominant_soil_type);
    println!(
        "  pH:             {:.1} (range {:.1}-{:.1})",
        soil.ph_avg, soil.ph_range.min, soil.ph_range.max
    );
    println!("  Organic matter: {:.1}%", soil.organic_matter_avg);
    println!("  Drainage:       {}", soil.drainage_class);
    println!("  Fertility:      {}", soil.fertility_rating);
    println!();

    let water = &data.water_quality;
    println!("Water quality:");
    println!(
        "  Assessed water bodies: {} ({} impaired)",
        water.assessed_water_bodies, water.impaired_water_bodies
    );
    println!("  Overall rating:        {}", water.overall_rating);
    println!("  Irrigation:            {}", water.irrigation_suitability);
    println!();

    print_section("Strengths", &analysis.strengths);
    print_section("Limitations", &analysis.limitations);
    print_section("Recommended crops", &analysis.recommended_crops);
    print_section("Risk factors", &analysis.risk_factors);
    print_section("Recommendations", &analysis.recommendations);

    if !errors.is_empty() {
        println!("Source errors (defaults substituted):");
        for error in errors {
            println!("  {error}");
        }
    }
}

fn print_section(title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("{title}:");
    for item in items {
        println!("  - {item}");
    }
    println!();
}
