//! Example: Query elevation from a directory of DEM tiles.
//!
//! Usage: cargo run --example query_elevation -- <lat> <lon> [data_dir]

use elevd_dem::{EngineConfig, FileRasterSource, LookupEngine, LookupResult};
use std::env;
use std::sync::Arc;
use std::time::Instant;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: {} <lat> <lon> [data_dir]", args[0]);
        eprintln!("Example: {} 47.6062 -122.3321 ./data", args[0]);
        std::process::exit(1);
    }

    let lat: f64 = args[1].parse()?;
    let lon: f64 = args[2].parse()?;
    let data_dir = args.get(3).map(|s| s.as_str()).unwrap_or("data");

    println!("Indexing DEM tiles from {}...", data_dir);
    let start = Instant::now();

    let engine = LookupEngine::open(
        data_dir,
        Arc::new(FileRasterSource::default()),
        EngineConfig::default(),
    )?;
    let index = engine.index();

    println!("Indexed {} tiles in {:.3}s", index.len(), start.elapsed().as_secs_f64());

    if let Some(bounds) = index.total_bounds() {
        println!(
            "Coverage: lat {:.2}° to {:.2}°, lon {:.2}° to {:.2}°",
            bounds.min_lat, bounds.max_lat, bounds.min_lon, bounds.max_lon
        );
    }

    println!("\nQuerying elevation at ({}, {})...", lat, lon);
    let query_start = Instant::now();

    match engine.lookup(lat, lon) {
        LookupResult::Ok { elevation } => {
            println!(
                "Elevation: {} meters (loaded in {:.2}s)",
                elevation,
                query_start.elapsed().as_secs_f64()
            );
        }
        LookupResult::NoData => println!("No data at this location"),
        LookupResult::Error(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }

    // Second query should be fast (tile already decoded)
    let query_start = Instant::now();
    let again = engine.lookup(lat, lon);
    println!(
        "Second query: {:?} (cached: {:.6}s)",
        again.status(),
        query_start.elapsed().as_secs_f64()
    );

    Ok(())
}
