use anyhow::{Context, Result};
use lcexport::pipeline;
use lcexport::Config;
use tracing_subscriber::EnvFilter;

/// Example: render the ESRI 2020 land cover with its legend and export it to
/// Cloud Storage on the grid of the Yukon Flats elevation raster
///
/// Usage: cargo run --example esri_lulc_export -- [config.json]
/// Needs EE_ACCESS_TOKEN (e.g. from `gcloud auth print-access-token`).
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== Example: ESRI 2020 land cover export ===\n");

    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_json_file(&path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => Config::default(),
    };

    println!("Collection: {}", config.collection_id);
    println!("Reference:  {} (band {})", config.reference_raster_id, config.reference_band);
    println!("Region:     {}", config.region_asset_id);
    println!();

    let ee = pipeline::connect(&config).context("Failed to create Earth Engine client")?;
    let outcome = pipeline::run(&ee, &config).context("Export pipeline failed")?;

    println!("Legend:");
    for (color, name) in config.categories.iter() {
        println!("  {} {}", color, name);
    }
    println!();
    println!("Export submitted:");
    println!("  - Task:        {}", outcome.task.name);
    println!("  - Destination: {}", outcome.task.destination);
    println!("  - CRS:         {}", outcome.descriptor.crs);
    println!("  - Transform:   {:?}", outcome.descriptor.crs_transform.coefficients());
    println!("  - maxPixels:   {}", outcome.descriptor.max_pixels);
    println!("\nFollow progress in the Earth Engine task console.");

    Ok(())
}
