use anyhow::{Context, Result};
use lcexport::geo_core::Projection;
use lcexport::{pipeline, Config, MemoryPlatform};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Example: dry run against the in-memory platform
/// Writes the map session (layers + legend) as JSON and the legend as an
/// HTML page to ./output, and prints the export request that would be sent.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== Example: legend preview (dry run) ===\n");

    let config = Config::default();
    let platform = MemoryPlatform::new()
        .with_collection(&config.collection_id)
        .with_image(
            &config.reference_raster_id,
            &["b1"],
            Projection::new("EPSG:3338", [10.0, 0.0, -1100000.0, 0.0, -10.0, 2100000.0]),
        )
        .with_region(&config.region_asset_id, None);

    let outcome = pipeline::run(&platform, &config)?;

    let output = PathBuf::from("./output");
    fs::create_dir_all(&output).context("Failed to create ./output")?;

    let legend_html = outcome
        .map
        .overlays()
        .first()
        .map(|panel| panel.to_html())
        .unwrap_or_default();
    let page = format!(
        "<!DOCTYPE html>\n<html><body><div style=\"position: relative; width: 800px; height: 600px; background: #eee\">{}</div></body></html>\n",
        legend_html
    );
    fs::write(output.join("legend.html"), page).context("Failed to write legend.html")?;
    fs::write(output.join("map.json"), outcome.map.to_json()?).context("Failed to write map.json")?;

    println!("Legend written to {:?}", output.join("legend.html"));
    println!("Map session written to {:?}", output.join("map.json"));
    println!("\nExport request:");
    println!("{}", serde_json::to_string_pretty(&outcome.descriptor.to_request_body())?);

    Ok(())
}
