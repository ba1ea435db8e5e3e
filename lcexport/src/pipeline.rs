//! fetch → visualize → export, in that order, once.

use crate::collect::ee::platform::EarthEngine;
use crate::config::Config;
use crate::error::Result;
use crate::geometric::export::{configure_export, submit_export, ExportDescriptor, ExportTask};
use crate::geometric::legend::build_legend;
use crate::geometric::map_display::MapView;

#[cfg(feature = "reqwest")]
use crate::collect::ee::ee_collect::EeCollect;

/// What a run leaves behind: the map session, the descriptor that was
/// submitted, and the accepted task
#[derive(Debug)]
pub struct PipelineOutcome {
    pub map: MapView,
    pub descriptor: ExportDescriptor,
    pub task: ExportTask,
}

/// REST client for the project and endpoint named in `config`
#[cfg(feature = "reqwest")]
pub fn connect(config: &Config) -> Result<EeCollect> {
    let token = config.resolved_access_token();
    if token.is_none() {
        tracing::warn!("No access token configured, requests will be unauthenticated");
    }
    Ok(EeCollect::new(&config.project, token)?.with_base_url(&config.api_base_url))
}

/// Load and mosaic the collection, show it with its legend, then export it
/// on the reference raster's grid, clipped to the study area
pub fn run<P: EarthEngine>(platform: &P, config: &Config) -> Result<PipelineOutcome> {
    config.validate()?;

    let collection = platform.load_collection(&config.collection_id)?;
    tracing::info!("Loaded collection {}", collection.id);
    let image = collection.mosaic();
    tracing::info!("Image: {}", image.label);

    let mut map = MapView::new();
    map.add_legend(build_legend(&config.legend_title, &config.categories));
    map.add_layer(image.clone(), config.vis_params()?, &config.layer_name);

    let descriptor = configure_export(
        platform,
        image,
        &config.reference_raster_id,
        &config.reference_band,
        &config.region_asset_id,
        &config.export_target(),
    )?;
    let task = submit_export(platform, &descriptor, config.retry_policy())?;

    Ok(PipelineOutcome {
        map,
        descriptor,
        task,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::memory::MemoryPlatform;
    use crate::error::Error;
    use crate::geo_core::Projection;

    fn config() -> Config {
        Config::default()
    }

    fn platform(config: &Config, projection: Projection) -> MemoryPlatform {
        MemoryPlatform::new()
            .with_collection(&config.collection_id)
            .with_image(&config.reference_raster_id, &["b1"], projection)
            .with_region(&config.region_asset_id, None)
    }

    #[test]
    fn test_end_to_end() {
        let config = config();
        let projection = Projection::new("EPSG:3338", [10.0, 0.0, 297000.0, 0.0, -10.0, 1740000.0]);
        let p = platform(&config, projection.clone());

        let outcome = run(&p, &config).unwrap();

        assert_eq!(outcome.descriptor.projection(), projection);
        assert_eq!(outcome.descriptor.max_pixels, 10_000_000_000_000);
        assert_eq!(
            outcome.task.destination,
            "gs://akveg-data/yukon_flats/esrilc_10m_3338.tif"
        );
        assert_eq!(outcome.task.description, "esri_lulc10");
        assert_eq!(p.submitted(), vec![outcome.descriptor.clone()]);

        let layer = outcome.map.layer("ESRI LULC 10m").unwrap();
        assert_eq!((layer.vis.min, layer.vis.max), (1, 10));
        assert_eq!(layer.image, outcome.descriptor.image);
        assert_eq!(outcome.map.overlays().len(), 1);
        assert_eq!(outcome.map.overlays()[0].widgets.len(), 12);
    }

    #[test]
    fn test_missing_collection_aborts() {
        let config = config();
        let p = MemoryPlatform::new()
            .with_image(&config.reference_raster_id, &["b1"], Projection::new("EPSG:3338", [10.0, 0.0, 0.0, 0.0, -10.0, 0.0]))
            .with_region(&config.region_asset_id, None);
        let err = run(&p, &config).unwrap_err();
        assert!(matches!(err, Error::AssetNotFound { ref asset_id } if *asset_id == config.collection_id));
        assert_eq!(p.submit_attempts(), 0);
    }

    #[test]
    fn test_projection_failure_aborts() {
        let config = config();
        let p = MemoryPlatform::new()
            .with_collection(&config.collection_id)
            .with_unprojected_image(&config.reference_raster_id, &["b1"])
            .with_region(&config.region_asset_id, None);
        let err = run(&p, &config).unwrap_err();
        assert!(matches!(err, Error::ProjectionResolution { .. }));
        assert_eq!(p.submit_attempts(), 0);
    }

    #[test]
    fn test_invalid_config_aborts_before_any_call() {
        let mut config = config();
        config.output_bucket.clear();
        let p = MemoryPlatform::new();
        assert!(matches!(run(&p, &config), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_submission_rejection_surfaces() {
        let config = config();
        let p = platform(&config, Projection::new("EPSG:3338", [10.0, 0.0, 0.0, 0.0, -10.0, 0.0]))
            .reject_exports(429, "Too many tasks already in the queue");
        let err = run(&p, &config).unwrap_err();
        assert!(matches!(err, Error::ExportSubmission { status: 429, .. }));
    }
}
