use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::collect::global_variables::{
    EE_ACCESS_TOKEN_ENV, EE_API_BASE_URL, EE_PROJECT, ESRI_LULC_COLLECTION, EXPORT_DESCRIPTION, LAYER_NAME,
    LEGEND_TITLE, MAX_PIXELS_CEILING, OUTPUT_BUCKET, OUTPUT_PREFIX, REFERENCE_BAND,
    REFERENCE_RASTER_ASSET, STUDY_AREA_ASSET,
};
use crate::error::{Error, Result};
use crate::geometric::export::{ExportTarget, RetryPolicy};
use crate::geometric::land_cover::CategoryDictionary;
use crate::geometric::map_display::VisParams;

/// Run configuration
/// Every field is optional in the JSON file; missing ones take the ESRI 2020 /
/// Yukon Flats defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    /// Cloud project billed for API calls
    pub project: String,
    pub api_base_url: String,
    /// OAuth2 token; falls back to `EE_ACCESS_TOKEN`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    pub collection_id: String,
    pub reference_raster_id: String,
    pub reference_band: String,
    pub region_asset_id: String,

    pub output_bucket: String,
    pub output_prefix: String,
    pub description: String,
    pub max_pixels: u64,

    pub legend_title: String,
    pub layer_name: String,
    pub categories: CategoryDictionary,

    /// Total submission attempts; only transport failures are retried
    pub submit_attempts: u32,
    pub submit_backoff_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            project: EE_PROJECT.to_string(),
            api_base_url: EE_API_BASE_URL.to_string(),
            access_token: None,
            collection_id: ESRI_LULC_COLLECTION.to_string(),
            reference_raster_id: REFERENCE_RASTER_ASSET.to_string(),
            reference_band: REFERENCE_BAND.to_string(),
            region_asset_id: STUDY_AREA_ASSET.to_string(),
            output_bucket: OUTPUT_BUCKET.to_string(),
            output_prefix: OUTPUT_PREFIX.to_string(),
            description: EXPORT_DESCRIPTION.to_string(),
            max_pixels: MAX_PIXELS_CEILING,
            legend_title: LEGEND_TITLE.to_string(),
            layer_name: LAYER_NAME.to_string(),
            categories: CategoryDictionary::esri_lulc_2020(),
            submit_attempts: 1,
            submit_backoff_ms: 2_000,
        }
    }
}

impl Config {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Config =
            serde_json::from_str(s).map_err(|e| Error::config(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Config::from_json_str(&content).map_err(|e| match e {
            Error::Configuration(msg) => Error::config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    pub fn validate(&self) -> Result<()> {
        let required = [
            ("project", &self.project),
            ("collectionId", &self.collection_id),
            ("referenceRasterId", &self.reference_raster_id),
            ("referenceBand", &self.reference_band),
            ("regionAssetId", &self.region_asset_id),
            ("outputBucket", &self.output_bucket),
            ("outputPrefix", &self.output_prefix),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(Error::config(format!("{} must not be empty", name)));
            }
        }
        if self.max_pixels == 0 {
            return Err(Error::config("maxPixels must be positive"));
        }
        if self.categories.is_empty() {
            return Err(Error::config("categories must not be empty"));
        }
        self.vis_params()?;
        Ok(())
    }

    /// Token from the file, else from the environment
    pub fn resolved_access_token(&self) -> Option<String> {
        self.access_token.clone().or_else(|| {
            std::env::var(EE_ACCESS_TOKEN_ENV)
                .ok()
                .filter(|t| !t.is_empty())
        })
    }

    pub fn vis_params(&self) -> Result<VisParams> {
        VisParams::for_categories(&self.categories)
    }

    pub fn export_target(&self) -> ExportTarget {
        ExportTarget::new(
            &self.description,
            &self.output_bucket,
            &self.output_prefix,
            self.max_pixels,
        )
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.submit_attempts,
            Duration::from_millis(self.submit_backoff_ms),
        )
    }
}
