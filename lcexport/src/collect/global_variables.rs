//! Defaults for the ESRI 2020 land-cover export over the Yukon Flats study area.

/// Earth Engine REST endpoint.
pub const EE_API_BASE_URL: &str = "https://earthengine.googleapis.com/v1";

/// Environment variable holding an OAuth2 access token for the REST API.
pub const EE_ACCESS_TOKEN_ENV: &str = "EE_ACCESS_TOKEN";

/// Cloud project billed for API calls.
pub const EE_PROJECT: &str = "akveg-map";

/// ESRI Global 10 m land use / land cover, 2020 (awesome-gee-community-catalog).
pub const ESRI_LULC_COLLECTION: &str = "projects/sat-io/open-datasets/landcover/ESRI_Global-LULC_10m";

pub const STUDY_AREA_ASSET: &str = "projects/akveg-map/assets/study_areas/YukonFlats_StudyArea";

pub const REFERENCE_RASTER_ASSET: &str =
    "projects/akveg-map/assets/covariates_v20240711/Elevation_10m_3338";

/// Band name the reference raster's first band is renamed to and selected by.
pub const REFERENCE_BAND: &str = "elevation";

pub const OUTPUT_BUCKET: &str = "akveg-data";

pub const OUTPUT_PREFIX: &str = "yukon_flats/esrilc_10m_3338";

pub const EXPORT_DESCRIPTION: &str = "esri_lulc10";

pub const LEGEND_TITLE: &str = "ESRI 2020 Land Cover";

pub const LAYER_NAME: &str = "ESRI LULC 10m";

/// Hard ceiling on `maxPixels` for any export.
pub const MAX_PIXELS_CEILING: u64 = 10_000_000_000_000;
