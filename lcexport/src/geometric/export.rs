use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::thread;
use std::time::Duration;
use uuid::Uuid;

use crate::collect::ee::expression::{Image, Region};
use crate::collect::ee::platform::EarthEngine;
use crate::collect::global_variables::MAX_PIXELS_CEILING;
use crate::commons::basic_functions::{gcs_uri, strip_tif_suffix};
use crate::error::{Error, Result};
use crate::geo_core::{AffineTransform, Projection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FileFormat {
    GeoTIFF,
}

impl FileFormat {
    /// Enum value in the REST API
    pub fn api_name(self) -> &'static str {
        match self {
            FileFormat::GeoTIFF => "GEO_TIFF",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatOptions {
    pub cloud_optimized: bool,
}

/// Where and under which name the export lands
#[derive(Debug, Clone, PartialEq)]
pub struct ExportTarget {
    pub description: String,
    pub bucket: String,
    pub file_name_prefix: String,
    pub max_pixels: u64,
}

impl ExportTarget {
    pub fn new(description: &str, bucket: &str, file_name_prefix: &str, max_pixels: u64) -> Self {
        ExportTarget {
            description: description.to_string(),
            bucket: bucket.to_string(),
            file_name_prefix: file_name_prefix.to_string(),
            max_pixels,
        }
    }
}

/// Everything the export queue needs for one Cloud-Optimized GeoTIFF export
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDescriptor {
    /// Idempotency key; every attempt at submitting this descriptor reuses it
    /// so a retry after a lost response cannot enqueue a second job
    pub request_id: String,
    pub image: Image,
    pub description: String,
    pub bucket: String,
    pub file_name_prefix: String,
    pub crs: String,
    pub crs_transform: AffineTransform,
    pub region: Region,
    pub file_format: FileFormat,
    pub format_options: FormatOptions,
    pub max_pixels: u64,
}

impl ExportDescriptor {
    /// Assemble the descriptor on the grid of `projection`
    /// `max_pixels` is clamped to the 1e13 ceiling.
    pub fn new(
        image: Image,
        projection: &Projection,
        region: Region,
        target: &ExportTarget,
    ) -> Result<Self> {
        if target.bucket.trim().is_empty() {
            return Err(Error::config("export bucket is empty"));
        }
        let prefix = strip_tif_suffix(target.file_name_prefix.trim());
        if prefix.is_empty() {
            return Err(Error::config("export file name prefix is empty"));
        }
        if target.max_pixels == 0 {
            return Err(Error::config("maxPixels must be positive"));
        }
        if target.max_pixels > MAX_PIXELS_CEILING {
            tracing::warn!(
                "maxPixels {} exceeds the ceiling, using {}",
                target.max_pixels,
                MAX_PIXELS_CEILING
            );
        }

        Ok(ExportDescriptor {
            request_id: Uuid::new_v4().to_string(),
            image,
            description: target.description.clone(),
            bucket: target.bucket.clone(),
            file_name_prefix: prefix.to_string(),
            crs: projection.crs.clone(),
            crs_transform: projection.transform,
            region,
            file_format: FileFormat::GeoTIFF,
            format_options: FormatOptions {
                cloud_optimized: true,
            },
            max_pixels: target.max_pixels.min(MAX_PIXELS_CEILING),
        })
    }

    pub fn projection(&self) -> Projection {
        Projection {
            crs: self.crs.clone(),
            transform: self.crs_transform,
        }
    }

    /// `gs://<bucket>/<prefix>.tif`
    pub fn destination_uri(&self) -> String {
        gcs_uri(&self.bucket, &self.file_name_prefix)
    }

    /// Body of `POST projects/{project}/image:export`
    pub fn to_request_body(&self) -> Value {
        let t = &self.crs_transform;
        json!({
            "requestId": self.request_id,
            "expression": self.image.clip(&self.region).node.to_expression(),
            "description": self.description,
            // int64 fields travel as strings in the REST API
            "maxPixels": self.max_pixels.to_string(),
            "grid": {
                "crsCode": self.crs,
                "affineTransform": {
                    "scaleX": t.scale_x,
                    "shearX": t.shear_x,
                    "translateX": t.translate_x,
                    "shearY": t.shear_y,
                    "scaleY": t.scale_y,
                    "translateY": t.translate_y,
                },
            },
            "fileExportOptions": {
                "fileFormat": self.file_format.api_name(),
                "cloudStorageDestination": {
                    "bucket": self.bucket,
                    "filenamePrefix": self.file_name_prefix,
                },
                "geoTiffOptions": {
                    "cloudOptimized": self.format_options.cloud_optimized,
                },
            },
        })
    }
}

/// An accepted export job
/// Its outcome is tracked in the platform's task console, not here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportTask {
    /// Operation name returned by the queue
    pub name: String,
    pub description: String,
    pub destination: String,
    pub submitted_at: DateTime<Utc>,
}

/// Bounded retry with exponential backoff around export submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        RetryPolicy {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
        }
    }

    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        RetryPolicy {
            max_attempts: max_attempts.max(1),
            initial_backoff,
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::none()
    }
}

/// Projection of the designated band of a reference raster
/// The first band is renamed to `band` and selected, then the projection is
/// fetched with a blocking call.
pub fn resolve_projection<P: EarthEngine>(
    platform: &P,
    reference_id: &str,
    band: &str,
) -> Result<Projection> {
    let reference = platform.load_image(reference_id)?;
    let selected = reference.rename(&[band]).select(band);
    let projection = platform.projection(reference_id, &selected)?;
    tracing::info!(
        "Projection of {}: {} {:?}",
        reference_id,
        projection.crs,
        projection.transform.coefficients()
    );
    Ok(projection)
}

/// Resolve the region and projection, then build the descriptor
/// Any failure here aborts before anything is submitted.
pub fn configure_export<P: EarthEngine>(
    platform: &P,
    image: Image,
    reference_id: &str,
    band: &str,
    region_id: &str,
    target: &ExportTarget,
) -> Result<ExportDescriptor> {
    let region = platform.load_region(region_id)?;
    let projection = resolve_projection(platform, reference_id, band)?;
    ExportDescriptor::new(image, &projection, region, target)
}

/// Submit `descriptor`, retrying transient failures per `policy`
pub fn submit_export<P: EarthEngine>(
    platform: &P,
    descriptor: &ExportDescriptor,
    policy: RetryPolicy,
) -> Result<ExportTask> {
    let mut attempt = 1;
    loop {
        match platform.submit_export(descriptor) {
            Ok(task) => {
                tracing::info!(
                    "Export {:?} submitted as {} -> {}",
                    task.description,
                    task.name,
                    task.destination
                );
                return Ok(task);
            }
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                let wait = policy.backoff(attempt);
                tracing::warn!(
                    "Export submission attempt {}/{} failed: {}; retrying in {:?}",
                    attempt,
                    policy.max_attempts,
                    e,
                    wait
                );
                thread::sleep(wait);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::ee::expression::ImageCollection;
    use crate::collect::memory::MemoryPlatform;

    const ELEV: &str = "projects/akveg-map/assets/elev";
    const AREA: &str = "projects/akveg-map/assets/area";

    fn alaska_albers() -> Projection {
        Projection::new("EPSG:3338", [10.0, 0.0, 297000.0, 0.0, -10.0, 1740000.0])
    }

    fn platform() -> MemoryPlatform {
        MemoryPlatform::new()
            .with_collection("projects/sat-io/lulc")
            .with_image(ELEV, &["b1"], alaska_albers())
            .with_region(AREA, None)
    }

    fn target(max_pixels: u64) -> ExportTarget {
        ExportTarget::new("esri_lulc10", "akveg-data", "yukon_flats/esrilc_10m_3338.tif", max_pixels)
    }

    fn mosaic() -> Image {
        ImageCollection::load("projects/sat-io/lulc").mosaic()
    }

    #[test]
    fn test_descriptor_carries_resolved_projection() {
        let p = platform();
        let d = configure_export(&p, mosaic(), ELEV, "elevation", AREA, &target(1_000)).unwrap();
        assert_eq!(d.crs, "EPSG:3338");
        assert_eq!(
            d.crs_transform.coefficients(),
            [10.0, 0.0, 297000.0, 0.0, -10.0, 1740000.0]
        );
        assert_eq!(d.projection(), alaska_albers());
        assert_eq!(d.file_format, FileFormat::GeoTIFF);
        assert!(d.format_options.cloud_optimized);
        assert_eq!(d.region, Region::asset(AREA));
    }

    #[test]
    fn test_max_pixels_clamped() {
        let d = ExportDescriptor::new(mosaic(), &alaska_albers(), Region::asset(AREA), &target(u64::MAX))
            .unwrap();
        assert_eq!(d.max_pixels, MAX_PIXELS_CEILING);
        let d = ExportDescriptor::new(mosaic(), &alaska_albers(), Region::asset(AREA), &target(42))
            .unwrap();
        assert_eq!(d.max_pixels, 42);
    }

    #[test]
    fn test_prefix_normalized() {
        let d = ExportDescriptor::new(mosaic(), &alaska_albers(), Region::asset(AREA), &target(1))
            .unwrap();
        assert_eq!(d.file_name_prefix, "yukon_flats/esrilc_10m_3338");
        assert_eq!(d.destination_uri(), "gs://akveg-data/yukon_flats/esrilc_10m_3338.tif");
    }

    #[test]
    fn test_empty_bucket_rejected() {
        let mut t = target(1);
        t.bucket = " ".to_string();
        let err = ExportDescriptor::new(mosaic(), &alaska_albers(), Region::asset(AREA), &t)
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_request_body() {
        let d = ExportDescriptor::new(mosaic(), &alaska_albers(), Region::asset(AREA), &target(u64::MAX))
            .unwrap();
        let body = d.to_request_body();
        assert_eq!(body["requestId"], d.request_id.as_str());
        assert_eq!(body["description"], "esri_lulc10");
        assert_eq!(body["maxPixels"], "10000000000000");
        assert_eq!(body["grid"]["crsCode"], "EPSG:3338");
        assert_eq!(body["grid"]["affineTransform"]["scaleY"], -10.0);
        assert_eq!(body["grid"]["affineTransform"]["translateX"], 297000.0);
        assert_eq!(body["fileExportOptions"]["fileFormat"], "GEO_TIFF");
        assert_eq!(
            body["fileExportOptions"]["cloudStorageDestination"]["filenamePrefix"],
            "yukon_flats/esrilc_10m_3338"
        );
        assert_eq!(body["fileExportOptions"]["geoTiffOptions"]["cloudOptimized"], true);
        let root = &body["expression"]["values"]["0"]["functionInvocationValue"];
        assert_eq!(root["functionName"], "Image.clip");
    }

    #[test]
    fn test_missing_reference_aborts_before_submit() {
        let p = MemoryPlatform::new().with_region(AREA, None);
        let err = configure_export(&p, mosaic(), ELEV, "elevation", AREA, &target(1)).unwrap_err();
        assert!(matches!(err, Error::AssetNotFound { ref asset_id } if asset_id == ELEV));
        assert!(p.submitted().is_empty());
    }

    #[test]
    fn test_missing_region_aborts() {
        let p = MemoryPlatform::new().with_image(ELEV, &["b1"], alaska_albers());
        let err = configure_export(&p, mosaic(), ELEV, "elevation", AREA, &target(1)).unwrap_err();
        assert!(matches!(err, Error::AssetNotFound { .. }));
    }

    #[test]
    fn test_rejection_not_retried() {
        let p = platform().reject_exports(400, "malformed region geometry");
        let d = configure_export(&p, mosaic(), ELEV, "elevation", AREA, &target(1)).unwrap();
        let err = submit_export(&p, &d, RetryPolicy::new(3, Duration::ZERO)).unwrap_err();
        assert!(matches!(err, Error::ExportSubmission { status: 400, .. }));
        assert_eq!(p.submit_attempts(), 1);
    }

    #[test]
    fn test_transient_failures_retried() {
        let p = platform().fail_next_submissions(2);
        let d = configure_export(&p, mosaic(), ELEV, "elevation", AREA, &target(1)).unwrap();
        let task = submit_export(&p, &d, RetryPolicy::new(3, Duration::ZERO)).unwrap();
        assert_eq!(p.submit_attempts(), 3);
        assert_eq!(task.destination, "gs://akveg-data/yukon_flats/esrilc_10m_3338.tif");
        assert_eq!(p.submitted(), vec![d]);
    }

    #[test]
    fn test_retries_reuse_request_id() {
        // the queue accepts the job but the response is lost
        let p = platform().lose_next_responses(1);
        let d = configure_export(&p, mosaic(), ELEV, "elevation", AREA, &target(1)).unwrap();
        let task = submit_export(&p, &d, RetryPolicy::new(3, Duration::ZERO)).unwrap();

        assert_eq!(p.submit_attempts(), 2);
        assert_eq!(p.request_ids(), vec![d.request_id.clone(), d.request_id.clone()]);
        assert_eq!(p.submitted().len(), 1);
        assert_eq!(task.name, "projects/memory/operations/EXPORT0001");
    }

    #[test]
    fn test_descriptors_get_distinct_request_ids() {
        let a = ExportDescriptor::new(mosaic(), &alaska_albers(), Region::asset(AREA), &target(1)).unwrap();
        let b = ExportDescriptor::new(mosaic(), &alaska_albers(), Region::asset(AREA), &target(1)).unwrap();
        assert_ne!(a.request_id, b.request_id);
        assert!(!a.request_id.is_empty());
    }

    #[test]
    fn test_transient_failures_exhaust_attempts() {
        let p = platform().fail_next_submissions(5);
        let d = configure_export(&p, mosaic(), ELEV, "elevation", AREA, &target(1)).unwrap();
        let err = submit_export(&p, &d, RetryPolicy::none()).unwrap_err();
        assert!(matches!(err, Error::Network(_)));
        assert_eq!(p.submit_attempts(), 1);
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::new(4, Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }
}
