//! In-memory stand-in for the Earth Engine platform.
//!
//! Assets are registered up front; projection lookups evaluate just enough of
//! the expression graph (load, rename, select) to know which band is asked
//! for; submissions are recorded instead of sent. Useful for dry runs and as
//! the fake client in tests.

use chrono::Utc;
use geo::{Area, MultiPolygon};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use crate::collect::ee::expression::{Image, ImageCollection, Region, ValueNode};
use crate::collect::ee::platform::EarthEngine;
use crate::error::{Error, Result};
use crate::geo_core::{BoundingBox, Projection};
use crate::geometric::export::{ExportDescriptor, ExportTask};

#[derive(Debug, Clone)]
struct MemoryImage {
    bands: Vec<String>,
    projection: Option<Projection>,
}

#[derive(Debug, Default)]
pub struct MemoryPlatform {
    collections: HashSet<String>,
    images: HashMap<String, MemoryImage>,
    /// Boundaries are expressed in the export CRS so pixel counts can be checked
    regions: HashMap<String, Option<MultiPolygon<f64>>>,
    rejection: Option<(u16, String)>,
    pending_failures: Cell<u32>,
    lost_responses: Cell<u32>,
    attempts: Cell<u32>,
    request_ids: RefCell<Vec<String>>,
    submitted: RefCell<Vec<ExportDescriptor>>,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        MemoryPlatform::default()
    }

    pub fn with_collection(mut self, collection_id: &str) -> Self {
        self.collections.insert(collection_id.to_string());
        self
    }

    pub fn with_image(mut self, image_id: &str, bands: &[&str], projection: Projection) -> Self {
        self.images.insert(
            image_id.to_string(),
            MemoryImage {
                bands: bands.iter().map(|b| b.to_string()).collect(),
                projection: Some(projection),
            },
        );
        self
    }

    /// An image whose projection metadata is missing
    pub fn with_unprojected_image(mut self, image_id: &str, bands: &[&str]) -> Self {
        self.images.insert(
            image_id.to_string(),
            MemoryImage {
                bands: bands.iter().map(|b| b.to_string()).collect(),
                projection: None,
            },
        );
        self
    }

    pub fn with_region(mut self, table_id: &str, boundary: Option<MultiPolygon<f64>>) -> Self {
        self.regions.insert(table_id.to_string(), boundary);
        self
    }

    /// Every submission is rejected by the queue
    pub fn reject_exports(mut self, status: u16, message: &str) -> Self {
        self.rejection = Some((status, message.to_string()));
        self
    }

    /// The next `n` submissions fail with a transport error
    pub fn fail_next_submissions(self, n: u32) -> Self {
        self.pending_failures.set(n);
        self
    }

    /// The next `n` submissions are enqueued but their response never arrives
    pub fn lose_next_responses(self, n: u32) -> Self {
        self.lost_responses.set(n);
        self
    }

    pub fn submit_attempts(&self) -> u32 {
        self.attempts.get()
    }

    /// Request id of every attempt, in order
    pub fn request_ids(&self) -> Vec<String> {
        self.request_ids.borrow().clone()
    }

    /// Enqueued jobs; a request id is enqueued at most once
    pub fn submitted(&self) -> Vec<ExportDescriptor> {
        self.submitted.borrow().clone()
    }

    /// Image loaded at the root of `node` and the bands visible at `node`,
    /// following loads and renames
    fn bands_of(&self, asset_id: &str, node: &ValueNode) -> Result<(String, Vec<String>)> {
        let fail = |reason: String| Error::ProjectionResolution {
            asset_id: asset_id.to_string(),
            reason,
        };
        let input = || {
            node.argument("input")
                .ok_or_else(|| fail("missing input argument".to_string()))
        };

        match node.function_name() {
            Some("Image.load") => {
                let id = node
                    .argument("id")
                    .and_then(ValueNode::as_constant)
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| fail("Image.load without id".to_string()))?;
                self.images
                    .get(id)
                    .map(|img| (id.to_string(), img.bands.clone()))
                    .ok_or_else(|| Error::AssetNotFound {
                        asset_id: id.to_string(),
                    })
            }
            Some("Image.rename") => {
                let (id, current) = self.bands_of(asset_id, input()?)?;
                let names = string_list(node.argument("names"));
                if names.len() != current.len() {
                    return Err(fail(format!(
                        "cannot rename {} band(s) to {} name(s)",
                        current.len(),
                        names.len()
                    )));
                }
                Ok((id, names))
            }
            Some("Image.select") => {
                let (id, current) = self.bands_of(asset_id, input()?)?;
                let wanted = string_list(node.argument("bandSelectors"));
                for band in &wanted {
                    if !current.contains(band) {
                        return Err(fail(format!(
                            "band {:?} not found, available: {:?}",
                            band, current
                        )));
                    }
                }
                Ok((id, wanted))
            }
            other => Err(fail(format!("unsupported function {:?}", other))),
        }
    }

    fn check_region(&self, descriptor: &ExportDescriptor) -> Result<()> {
        let boundary = self
            .regions
            .get(&descriptor.region.table_id)
            .cloned()
            .flatten();
        let Some(boundary) = boundary else {
            return Ok(());
        };

        if boundary.unsigned_area() == 0.0 {
            return Err(Error::ExportSubmission {
                status: 400,
                message: "malformed region geometry: boundary has no area".to_string(),
            });
        }
        if let Some(bbox) = BoundingBox::of(&boundary) {
            let pixels = bbox.pixel_count(&descriptor.crs_transform);
            if pixels > descriptor.max_pixels as f64 {
                return Err(Error::ExportSubmission {
                    status: 400,
                    message: format!(
                        "Too many pixels in the region. Specified maxPixels: {}, need: {}",
                        descriptor.max_pixels, pixels
                    ),
                });
            }
        }
        Ok(())
    }
}

fn string_list(node: Option<&ValueNode>) -> Vec<String> {
    node.and_then(ValueNode::as_constant)
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|s| s.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

impl EarthEngine for MemoryPlatform {
    fn load_collection(&self, collection_id: &str) -> Result<ImageCollection> {
        if !self.collections.contains(collection_id) {
            return Err(Error::AssetNotFound {
                asset_id: collection_id.to_string(),
            });
        }
        Ok(ImageCollection::load(collection_id))
    }

    fn load_image(&self, image_id: &str) -> Result<Image> {
        if !self.images.contains_key(image_id) {
            return Err(Error::AssetNotFound {
                asset_id: image_id.to_string(),
            });
        }
        Ok(Image::load(image_id))
    }

    fn load_region(&self, table_id: &str) -> Result<Region> {
        if !self.regions.contains_key(table_id) {
            return Err(Error::AssetNotFound {
                asset_id: table_id.to_string(),
            });
        }
        Ok(Region::asset(table_id))
    }

    fn projection(&self, asset_id: &str, image: &Image) -> Result<Projection> {
        let (loaded_id, bands) = self.bands_of(asset_id, &image.node)?;
        if bands.is_empty() {
            return Err(Error::ProjectionResolution {
                asset_id: asset_id.to_string(),
                reason: "image has no bands".to_string(),
            });
        }
        self.images
            .get(&loaded_id)
            .and_then(|img| img.projection.clone())
            .ok_or_else(|| Error::ProjectionResolution {
                asset_id: asset_id.to_string(),
                reason: "no projection metadata".to_string(),
            })
    }

    fn submit_export(&self, descriptor: &ExportDescriptor) -> Result<ExportTask> {
        self.attempts.set(self.attempts.get() + 1);
        self.request_ids
            .borrow_mut()
            .push(descriptor.request_id.clone());

        let pending = self.pending_failures.get();
        if pending > 0 {
            self.pending_failures.set(pending - 1);
            return Err(Error::Network("connection reset by peer".to_string()));
        }
        if let Some((status, ref message)) = self.rejection {
            return Err(Error::ExportSubmission {
                status,
                message: message.clone(),
            });
        }

        let existing = self
            .submitted
            .borrow()
            .iter()
            .position(|d| d.request_id == descriptor.request_id);
        let index = match existing {
            Some(index) => index,
            None => {
                self.check_region(descriptor)?;
                let mut submitted = self.submitted.borrow_mut();
                submitted.push(descriptor.clone());
                submitted.len() - 1
            }
        };

        let lost = self.lost_responses.get();
        if lost > 0 {
            self.lost_responses.set(lost - 1);
            return Err(Error::Network("operation timed out".to_string()));
        }
        Ok(ExportTask {
            name: format!("projects/memory/operations/EXPORT{:04}", index + 1),
            description: descriptor.description.clone(),
            destination: descriptor.destination_uri(),
            submitted_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometric::export::ExportTarget;
    use geo::polygon;

    const ELEV: &str = "projects/p/assets/elev";

    fn albers() -> Projection {
        Projection::new("EPSG:3338", [10.0, 0.0, 0.0, 0.0, -10.0, 0.0])
    }

    #[test]
    fn test_unknown_assets_not_found() {
        let p = MemoryPlatform::new();
        assert!(matches!(p.load_collection("c"), Err(Error::AssetNotFound { .. })));
        assert!(matches!(p.load_image("i"), Err(Error::AssetNotFound { .. })));
        assert!(matches!(p.load_region("r"), Err(Error::AssetNotFound { .. })));
    }

    #[test]
    fn test_projection_after_rename_select() {
        let p = MemoryPlatform::new().with_image(ELEV, &["b1"], albers());
        let image = p.load_image(ELEV).unwrap().rename(&["elevation"]).select("elevation");
        assert_eq!(p.projection(ELEV, &image).unwrap(), albers());
    }

    #[test]
    fn test_projection_follows_loaded_image() {
        let geographic = Projection::new("EPSG:4326", [0.0001, 0.0, -150.0, 0.0, -0.0001, 70.0]);
        let p = MemoryPlatform::new()
            .with_image("a", &["b1"], albers())
            .with_image("b", &["b1"], geographic);
        let image = p.load_image("a").unwrap().rename(&["elevation"]).select("elevation");
        assert_eq!(p.projection("b", &image).unwrap(), albers());
    }

    #[test]
    fn test_projection_missing_band() {
        let p = MemoryPlatform::new().with_image(ELEV, &["b1"], albers());
        let image = p.load_image(ELEV).unwrap().select("elevation");
        let err = p.projection(ELEV, &image).unwrap_err();
        assert!(matches!(err, Error::ProjectionResolution { .. }));
        assert!(err.to_string().contains("\"elevation\" not found"));
    }

    #[test]
    fn test_projection_rename_count_mismatch() {
        let p = MemoryPlatform::new().with_image(ELEV, &["b1", "b2"], albers());
        let image = p.load_image(ELEV).unwrap().rename(&["elevation"]).select("elevation");
        assert!(matches!(
            p.projection(ELEV, &image),
            Err(Error::ProjectionResolution { .. })
        ));
    }

    #[test]
    fn test_projection_metadata_missing() {
        let p = MemoryPlatform::new().with_unprojected_image(ELEV, &["b1"]);
        let image = p.load_image(ELEV).unwrap().rename(&["elevation"]).select("elevation");
        let err = p.projection(ELEV, &image).unwrap_err();
        assert!(err.to_string().contains("no projection metadata"));
    }

    fn descriptor(region: Region, max_pixels: u64) -> ExportDescriptor {
        ExportDescriptor::new(
            Image::load("img"),
            &albers(),
            region,
            &ExportTarget::new("d", "bucket", "prefix", max_pixels),
        )
        .unwrap()
    }

    #[test]
    fn test_region_pixel_budget() {
        // 1 km x 1 km at 10 m = 10 000 pixels
        let square = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 1000.0, y: 0.0),
            (x: 1000.0, y: 1000.0),
            (x: 0.0, y: 1000.0),
        ]]);
        let p = MemoryPlatform::new().with_region("area", Some(square));
        assert!(p.submit_export(&descriptor(Region::asset("area"), 10_000)).is_ok());
        let err = p
            .submit_export(&descriptor(Region::asset("area"), 9_999))
            .unwrap_err();
        assert!(err.to_string().contains("Too many pixels"));
        assert_eq!(p.submitted().len(), 1);
    }

    #[test]
    fn test_degenerate_region_rejected() {
        let line = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 2.0, y: 2.0),
        ]]);
        let p = MemoryPlatform::new().with_region("line", Some(line));
        let err = p.submit_export(&descriptor(Region::asset("line"), 100)).unwrap_err();
        assert!(matches!(err, Error::ExportSubmission { status: 400, .. }));
    }

    #[test]
    fn test_same_request_id_enqueued_once() {
        let p = MemoryPlatform::new().with_region("area", None);
        let d = descriptor(Region::asset("area"), 1);
        let first = p.submit_export(&d).unwrap();
        let second = p.submit_export(&d).unwrap();
        assert_eq!(first.name, "projects/memory/operations/EXPORT0001");
        assert_eq!(p.submit_attempts(), 2);
        assert_eq!(first.destination, "gs://bucket/prefix.tif");
        assert_eq!(p.submitted().len(), 1);
        assert_eq!(first.name, second.name);
    }

    #[test]
    fn test_distinct_descriptors_enqueue_separately() {
        let p = MemoryPlatform::new().with_region("area", None);
        let first = p.submit_export(&descriptor(Region::asset("area"), 1)).unwrap();
        let second = p.submit_export(&descriptor(Region::asset("area"), 1)).unwrap();
        assert_eq!(first.name, "projects/memory/operations/EXPORT0001");
        assert_eq!(second.name, "projects/memory/operations/EXPORT0002");
        assert_eq!(p.submitted().len(), 2);
    }
}
