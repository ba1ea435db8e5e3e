use crate::collect::ee::expression::{Image, ImageCollection, Region};
use crate::error::Result;
use crate::geo_core::Projection;
use crate::geometric::export::{ExportDescriptor, ExportTask};

/// The remote geospatial platform the pipeline delegates to
///
/// Loading returns lazy handles but checks that the asset exists first, so a
/// bad path aborts the run before anything is exported.
pub trait EarthEngine {
    /// Load an image collection asset
    fn load_collection(&self, collection_id: &str) -> Result<ImageCollection>;

    /// Load a single image asset
    fn load_image(&self, image_id: &str) -> Result<Image>;

    /// Load a feature collection asset as a clipping region
    fn load_region(&self, table_id: &str) -> Result<Region>;

    /// Blocking round-trip: evaluate the projection of `image`
    /// `asset_id` names the source asset in errors.
    fn projection(&self, asset_id: &str, image: &Image) -> Result<Projection>;

    /// Enqueue an export job and return as soon as it is accepted
    fn submit_export(&self, descriptor: &ExportDescriptor) -> Result<ExportTask>;
}

impl<T: EarthEngine + ?Sized> EarthEngine for &T {
    fn load_collection(&self, collection_id: &str) -> Result<ImageCollection> {
        (**self).load_collection(collection_id)
    }

    fn load_image(&self, image_id: &str) -> Result<Image> {
        (**self).load_image(image_id)
    }

    fn load_region(&self, table_id: &str) -> Result<Region> {
        (**self).load_region(table_id)
    }

    fn projection(&self, asset_id: &str, image: &Image) -> Result<Projection> {
        (**self).projection(asset_id, image)
    }

    fn submit_export(&self, descriptor: &ExportDescriptor) -> Result<ExportTask> {
        (**self).submit_export(descriptor)
    }
}
