//! Land-cover map legend and Cloud-Optimized GeoTIFF export over Earth Engine.
//!
//! The heavy lifting (mosaicking, reprojection, writing to Cloud Storage)
//! happens on the platform; this crate builds the legend and map layer,
//! resolves the target grid from a reference raster, and submits the export.

pub mod collect;
pub mod commons;
pub mod config;
pub mod error;
pub mod geo_core;
pub mod geometric;
pub mod pipeline;

pub use collect::ee::platform::EarthEngine;
pub use collect::memory::MemoryPlatform;
pub use config::Config;
pub use error::{Error, Result};
