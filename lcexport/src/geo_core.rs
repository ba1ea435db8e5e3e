use geo::{BoundingRect, MultiPolygon};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Affine coefficients mapping pixel (col, row) to projected (x, y)
/// Same ordering as Earth Engine and GDAL world files:
/// `[scale_x, shear_x, translate_x, shear_y, scale_y, translate_y]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 6]", into = "[f64; 6]")]
pub struct AffineTransform {
    pub scale_x: f64,
    pub shear_x: f64,
    pub translate_x: f64,
    pub shear_y: f64,
    pub scale_y: f64,
    pub translate_y: f64,
}

impl AffineTransform {
    pub fn new(coefficients: [f64; 6]) -> Self {
        let [scale_x, shear_x, translate_x, shear_y, scale_y, translate_y] = coefficients;
        AffineTransform {
            scale_x,
            shear_x,
            translate_x,
            shear_y,
            scale_y,
            translate_y,
        }
    }

    pub fn coefficients(&self) -> [f64; 6] {
        [
            self.scale_x,
            self.shear_x,
            self.translate_x,
            self.shear_y,
            self.scale_y,
            self.translate_y,
        ]
    }

    /// Area covered by one pixel, in squared CRS units
    pub fn pixel_area(&self) -> f64 {
        (self.scale_x * self.scale_y - self.shear_x * self.shear_y).abs()
    }

    pub fn is_finite(&self) -> bool {
        self.coefficients().iter().all(|c| c.is_finite())
    }
}

impl From<[f64; 6]> for AffineTransform {
    fn from(c: [f64; 6]) -> Self {
        AffineTransform::new(c)
    }
}

impl From<AffineTransform> for [f64; 6] {
    fn from(t: AffineTransform) -> Self {
        t.coefficients()
    }
}

/// Projection descriptor read from a reference raster
/// Matches the `getInfo()` payload of an Earth Engine `Projection`:
/// `{"type": "Projection", "crs": "EPSG:3338", "transform": [...]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub crs: String,
    pub transform: AffineTransform,
}

impl Projection {
    pub fn new(crs: impl Into<String>, transform: [f64; 6]) -> Self {
        Projection {
            crs: crs.into(),
            transform: AffineTransform::new(transform),
        }
    }

    /// Parse the `result` of a `value:compute` call on `Image.projection`
    pub fn from_info(asset_id: &str, info: &serde_json::Value) -> Result<Self> {
        let fail = |reason: String| Error::ProjectionResolution {
            asset_id: asset_id.to_string(),
            reason,
        };

        let crs = info
            .get("crs")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| fail("projection has no crs".to_string()))?;

        let coefficients: Vec<f64> = info
            .get("transform")
            .and_then(|v| v.as_array())
            .ok_or_else(|| fail("projection has no transform".to_string()))?
            .iter()
            .map(|v| v.as_f64())
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| fail("transform has non-numeric coefficients".to_string()))?;

        let coefficients: [f64; 6] = coefficients
            .try_into()
            .map_err(|v: Vec<f64>| fail(format!("transform has {} coefficients, expected 6", v.len())))?;

        let projection = Projection::new(crs, coefficients);
        if !projection.transform.is_finite() || projection.transform.pixel_area() == 0.0 {
            return Err(fail("transform is degenerate".to_string()));
        }
        Ok(projection)
    }
}

/// Bounding box structure
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        BoundingBox {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn of(boundary: &MultiPolygon<f64>) -> Option<Self> {
        boundary
            .bounding_rect()
            .map(|r| BoundingBox::new(r.min().x, r.min().y, r.max().x, r.max().y))
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Pixels needed to cover the box on the grid of `transform`
    /// Assumes the box is expressed in the same CRS as the transform.
    pub fn pixel_count(&self, transform: &AffineTransform) -> f64 {
        (self.width() * self.height() / transform.pixel_area()).ceil()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;
    use serde_json::json;

    #[test]
    fn test_projection_from_info() {
        let info = json!({
            "type": "Projection",
            "crs": "EPSG:3338",
            "transform": [10.0, 0.0, 297000.0, 0.0, -10.0, 1740000.0]
        });
        let p = Projection::from_info("elev", &info).unwrap();
        assert_eq!(p.crs, "EPSG:3338");
        assert_eq!(
            p.transform.coefficients(),
            [10.0, 0.0, 297000.0, 0.0, -10.0, 1740000.0]
        );
    }

    #[test]
    fn test_projection_from_info_rejects_short_transform() {
        let info = json!({"crs": "EPSG:3338", "transform": [10.0, 0.0, 1.0]});
        let err = Projection::from_info("elev", &info).unwrap_err();
        assert!(matches!(err, Error::ProjectionResolution { .. }));
        assert!(err.to_string().contains("3 coefficients"));
    }

    #[test]
    fn test_projection_from_info_rejects_missing_crs() {
        let info = json!({"transform": [10.0, 0.0, 1.0, 0.0, -10.0, 2.0]});
        assert!(Projection::from_info("elev", &info).is_err());
    }

    #[test]
    fn test_pixel_area() {
        let t = AffineTransform::new([10.0, 0.0, 100.0, 0.0, -10.0, 500.0]);
        assert_eq!(t.pixel_area(), 100.0);
    }

    #[test]
    fn test_transform_serializes_as_array() {
        let t = AffineTransform::new([10.0, 0.0, 1.0, 0.0, -10.0, 2.0]);
        assert_eq!(
            serde_json::to_value(t).unwrap(),
            json!([10.0, 0.0, 1.0, 0.0, -10.0, 2.0])
        );
    }

    #[test]
    fn test_bounding_box_pixel_count() {
        let boundary = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 1000.0, y: 0.0),
            (x: 1000.0, y: 500.0),
            (x: 0.0, y: 500.0),
        ]]);
        let bbox = BoundingBox::of(&boundary).unwrap();
        assert_eq!(bbox, BoundingBox::new(0.0, 0.0, 1000.0, 500.0));
        let t = AffineTransform::new([10.0, 0.0, 0.0, 0.0, -10.0, 500.0]);
        assert_eq!(bbox.pixel_count(&t), 5000.0);
    }
}
