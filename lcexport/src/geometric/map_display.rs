use serde::Serialize;

use crate::collect::ee::expression::Image;
use crate::commons::color::HexColor;
use crate::error::{Error, Result};
use crate::geometric::land_cover::CategoryDictionary;
use crate::geometric::legend::{Legend, Panel};

/// Visualization parameters for a categorical layer
/// Class code `c` in [min, max] is drawn with `palette[c - min]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisParams {
    pub min: i64,
    pub max: i64,
    pub palette: Vec<HexColor>,
}

impl VisParams {
    /// Validated parameters; the palette needs exactly one color per class code
    pub fn new(min: i64, max: i64, palette: Vec<HexColor>) -> Result<Self> {
        if max < min {
            return Err(Error::config(format!(
                "visualization range [{}, {}] is empty",
                min, max
            )));
        }
        let expected = max
            .checked_sub(min)
            .and_then(|span| span.checked_add(1))
            .and_then(|count| usize::try_from(count).ok())
            .ok_or_else(|| {
                Error::config(format!(
                    "visualization range [{}, {}] has too many class codes",
                    min, max
                ))
            })?;
        if palette.len() != expected {
            return Err(Error::config(format!(
                "palette has {} colors but range [{}, {}] has {} class codes",
                palette.len(),
                min,
                max,
                expected
            )));
        }
        Ok(VisParams { min, max, palette })
    }

    /// Codes 1..=N colored by the dictionary's colors, in order
    pub fn for_categories(dict: &CategoryDictionary) -> Result<Self> {
        VisParams::new(1, dict.len() as i64, dict.colors().to_vec())
    }

    pub fn color_for(&self, code: i64) -> Option<&HexColor> {
        if code < self.min || code > self.max {
            return None;
        }
        let index = usize::try_from(code.checked_sub(self.min)?).ok()?;
        self.palette.get(index)
    }

    /// Earth Engine's `palette` form: comma separated hex digits
    pub fn palette_string(&self) -> String {
        self.palette
            .iter()
            .map(HexColor::digits)
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapLayer {
    pub name: String,
    pub image: Image,
    pub vis: VisParams,
    pub shown: bool,
}

/// An interactive map session: image layers plus overlay panels
/// Dropped with the session; nothing here is persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MapView {
    layers: Vec<MapLayer>,
    overlays: Vec<Panel>,
}

impl MapView {
    pub fn new() -> Self {
        MapView::default()
    }

    pub fn add_layer(&mut self, image: Image, vis: VisParams, name: &str) -> &MapLayer {
        tracing::debug!("Adding layer {:?} ({})", name, image.label);
        self.layers.push(MapLayer {
            name: name.to_string(),
            image,
            vis,
            shown: true,
        });
        &self.layers[self.layers.len() - 1]
    }

    /// Attach an overlay panel; the map takes ownership
    pub fn add(&mut self, panel: Panel) {
        self.overlays.push(panel);
    }

    pub fn add_legend(&mut self, legend: Legend) {
        self.add(legend.into_panel());
    }

    pub fn layers(&self) -> &[MapLayer] {
        &self.layers
    }

    pub fn layer(&self, name: &str) -> Option<&MapLayer> {
        self.layers.iter().find(|l| l.name == name)
    }

    pub fn overlays(&self) -> &[Panel] {
        &self.overlays
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
