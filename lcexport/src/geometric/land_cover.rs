use serde::{Deserialize, Serialize};

use crate::commons::color::HexColor;
use crate::error::{Error, Result};

/// ESRI 2020 Global Land Use / Land Cover class codes
/// Name                 Code  Color
/// Water                  1   #1A5BAB
/// Trees                  2   #358221
/// Grass                  3   #A7D282
/// Flooded Vegetation     4   #87D19E
/// Crops                  5   #FFDB5C
/// Scrub/Shrub            6   #EECFA8
/// Built Area             7   #ED022A
/// Bare Ground            8   #EDE9E4
/// Snow/Ice               9   #F2FAFF
/// Clouds                10   #C8C8C8
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LandCoverClass {
    Water = 1,
    Trees = 2,
    Grass = 3,
    FloodedVegetation = 4,
    Crops = 5,
    ScrubShrub = 6,
    BuiltArea = 7,
    BareGround = 8,
    SnowIce = 9,
    Clouds = 10,
}

impl LandCoverClass {
    pub const ALL: [LandCoverClass; 10] = [
        LandCoverClass::Water,
        LandCoverClass::Trees,
        LandCoverClass::Grass,
        LandCoverClass::FloodedVegetation,
        LandCoverClass::Crops,
        LandCoverClass::ScrubShrub,
        LandCoverClass::BuiltArea,
        LandCoverClass::BareGround,
        LandCoverClass::SnowIce,
        LandCoverClass::Clouds,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            LandCoverClass::Water => "Water",
            LandCoverClass::Trees => "Trees",
            LandCoverClass::Grass => "Grass",
            LandCoverClass::FloodedVegetation => "Flooded Vegetation",
            LandCoverClass::Crops => "Crops",
            LandCoverClass::ScrubShrub => "Scrub/Shrub",
            LandCoverClass::BuiltArea => "Built Area",
            LandCoverClass::BareGround => "Bare Ground",
            LandCoverClass::SnowIce => "Snow/Ice",
            LandCoverClass::Clouds => "Clouds",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            LandCoverClass::Water => "#1A5BAB",
            LandCoverClass::Trees => "#358221",
            LandCoverClass::Grass => "#A7D282",
            LandCoverClass::FloodedVegetation => "#87D19E",
            LandCoverClass::Crops => "#FFDB5C",
            LandCoverClass::ScrubShrub => "#EECFA8",
            LandCoverClass::BuiltArea => "#ED022A",
            LandCoverClass::BareGround => "#EDE9E4",
            LandCoverClass::SnowIce => "#F2FAFF",
            LandCoverClass::Clouds => "#C8C8C8",
        }
    }
}

impl TryFrom<u8> for LandCoverClass {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        LandCoverClass::ALL
            .iter()
            .copied()
            .find(|c| c.code() == code)
            .ok_or_else(|| Error::config(format!("{} is not an ESRI 2020 class code", code)))
    }
}

/// Raw form of a category dictionary, as written in config files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryLists {
    pub names: Vec<String>,
    pub colors: Vec<String>,
}

/// Index-aligned category names and colors
/// Entry i describes class code `i + 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CategoryLists", into = "CategoryLists")]
pub struct CategoryDictionary {
    names: Vec<String>,
    colors: Vec<HexColor>,
}

impl CategoryDictionary {
    /// Build a dictionary, failing fast when the lists differ in length
    pub fn new<N, C>(names: Vec<N>, colors: Vec<C>) -> Result<Self>
    where
        N: Into<String>,
        C: AsRef<str>,
    {
        if names.len() != colors.len() {
            return Err(Error::config(format!(
                "category dictionary has {} names but {} colors",
                names.len(),
                colors.len()
            )));
        }
        let colors = colors
            .iter()
            .map(|c| HexColor::parse(c.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(CategoryDictionary {
            names: names.into_iter().map(Into::into).collect(),
            colors,
        })
    }

    /// The ten ESRI 2020 classes, in class-code order
    pub fn esri_lulc_2020() -> Self {
        CategoryDictionary {
            names: LandCoverClass::ALL.iter().map(|c| c.name().to_string()).collect(),
            colors: LandCoverClass::ALL
                .iter()
                .map(|c| HexColor::new_unchecked(c.color()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn colors(&self) -> &[HexColor] {
        &self.colors
    }

    /// (color, name) pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&HexColor, &str)> {
        self.colors
            .iter()
            .zip(self.names.iter().map(String::as_str))
    }
}

impl TryFrom<CategoryLists> for CategoryDictionary {
    type Error = Error;

    fn try_from(lists: CategoryLists) -> Result<Self> {
        CategoryDictionary::new(lists.names, lists.colors)
    }
}

impl From<CategoryDictionary> for CategoryLists {
    fn from(dict: CategoryDictionary) -> Self {
        CategoryLists {
            names: dict.names,
            colors: dict.colors.into_iter().map(String::from).collect(),
        }
    }
}

impl Default for CategoryDictionary {
    fn default() -> Self {
        CategoryDictionary::esri_lulc_2020()
    }
}
