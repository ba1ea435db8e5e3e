//! Hex color strings as used by legends and palettes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A validated `#RRGGBB` color.
///
/// Case is kept as written, so legends and palettes echo the caller's
/// input (`#1A5BAB` stays upper case).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(String);

impl HexColor {
    pub fn parse(s: &str) -> Result<Self> {
        let digits = s
            .strip_prefix('#')
            .ok_or_else(|| Error::config(format!("color {s:?} must start with '#'")))?;
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::config(format!(
                "color {s:?} is not of the form #RRGGBB"
            )));
        }
        Ok(HexColor(s.to_string()))
    }

    /// For compile-time tables known to be well formed.
    pub(crate) fn new_unchecked(s: &str) -> Self {
        HexColor(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hex digits without the leading '#', the form Earth Engine palettes take.
    pub fn digits(&self) -> &str {
        &self.0[1..]
    }
}

impl FromStr for HexColor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        HexColor::parse(s)
    }
}

impl TryFrom<String> for HexColor {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        HexColor::parse(&s)
    }
}

impl From<HexColor> for String {
    fn from(c: HexColor) -> Self {
        c.0
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
