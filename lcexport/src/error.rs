//! Error types for the land-cover export pipeline.

use thiserror::Error;

/// Errors produced while building the legend, resolving assets or exporting.
#[derive(Error, Debug)]
pub enum Error {
    #[error("asset not found: {asset_id}")]
    AssetNotFound { asset_id: String },

    #[error("cannot resolve projection of {asset_id}: {reason}")]
    ProjectionResolution { asset_id: String, reason: String },

    #[error("export submission rejected ({status}): {message}")]
    ExportSubmission { status: u16, message: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Only transport failures are worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Network(_))
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }
}

#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Network(e.to_string())
    }
}

/// Result alias for lcexport operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_is_transient() {
        assert!(Error::Network("connection reset".into()).is_transient());
        assert!(!Error::AssetNotFound {
            asset_id: "projects/a/b".into()
        }
        .is_transient());
        assert!(!Error::ExportSubmission {
            status: 429,
            message: "quota".into()
        }
        .is_transient());
    }

    #[test]
    fn test_display() {
        let e = Error::config("2 names but 3 colors");
        assert_eq!(e.to_string(), "configuration error: 2 names but 3 colors");
    }
}
