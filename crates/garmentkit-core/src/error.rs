//! Error handling for GarmentKit
//!
//! Provides error types for every layer of the design-surface engine:
//! - Asset errors (image fetch/decode)
//! - Snapshot errors (corrupt serialized surfaces)
//! - Model errors (unknown garment models or parts)
//! - Design file errors (persisted designs)
//!
//! All error types use `thiserror` for ergonomic error handling. Every error
//! here is recoverable; none of them is fatal to the hosting application.

use thiserror::Error;

/// Image asset error type
///
/// Raised when an image referenced by a surface insert or a fill texture
/// cannot be fetched or decoded. The caller sees it, state is not touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetLoadError {
    /// The asset source has nothing under this reference
    #[error("Image not found: {image}")]
    NotFound {
        /// The image reference that was requested.
        image: String,
    },

    /// Fetching the bytes failed
    #[error("Failed to fetch image {image}: {reason}")]
    Fetch {
        /// The image reference that was requested.
        image: String,
        /// Why the fetch failed.
        reason: String,
    },

    /// The bytes are not a decodable image
    #[error("Failed to decode image {image}: {reason}")]
    Decode {
        /// The image reference that was requested.
        image: String,
        /// Decoder message.
        reason: String,
    },

    /// The image decoded to zero pixels
    #[error("Image {image} is empty")]
    Empty {
        /// The image reference that was requested.
        image: String,
    },

    /// Upload to the asset store was rejected
    #[error("Upload of {name} failed: {reason}")]
    Upload {
        /// The file name offered for upload.
        name: String,
        /// Why the upload failed.
        reason: String,
    },
}

/// Snapshot error type
///
/// Raised when a serialized surface cannot be turned back into an object
/// graph, either on undo/redo or while loading a design file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeserializeError {
    /// The blob is not valid JSON for a surface
    #[error("Malformed surface snapshot: {0}")]
    Malformed(String),

    /// The blob was written by a newer format
    #[error("Unsupported surface snapshot version {found} (max {supported})")]
    UnsupportedVersion {
        /// Version found in the blob.
        found: u32,
        /// Highest version this build reads.
        supported: u32,
    },

    /// The object list breaks the draw-order rules
    #[error("Invalid draw order: {0}")]
    InvalidDrawOrder(String),
}

/// Stored undo/redo history error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    /// A history must hold at least the current snapshot
    #[error("history has no entries")]
    Empty,

    /// The stored cursor points past the last entry
    #[error("history index {cursor} out of range for {len} entries")]
    CursorOutOfRange {
        /// Stored cursor.
        cursor: usize,
        /// Number of stored entries.
        len: usize,
    },
}

/// Garment model error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// No model with this name is known
    #[error("Unknown garment model: {0}")]
    UnknownModel(String),

    /// The part does not belong to the model
    #[error("Part '{part}' is not part of model '{model}'")]
    UnknownPart {
        /// The model name.
        model: String,
        /// The requested part.
        part: String,
    },
}

/// Design file error type
///
/// A load that fails with any of these leaves the live design untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DesignFileError {
    /// The document is not a valid design file
    #[error("Malformed design file: {0}")]
    Malformed(String),

    /// A stored surface for a part is corrupt
    #[error("Corrupt surface data for part '{part}': {source}")]
    Surface {
        /// The part whose surface failed.
        part: String,
        /// The underlying snapshot error.
        #[source]
        source: DeserializeError,
    },

    /// Stored history for a part is inconsistent
    #[error("Invalid history for part '{part}': {source}")]
    History {
        /// The part whose history failed.
        part: String,
        /// What is wrong with it.
        #[source]
        source: HistoryError,
    },

    /// The design refers to an unknown model or part
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Saving or listing requires a signed-in user
    #[error("No user in session context")]
    Unauthenticated,

    /// No saved design with this name
    #[error("Design not found: {0}")]
    NotFound(String),

    /// Reading or writing the design failed
    #[error("Design I/O error: {0}")]
    Io(String),
}

/// Color parsing error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorError {
    /// The string is not `#rgb` or `#rrggbb`
    #[error("Invalid color '{0}', expected #rrggbb")]
    InvalidHex(String),
}

/// Unified error type for GarmentKit
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Asset error
    #[error(transparent)]
    Asset(#[from] AssetLoadError),

    /// Snapshot error
    #[error(transparent)]
    Deserialize(#[from] DeserializeError),

    /// Model error
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Design file error
    #[error(transparent)]
    DesignFile(#[from] DesignFileError),

    /// Color error
    #[error(transparent)]
    Color(#[from] ColorError),

    /// A referenced element, object or layer does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The operation is not allowed in the current state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a generic error from a message
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Create a not-found error from a message
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}

/// Result type alias using the unified GarmentKit error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_error_display() {
        let err = AssetLoadError::Decode {
            image: "mem://logo.png".to_string(),
            reason: "bad header".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to decode image mem://logo.png: bad header"
        );
    }

    #[test]
    fn test_design_file_error_wraps_surface() {
        let err = DesignFileError::Surface {
            part: "body".to_string(),
            source: DeserializeError::Malformed("eof".to_string()),
        };
        assert!(err.to_string().contains("body"));
        assert!(err.to_string().contains("eof"));
    }

    #[test]
    fn test_error_conversion() {
        let err: Error = AssetLoadError::Empty {
            image: "x".to_string(),
        }
        .into();
        assert!(matches!(err, Error::Asset(_)));

        let err: Error = ModelError::UnknownModel("cape".to_string()).into();
        assert_eq!(err.to_string(), "Unknown garment model: cape");

        let err: DesignFileError = ModelError::UnknownModel("cape".to_string()).into();
        assert!(matches!(err, DesignFileError::Model(_)));
    }
}
