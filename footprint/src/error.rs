//! Error taxonomy for footprint generation.

use thiserror::Error;

/// Errors produced while resolving, projecting, or emitting footprints.
#[derive(Error, Debug)]
pub enum FootprintError {
    /// Rotation axis outside 1..=3.
    #[error("invalid rotation axis {axis}: must be 1, 2 or 3")]
    InvalidAxis {
        /// Requested axis.
        axis: u8,
    },

    /// Zero-norm vector handed to the inverse spherical conversion.
    #[error("degenerate vector: norm {norm:.3e} is too small to convert to angles")]
    DegenerateVector {
        /// Norm of the offending vector.
        norm: f64,
    },

    /// Aperture catalog row count does not match the channel layout.
    #[error("catalog shape mismatch for {channel}: expected {expected} rows, found {found}")]
    CatalogShape {
        /// Channel name.
        channel: String,
        /// Rows required by the channel topology (5 per sub-aperture).
        expected: usize,
        /// Rows actually present.
        found: usize,
    },

    /// Aperture table row could not be parsed.
    #[error("malformed aperture table: {0}")]
    ApertureTable(String),

    /// The reference image has no usable world-coordinate transform.
    #[error("invalid world coordinate transform: {0}")]
    InvalidWorldCoordinate(String),

    /// External point-source list is malformed.
    #[error("invalid source catalog: {0}")]
    InvalidCatalog(String),

    /// Dither mode and mosaic request that cannot be combined.
    #[error("unsupported combination: {mode} dither cannot be combined with mosaic")]
    UnsupportedCombination {
        /// Dither mode name.
        mode: String,
    },

    /// Filesystem failure while reading inputs or writing overlays.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed or serialised.
    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FootprintError>;
