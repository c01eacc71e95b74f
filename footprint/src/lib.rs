//! Instrument aperture footprints on the sky and on reference images.
//!
//! This crate maps the fixed V2/V3 aperture outlines of the NIRCam and
//! NIRSpec channels onto the celestial sphere for a telescope pointing,
//! repeats them over dither and mosaic offset patterns, and converts the
//! result into DS9 region overlays for a reference image.

pub mod aperture;
pub mod config;
pub mod display;
pub mod error;
pub mod geometry;
pub mod pipeline;
pub mod pivot;
pub mod projector;
pub mod region;
pub mod schedule;
pub mod sources;
pub mod wcs;

pub use aperture::{ApertureCatalog, ApertureChannel, ApertureSource, TableDirectory};
pub use config::{ConfigStore, DisplayConfig, FootprintConfig};
pub use error::{FootprintError, Result};
pub use geometry::{AngularPoint, AttitudeMatrix, Pointing, SkyPoint};
pub use pipeline::{generate, ChannelFailure, ChannelFootprint, ChannelRequest, FootprintRun};
pub use region::{RegionList, RegionShape};
pub use schedule::{DitherMode, OffsetSchedule};
pub use wcs::{FitsHeader, PixelPoint, SkyToPixel, TanWcs};
