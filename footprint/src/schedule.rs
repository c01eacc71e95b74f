//! Dither and mosaic offset schedules.
//!
//! A schedule is the ordered list of pivot displacements `(Δv2, Δv3)` in
//! arcseconds, one per repeated footprint instance. Order matters: downstream
//! consumers label instances by position.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{FootprintError, Result};
use crate::geometry::AngularPoint;

const THREE_POINT: [(f64, f64); 3] = [(0.0, 0.0), (-58.0, -23.5), (58.0, 23.5)];
const THREE_POINT_TIGHT: [(f64, f64); 3] = [(0.0, 0.0), (-58.0, -7.5), (58.0, 7.5)];
const SIX_POINT: [(f64, f64); 6] = [
    (-72.0, -30.0),
    (-43.0, -18.0),
    (-14.0, -6.0),
    (15.0, 6.0),
    (44.0, 18.0),
    (73.0, 30.0),
];

/// Named dither pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DitherMode {
    /// Single pointing
    #[default]
    #[value(alias = "no")]
    #[serde(alias = "no", alias = "None")]
    None,
    /// Three points spread along the detector diagonal
    #[value(alias = "three")]
    #[serde(alias = "three", alias = "Three")]
    ThreePoint,
    /// Three points with a compressed V3 spread
    #[value(alias = "threetight")]
    #[serde(alias = "threetight", alias = "Threetight")]
    ThreePointTight,
    /// Six points; cannot be combined with a mosaic
    #[value(alias = "six")]
    #[serde(alias = "six", alias = "Six")]
    SixPoint,
}

impl DitherMode {
    /// Base offsets for this mode, before any mosaic replication
    fn base_offsets(&self) -> &'static [(f64, f64)] {
        match self {
            DitherMode::None => &[(0.0, 0.0)],
            DitherMode::ThreePoint => &THREE_POINT,
            DitherMode::ThreePointTight => &THREE_POINT_TIGHT,
            DitherMode::SixPoint => &SIX_POINT,
        }
    }

    /// Shift applied to the channel pivot before the schedule is expanded.
    ///
    /// The six-point pattern is not symmetric about zero, so its pivot moves
    /// to the midpoint of the first and last offsets. Other modes keep the
    /// pivot where it is.
    pub fn pivot_recentering(&self) -> AngularPoint {
        match self {
            DitherMode::SixPoint => {
                let (first_v2, first_v3) = SIX_POINT[0];
                let (last_v2, last_v3) = SIX_POINT[SIX_POINT.len() - 1];
                AngularPoint::new(first_v2, first_v3)
                    .midpoint(&AngularPoint::new(last_v2, last_v3))
            }
            _ => AngularPoint::default(),
        }
    }

    /// Tag used in region file names
    pub fn file_tag(&self) -> &'static str {
        match self {
            DitherMode::None => "no",
            DitherMode::ThreePoint => "three",
            DitherMode::ThreePointTight => "threetight",
            DitherMode::SixPoint => "six",
        }
    }
}

impl fmt::Display for DitherMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DitherMode::None => write!(f, "none"),
            DitherMode::ThreePoint => write!(f, "three-point"),
            DitherMode::ThreePointTight => write!(f, "three-point-tight"),
            DitherMode::SixPoint => write!(f, "six-point"),
        }
    }
}

/// Ordered pivot displacements, arcseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct OffsetSchedule {
    mode: DitherMode,
    mosaic_shift: Option<AngularPoint>,
    entries: Vec<AngularPoint>,
}

impl OffsetSchedule {
    /// Build the schedule for `mode`, optionally replicated as a mosaic.
    ///
    /// With `mosaic_shift`, every base offset is repeated once more translated
    /// by the shift, doubling the schedule length.
    ///
    /// # Errors
    /// [`FootprintError::UnsupportedCombination`] for six-point with a mosaic.
    pub fn new(mode: DitherMode, mosaic_shift: Option<AngularPoint>) -> Result<Self> {
        if mode == DitherMode::SixPoint && mosaic_shift.is_some() {
            return Err(FootprintError::UnsupportedCombination {
                mode: mode.to_string(),
            });
        }

        let base: Vec<AngularPoint> = mode
            .base_offsets()
            .iter()
            .map(|&(dv2, dv3)| AngularPoint::new(dv2, dv3))
            .collect();

        let mut entries = base.clone();
        if let Some(shift) = mosaic_shift {
            entries.extend(base.iter().map(|p| p.offset(shift.v2, shift.v3)));
        }

        Ok(Self {
            mode,
            mosaic_shift,
            entries,
        })
    }

    pub fn mode(&self) -> DitherMode {
        self.mode
    }

    /// User shift of the second mosaic pointing, if any
    pub fn mosaic_shift(&self) -> Option<AngularPoint> {
        self.mosaic_shift
    }

    pub fn is_mosaic(&self) -> bool {
        self.mosaic_shift.is_some()
    }

    pub fn entries(&self) -> &[AngularPoint] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tag used in region file names (`no`, `three`, ..., or `mosaic`)
    pub fn file_tag(&self) -> &'static str {
        if self.is_mosaic() {
            "mosaic"
        } else {
            self.mode.file_tag()
        }
    }
}
