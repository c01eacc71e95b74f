//! Geometry kernel for mapping instrument-local angles onto the sky.
//!
//! Three frames meet here:
//!
//! - **V2/V3**: the instrument-local angular frame, in arcseconds
//! - **Unit sphere**: Cartesian unit vectors built from Euler angles in degrees
//! - **Sky**: right ascension and declination, in degrees
//!
//! The [`AttitudeMatrix`] ties them together for one fixed pointing. It maps the
//! unit vector of a V2/V3 position to the unit vector of the sky position it
//! lands on, following the pointing model of JWST-STScI-001550 (SM-12, §6.1).
//!
//! Everything in this module is a pure function of its inputs.
//!
//! # Examples
//!
//! ```rust
//! use footprint::geometry::{AngularPoint, AttitudeMatrix, Pointing};
//!
//! let pivot = AngularPoint::new(87.0, -498.0);
//! let pointing = Pointing::new(202.47, 47.2, 30.0);
//! let attitude = AttitudeMatrix::new(pivot, &pointing);
//!
//! // The pivot always lands on the target
//! let sky = attitude.project(pivot).unwrap();
//! assert!((sky.ra - 202.47).abs() < 1e-9);
//! assert!((sky.dec - 47.2).abs() < 1e-9);
//! ```

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{FootprintError, Result};

/// Arcseconds per degree
pub const ARCSEC_PER_DEG: f64 = 3600.0;

/// Position in the instrument-local V2/V3 frame, arcseconds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AngularPoint {
    /// V2 coordinate in arcseconds
    pub v2: f64,
    /// V3 coordinate in arcseconds
    pub v3: f64,
}

impl AngularPoint {
    pub fn new(v2: f64, v3: f64) -> Self {
        Self { v2, v3 }
    }

    /// Point halfway between `self` and `other`
    pub fn midpoint(&self, other: &AngularPoint) -> AngularPoint {
        AngularPoint::new((self.v2 + other.v2) / 2.0, (self.v3 + other.v3) / 2.0)
    }

    /// This point displaced by `(dv2, dv3)` arcseconds
    pub fn offset(&self, dv2: f64, dv3: f64) -> AngularPoint {
        AngularPoint::new(self.v2 + dv2, self.v3 + dv3)
    }
}

/// Position on the celestial sphere, degrees.
///
/// `ra` lies in `[0, 360)` and `dec` in `[-90, 90]` when produced by
/// [`to_angles`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkyPoint {
    /// Right ascension in degrees
    pub ra: f64,
    /// Declination in degrees
    pub dec: f64,
}

impl SkyPoint {
    pub fn new(ra: f64, dec: f64) -> Self {
        Self { ra, dec }
    }
}

/// Telescope pointing: where the pivot lands and how the frame is rolled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pointing {
    /// Target right ascension in degrees
    pub ra: f64,
    /// Target declination in degrees
    pub dec: f64,
    /// Position angle of the instrument frame relative to sky north, degrees
    pub position_angle: f64,
}

impl Pointing {
    pub fn new(ra: f64, dec: f64, position_angle: f64) -> Self {
        Self {
            ra,
            dec,
            position_angle,
        }
    }

    /// Sky position of the target itself
    pub fn target(&self) -> SkyPoint {
        SkyPoint::new(self.ra, self.dec)
    }
}

/// Rotation axis of a fundamental rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

impl TryFrom<u8> for Axis {
    type Error = FootprintError;

    fn try_from(axis: u8) -> Result<Self> {
        match axis {
            1 => Ok(Axis::X),
            2 => Ok(Axis::Y),
            3 => Ok(Axis::Z),
            _ => Err(FootprintError::InvalidAxis { axis }),
        }
    }
}

/// Convert Euler angles in degrees to a unit vector.
///
/// Works for V2/V3 as well once they are converted from arcseconds to degrees.
pub fn to_unit_vector(ra: f64, dec: f64) -> Vector3<f64> {
    let ra_rad = ra.to_radians();
    let dec_rad = dec.to_radians();
    Vector3::new(
        ra_rad.cos() * dec_rad.cos(),
        ra_rad.sin() * dec_rad.cos(),
        dec_rad.sin(),
    )
}

/// Convert a vector back to Euler angles in degrees.
///
/// The vector is renormalized first so accumulated floating point drift does
/// not push `asin` out of its domain. RA is wrapped into `[0, 360)`.
///
/// # Errors
/// [`FootprintError::DegenerateVector`] when the norm is below machine epsilon
/// or not finite.
pub fn to_angles(u: &Vector3<f64>) -> Result<SkyPoint> {
    let norm = u.norm();
    if !norm.is_finite() || norm < f64::EPSILON {
        return Err(FootprintError::DegenerateVector { norm });
    }

    let dec = (u.z / norm).clamp(-1.0, 1.0).asin().to_degrees();
    let mut ra = u.y.atan2(u.x).to_degrees();
    if ra < 0.0 {
        ra += 360.0;
    }
    if ra >= 360.0 {
        ra -= 360.0;
    }
    Ok(SkyPoint::new(ra, dec))
}

/// Right-handed rotation by `angle` degrees about `axis`.
pub fn rotation_about(axis: Axis, angle: f64) -> Matrix3<f64> {
    let ax0 = axis.index();
    let ax1 = (ax0 + 1) % 3;
    let ax2 = (ax0 + 2) % 3;
    let (sin, cos) = angle.to_radians().sin_cos();

    let mut r = Matrix3::zeros();
    r[(ax0, ax0)] = 1.0;
    r[(ax1, ax1)] = cos;
    r[(ax2, ax2)] = cos;
    r[(ax1, ax2)] = -sin;
    r[(ax2, ax1)] = sin;
    r
}

/// Fundamental rotation about axis 1, 2 or 3 by `angle` degrees.
///
/// # Errors
/// [`FootprintError::InvalidAxis`] for any axis outside 1..=3.
pub fn fundamental_rotation(axis: u8, angle: f64) -> Result<Matrix3<f64>> {
    Ok(rotation_about(Axis::try_from(axis)?, angle))
}

/// Orthonormal matrix taking V2/V3 unit vectors to sky unit vectors for one pointing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttitudeMatrix {
    matrix: Matrix3<f64>,
}

impl AttitudeMatrix {
    /// Build the attitude that places `pivot` on the pointing target with the
    /// given position angle.
    ///
    /// The composition order `Mra · Mdec · Mpa · Mv3 · Mv2` is fixed: any other
    /// order changes the on-sky orientation.
    pub fn new(pivot: AngularPoint, pointing: &Pointing) -> Self {
        let v2 = pivot.v2 / ARCSEC_PER_DEG;
        let v3 = pivot.v3 / ARCSEC_PER_DEG;

        let mv2 = rotation_about(Axis::Z, -v2);
        let mv3 = rotation_about(Axis::Y, v3);
        let mpa = rotation_about(Axis::X, -pointing.position_angle);
        let mdec = rotation_about(Axis::Y, -pointing.dec);
        let mra = rotation_about(Axis::Z, pointing.ra);

        Self {
            matrix: mra * mdec * mpa * mv3 * mv2,
        }
    }

    /// Underlying rotation matrix
    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    /// Where a V2/V3 position (arcseconds) points on the sky.
    pub fn project(&self, point: AngularPoint) -> Result<SkyPoint> {
        let local = to_unit_vector(point.v2 / ARCSEC_PER_DEG, point.v3 / ARCSEC_PER_DEG);
        to_angles(&(self.matrix * local))
    }
}
