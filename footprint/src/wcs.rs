//! World-coordinate transforms from sky positions to image pixels.
//!
//! The reference image supplies the transform; everything downstream only sees
//! the [`SkyToPixel`] capability, passed in explicitly.
//!
//! [`TanWcs`] covers the gnomonic (`RA---TAN` / `DEC--TAN`) headers used for
//! small-field imaging. Pixel coordinates follow the FITS convention: the
//! center of the first pixel is `(1, 1)`.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use fitsio::compat::fitsfile::FitsFile;
use serde::{Deserialize, Serialize};

use crate::error::{FootprintError, Result};
use crate::geometry::SkyPoint;

/// Threshold below which a CD matrix is treated as singular
const DETERMINANT_THRESHOLD: f64 = 1e-15;

/// String valued keywords read from the primary header
const STRING_KEYS: [&str; 2] = ["CTYPE1", "CTYPE2"];

/// Numeric keywords read from the primary header
const FLOAT_KEYS: [&str; 15] = [
    "CRVAL1", "CRVAL2", "CRPIX1", "CRPIX2", "CD1_1", "CD1_2", "CD2_1", "CD2_2", "CDELT1",
    "CDELT2", "PC1_1", "PC1_2", "PC2_1", "PC2_2", "CROTA2",
];

/// Position in image pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Capability to map sky positions onto an image.
///
/// Implementations must be pure functions of their fixed transform: repeated
/// calls with the same input return the same pixel.
pub trait SkyToPixel {
    fn sky_to_pixel(&self, sky: SkyPoint) -> Result<PixelPoint>;

    /// Map a batch of positions, preserving order.
    fn sky_to_pixels(&self, points: &[SkyPoint]) -> Result<Vec<PixelPoint>> {
        points.iter().map(|p| self.sky_to_pixel(*p)).collect()
    }
}

/// World-coordinate keywords of a FITS primary header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FitsHeader {
    strings: HashMap<String, String>,
    floats: HashMap<String, f64>,
}

impl FitsHeader {
    /// Read the WCS keywords from the primary HDU of a FITS file.
    ///
    /// Absent keywords are left out; [`TanWcs::from_header`] decides which
    /// of them are required.
    pub fn from_file(path: &Path) -> Result<Self> {
        let invalid = |what: String| {
            FootprintError::InvalidWorldCoordinate(format!("{}: {what}", path.display()))
        };

        // Every FITS file opens with the SIMPLE card
        let mut signature = [0u8; 6];
        File::open(path)?
            .read_exact(&mut signature)
            .map_err(|e| invalid(format!("not a FITS file ({e})")))?;
        if &signature != b"SIMPLE" {
            return Err(invalid("not a FITS file".to_string()));
        }

        let fptr = FitsFile::open(path).map_err(|e| invalid(format!("unreadable FITS ({e})")))?;
        let hdu = fptr
            .hdu(0)
            .map_err(|e| invalid(format!("no primary HDU ({e})")))?;

        let mut header = FitsHeader::default();
        for key in STRING_KEYS {
            if let Ok(value) = hdu.read_key::<String>(&fptr, key) {
                header.insert_string(key, value);
            }
        }
        for key in FLOAT_KEYS {
            if let Ok(value) = hdu.read_key::<f64>(&fptr, key) {
                header.insert_float(key, value);
            }
        }
        log::debug!(
            "{}: {} WCS keywords",
            path.display(),
            header.strings.len() + header.floats.len()
        );
        Ok(header)
    }

    /// Insert or replace a string keyword.
    pub fn insert_string(&mut self, keyword: &str, value: impl Into<String>) -> &mut Self {
        let value: String = value.into();
        let value = value.trim().trim_matches('\'').trim().to_string();
        self.strings.insert(keyword.to_uppercase(), value);
        self
    }

    /// Insert or replace a numeric keyword.
    pub fn insert_float(&mut self, keyword: &str, value: f64) -> &mut Self {
        self.floats.insert(keyword.to_uppercase(), value);
        self
    }

    pub fn get_string(&self, keyword: &str) -> Option<&str> {
        self.strings.get(keyword).map(String::as_str)
    }

    pub fn get_float(&self, keyword: &str) -> Option<f64> {
        self.floats.get(keyword).copied()
    }

    fn require_float(&self, keyword: &str) -> Result<f64> {
        self.get_float(keyword).ok_or_else(|| {
            FootprintError::InvalidWorldCoordinate(format!("missing keyword {keyword}"))
        })
    }

    fn require_string(&self, keyword: &str) -> Result<&str> {
        self.get_string(keyword).ok_or_else(|| {
            FootprintError::InvalidWorldCoordinate(format!("missing keyword {keyword}"))
        })
    }
}

/// Gnomonic (TAN) world-coordinate transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TanWcs {
    /// Reference sky position (CRVAL), degrees
    crval: [f64; 2],
    /// Reference pixel (CRPIX), 1-based
    crpix: [f64; 2],
    /// Pixel offsets to intermediate world coordinates, degrees per pixel
    cd: [[f64; 2]; 2],
    cd_inverse: [[f64; 2]; 2],
}

impl TanWcs {
    /// Build a transform from a CD matrix.
    pub fn new(crval: [f64; 2], crpix: [f64; 2], cd: [[f64; 2]; 2]) -> Result<Self> {
        let det = cd[0][0] * cd[1][1] - cd[0][1] * cd[1][0];
        if !det.is_finite() || det.abs() < DETERMINANT_THRESHOLD {
            return Err(FootprintError::InvalidWorldCoordinate(format!(
                "singular CD matrix (determinant {det:.3e})"
            )));
        }
        let inv = 1.0 / det;
        let cd_inverse = [
            [cd[1][1] * inv, -cd[0][1] * inv],
            [-cd[1][0] * inv, cd[0][0] * inv],
        ];
        Ok(Self {
            crval,
            crpix,
            cd,
            cd_inverse,
        })
    }

    /// Build a transform from header keywords.
    ///
    /// Accepts a CD matrix, or CDELT with an optional PC matrix, or CDELT with
    /// the legacy CROTA2 rotation.
    pub fn from_header(header: &FitsHeader) -> Result<Self> {
        let ctype1 = header.require_string("CTYPE1")?;
        let ctype2 = header.require_string("CTYPE2")?;
        if !(ctype1.starts_with("RA") && ctype1.ends_with("-TAN"))
            || !(ctype2.starts_with("DEC") && ctype2.ends_with("-TAN"))
        {
            return Err(FootprintError::InvalidWorldCoordinate(format!(
                "unsupported projection {ctype1}/{ctype2}, expected RA---TAN/DEC--TAN"
            )));
        }

        let crval = [header.require_float("CRVAL1")?, header.require_float("CRVAL2")?];
        let crpix = [header.require_float("CRPIX1")?, header.require_float("CRPIX2")?];

        let cd_keys = ["CD1_1", "CD1_2", "CD2_1", "CD2_2"];
        let cd = if cd_keys.iter().any(|k| header.get_float(k).is_some()) {
            let get = |k: &str| header.get_float(k).unwrap_or(0.0);
            [[get("CD1_1"), get("CD1_2")], [get("CD2_1"), get("CD2_2")]]
        } else {
            let cdelt = [header.require_float("CDELT1")?, header.require_float("CDELT2")?];
            let pc_keys = ["PC1_1", "PC1_2", "PC2_1", "PC2_2"];
            let pc = if pc_keys.iter().any(|k| header.get_float(k).is_some()) {
                [
                    [
                        header.get_float("PC1_1").unwrap_or(1.0),
                        header.get_float("PC1_2").unwrap_or(0.0),
                    ],
                    [
                        header.get_float("PC2_1").unwrap_or(0.0),
                        header.get_float("PC2_2").unwrap_or(1.0),
                    ],
                ]
            } else {
                let rho = header.get_float("CROTA2").unwrap_or(0.0).to_radians();
                let (sin, cos) = rho.sin_cos();
                let ratio = cdelt[1] / cdelt[0];
                [[cos, -sin * ratio], [sin / ratio, cos]]
            };
            [
                [cdelt[0] * pc[0][0], cdelt[0] * pc[0][1]],
                [cdelt[1] * pc[1][0], cdelt[1] * pc[1][1]],
            ]
        };

        Self::new(crval, crpix, cd)
    }

    /// Read the transform from a FITS image.
    pub fn from_fits(path: &Path) -> Result<Self> {
        let header = FitsHeader::from_file(path)?;
        Self::from_header(&header)
    }

    pub fn crval(&self) -> [f64; 2] {
        self.crval
    }

    pub fn crpix(&self) -> [f64; 2] {
        self.crpix
    }

    pub fn cd_matrix(&self) -> [[f64; 2]; 2] {
        self.cd
    }

    /// Pixel to sky, the inverse of [`SkyToPixel::sky_to_pixel`].
    pub fn pixel_to_sky(&self, pixel: PixelPoint) -> SkyPoint {
        let dx = pixel.x - self.crpix[0];
        let dy = pixel.y - self.crpix[1];
        let xi = (self.cd[0][0] * dx + self.cd[0][1] * dy).to_radians();
        let eta = (self.cd[1][0] * dx + self.cd[1][1] * dy).to_radians();

        let ra0 = self.crval[0].to_radians();
        let dec0 = self.crval[1].to_radians();
        let denom = dec0.cos() - eta * dec0.sin();
        let ra = ra0 + xi.atan2(denom);
        let dec = (dec0.sin() + eta * dec0.cos()).atan2(xi.hypot(denom));

        let mut ra_deg = ra.to_degrees().rem_euclid(360.0);
        if ra_deg >= 360.0 {
            ra_deg -= 360.0;
        }
        SkyPoint::new(ra_deg, dec.to_degrees())
    }
}

impl SkyToPixel for TanWcs {
    fn sky_to_pixel(&self, sky: SkyPoint) -> Result<PixelPoint> {
        let ra0 = self.crval[0].to_radians();
        let dec0 = self.crval[1].to_radians();
        let ra = sky.ra.to_radians();
        let dec = sky.dec.to_radians();
        let dra = ra - ra0;

        let cos_c = dec0.sin() * dec.sin() + dec0.cos() * dec.cos() * dra.cos();
        if !cos_c.is_finite() || cos_c <= 0.0 {
            return Err(FootprintError::InvalidWorldCoordinate(format!(
                "({:.6}, {:.6}) lies behind the tangent plane",
                sky.ra, sky.dec
            )));
        }

        let xi = (dec.cos() * dra.sin() / cos_c).to_degrees();
        let eta =
            ((dec0.cos() * dec.sin() - dec0.sin() * dec.cos() * dra.cos()) / cos_c).to_degrees();

        let x = self.cd_inverse[0][0] * xi + self.cd_inverse[0][1] * eta + self.crpix[0];
        let y = self.cd_inverse[1][0] * xi + self.cd_inverse[1][1] * eta + self.crpix[1];
        Ok(PixelPoint::new(x, y))
    }
}
