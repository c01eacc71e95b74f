//! Aperture geometry catalogs.
//!
//! Each instrument channel owns an ordered table of V2/V3 vertices, five per
//! sub-aperture (four corners followed by the first corner again to close the
//! polygon). Row order is load-bearing: the rotation-center rules in
//! [`crate::pivot`] index straight into it.
//!
//! Tables are plain text with one row per vertex:
//!
//! ```text
//! # v2        v3        aperture   v2ref     v3ref
//! 120.6714   -527.3688  NRCA5_FULL 86.1035   -493.2275
//! ```
//!
//! Only the first two columns feed the geometry; the rest are kept for
//! reference.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{FootprintError, Result};
use crate::geometry::AngularPoint;
use crate::pivot::PivotRule;

/// Vertices per sub-aperture: four corners plus the closing repeat
pub const VERTICES_PER_SUBAPERTURE: usize = 5;

/// Tolerance (arcsec) when checking that a sub-aperture polygon closes on itself
const CLOSURE_TOLERANCE_ARCSEC: f64 = 1e-6;

/// Instrument channels with a known aperture layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApertureChannel {
    /// NIRSpec micro-shutter array: four quadrants plus the IFU aperture
    Msa,
    /// NIRCam long wavelength channel: two detectors
    NircamLong,
    /// NIRCam short wavelength channel: eight detectors
    NircamShort,
}

impl ApertureChannel {
    /// Number of sub-apertures in the catalog for this channel
    pub fn subaperture_count(&self) -> usize {
        match self {
            ApertureChannel::Msa => 5,
            ApertureChannel::NircamLong => 2,
            ApertureChannel::NircamShort => 8,
        }
    }

    /// Catalog rows required for this channel
    pub fn expected_rows(&self) -> usize {
        self.subaperture_count() * VERTICES_PER_SUBAPERTURE
    }

    /// Rotation-center rule for this channel's topology
    pub fn pivot_rule(&self) -> PivotRule {
        match self {
            ApertureChannel::Msa => PivotRule::DiagonalPairs([0, 1, 2, 3]),
            ApertureChannel::NircamLong => PivotRule::PairMidpoint([0, 1]),
            ApertureChannel::NircamShort => PivotRule::DiagonalPairs([0, 1, 4, 5]),
        }
    }

    /// Short tag used in region file names
    pub fn tag(&self) -> &'static str {
        match self {
            ApertureChannel::Msa => "msa",
            ApertureChannel::NircamLong => "long",
            ApertureChannel::NircamShort => "short",
        }
    }

    /// Default aperture table file name
    pub fn table_file_name(&self) -> &'static str {
        match self {
            ApertureChannel::Msa => "table-nirspec-msa.txt",
            ApertureChannel::NircamLong => "table-nircam-long.txt",
            ApertureChannel::NircamShort => "table-nircam-short.txt",
        }
    }
}

impl fmt::Display for ApertureChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApertureChannel::Msa => write!(f, "NIRSpec MSA"),
            ApertureChannel::NircamLong => write!(f, "NIRCam long"),
            ApertureChannel::NircamShort => write!(f, "NIRCam short"),
        }
    }
}

/// One row of an aperture table.
#[derive(Debug, Clone, PartialEq)]
pub struct ApertureRow {
    /// Vertex position in V2/V3 arcseconds
    pub point: AngularPoint,
    /// Name of the sub-aperture this vertex belongs to
    pub aperture: Option<String>,
    /// Reference point of the sub-aperture
    pub reference: Option<AngularPoint>,
}

impl ApertureRow {
    pub fn new(point: AngularPoint) -> Self {
        Self {
            point,
            aperture: None,
            reference: None,
        }
    }
}

/// Validated, ordered vertex table for one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ApertureCatalog {
    channel: ApertureChannel,
    rows: Vec<ApertureRow>,
}

impl ApertureCatalog {
    /// Build a catalog, rejecting row counts that do not match the channel layout.
    pub fn new(channel: ApertureChannel, rows: Vec<ApertureRow>) -> Result<Self> {
        let expected = channel.expected_rows();
        if rows.len() != expected {
            return Err(FootprintError::CatalogShape {
                channel: channel.to_string(),
                expected,
                found: rows.len(),
            });
        }

        for (index, polygon) in rows.chunks(VERTICES_PER_SUBAPERTURE).enumerate() {
            let first = polygon[0].point;
            let last = polygon[VERTICES_PER_SUBAPERTURE - 1].point;
            if (first.v2 - last.v2).abs() > CLOSURE_TOLERANCE_ARCSEC
                || (first.v3 - last.v3).abs() > CLOSURE_TOLERANCE_ARCSEC
            {
                log::warn!("{channel} sub-aperture {index} does not close on its first vertex");
            }
        }

        Ok(Self { channel, rows })
    }

    /// Build a catalog from bare V2/V3 points.
    pub fn from_points(channel: ApertureChannel, points: &[AngularPoint]) -> Result<Self> {
        Self::new(channel, points.iter().copied().map(ApertureRow::new).collect())
    }

    /// Parse a whitespace separated aperture table.
    pub fn parse(channel: ApertureChannel, text: &str) -> Result<Self> {
        let mut rows = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            rows.push(parse_row(line).map_err(|reason| {
                FootprintError::ApertureTable(format!("line {}: {reason}", line_no + 1))
            })?);
        }
        Self::new(channel, rows)
    }

    /// Load and validate an aperture table from disk.
    pub fn load(channel: ApertureChannel, path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let catalog = Self::parse(channel, &text)?;
        log::debug!(
            "Loaded {} aperture rows for {channel} from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    pub fn channel(&self) -> ApertureChannel {
        self.channel
    }

    pub fn rows(&self) -> &[ApertureRow] {
        &self.rows
    }

    /// V2/V3 vertices in catalog order
    pub fn points(&self) -> Vec<AngularPoint> {
        self.rows.iter().map(|row| row.point).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn parse_row(line: &str) -> std::result::Result<ApertureRow, String> {
    let columns: Vec<&str> = line.split_whitespace().collect();
    if columns.len() < 2 {
        return Err(format!("expected at least 2 columns, found {}", columns.len()));
    }

    let number = |s: &str| s.parse::<f64>().map_err(|_| format!("invalid number '{s}'"));

    let point = AngularPoint::new(number(columns[0])?, number(columns[1])?);
    let aperture = columns.get(2).map(|s| s.to_string());
    let reference = match (columns.get(3), columns.get(4)) {
        (Some(v2), Some(v3)) => Some(AngularPoint::new(number(*v2)?, number(*v3)?)),
        _ => None,
    };

    Ok(ApertureRow {
        point,
        aperture,
        reference,
    })
}

/// Supplier of aperture catalogs, one per channel.
pub trait ApertureSource {
    fn catalog(&self, channel: ApertureChannel) -> Result<ApertureCatalog>;
}

/// Aperture tables stored side by side in one directory.
#[derive(Debug, Clone)]
pub struct TableDirectory {
    root: PathBuf,
}

impl TableDirectory {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Path of the table for `channel`
    pub fn table_path(&self, channel: ApertureChannel) -> PathBuf {
        self.root.join(channel.table_file_name())
    }
}

impl ApertureSource for TableDirectory {
    fn catalog(&self, channel: ApertureChannel) -> Result<ApertureCatalog> {
        ApertureCatalog::load(channel, &self.table_path(channel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn square(center: AngularPoint, half: f64) -> Vec<AngularPoint> {
        vec![
            center.offset(-half, -half),
            center.offset(half, -half),
            center.offset(half, half),
            center.offset(-half, half),
            center.offset(-half, -half),
        ]
    }

    #[rstest]
    #[case(ApertureChannel::Msa, 25)]
    #[case(ApertureChannel::NircamLong, 10)]
    #[case(ApertureChannel::NircamShort, 40)]
    fn test_expected_rows(#[case] channel: ApertureChannel, #[case] rows: usize) {
        assert_eq!(channel.expected_rows(), rows);
    }

    #[test]
    fn test_catalog_shape_mismatch() {
        let points = square(AngularPoint::new(0.0, 0.0), 1.0);
        let err = ApertureCatalog::from_points(ApertureChannel::NircamLong, &points).unwrap_err();
        match err {
            FootprintError::CatalogShape {
                expected, found, ..
            } => {
                assert_eq!(expected, 10);
                assert_eq!(found, 5);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_table_with_reference_columns() {
        let mut text = String::from("# v2 v3 aperture v2ref v3ref\n");
        for center in [-60.0, 60.0] {
            for p in square(AngularPoint::new(center, -500.0), 30.0) {
                text.push_str(&format!("{} {} NRCA5_FULL {} -500.0\n", p.v2, p.v3, center));
            }
        }

        let catalog = ApertureCatalog::parse(ApertureChannel::NircamLong, &text).unwrap();
        assert_eq!(catalog.len(), 10);
        assert_eq!(catalog.rows()[0].point, AngularPoint::new(-90.0, -530.0));
        assert_eq!(catalog.rows()[0].aperture.as_deref(), Some("NRCA5_FULL"));
        assert_eq!(
            catalog.rows()[7].reference,
            Some(AngularPoint::new(60.0, -500.0))
        );
    }

    #[test]
    fn test_parse_table_rejects_bad_number() {
        let text = "1.0 abc\n";
        let err = ApertureCatalog::parse(ApertureChannel::NircamLong, text).unwrap_err();
        assert!(matches!(err, FootprintError::ApertureTable(msg) if msg.contains("line 1")));
    }

    #[test]
    fn test_table_directory_loads_by_channel() {
        let dir = tempfile::tempdir().unwrap();
        let mut text = String::new();
        for center in [-1.0, 1.0] {
            for p in square(AngularPoint::new(center, 0.0), 0.5) {
                text.push_str(&format!("{} {}\n", p.v2, p.v3));
            }
        }
        std::fs::write(dir.path().join("table-nircam-long.txt"), text).unwrap();

        let source = TableDirectory::new(dir.path().to_path_buf());
        let catalog = source.catalog(ApertureChannel::NircamLong).unwrap();
        assert_eq!(catalog.channel(), ApertureChannel::NircamLong);
        assert_eq!(catalog.points().len(), 10);

        assert!(source.catalog(ApertureChannel::Msa).is_err());
    }
}
