//! Shared test infrastructure for footprint generation.
//!
//! Provides project-root discovery, a persistent `test_output/` directory
//! for artifacts worth inspecting by hand, and synthetic inputs:
//!
//! - aperture tables with the row layout of each instrument channel, built
//!   from squares placed symmetrically about the V2/V3 origin so that every
//!   channel pivot resolves to `(0, 0)`
//! - minimal FITS files carrying a gnomonic world-coordinate header
//!
//! The helpers only produce text and bytes, so they can be used from any
//! crate in the workspace without pulling in library types.
//!
//! ```rust
//! use test_helpers::{synthetic_table, SyntheticChannel};
//!
//! let table = synthetic_table(SyntheticChannel::Long);
//! assert_eq!(table.lines().filter(|l| !l.starts_with('#')).count(), 10);
//! ```

use once_cell::sync::Lazy;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Errors raised while setting up the test environment.
#[derive(thiserror::Error, Debug)]
pub enum TestHelperError {
    /// Project root directory could not be located or accessed.
    ///
    /// Occurs when tests run outside the workspace or the workspace
    /// `Cargo.toml` cannot be read.
    #[error("Failed to find project root: {0}")]
    ProjectRootNotFound(String),

    /// Synthetic input could not be written.
    #[error("Failed to write test fixture: {0}")]
    Fixture(#[from] std::io::Error),
}

/// Locate the workspace root by walking up from the current directory until
/// a `Cargo.toml` with a `[workspace]` section is found.
pub fn find_project_root() -> Result<PathBuf, TestHelperError> {
    let mut current_dir = env::current_dir().map_err(|e| {
        TestHelperError::ProjectRootNotFound(format!("Failed to get current directory: {}", e))
    })?;

    // Search for workspace Cargo.toml
    loop {
        let cargo_toml = current_dir.join("Cargo.toml");
        if cargo_toml.exists() {
            let content = std::fs::read_to_string(&cargo_toml).map_err(|e| {
                TestHelperError::ProjectRootNotFound(format!("Failed to read Cargo.toml: {}", e))
            })?;

            if content.contains("[workspace]") {
                return Ok(current_dir);
            }
        }

        if !current_dir.pop() {
            break;
        }
    }

    Err(TestHelperError::ProjectRootNotFound(
        "Workspace root not found".to_string(),
    ))
}

/// Cached project root, computed once per test process.
static PROJECT_ROOT: Lazy<PathBuf> =
    Lazy::new(|| find_project_root().expect("Failed to find project root directory"));

/// `<project_root>/test_output/`, created on first use.
///
/// Region files and display scripts written here survive the test run so
/// they can be loaded into a viewer.
pub fn get_output_dir() -> PathBuf {
    let output_dir = PROJECT_ROOT.join("test_output");

    if !output_dir.exists() {
        std::fs::create_dir_all(&output_dir).expect("Failed to create output directory");
    }

    output_dir
}

/// Path inside the test output directory.
pub fn output_path<P: AsRef<Path>>(path: P) -> PathBuf {
    get_output_dir().join(path)
}

/// Channel layouts available as synthetic tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntheticChannel {
    /// Two detectors side by side along V2
    Long,
    /// Two rows of four detectors
    Short,
    /// Four quadrants plus an IFU aperture off to the side
    Msa,
}

impl SyntheticChannel {
    pub const ALL: [SyntheticChannel; 3] = [
        SyntheticChannel::Long,
        SyntheticChannel::Short,
        SyntheticChannel::Msa,
    ];

    /// File name the table is stored under
    pub fn file_name(&self) -> &'static str {
        match self {
            SyntheticChannel::Long => "table-nircam-long.txt",
            SyntheticChannel::Short => "table-nircam-short.txt",
            SyntheticChannel::Msa => "table-nirspec-msa.txt",
        }
    }

    /// Sub-aperture centers (V2, V3) in arcseconds, in table order.
    ///
    /// Every layout is symmetric about the origin over the sub-apertures its
    /// pivot rule reads.
    pub fn centers(&self) -> Vec<(f64, f64)> {
        match self {
            SyntheticChannel::Long => vec![(-60.0, 0.0), (60.0, 0.0)],
            SyntheticChannel::Short => vec![
                // Row A: 0..4, row B: 4..8; the pivot reads 0, 1, 4, 5
                (-90.0, -30.0),
                (-30.0, -30.0),
                (30.0, -30.0),
                (90.0, -30.0),
                (90.0, 30.0),
                (30.0, 30.0),
                (-30.0, 30.0),
                (-90.0, 30.0),
            ],
            SyntheticChannel::Msa => vec![
                (-50.0, -50.0),
                (50.0, -50.0),
                (50.0, 50.0),
                (-50.0, 50.0),
                (150.0, 0.0),
            ],
        }
    }

    /// Half-width of every square sub-aperture, arcseconds
    pub fn half_size(&self) -> f64 {
        match self {
            SyntheticChannel::Long => 55.0,
            SyntheticChannel::Short => 28.0,
            SyntheticChannel::Msa => 45.0,
        }
    }

    /// Number of table rows
    pub fn rows(&self) -> usize {
        self.centers().len() * 5
    }
}

/// Closed square outline (4 corners plus the first repeated), arcseconds.
pub fn square_outline(center: (f64, f64), half: f64) -> Vec<(f64, f64)> {
    let (v2, v3) = center;
    vec![
        (v2 - half, v3 - half),
        (v2 + half, v3 - half),
        (v2 + half, v3 + half),
        (v2 - half, v3 + half),
        (v2 - half, v3 - half),
    ]
}

/// Aperture table text for `channel`, five columns per row.
pub fn synthetic_table(channel: SyntheticChannel) -> String {
    let mut table = String::from("# v2 v3 aperture v2ref v3ref\n");
    for (index, center) in channel.centers().into_iter().enumerate() {
        for (v2, v3) in square_outline(center, channel.half_size()) {
            table.push_str(&format!(
                "{v2:.4} {v3:.4} SYN{index}_FULL {:.4} {:.4}\n",
                center.0, center.1
            ));
        }
    }
    table
}

/// Write all synthetic tables into `dir`.
pub fn write_synthetic_tables(dir: &Path) -> Result<(), TestHelperError> {
    fs::create_dir_all(dir)?;
    for channel in SyntheticChannel::ALL {
        fs::write(dir.join(channel.file_name()), synthetic_table(channel))?;
    }
    Ok(())
}

/// Primary FITS header with a gnomonic transform.
///
/// North is up and east is left: `CD1_1 = -scale`, `CD2_2 = scale`
/// (degrees per pixel).
pub fn tan_header(crval: (f64, f64), crpix: (f64, f64), scale: f64) -> Vec<u8> {
    let card = |keyword: &str, value: String| format!("{:<8}= {:<70}", keyword, value);
    let cards = [
        card("SIMPLE", format!("{:>20}", "T")),
        card("BITPIX", format!("{:>20}", -32)),
        card("NAXIS", format!("{:>20}", 0)),
        card("CTYPE1", "'RA---TAN'".to_string()),
        card("CTYPE2", "'DEC--TAN'".to_string()),
        card("CRVAL1", format!("{:>20.10}", crval.0)),
        card("CRVAL2", format!("{:>20.10}", crval.1)),
        card("CRPIX1", format!("{:>20.4}", crpix.0)),
        card("CRPIX2", format!("{:>20.4}", crpix.1)),
        card("CD1_1", format!("{:>20.12E}", -scale)),
        card("CD1_2", format!("{:>20}", "0.0")),
        card("CD2_1", format!("{:>20}", "0.0")),
        card("CD2_2", format!("{:>20.12E}", scale)),
    ];

    let mut header: String = cards.concat();
    header.push_str(&format!("{:<80}", "END"));
    let mut bytes = header.into_bytes();
    let padded = bytes.len().div_ceil(2880) * 2880;
    bytes.resize(padded, b' ');
    bytes
}

/// Write a header-only FITS file with [`tan_header`].
pub fn write_tan_fits(
    path: &Path,
    crval: (f64, f64),
    crpix: (f64, f64),
    scale: f64,
) -> Result<(), TestHelperError> {
    fs::write(path, tan_header(crval, crpix, scale))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_root_exists() {
        let root = find_project_root().expect("Failed to find project root");
        assert!(root.exists());
        assert!(root.join("Cargo.toml").exists());
    }

    #[test]
    fn test_output_dir_created() {
        let output = get_output_dir();
        assert!(output.exists());
        assert!(output.is_dir());
    }

    #[test]
    fn test_output_path() {
        let path = output_path("ds9-long-no.reg");
        assert_eq!(path, get_output_dir().join("ds9-long-no.reg"));
    }

    #[test]
    fn test_tables_have_channel_row_counts() {
        for (channel, rows) in SyntheticChannel::ALL.iter().zip([10, 40, 25]) {
            let table = synthetic_table(*channel);
            let data_rows = table.lines().filter(|l| !l.starts_with('#')).count();
            assert_eq!(data_rows, rows, "{channel:?}");
            assert_eq!(channel.rows(), rows);
        }
    }

    #[test]
    fn test_outline_closes() {
        let outline = square_outline((3.0, -2.0), 1.0);
        assert_eq!(outline.len(), 5);
        assert_eq!(outline[0], outline[4]);
    }

    #[test]
    fn test_header_is_block_aligned() {
        let header = tan_header((180.0, 0.0), (512.0, 512.0), 1e-4);
        assert_eq!(header.len() % 2880, 0);
        assert!(header.starts_with(b"SIMPLE  = "));
        assert_eq!(&header[13 * 80..13 * 80 + 3], b"END");
    }
}
