//! External point-source lists drawn on top of the instrument footprints.
//!
//! Rows are either `ra dec` or `ra dec tag`, separated by whitespace or
//! commas. Tagged lists are split into fillers (`F`) and primary targets
//! (`P`); rows with any other tag are dropped.

use std::fs;
use std::path::Path;

use crate::error::{FootprintError, Result};
use crate::geometry::SkyPoint;
use crate::region::RegionList;
use crate::wcs::SkyToPixel;

pub const UNTYPED_FILE: &str = "ds9-sources.reg";
pub const FILLERS_FILE: &str = "ds9-sources-fillers.reg";
pub const PRIMARY_FILE: &str = "ds9-sources-primary.reg";

/// Parsed source list.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceCatalog {
    /// Two-column list of positions
    Untyped(Vec<SkyPoint>),
    /// Three-column list partitioned by tag
    Typed {
        fillers: Vec<SkyPoint>,
        primary: Vec<SkyPoint>,
    },
}

impl SourceCatalog {
    /// Parse a source list.
    ///
    /// # Errors
    /// [`FootprintError::InvalidCatalog`] for an empty list, a column count
    /// other than 2 or 3, rows with differing column counts, or a coordinate
    /// that is not a number.
    pub fn parse(text: &str) -> Result<Self> {
        let mut columns: Option<usize> = None;
        let mut untyped = Vec::new();
        let mut fillers = Vec::new();
        let mut primary = Vec::new();

        for (index, line) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|f| !f.is_empty())
                .collect();

            match columns {
                None => {
                    if !(2..=3).contains(&fields.len()) {
                        return Err(FootprintError::InvalidCatalog(format!(
                            "line {line_no}: expected 2 or 3 columns, found {}",
                            fields.len()
                        )));
                    }
                    columns = Some(fields.len());
                }
                Some(n) if n != fields.len() => {
                    return Err(FootprintError::InvalidCatalog(format!(
                        "line {line_no}: expected {n} columns, found {}",
                        fields.len()
                    )));
                }
                Some(_) => {}
            }

            let coord = |field: &str, name: &str| {
                field.parse::<f64>().map_err(|_| {
                    FootprintError::InvalidCatalog(format!("line {line_no}: bad {name} '{field}'"))
                })
            };
            let position = SkyPoint::new(coord(fields[0], "ra")?, coord(fields[1], "dec")?);

            match fields.get(2) {
                None => untyped.push(position),
                Some(&"F") => fillers.push(position),
                Some(&"P") => primary.push(position),
                Some(tag) => log::debug!("Skipping source on line {line_no} with tag '{tag}'"),
            }
        }

        match columns {
            None => Err(FootprintError::InvalidCatalog("no sources".to_string())),
            Some(2) => Ok(SourceCatalog::Untyped(untyped)),
            Some(_) => Ok(SourceCatalog::Typed { fillers, primary }),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text).map_err(|e| match e {
            FootprintError::InvalidCatalog(msg) => {
                FootprintError::InvalidCatalog(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    /// Number of sources kept after tag filtering
    pub fn len(&self) -> usize {
        match self {
            SourceCatalog::Untyped(points) => points.len(),
            SourceCatalog::Typed { fillers, primary } => fillers.len() + primary.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Circle overlays: one yellow list for untyped sources, or yellow fillers
    /// followed by red primary targets.
    pub fn region_lists(&self, wcs: &dyn SkyToPixel) -> Result<Vec<RegionList>> {
        match self {
            SourceCatalog::Untyped(points) => {
                Ok(vec![RegionList::circles(UNTYPED_FILE, "yellow", points, wcs)?])
            }
            SourceCatalog::Typed { fillers, primary } => Ok(vec![
                RegionList::circles(FILLERS_FILE, "yellow", fillers, wcs)?,
                RegionList::circles(PRIMARY_FILE, "red", primary, wcs)?,
            ]),
        }
    }
}
