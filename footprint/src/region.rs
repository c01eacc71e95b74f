//! Overlay region lists in DS9 region format.
//!
//! A [`RegionList`] is built completely in memory from projected sky points
//! and only then written out, so a failed projection never leaves a partial
//! overlay file behind.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::aperture::VERTICES_PER_SUBAPERTURE;
use crate::error::{FootprintError, Result};
use crate::geometry::SkyPoint;
use crate::wcs::{PixelPoint, SkyToPixel};

/// Size of the cross drawn for a center mark, screen pixels
pub const CROSS_SIZE: u32 = 20;
/// Radius of a point-source circle, image pixels
pub const SOURCE_RADIUS: f64 = 5.0;

/// One overlay shape, in image pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionShape {
    /// Closed sub-aperture outline; the last vertex repeats the first
    Polygon {
        vertices: [PixelPoint; VERTICES_PER_SUBAPERTURE],
        label: Option<String>,
    },
    /// Nominal pointing marker, drawn as a cross
    Point { position: PixelPoint },
    /// Catalog source
    Circle { position: PixelPoint, radius: f64 },
}

impl fmt::Display for RegionShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionShape::Polygon { vertices, label } => {
                let coords: Vec<String> = vertices
                    .iter()
                    .map(|p| format!("{:.4},{:.4}", p.x, p.y))
                    .collect();
                write!(f, "polygon({})", coords.join(","))?;
                if let Some(label) = label {
                    write!(f, " # tag={{{label}}}")?;
                }
                Ok(())
            }
            RegionShape::Point { position } => write!(
                f,
                "point({:.4},{:.4}) # point=cross {CROSS_SIZE}",
                position.x, position.y
            ),
            RegionShape::Circle { position, radius } => {
                write!(f, "circle({:.4},{:.4},{radius})", position.x, position.y)
            }
        }
    }
}

/// Ordered shapes sharing one color, written to one region file.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionList {
    file_name: String,
    color: String,
    shapes: Vec<RegionShape>,
}

impl RegionList {
    pub fn new(file_name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            color: color.into(),
            shapes: Vec::new(),
        }
    }

    /// Closed polygons from a flattened vertex sequence.
    ///
    /// Every consecutive group of five points becomes one polygon, labelled
    /// `label` followed by its group index when a label is given.
    ///
    /// # Errors
    /// [`FootprintError::CatalogShape`] if the sequence does not split evenly
    /// into groups, [`FootprintError::InvalidWorldCoordinate`] if a vertex
    /// cannot be mapped to the image.
    pub fn polygons(
        file_name: impl Into<String>,
        color: impl Into<String>,
        points: &[SkyPoint],
        label: Option<&str>,
        wcs: &dyn SkyToPixel,
    ) -> Result<Self> {
        let mut list = Self::new(file_name, color);
        if points.len() % VERTICES_PER_SUBAPERTURE != 0 {
            return Err(FootprintError::CatalogShape {
                channel: list.file_name.clone(),
                expected: points.len().div_ceil(VERTICES_PER_SUBAPERTURE)
                    * VERTICES_PER_SUBAPERTURE,
                found: points.len(),
            });
        }

        let pixels = wcs.sky_to_pixels(points)?;
        for (index, group) in pixels.chunks_exact(VERTICES_PER_SUBAPERTURE).enumerate() {
            let mut vertices = [PixelPoint::new(0.0, 0.0); VERTICES_PER_SUBAPERTURE];
            vertices.copy_from_slice(group);
            list.push(RegionShape::Polygon {
                vertices,
                label: label.map(|l| format!("{l}-{index}")),
            });
        }
        Ok(list)
    }

    /// Single cross marker at `center`.
    pub fn center_mark(
        file_name: impl Into<String>,
        color: impl Into<String>,
        center: SkyPoint,
        wcs: &dyn SkyToPixel,
    ) -> Result<Self> {
        let mut list = Self::new(file_name, color);
        list.push(RegionShape::Point {
            position: wcs.sky_to_pixel(center)?,
        });
        Ok(list)
    }

    /// Fixed-radius circles, one per source.
    pub fn circles(
        file_name: impl Into<String>,
        color: impl Into<String>,
        sources: &[SkyPoint],
        wcs: &dyn SkyToPixel,
    ) -> Result<Self> {
        let mut list = Self::new(file_name, color);
        for position in wcs.sky_to_pixels(sources)? {
            list.push(RegionShape::Circle {
                position,
                radius: SOURCE_RADIUS,
            });
        }
        Ok(list)
    }

    pub fn push(&mut self, shape: RegionShape) {
        self.shapes.push(shape);
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn shapes(&self) -> &[RegionShape] {
        &self.shapes
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Polygon vertices in emission order.
    pub fn polygon_vertices(&self) -> Vec<PixelPoint> {
        self.shapes
            .iter()
            .filter_map(|shape| match shape {
                RegionShape::Polygon { vertices, .. } => Some(vertices.iter().copied()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Serialize to DS9 region syntax.
    pub fn to_ds9_string(&self) -> String {
        let mut out = String::from("# Region file format: DS9 version 4.1\n");
        out.push_str(&format!(
            "global color={} width=1 font=\"helvetica 15 normal roman\" select=0 highlite=1\n",
            self.color
        ));
        out.push_str("image\n");
        for shape in &self.shapes {
            out.push_str(&shape.to_string());
            out.push('\n');
        }
        out
    }

    /// Write into `dir`, replacing any previous file of the same name.
    ///
    /// The content goes to a temporary sibling first and is renamed into
    /// place, so readers never observe a half-written list.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        let tmp = dir.join(format!(".{}.tmp", self.file_name));
        fs::write(&tmp, self.to_ds9_string())?;
        fs::rename(&tmp, &path)?;
        log::info!("Wrote {} shapes to {}", self.len(), path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Maps (ra, dec) straight onto (x, y)
    struct Identity;

    impl SkyToPixel for Identity {
        fn sky_to_pixel(&self, sky: SkyPoint) -> Result<PixelPoint> {
            Ok(PixelPoint::new(sky.ra, sky.dec))
        }
    }

    /// Rejects everything north of the equator
    struct SouthOnly;

    impl SkyToPixel for SouthOnly {
        fn sky_to_pixel(&self, sky: SkyPoint) -> Result<PixelPoint> {
            if sky.dec > 0.0 {
                return Err(FootprintError::InvalidWorldCoordinate("north".into()));
            }
            Ok(PixelPoint::new(sky.ra, sky.dec))
        }
    }

    fn square(ra: f64, dec: f64) -> Vec<SkyPoint> {
        vec![
            SkyPoint::new(ra, dec),
            SkyPoint::new(ra + 1.0, dec),
            SkyPoint::new(ra + 1.0, dec + 1.0),
            SkyPoint::new(ra, dec + 1.0),
            SkyPoint::new(ra, dec),
        ]
    }

    #[test]
    fn test_groups_of_five_become_polygons() {
        let mut points = square(10.0, -5.0);
        points.extend(square(20.0, -5.0));
        let list = RegionList::polygons("ds9-long-no.reg", "blue", &points, Some("long"), &Identity)
            .unwrap();

        assert_eq!(list.len(), 2);
        assert_eq!(list.polygon_vertices().len(), 10);
        match &list.shapes()[1] {
            RegionShape::Polygon { vertices, label } => {
                assert_eq!(vertices[0], PixelPoint::new(20.0, -5.0));
                assert_eq!(vertices[0], vertices[4]);
                assert_eq!(label.as_deref(), Some("long-1"));
            }
            other => panic!("expected polygon, got {other:?}"),
        }
    }

    #[test]
    fn test_ragged_sequence_rejected() {
        let points = square(0.0, 0.0)[..4].to_vec();
        let err = RegionList::polygons("x.reg", "red", &points, None, &Identity).unwrap_err();
        assert!(matches!(
            err,
            FootprintError::CatalogShape {
                expected: 5,
                found: 4,
                ..
            }
        ));
    }

    #[test]
    fn test_projection_failure_yields_no_list() {
        let mut points = square(0.0, -3.0);
        points.extend(square(0.0, 3.0));
        assert!(RegionList::polygons("x.reg", "red", &points, None, &SouthOnly).is_err());
    }

    #[test]
    fn test_ds9_serialization() {
        let mut list = RegionList::center_mark("c.reg", "green", SkyPoint::new(1.5, 2.0), &Identity)
            .unwrap();
        list.push(RegionShape::Circle {
            position: PixelPoint::new(3.0, 4.0),
            radius: SOURCE_RADIUS,
        });

        let text = list.to_ds9_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "# Region file format: DS9 version 4.1");
        assert!(lines[1].starts_with("global color=green width=1"));
        assert_eq!(lines[2], "image");
        assert_eq!(lines[3], "point(1.5000,2.0000) # point=cross 20");
        assert_eq!(lines[4], "circle(3.0000,4.0000,5)");
    }

    #[test]
    fn test_polygon_serialization_lists_all_vertices() {
        let list =
            RegionList::polygons("p.reg", "red", &square(0.0, 0.0), Some("msa"), &Identity).unwrap();
        assert_eq!(
            list.shapes()[0].to_string(),
            "polygon(0.0000,0.0000,1.0000,0.0000,1.0000,1.0000,0.0000,1.0000,0.0000,0.0000) # tag={msa-0}"
        );
    }

    #[test]
    fn test_write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let first = RegionList::polygons("a.reg", "red", &square(0.0, 0.0), None, &Identity).unwrap();
        let path = first.write_to(dir.path()).unwrap();

        let second = RegionList::center_mark("a.reg", "red", SkyPoint::new(0.0, 0.0), &Identity)
            .unwrap();
        second.write_to(dir.path()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("point("));
        assert!(!text.contains("polygon("));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
