//! Rotation-center resolution.
//!
//! A channel's pivot is the V2/V3 point placed on the target when the
//! attitude is built. It is derived from the centers of selected
//! sub-apertures, where a sub-aperture center is the midpoint of its diagonal
//! corners (vertices `5k` and `5k + 2` of the catalog).
//!
//! ```text
//! PairMidpoint([a, b]):       pivot = mid(c_a, c_b)
//! DiagonalPairs([a, b, c, d]): pivot = mid(mid(c_a, c_c), mid(c_b, c_d))
//! ```

use std::fmt;

use crate::aperture::{ApertureCatalog, VERTICES_PER_SUBAPERTURE};
use crate::error::{FootprintError, Result};
use crate::geometry::AngularPoint;

/// Pivot derivation rule for a channel topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PivotRule {
    /// Midpoint of two sub-aperture centers (two-detector channels)
    PairMidpoint([usize; 2]),
    /// Midpoint of the two diagonal-pair midpoints of four sub-apertures
    DiagonalPairs([usize; 4]),
}

impl PivotRule {
    /// Smallest number of sub-apertures a catalog needs for this rule
    pub fn required_subapertures(&self) -> usize {
        let max_index = match self {
            PivotRule::PairMidpoint(indices) => indices.iter().max(),
            PivotRule::DiagonalPairs(indices) => indices.iter().max(),
        };
        max_index.map_or(0, |i| i + 1)
    }

    /// Resolve the pivot of an ordered vertex list.
    ///
    /// # Errors
    /// [`FootprintError::CatalogShape`] if the list is too short for the
    /// sub-aperture indices this rule reads.
    pub fn resolve(&self, points: &[AngularPoint]) -> Result<AngularPoint> {
        let expected = self.required_subapertures() * VERTICES_PER_SUBAPERTURE;
        if points.len() < expected {
            return Err(FootprintError::CatalogShape {
                channel: self.to_string(),
                expected,
                found: points.len(),
            });
        }

        let center = |k: usize| subaperture_center(points, k);
        let pivot = match *self {
            PivotRule::PairMidpoint([a, b]) => center(a).midpoint(&center(b)),
            PivotRule::DiagonalPairs([a, b, c, d]) => {
                let ac = center(a).midpoint(&center(c));
                let bd = center(b).midpoint(&center(d));
                ac.midpoint(&bd)
            }
        };
        Ok(pivot)
    }

    /// Resolve the pivot of a mosaic.
    ///
    /// The vertex list is duplicated with `shift` applied to the copy, the
    /// rule is applied to each half on its own, and the two half-pivots are
    /// averaged.
    pub fn resolve_mosaic(
        &self,
        points: &[AngularPoint],
        shift: AngularPoint,
    ) -> Result<AngularPoint> {
        let mut duplicated = points.to_vec();
        duplicated.extend(points.iter().map(|p| p.offset(shift.v2, shift.v3)));

        let (first, second) = duplicated.split_at(points.len());
        let first_pivot = self.resolve(first)?;
        let second_pivot = self.resolve(second)?;
        Ok(first_pivot.midpoint(&second_pivot))
    }
}

impl fmt::Display for PivotRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PivotRule::PairMidpoint([a, b]) => write!(f, "pair midpoint of sub-apertures {a},{b}"),
            PivotRule::DiagonalPairs([a, b, c, d]) => {
                write!(f, "diagonal pairs of sub-apertures {a},{b},{c},{d}")
            }
        }
    }
}

/// Center of sub-aperture `k`: midpoint of its diagonal corners.
pub fn subaperture_center(points: &[AngularPoint], k: usize) -> AngularPoint {
    let base = k * VERTICES_PER_SUBAPERTURE;
    points[base].midpoint(&points[base + 2])
}

/// Pivot of a validated channel catalog.
pub fn resolve_pivot(catalog: &ApertureCatalog) -> Result<AngularPoint> {
    catalog.channel().pivot_rule().resolve(&catalog.points())
}

/// Pivot of a channel catalog replicated at a second, user-shifted pointing.
pub fn resolve_mosaic_pivot(
    catalog: &ApertureCatalog,
    shift: AngularPoint,
) -> Result<AngularPoint> {
    catalog
        .channel()
        .pivot_rule()
        .resolve_mosaic(&catalog.points(), shift)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aperture::ApertureChannel;
    use approx::assert_abs_diff_eq;

    fn square(center: AngularPoint, half: f64) -> Vec<AngularPoint> {
        vec![
            center.offset(-half, -half),
            center.offset(half, -half),
            center.offset(half, half),
            center.offset(-half, half),
            center.offset(-half, -half),
        ]
    }

    fn layout(centers: &[AngularPoint]) -> Vec<AngularPoint> {
        centers.iter().flat_map(|c| square(*c, 1.0)).collect()
    }

    #[test]
    fn test_symmetric_wide_channel_resolves_to_origin() {
        let points = layout(&[AngularPoint::new(-1.0, 0.0), AngularPoint::new(1.0, 0.0)]);
        let catalog = ApertureCatalog::from_points(ApertureChannel::NircamLong, &points).unwrap();
        let pivot = resolve_pivot(&catalog).unwrap();
        assert_abs_diff_eq!(pivot.v2, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(pivot.v3, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_subaperture_center_uses_diagonal_corners() {
        let points = square(AngularPoint::new(12.0, -7.0), 3.0);
        assert_eq!(subaperture_center(&points, 0), AngularPoint::new(12.0, -7.0));
    }

    #[test]
    fn test_shutter_array_ignores_ifu() {
        let quadrants = [
            AngularPoint::new(-10.0, -10.0),
            AngularPoint::new(10.0, -10.0),
            AngularPoint::new(10.0, 10.0),
            AngularPoint::new(-10.0, 10.0),
        ];
        let mut centers = quadrants.to_vec();
        centers.push(AngularPoint::new(300.0, 300.0));
        let catalog =
            ApertureCatalog::from_points(ApertureChannel::Msa, &layout(&centers)).unwrap();

        let pivot = resolve_pivot(&catalog).unwrap();
        assert_abs_diff_eq!(pivot.v2, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(pivot.v3, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_narrow_channel_selects_subapertures_0_1_4_5() {
        let mut centers: Vec<AngularPoint> = (0..8)
            .map(|i| AngularPoint::new(1000.0 + i as f64, 1000.0))
            .collect();
        centers[0] = AngularPoint::new(-20.0, 4.0);
        centers[1] = AngularPoint::new(-10.0, 4.0);
        centers[4] = AngularPoint::new(10.0, 8.0);
        centers[5] = AngularPoint::new(20.0, 8.0);
        let catalog =
            ApertureCatalog::from_points(ApertureChannel::NircamShort, &layout(&centers)).unwrap();

        // mid(mid(c0, c4), mid(c1, c5)) = mid((-5, 6), (5, 6))
        let pivot = resolve_pivot(&catalog).unwrap();
        assert_abs_diff_eq!(pivot.v2, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(pivot.v3, 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_mosaic_pivot_averages_both_halves() {
        let points = layout(&[AngularPoint::new(-1.0, 0.0), AngularPoint::new(1.0, 0.0)]);
        let catalog = ApertureCatalog::from_points(ApertureChannel::NircamLong, &points).unwrap();
        let pivot = resolve_mosaic_pivot(&catalog, AngularPoint::new(10.0, 5.0)).unwrap();
        assert_abs_diff_eq!(pivot.v2, 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(pivot.v3, 2.5, epsilon = 1e-12);
    }

    #[test]
    fn test_short_list_rejected() {
        let points = square(AngularPoint::new(0.0, 0.0), 1.0);
        let err = PivotRule::DiagonalPairs([0, 1, 4, 5]).resolve(&points).unwrap_err();
        assert!(matches!(
            err,
            FootprintError::CatalogShape {
                expected: 30,
                found: 5,
                ..
            }
        ));
    }
}
