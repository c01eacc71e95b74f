//! Sky projection of aperture vertices for every schedule entry.

use crate::error::Result;
use crate::geometry::{AngularPoint, AttitudeMatrix, Pointing, SkyPoint};
use crate::schedule::OffsetSchedule;

/// One full application of one schedule entry.
#[derive(Debug, Clone, PartialEq)]
pub struct FootprintInstance {
    /// Schedule entry that produced this instance
    pub offset: AngularPoint,
    /// Attitude built from `pivot + offset`
    pub attitude: AttitudeMatrix,
    /// Sky position of every catalog vertex, in catalog order
    pub points: Vec<SkyPoint>,
}

impl FootprintInstance {
    /// Project `points` through the attitude that puts `pivot + offset` on the target.
    pub fn new(
        points: &[AngularPoint],
        pivot: AngularPoint,
        offset: AngularPoint,
        pointing: &Pointing,
    ) -> Result<Self> {
        let attitude = AttitudeMatrix::new(pivot.offset(offset.v2, offset.v3), pointing);
        let points = points
            .iter()
            .map(|p| attitude.project(*p))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            offset,
            attitude,
            points,
        })
    }
}

/// Project a channel's vertices for every entry of `schedule`, in schedule order.
pub fn project_schedule(
    points: &[AngularPoint],
    pivot: AngularPoint,
    schedule: &OffsetSchedule,
    pointing: &Pointing,
) -> Result<Vec<FootprintInstance>> {
    schedule
        .entries()
        .iter()
        .map(|offset| {
            log::debug!(
                "Attitude pivot ({:.3}, {:.3}) arcsec",
                pivot.v2 + offset.v2,
                pivot.v3 + offset.v3
            );
            FootprintInstance::new(points, pivot, *offset, pointing)
        })
        .collect()
}

/// Concatenate instance vertices in schedule order.
pub fn flatten(instances: &[FootprintInstance]) -> Vec<SkyPoint> {
    instances
        .iter()
        .flat_map(|instance| instance.points.iter().copied())
        .collect()
}
