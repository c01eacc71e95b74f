//! End-to-end footprint generation for one or more channels.
//!
//! Each requested channel runs independently: its catalog is loaded, the
//! pivot resolved, the schedule expanded and every instance projected. The
//! resulting region lists are complete before anything is written. A channel
//! that fails is reported with its mode and does not affect the others.
//!
//! ```text
//! catalog ─► pivot ─► schedule ─► projector ─► region lists ─► files + display plan
//! ```

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use thiserror::Error;

use crate::aperture::{ApertureCatalog, ApertureChannel, ApertureSource};
use crate::config::FootprintConfig;
use crate::display::DisplayPlan;
use crate::error::{FootprintError, Result};
use crate::geometry::{AngularPoint, Pointing, SkyPoint};
use crate::pivot::{resolve_mosaic_pivot, resolve_pivot};
use crate::projector::{flatten, project_schedule, FootprintInstance};
use crate::region::RegionList;
use crate::schedule::{DitherMode, OffsetSchedule};
use crate::sources::SourceCatalog;
use crate::wcs::SkyToPixel;

/// A channel computation that failed, with the request that caused it.
#[derive(Error, Debug)]
#[error("{channel} ({mode}): {source}")]
pub struct ChannelFailure {
    pub channel: ApertureChannel,
    /// Dither mode, suffixed with `+ mosaic` for mosaic requests
    pub mode: String,
    #[source]
    pub source: FootprintError,
}

/// Parameters for one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelRequest {
    pub channel: ApertureChannel,
    pub pointing: Pointing,
    pub mode: DitherMode,
    pub mosaic_shift: Option<AngularPoint>,
    /// Region color
    pub color: String,
}

impl ChannelRequest {
    /// Human readable mode, used when reporting failures
    pub fn mode_label(&self) -> String {
        if self.mosaic_shift.is_some() {
            format!("{} + mosaic", self.mode)
        } else {
            self.mode.to_string()
        }
    }

    fn fail(&self, source: FootprintError) -> ChannelFailure {
        ChannelFailure {
            channel: self.channel,
            mode: self.mode_label(),
            source,
        }
    }
}

/// Requests for every channel enabled in `config`, in display order.
///
/// The shutter array is always a single pointing with its own target; the
/// NIRCam channels share the dither and mosaic settings.
pub fn requests_from_config(config: &FootprintConfig) -> Vec<ChannelRequest> {
    let mut requests = Vec::new();
    let nircam = |channel, color: &str| ChannelRequest {
        channel,
        pointing: config.nircam_pointing(),
        mode: config.dither,
        mosaic_shift: config.mosaic_shift(),
        color: color.to_string(),
    };

    if config.plot_long {
        requests.push(nircam(ApertureChannel::NircamLong, &config.color_long));
    }
    if config.plot_short {
        requests.push(nircam(ApertureChannel::NircamShort, &config.color_short));
    }
    if config.plot_msa {
        requests.push(ChannelRequest {
            channel: ApertureChannel::Msa,
            pointing: config.msa_pointing(),
            mode: DitherMode::None,
            mosaic_shift: None,
            color: config.color_msa.clone(),
        });
    }
    requests
}

/// Sky footprint of one channel request.
#[derive(Debug, Clone)]
pub struct ChannelFootprint {
    request: ChannelRequest,
    schedule: OffsetSchedule,
    pivot: AngularPoint,
    instances: Vec<FootprintInstance>,
}

impl ChannelFootprint {
    /// Project `catalog` for every entry of the requested schedule.
    pub fn compute(request: &ChannelRequest, catalog: &ApertureCatalog) -> Result<Self> {
        if catalog.channel() != request.channel {
            return Err(FootprintError::CatalogShape {
                channel: format!("{} (catalog is {})", request.channel, catalog.channel()),
                expected: request.channel.expected_rows(),
                found: catalog.len(),
            });
        }

        let schedule = OffsetSchedule::new(request.mode, request.mosaic_shift)?;
        let base = match request.mosaic_shift {
            Some(shift) => resolve_mosaic_pivot(catalog, shift)?,
            None => resolve_pivot(catalog)?,
        };
        let recenter = request.mode.pivot_recentering();
        let pivot = base.offset(recenter.v2, recenter.v3);
        log::debug!(
            "{} pivot ({:.3}, {:.3}) arcsec, {} schedule entries",
            request.channel,
            pivot.v2,
            pivot.v3,
            schedule.len()
        );

        let instances = project_schedule(&catalog.points(), pivot, &schedule, &request.pointing)?;

        Ok(Self {
            request: request.clone(),
            schedule,
            pivot,
            instances,
        })
    }

    pub fn request(&self) -> &ChannelRequest {
        &self.request
    }

    pub fn schedule(&self) -> &OffsetSchedule {
        &self.schedule
    }

    /// Pivot used for every instance, before schedule offsets
    pub fn pivot(&self) -> AngularPoint {
        self.pivot
    }

    pub fn instances(&self) -> &[FootprintInstance] {
        &self.instances
    }

    /// All instance vertices, in schedule order
    pub fn sky_points(&self) -> Vec<SkyPoint> {
        flatten(&self.instances)
    }

    /// Nominal pointing marker; the pivot lands on the target by construction.
    pub fn center(&self) -> SkyPoint {
        self.request.pointing.target()
    }

    pub fn data_file_name(&self) -> String {
        match self.request.channel {
            ApertureChannel::Msa => "ds9-msa.reg".to_string(),
            channel => format!("ds9-{}-{}.reg", channel.tag(), self.schedule.file_tag()),
        }
    }

    pub fn center_file_name(&self) -> String {
        format!("ds9-{}-centre.reg", self.request.channel.tag())
    }

    /// Center and data lists in layering order.
    ///
    /// NIRCam layers its center mark first; the shutter array draws its
    /// outline first.
    pub fn region_lists(&self, wcs: &dyn SkyToPixel) -> Result<Vec<RegionList>> {
        let color = self.request.color.as_str();
        let data = RegionList::polygons(
            self.data_file_name(),
            color,
            &self.sky_points(),
            Some(self.request.channel.tag()),
            wcs,
        )?;
        let center = RegionList::center_mark(self.center_file_name(), color, self.center(), wcs)?;

        Ok(match self.request.channel {
            ApertureChannel::Msa => vec![data, center],
            _ => vec![center, data],
        })
    }
}

/// Compute and rasterize one channel request.
pub fn run_channel(
    request: &ChannelRequest,
    tables: &dyn ApertureSource,
    wcs: &dyn SkyToPixel,
) -> std::result::Result<Vec<RegionList>, ChannelFailure> {
    let catalog = tables.catalog(request.channel).map_err(|e| request.fail(e))?;
    let footprint = ChannelFootprint::compute(request, &catalog).map_err(|e| request.fail(e))?;
    footprint.region_lists(wcs).map_err(|e| request.fail(e))
}

/// Region lists of a full run, plus the channels that failed.
#[derive(Debug, Default)]
pub struct FootprintRun {
    pub lists: Vec<RegionList>,
    pub failures: Vec<ChannelFailure>,
}

impl FootprintRun {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Write every list into `dir` and build the matching display plan.
    pub fn write(
        &self,
        dir: &Path,
        image: &Path,
        config: &FootprintConfig,
    ) -> Result<(Vec<PathBuf>, DisplayPlan)> {
        let mut plan = DisplayPlan::new(image, &config.display);
        let mut written = Vec::with_capacity(self.lists.len());
        for list in &self.lists {
            let path = list.write_to(dir)?;
            plan.add_regions(&path);
            written.push(path);
        }
        plan.write_to(dir)?;
        Ok((written, plan))
    }
}

/// Generate every overlay requested by `config`.
///
/// Channels are computed in parallel; results keep request order. A source
/// list that cannot be read is skipped with a warning.
pub fn generate<A, W>(config: &FootprintConfig, tables: &A, wcs: &W) -> FootprintRun
where
    A: ApertureSource + Sync,
    W: SkyToPixel + Sync,
{
    let requests = requests_from_config(config);
    let results: Vec<_> = requests
        .par_iter()
        .map(|request| run_channel(request, tables, wcs))
        .collect();

    let mut run = FootprintRun::default();
    for result in results {
        match result {
            Ok(lists) => run.lists.extend(lists),
            Err(failure) => {
                log::error!("{failure}");
                run.failures.push(failure);
            }
        }
    }

    if config.plot_src {
        match source_lists(&config.catalog, wcs) {
            Ok(lists) => run.lists.extend(lists),
            Err(e) => log::warn!("Skipping source overlay: {e}"),
        }
    }

    run
}

fn source_lists(path: &Path, wcs: &dyn SkyToPixel) -> Result<Vec<RegionList>> {
    let catalog = SourceCatalog::load(path)?;
    log::debug!("Loaded {} sources from {}", catalog.len(), path.display());
    catalog.region_lists(wcs)
}
