//! Full pipeline runs against synthetic aperture tables and a synthetic TAN image.

use std::path::PathBuf;

use approx::assert_abs_diff_eq;
use footprint::pipeline::ChannelFootprint;
use footprint::{
    generate, AngularPoint, ApertureChannel, ApertureSource, ChannelRequest, DitherMode,
    FootprintConfig, FootprintError, PixelPoint, Pointing, RegionShape, SkyPoint, SkyToPixel,
    TableDirectory, TanWcs,
};
use tempfile::TempDir;
use test_helpers::{output_path, write_synthetic_tables, write_tan_fits};

const CRPIX: (f64, f64) = (512.0, 512.0);
/// 0.36 arcsec per pixel
const SCALE: f64 = 1e-4;

struct Fixture {
    dir: TempDir,
    tables: TableDirectory,
    image: PathBuf,
    wcs: TanWcs,
}

fn fixture(crval: (f64, f64)) -> Fixture {
    let dir = TempDir::new().unwrap();
    write_synthetic_tables(dir.path()).unwrap();
    let image = dir.path().join("reference.fits");
    write_tan_fits(&image, crval, CRPIX, SCALE).unwrap();

    let wcs = TanWcs::from_fits(&image).unwrap();
    let tables = TableDirectory::new(dir.path().to_path_buf());
    Fixture {
        dir,
        tables,
        image,
        wcs,
    }
}

fn long_only(ra: f64, dec: f64) -> FootprintConfig {
    FootprintConfig {
        plot_long: true,
        plot_short: false,
        plot_msa: false,
        plot_src: false,
        ra_nircam: ra,
        dec_nircam: dec,
        theta_nircam: 0.0,
        ..FootprintConfig::default()
    }
}

fn marker(shape: &RegionShape) -> PixelPoint {
    match shape {
        RegionShape::Point { position } => *position,
        other => panic!("expected center mark, got {other:?}"),
    }
}

#[test]
fn test_wide_channel_single_pointing_end_to_end() {
    let fx = fixture((180.0, 0.0));
    let config = long_only(180.0, 0.0);

    let run = generate(&config, &fx.tables, &fx.wcs);
    assert!(run.is_complete());
    assert_eq!(run.lists.len(), 2);

    let center = &run.lists[0];
    let data = &run.lists[1];
    assert_eq!(center.file_name(), "ds9-long-centre.reg");
    assert_eq!(data.file_name(), "ds9-long-no.reg");

    // 2 sub-apertures, 5 vertices each
    assert_eq!(data.len(), 2);
    assert_eq!(data.polygon_vertices().len(), 10);

    // The pivot lands exactly where the image puts the target
    let expected = fx.wcs.sky_to_pixel(SkyPoint::new(180.0, 0.0)).unwrap();
    assert_eq!(marker(&center.shapes()[0]), expected);
    assert_eq!(expected, PixelPoint::new(CRPIX.0, CRPIX.1));

    // Symmetric detectors straddle the target
    let vertices = data.polygon_vertices();
    let mid_x = (vertices[0].x + vertices[7].x) / 2.0;
    let mid_y = (vertices[0].y + vertices[7].y) / 2.0;
    assert_abs_diff_eq!(mid_x, CRPIX.0, epsilon = 1e-6);
    assert_abs_diff_eq!(mid_y, CRPIX.1, epsilon = 1e-6);
}

#[test]
fn test_projected_pivot_matches_target() {
    let fx = fixture((180.0, 0.0));
    let catalog = fx.tables.catalog(ApertureChannel::NircamLong).unwrap();
    let request = ChannelRequest {
        channel: ApertureChannel::NircamLong,
        pointing: Pointing::new(180.0, 0.0, 0.0),
        mode: DitherMode::None,
        mosaic_shift: None,
        color: "blue".to_string(),
    };
    let footprint = ChannelFootprint::compute(&request, &catalog).unwrap();
    assert_eq!(footprint.pivot(), AngularPoint::new(0.0, 0.0));

    let sky = footprint.instances()[0]
        .attitude
        .project(footprint.pivot())
        .unwrap();
    assert_abs_diff_eq!(sky.ra, 180.0, epsilon = 1e-12);
    assert_abs_diff_eq!(sky.dec, 0.0, epsilon = 1e-12);
}

#[test]
fn test_six_point_mosaic_rejected_without_output() {
    let fx = fixture((202.47, 47.2));
    let config = FootprintConfig {
        dither: DitherMode::SixPoint,
        mosaic: true,
        off_h: 90.0,
        ..FootprintConfig::default()
    };

    let run = generate(&config, &fx.tables, &fx.wcs);
    assert_eq!(run.failures.len(), 2);
    for failure in &run.failures {
        assert!(matches!(
            failure.source,
            FootprintError::UnsupportedCombination { .. }
        ));
    }

    // Only the shutter array survives
    let names: Vec<&str> = run.lists.iter().map(|l| l.file_name()).collect();
    assert_eq!(names, ["ds9-msa.reg", "ds9-msa-centre.reg"]);
}

#[test]
fn test_mosaic_instances_emitted_in_schedule_order() {
    let fx = fixture((30.0, -20.0));
    let catalog = fx.tables.catalog(ApertureChannel::NircamLong).unwrap();
    let shift = AngularPoint::new(240.0, 0.0);
    let request = ChannelRequest {
        channel: ApertureChannel::NircamLong,
        pointing: Pointing::new(30.0, -20.0, 20.0),
        mode: DitherMode::None,
        mosaic_shift: Some(shift),
        color: "blue".to_string(),
    };
    let footprint = ChannelFootprint::compute(&request, &catalog).unwrap();
    assert_eq!(footprint.instances().len(), 2);

    let points = footprint.sky_points();
    assert_eq!(points.len(), 2 * catalog.len());
    assert_eq!(points[..catalog.len()], footprint.instances()[0].points[..]);
    assert_eq!(points[catalog.len()..], footprint.instances()[1].points[..]);

    let lists = footprint.region_lists(&fx.wcs).unwrap();
    assert_eq!(lists[1].file_name(), "ds9-long-mosaic.reg");
    assert_eq!(lists[1].len(), 4);
}

#[test]
fn test_all_channels_with_typed_sources() {
    let fx = fixture((202.47, 47.2));
    let sources = fx.dir.path().join("sources.txt");
    std::fs::write(
        &sources,
        "# ra dec type\n202.470 47.200 P\n202.475 47.205 F\n202.465 47.195 F\n202.46 47.19 Q\n",
    )
    .unwrap();

    let config = FootprintConfig {
        dither: DitherMode::ThreePoint,
        plot_src: true,
        catalog: sources,
        ..FootprintConfig::default()
    };
    let run = generate(&config, &fx.tables, &fx.wcs);
    assert!(run.is_complete());

    let names: Vec<&str> = run.lists.iter().map(|l| l.file_name()).collect();
    assert_eq!(
        names,
        [
            "ds9-long-centre.reg",
            "ds9-long-three.reg",
            "ds9-short-centre.reg",
            "ds9-short-three.reg",
            "ds9-msa.reg",
            "ds9-msa-centre.reg",
            "ds9-sources-fillers.reg",
            "ds9-sources-primary.reg",
        ]
    );
    // 3 dithers of 8 detectors
    assert_eq!(run.lists[3].len(), 24);
    assert_eq!(run.lists[6].len(), 2);
    assert_eq!(run.lists[7].len(), 1);

    let out_dir = output_path("footprints_all_channels");
    let (written, plan) = run.write(&out_dir, &fx.image, &config).unwrap();
    assert_eq!(written.len(), names.len());
    assert_eq!(plan.region_files(), written);
    assert!(out_dir.join("display.ds9").exists());
    assert!(plan
        .commands()
        .contains(&format!("file {}", fx.image.display())));
}

#[test]
fn test_target_off_image_plane_fails_channel() {
    // The image looks at the opposite side of the sky
    let fx = fixture((0.0, 0.0));
    let run = generate(&long_only(180.0, 0.0), &fx.tables, &fx.wcs);
    assert!(run.lists.is_empty());
    assert!(matches!(
        run.failures[0].source,
        FootprintError::InvalidWorldCoordinate(_)
    ));
}

#[test]
fn test_missing_tables_reported_per_channel() {
    let fx = fixture((180.0, 0.0));
    let empty = TableDirectory::new(fx.dir.path().join("nowhere"));
    let run = generate(&long_only(180.0, 0.0), &empty, &fx.wcs);
    assert_eq!(run.failures.len(), 1);
    assert_eq!(run.failures[0].channel, ApertureChannel::NircamLong);
    assert!(matches!(run.failures[0].source, FootprintError::Io(_)));
}
