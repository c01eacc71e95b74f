//! Generate NIRCam and NIRSpec footprint overlays for a reference image.
//!
//! Settings come from the stored configuration (`~/.footprints/config.json`
//! unless `--config` points elsewhere) with any command line overrides
//! applied on top. Region files and the `display.ds9` command script are
//! written to `--output-dir`.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;

use footprint::{
    generate, ConfigStore, DitherMode, FootprintConfig, SkyToPixel, TableDirectory, TanWcs,
};

/// Instrument footprint overlay generator
#[derive(Parser, Debug)]
#[command(name = "footprints")]
#[command(about = "Project NIRCam and NIRSpec footprints onto a reference image")]
#[command(version)]
struct Args {
    /// Configuration directory (default: ~/.footprints)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Reference FITS image with a TAN world-coordinate header
    #[arg(long)]
    image: Option<PathBuf>,

    /// Point-source list to overlay
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Directory holding the aperture tables
    #[arg(long, default_value = ".")]
    tables: PathBuf,

    /// Directory receiving region files and the display script
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Draw the NIRCam long wavelength channel
    #[arg(long)]
    plot_long: Option<bool>,

    /// Draw the NIRCam short wavelength channel
    #[arg(long)]
    plot_short: Option<bool>,

    /// Draw the NIRSpec micro-shutter array
    #[arg(long)]
    plot_msa: Option<bool>,

    /// Draw the point-source list
    #[arg(long)]
    plot_src: Option<bool>,

    /// NIRCam target right ascension in degrees
    #[arg(long)]
    ra: Option<f64>,

    /// NIRCam target declination in degrees
    #[arg(long, allow_negative_numbers = true)]
    dec: Option<f64>,

    /// NIRCam position angle in degrees
    #[arg(long, allow_negative_numbers = true)]
    pa: Option<f64>,

    /// NIRCam dither pattern
    #[arg(long, value_enum)]
    dither: Option<DitherMode>,

    /// Replicate the NIRCam pattern at a second pointing
    #[arg(long)]
    mosaic: Option<bool>,

    /// Mosaic shift along V2 in arcseconds
    #[arg(long, allow_negative_numbers = true)]
    off_h: Option<f64>,

    /// Mosaic shift along V3 in arcseconds
    #[arg(long, allow_negative_numbers = true)]
    off_v: Option<f64>,

    /// NIRSpec target right ascension in degrees
    #[arg(long)]
    msa_ra: Option<f64>,

    /// NIRSpec target declination in degrees
    #[arg(long, allow_negative_numbers = true)]
    msa_dec: Option<f64>,

    /// NIRSpec position angle in degrees
    #[arg(long, allow_negative_numbers = true)]
    msa_pa: Option<f64>,

    /// Region color of the NIRCam long wavelength channel
    #[arg(long)]
    color_long: Option<String>,

    /// Region color of the NIRCam short wavelength channel
    #[arg(long)]
    color_short: Option<String>,

    /// Region color of the micro-shutter array
    #[arg(long)]
    color_msa: Option<String>,

    /// Display color map
    #[arg(long)]
    cmap: Option<String>,

    /// Lower display scale limit
    #[arg(long, allow_negative_numbers = true)]
    lim_min: Option<f64>,

    /// Upper display scale limit
    #[arg(long, allow_negative_numbers = true)]
    lim_max: Option<f64>,

    /// Display scale function
    #[arg(long)]
    scale: Option<String>,

    /// Store the merged settings back into the configuration file
    #[arg(long)]
    save_config: bool,
}

impl Args {
    /// Overlay command line values onto the stored configuration
    fn apply(&self, config: &mut FootprintConfig) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(v) = value {
                *target = v.clone();
            }
        }

        set(&mut config.image, &self.image);
        set(&mut config.catalog, &self.catalog);
        set(&mut config.plot_long, &self.plot_long);
        set(&mut config.plot_short, &self.plot_short);
        set(&mut config.plot_msa, &self.plot_msa);
        set(&mut config.plot_src, &self.plot_src);
        set(&mut config.ra_nircam, &self.ra);
        set(&mut config.dec_nircam, &self.dec);
        set(&mut config.theta_nircam, &self.pa);
        set(&mut config.dither, &self.dither);
        set(&mut config.mosaic, &self.mosaic);
        set(&mut config.off_h, &self.off_h);
        set(&mut config.off_v, &self.off_v);
        set(&mut config.ra_nirspec, &self.msa_ra);
        set(&mut config.dec_nirspec, &self.msa_dec);
        set(&mut config.theta_nirspec, &self.msa_pa);
        set(&mut config.color_long, &self.color_long);
        set(&mut config.color_short, &self.color_short);
        set(&mut config.color_msa, &self.color_msa);
        set(&mut config.display.cmap, &self.cmap);
        set(&mut config.display.lim_min, &self.lim_min);
        set(&mut config.display.lim_max, &self.lim_max);
        set(&mut config.display.scale, &self.scale);
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let store = match &args.config {
        Some(dir) => ConfigStore::with_path(dir.clone()),
        None => ConfigStore::new().context("Failed to locate configuration directory")?,
    };
    let mut config = store.load_or_default()?;
    args.apply(&mut config);

    if args.save_config {
        store.save(&config)?;
        info!("Saved configuration to {}", store.config_path().display());
    }

    if config.image.as_os_str().is_empty() {
        bail!("No reference image: pass --image or set fits_name in the configuration");
    }

    let wcs = TanWcs::from_fits(&config.image)
        .with_context(|| format!("Failed to read WCS from {}", config.image.display()))?;
    let probe = wcs
        .sky_to_pixel(config.nircam_pointing().target())
        .context("Reference image cannot map the NIRCam target")?;
    info!(
        "Valid WCS: target ({:.5}, {:.5}) at pixel ({:.2}, {:.2})",
        config.ra_nircam, config.dec_nircam, probe.x, probe.y
    );

    let tables = TableDirectory::new(args.tables.clone());
    let run = generate(&config, &tables, &wcs);
    let (written, _plan) = run.write(&args.output_dir, &config.image, &config)?;
    println!(
        "Wrote {} region files to {}",
        written.len(),
        args.output_dir.display()
    );

    if !run.is_complete() {
        for failure in &run.failures {
            eprintln!("  {failure}");
        }
        bail!("{} channel(s) failed", run.failures.len());
    }
    Ok(())
}
