//! User configuration and its on-disk store.
//!
//! The record uses the key names of the legacy desktop form so existing
//! `config.json` files keep working, including its `"yes"`/`"no"` flags.
//! Everything is stored in `~/.footprints/` by default.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;
use crate::geometry::{AngularPoint, Pointing};
use crate::schedule::DitherMode;

/// Directory under `$HOME` holding the configuration
pub const CONFIG_DIR_NAME: &str = ".footprints";
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Image display settings passed through to the viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Color map name
    pub cmap: String,
    /// Lower intensity scale limit
    pub lim_min: f64,
    /// Upper intensity scale limit
    pub lim_max: f64,
    /// Intensity scale function (`log`, `linear`, `sqrt`, ...)
    pub scale: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            cmap: "grey".to_string(),
            lim_min: 0.0,
            lim_max: 30.0,
            scale: "log".to_string(),
        }
    }
}

/// Full footprint request as entered by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FootprintConfig {
    /// Reference image supplying the world-coordinate transform
    #[serde(rename = "fits_name")]
    pub image: PathBuf,
    /// Optional point-source list
    #[serde(rename = "cat_name")]
    pub catalog: PathBuf,

    #[serde(deserialize_with = "yes_no")]
    pub plot_long: bool,
    #[serde(deserialize_with = "yes_no")]
    pub plot_short: bool,
    #[serde(deserialize_with = "yes_no")]
    pub plot_msa: bool,
    #[serde(deserialize_with = "yes_no")]
    pub plot_src: bool,

    pub ra_nircam: f64,
    pub dec_nircam: f64,
    pub theta_nircam: f64,
    pub dither: DitherMode,
    #[serde(deserialize_with = "yes_no")]
    pub mosaic: bool,
    /// Mosaic shift along V2, arcseconds
    pub off_h: f64,
    /// Mosaic shift along V3, arcseconds
    pub off_v: f64,

    pub ra_nirspec: f64,
    pub dec_nirspec: f64,
    pub theta_nirspec: f64,

    pub color_msa: String,
    pub color_short: String,
    pub color_long: String,

    #[serde(flatten)]
    pub display: DisplayConfig,
}

impl Default for FootprintConfig {
    fn default() -> Self {
        Self {
            image: PathBuf::new(),
            catalog: PathBuf::new(),
            plot_long: true,
            plot_short: true,
            plot_msa: true,
            plot_src: false,
            ra_nircam: 202.47,
            dec_nircam: 47.2,
            theta_nircam: 0.0,
            dither: DitherMode::None,
            mosaic: false,
            off_h: 0.0,
            off_v: 0.0,
            ra_nirspec: 202.47,
            dec_nirspec: 47.2,
            theta_nirspec: 0.0,
            color_msa: "red".to_string(),
            color_short: "green".to_string(),
            color_long: "blue".to_string(),
            display: DisplayConfig::default(),
        }
    }
}

impl FootprintConfig {
    pub fn nircam_pointing(&self) -> Pointing {
        Pointing::new(self.ra_nircam, self.dec_nircam, self.theta_nircam)
    }

    pub fn msa_pointing(&self) -> Pointing {
        Pointing::new(self.ra_nirspec, self.dec_nirspec, self.theta_nirspec)
    }

    /// User shift of the second mosaic pointing, when a mosaic is requested
    pub fn mosaic_shift(&self) -> Option<AngularPoint> {
        self.mosaic.then(|| AngularPoint::new(self.off_h, self.off_v))
    }

    /// Load from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Save as pretty-printed JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Accept either a JSON boolean or the legacy `"yes"`/`"no"` strings.
fn yes_no<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => Ok(b),
        Flag::Text(s) => match s.to_ascii_lowercase().as_str() {
            "yes" | "true" => Ok(true),
            "no" | "false" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected yes/no, found '{other}'"
            ))),
        },
    }
}

/// Location of the persisted configuration.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    /// Root directory (e.g. ~/.footprints)
    root_path: PathBuf,
}

impl ConfigStore {
    /// Store at the default location (~/.footprints)
    pub fn new() -> std::io::Result<Self> {
        let home = std::env::var("HOME")
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::NotFound, "HOME not set"))?;
        Ok(Self {
            root_path: PathBuf::from(home).join(CONFIG_DIR_NAME),
        })
    }

    /// Store under a custom root directory
    pub fn with_path(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn config_path(&self) -> PathBuf {
        self.root_path.join(CONFIG_FILE_NAME)
    }

    /// Load the stored configuration, creating it from defaults on first use.
    pub fn load_or_default(&self) -> Result<FootprintConfig> {
        let path = self.config_path();
        if path.exists() {
            log::debug!("Loading configuration from {}", path.display());
            return FootprintConfig::load_from_file(&path);
        }

        log::info!("No configuration at {}, writing defaults", path.display());
        let config = FootprintConfig::default();
        self.save(&config)?;
        Ok(config)
    }

    pub fn save(&self, config: &FootprintConfig) -> Result<()> {
        fs::create_dir_all(&self.root_path)?;
        config.save_to_file(&self.config_path())
    }
}
