//! Hand-off to the image viewer.
//!
//! The viewer itself is driven elsewhere; this module only records the
//! ordered command list that loads the image, sets up the display scale and
//! layers the region files.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::DisplayConfig;
use crate::error::Result;

/// File name of the written command script
pub const DISPLAY_SCRIPT: &str = "display.ds9";

/// Ordered viewer commands.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayPlan {
    commands: Vec<String>,
}

impl DisplayPlan {
    /// Start a plan that opens `image` with the given display settings.
    pub fn new(image: &Path, display: &DisplayConfig) -> Self {
        let commands = vec![
            "tile yes".to_string(),
            "frame 1".to_string(),
            format!("cmap {}", display.cmap),
            format!("scale limits {} {}", display.lim_min, display.lim_max),
            format!("scale {}", display.scale),
            format!("file {}", image.display()),
        ];
        Self { commands }
    }

    /// Layer a region file on top of everything added so far.
    pub fn add_regions(&mut self, region_file: &Path) {
        self.commands.push(format!("regions {}", region_file.display()));
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Region files in layering order
    pub fn region_files(&self) -> Vec<PathBuf> {
        self.commands
            .iter()
            .filter_map(|c| c.strip_prefix("regions "))
            .map(PathBuf::from)
            .collect()
    }

    /// Write the plan as one command per line into `dir`.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(DISPLAY_SCRIPT);
        let mut script = self.commands.join("\n");
        script.push('\n');
        fs::write(&path, script)?;
        log::info!("Wrote display plan to {}", path.display());
        Ok(path)
    }
}
