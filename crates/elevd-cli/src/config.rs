//! YAML configuration.
//!
//! ```yaml
//! data_folder: /srv/dem
//! open_handles: 8
//! no_data_value: -9999
//! honor_tile_no_data: true
//! extensions: [tif, tiff, hgt]
//! ```
//!
//! Every key is optional.

use crate::{CliError, Result};
use elevd_dem::{EngineConfig, FileRasterSource, DEFAULT_EXTENSIONS, DEFAULT_NO_DATA, DEFAULT_OPEN_HANDLES};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Root directory scanned for tiles.
    pub data_folder: PathBuf,
    /// Maximum number of decoded tiles kept in memory.
    pub open_handles: usize,
    /// Pixel value reported as no-data.
    pub no_data_value: f64,
    /// Also honor the no-data value declared inside each tile.
    pub honor_tile_no_data: bool,
    /// File extensions considered during scans.
    pub extensions: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_folder: PathBuf::from("data"),
            open_handles: DEFAULT_OPEN_HANDLES,
            no_data_value: DEFAULT_NO_DATA,
            honor_tile_no_data: true,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

impl Config {
    /// Load a YAML config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| CliError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&text).map_err(|source| CliError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            no_data_value: self.no_data_value,
            honor_tile_no_data: self.honor_tile_no_data,
        }
    }

    pub fn raster_source(&self) -> FileRasterSource {
        FileRasterSource::new(self.open_handles).with_extensions(&self.extensions)
    }
}
