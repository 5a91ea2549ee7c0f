//! Per-directory source metadata and tile priority.
//!
//! A data directory may hold a `metadata.json` describing the dataset below
//! it:
//!
//! ```json
//! { "name": "ArcticDEM 32m", "priority": 2000, "resolution": 32,
//!   "date": "2017-03-15", "dynamic_priority": 5 }
//! ```
//!
//! Fields not given are inherited from the nearest ancestor directory that
//! sets them, falling back to [`SourceInfo::default`]. Lower priority values
//! are preferred.

use crate::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Name of the per-directory metadata file.
pub const METADATA_FILE: &str = "metadata.json";

/// Age assumed for sources without a usable date (30 years).
const DEFAULT_AGE_MONTHS: i64 = 360;

/// Average month length used for ages.
const DAYS_PER_MONTH: f64 = 30.4375;

/// Contents of one `metadata.json`; absent fields inherit.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SourceMetadata {
    pub name: Option<String>,
    pub priority: Option<i64>,
    pub resolution: Option<f64>,
    pub date: Option<String>,
    pub dynamic_priority: Option<i64>,
}

impl SourceMetadata {
    /// Read `metadata.json` from `dir`, if present.
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(METADATA_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    /// Like [`load`](Self::load), but a broken file is logged and ignored.
    pub fn load_or_warn(dir: &Path) -> Option<Self> {
        match Self::load(dir) {
            Ok(meta) => meta,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "ignoring unreadable {}", METADATA_FILE);
                None
            }
        }
    }
}

/// Effective metadata of a directory after inheritance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceInfo {
    pub name: String,
    pub priority: i64,
    /// Nominal ground resolution in meters.
    pub resolution: f64,
    pub date: Option<String>,
    pub dynamic_priority: Option<i64>,
}

impl Default for SourceInfo {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            priority: 9999,
            resolution: 2000.0,
            date: None,
            dynamic_priority: None,
        }
    }
}

impl SourceInfo {
    /// Apply a child directory's overrides on top of `self`.
    pub fn overlay(&self, meta: &SourceMetadata) -> SourceInfo {
        SourceInfo {
            name: meta.name.clone().unwrap_or_else(|| self.name.clone()),
            priority: meta.priority.unwrap_or(self.priority),
            resolution: meta.resolution.unwrap_or(self.resolution),
            date: meta.date.clone().or_else(|| self.date.clone()),
            dynamic_priority: meta.dynamic_priority.or(self.dynamic_priority),
        }
    }

    /// Priority used to order tiles, as of `today`.
    ///
    /// Without `dynamic_priority` this is the static `priority`. Otherwise
    /// finer resolution, newer data, and a larger `dynamic_priority` all
    /// lower the value:
    ///
    /// `priority - (1000 - resolution) - (360 - age_months) - dynamic_priority`
    pub fn effective_priority(&self, today: NaiveDate) -> i64 {
        let Some(dynamic) = self.dynamic_priority else {
            return self.priority;
        };

        let age = self
            .date
            .as_deref()
            .and_then(|date| age_in_months(date, today))
            .unwrap_or(DEFAULT_AGE_MONTHS);
        let resolution_adjustment = (1000.0 - self.resolution).round() as i64;

        self.priority - resolution_adjustment - (DEFAULT_AGE_MONTHS - age) - dynamic
    }
}

/// Whole months between a `YYYY-MM-DD` date and `today`, rounded.
///
/// Returns `None` for malformed dates.
pub fn age_in_months(date: &str, today: NaiveDate) -> Option<i64> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()?;
    let days = (today - date).num_days();
    Some((days as f64 / DAYS_PER_MONTH).round() as i64)
}
