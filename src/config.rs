//! Run configuration.
//!
//! Every field has a default tuned for Riyadh, so a config file only needs
//! the values it overrides:
//!
//! ```json
//! { "resolver": { "request_delay_ms": 500 }, "worksheet": "Sheet1" }
//! ```

use crate::error::{PrepError, Result};
use crate::location::{BoundingBox, LatLng};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Riyadh centre, the reference point for Plus Code recovery.
pub const RIYADH_CENTER: LatLng = LatLng { lat: 24.7136, lng: 46.6753 };

/// Approximate extent of Riyadh.
pub const RIYADH_BOUNDS: BoundingBox = BoundingBox {
    lat_min: 24.3,
    lat_max: 25.2,
    lng_min: 46.2,
    lng_max: 47.2,
};

pub const DEFAULT_WORKSHEET: &str = "جميع القراء";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub bounds: BoundingBox,
    pub reference: LatLng,
    /// Hosts treated as link shorteners (subdomains match too).
    pub short_url_hosts: Vec<String>,
    /// Pause before every short-URL fetch.
    pub request_delay_ms: u64,
    pub request_timeout_secs: u64,
    /// Flush the cache after this many processed records.
    pub flush_every: usize,
    pub user_agent: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            bounds: RIYADH_BOUNDS,
            reference: RIYADH_CENTER,
            short_url_hosts: vec!["goo.gl".into(), "maps.app.goo.gl".into()],
            request_delay_ms: 2000,
            request_timeout_secs: 15,
            flush_every: 20,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) masjid-prep/0.3".into(),
        }
    }
}

impl ResolverConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub timeout_secs: u64,
    pub audio_format: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            audio_format: "bestaudio[ext=m4a]/bestaudio".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PrepConfig {
    pub resolver: ResolverConfig,
    pub download: DownloadConfig,
    pub worksheet: Option<String>,
}

impl PrepConfig {
    /// Load from a JSON file, or fall back to defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let data = fs::read_to_string(path)?;
        let config: PrepConfig = serde_json::from_str(&data)
            .map_err(|e| PrepError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let b = &self.resolver.bounds;
        if b.lat_min > b.lat_max || b.lng_min > b.lng_max {
            return Err(PrepError::Config("bounding box minimum exceeds maximum".into()));
        }
        if self.resolver.flush_every == 0 {
            return Err(PrepError::Config("flush_every must be at least 1".into()));
        }
        Ok(())
    }

    pub fn worksheet(&self) -> &str {
        self.worksheet.as_deref().unwrap_or(DEFAULT_WORKSHEET)
    }
}
