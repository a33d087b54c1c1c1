//! Generator configuration.
//!
//! `StreamModel` and `SimulationConfig` are the immutable values the
//! simulator consumes. `GeneratorConfig` is the on-disk TOML layout the
//! binaries load, with defaults matching the stock dataset.

use crate::{Error, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Env var pointing at a generator config file
pub const CONFIG_ENV: &str = "STREAMSYNTH_CONFIG";

// ============================================================================
// Model Parameters
// ============================================================================

/// Parameters of the layered streaming model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamModel {
    pub base_mult_min: f64,
    pub base_mult_max: f64,
    pub weekend_boost_min: f64,
    pub weekend_boost_max: f64,
    pub viral_spike_probability: f64,
    pub viral_mult_min: f64,
    pub viral_mult_max: f64,
    pub summer_boost: f64,
    pub playlist_adds_divisor: f64,
}

impl Default for StreamModel {
    fn default() -> Self {
        Self {
            base_mult_min: 100.0,
            base_mult_max: 500.0,
            weekend_boost_min: 0.2,
            weekend_boost_max: 0.4,
            viral_spike_probability: 0.01,
            viral_mult_min: 3.0,
            viral_mult_max: 10.0,
            summer_boost: 0.15,
            playlist_adds_divisor: 50.0,
        }
    }
}

impl StreamModel {
    /// Model with every random layer pinned: base and weekend multipliers
    /// fixed at the given values and viral spikes disabled.
    pub fn fixed(base_mult: f64, weekend_boost: f64, summer_boost: f64) -> Self {
        Self {
            base_mult_min: base_mult,
            base_mult_max: base_mult,
            weekend_boost_min: weekend_boost,
            weekend_boost_max: weekend_boost,
            viral_spike_probability: 0.0,
            viral_mult_min: 1.0,
            viral_mult_max: 1.0,
            summer_boost,
            playlist_adds_divisor: 50.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_range("base_mult_min", "base_mult_max", self.base_mult_min, self.base_mult_max)?;
        check_range(
            "weekend_boost_min",
            "weekend_boost_max",
            self.weekend_boost_min,
            self.weekend_boost_max,
        )?;
        check_range("viral_mult_min", "viral_mult_max", self.viral_mult_min, self.viral_mult_max)?;

        let p = self.viral_spike_probability;
        if !(0.0..=1.0).contains(&p) {
            return Err(Error::config(
                "viral_spike_probability",
                format!("must be within [0, 1], got {}", p),
            ));
        }
        if !self.summer_boost.is_finite() || self.summer_boost < 0.0 {
            return Err(Error::config(
                "summer_boost",
                format!("must be a finite value >= 0, got {}", self.summer_boost),
            ));
        }
        if !self.playlist_adds_divisor.is_finite() || self.playlist_adds_divisor <= 0.0 {
            return Err(Error::config(
                "playlist_adds_divisor",
                format!("must be a finite value > 0, got {}", self.playlist_adds_divisor),
            ));
        }
        Ok(())
    }
}

/// Multipliers must be finite, non-negative and ordered so streams never go
/// negative.
fn check_range(min_name: &'static str, max_name: &'static str, min: f64, max: f64) -> Result<()> {
    for (name, value) in [(min_name, min), (max_name, max)] {
        if !value.is_finite() || value < 0.0 {
            return Err(Error::config(
                name,
                format!("must be a finite value >= 0, got {}", value),
            ));
        }
    }
    if min > max {
        return Err(Error::config(
            min_name,
            format!("{} must be <= {} ({})", min, max_name, max),
        ));
    }
    Ok(())
}

// ============================================================================
// Simulation Config
// ============================================================================

/// Validated simulation horizon, regions and model. Construct through
/// [`SimulationConfig::new`] so the invariants hold for the simulator.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    num_days: u32,
    start_date: NaiveDate,
    regions: Vec<String>,
    model: StreamModel,
}

impl SimulationConfig {
    pub fn new(
        num_days: u32,
        start_date: NaiveDate,
        regions: Vec<String>,
        model: StreamModel,
    ) -> Result<Self> {
        if num_days == 0 {
            return Err(Error::config("num_days", "horizon must be at least 1 day"));
        }
        if regions.is_empty() {
            return Err(Error::config("regions", "at least one region is required"));
        }
        if regions.iter().any(|r| r.trim().is_empty()) {
            return Err(Error::config("regions", "region identifiers must not be blank"));
        }
        if start_date
            .checked_add_signed(Duration::days(num_days as i64 - 1))
            .is_none()
        {
            return Err(Error::config("num_days", "horizon runs past the last representable date"));
        }
        model.validate()?;

        Ok(Self {
            num_days,
            start_date,
            regions,
            model,
        })
    }

    pub fn num_days(&self) -> u32 {
        self.num_days
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    pub fn model(&self) -> &StreamModel {
        &self.model
    }

    /// Calendar date of a day offset within the horizon.
    pub fn date_at(&self, day_offset: u32) -> NaiveDate {
        self.start_date + Duration::days(day_offset as i64)
    }

    pub fn end_date(&self) -> NaiveDate {
        self.date_at(self.num_days - 1)
    }
}

// ============================================================================
// Generator Config (TOML)
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub catalog: CatalogSettings,
    pub simulation: SimulationSettings,
    pub model: StreamModel,
    pub output: OutputSettings,
    pub remote: RemoteSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    pub path: PathBuf,
    /// Catalogs larger than this are downsampled
    pub sample_tracks: usize,
    pub sample_seed: u64,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/raw/spotify_tracks.csv"),
            sample_tracks: 1000,
            sample_seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub num_days: u32,
    pub start_date: NaiveDate,
    pub regions: Vec<String>,
    /// Seed of the stream generator
    pub seed: u64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            num_days: 730,
            start_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or(NaiveDate::MIN),
            regions: ["US", "UK", "CA", "AU", "DE"]
                .iter()
                .map(|r| r.to_string())
                .collect(),
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub path: PathBuf,
    pub summary_json: Option<PathBuf>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/generated/streaming_data.csv"),
            summary_json: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    pub bucket: String,
    pub prefix: String,
    pub region: String,
    /// Custom endpoint for S3-compatible stores
    pub endpoint_url: Option<String>,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            prefix: "streaming-data/".to_string(),
            region: "us-east-1".to_string(),
            endpoint_url: None,
        }
    }
}

impl GeneratorConfig {
    /// Load from TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::config("config_file", format!("cannot read {}: {}", path.display(), e))
        })?;
        toml::from_str(&contents).map_err(|e| {
            Error::config("config_file", format!("cannot parse {}: {}", path.display(), e))
        })
    }

    /// Load from an explicit path, the `STREAMSYNTH_CONFIG` env var, or
    /// fall back to defaults when neither is set.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(PathBuf::from(path)),
            None => {
                tracing::debug!("No config file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn simulation_config(&self) -> Result<SimulationConfig> {
        SimulationConfig::new(
            self.simulation.num_days,
            self.simulation.start_date,
            self.simulation.regions.clone(),
            self.model.clone(),
        )
    }
}
