//! clusterfit.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::types::{Margin, Mode};

/// Wall-clock budget handed to the backend when none is configured.
pub const DEFAULT_TIME_LIMIT_SECS: u64 = 1800;

/// Upper bound on the number of margins one sweep may solve.
pub const MAX_SWEEP_POINTS: usize = 1000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterfitConfig {
    #[serde(default)]
    pub solve: SolveSettings,
    pub sweep: Option<SweepSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveSettings {
    pub mode: Mode,
    pub margin: Margin,
    pub time_limit_secs: u64,
    /// Overrides the per-mode default gap when set.
    pub mip_gap: Option<f64>,
}

impl Default for SolveSettings {
    fn default() -> Self {
        Self {
            mode: Mode::Joint,
            margin: Margin::FULL,
            time_limit_secs: DEFAULT_TIME_LIMIT_SECS,
            mip_gap: None,
        }
    }
}

impl SolveSettings {
    pub fn time_limit(&self) -> Result<Duration, ConfigError> {
        if self.time_limit_secs == 0 {
            return Err(ConfigError::ZeroTimeLimit);
        }
        Ok(Duration::from_secs(self.time_limit_secs))
    }

    /// Gap tolerance for `mode`: the configured override or the mode default.
    pub fn mip_gap_for(&self, mode: Mode) -> Result<f64, ConfigError> {
        let gap = self.mip_gap.unwrap_or_else(|| mode.default_mip_gap());
        if gap.is_finite() && gap >= 0.0 {
            Ok(gap)
        } else {
            Err(ConfigError::InvalidMipGap(gap))
        }
    }
}

/// Descending margin grid for sweeps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepSettings {
    pub start: f64,
    pub stop: f64,
    pub step: f64,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            start: 1.0,
            stop: 0.5,
            step: 0.05,
        }
    }
}

impl SweepSettings {
    /// Margins from `start` down to `stop` (inclusive, within rounding).
    pub fn margins(&self) -> Result<Vec<Margin>, ConfigError> {
        let invalid = || ConfigError::InvalidSweep {
            start: self.start,
            stop: self.stop,
            step: self.step,
        };
        if !(self.step.is_finite() && self.step > 0.0) || self.stop > self.start {
            return Err(invalid());
        }
        let start = Margin::new(self.start)?;
        let stop = Margin::new(self.stop)?;

        let steps = ((start.get() - stop.get()) / self.step + 1e-9).floor();
        if steps >= MAX_SWEEP_POINTS as f64 {
            return Err(ConfigError::SweepTooLarge {
                step: self.step,
                max: MAX_SWEEP_POINTS,
            });
        }
        let steps = steps as usize;
        (0..=steps)
            .map(|i| {
                // Round to suppress accumulated float noise like 0.7000000000000001.
                let value = ((start.get() - i as f64 * self.step) * 1e9).round() / 1e9;
                Margin::new(value)
            })
            .collect()
    }
}

impl ClusterfitConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ClusterfitConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
