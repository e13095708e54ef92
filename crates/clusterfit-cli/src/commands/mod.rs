pub mod compare;
pub mod solve;
pub mod sweep;
pub mod validate;

use std::path::Path;

use anyhow::Context;
use clap::ValueEnum;
use clusterfit_core::{ClusterfitConfig, Dataset, Margin, Mode, Scenario, SweepSettings};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Command-line values that take precedence over `[solve]`.
#[derive(Debug, Default)]
pub struct SolveOverrides {
    pub mode: Option<Mode>,
    pub margin: Option<Margin>,
    pub time_limit_secs: Option<u64>,
    pub mip_gap: Option<f64>,
}

/// Command-line values that take precedence over `[sweep]`.
#[derive(Debug, Default)]
pub struct SweepOverrides {
    pub mode: Option<Mode>,
    pub start: Option<f64>,
    pub stop: Option<f64>,
    pub step: Option<f64>,
}

pub fn load_scenario(path: &str) -> anyhow::Result<Scenario> {
    let dataset = Dataset::from_file(Path::new(path))
        .with_context(|| format!("failed to load dataset {path}"))?;
    dataset
        .validate()
        .with_context(|| format!("invalid dataset {path}"))
}

/// Read the configuration file, or fall back to defaults when none is given.
pub fn load_config(path: Option<&str>) -> anyhow::Result<ClusterfitConfig> {
    match path {
        Some(path) => ClusterfitConfig::from_file(Path::new(path))
            .with_context(|| format!("failed to read config {path}")),
        None => Ok(ClusterfitConfig::default()),
    }
}

impl SolveOverrides {
    pub fn apply(&self, config: &mut ClusterfitConfig) {
        let solve = &mut config.solve;
        if let Some(mode) = self.mode {
            solve.mode = mode;
        }
        if let Some(margin) = self.margin {
            solve.margin = margin;
        }
        if let Some(secs) = self.time_limit_secs {
            solve.time_limit_secs = secs;
        }
        if self.mip_gap.is_some() {
            solve.mip_gap = self.mip_gap;
        }
    }
}

impl SweepOverrides {
    /// Apply to `config`, returning the resulting sweep grid.
    pub fn apply(&self, config: &mut ClusterfitConfig) -> SweepSettings {
        if let Some(mode) = self.mode {
            config.solve.mode = mode;
        }
        let mut sweep = config.sweep.clone().unwrap_or_default();
        if let Some(start) = self.start {
            sweep.start = start;
        }
        if let Some(stop) = self.stop {
            sweep.stop = stop;
        }
        if let Some(step) = self.step {
            sweep.step = step;
        }
        config.sweep = Some(sweep.clone());
        sweep
    }
}

/// Print either the rendered text or pretty JSON.
pub fn emit<T: Serialize>(
    format: OutputFormat,
    value: &T,
    text: impl FnOnce(&T) -> String,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => print!("{}", text(value)),
    }
    Ok(())
}
