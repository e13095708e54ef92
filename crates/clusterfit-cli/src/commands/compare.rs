//! `clusterfit compare`: all three modes at one margin.

use clusterfit_core::Margin;
use clusterfit_solver::{GoodLpBackend, compare_modes, report};

use super::OutputFormat;

pub fn compare(
    dataset: &str,
    config: Option<&str>,
    margin: Option<Margin>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let scenario = super::load_scenario(dataset)?;
    let config = super::load_config(config)?;
    let margin = margin.unwrap_or(config.solve.margin);

    let comparison = compare_modes(&scenario, margin, &config.solve, &GoodLpBackend)?;
    super::emit(format, &comparison, report::format_comparison)
}
