//! `clusterfit solve`: one allocation with the configured mode and margin.

use clusterfit_solver::{GoodLpBackend, SolveLimits, allocate, report};
use tracing::info;

use super::{OutputFormat, SolveOverrides};

pub fn solve(
    dataset: &str,
    config: Option<&str>,
    overrides: &SolveOverrides,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let scenario = super::load_scenario(dataset)?;
    let mut config = super::load_config(config)?;
    overrides.apply(&mut config);

    let settings = &config.solve;
    let limits = SolveLimits::from_settings(settings, settings.mode)?;
    info!(
        mode = %settings.mode,
        margin = %settings.margin,
        time_limit_secs = settings.time_limit_secs,
        mip_gap = limits.mip_gap,
        "solving"
    );

    let allocation = allocate(&scenario, settings.mode, settings.margin, &limits, GoodLpBackend)?;
    super::emit(format, &allocation, report::format_allocation)
}
