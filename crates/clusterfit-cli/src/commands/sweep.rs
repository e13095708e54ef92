//! `clusterfit sweep`: the same mode at every margin of a descending grid.

use clusterfit_solver::{GoodLpBackend, SolveLimits, report, sweep_margins};
use tracing::warn;

use super::{OutputFormat, SweepOverrides};

pub fn sweep(
    dataset: &str,
    config: Option<&str>,
    overrides: &SweepOverrides,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let scenario = super::load_scenario(dataset)?;
    let mut config = super::load_config(config)?;
    let grid = overrides.apply(&mut config);
    let margins = grid.margins()?;

    let mode = config.solve.mode;
    let limits = SolveLimits::from_settings(&config.solve, mode)?;
    let result = sweep_margins(&scenario, mode, &margins, &limits, &GoodLpBackend)?;
    if !result.is_monotone() {
        warn!(%mode, "objective is not monotone in the margin; some points may be gap-limited");
    }
    super::emit(format, &result, report::format_sweep)
}
