//! `clusterfit validate`: load a dataset and report its shape.

use std::fmt::Write;

use clusterfit_core::{Mode, Scenario};
use tracing::info;

pub fn validate(dataset: &str) -> anyhow::Result<()> {
    let scenario = super::load_scenario(dataset)?;
    info!(dataset, "dataset is valid");
    print!("{}", summary(&scenario));
    Ok(())
}

fn summary(scenario: &Scenario) -> String {
    let mut out = String::new();
    let mano = scenario.clusters().iter().filter(|c| c.mano_supported).count();
    let sriov = scenario.clusters().iter().filter(|c| c.sriov_supported).count();
    let _ = writeln!(
        out,
        "clusters: {}  (mano {mano}, sriov {sriov})",
        scenario.clusters().len()
    );
    let _ = writeln!(out, "nodes: {}", scenario.nodes().len());
    let _ = writeln!(out, "jobs: {}", scenario.jobs().len());
    let _ = writeln!(out, "horizon: {} timeslices", scenario.horizon());
    let _ = writeln!(out, "binary variables:");
    for mode in Mode::ALL {
        let _ = writeln!(out, "  {:<10} {}", mode.label(), scenario.binary_variables(mode));
    }
    out
}
