//! Shared types used across clusterfit crates.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ConfigError;

/// Identifier of a cluster as it appears in the input tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterId(pub u32);

/// Identifier of a node as it appears in the input tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

/// Identifier of a job as it appears in the input tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u32);

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Entities ───────────────────────────────────────────────────────

/// A resource pool that nodes and jobs are placed into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: ClusterId,
    pub name: String,
    /// Whether MANO-dependent jobs may run here.
    #[serde(deserialize_with = "flag")]
    pub mano_supported: bool,
    /// Whether VF capacity of nodes in this cluster is usable.
    #[serde(deserialize_with = "flag")]
    pub sriov_supported: bool,
}

/// Physical capacity that contributes to whichever cluster it is assigned to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub default_cluster: ClusterId,
    pub cpu_cap: f64,
    pub mem_cap: f64,
    pub vf_cap: f64,
    /// Charged once per timeslice boundary at which the node changes cluster.
    pub relocation_cost: f64,
}

/// A workload with a fixed active window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub default_cluster: ClusterId,
    pub cpu_req: f64,
    pub mem_req: f64,
    pub vf_req: f64,
    #[serde(deserialize_with = "flag")]
    pub mano_req: bool,
    pub start_time: u32,
    pub duration: u32,
    /// Charged in full if the job runs anywhere but its default cluster.
    pub relocation_cost: f64,
}

impl Job {
    /// First timeslice after the active window. Saturates on overflow;
    /// validation rejects jobs where that would happen.
    pub fn end_time(&self) -> u32 {
        self.start_time.saturating_add(self.duration)
    }

    /// `start_time <= t < start_time + duration`.
    pub fn is_active(&self, t: u32) -> bool {
        t >= self.start_time && t < self.end_time()
    }
}

/// Accepts `true`/`false` as well as the tabular `0`/`1` encoding.
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => Ok(b),
        Flag::Int(0) => Ok(false),
        Flag::Int(1) => Ok(true),
        Flag::Int(other) => Err(D::Error::custom(format!(
            "expected a boolean or 0/1, got {other}"
        ))),
    }
}

// ── Mode ───────────────────────────────────────────────────────────

/// Which placements are decision variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Jobs move, nodes stay in their default cluster for the whole horizon.
    JobOnly,
    /// Nodes move between timeslices, jobs stay in their default cluster.
    NodeOnly,
    /// Both jobs and nodes move.
    Joint,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::JobOnly, Mode::NodeOnly, Mode::Joint];

    /// Whether job placements `x[j, c]` are free.
    pub fn jobs_free(self) -> bool {
        matches!(self, Mode::JobOnly | Mode::Joint)
    }

    /// Whether node placements `y[n, c, t]` are free.
    pub fn nodes_free(self) -> bool {
        matches!(self, Mode::NodeOnly | Mode::Joint)
    }

    /// Relative optimality gap accepted by default for this mode.
    pub fn default_mip_gap(self) -> f64 {
        match self {
            Mode::JobOnly => 0.001,
            Mode::Joint => 0.01,
            Mode::NodeOnly => 0.02,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Mode::JobOnly => "job-only",
            Mode::NodeOnly => "node-only",
            Mode::Joint => "joint",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "job-only" | "jobonly" | "job" => Ok(Mode::JobOnly),
            "node-only" | "nodeonly" | "node" => Ok(Mode::NodeOnly),
            "joint" => Ok(Mode::Joint),
            _ => Err(ConfigError::UnknownMode(s.to_string())),
        }
    }
}

// ── Margin ─────────────────────────────────────────────────────────

/// Capacity derating factor in `(0, 1]` applied to CPU and memory.
///
/// VF capacity is never scaled by the margin.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Margin(f64);

impl Margin {
    pub const FULL: Margin = Margin(1.0);

    pub fn new(value: f64) -> Result<Self, ConfigError> {
        if value.is_finite() && value > 0.0 && value <= 1.0 {
            Ok(Margin(value))
        } else {
            Err(ConfigError::InvalidMargin(value))
        }
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl Default for Margin {
    fn default() -> Self {
        Margin::FULL
    }
}

impl TryFrom<f64> for Margin {
    type Error = ConfigError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Margin::new(value)
    }
}

impl From<Margin> for f64 {
    fn from(margin: Margin) -> f64 {
        margin.0
    }
}

impl FromStr for Margin {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: f64 = s
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidMargin(f64::NAN))?;
        Margin::new(value)
    }
}

impl fmt::Display for Margin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
