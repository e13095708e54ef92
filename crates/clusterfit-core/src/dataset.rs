//! Dataset loading and validation.
//!
//! A [`Dataset`] is the raw cluster/node/job tables as read from disk. Calling
//! [`Dataset::validate`] checks every invariant the model builder relies on and
//! produces a [`Scenario`]: the same entities with cluster references resolved
//! to dense indices, the timeline horizon, and the precomputed activity
//! indicator. A `Scenario` is read-only for its whole lifetime.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DatasetError, DatasetResult};
use crate::types::{Cluster, ClusterId, Job, Mode, Node};

/// Raw input tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub clusters: Vec<Cluster>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub jobs: Vec<Job>,
}

impl Dataset {
    /// Read a dataset from a `.toml` or JSON file.
    pub fn from_file(path: &Path) -> DatasetResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        if is_toml {
            Self::from_toml_str(&content)
        } else {
            Self::from_json_str(&content)
        }
    }

    pub fn from_toml_str(content: &str) -> DatasetResult<Self> {
        toml::from_str(content).map_err(|e| DatasetError::Parse(e.to_string()))
    }

    pub fn from_json_str(content: &str) -> DatasetResult<Self> {
        serde_json::from_str(content).map_err(|e| DatasetError::Parse(e.to_string()))
    }

    /// Check all input invariants and resolve cluster references.
    pub fn validate(self) -> DatasetResult<Scenario> {
        if self.clusters.is_empty() {
            return Err(DatasetError::NoClusters);
        }

        let mut cluster_index: HashMap<ClusterId, usize> = HashMap::new();
        for (idx, cluster) in self.clusters.iter().enumerate() {
            if cluster_index.insert(cluster.id, idx).is_some() {
                return Err(DatasetError::DuplicateCluster(cluster.id));
            }
        }

        let resolve = |entity: String, cluster: ClusterId| {
            cluster_index
                .get(&cluster)
                .copied()
                .ok_or(DatasetError::UnknownCluster { entity, cluster })
        };

        let mut seen_nodes = HashMap::new();
        let mut node_home = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if seen_nodes.insert(node.id, ()).is_some() {
                return Err(DatasetError::DuplicateNode(node.id));
            }
            let entity = format!("node {}", node.id);
            check_quantity(&entity, "cpu_cap", node.cpu_cap)?;
            check_quantity(&entity, "mem_cap", node.mem_cap)?;
            check_quantity(&entity, "vf_cap", node.vf_cap)?;
            check_quantity(&entity, "relocation_cost", node.relocation_cost)?;
            node_home.push(resolve(entity, node.default_cluster)?);
        }

        let mut seen_jobs = HashMap::new();
        let mut job_home = Vec::with_capacity(self.jobs.len());
        for job in &self.jobs {
            if seen_jobs.insert(job.id, ()).is_some() {
                return Err(DatasetError::DuplicateJob(job.id));
            }
            let entity = format!("job {}", job.id);
            check_quantity(&entity, "cpu_req", job.cpu_req)?;
            check_quantity(&entity, "mem_req", job.mem_req)?;
            check_quantity(&entity, "vf_req", job.vf_req)?;
            check_quantity(&entity, "relocation_cost", job.relocation_cost)?;
            if job.duration == 0 {
                return Err(DatasetError::ZeroDuration(job.id));
            }
            if job.start_time.checked_add(job.duration).is_none() {
                return Err(DatasetError::HorizonOverflow(job.id));
            }
            job_home.push(resolve(entity, job.default_cluster)?);
        }

        let horizon = self
            .jobs
            .iter()
            .map(Job::end_time)
            .max()
            .unwrap_or(0)
            .max(1);
        let activity = Activity::compute(&self.jobs, horizon);

        debug!(
            clusters = self.clusters.len(),
            nodes = self.nodes.len(),
            jobs = self.jobs.len(),
            horizon,
            "dataset validated"
        );

        Ok(Scenario {
            clusters: self.clusters,
            nodes: self.nodes,
            jobs: self.jobs,
            node_home,
            job_home,
            horizon,
            activity,
        })
    }
}

fn check_quantity(entity: &str, field: &'static str, value: f64) -> DatasetResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(DatasetError::InvalidQuantity {
            entity: entity.to_string(),
            field,
            value,
        })
    }
}

/// Precomputed `e[job, t]`: whether a job is active at a timeslice.
#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    horizon: u32,
    /// Row-major `[job][t]`.
    active: Vec<bool>,
}

impl Activity {
    fn compute(jobs: &[Job], horizon: u32) -> Self {
        let mut active = Vec::with_capacity(jobs.len() * horizon as usize);
        for job in jobs {
            active.extend((0..horizon).map(|t| job.is_active(t)));
        }
        Self { horizon, active }
    }

    pub fn is_active(&self, job: usize, t: u32) -> bool {
        self.active[job * self.horizon as usize + t as usize]
    }

    /// Dense indices of jobs active at `t`.
    pub fn active_at(&self, t: u32) -> impl Iterator<Item = usize> + '_ {
        let jobs = self.active.len() / (self.horizon as usize).max(1);
        (0..jobs).filter(move |&j| self.is_active(j, t))
    }
}

/// Validated, read-only solve input with dense cluster indices.
#[derive(Debug, Clone)]
pub struct Scenario {
    clusters: Vec<Cluster>,
    nodes: Vec<Node>,
    jobs: Vec<Job>,
    node_home: Vec<usize>,
    job_home: Vec<usize>,
    horizon: u32,
    activity: Activity,
}

impl Scenario {
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    /// Number of timeslices `T`; timeslices are `0..T`.
    pub fn horizon(&self) -> u32 {
        self.horizon
    }

    pub fn activity(&self) -> &Activity {
        &self.activity
    }

    /// Dense index of a node's default cluster.
    pub fn node_home(&self, node: usize) -> usize {
        self.node_home[node]
    }

    /// Dense index of a job's default cluster.
    pub fn job_home(&self, job: usize) -> usize {
        self.job_home[job]
    }

    pub fn cluster_id(&self, cluster: usize) -> ClusterId {
        self.clusters[cluster].id
    }

    /// Number of binary placement variables the given mode introduces.
    pub fn binary_variables(&self, mode: Mode) -> usize {
        let clusters = self.clusters.len();
        let mut count = 0;
        if mode.jobs_free() {
            count += self.jobs.len() * clusters;
        }
        if mode.nodes_free() {
            count += self.nodes.len() * clusters * self.horizon as usize;
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{JobId, NodeId};

    fn cluster(id: u32) -> Cluster {
        Cluster {
            id: ClusterId(id),
            name: format!("c{id}"),
            mano_supported: true,
            sriov_supported: true,
        }
    }

    fn node(id: u32, home: u32) -> Node {
        Node {
            id: NodeId(id),
            default_cluster: ClusterId(home),
            cpu_cap: 10.0,
            mem_cap: 10.0,
            vf_cap: 2.0,
            relocation_cost: 1.0,
        }
    }

    fn job(id: u32, home: u32, start: u32, duration: u32) -> Job {
        Job {
            id: JobId(id),
            default_cluster: ClusterId(home),
            cpu_req: 1.0,
            mem_req: 1.0,
            vf_req: 0.0,
            mano_req: false,
            start_time: start,
            duration,
            relocation_cost: 1.0,
        }
    }

    fn dataset() -> Dataset {
        Dataset {
            clusters: vec![cluster(10), cluster(20)],
            nodes: vec![node(0, 10), node(1, 20)],
            jobs: vec![job(0, 20, 1, 2), job(1, 10, 2, 3)],
        }
    }

    #[test]
    fn validate_resolves_dense_indices() {
        let scenario = dataset().validate().unwrap();
        assert_eq!(scenario.node_home(0), 0);
        assert_eq!(scenario.node_home(1), 1);
        assert_eq!(scenario.job_home(0), 1);
        assert_eq!(scenario.cluster_id(1), ClusterId(20));
    }

    #[test]
    fn horizon_is_latest_job_end() {
        let scenario = dataset().validate().unwrap();
        assert_eq!(scenario.horizon(), 5);
    }

    #[test]
    fn horizon_without_jobs_is_one_slice() {
        let mut ds = dataset();
        ds.jobs.clear();
        assert_eq!(ds.validate().unwrap().horizon(), 1);
    }

    #[test]
    fn activity_matches_windows() {
        let scenario = dataset().validate().unwrap();
        let activity = scenario.activity();
        assert!(!activity.is_active(0, 0));
        assert!(activity.is_active(0, 1));
        assert!(activity.is_active(0, 2));
        assert!(!activity.is_active(0, 3));
        assert_eq!(activity.active_at(2).collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(activity.active_at(4).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn rejects_dangling_cluster_reference() {
        let mut ds = dataset();
        ds.jobs[1].default_cluster = ClusterId(99);
        let err = ds.validate().unwrap_err();
        assert!(matches!(
            err,
            DatasetError::UnknownCluster { cluster: ClusterId(99), .. }
        ));
    }

    #[test]
    fn rejects_negative_capacity() {
        let mut ds = dataset();
        ds.nodes[0].mem_cap = -1.0;
        let err = ds.validate().unwrap_err();
        assert!(matches!(err, DatasetError::InvalidQuantity { field: "mem_cap", .. }));
    }

    #[test]
    fn rejects_zero_duration() {
        let mut ds = dataset();
        ds.jobs[0].duration = 0;
        assert!(matches!(ds.validate(), Err(DatasetError::ZeroDuration(JobId(0)))));
    }

    #[test]
    fn rejects_duplicates_and_empty() {
        let mut ds = dataset();
        ds.clusters.push(cluster(10));
        assert!(matches!(ds.validate(), Err(DatasetError::DuplicateCluster(_))));

        let mut ds = dataset();
        ds.nodes.push(node(1, 10));
        assert!(matches!(ds.validate(), Err(DatasetError::DuplicateNode(NodeId(1)))));

        assert!(matches!(Dataset::default().validate(), Err(DatasetError::NoClusters)));
    }

    #[test]
    fn rejects_horizon_overflow() {
        let mut ds = dataset();
        ds.jobs[0].start_time = u32::MAX;
        assert!(matches!(ds.validate(), Err(DatasetError::HorizonOverflow(_))));
    }

    #[test]
    fn binary_variable_counts_per_mode() {
        let scenario = dataset().validate().unwrap();
        // 2 jobs x 2 clusters; 2 nodes x 2 clusters x 5 slices.
        assert_eq!(scenario.binary_variables(Mode::JobOnly), 4);
        assert_eq!(scenario.binary_variables(Mode::NodeOnly), 20);
        assert_eq!(scenario.binary_variables(Mode::Joint), 24);
    }

    #[test]
    fn parses_toml_tables() {
        let ds = Dataset::from_toml_str(
            r#"
[[clusters]]
id = 0
name = "core"
mano_supported = 1
sriov_supported = 0

[[nodes]]
id = 0
default_cluster = 0
cpu_cap = 32.0
mem_cap = 64.0
vf_cap = 4.0
relocation_cost = 5.0

[[jobs]]
id = 0
default_cluster = 0
cpu_req = 4.0
mem_req = 8.0
vf_req = 0.0
mano_req = true
start_time = 1
duration = 2
relocation_cost = 2.0
"#,
        )
        .unwrap();
        assert!(ds.clusters[0].mano_supported);
        assert!(!ds.clusters[0].sriov_supported);
        assert!(ds.jobs[0].mano_req);
    }

    #[test]
    fn from_file_picks_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let ds = dataset();

        let json_path = dir.path().join("data.json");
        std::fs::write(&json_path, serde_json::to_string(&ds).unwrap()).unwrap();
        assert_eq!(Dataset::from_file(&json_path).unwrap(), ds);

        let toml_path = dir.path().join("data.toml");
        std::fs::write(&toml_path, toml::to_string(&ds).unwrap()).unwrap();
        assert_eq!(Dataset::from_file(&toml_path).unwrap(), ds);

        let missing = dir.path().join("missing.json");
        assert!(matches!(Dataset::from_file(&missing), Err(DatasetError::Io { .. })));
    }
}
