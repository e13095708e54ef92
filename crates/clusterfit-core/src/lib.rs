//! clusterfit-core: entity types, dataset validation, and configuration.
//!
//! Everything downstream (model builder, solve driver, CLI) consumes a
//! validated [`Scenario`]; raw tables are only ever touched here.

pub mod config;
pub mod dataset;
pub mod error;
pub mod types;

pub use config::{ClusterfitConfig, SolveSettings, SweepSettings};
pub use dataset::{Activity, Dataset, Scenario};
pub use error::{ConfigError, DatasetError, DatasetResult};
pub use types::*;
