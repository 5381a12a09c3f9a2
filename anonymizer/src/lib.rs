//! Trajectory anonymization: time-partitioned microaggregation, dynamic-radius
//! location swapping and record-linkage disclosure risk.

use thiserror::Error;
use trajectories::Id;

pub mod anonymity;
pub mod config;
pub mod microaggregation;
pub mod partition;
pub mod strategy;
pub mod swap;

pub use anonymity::Stats;
pub use config::{MicroaggregationConf, RecordLinkageConf, SwapConf};
pub use microaggregation::TimePartMicroaggregation;
pub use partition::partition_by_time;
pub use strategy::{
    CentroidAggregation, ClusterId, Clusters, SimpleMdav, SynchronizedDistance, TrajectoryAggregation,
    TrajectoryClustering, TrajectoryDistance,
};
pub use swap::SwapLocations;

#[derive(Error, Debug)]
pub enum AnonymizationError {
    #[error("Trajectory {0} has no locations")]
    EmptyTrajectory(Id),
    #[error("Cannot aggregate an empty cluster")]
    EmptyCluster,
    #[error("k must be at least 1")]
    InvalidK,
    #[error("Dataset holds {found} trajectories, fewer than k = {k}")]
    NotEnoughTrajectories { found: usize, k: usize },
    #[error("Reference trajectory was not computed")]
    MissingReference,
    #[error("Cannot compute {0} over an empty dataset")]
    EmptyDataset(&'static str),
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}
