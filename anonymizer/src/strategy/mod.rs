//! Pluggable strategies consumed by the anonymization methods. Each trait has
//! one default implementation in this module.

use std::collections::BTreeMap;

use trajectories::{Dataset, Trajectory};

use crate::AnonymizationError;

mod aggregation;
mod clustering;
mod distance;

pub use aggregation::CentroidAggregation;
pub use clustering::SimpleMdav;
pub use distance::SynchronizedDistance;

pub type ClusterId = usize;
pub type Clusters = BTreeMap<ClusterId, Vec<Trajectory>>;

pub trait TrajectoryDistance {
    /// Distance between two trajectories, memoized by their id pair.
    fn compute(&self, a: &Trajectory, b: &Trajectory) -> Result<f64, AnonymizationError>;

    /// Distance between two trajectories without touching the memo. Use it when
    /// ids do not identify content, e.g. original against anonymized.
    fn compute_without_map(&self, a: &Trajectory, b: &Trajectory) -> Result<f64, AnonymizationError>;

    /// Builds the trajectory every other one is projected against.
    fn compute_reference_trajectory(&mut self) -> Result<(), AnonymizationError>;

    /// Scalar projection of `t` onto the reference trajectory.
    fn distance_to_reference_trajectory(&self, t: &Trajectory) -> Result<f64, AnonymizationError>;

    /// Forgets memoized distances.
    fn reset_cache(&self) {}
}

pub trait TrajectoryAggregation {
    /// One representative trajectory for the whole cluster.
    fn compute(&self, cluster: &[&Trajectory]) -> Result<Trajectory, AnonymizationError>;
}

pub trait TrajectoryClustering {
    /// Context of the full dataset the partitions are drawn from.
    fn set_original_dataset(&mut self, original: &Dataset);

    /// Clusters `partition` into groups of at least `k` trajectories.
    fn run(
        &mut self,
        partition: &Dataset,
        k: usize,
        distance: &dyn TrajectoryDistance,
        aggregation: &dyn TrajectoryAggregation,
    ) -> Result<(), AnonymizationError>;

    /// Clusters of the last `run`.
    fn clusters(&self) -> &Clusters;
}
