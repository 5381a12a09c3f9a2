use geo_types::{coord, Point};
use trajectories::{Location, Trajectory};

use super::TrajectoryAggregation;
use crate::AnonymizationError;

/// Averages the members at the timestamps of the member with most locations.
#[derive(Debug, Clone, Copy, Default)]
pub struct CentroidAggregation;

impl TrajectoryAggregation for CentroidAggregation {
    fn compute(&self, cluster: &[&Trajectory]) -> Result<Trajectory, AnonymizationError> {
        let template = cluster
            .iter()
            .copied()
            .reduce(|acc, t| if t.len() > acc.len() { t } else { acc })
            .ok_or(AnonymizationError::EmptyCluster)?;

        let mut aggregate = Trajectory::new(template.id, template.user_id);
        for location in template.locations() {
            let timestamp = location.timestamp();
            // running mean, exact when every member sits on the same point
            let mut mean = coord! { x: 0.0, y: 0.0 };
            for (i, member) in cluster.iter().enumerate() {
                let p = member
                    .position_at(timestamp)
                    .ok_or(AnonymizationError::EmptyTrajectory(member.id))?;
                let n = (i + 1) as f64;
                mean = coord! {
                    x: mean.x + (p.x() - mean.x) / n,
                    y: mean.y + (p.y() - mean.y) / n,
                };
            }
            aggregate.add_location(Location::new(timestamp, Point(mean)), false);
        }
        Ok(aggregate)
    }
}
