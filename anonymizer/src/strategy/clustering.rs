use std::collections::HashMap;

use tracing::{debug, trace};
use trajectories::{Dataset, Id, Trajectory};

use super::{ClusterId, Clusters, TrajectoryAggregation, TrajectoryClustering, TrajectoryDistance};
use crate::AnonymizationError;

/// Maximum Distance to Average Vector. Every cluster holds exactly `k`
/// trajectories except the last one of a partition, which holds `k..2k`.
#[derive(Debug, Default)]
pub struct SimpleMdav {
    clusters: Clusters,
    assigned_to: HashMap<Id, ClusterId>,
    next_cluster: ClusterId,
}

impl SimpleMdav {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cluster of every trajectory clustered since the original dataset was set.
    pub fn assigned_to(&self) -> &HashMap<Id, ClusterId> {
        &self.assigned_to
    }

    fn push(&mut self, members: Vec<&Trajectory>) {
        let id = self.next_cluster;
        self.next_cluster += 1;
        for t in &members {
            self.assigned_to.insert(t.id, id);
        }
        trace!("cluster {id}: {:?}", members.iter().map(|t| t.id).collect::<Vec<_>>());
        self.clusters.insert(id, members.into_iter().cloned().collect());
    }
}

/// Member farthest from `from`. Measured without the memo since `from` may be a
/// centroid that shares an id with a member.
fn farthest<'a>(
    remaining: &[&'a Trajectory],
    from: &Trajectory,
    distance: &dyn TrajectoryDistance,
) -> Result<Option<&'a Trajectory>, AnonymizationError> {
    let mut best: Option<(&Trajectory, f64)> = None;
    for &t in remaining {
        let d = distance.compute_without_map(from, t)?;
        if best.is_none_or(|(_, b)| d > b) {
            best = Some((t, d));
        }
    }
    Ok(best.map(|(t, _)| t))
}

/// Removes `center` and its `n` nearest neighbours from `remaining`.
fn take_nearest<'a>(
    remaining: &mut Vec<&'a Trajectory>,
    center: &'a Trajectory,
    n: usize,
    distance: &dyn TrajectoryDistance,
) -> Result<Vec<&'a Trajectory>, AnonymizationError> {
    remaining.retain(|t| t.id != center.id);
    let mut by_distance = remaining
        .iter()
        .enumerate()
        .map(|(i, t)| distance.compute(center, t).map(|d| (i, d)))
        .collect::<Result<Vec<_>, _>>()?;
    by_distance.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut picked: Vec<usize> = by_distance.into_iter().take(n).map(|(i, _)| i).collect();
    picked.sort_unstable_by(|a, b| b.cmp(a));
    let mut members = vec![center];
    members.extend(picked.into_iter().map(|i| remaining.remove(i)));
    Ok(members)
}

impl TrajectoryClustering for SimpleMdav {
    fn set_original_dataset(&mut self, original: &Dataset) {
        self.assigned_to = HashMap::with_capacity(original.len());
        self.next_cluster = 0;
    }

    fn run(
        &mut self,
        partition: &Dataset,
        k: usize,
        distance: &dyn TrajectoryDistance,
        aggregation: &dyn TrajectoryAggregation,
    ) -> Result<(), AnonymizationError> {
        if k == 0 {
            return Err(AnonymizationError::InvalidK);
        }
        self.clusters.clear();
        let mut remaining: Vec<&Trajectory> = partition.iter().collect();

        while remaining.len() >= 3 * k {
            let centroid = aggregation.compute(&remaining)?;
            let Some(r) = farthest(&remaining, &centroid, distance)? else {
                break;
            };
            let cluster_r = take_nearest(&mut remaining, r, k - 1, distance)?;
            self.push(cluster_r);

            if let Some(s) = farthest(&remaining, r, distance)? {
                let cluster_s = take_nearest(&mut remaining, s, k - 1, distance)?;
                self.push(cluster_s);
            }
        }

        if remaining.len() >= 2 * k {
            let centroid = aggregation.compute(&remaining)?;
            if let Some(r) = farthest(&remaining, &centroid, distance)? {
                let cluster_r = take_nearest(&mut remaining, r, k - 1, distance)?;
                self.push(cluster_r);
            }
        }

        if !remaining.is_empty() {
            self.push(remaining);
        }
        debug!("{} trajectories in {} clusters", partition.len(), self.clusters.len());
        Ok(())
    }

    fn clusters(&self) -> &Clusters {
        &self.clusters
    }
}
