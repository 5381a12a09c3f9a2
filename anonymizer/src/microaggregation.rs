use std::collections::BTreeMap;
use std::time::Instant;

use tracing::{debug, info};
use trajectories::{Dataset, Insertable, Trajectory};

use crate::strategy::{
    CentroidAggregation, ClusterId, Clusters, SimpleMdav, SynchronizedDistance, TrajectoryAggregation,
    TrajectoryClustering, TrajectoryDistance,
};
use crate::{AnonymizationError, MicroaggregationConf, partition_by_time};

/// Clusters time partitions of the dataset and replaces every member of a
/// cluster by the cluster's aggregate trajectory.
///
/// Not re-entrant: `clusters` and `centroids` hold the state of the last
/// processed partition.
pub struct TimePartMicroaggregation<'a> {
    dataset: &'a Dataset,
    conf: MicroaggregationConf,
    distance: Box<dyn TrajectoryDistance + 'a>,
    aggregation: Box<dyn TrajectoryAggregation + 'a>,
    clustering: Box<dyn TrajectoryClustering + 'a>,
    clusters: Clusters,
    centroids: BTreeMap<ClusterId, Trajectory>,
    anonymized_dataset: Dataset,
}

impl<'a> TimePartMicroaggregation<'a> {
    /// Uses [`SynchronizedDistance`], [`CentroidAggregation`] and [`SimpleMdav`].
    pub fn new(dataset: &'a Dataset, conf: MicroaggregationConf) -> Self {
        Self {
            dataset,
            conf,
            distance: Box::new(SynchronizedDistance::new(dataset)),
            aggregation: Box::new(CentroidAggregation),
            clustering: Box::new(SimpleMdav::new()),
            clusters: Clusters::new(),
            centroids: BTreeMap::new(),
            anonymized_dataset: Dataset::new(),
        }
    }

    pub fn with_distance(mut self, distance: impl TrajectoryDistance + 'a) -> Self {
        self.distance = Box::new(distance);
        self
    }

    pub fn with_aggregation(mut self, aggregation: impl TrajectoryAggregation + 'a) -> Self {
        self.aggregation = Box::new(aggregation);
        self
    }

    pub fn with_clustering(mut self, clustering: impl TrajectoryClustering + 'a) -> Self {
        self.clustering = Box::new(clustering);
        self
    }

    pub fn run(&mut self) -> Result<(), AnonymizationError> {
        let k = self.conf.k;
        if k == 0 {
            return Err(AnonymizationError::InvalidK);
        }
        if self.dataset.len() < k {
            return Err(AnonymizationError::NotEnoughTrajectories {
                found: self.dataset.len(),
                k,
            });
        }

        let mut ordered: Vec<&Trajectory> = self.dataset.iter().collect();
        ordered.sort_by_key(|t| t.start_timestamp());
        let partitions = partition_by_time(&ordered, self.conf.interval, k);

        self.anonymized_dataset = Dataset::new();
        self.clustering.set_original_dataset(self.dataset);
        let start = Instant::now();
        info!("Starting clustering...");
        for (i, partition) in partitions.iter().enumerate() {
            debug!("Clustering partition {} of {}", i + 1, partitions.len());
            self.clustering
                .run(partition, k, self.distance.as_ref(), self.aggregation.as_ref())?;
            self.clusters = self.clustering.clusters().clone();
            self.process_clusters()?;
        }
        info!("Building anonymized dataset...");
        self.anonymized_dataset.sort_by_id();
        info!("Clustering finished! Time: {:?}", start.elapsed());
        info!("Anonymization finished!");
        Ok(())
    }

    fn process_clusters(&mut self) -> Result<(), AnonymizationError> {
        self.centroids.clear();
        for (&c, members) in &self.clusters {
            let refs: Vec<&Trajectory> = members.iter().collect();
            let aggregate = self.aggregation.compute(&refs)?;
            for t in members {
                self.anonymized_dataset.insert(Trajectory::with_locations(
                    t.id,
                    t.user_id,
                    aggregate.locations().iter().copied(),
                ));
            }
            self.centroids.insert(c, aggregate);
        }
        Ok(())
    }

    pub fn clusters(&self) -> &Clusters {
        &self.clusters
    }

    pub fn centroids(&self) -> &BTreeMap<ClusterId, Trajectory> {
        &self.centroids
    }

    pub fn anonymized_dataset(&self) -> &Dataset {
        &self.anonymized_dataset
    }

    pub fn into_anonymized(self) -> Dataset {
        self.anonymized_dataset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trajectories::{Id, Location, Timestamp};

    fn walk(id: Id, start: Timestamp, lat: f64) -> Trajectory {
        Trajectory::with_locations(
            id,
            100 + id,
            (0..5).map(|i| Location::from_lat_lon(start + i * 30, lat, 2.0 + i as f64 * 0.0005)),
        )
    }

    #[test]
    fn rejects_datasets_smaller_than_k() {
        let ds: Dataset = (0..2).map(|i| walk(i, 0, 41.0)).collect();
        let err = TimePartMicroaggregation::new(&ds, MicroaggregationConf::default()).run();
        assert!(matches!(
            err,
            Err(AnonymizationError::NotEnoughTrajectories { found: 2, k: 3 })
        ));
    }

    #[test]
    fn members_share_their_centroid() {
        let ds: Dataset = (0..6)
            .map(|i| walk(i, i as Timestamp * 5, 41.0 + (i / 3) as f64 * 0.5))
            .collect();
        let mut method = TimePartMicroaggregation::new(&ds, MicroaggregationConf { k: 3, interval: 900 });
        method.run().expect("clusterable");

        let anon = method.anonymized_dataset();
        assert_eq!(anon.ids().collect::<Vec<_>>(), (0..6).collect::<Vec<_>>());
        for t in anon.iter() {
            assert_eq!(Some(t.user_id), ds.get(t.id).map(|o| o.user_id));
        }
        for (c, members) in method.clusters() {
            let centroid = &method.centroids()[c];
            for m in members {
                assert_eq!(anon.get(m.id).map(Trajectory::locations), Some(centroid.locations()));
            }
        }
    }

    #[test]
    fn custom_strategies_are_used() {
        struct FirstMember;
        impl TrajectoryAggregation for FirstMember {
            fn compute(&self, cluster: &[&Trajectory]) -> Result<Trajectory, AnonymizationError> {
                cluster
                    .first()
                    .map(|t| (*t).clone())
                    .ok_or(AnonymizationError::EmptyCluster)
            }
        }

        let ds: Dataset = (0..3).map(|i| walk(i, 0, 41.0 + i as f64 * 0.001)).collect();
        let mut method = TimePartMicroaggregation::new(&ds, MicroaggregationConf::default())
            .with_aggregation(FirstMember)
            .with_clustering(SimpleMdav::new());
        method.run().expect("clusterable");
        let anon = method.into_anonymized();
        assert_eq!(anon.len(), 3);
        let first = anon.trajectories()[0].locations().to_vec();
        assert!(anon.iter().all(|t| t.locations() == first.as_slice()));
    }
}
