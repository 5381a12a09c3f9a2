use std::collections::HashSet;
use std::ops::Add;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{info, trace};
use trajectories::{Dataset, DistanceUnit, Id, Location, Trajectory};

use crate::{AnonymizationError, SwapConf};

/// Radii `min, min + step, ..` below `max`, then `max`. A zero step tries
/// only the bounds.
fn inclusive_range<T>(min: T, max: T, step: T) -> Vec<T>
where
    T: Copy + PartialOrd + Default + Add<Output = T>,
{
    let mut values = vec![min];
    if max <= min {
        return values;
    }
    if step > T::default() {
        let mut v = min + step;
        while v < max {
            values.push(v);
            v = v + step;
        }
    }
    values.push(max);
    values
}

/// Random bijection between the locations of the cluster `used` and the
/// trajectories they come from.
fn exchange<R: Rng + ?Sized>(pool: &[(Id, Location)], used: &[usize], rng: &mut R) -> Vec<(Id, Location)> {
    let ids = used.iter().map(|&i| pool[i].0);
    let mut locations: Vec<Location> = used.iter().map(|&i| pool[i].1).collect();
    locations.shuffle(rng);
    ids.zip(locations).collect()
}

/// Anonymizes by exchanging locations between trajectories that were close
/// in space and time, instead of aggregating them.
pub struct SwapLocations<'a> {
    dataset: &'a Dataset,
    conf: SwapConf,
    anonymized_dataset: Dataset,
}

impl<'a> SwapLocations<'a> {
    pub fn new(dataset: &'a Dataset, conf: SwapConf) -> Self {
        Self {
            dataset,
            conf,
            anonymized_dataset: Dataset::new(),
        }
    }

    /// Runs with a generator seeded from the configured seed, or from the
    /// thread generator when no seed is set.
    pub fn run_seeded(&mut self) -> Result<(), AnonymizationError> {
        let mut rng = match self.conf.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        };
        self.run(&mut rng)
    }

    pub fn run<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), AnonymizationError> {
        if self.conf.k == 0 {
            return Err(AnonymizationError::InvalidK);
        }

        self.anonymized_dataset = self
            .dataset
            .iter()
            .map(|t| Trajectory::new(t.id, t.user_id))
            .collect();
        info!("Anonymized dataset initialized!");

        // Every location with the trajectory it comes from
        let mut remaining: Vec<(Id, Location)> = self
            .dataset
            .iter()
            .flat_map(|t| t.locations().iter().map(move |l| (t.id, *l)))
            .collect();
        let total = remaining.len();

        info!("Swapping...");
        let (mut swapped, mut suppressed) = (0usize, 0usize);
        while !remaining.is_empty() {
            let chosen = rng.random_range(0..remaining.len());

            let mut used = vec![chosen];
            match self.build_cluster(&remaining, chosen) {
                Some(members) => {
                    used.extend(members);
                    for (id, location) in exchange(&remaining, &used, &mut *rng) {
                        self.assign(id, location);
                    }
                    swapped += used.len();
                }
                // A location without cluster is not released
                None => suppressed += 1,
            }

            used.sort_unstable_by(|a, b| b.cmp(a));
            for i in used {
                remaining.remove(i);
            }
            trace!("{} of {} locations left", remaining.len(), total);
        }
        info!("Swapping done! {swapped} locations swapped, {suppressed} suppressed");

        let before = self.anonymized_dataset.len();
        self.anonymized_dataset = std::mem::take(&mut self.anonymized_dataset)
            .into_iter()
            .filter(|t| t.len() > 1)
            .map(|mut t| {
                t.sort_locations();
                t
            })
            .collect();
        self.anonymized_dataset.sort_by_id();
        info!(
            "Removed {} trajectories with less than 2 locations",
            before - self.anonymized_dataset.len()
        );
        info!("Done!");
        Ok(())
    }

    fn assign(&mut self, id: Id, location: Location) {
        if let Some(t) = self.anonymized_dataset.get_mut(id) {
            t.add_location(location, false);
        }
    }

    /// Indices of at least `k - 1` locations of distinct other trajectories
    /// around `remaining[chosen]`, widening the temporal radius in the outer
    /// loop and the spatial radius in the inner one. `None` when the maximum
    /// radii are not enough.
    fn build_cluster(&self, remaining: &[(Id, Location)], chosen: usize) -> Option<Vec<usize>> {
        let (chosen_id, chosen_location) = remaining[chosen];
        let mut temporal_distances: Vec<Option<u64>> = vec![None; remaining.len()];
        let mut spatial_distances: Vec<Option<f64>> = vec![None; remaining.len()];

        let temporal_range = inclusive_range(self.conf.min_r_t, self.conf.max_r_t, self.conf.step_t);
        let spatial_range = inclusive_range(self.conf.min_r_s, self.conf.max_r_s, self.conf.step_s);

        for &r_t in &temporal_range {
            for &r_s in &spatial_range {
                let mut used_trajectories = HashSet::new();
                let mut members = Vec::new();

                for (i, (id, l)) in remaining.iter().enumerate() {
                    // We don't consider locations of the same trajectory
                    if *id == chosen_id {
                        continue;
                    }
                    let temporal =
                        *temporal_distances[i].get_or_insert_with(|| chosen_location.temporal_distance(l));
                    if temporal > r_t {
                        continue;
                    }
                    let spatial = *spatial_distances[i]
                        .get_or_insert_with(|| chosen_location.spatial_distance(l, DistanceUnit::Meters));
                    // TODO: keep the temporally closest location of each trajectory, not the first one
                    if spatial <= r_s && used_trajectories.insert(*id) {
                        members.push(i);
                    }
                }

                if members.len() + 1 >= self.conf.k {
                    return Some(members);
                }
            }
        }

        // No existing cluster
        None
    }

    pub fn anonymized_dataset(&self) -> &Dataset {
        &self.anonymized_dataset
    }

    pub fn into_anonymized(self) -> Dataset {
        self.anonymized_dataset
    }
}
