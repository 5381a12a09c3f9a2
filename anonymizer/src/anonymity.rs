//! Disclosure risk and utility loss of an anonymized dataset against its original.

use std::collections::HashMap;

use tracing::info;
use trajectories::{Dataset, Id, Location, Trajectory};

use crate::strategy::TrajectoryDistance;
use crate::{AnonymizationError, RecordLinkageConf};

/// Ids of the originals sharing one location sequence.
struct DuplicateIndex<'a> {
    groups: HashMap<&'a [Location], Vec<Id>>,
}

impl<'a> DuplicateIndex<'a> {
    fn new(original: &'a Dataset) -> Self {
        let mut groups: HashMap<&[Location], Vec<Id>> = HashMap::new();
        for t in original {
            groups.entry(t.locations()).or_default().push(t.id);
        }
        Self { groups }
    }

    /// Probability of relinking `anonymized` given that its nearest original is
    /// `nearest`: one over the duplicate count when the true id is among the
    /// duplicates, zero otherwise.
    fn credit(&self, nearest: &Trajectory, anonymized: &Trajectory) -> f64 {
        match self.groups.get(nearest.locations()) {
            Some(ids) if ids.contains(&anonymized.id) => 1.0 / ids.len() as f64,
            _ => 0.0,
        }
    }
}

/// Index of the value of `sorted` closest to `target`. On equal distance the
/// smaller value wins.
pub fn take_closest(sorted: &[f64], target: f64) -> usize {
    let pos = sorted.partition_point(|&v| v < target);
    if pos == 0 {
        return 0;
    }
    if pos == sorted.len() {
        return pos - 1;
    }
    let (before, after) = (sorted[pos - 1], sorted[pos]);
    if after - target < target - before { pos } else { pos - 1 }
}

/// `window_size` consecutive indices of `sorted` around the value closest to
/// `target`. A window cut at one end grows at the other, so the window is
/// always full when `sorted` is long enough.
pub fn take_closest_window(sorted: &[f64], target: f64, window_size: usize) -> std::ops::RangeInclusive<usize> {
    let Some(last) = sorted.len().checked_sub(1) else {
        return 1..=0;
    };
    let window_size = window_size.max(1);
    let pos = take_closest(sorted, target) as i64;
    let cut = (window_size / 2) as i64;
    let last = last as i64;

    let mut before = pos - cut;
    if window_size % 2 == 0 {
        before += 1;
    }
    let mut after = pos + cut;
    let rest_before = (-before).max(0);
    let rest_after = (after - last).max(0);
    before = (before - rest_after).max(0);
    after = (after + rest_before).min(last);
    before as usize..=after as usize
}

pub struct Stats<'a> {
    original: &'a Dataset,
    anonymized: &'a Dataset,
}

impl<'a> Stats<'a> {
    pub fn new(original: &'a Dataset, anonymized: &'a Dataset) -> Self {
        Self { original, anonymized }
    }

    fn check_not_empty(&self, what: &'static str) -> Result<(), AnonymizationError> {
        if self.original.is_empty() || self.anonymized.is_empty() {
            return Err(AnonymizationError::EmptyDataset(what));
        }
        Ok(())
    }

    /// Expected percentage of anonymized trajectories an attacker relinks to
    /// their source by picking the nearest original.
    pub fn record_linkage(&self, distance: &dyn TrajectoryDistance) -> Result<f64, AnonymizationError> {
        self.check_not_empty("record linkage")?;
        info!("Calculating privacy metric (record linkage)");
        let duplicates = DuplicateIndex::new(self.original);

        let mut total_prob = 0.0;
        for anonymized in self.anonymized {
            let mut nearest: Option<(&Trajectory, f64)> = None;
            for original in self.original {
                let d = distance.compute_without_map(original, anonymized)?;
                if nearest.is_none_or(|(_, min)| d < min) {
                    nearest = Some((original, d));
                }
            }
            if let Some((nearest, _)) = nearest {
                total_prob += duplicates.credit(nearest, anonymized);
            }
        }
        let risk = total_prob / self.original.len() as f64 * 100.0;
        info!("Record linkage: {risk:.2}%");
        Ok(risk)
    }

    /// Record linkage restricted, for each anonymized trajectory, to a window
    /// of originals with the closest distance to the reference trajectory.
    /// A window at least as large as the original dataset gives the exact
    /// score.
    pub fn fast_record_linkage(
        &self,
        distance: &mut dyn TrajectoryDistance,
        conf: RecordLinkageConf,
    ) -> Result<f64, AnonymizationError> {
        self.check_not_empty("fast record linkage")?;
        let window_size = conf.window_for(self.original.len());
        info!("Calculating fast record linkage (disclosure risk), window size = {window_size}");
        distance.compute_reference_trajectory()?;
        let duplicates = DuplicateIndex::new(self.original);

        // Positions in the original dataset, ordered by distance to the reference.
        let to_reference = self
            .original
            .iter()
            .map(|t| distance.distance_to_reference_trajectory(t))
            .collect::<Result<Vec<f64>, _>>()?;
        let mut order: Vec<usize> = (0..self.original.len()).collect();
        order.sort_by(|&a, &b| to_reference[a].total_cmp(&to_reference[b]));
        let sorted: Vec<f64> = order.iter().map(|&i| to_reference[i]).collect();

        let originals = self.original.trajectories();
        let mut total_prob = 0.0;
        for anonymized in self.anonymized {
            let scalar = distance.distance_to_reference_trajectory(anonymized)?;
            // Ties go to the earliest original, as in the exhaustive scan.
            let mut nearest: Option<(usize, f64)> = None;
            for &i in &order[take_closest_window(&sorted, scalar, window_size)] {
                let d = distance.compute_without_map(&originals[i], anonymized)?;
                if nearest.is_none_or(|(best, min)| d < min || (d == min && i < best)) {
                    nearest = Some((i, d));
                }
            }
            if let Some((i, _)) = nearest {
                total_prob += duplicates.credit(&originals[i], anonymized);
            }
        }
        let risk = total_prob / self.original.len() as f64 * 100.0;
        info!("Fast record linkage: {risk:.2}%");
        Ok(risk)
    }

    pub fn removed_trajectories(&self) -> usize {
        self.original.len().saturating_sub(self.anonymized.len())
    }

    pub fn removed_locations(&self) -> usize {
        self.original
            .location_count()
            .saturating_sub(self.anonymized.location_count())
    }

    pub fn removed_trajectories_ratio(&self) -> Result<f64, AnonymizationError> {
        if self.original.is_empty() {
            return Err(AnonymizationError::EmptyDataset("removed trajectories"));
        }
        Ok(self.removed_trajectories() as f64 / self.original.len() as f64)
    }

    pub fn removed_locations_ratio(&self) -> Result<f64, AnonymizationError> {
        let total = self.original.location_count();
        if total == 0 {
            return Err(AnonymizationError::EmptyDataset("removed locations"));
        }
        Ok(self.removed_locations() as f64 / total as f64)
    }

    /// Root mean squared distance between each original and the anonymized
    /// trajectory with the same id. Originals without counterpart are skipped.
    pub fn rmse(&self, distance: &dyn TrajectoryDistance) -> Result<f64, AnonymizationError> {
        if self.anonymized.is_empty() {
            return Err(AnonymizationError::EmptyDataset("rmse"));
        }
        let mut total = 0.0;
        for original in self.original {
            if let Some(anonymized) = self.anonymized.get(original.id) {
                total += distance.compute_without_map(original, anonymized)?.powi(2);
            }
        }
        Ok((total / self.anonymized.len() as f64).sqrt())
    }
}
