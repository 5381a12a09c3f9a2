use std::cell::RefCell;
use std::collections::HashMap;

use geo::{Distance, Haversine};
use geo_types::Rect;
use trajectories::{Dataset, Id, Location, Timestamp, Trajectory};

use super::TrajectoryDistance;
use crate::AnonymizationError;

/// Weight of one second of start/end misalignment, in meters.
pub const DEFAULT_LANDA: f64 = 1.0;

/// Time-synchronized distance: the mean great-circle gap between each location
/// of one trajectory and the other trajectory's position at the same instant,
/// averaged over both directions, plus `landa` times the mean start/end time
/// gap.
#[derive(Debug)]
pub struct SynchronizedDistance {
    landa: f64,
    bounding_box: Option<Rect<f64>>,
    time_span: Option<(Timestamp, Timestamp)>,
    reference: Option<Trajectory>,
    distance_matrix: RefCell<HashMap<(Id, Id), f64>>,
}

impl SynchronizedDistance {
    pub fn new(dataset: &Dataset) -> Self {
        Self {
            landa: DEFAULT_LANDA,
            bounding_box: dataset.bounding_box(),
            time_span: dataset.min_timestamp().zip(dataset.max_timestamp()),
            reference: None,
            distance_matrix: RefCell::default(),
        }
    }

    pub fn with_landa(mut self, landa: Option<f64>) -> Self {
        self.landa = landa.unwrap_or(DEFAULT_LANDA);
        self
    }

    pub fn reference_trajectory(&self) -> Option<&Trajectory> {
        self.reference.as_ref()
    }

    fn directed(from: &Trajectory, to: &Trajectory) -> Result<f64, AnonymizationError> {
        let total = from
            .locations()
            .iter()
            .map(|l| {
                to.position_at(l.timestamp())
                    .map(|p| Haversine.distance(l.point(), p))
                    .ok_or(AnonymizationError::EmptyTrajectory(to.id))
            })
            .sum::<Result<f64, _>>()?;
        Ok(total / from.len() as f64)
    }
}

fn bounds(t: &Trajectory) -> Result<(Timestamp, Timestamp), AnonymizationError> {
    t.start_timestamp()
        .zip(t.end_timestamp())
        .ok_or(AnonymizationError::EmptyTrajectory(t.id))
}

impl TrajectoryDistance for SynchronizedDistance {
    fn compute(&self, a: &Trajectory, b: &Trajectory) -> Result<f64, AnonymizationError> {
        let key = (a.id.min(b.id), a.id.max(b.id));
        if let Some(d) = self.distance_matrix.borrow().get(&key) {
            return Ok(*d);
        }
        let d = self.compute_without_map(a, b)?;
        self.distance_matrix.borrow_mut().insert(key, d);
        Ok(d)
    }

    fn compute_without_map(&self, a: &Trajectory, b: &Trajectory) -> Result<f64, AnonymizationError> {
        let (a_start, a_end) = bounds(a)?;
        let (b_start, b_end) = bounds(b)?;
        let spatial = (Self::directed(a, b)? + Self::directed(b, a)?) / 2.0;
        let temporal = (a_start.abs_diff(b_start) + a_end.abs_diff(b_end)) as f64 / 2.0;
        Ok(spatial + self.landa * temporal)
    }

    fn compute_reference_trajectory(&mut self) -> Result<(), AnonymizationError> {
        let (bbox, (min_ts, max_ts)) = self
            .bounding_box
            .zip(self.time_span)
            .ok_or(AnonymizationError::EmptyDataset("reference trajectory"))?;
        let corner = bbox.min();
        let mut reference = Trajectory::new(Id::MAX, Id::MAX);
        reference.add_location(Location::new(min_ts, corner.into()), true);
        reference.add_location(Location::new(max_ts, corner.into()), true);
        self.reference = Some(reference);
        Ok(())
    }

    fn distance_to_reference_trajectory(&self, t: &Trajectory) -> Result<f64, AnonymizationError> {
        let reference = self
            .reference
            .as_ref()
            .ok_or(AnonymizationError::MissingReference)?;
        self.compute_without_map(reference, t)
    }

    fn reset_cache(&self) {
        self.distance_matrix.borrow_mut().clear();
    }
}
