use geo_types::Point;
use serde::{Deserialize, Serialize};

use crate::{Id, Location, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::From)]
pub struct TrajectoryKey(pub Id);

/// The path of one moving entity. Locations are kept in timestamp order unless
/// they were added with `sort = false`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trajectory {
    pub id: Id,
    pub user_id: Id,
    locations: Vec<Location>,
}

impl Trajectory {
    pub fn new(id: Id, user_id: Id) -> Self {
        Self {
            id,
            user_id,
            locations: Vec::new(),
        }
    }

    pub fn with_locations(id: Id, user_id: Id, locations: impl IntoIterator<Item = Location>) -> Self {
        let mut trajectory = Self::new(id, user_id);
        trajectory.add_locations(locations);
        trajectory
    }

    pub fn key(&self) -> TrajectoryKey {
        self.id.into()
    }

    pub fn add_location(&mut self, location: Location, sort: bool) {
        if sort {
            let at = self
                .locations
                .partition_point(|l| l.timestamp() <= location.timestamp());
            self.locations.insert(at, location);
        } else {
            self.locations.push(location);
        }
    }

    pub fn add_locations(&mut self, locations: impl IntoIterator<Item = Location>) {
        self.locations.extend(locations);
        self.sort_locations();
    }

    pub fn sort_locations(&mut self) {
        self.locations.sort_by_key(Location::timestamp);
    }

    /// The location sequence. Two trajectories holding equal sequences are
    /// duplicates of each other, whatever their ids.
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn first(&self) -> Option<&Location> {
        self.locations.first()
    }

    pub fn last(&self) -> Option<&Location> {
        self.locations.last()
    }

    pub fn start_timestamp(&self) -> Option<Timestamp> {
        self.first().map(Location::timestamp)
    }

    pub fn end_timestamp(&self) -> Option<Timestamp> {
        self.last().map(Location::timestamp)
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Where the entity was at `timestamp`, interpolating between the two
    /// surrounding locations. Clamped to the first/last location outside the
    /// covered time span. Assumes timestamp order.
    pub fn position_at(&self, timestamp: Timestamp) -> Option<Point<f64>> {
        let (first, last) = (self.first()?, self.last()?);
        if timestamp <= first.timestamp() {
            return Some(first.point());
        }
        if timestamp >= last.timestamp() {
            return Some(last.point());
        }
        let after = self
            .locations
            .partition_point(|l| l.timestamp() < timestamp);
        let next = &self.locations[after];
        let prev = &self.locations[after - 1];
        Some(prev.interpolate(next, timestamp))
    }
}
