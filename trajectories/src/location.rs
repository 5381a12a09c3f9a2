use std::hash::{Hash, Hasher};

use geo::{Distance, Haversine, InterpolatePoint};
use geo_types::Point;
use serde::{Deserialize, Serialize};

use crate::{Meter, Timestamp};

const METERS_PER_KILOMETER: f64 = 1_000.0;
const METERS_PER_MILE: f64 = 1_609.344;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceUnit {
    #[default]
    Meters,
    Kilometers,
    Miles,
}

impl DistanceUnit {
    pub fn from_meters(self, meters: Meter) -> f64 {
        match self {
            DistanceUnit::Meters => meters,
            DistanceUnit::Kilometers => meters / METERS_PER_KILOMETER,
            DistanceUnit::Miles => meters / METERS_PER_MILE,
        }
    }
}

/// A timestamped geographic position. `point.x()` is the longitude and
/// `point.y()` the latitude, both in degrees.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Location {
    timestamp: Timestamp,
    point: Point<f64>,
}

impl Location {
    pub fn new(timestamp: Timestamp, point: Point<f64>) -> Self {
        Self { timestamp, point }
    }

    pub fn from_lat_lon(timestamp: Timestamp, lat: f64, lon: f64) -> Self {
        Self::new(timestamp, Point::new(lon, lat))
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn point(&self) -> Point<f64> {
        self.point
    }

    pub fn lat(&self) -> f64 {
        self.point.y()
    }

    pub fn lon(&self) -> f64 {
        self.point.x()
    }

    /// Absolute difference in seconds.
    pub fn temporal_distance(&self, other: &Location) -> u64 {
        self.timestamp.abs_diff(other.timestamp)
    }

    /// Great-circle distance to `other`.
    pub fn spatial_distance(&self, other: &Location, unit: DistanceUnit) -> f64 {
        unit.from_meters(Haversine.distance(self.point, other.point))
    }

    /// Position along the great circle between `self` and `other` at `timestamp`.
    /// Timestamps outside the pair are clamped to the nearest end.
    pub fn interpolate(&self, other: &Location, timestamp: Timestamp) -> Point<f64> {
        let span = other.timestamp - self.timestamp;
        if span == 0 || timestamp <= self.timestamp {
            return self.point;
        }
        if timestamp >= other.timestamp {
            return other.point;
        }
        let ratio = (timestamp - self.timestamp) as f64 / span as f64;
        Haversine.point_at_ratio_between(self.point, other.point, ratio)
    }
}

// Bitwise equality so a location sequence can key a hash map.
impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp
            && self.point.x().to_bits() == other.point.x().to_bits()
            && self.point.y().to_bits() == other.point.y().to_bits()
    }
}

impl Eq for Location {}

impl Hash for Location {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.timestamp.hash(state);
        self.point.x().to_bits().hash(state);
        self.point.y().to_bits().hash(state);
    }
}
