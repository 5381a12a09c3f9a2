use std::collections::HashMap;

use geo_types::{coord, Rect};
use itertools::{Itertools, MinMaxResult};
use serde::{Deserialize, Serialize};

use crate::{default, Id, Insertable, Queryable, Timestamp, Trajectory, TrajectoryKey};

/// A set of trajectories, unique by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Trajectory>", into = "Vec<Trajectory>")]
pub struct Dataset {
    trajectories: Vec<Trajectory>,
    index: HashMap<Id, usize>,
}

impl Dataset {
    pub fn new() -> Self {
        default()
    }

    pub fn get(&self, id: Id) -> Option<&Trajectory> {
        self.find_index(&TrajectoryKey(id)).map(|i| &self.trajectories[i])
    }

    pub fn get_mut(&mut self, id: Id) -> Option<&mut Trajectory> {
        self.find_index(&TrajectoryKey(id)).map(|i| &mut self.trajectories[i])
    }

    pub fn trajectories(&self) -> &[Trajectory] {
        &self.trajectories
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Trajectory> {
        self.trajectories.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = Id> + '_ {
        self.trajectories.iter().map(|t| t.id)
    }

    pub fn sort_by_key<K: Ord, F: FnMut(&Trajectory) -> K>(&mut self, f: F) {
        self.trajectories.sort_by_key(f);
        self.reindex();
    }

    pub fn sort_by_id(&mut self) {
        self.sort_by_key(|t| t.id);
    }

    pub fn retain<F: FnMut(&Trajectory) -> bool>(&mut self, f: F) {
        self.trajectories.retain(f);
        self.reindex();
    }

    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }

    pub fn location_count(&self) -> usize {
        self.trajectories.iter().map(Trajectory::len).sum()
    }

    /// Smallest rectangle holding every location, `None` for a dataset without locations.
    pub fn bounding_box(&self) -> Option<Rect<f64>> {
        let mut coords = self
            .trajectories
            .iter()
            .flat_map(|t| t.locations().iter().map(|l| l.point().0));
        let first = coords.next()?;
        let (min, max) = coords.fold((first, first), |(min, max), c| {
            (
                coord! { x: min.x.min(c.x), y: min.y.min(c.y) },
                coord! { x: max.x.max(c.x), y: max.y.max(c.y) },
            )
        });
        Some(Rect::new(min, max))
    }

    pub fn min_timestamp(&self) -> Option<Timestamp> {
        self.timestamp_bounds().map(|(min, _)| min)
    }

    pub fn max_timestamp(&self) -> Option<Timestamp> {
        self.timestamp_bounds().map(|(_, max)| max)
    }

    fn timestamp_bounds(&self) -> Option<(Timestamp, Timestamp)> {
        match self
            .trajectories
            .iter()
            .flat_map(|t| t.locations().iter().map(|l| l.timestamp()))
            .minmax()
        {
            MinMaxResult::NoElements => None,
            MinMaxResult::OneElement(ts) => Some((ts, ts)),
            MinMaxResult::MinMax(min, max) => Some((min, max)),
        }
    }

    fn reindex(&mut self) {
        self.index = self
            .trajectories
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id, i))
            .collect();
    }
}

impl Insertable<Trajectory> for Dataset {
    type Key = TrajectoryKey;

    fn insert(&mut self, data: Trajectory) -> Self::Key {
        // Does not insert duplicates
        if self.index.contains_key(&data.id) {
            return data.key();
        }
        let key = data.key();
        self.index.insert(data.id, self.trajectories.len());
        self.trajectories.push(data);
        key
    }
}

impl Queryable<TrajectoryKey> for Dataset {
    fn find_index(&self, key: &TrajectoryKey) -> Option<usize> {
        self.index.get(&key.0).copied()
    }
}

impl FromIterator<Trajectory> for Dataset {
    fn from_iter<I: IntoIterator<Item = Trajectory>>(iter: I) -> Self {
        let mut slf: Self = default();
        slf.insert_many(iter);
        slf
    }
}

impl From<Vec<Trajectory>> for Dataset {
    fn from(value: Vec<Trajectory>) -> Self {
        value.into_iter().collect()
    }
}

impl From<Dataset> for Vec<Trajectory> {
    fn from(value: Dataset) -> Self {
        value.trajectories
    }
}

impl IntoIterator for Dataset {
    type Item = Trajectory;
    type IntoIter = std::vec::IntoIter<Trajectory>;

    fn into_iter(self) -> Self::IntoIter {
        self.trajectories.into_iter()
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Trajectory;
    type IntoIter = std::slice::Iter<'a, Trajectory>;

    fn into_iter(self) -> Self::IntoIter {
        self.trajectories.iter()
    }
}
