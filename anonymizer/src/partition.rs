use tracing::debug;
use trajectories::{Dataset, Timestamp, Trajectory};

/// Splits `trajectories`, ordered by start timestamp, into batches whose
/// starts fall within `interval` seconds of the batch's first start.
///
/// A batch shorter than `k` keeps pulling trajectories regardless of time
/// until it reaches `k`. A trailing remainder shorter than `k` joins the last
/// batch. When the input itself is shorter than `k` it forms the only batch.
/// Trajectories without locations start at [`Timestamp::MIN`].
pub fn partition_by_time(trajectories: &[&Trajectory], interval: u64, k: usize) -> Vec<Dataset> {
    let start = |t: &Trajectory| t.start_timestamp().unwrap_or(Timestamp::MIN);
    let interval = Timestamp::try_from(interval).unwrap_or(Timestamp::MAX);

    let mut batches: Vec<Vec<&Trajectory>> = Vec::new();
    let k = k.max(1);
    let mut rest = trajectories;
    while rest.len() >= k {
        let final_t = start(rest[0]).saturating_add(interval);
        // The walk stops short of the last remaining trajectory, which is left
        // to the size rule or to the trailing merge.
        let mut end = rest[..rest.len() - 1]
            .iter()
            .position(|&t| start(t) > final_t)
            .unwrap_or(rest.len() - 1);
        end = end.max(k);
        let (batch, tail) = rest.split_at(end);
        batches.push(batch.to_vec());
        rest = tail;
    }

    match batches.last_mut() {
        Some(last) => last.extend_from_slice(rest),
        None if !rest.is_empty() => batches.push(rest.to_vec()),
        None => {}
    }

    debug!(
        "Partitioned {} trajectories into {} batches",
        trajectories.len(),
        batches.len()
    );
    batches
        .into_iter()
        .map(|batch| batch.into_iter().cloned().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use trajectories::{Id, Location};

    fn starting_at(id: Id, ts: Timestamp) -> Trajectory {
        Trajectory::with_locations(id, id, [Location::from_lat_lon(ts, 41.0, 2.0)])
    }

    fn sizes(batches: &[Dataset]) -> Vec<usize> {
        batches.iter().map(Dataset::len).collect()
    }

    fn run(starts: &[Timestamp], interval: u64, k: usize) -> Vec<Dataset> {
        let ts: Vec<Trajectory> = starts
            .iter()
            .enumerate()
            .map(|(i, s)| starting_at(i as Id, *s))
            .collect();
        let refs: Vec<&Trajectory> = ts.iter().collect();
        partition_by_time(&refs, interval, k)
    }

    #[test]
    fn splits_on_interval() {
        let batches = run(&[0, 10, 20, 1_000, 1_010, 1_020, 2_000, 2_010, 2_020], 900, 3);
        assert_eq!(sizes(&batches), vec![3, 3, 3]);
    }

    #[test]
    fn short_batch_pulls_until_k() {
        let batches = run(&[0, 1_000, 2_000, 3_000, 4_000, 5_000], 900, 2);
        assert_eq!(sizes(&batches), vec![2, 2, 2]);
    }

    #[test]
    fn remainder_joins_last_batch() {
        let batches = run(&[0, 10, 20, 1_000], 100, 3);
        assert_eq!(sizes(&batches), vec![4]);
    }

    #[test]
    fn fewer_than_k_is_one_batch() {
        assert_eq!(sizes(&run(&[0, 10], 900, 3)), vec![2]);
        assert!(run(&[], 900, 3).is_empty());
    }

    proptest! {
        #[test]
        fn batches_cover_input_once(
            mut starts in prop::collection::vec(0i64..10_000, 0..60),
            interval in 0u64..2_000,
            k in 1usize..6,
        ) {
            starts.sort_unstable();
            let batches = run(&starts, interval, k);
            let mut ids: Vec<Id> = batches.iter().flat_map(|b| b.ids().collect::<Vec<_>>()).collect();
            ids.sort_unstable();
            prop_assert_eq!(ids, (0..starts.len() as Id).collect::<Vec<_>>());
            if starts.len() >= k {
                prop_assert!(batches.iter().all(|b| b.len() >= k));
            }
        }
    }
}
