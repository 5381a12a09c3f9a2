#[cfg(test)]
mod tests {
    use anonymizer::*;
    use approx::assert_relative_eq;
    use itertools::Itertools;
    use proptest::prelude::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use tracing_subscriber::EnvFilter;
    use trajectories::*;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    /// `n` locations one minute apart, heading east from (`lat`, 2.0).
    fn walk(id: Id, start: Timestamp, lat: f64, n: i64) -> Trajectory {
        Trajectory::with_locations(
            id,
            id + 1_000,
            (0..n).map(|i| Location::from_lat_lon(start + i * 60, lat, 2.0 + i as f64 * 0.002)),
        )
    }

    fn random_trajectory(id: Id, rng: &mut ChaCha8Rng) -> Trajectory {
        let start = rng.random_range(0..3_600);
        let lat = 41.0 + rng.random_range(0.0..0.05);
        let lon = 2.0 + rng.random_range(0.0..0.05);
        Trajectory::with_locations(
            id,
            id,
            (0..rng.random_range(3..8)).map(|i| {
                Location::from_lat_lon(start + i * 45, lat + i as f64 * 0.0004, lon + i as f64 * 0.0004)
            }),
        )
    }

    fn random_dataset(n: Id, seed: u64) -> Dataset {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..n).map(|id| random_trajectory(id, &mut rng)).collect()
    }

    /// Trajectories starting within 30 s and 60 m of each other and moving in
    /// step, one location every five minutes. Locations of one step fall within
    /// the smallest default swap radii, locations of different steps never do.
    fn convoy(n: Id, seed: u64) -> Dataset {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..n)
            .map(|id| {
                let start = rng.random_range(0..30);
                let lat = 41.0 + rng.random_range(0.0..0.0005);
                let lon = 2.0 + rng.random_range(0.0..0.0005);
                Trajectory::with_locations(
                    id,
                    id,
                    (0..rng.random_range(3..6))
                        .map(|i| Location::from_lat_lon(start + i * 300, lat, lon + i as f64 * 0.003)),
                )
            })
            .collect()
    }

    fn swapped(original: &Dataset, seed: u64) -> Dataset {
        let mut swap = SwapLocations::new(original, SwapConf::default().seed(seed));
        swap.run_seeded().expect("valid k");
        swap.into_anonymized()
    }

    fn nine_evenly_spaced() -> Dataset {
        (0..9).map(|i| walk(i, i as Timestamp * 300, 41.0 + i as f64 * 0.001, 5)).collect()
    }

    #[test]
    fn microaggregation_three_partitions_of_three() {
        init_tracing();
        let original = nine_evenly_spaced();
        let mut method = TimePartMicroaggregation::new(&original, MicroaggregationConf { k: 3, interval: 600 });
        method.run().expect("nine trajectories are clusterable at k = 3");
        let anonymized = method.anonymized_dataset();

        assert_eq!(anonymized.len(), 9);
        assert_eq!(anonymized.ids().collect_vec(), original.ids().collect_vec());
        let groups = anonymized.iter().map(|t| t.locations().to_vec()).counts();
        assert_eq!(groups.len(), 3);
        assert!(groups.values().all(|&n| n == 3));
    }

    #[test]
    fn microaggregation_keeps_one_trajectory_per_id() {
        let original = random_dataset(40, 7);
        let mut method = TimePartMicroaggregation::new(&original, MicroaggregationConf { k: 4, interval: 900 });
        method.run().expect("clusterable");
        let anonymized = method.into_anonymized();

        assert_eq!(anonymized.len(), original.len());
        assert!(anonymized.ids().tuple_windows().all(|(a, b)| a < b));
        let groups = anonymized.iter().map(|t| t.locations().to_vec()).counts();
        assert!(groups.values().all(|&n| n >= 4), "groups: {:?}", groups.values().collect_vec());
    }

    #[test]
    fn microaggregation_bounds_linkage_by_k() {
        let original = random_dataset(30, 3);
        let k = 3;
        let mut method = TimePartMicroaggregation::new(&original, MicroaggregationConf { k, interval: 900 });
        method.run().expect("clusterable");
        let anonymized = method.into_anonymized();

        let distance = SynchronizedDistance::new(&original);
        let risk = Stats::new(&original, &anonymized)
            .record_linkage(&distance)
            .expect("non-empty datasets");
        assert!(risk <= 100.0 / k as f64 + 1e-9, "risk = {risk}");
    }

    #[test]
    fn swap_pairs_within_tight_radii() {
        init_tracing();
        // 1 and 2 travel together, so do 3 and 4, 1 km apart from the first pair
        let original: Dataset = [
            walk(1, 0, 41.0, 4),
            walk(2, 20, 41.0002, 4),
            walk(3, 0, 41.01, 4),
            walk(4, 20, 41.0102, 4),
        ]
        .into_iter()
        .collect();
        let conf = SwapConf::with_radii(2, (100.0, 100.0), (60, 60));
        let mut swap = SwapLocations::new(&original, conf);
        swap.run(&mut ChaCha8Rng::seed_from_u64(1)).expect("valid k");
        let anonymized = swap.anonymized_dataset();

        assert_eq!(anonymized.len(), 4);
        for t in anonymized {
            // one location per cluster, one cluster per minute
            assert_eq!(t.len(), 4);
            let partner = if t.id % 2 == 1 { t.id + 1 } else { t.id - 1 };
            let sources = [original.get(t.id), original.get(partner)];
            assert!(t.locations().iter().all(|l| {
                sources
                    .iter()
                    .flatten()
                    .any(|s| s.locations().contains(l))
            }));
        }
    }

    #[test]
    fn swap_drops_a_lonely_trajectory() {
        let original: Dataset = [walk(1, 0, 41.0, 6)].into_iter().collect();
        let conf = SwapConf::with_radii(2, (100.0, 100.0), (60, 60));
        let mut swap = SwapLocations::new(&original, conf);
        swap.run(&mut ChaCha8Rng::seed_from_u64(9)).expect("valid k");
        assert!(swap.anonymized_dataset().is_empty());

        let stats = Stats::new(&original, swap.anonymized_dataset());
        assert_eq!(stats.removed_trajectories(), 1);
        assert_relative_eq!(stats.removed_locations_ratio().expect("original has locations"), 1.0);
    }

    #[test]
    fn swap_ids_are_a_subset() {
        let mut original = convoy(8, 11);
        // far from the convoy and from each other
        original.insert(walk(100, 0, 45.0, 4));
        original.insert(walk(101, 0, 47.0, 4));
        let anonymized = swapped(&original, 4);

        assert_eq!(anonymized.ids().collect_vec(), (0..8).collect_vec());
        assert!(anonymized.iter().all(|t| original.get(t.id).is_some() && t.len() >= 3));
        assert!(anonymized.location_count() <= original.location_count());
    }

    #[test]
    fn fast_linkage_with_full_window_is_exact() {
        let original = convoy(20, 5);
        let anonymized = swapped(&original, 2);
        assert!(!anonymized.is_empty());

        let stats = Stats::new(&original, &anonymized);
        let mut distance = SynchronizedDistance::new(&original);
        let exact = stats.record_linkage(&distance).expect("non-empty datasets");
        let fast = stats
            .fast_record_linkage(&mut distance, RecordLinkageConf { window_size: Some(original.len() + 3) })
            .expect("non-empty datasets");
        assert_relative_eq!(exact, fast);
    }

    fn renamed(ds: &Dataset, offset: Id) -> Dataset {
        ds.iter()
            .map(|t| Trajectory::with_locations(offset - t.id, t.user_id, t.locations().iter().copied()))
            .collect()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn linkage_ignores_consistent_renaming(seed in any::<u64>(), n in 3u64..12) {
            let original = convoy(n, seed);
            let anonymized = swapped(&original, seed);
            prop_assert!(!anonymized.is_empty());

            let distance = SynchronizedDistance::new(&original);
            let risk = Stats::new(&original, &anonymized)
                .record_linkage(&distance)
                .expect("non-empty datasets");

            let (original_r, anonymized_r) = (renamed(&original, 10_000), renamed(&anonymized, 10_000));
            let distance_r = SynchronizedDistance::new(&original_r);
            let risk_r = Stats::new(&original_r, &anonymized_r)
                .record_linkage(&distance_r)
                .expect("non-empty datasets");
            prop_assert!((risk - risk_r).abs() < 1e-9);
        }
    }
}
