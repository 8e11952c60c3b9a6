//! End-to-end tests exercising both maintainers through the
//! `DynamicClustering` trait.

use dyn_coreset::{
    CoresetTree, DynamicClustering, Key, LayeredSampling, LpNorm, SlidingWindow, UpdateStream,
};
use std::collections::BTreeSet;

fn maintainers(k: usize) -> Vec<Box<dyn DynamicClustering>> {
    vec![
        Box::new(LayeredSampling::new(
            k,
            LpNorm::with_jitter(2, 1e-4),
            8.0,
            0.5,
            0.2,
            11,
        )),
        Box::new(CoresetTree::new(k, LpNorm::euclidean(), 40, 11)),
    ]
}

// Two tight groups far apart; the returned centers must pick one
// representative from each.
#[test]
fn test_both_maintainers_separate_two_groups() {
    for mut algo in maintainers(2) {
        algo.insert(1, vec![0.0, 0.0]);
        algo.insert(2, vec![0.0, 0.1]);
        algo.insert(3, vec![10.0, 0.0]);
        algo.insert(4, vec![10.0, 0.1]);

        let centers = algo.cluster();
        assert_eq!(centers.len(), 2, "{}: {:?}", algo.name(), centers);
        assert_eq!(
            centers.iter().filter(|&&k| k <= 2).count(),
            1,
            "{}: {:?}",
            algo.name(),
            centers
        );
        assert_eq!(centers.iter().filter(|&&k| k >= 3).count(), 1);
    }
}

// With at most k live points the clustering is the identity.
#[test]
fn test_at_most_k_points_returns_all_keys() {
    for mut algo in maintainers(5) {
        algo.insert(10, vec![1.0]);
        algo.insert(20, vec![2.0]);
        algo.insert(30, vec![3.0]);

        assert_eq!(algo.cluster(), BTreeSet::from([10, 20, 30]), "{}", algo.name());
    }
}

#[test]
fn test_invalid_updates_are_absorbed() {
    for mut algo in maintainers(2) {
        algo.delete(5);
        algo.insert(5, vec![0.0, 0.0]);
        algo.insert(5, vec![9.0, 9.0]);
        algo.insert(6, vec![1.0, 1.0]);
        algo.delete(7);

        let centers = algo.cluster();
        assert_eq!(centers, BTreeSet::from([5, 6]), "{}", algo.name());
    }
}

#[test]
fn test_deletions_retire_centers() {
    for mut algo in maintainers(2) {
        algo.insert(1, vec![0.0, 0.0]);
        algo.insert(2, vec![0.0, 0.1]);
        algo.insert(3, vec![10.0, 0.0]);
        algo.insert(4, vec![10.0, 0.1]);

        algo.delete(3);
        algo.delete(4);

        let centers = algo.cluster();
        assert_eq!(centers, BTreeSet::from([1, 2]), "{}", algo.name());
    }
}

// Replay a full sliding-window stream; at every queried step the returned
// centers must be live keys and the clustering must stay sane.
#[test]
fn test_sliding_window_replay() {
    let data: Vec<Vec<f64>> = (0..60)
        .map(|i| {
            let group = (i % 3) as f64;
            vec![
                group * 20.0 + (i as f64 * 0.37).sin(),
                (i as f64 * 0.53).cos(),
            ]
        })
        .collect();
    let stream = SlidingWindow::shuffled(data, 25, 5);

    for mut algo in maintainers(3) {
        let mut live: BTreeSet<Key> = BTreeSet::new();

        for i in 0..stream.len() {
            let u = stream.update(i);
            if u.is_insert {
                algo.insert(u.key, u.point.clone());
                live.insert(u.key);
            } else {
                algo.delete(u.key);
                live.remove(&u.key);
            }

            if i % 10 == 9 {
                let centers = algo.cluster();
                assert!(
                    centers.len() <= 3,
                    "{} returned {} centers",
                    algo.name(),
                    centers.len()
                );
                for c in &centers {
                    assert!(live.contains(c), "{} returned dead key {}", algo.name(), c);
                }
                if live.len() >= 3 {
                    assert_eq!(centers.len(), 3, "{} at step {}", algo.name(), i);
                }
            }
        }

        assert!(algo.cluster().is_empty(), "{} not empty after full replay", algo.name());
    }
}
