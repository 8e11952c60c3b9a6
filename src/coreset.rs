//! Static importance-sampling coreset construction.
//!
//! Implements the coreset of Braverman, Feldman and Lang (2016): given a
//! weighted point set and an (α,β)-approximate clustering of it, sample m
//! points with probability mixing each point's share of the clustering cost
//! with its share of its cluster's weight, then reweight every sample by
//! 1/(m·p) so the coreset stays an unbiased estimator of clustering cost.
//!
//! The builder is reusable: the dynamic maintainers keep one instance per
//! tree node and call [`construct`](CoresetBuilder::construct) on every
//! recomputation.

use crate::bicriteria::{Clustering, KMeansPlusPlus};
use crate::metric::Metric;
use crate::points::WeightedSet;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Builder for ε-coresets of weighted point sets.
pub struct CoresetBuilder {
    k: usize,
    m: usize,
    oracle: KMeansPlusPlus,
    rng: StdRng,
    out: WeightedSet,
}

impl CoresetBuilder {
    /// A builder producing coresets of at most `max(m, k)` points.
    pub fn new(k: usize, m: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let oracle = KMeansPlusPlus::new(k, rng.gen());
        Self {
            k,
            m,
            oracle,
            rng,
            out: WeightedSet::new(),
        }
    }

    /// Build a coreset of `input` and cache it as the builder's output.
    ///
    /// `lambda` (a failure-probability-style parameter) and `epsilon` (the
    /// target precision) are threaded through for symmetry with the analysis
    /// but do not steer the construction; the sample count is fixed at
    /// construction time. Inputs smaller than `max(m, k)` pass through
    /// unchanged.
    pub fn construct(
        &mut self,
        metric: &dyn Metric,
        input: &WeightedSet,
        _lambda: f64,
        _epsilon: f64,
    ) {
        let n = input.len();
        let m = self.m.max(self.k);

        if n < m {
            self.out = input.clone();
            return;
        }

        let approximation = self.oracle.cluster(metric, input, None);
        self.sample(metric, input, &approximation, m);
    }

    /// The most recently constructed coreset.
    pub fn output(&self) -> &WeightedSet {
        &self.out
    }

    // Draw m points with replacement from the mixture distribution and
    // reweight them by 1/(m * p).
    fn sample(
        &mut self,
        metric: &dyn Metric,
        input: &WeightedSet,
        approximation: &Clustering,
        m: usize,
    ) {
        let clusters = &approximation.clusters;
        let k = clusters.len();

        // per-cluster total weight and total weighted cost of the approximation
        let mut cluster_weights = vec![0.0; k];
        let mut v = 0.0;

        for (i, members) in clusters.iter().enumerate() {
            let Some(center) = approximation.centers[i] else {
                continue;
            };
            for &j in members {
                cluster_weights[i] += input.weight(j);
                v += input.weight(j) * metric.d(input.point(j), input.point(center));
            }
        }

        // mixture of cost contribution and uniform-within-cluster share,
        // flattened into one cumulative table
        let mut table: Vec<(usize, f64)> = Vec::with_capacity(input.len());

        for (i, members) in clusters.iter().enumerate() {
            let Some(center) = approximation.centers[i] else {
                continue;
            };
            if cluster_weights[i] <= 0.0 {
                continue;
            }
            for &j in members {
                let cost_share = if v > 0.0 {
                    input.weight(j) * metric.d(input.point(j), input.point(center)) / v
                } else {
                    0.0
                };
                let uniform_share = input.weight(j) / (k as f64 * cluster_weights[i]);
                table.push((j, 0.5 * cost_share + 0.5 * uniform_share));
            }
        }

        self.out = WeightedSet::with_capacity(m);

        for _ in 0..m {
            let r: f64 = self.rng.gen();
            let mut acc = 0.0;
            let mut pick = None;

            for &(j, p) in &table {
                acc += p;
                if r <= acc {
                    pick = Some((j, p));
                    break;
                }
            }

            // float underflow can leave the table summing to slightly less
            // than one; fall back to the last entry with positive mass
            let picked = pick.or_else(|| table.iter().rev().find(|&&(_, p)| p > 0.0).copied());

            if let Some((j, p)) = picked {
                self.out.push(
                    input.key(j),
                    input.point(j).to_vec(),
                    input.weight(j) / (m as f64 * p),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::LpNorm;
    use crate::points::Key;

    fn grid(n: usize) -> WeightedSet {
        let mut set = WeightedSet::new();
        for i in 0..n {
            let x = (i % 10) as f64;
            let y = (i / 10) as f64;
            set.push(i as Key, vec![x, y], 1.0);
        }
        set
    }

    #[test]
    fn test_small_input_passes_through() {
        let input = grid(5);
        let mut builder = CoresetBuilder::new(3, 20, 0);
        builder.construct(&LpNorm::euclidean(), &input, 0.1, 0.2);

        assert_eq!(builder.output().len(), 5);
        assert_eq!(builder.output().keys(), input.keys());
    }

    #[test]
    fn test_size_bound() {
        let input = grid(80);
        let mut builder = CoresetBuilder::new(3, 20, 1);
        builder.construct(&LpNorm::euclidean(), &input, 0.1, 0.2);

        assert_eq!(builder.output().len(), 20);
    }

    #[test]
    fn test_same_seed_same_output() {
        let input = grid(60);

        let mut a = CoresetBuilder::new(4, 15, 99);
        let mut b = CoresetBuilder::new(4, 15, 99);
        a.construct(&LpNorm::euclidean(), &input, 0.1, 0.2);
        b.construct(&LpNorm::euclidean(), &input, 0.1, 0.2);

        assert_eq!(a.output().keys(), b.output().keys());
        assert_eq!(a.output().weights(), b.output().weights());
    }

    #[test]
    fn test_weight_conservation_in_expectation() {
        let input = grid(60);
        let total = input.total_weight();
        let runs = 400;

        let mut sum = 0.0;
        for seed in 0..runs {
            let mut builder = CoresetBuilder::new(3, 20, seed);
            builder.construct(&LpNorm::euclidean(), &input, 0.1, 0.2);
            sum += builder.output().total_weight();
        }

        let mean = sum / runs as f64;
        assert!(
            (mean - total).abs() < 0.15 * total,
            "mean coreset weight {} drifted from input weight {}",
            mean,
            total
        );
    }

    #[test]
    fn test_sampled_keys_come_from_input() {
        let input = grid(50);
        let mut builder = CoresetBuilder::new(2, 10, 7);
        builder.construct(&LpNorm::euclidean(), &input, 0.1, 0.2);

        for (key, _, w) in builder.output().iter() {
            assert!(input.keys().contains(&key));
            assert!(w > 0.0);
        }
    }
}
