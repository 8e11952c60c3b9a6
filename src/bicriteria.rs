//! Bicriteria clustering oracle: k-means++ seeding plus relocation passes.
//!
//! Produces an (α,β)-approximate k-clustering of a weighted point set. The
//! seeding samples k centers with probability proportional to weight times
//! squared distance to the nearest already-chosen center (D²-weighting), and
//! a fixed number of relocation passes then reassigns points to their nearest
//! centroid. The final representative of each cluster is the *member point*
//! closest to the cluster's weighted centroid; synthetic centroids never
//! leave this module.
//!
//! The oracle can also refine a prior candidate solution: callers pass the
//! previous centers as coordinate vectors and only the relocation passes run.

use crate::metric::Metric;
use crate::points::{Key, WeightedSet};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;

/// A clustering of an input [`WeightedSet`], by index.
///
/// `centers[i]` is the representative member of `clusters[i]`, or `None`
/// when the cluster came out of a relocation pass empty (its center of mass
/// is undefined, so no representative is available).
#[derive(Clone, Debug)]
pub struct Clustering {
    pub clusters: Vec<Vec<usize>>,
    pub centers: Vec<Option<usize>>,
}

impl Clustering {
    /// Keys of the representative points, empty clusters excluded.
    pub fn center_keys(&self, input: &WeightedSet) -> BTreeSet<Key> {
        self.centers
            .iter()
            .flatten()
            .map(|&i| input.key(i))
            .collect()
    }
}

/// The k-means++ bicriteria oracle.
pub struct KMeansPlusPlus {
    k: usize,
    passes: usize,
    rng: StdRng,
}

impl KMeansPlusPlus {
    /// Oracle with the default two relocation passes.
    pub fn new(k: usize, seed: u64) -> Self {
        Self::with_passes(k, 2, seed)
    }

    pub fn with_passes(k: usize, passes: usize, seed: u64) -> Self {
        Self {
            k,
            passes,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Cluster `input`, optionally seeded with prior candidate centers.
    ///
    /// With at most k points every point becomes its own singleton cluster.
    /// A prior configuration shorter than k is padded with input points.
    pub fn cluster(
        &mut self,
        metric: &dyn Metric,
        input: &WeightedSet,
        prior: Option<&[Vec<f64>]>,
    ) -> Clustering {
        let n = input.len();

        if n == 0 {
            return Clustering {
                clusters: Vec::new(),
                centers: Vec::new(),
            };
        }

        if n <= self.k {
            return Self::singletons(n);
        }

        let seeds = match prior {
            Some(centers) => self.pad_prior(input, centers),
            None => self.seed_centers(metric, input),
        };

        let mut clusters = Self::assign(metric, input, &seeds);

        for _ in 0..self.passes {
            let centroids = Self::centroids(input, &clusters);
            clusters = Self::assign(metric, input, &centroids);
        }

        let centroids = Self::centroids(input, &clusters);
        let centers = Self::representatives(metric, input, &clusters, &centroids);

        Clustering { clusters, centers }
    }

    // Every point is its own cluster and center.
    fn singletons(n: usize) -> Clustering {
        Clustering {
            clusters: (0..n).map(|i| vec![i]).collect(),
            centers: (0..n).map(Some).collect(),
        }
    }

    // A prior configuration shorter than k is topped up with input points so
    // the relocation passes always juggle k slots.
    fn pad_prior(&self, input: &WeightedSet, prior: &[Vec<f64>]) -> Vec<Option<Vec<f64>>> {
        let mut seeds: Vec<Option<Vec<f64>>> = prior.iter().cloned().map(Some).collect();
        for i in prior.len()..self.k {
            seeds.push(Some(input.point(i).to_vec()));
        }
        seeds
    }

    /// D²-weighted seeding. Each round samples a point with probability
    /// proportional to weight times squared distance to the nearest chosen
    /// center, recomputed incrementally. When the remaining mass sits
    /// entirely on already-chosen points, the next unsampled point is taken
    /// deterministically.
    fn seed_centers(&mut self, metric: &dyn Metric, input: &WeightedSet) -> Vec<Option<Vec<f64>>> {
        let n = input.len();
        let total_weight = input.total_weight();

        let mut probs: Vec<f64> = (0..n).map(|i| input.weight(i) / total_weight).collect();
        let mut dist = vec![f64::INFINITY; n];
        let mut chosen = vec![false; n];
        let mut degenerate = false;

        let mut seeds = Vec::with_capacity(self.k);

        for _ in 0..self.k {
            let idx = if degenerate {
                (0..n).find(|&i| !chosen[i]).unwrap_or(0)
            } else {
                let r: f64 = self.rng.gen();
                let mut acc = 0.0;
                let mut sample = n - 1;
                for (i, &p) in probs.iter().enumerate() {
                    acc += p;
                    if r <= acc {
                        sample = i;
                        break;
                    }
                }
                sample
            };

            chosen[idx] = true;
            seeds.push(Some(input.point(idx).to_vec()));

            let mut total_d2 = 0.0;
            for i in 0..n {
                let d = metric.d(input.point(i), input.point(idx));
                if d < dist[i] {
                    dist[i] = d;
                }
                total_d2 += input.weight(i) * dist[i] * dist[i];
            }

            if total_d2 <= 0.0 {
                degenerate = true;
            } else {
                degenerate = false;
                for i in 0..n {
                    probs[i] = input.weight(i) * dist[i] * dist[i] / total_d2;
                }
            }
        }

        seeds
    }

    // Assign every point to its nearest available center, first-found on
    // ties. Slots whose centroid is undefined attract nothing.
    fn assign(
        metric: &dyn Metric,
        input: &WeightedSet,
        centers: &[Option<Vec<f64>>],
    ) -> Vec<Vec<usize>> {
        let mut clusters = vec![Vec::new(); centers.len()];

        for i in 0..input.len() {
            let mut best: Option<usize> = None;
            let mut best_d = f64::INFINITY;

            for (j, center) in centers.iter().enumerate() {
                if let Some(c) = center {
                    let d = metric.d(c, input.point(i));
                    if best.is_none() || d < best_d {
                        best = Some(j);
                        best_d = d;
                    }
                }
            }

            if let Some(j) = best {
                clusters[j].push(i);
            }
        }

        clusters
    }

    // Weighted center of mass per cluster; None for empty clusters, whose
    // 0/0 centroid is undefined.
    fn centroids(input: &WeightedSet, clusters: &[Vec<usize>]) -> Vec<Option<Vec<f64>>> {
        clusters
            .iter()
            .map(|members| {
                let total: f64 = members.iter().map(|&i| input.weight(i)).sum();
                if members.is_empty() || total <= 0.0 {
                    return None;
                }

                let dim = input.point(members[0]).len();
                let mut center = vec![0.0; dim];
                for &i in members {
                    let w = input.weight(i);
                    for (c, x) in center.iter_mut().zip(input.point(i)) {
                        *c += w * x;
                    }
                }
                for c in &mut center {
                    *c /= total;
                }
                Some(center)
            })
            .collect()
    }

    // Representative of each cluster: the member closest to its centroid.
    fn representatives(
        metric: &dyn Metric,
        input: &WeightedSet,
        clusters: &[Vec<usize>],
        centroids: &[Option<Vec<f64>>],
    ) -> Vec<Option<usize>> {
        clusters
            .iter()
            .zip(centroids.iter())
            .map(|(members, centroid)| {
                let centroid = centroid.as_ref()?;
                let mut best = None;
                let mut best_d = f64::INFINITY;
                for &i in members {
                    let d = metric.d(input.point(i), centroid);
                    if best.is_none() || d < best_d {
                        best = Some(i);
                        best_d = d;
                    }
                }
                best
            })
            .collect()
    }
}
