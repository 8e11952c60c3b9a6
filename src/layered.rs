//! Layered sampling maintainer.
//!
//! The structure keeps a chain of layers. Each sampled layer owns a handful
//! of centers drawn uniformly from the residue it was built from, a
//! nearest-center partition of the points that landed within the outlier
//! threshold ν, and a rebuild countdown. Points beyond ν cascade into the
//! next, deeper layer; the terminal residue stays unsampled. The maintained
//! coreset is the union of the terminal residue (weight 1) and every layer's
//! centers (weighted by cluster size).
//!
//! Every update decrements the countdowns of the layers it touches; when a
//! countdown lapses, that layer and everything beneath it is reconstructed.
//! The countdown ⌈τ·n⌉ with τ = β·ε amortizes reconstruction cost against
//! the amount of structural change since the layer was built.

use crate::dynamic::DynamicClustering;
use crate::local_search::LocalSearch;
use crate::metric::Metric;
use crate::points::{Key, WeightedSet};
use log::{debug, trace};
use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, BTreeSet};

// One sampled layer: the points that reached it (tagged with their cluster
// index once assigned), its sampled centers with their weights, the clusters
// and their distance-sorted member lists, and the rebuild countdown.
struct Layer {
    points: BTreeMap<Key, Option<usize>>,
    samples: BTreeMap<Key, f64>,
    clusters: Vec<BTreeSet<Key>>,
    sorted: Vec<BTreeSet<(OrderedFloat<f64>, Key)>>,
    timer: i64,
}

/// Dynamic coreset maintainer based on layered uniform sampling.
pub struct LayeredSampling<M> {
    metric: M,
    k: usize,
    sample_size: usize,
    beta: f64,
    tau: f64,
    space: BTreeMap<Key, Vec<f64>>,
    layers: Vec<Layer>,
    tail: BTreeSet<Key>,
    rng: StdRng,
}

impl<M: Metric> LayeredSampling<M> {
    /// `phi` fixes the number of centers sampled per layer (⌊φ⌋), `beta`
    /// the outlier quantile and `epsilon` the accuracy parameter; together
    /// β·ε set the rebuild countdown rate τ.
    pub fn new(k: usize, metric: M, phi: f64, beta: f64, epsilon: f64, seed: u64) -> Self {
        Self {
            metric,
            k,
            sample_size: (phi.floor() as usize).max(1),
            beta,
            tau: beta * epsilon,
            space: BTreeMap::new(),
            layers: Vec::new(),
            tail: BTreeSet::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Number of layers, the terminal residue included.
    pub fn depth(&self) -> usize {
        self.layers.len() + 1
    }

    /// Number of live points.
    pub fn len(&self) -> usize {
        self.space.len()
    }

    pub fn is_empty(&self) -> bool {
        self.space.is_empty()
    }

    // First layer whose countdown has lapsed, if any.
    fn due_layer(&self) -> Option<usize> {
        self.layers.iter().position(|layer| layer.timer <= 0)
    }

    fn check_for_reconstruction(&mut self) {
        if let Some(i) = self.due_layer() {
            debug!("layer {} countdown lapsed, reconstructing below it", i);
            self.reconstruct_from(i);
        }
    }

    // Discard layer i and everything deeper, fold their points back into
    // the terminal residue, and re-run layer construction.
    fn reconstruct_from(&mut self, i: usize) {
        if i < self.layers.len() {
            let mut drained = self.layers.drain(i..);
            if let Some(layer) = drained.next() {
                drop(drained);
                self.tail = layer.points.into_keys().collect();
            }
        }

        while self.tail.len() > self.sample_size {
            self.construct_layer();
        }
    }

    // Build one layer from the current terminal residue.
    fn construct_layer(&mut self) {
        let points: Vec<Key> = self.tail.iter().copied().collect();
        let n = points.len();

        // sample centers uniformly, with replacement
        let mut samples: BTreeMap<Key, f64> = BTreeMap::new();
        for _ in 0..self.sample_size {
            samples.insert(points[self.rng.gen_range(0..n)], 0.0);
        }
        let centers: Vec<Key> = samples.keys().copied().collect();
        let m = centers.len();

        // nearest-center assignment over the residue
        let mut dist = vec![f64::INFINITY; n];
        let mut assignment = vec![0usize; n];
        let mut counts = vec![0usize; m];

        for (i, &key) in points.iter().enumerate() {
            for (j, &center) in centers.iter().enumerate() {
                let x = self.metric.d(&self.space[&key], &self.space[&center]);
                if x < dist[i] {
                    dist[i] = x;
                    assignment[i] = j;
                }
            }
            counts[assignment[i]] += 1;
        }

        for (j, &center) in centers.iter().enumerate() {
            samples.insert(center, counts[j] as f64);
        }

        // outlier threshold: the ⌈β·n⌉-th order statistic of the
        // assignment distances
        let mut sorted_dist = dist.clone();
        sorted_dist.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let cut = ((n as f64 * self.beta).ceil() as usize).min(n - 1);
        let nu = sorted_dist[cut];

        let mut layer_points = BTreeMap::new();
        let mut clusters = vec![BTreeSet::new(); m];
        let mut sorted = vec![BTreeSet::new(); m];
        let mut new_tail = BTreeSet::new();

        for (i, &key) in points.iter().enumerate() {
            if dist[i] <= nu {
                clusters[assignment[i]].insert(key);
                sorted[assignment[i]].insert((OrderedFloat(dist[i]), key));
                layer_points.insert(key, Some(assignment[i]));
            } else {
                layer_points.insert(key, None);
                new_tail.insert(key);
            }
        }

        let timer = (n as f64 * self.tau).ceil() as i64;

        trace!(
            "constructed layer {}: {} residue points, {} centers, {} outliers, countdown {}",
            self.layers.len(),
            n,
            m,
            new_tail.len(),
            timer
        );

        self.layers.push(Layer {
            points: layer_points,
            samples,
            clusters,
            sorted,
            timer,
        });
        self.tail = new_tail;
    }

    // A deleted center is replaced by the closest still-live member of its
    // cluster; dead entries at the front of the sorted list are discarded
    // on the way.
    fn replace_center(layer: &mut Layer, cluster: usize) {
        while let Some(&(_, candidate)) = layer.sorted[cluster].first() {
            if layer.clusters[cluster].contains(&candidate) {
                layer
                    .samples
                    .insert(candidate, layer.clusters[cluster].len() as f64);
                return;
            }
            layer.sorted[cluster].pop_first();
        }
    }

    /// The maintained coreset: terminal residue at weight 1 plus every
    /// layer's centers at their cluster sizes.
    fn coreset(&self) -> WeightedSet {
        let mut weights: BTreeMap<Key, f64> = BTreeMap::new();

        for &key in &self.tail {
            weights.insert(key, 1.0);
        }
        for layer in &self.layers {
            for (&key, &w) in &layer.samples {
                weights.insert(key, w);
            }
        }

        let mut out = WeightedSet::with_capacity(weights.len());
        for (&key, &w) in &weights {
            if let Some(point) = self.space.get(&key) {
                out.push(key, point.clone(), w);
            }
        }
        out
    }

    #[cfg(test)]
    fn timers(&self) -> Vec<i64> {
        self.layers.iter().map(|layer| layer.timer).collect()
    }
}

impl<M: Metric> DynamicClustering for LayeredSampling<M> {
    fn insert(&mut self, key: Key, point: Vec<f64>) {
        if self.space.contains_key(&key) {
            return;
        }

        self.space.insert(key, point);

        for layer in &mut self.layers {
            layer.points.insert(key, None);
            layer.timer -= 1;
        }
        self.tail.insert(key);

        // grow new layers if the residue became large enough
        while self.tail.len() > self.sample_size {
            self.construct_layer();
        }

        self.check_for_reconstruction();
    }

    fn delete(&mut self, key: Key) {
        if self.space.remove(&key).is_none() {
            return;
        }

        for i in 0..self.layers.len() {
            let layer = &mut self.layers[i];
            let tag = layer.points.remove(&key);
            layer.timer -= 1;

            if let Some(Some(cluster)) = tag {
                // the point was clustered here, so it reaches no deeper layer
                layer.clusters[cluster].remove(&key);

                if layer.samples.remove(&key).is_some() && !layer.clusters[cluster].is_empty() {
                    Self::replace_center(layer, cluster);
                }

                self.check_for_reconstruction();
                return;
            }
        }

        self.tail.remove(&key);
        self.check_for_reconstruction();
    }

    fn cluster(&mut self) -> BTreeSet<Key> {
        let coreset = self.coreset();
        let mut solver = LocalSearch::new(self.k, self.rng.gen());
        solver.cluster(&self.metric, &coreset)
    }

    fn name(&self) -> String {
        format!("layered_k{}_s{}", self.k, self.sample_size)
    }
}
