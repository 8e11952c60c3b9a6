//! Weighted point sets, the common currency between all components.
//!
//! A [`WeightedSet`] stores keys, coordinates and weights in parallel
//! columns. The flat layout is what the oracles index into, and unlike a
//! keyed map it tolerates the duplicate keys a coreset sample legitimately
//! produces (sampling is with replacement).

/// Caller-supplied stable identifier of a point.
pub type Key = u64;

/// A flat weighted point set.
#[derive(Clone, Debug, Default)]
pub struct WeightedSet {
    keys: Vec<Key>,
    points: Vec<Vec<f64>>,
    weights: Vec<f64>,
}

impl WeightedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            keys: Vec::with_capacity(n),
            points: Vec::with_capacity(n),
            weights: Vec::with_capacity(n),
        }
    }

    pub fn push(&mut self, key: Key, point: Vec<f64>, weight: f64) {
        self.keys.push(key);
        self.points.push(point);
        self.weights.push(weight);
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn key(&self, i: usize) -> Key {
        self.keys[i]
    }

    pub fn point(&self, i: usize) -> &[f64] {
        &self.points[i]
    }

    pub fn weight(&self, i: usize) -> f64 {
        self.weights[i]
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn total_weight(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// Append every entry of `other`, duplicates and all.
    pub fn extend_from(&mut self, other: &WeightedSet) {
        self.keys.extend_from_slice(&other.keys);
        self.points.extend_from_slice(&other.points);
        self.weights.extend_from_slice(&other.weights);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Key, &[f64], f64)> + '_ {
        self.keys
            .iter()
            .zip(self.points.iter())
            .zip(self.weights.iter())
            .map(|((&k, p), &w)| (k, p.as_slice(), w))
    }
}
