//! The contract shared by the dynamic coreset maintainers.

use crate::points::Key;
use std::collections::BTreeSet;

/// A dynamic clustering algorithm: a structure that absorbs point insertions
/// and deletions and can be queried for a k-clustering of the current live
/// set at any time.
///
/// Invalid updates are absorbed, never surfaced: inserting a key that is
/// already live and deleting a key that is not are both no-ops, and querying
/// an empty structure returns the empty set.
pub trait DynamicClustering {
    /// Insert a point under `key`. No-op if the key is already live.
    fn insert(&mut self, key: Key, point: Vec<f64>);

    /// Delete the point stored under `key`. No-op if the key is not live.
    fn delete(&mut self, key: Key);

    /// Cluster the maintained summary and return the chosen center keys.
    /// Every returned key is a live point supplied by the caller, never a
    /// synthesized centroid.
    fn cluster(&mut self) -> BTreeSet<Key>;

    /// A label identifying the algorithm and its parameters, for harness
    /// output only.
    fn name(&self) -> String;
}
