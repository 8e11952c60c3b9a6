//! # dyn-coreset: Dynamic Coresets for k-Median/k-Means
//!
//! This library maintains a small, weighted summary (a *coreset*) of a large
//! point set undergoing arbitrary insertions and deletions, such that
//! clustering the summary yields a provably near-optimal clustering of the
//! full set at any time. It targets streaming and sliding-window workloads
//! where recomputing a clustering from scratch on every update is too
//! expensive.
//!
//! ## Components
//!
//! Two alternative dynamic maintainers implement the same
//! [`DynamicClustering`] contract:
//!
//! - [`LayeredSampling`]: a chain of layers, each an independently sampled
//!   partition of the still-unclustered residue, with amortized rebuild
//!   countdowns.
//! - [`CoresetTree`]: a height-balanced binary tree over the live points
//!   where every internal node caches a coreset of its subtree, with a lazy
//!   refresh schedule and an outer compaction step (Henzinger and Kale,
//!   ESA 2020).
//!
//! Both are built on two shared static primitives:
//!
//! - [`CoresetBuilder`]: the importance-sampling coreset construction of
//!   Braverman, Feldman and Lang (2016), seeded by an (α,β)-approximation.
//! - [`KMeansPlusPlus`]: a bicriteria clustering oracle using D²-weighted
//!   seeding (Arthur and Vassilvitskii, 2007) plus a fixed number of
//!   relocation passes.
//!
//! Queries run [`LocalSearch`], a ball-growing k-median local search in the
//! style of Mettu and Plaxton, on the maintained summary only. Its O(n²)
//! pairwise precomputation is affordable precisely because n is the coreset
//! size, never the stream size.
//!
//! ## Determinism
//!
//! Every maintainer and oracle owns its random generator, seeded at
//! construction. Two instances built with the same seed and fed the same
//! update sequence produce identical summaries, which the property tests
//! rely on. Nothing in the crate touches a global RNG.
//!
//! ## Example
//!
//! ```
//! use dyn_coreset::{CoresetTree, DynamicClustering, LpNorm};
//!
//! let mut tree = CoresetTree::new(2, LpNorm::euclidean(), 50, 7);
//! tree.insert(0, vec![0.0, 0.0]);
//! tree.insert(1, vec![0.0, 0.1]);
//! tree.insert(2, vec![10.0, 0.0]);
//! let centers = tree.cluster();
//! assert_eq!(centers.len(), 2);
//! ```

pub mod bicriteria;
pub mod coreset;
pub mod dynamic;
pub mod layered;
pub mod local_search;
pub mod metric;
pub mod points;
pub mod stream;
pub mod tree;

pub use bicriteria::{Clustering, KMeansPlusPlus};
pub use coreset::CoresetBuilder;
pub use dynamic::DynamicClustering;
pub use layered::LayeredSampling;
pub use local_search::LocalSearch;
pub use metric::{LpNorm, Metric};
pub use points::{Key, WeightedSet};
pub use stream::{SlidingWindow, Update, UpdateStream};
pub use tree::CoresetTree;
