//! Balanced coreset tree maintainer.
//!
//! Leaves hold the live points and form a cyclic doubly linked list; every
//! internal node keeps a coreset of the union of its children's outputs.
//! Insertion always splits the leaf at the current insertion point, which
//! walks round the leaf cycle, so the tree stays balanced without
//! rotations. Deletion removes the leaf *preceding* the insertion point and
//! relabels it with the doomed key's data when the two differ, so only two
//! root paths ever need recomputation per update.
//!
//! A lazy refresher walks the leaf cycle two leaves per update and
//! recomputes their root paths, bounding the staleness of every inner
//! coreset; its phase length and the inner sample parameters are derived
//! from a capacity estimate np that is reset to 4n at every phase change.
//!
//! Nodes live in an arena indexed by `NodeId`, with a free list for slots
//! released by deletions.

use crate::coreset::CoresetBuilder;
use crate::dynamic::DynamicClustering;
use crate::local_search::LocalSearch;
use crate::metric::Metric;
use crate::points::{Key, WeightedSet};
use log::trace;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, BTreeSet};

type NodeId = usize;

struct LeafNode {
    key: Key,
    point: Vec<f64>,
    weight: f64,
    // cyclic neighbours in the leaf list
    next: NodeId,
    last: NodeId,
}

struct InternalNode {
    left: NodeId,
    right: NodeId,
    core: CoresetBuilder,
}

enum NodeBody {
    Leaf(LeafNode),
    Internal(InternalNode),
}

struct Node {
    parent: Option<NodeId>,
    body: NodeBody,
}

/// Dynamic coreset maintainer based on a balanced binary tree of coresets.
pub struct CoresetTree<M> {
    metric: M,
    k: usize,
    m: usize,
    epsilon: f64,
    nodes: Vec<Node>,
    free: Vec<NodeId>,
    root: Option<NodeId>,
    insertion_point: Option<NodeId>,
    refresh_pointer: Option<NodeId>,
    leaf_finder: BTreeMap<Key, NodeId>,
    n: usize,
    np: usize,
    phase_counter: i64,
    outer: CoresetBuilder,
    out: WeightedSet,
    rng: StdRng,
}

impl<M: Metric> CoresetTree<M> {
    /// A tree whose inner and outer coresets hold at most `max(m, k)` points.
    pub fn new(k: usize, metric: M, m: usize, seed: u64) -> Self {
        Self::with_epsilon(k, metric, m, 0.0, seed)
    }

    pub fn with_epsilon(k: usize, metric: M, m: usize, epsilon: f64, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let outer = CoresetBuilder::new(k, m, rng.gen());
        Self {
            metric,
            k,
            m,
            epsilon,
            nodes: Vec::new(),
            free: Vec::new(),
            root: None,
            insertion_point: None,
            refresh_pointer: None,
            leaf_finder: BTreeMap::new(),
            n: 0,
            np: 0,
            phase_counter: 0,
            outer,
            out: WeightedSet::new(),
            rng,
        }
    }

    /// Number of live points.
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Height of the tree, counting the root level.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut walk = self.root;
        while let Some(id) = walk {
            depth += 1;
            walk = match &self.nodes[id].body {
                NodeBody::Leaf(_) => None,
                NodeBody::Internal(node) => Some(node.left),
            };
        }
        depth
    }

    /// Keys in leaf-cycle order, starting at the insertion point.
    pub fn leaf_keys(&self) -> Vec<Key> {
        let mut keys = Vec::with_capacity(self.n);
        let Some(start) = self.insertion_point else {
            return keys;
        };
        let mut walk = start;
        loop {
            let leaf = self.leaf(walk);
            keys.push(leaf.key);
            walk = leaf.next;
            if walk == start {
                break;
            }
        }
        keys
    }

    /// The maintained outer coreset.
    pub fn coreset(&self) -> &WeightedSet {
        &self.out
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id] = node;
                id
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, id: NodeId) {
        self.free.push(id);
    }

    fn leaf(&self, id: NodeId) -> &LeafNode {
        match &self.nodes[id].body {
            NodeBody::Leaf(leaf) => leaf,
            NodeBody::Internal(_) => unreachable!("leaf id {} points at an internal node", id),
        }
    }

    fn leaf_mut(&mut self, id: NodeId) -> &mut LeafNode {
        match &mut self.nodes[id].body {
            NodeBody::Leaf(leaf) => leaf,
            NodeBody::Internal(_) => unreachable!("leaf id {} points at an internal node", id),
        }
    }

    fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) {
        match &mut self.nodes[parent].body {
            NodeBody::Internal(node) => {
                if node.left == old {
                    node.left = new;
                } else {
                    node.right = new;
                }
            }
            NodeBody::Leaf(_) => unreachable!("parent id {} points at a leaf", parent),
        }
    }

    // Sample parameters of the inner coresets, tied to the capacity
    // estimate of the current phase.
    fn inner_lambda(&self) -> f64 {
        1.0 / (2.0 * ((self.np * self.np) as f64 + 1.0))
    }

    fn inner_epsilon(&self) -> f64 {
        if self.np > 1 {
            self.epsilon / (6.0 * (self.np as f64).ln())
        } else {
            self.epsilon
        }
    }

    // Coreset output of a node: a leaf contributes its own point, an
    // internal node its cached coreset.
    fn node_output(&self, id: NodeId) -> WeightedSet {
        match &self.nodes[id].body {
            NodeBody::Leaf(leaf) => {
                let mut set = WeightedSet::with_capacity(1);
                set.push(leaf.key, leaf.point.clone(), leaf.weight);
                set
            }
            NodeBody::Internal(node) => node.core.output().clone(),
        }
    }

    // Rebuild the coreset of one internal node from its children.
    fn recompute(&mut self, id: NodeId) {
        let (left, right) = match &self.nodes[id].body {
            NodeBody::Internal(node) => (node.left, node.right),
            NodeBody::Leaf(_) => return,
        };

        let mut union = self.node_output(left);
        union.extend_from(&self.node_output(right));

        let lambda = self.inner_lambda();
        let epsilon = self.inner_epsilon();

        let metric = &self.metric;
        match &mut self.nodes[id].body {
            NodeBody::Internal(node) => node.core.construct(metric, &union, lambda, epsilon),
            NodeBody::Leaf(_) => unreachable!(),
        }
    }

    // Recompute every internal node from `id` up to the root.
    fn recompute_upwards(&mut self, id: NodeId) {
        let mut walk = Some(id);
        while let Some(current) = walk {
            self.recompute(current);
            walk = self.nodes[current].parent;
        }
    }

    // Rebuild the outer coreset from the root's output.
    fn refresh_output(&mut self) {
        let Some(root) = self.root else {
            self.out = WeightedSet::new();
            return;
        };
        let lambda = 1.0 / (self.n as f64 + 1.0);
        let input = self.node_output(root);
        self.outer.construct(&self.metric, &input, lambda, self.epsilon);
        self.out = self.outer.output().clone();
    }

    // Advance the lazy refresher by one update's worth of work: start a new
    // phase if the old one ended, then recompute the root paths of the next
    // two leaves on the cycle.
    fn refresher(&mut self) {
        self.phase_counter -= 1;

        if self.phase_counter <= 0 {
            self.np = 4 * self.n.max(1);
            self.phase_counter = (self.n / 2) as i64;
            self.refresh_pointer = self.insertion_point;
            trace!("refresher phase reset: np {} length {}", self.np, self.phase_counter);
        }

        if self.phase_counter <= 0 {
            return;
        }

        for _ in 0..2 {
            let Some(ptr) = self.refresh_pointer else {
                return;
            };
            self.recompute_upwards(ptr);
            self.refresh_pointer = Some(self.leaf(ptr).next);
        }
    }
}

impl<M: Metric> DynamicClustering for CoresetTree<M> {
    fn insert(&mut self, key: Key, point: Vec<f64>) {
        self.refresher();

        if self.leaf_finder.contains_key(&key) {
            return;
        }

        let Some(ip) = self.insertion_point else {
            // first point: a single self-cyclic leaf is the whole tree
            let leaf = self.alloc(Node {
                parent: None,
                body: NodeBody::Leaf(LeafNode {
                    key,
                    point,
                    weight: 1.0,
                    next: 0,
                    last: 0,
                }),
            });
            let slot = self.leaf_mut(leaf);
            slot.next = leaf;
            slot.last = leaf;

            self.root = Some(leaf);
            self.insertion_point = Some(leaf);
            self.refresh_pointer = Some(leaf);
            self.leaf_finder.insert(key, leaf);
            self.n = 1;
            self.refresh_output();
            return;
        };

        // split the insertion point: the old leaf and the new one become
        // the children of a fresh internal node in the old leaf's place
        let ip_next = self.leaf(ip).next;
        let parent = self.nodes[ip].parent;

        let fresh = self.alloc(Node {
            parent: None,
            body: NodeBody::Leaf(LeafNode {
                key,
                point,
                weight: 1.0,
                next: ip_next,
                last: ip,
            }),
        });

        let core = CoresetBuilder::new(self.k, self.m, self.rng.gen());
        let internal = self.alloc(Node {
            parent,
            body: NodeBody::Internal(InternalNode {
                left: ip,
                right: fresh,
                core,
            }),
        });

        self.nodes[ip].parent = Some(internal);
        self.nodes[fresh].parent = Some(internal);
        self.leaf_mut(ip).next = fresh;
        self.leaf_mut(ip_next).last = fresh;

        match parent {
            Some(p) => self.replace_child(p, ip, internal),
            None => self.root = Some(internal),
        }

        self.leaf_finder.insert(key, fresh);
        self.n += 1;

        self.recompute_upwards(internal);

        // the insertion point moves on past the pair just split
        self.insertion_point = Some(self.leaf(fresh).next);

        self.refresh_output();
    }

    fn delete(&mut self, key: Key) {
        self.refresher();

        if !self.leaf_finder.contains_key(&key) {
            return;
        }

        if self.n == 1 {
            self.nodes.clear();
            self.free.clear();
            self.root = None;
            self.insertion_point = None;
            self.refresh_pointer = None;
            self.leaf_finder.clear();
            self.n = 0;
            self.refresh_output();
            return;
        }

        // physically remove the leaf before the insertion point, then give
        // its payload to the leaf that held the doomed key
        let ip = self.insertion_point.unwrap_or_default();
        let dead = self.leaf(ip).last;
        let dead_next = self.leaf(dead).next;
        let dead_last = self.leaf(dead).last;
        let parent = self.nodes[dead].parent.unwrap_or_default();

        let sibling = match &self.nodes[parent].body {
            NodeBody::Internal(node) => {
                if node.left == dead {
                    node.right
                } else {
                    node.left
                }
            }
            NodeBody::Leaf(_) => unreachable!("leaf {} has a leaf parent", dead),
        };

        // unlink from the cycle
        self.leaf_mut(dead_last).next = dead_next;
        self.leaf_mut(dead_next).last = dead_last;

        // the sibling takes the parent's place
        let grand = self.nodes[parent].parent;
        self.nodes[sibling].parent = grand;
        match grand {
            Some(g) => self.replace_child(g, parent, sibling),
            None => self.root = Some(sibling),
        }

        if self.refresh_pointer == Some(dead) {
            self.refresh_pointer = Some(dead_next);
        }

        let (dead_key, dead_point, dead_weight) = {
            let leaf = self.leaf(dead);
            (leaf.key, leaf.point.clone(), leaf.weight)
        };
        self.leaf_finder.remove(&dead_key);
        self.release(dead);
        self.release(parent);
        self.n -= 1;

        self.recompute_upwards(sibling);
        self.insertion_point = Some(dead_last);

        if dead_key != key {
            // relabel: the doomed key's leaf takes over the removed payload
            let target = self.leaf_finder[&key];
            {
                let leaf = self.leaf_mut(target);
                leaf.key = dead_key;
                leaf.point = dead_point;
                leaf.weight = dead_weight;
            }
            self.leaf_finder.insert(dead_key, target);
            self.leaf_finder.remove(&key);
            self.recompute_upwards(target);
        }

        self.refresh_output();
    }

    fn cluster(&mut self) -> BTreeSet<Key> {
        let mut solver = LocalSearch::new(self.k, self.rng.gen());
        solver.cluster(&self.metric, &self.out)
    }

    fn name(&self) -> String {
        format!("tree_k{}_m{}", self.k, self.m)
    }
}
