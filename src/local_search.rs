//! Local-search k-median oracle.
//!
//! Greedy "maximum-value isolated ball" median selection in the style of
//! Mettu and Plaxton: every round picks the point whose ball best trades
//! contained weight against radius, shrinking and recentering the ball among
//! the candidate's distance-sorted neighbours until it cannot be improved.
//! After k medians are chosen the raw solution is polished with two
//! relocation passes of the bicriteria oracle seeded with those medians.
//!
//! Precomputation builds the full pairwise distance matrix, sorted rows and
//! prefix sums, so a solve takes O(n²) space and O(n² log n) time. That is
//! acceptable only because this oracle runs on the maintained coreset, never
//! on the stream.

use crate::bicriteria::KMeansPlusPlus;
use crate::metric::Metric;
use crate::points::{Key, WeightedSet};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// The ball-growing local-search k-median solver.
pub struct LocalSearch {
    k: usize,
    rng: StdRng,
    cost: f64,
}

// Shrink factor and derived constants of the ball-growing recursion.
const ALPHA: f64 = 3.732050807568877; // 2 + sqrt(3)

fn beta() -> f64 {
    (ALPHA - 1.0) / (ALPHA - 2.0)
}

fn gamma() -> f64 {
    ALPHA * (1.0 + ALPHA) / (ALPHA - 2.0)
}

// Index of the last entry <= r in an ascending row, or -1.
fn last_within(row: &[f64], r: f64) -> isize {
    row.partition_point(|&d| d <= r) as isize - 1
}

// Pairwise structures for one solve: rows of neighbour indices sorted by
// distance, the matching distances, and prefix sums of weight and
// weight*distance for O(log n) ball evaluations.
struct Neighbourhoods {
    idx: Vec<Vec<usize>>,
    dist: Vec<Vec<f64>>,
    acc_w: Vec<Vec<f64>>,
    acc_wd: Vec<Vec<f64>>,
}

impl Neighbourhoods {
    fn build(metric: &dyn Metric, input: &WeightedSet) -> Self {
        let n = input.len();
        let mut idx = Vec::with_capacity(n);
        let mut dist = Vec::with_capacity(n);
        let mut acc_w = Vec::with_capacity(n);
        let mut acc_wd = Vec::with_capacity(n);

        for i in 0..n {
            let mut row: Vec<(f64, usize)> = (0..n)
                .map(|j| (metric.d(input.point(i), input.point(j)), j))
                .collect();
            row.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

            let mut w_sum = 0.0;
            let mut wd_sum = 0.0;
            let mut row_w = Vec::with_capacity(n);
            let mut row_wd = Vec::with_capacity(n);
            for &(d, j) in &row {
                w_sum += input.weight(j);
                wd_sum += d * input.weight(j);
                row_w.push(w_sum);
                row_wd.push(wd_sum);
            }

            idx.push(row.iter().map(|&(_, j)| j).collect());
            dist.push(row.iter().map(|&(d, _)| d).collect());
            acc_w.push(row_w);
            acc_wd.push(row_wd);
        }

        Self {
            idx,
            dist,
            acc_w,
            acc_wd,
        }
    }

    // Value of the ball around point i with radius r: r times the weight it
    // contains, minus the summed weighted distances to its members.
    fn ball_value(&self, i: usize, r: f64) -> f64 {
        let j = last_within(&self.dist[i], r).max(0) as usize;
        r * self.acc_w[i][j] - self.acc_wd[i][j]
    }
}

impl LocalSearch {
    pub fn new(k: usize, seed: u64) -> Self {
        Self {
            k,
            rng: StdRng::seed_from_u64(seed),
            cost: 0.0,
        }
    }

    /// Summed weighted distance to the nearest chosen median, as measured by
    /// the greedy phase of the most recent [`cluster`](Self::cluster) call.
    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Solve k-median on `input` and return the chosen center keys.
    pub fn cluster(&mut self, metric: &dyn Metric, input: &WeightedSet) -> BTreeSet<Key> {
        let n = input.len();
        self.cost = 0.0;

        if n == 0 {
            return BTreeSet::new();
        }

        if n <= self.k {
            return input.keys().iter().copied().collect();
        }

        let hoods = Neighbourhoods::build(metric, input);

        let mut medians: Vec<usize> = Vec::with_capacity(self.k);
        let mut is_median = vec![false; n];
        let mut dist_from_medians = vec![f64::INFINITY; n];

        while medians.len() < self.k {
            let next = Self::find_next_median(&hoods, &is_median, &dist_from_medians, n);
            is_median[next] = true;
            medians.push(next);

            for j in 0..n {
                let d = metric.d(input.point(j), input.point(next));
                if d < dist_from_medians[j] {
                    dist_from_medians[j] = d;
                }
            }
        }

        self.cost = (0..n).map(|j| dist_from_medians[j] * input.weight(j)).sum();

        // polish with two relocation passes seeded by the greedy medians
        let prior: Vec<Vec<f64>> = medians.iter().map(|&i| input.point(i).to_vec()).collect();
        let mut oracle = KMeansPlusPlus::new(self.k, self.rng.gen());
        oracle
            .cluster(metric, input, Some(&prior))
            .center_keys(input)
    }

    // One round of the greedy selection: start from the best isolated ball,
    // then repeatedly recenter on the best child ball at radius r/alpha
    // until the ball contains a single point.
    fn find_next_median(
        hoods: &Neighbourhoods,
        is_median: &[bool],
        dist_from_medians: &[f64],
        n: usize,
    ) -> usize {
        let (mut i, mut r) = Self::max_value_isolated(hoods, is_median, dist_from_medians, n);

        let mut j = last_within(&hoods.dist[i], beta() * r);
        while j > 0 {
            let (ci, cr) = Self::max_value_child(hoods, i, r, j as usize);
            i = ci;
            r = cr;

            j = last_within(&hoods.dist[i], beta() * r);

            // duplicate points all sit at radius zero
            if r == 0.0 && j > 0 {
                j = 0;
            }
        }

        i
    }

    // The non-median point whose isolated ball has the highest value.
    fn max_value_isolated(
        hoods: &Neighbourhoods,
        is_median: &[bool],
        dist_from_medians: &[f64],
        n: usize,
    ) -> (usize, f64) {
        let any_median = is_median.iter().any(|&b| b);

        let mut best = (0, 0.0);
        let mut best_value = f64::NEG_INFINITY;

        for j in 0..n {
            if is_median[j] {
                continue;
            }

            // with no medians yet the whole space is the isolated ball
            let r = if any_median {
                dist_from_medians[j] / gamma()
            } else {
                hoods.dist[j][n - 1]
            };

            let value = hoods.ball_value(j, r);
            if value >= best_value {
                best_value = value;
                best = (j, r);
            }
        }

        best
    }

    // Best ball of radius r/alpha centered on one of the l+1 nearest
    // neighbours of i.
    fn max_value_child(hoods: &Neighbourhoods, i: usize, r: f64, l: usize) -> (usize, f64) {
        let shrunk = r / ALPHA;

        let mut best = (i, shrunk);
        let mut best_value = f64::NEG_INFINITY;

        for j in 0..=l {
            let candidate = hoods.idx[i][j];
            let value = hoods.ball_value(candidate, shrunk);
            if value >= best_value {
                best_value = value;
                best = (candidate, shrunk);
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::LpNorm;

    fn uniform(points: Vec<Vec<f64>>) -> WeightedSet {
        let mut set = WeightedSet::new();
        for (i, p) in points.into_iter().enumerate() {
            set.push(i as Key, p, 1.0);
        }
        set
    }

    #[test]
    fn test_empty_input() {
        let mut solver = LocalSearch::new(3, 0);
        assert!(solver.cluster(&LpNorm::euclidean(), &WeightedSet::new()).is_empty());
        assert_eq!(solver.cost(), 0.0);
    }

    #[test]
    fn test_at_most_k_points_returns_all() {
        let input = uniform(vec![vec![0.0, 0.0], vec![4.0, 4.0], vec![9.0, 1.0]]);
        let mut solver = LocalSearch::new(5, 0);
        let centers = solver.cluster(&LpNorm::euclidean(), &input);

        assert_eq!(centers.len(), 3);
        assert_eq!(solver.cost(), 0.0);
    }

    #[test]
    fn test_two_separated_groups() {
        let input = uniform(vec![
            vec![0.0, 0.0],
            vec![0.0, 0.1],
            vec![0.1, 0.0],
            vec![10.0, 0.0],
            vec![10.0, 0.1],
            vec![10.1, 0.0],
        ]);
        let mut solver = LocalSearch::new(2, 17);
        let centers = solver.cluster(&LpNorm::euclidean(), &input);

        assert_eq!(centers.len(), 2);
        assert_eq!(centers.iter().filter(|&&k| k < 3).count(), 1);
        assert_eq!(centers.iter().filter(|&&k| k >= 3).count(), 1);
        assert!(solver.cost() > 0.0);
        assert!(solver.cost() < 1.0, "greedy cost {} should stay within the groups", solver.cost());
    }

    #[test]
    fn test_weight_pulls_the_median() {
        // a single heavy point must end up covered by a center exactly on it
        let mut input = WeightedSet::new();
        input.push(0, vec![0.0], 100.0);
        input.push(1, vec![0.5], 1.0);
        input.push(2, vec![20.0], 1.0);
        input.push(3, vec![20.5], 1.0);

        let mut solver = LocalSearch::new(2, 5);
        let centers = solver.cluster(&LpNorm::euclidean(), &input);

        assert!(centers.contains(&0), "heavy point not chosen: {:?}", centers);
    }

    #[test]
    fn test_duplicate_points() {
        let input = uniform(vec![
            vec![1.0, 1.0],
            vec![1.0, 1.0],
            vec![1.0, 1.0],
            vec![6.0, 6.0],
        ]);
        let mut solver = LocalSearch::new(2, 23);
        let centers = solver.cluster(&LpNorm::euclidean(), &input);

        assert_eq!(centers.len(), 2);
        assert!(centers.contains(&3));
    }
}
