//! Metric space abstractions.
//!
//! Every component in the crate measures distances through the [`Metric`]
//! trait, so the maintainers work for any distance function over fixed-length
//! coordinate vectors. The stock implementation is the Lp-norm with an
//! optional additive jitter used to break exact ties (duplicate points would
//! otherwise produce degenerate zero-radius clusters in the sampling steps).

/// A distance function over equal-length coordinate vectors.
///
/// Implementations must be symmetric and non-negative. Dimension mismatch is
/// signalled by the 0.0 sentinel rather than a panic, keeping the hot
/// assignment loops branch-light; callers are expected to validate dimensions
/// where vectors first enter a structure.
pub trait Metric {
    fn d(&self, x: &[f64], y: &[f64]) -> f64;
}

/// The Lp-norm on R^d, with an optional jitter constant added to every
/// distance.
#[derive(Clone, Copy, Debug)]
pub struct LpNorm {
    p: u32,
    jitter: f64,
}

impl LpNorm {
    pub fn new(p: u32) -> Self {
        Self { p, jitter: 0.0 }
    }

    /// Lp-norm shifted by a small constant. A jitter of roughly 1/n keeps
    /// every pairwise distance strictly positive without perturbing the
    /// clustering cost noticeably.
    pub fn with_jitter(p: u32, jitter: f64) -> Self {
        Self { p, jitter }
    }

    pub fn euclidean() -> Self {
        Self::new(2)
    }
}

impl Metric for LpNorm {
    fn d(&self, x: &[f64], y: &[f64]) -> f64 {
        if x.len() != y.len() {
            return 0.0;
        }

        let sum: f64 = x
            .iter()
            .zip(y.iter())
            .map(|(a, b)| (a - b).abs().powi(self.p as i32))
            .sum();

        sum.powf(1.0 / self.p as f64) + self.jitter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_euclidean_distance() {
        let metric = LpNorm::euclidean();
        assert_relative_eq!(metric.d(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
    }

    #[test]
    fn test_l1_distance() {
        let metric = LpNorm::new(1);
        assert_relative_eq!(metric.d(&[1.0, 2.0], &[4.0, -2.0]), 7.0);
    }

    #[test]
    fn test_symmetry() {
        let metric = LpNorm::euclidean();
        let x = [1.0, -2.5, 0.25];
        let y = [-3.0, 4.0, 1.75];
        assert_relative_eq!(metric.d(&x, &y), metric.d(&y, &x));
    }

    #[test]
    fn test_dimension_mismatch_sentinel() {
        let metric = LpNorm::euclidean();
        assert_eq!(metric.d(&[1.0, 2.0], &[1.0]), 0.0);
    }

    #[test]
    fn test_jitter_breaks_ties() {
        let metric = LpNorm::with_jitter(2, 0.01);
        let p = [2.0, 2.0];
        assert_relative_eq!(metric.d(&p, &p), 0.01);
        assert_relative_eq!(metric.d(&[0.0, 0.0], &[3.0, 4.0]), 5.01);
    }
}
