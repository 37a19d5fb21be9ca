//! Hierarchical risk parity.
//!
//! Instruments are clustered by rank-correlation distance, ordered so that
//! similar instruments sit next to each other, then the ordered list is
//! split in halves recursively with each half receiving risk in inverse
//! proportion to its variance. No covariance inversion is needed, so flat
//! or near-singular inputs still allocate.

use super::stats::{covariance_matrix, spearman, Matrix};
use super::{project_capped_simplex, within_bounds, ReturnMatrix};
use tracing::debug;

/// `d_ij = √((1 - ρ_ij) / 2)` over Spearman correlations.
pub fn distance_matrix(series: &[&[f64]]) -> Matrix {
    let n = series.len();
    let mut dist = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let rho = spearman(series[i], series[j]);
            let d = ((1.0 - rho) / 2.0).max(0.0).sqrt();
            dist[i][j] = d;
            dist[j][i] = d;
        }
    }
    dist
}

/// Single-linkage agglomeration; returns the leaf order of the final tree.
///
/// Equal distances merge the lowest-indexed pair first.
pub fn leaf_order(dist: &Matrix) -> Vec<usize> {
    let mut clusters: Vec<Vec<usize>> = (0..dist.len()).map(|i| vec![i]).collect();

    while clusters.len() > 1 {
        let mut best = (0, 1, f64::INFINITY);
        for a in 0..clusters.len() {
            for b in (a + 1)..clusters.len() {
                let d = clusters[a]
                    .iter()
                    .flat_map(|&i| clusters[b].iter().map(move |&j| (i, j)))
                    .map(|(i, j)| dist[i][j])
                    .fold(f64::INFINITY, f64::min);
                if d < best.2 {
                    best = (a, b, d);
                }
            }
        }
        let (a, b, _) = best;
        let right = clusters.remove(b);
        clusters[a].extend(right);
    }

    clusters.pop().unwrap_or_default()
}

/// Variance of the inverse-variance portfolio over `members`.
fn cluster_variance(cov: &Matrix, members: &[usize], variance_floor: f64) -> f64 {
    let inv: Vec<f64> = members
        .iter()
        .map(|&i| 1.0 / cov[i][i].max(variance_floor))
        .collect();
    let total: f64 = inv.iter().sum();
    let w: Vec<f64> = inv.iter().map(|x| x / total).collect();

    let mut var = 0.0;
    for (a, &i) in members.iter().enumerate() {
        for (b, &j) in members.iter().enumerate() {
            var += w[a] * w[b] * cov[i][j];
        }
    }
    var.max(0.0)
}

/// Recursive bisection of the ordered leaves.
fn bisect(cov: &Matrix, order: &[usize], variance_floor: f64) -> Vec<f64> {
    let mut weights = vec![1.0; cov.len()];
    let mut pending: Vec<&[usize]> = vec![order];

    while let Some(cluster) = pending.pop() {
        if cluster.len() < 2 {
            continue;
        }
        let (left, right) = cluster.split_at(cluster.len() / 2);
        let vl = cluster_variance(cov, left, variance_floor);
        let vr = cluster_variance(cov, right, variance_floor);

        let alpha = if vl + vr <= variance_floor {
            left.len() as f64 / cluster.len() as f64
        } else {
            1.0 - vl / (vl + vr)
        };

        for &i in left {
            weights[i] *= alpha;
        }
        for &i in right {
            weights[i] *= 1.0 - alpha;
        }
        pending.push(right);
        pending.push(left);
    }
    weights
}

pub fn optimize(matrix: &ReturnMatrix<'_>, variance_floor: f64) -> Vec<f64> {
    let cov = covariance_matrix(&matrix.series);
    let order = leaf_order(&distance_matrix(&matrix.series));
    let raw = bisect(&cov, &order, variance_floor);

    debug!(?order, "hrp leaf order");

    if within_bounds(&raw, &matrix.bounds) {
        raw
    } else {
        project_capped_simplex(&raw, &matrix.bounds)
    }
}
