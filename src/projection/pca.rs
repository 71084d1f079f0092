//! Standardization and principal component analysis.
//!
//! Both transforms are fit on the exact matrix they are applied to; nothing
//! is carried between calls. PCA works on the n x n Gram matrix rather than
//! the d x d covariance, since a visualization has a few dozen points but
//! embeddings have hundreds of dimensions.

use std::cmp::Ordering;

use ndarray::{Array1, Array2, Axis};

/// Jacobi sweeps before giving up on convergence. Symmetric matrices of the
/// sizes seen here converge in well under 20.
const MAX_SWEEPS: usize = 100;

/// Off-diagonal mass, relative to the whole matrix, treated as converged.
const CONVERGENCE: f64 = 1e-24;

/// Eigenvalues below this fraction of the total variance are rank noise.
const EIGEN_FLOOR: f64 = 1e-12;

/// Center each column and scale it to unit population variance.
///
/// A column whose values are all equal has no spread to scale by; every
/// entry in it becomes exactly `0.0`.
pub fn standardize(data: &Array2<f64>) -> Array2<f64> {
    let (n, d) = data.dim();
    let mut out = Array2::<f64>::zeros((n, d));
    if n == 0 {
        return out;
    }

    for j in 0..d {
        let col = data.column(j);
        let first = col[0];
        if col.iter().all(|&x| x == first) {
            continue;
        }

        let mean = col.sum() / n as f64;
        let variance = col.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
        let std = variance.sqrt();
        if std == 0.0 || !std.is_finite() {
            continue;
        }

        for i in 0..n {
            out[[i, j]] = (col[i] - mean) / std;
        }
    }
    out
}

/// Project the rows of `data` onto its first `k` principal components.
///
/// Returns an `n x k` score matrix. Components beyond the rank of the data
/// are all zeros. Each component's sign is fixed so that its largest-magnitude
/// score is positive.
pub fn principal_components(data: &Array2<f64>, k: usize) -> Array2<f64> {
    let (n, d) = data.dim();
    let mut scores = Array2::<f64>::zeros((n, k));
    if n == 0 {
        return scores;
    }

    let means = data.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(d));
    let centered = data - &means;
    let gram = centered.dot(&centered.t());

    let (values, vectors) = symmetric_eigen(gram);
    let total: f64 = values.iter().filter(|v| **v > 0.0).sum();
    let floor = EIGEN_FLOOR * total.max(f64::MIN_POSITIVE);

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[b].partial_cmp(&values[a]).unwrap_or(Ordering::Equal));

    for (component, &idx) in order.iter().take(k).enumerate() {
        let lambda = values[idx];
        if lambda <= floor {
            continue;
        }
        let singular = lambda.sqrt();
        let u = vectors.column(idx);

        let pivot = u
            .iter()
            .copied()
            .fold(0.0f64, |acc, x| if x.abs() > acc.abs() { x } else { acc });
        let sign = if pivot < 0.0 { -1.0 } else { 1.0 };

        for i in 0..n {
            scores[[i, component]] = sign * u[i] * singular;
        }
    }
    scores
}

/// Eigen-decomposition of a real symmetric matrix by cyclic Jacobi rotations.
///
/// Returns `(eigenvalues, eigenvectors)` with eigenvector `i` in column `i`.
/// Order is unspecified.
fn symmetric_eigen(mut a: Array2<f64>) -> (Array1<f64>, Array2<f64>) {
    let n = a.nrows();
    let mut v = Array2::<f64>::eye(n);

    let total: f64 = a.iter().map(|x| x * x).sum();
    if total == 0.0 {
        return (Array1::zeros(n), v);
    }

    for _ in 0..MAX_SWEEPS {
        let mut off = 0.0;
        for p in 0..n {
            for q in 0..n {
                if p != q {
                    off += a[[p, q]] * a[[p, q]];
                }
            }
        }
        if off <= CONVERGENCE * total {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a[[p, q]];
                if apq == 0.0 {
                    continue;
                }

                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                // A <- A J
                for r in 0..n {
                    let arp = a[[r, p]];
                    let arq = a[[r, q]];
                    a[[r, p]] = c * arp - s * arq;
                    a[[r, q]] = s * arp + c * arq;
                }
                // A <- J^T A
                for r in 0..n {
                    let apr = a[[p, r]];
                    let aqr = a[[q, r]];
                    a[[p, r]] = c * apr - s * aqr;
                    a[[q, r]] = s * apr + c * aqr;
                }
                // V <- V J
                for r in 0..n {
                    let vrp = v[[r, p]];
                    let vrq = v[[r, q]];
                    v[[r, p]] = c * vrp - s * vrq;
                    v[[r, q]] = s * vrp + c * vrq;
                }
            }
        }
    }

    (a.diag().to_owned(), v)
}
