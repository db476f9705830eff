//! Small descriptive-statistics helpers shared by the analysis components.

/// Variances at or below this are treated as zero.
pub(crate) const VARIANCE_EPSILON: f64 = 1e-18;

/// Absolute P&L sums at or below this are treated as zero.
pub(crate) const PNL_EPSILON: f64 = 1e-9;

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample covariance (n - 1 denominator).
///
/// `covariance(x, x)` is the sample variance; computing both through this one
/// function keeps identical inputs bit-identical.
pub(crate) fn covariance(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return 0.0;
    }
    let mean_x = mean(&x[..n]);
    let mean_y = mean(&y[..n]);
    let sum: f64 = x[..n]
        .iter()
        .zip(&y[..n])
        .map(|(a, b)| (a - mean_x) * (b - mean_y))
        .sum();
    sum / (n - 1) as f64
}

pub(crate) fn variance(values: &[f64]) -> f64 {
    covariance(values, values)
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    variance(values).max(0.0).sqrt()
}

/// Compounded return of a sequence of periodic returns.
pub(crate) fn compound(returns: &[f64]) -> f64 {
    returns.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0
}
