//! Alpha/beta decomposition
//!
//! Ordinary least squares of wallet returns on benchmark returns. Beta is the
//! market-following part of performance, alpha the idiosyncratic part.

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AnalysisResult};
use crate::models::{AlignedReturns, DegenerateInput, Metric, RegressionResult};
use crate::stats::{compound, covariance, mean, VARIANCE_EPSILON};

pub struct AlphaBetaDecomposer<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> AlphaBetaDecomposer<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn decompose(&self, aligned: &AlignedReturns) -> AnalysisResult<RegressionResult> {
        let (wallet, benchmark) = aligned.pairs();
        let n = wallet.len();
        if n < 2 {
            return Err(AnalysisError::InsufficientData(format!(
                "regression needs at least 2 observations, got {}",
                n
            )));
        }

        let mean_wallet = mean(&wallet);
        let mean_benchmark = mean(&benchmark);
        let var_benchmark = covariance(&benchmark, &benchmark);

        let degenerate_regression = var_benchmark <= VARIANCE_EPSILON;
        let (alpha, beta, r_squared) = if degenerate_regression {
            tracing::warn!(variance = var_benchmark, "Flat benchmark, beta forced to 0");
            (mean_wallet, 0.0, Metric::Undefined)
        } else {
            let beta = covariance(&wallet, &benchmark) / var_benchmark;
            let alpha = mean_wallet - beta * mean_benchmark;
            (alpha, beta, r_squared(&wallet, &benchmark, alpha, beta, mean_wallet))
        };

        let total_return = compound(&wallet);
        let benchmark_return = compound(&benchmark);
        let beta_contribution = beta * benchmark_return;
        let alpha_contribution = total_return - beta_contribution;

        let tolerance = self.config.zero_return_tolerance;
        let (alpha_share, beta_share, shares_clipped) = if total_return.abs() <= tolerance {
            (Metric::Undefined, Metric::Undefined, false)
        } else {
            let raw_alpha = alpha_contribution / total_return;
            let raw_beta = beta_contribution / total_return;
            let alpha_share = raw_alpha.clamp(0.0, 1.0);
            let beta_share = raw_beta.clamp(0.0, 1.0);
            let clipped = alpha_share != raw_alpha || beta_share != raw_beta;
            (
                Metric::from_f64(alpha_share),
                Metric::from_f64(beta_share),
                clipped,
            )
        };

        tracing::debug!(
            alpha,
            beta,
            observations = n,
            degenerate_regression,
            "Decomposed wallet returns"
        );

        Ok(RegressionResult {
            alpha,
            alpha_annualized: alpha * f64::from(self.config.periods_per_year),
            beta,
            r_squared,
            alpha_share,
            beta_share,
            alpha_contribution,
            beta_contribution,
            total_return,
            benchmark_return,
            observations: n,
            degenerate_regression,
            shares_clipped,
        })
    }
}

/// One minus residual over total sum of squares, clamped to [0, 1].
fn r_squared(wallet: &[f64], benchmark: &[f64], alpha: f64, beta: f64, mean_wallet: f64) -> Metric {
    let ss_tot: f64 = wallet.iter().map(|w| (w - mean_wallet).powi(2)).sum();
    if ss_tot <= VARIANCE_EPSILON {
        return Metric::Undefined;
    }
    let ss_res: f64 = wallet
        .iter()
        .zip(benchmark)
        .map(|(w, b)| (w - alpha - beta * b).powi(2))
        .sum();
    Metric::from_f64(1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
}

impl RegressionResult {
    pub fn degeneracies(&self) -> Vec<DegenerateInput> {
        let mut found = Vec::new();
        if self.degenerate_regression {
            found.push(DegenerateInput::FlatBenchmark);
        }
        if !self.alpha_share.is_defined() {
            found.push(DegenerateInput::ZeroTotalReturn);
        }
        found
    }
}
