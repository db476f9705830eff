//! Risk-adjusted performance metrics
//!
//! Return-based statistics come from the wallet return series, trade-level
//! statistics from the closing trades of the ledger. Every ratio with a zero
//! denominator is reported through `Metric`, never as `NaN` or `inf`.

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AnalysisResult};
use crate::ledger::closing_trades;
use crate::models::{DegenerateInput, EquityPoint, Metric, ReturnSeries, RiskMetrics, Trade};
use crate::stats::{compound, mean, std_dev, variance, PNL_EPSILON, VARIANCE_EPSILON};

pub struct RiskMetricsCalculator<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> RiskMetricsCalculator<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn calculate(&self, returns: &ReturnSeries, trades: &[Trade]) -> AnalysisResult<RiskMetrics> {
        let observed = returns.observed();
        if observed.len() < 2 {
            return Err(AnalysisError::InsufficientData(format!(
                "risk metrics need at least 2 observed returns, got {}",
                observed.len()
            )));
        }

        let periods = f64::from(self.config.periods_per_year);
        let max_drawdown = max_drawdown(&observed);
        let annual_return = annual_return(&observed, periods);

        let pnls: Vec<f64> = closing_trades(trades).map(Trade::pnl).collect();
        let (max_win_streak, max_loss_streak) = streaks(&pnls);

        let metrics = RiskMetrics {
            sharpe_ratio: self.sharpe_ratio(&observed),
            sortino_ratio: self.sortino_ratio(&observed),
            max_drawdown,
            calmar_ratio: calmar_ratio(annual_return, max_drawdown),
            annual_return,
            annual_volatility: std_dev(&observed) * periods.sqrt(),
            expected_return: mean(&observed),
            profit_factor: profit_factor(&pnls),
            win_rate: win_rate(&pnls),
            largest_single_trade_contribution_pct: largest_contribution(&pnls),
            max_win_streak,
            max_loss_streak,
        };

        tracing::debug!(
            sharpe = ?metrics.sharpe_ratio,
            max_drawdown,
            closing_trades = pnls.len(),
            "Computed risk metrics"
        );

        Ok(metrics)
    }

    /// Annualized mean excess return over sample standard deviation.
    pub fn sharpe_ratio(&self, returns: &[f64]) -> Metric {
        if returns.len() < 2 || variance(returns) <= VARIANCE_EPSILON {
            return Metric::Undefined;
        }
        let excess = mean(returns) - self.config.risk_free_rate_per_period;
        Metric::from_f64(excess / std_dev(returns) * f64::from(self.config.periods_per_year).sqrt())
    }

    /// Like Sharpe, but only returns below the risk-free rate count as risk.
    pub fn sortino_ratio(&self, returns: &[f64]) -> Metric {
        if returns.is_empty() {
            return Metric::Undefined;
        }
        let rf = self.config.risk_free_rate_per_period;
        let downside_sq: f64 = returns
            .iter()
            .map(|r| (r - rf).min(0.0).powi(2))
            .sum::<f64>()
            / returns.len() as f64;
        let excess = mean(returns) - rf;
        if downside_sq <= VARIANCE_EPSILON {
            return Metric::ratio(excess, 0.0, 0.0);
        }
        Metric::from_f64(excess / downside_sq.sqrt() * f64::from(self.config.periods_per_year).sqrt())
    }
}

/// Compounded equity from 1.0; missing periods carry the previous value.
pub fn equity_curve(returns: &ReturnSeries) -> Vec<EquityPoint> {
    let mut equity = 1.0;
    returns
        .points()
        .iter()
        .map(|point| {
            if let Some(r) = point.value {
                equity *= 1.0 + r;
            }
            EquityPoint {
                timestamp: point.timestamp,
                equity,
            }
        })
        .collect()
}

/// Largest peak-to-trough decline in one forward pass, clamped to [0, 1].
pub fn max_drawdown(returns: &[f64]) -> f64 {
    let mut equity = 1.0_f64;
    let mut peak = 1.0_f64;
    let mut worst = 0.0_f64;
    for r in returns {
        equity *= 1.0 + r;
        if equity > peak {
            peak = equity;
        }
        let drawdown = (peak - equity) / peak;
        if drawdown > worst {
            worst = drawdown;
        }
    }
    worst.clamp(0.0, 1.0)
}

fn annual_return(returns: &[f64], periods_per_year: f64) -> Metric {
    let growth = 1.0 + compound(returns);
    if growth < 0.0 {
        return Metric::Undefined;
    }
    Metric::from_f64(growth.powf(periods_per_year / returns.len() as f64) - 1.0)
}

fn calmar_ratio(annual_return: Metric, max_drawdown: f64) -> Metric {
    match annual_return {
        Metric::Value(annual) => Metric::ratio(annual, max_drawdown, VARIANCE_EPSILON),
        _ => Metric::Undefined,
    }
}

/// Gross profit over gross loss. `Unbounded` when nothing lost.
pub fn profit_factor(pnls: &[f64]) -> Metric {
    let gains: f64 = pnls.iter().filter(|p| **p > 0.0).sum();
    let losses: f64 = pnls.iter().filter(|p| **p < 0.0).map(|p| p.abs()).sum();
    Metric::ratio(gains, losses, PNL_EPSILON)
}

pub fn win_rate(pnls: &[f64]) -> Metric {
    if pnls.is_empty() {
        return Metric::Undefined;
    }
    let wins = pnls.iter().filter(|p| **p > 0.0).count();
    Metric::Value(wins as f64 / pnls.len() as f64)
}

/// Share of gross absolute P&L carried by the single largest trade.
pub fn largest_contribution(pnls: &[f64]) -> Metric {
    let gross: f64 = pnls.iter().map(|p| p.abs()).sum();
    if gross <= PNL_EPSILON {
        return Metric::Undefined;
    }
    let largest = pnls.iter().map(|p| p.abs()).fold(0.0, f64::max);
    Metric::from_f64(largest / gross).clamp(0.0, 1.0)
}

/// Longest runs of winning and losing trades. Flat trades break both.
fn streaks(pnls: &[f64]) -> (usize, usize) {
    let (mut win, mut loss) = (0usize, 0usize);
    let (mut max_win, mut max_loss) = (0usize, 0usize);
    for pnl in pnls {
        if *pnl > 0.0 {
            win += 1;
            loss = 0;
        } else if *pnl < 0.0 {
            loss += 1;
            win = 0;
        } else {
            win = 0;
            loss = 0;
        }
        max_win = max_win.max(win);
        max_loss = max_loss.max(loss);
    }
    (max_win, max_loss)
}

impl RiskMetrics {
    pub fn degeneracies(&self) -> Vec<DegenerateInput> {
        let mut found = Vec::new();
        if !self.sharpe_ratio.is_defined() {
            found.push(DegenerateInput::ZeroVolatility);
        }
        if !self.sortino_ratio.is_defined() {
            found.push(DegenerateInput::ZeroDownsideVolatility);
        }
        if self.max_drawdown == 0.0 {
            found.push(DegenerateInput::ZeroDrawdown);
        }
        match (self.win_rate, self.profit_factor) {
            (Metric::Undefined, _) => found.push(DegenerateInput::NoTrades),
            (_, Metric::Unbounded) => found.push(DegenerateInput::NoLosingTrades),
            _ => {}
        }
        if self.win_rate.is_defined() && !self.largest_single_trade_contribution_pct.is_defined() {
            found.push(DegenerateInput::ZeroPnlTotal);
        }
        found
    }
}
