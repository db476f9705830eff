//! Return series construction
//!
//! Turns the trade ledger into periodic wallet returns and aligns them with
//! the benchmark feed by inner join on the period grid. No interpolation:
//! a period absent from either side is dropped, a period missing on either
//! side is missing on both.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};

use crate::config::{AnalysisConfig, NonTradingPeriods};
use crate::error::{AnalysisError, AnalysisResult};
use crate::ledger::validate_ledger;
use crate::models::{AlignedReturns, DegenerateInput, ReturnPoint, ReturnSeries, Side, Trade};

/// Upper bound on grid periods, guards against a tiny sampling interval over
/// a long history.
const MAX_PERIODS: i64 = 1_000_000;

/// Capital floor used when estimating the capital basis from the ledger.
const MIN_ESTIMATED_CAPITAL: f64 = 1_000.0;

#[derive(Debug, Clone)]
pub struct BuiltReturns {
    pub aligned: AlignedReturns,
    /// Capital the wallet returns were measured against
    pub capital: f64,
    pub degeneracies: Vec<DegenerateInput>,
}

pub struct ReturnSeriesBuilder<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> ReturnSeriesBuilder<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn build(
        &self,
        trades: &[Trade],
        benchmark: &ReturnSeries,
        as_of: DateTime<Utc>,
    ) -> AnalysisResult<BuiltReturns> {
        if trades.len() < 2 {
            return Err(AnalysisError::InsufficientData(format!(
                "at least 2 trades required, got {}",
                trades.len()
            )));
        }
        validate_ledger(trades)?;

        let interval = self.config.sampling_interval_secs;
        let capital = self.capital_basis(trades);

        let mut period_pnl: BTreeMap<i64, f64> = BTreeMap::new();
        let mut active_periods: BTreeSet<i64> = BTreeSet::new();
        for trade in trades {
            let period = bucket(trade.timestamp, interval);
            active_periods.insert(period);
            if trade.is_closing() {
                *period_pnl.entry(period).or_default() += trade.pnl();
            }
        }

        let first = bucket(trades[0].timestamp, interval);
        let last = bucket(as_of, interval).max(first);
        if (last - first) / interval > MAX_PERIODS {
            return Err(AnalysisError::Validation(format!(
                "ledger spans more than {} sampling periods",
                MAX_PERIODS
            )));
        }

        let mut degeneracies = Vec::new();
        let mut equity = capital;
        let mut depleted = false;
        let mut wallet_points = Vec::new();
        let mut period = first;
        while period <= last {
            let timestamp = period_start(period)?;
            let pnl = period_pnl.get(&period).copied().unwrap_or(0.0);

            // Once the capital basis is gone later returns have no denominator
            if equity <= 0.0 && !depleted {
                tracing::warn!(%timestamp, "Wallet equity depleted, marking remaining periods missing");
                degeneracies.push(DegenerateInput::EquityDepleted);
                depleted = true;
            }

            let point = if depleted {
                ReturnPoint::missing(timestamp)
            } else if !active_periods.contains(&period) {
                match self.config.non_trading_periods {
                    NonTradingPeriods::Zero => ReturnPoint::new(timestamp, 0.0),
                    NonTradingPeriods::Missing => ReturnPoint::missing(timestamp),
                }
            } else {
                ReturnPoint::new(timestamp, pnl / equity)
            };

            equity += pnl;
            wallet_points.push(point);
            period += interval;
        }

        let benchmark = self.normalize_benchmark(benchmark)?;
        let aligned = align(&wallet_points, &benchmark)?;

        let observations = aligned.observations();
        if observations < 2 {
            return Err(AnalysisError::InsufficientData(format!(
                "at least 2 aligned return periods required, got {}",
                observations
            )));
        }

        tracing::debug!(
            periods = aligned.wallet().len(),
            observations,
            capital,
            "Built aligned return series"
        );

        Ok(BuiltReturns {
            aligned,
            capital,
            degeneracies,
        })
    }

    /// Configured capital, or half the ledger's buy notional with a floor.
    fn capital_basis(&self, trades: &[Trade]) -> f64 {
        if let Some(capital) = self.config.initial_capital {
            return capital;
        }
        let bought: f64 = trades
            .iter()
            .filter(|t| t.side == Side::Buy)
            .map(Trade::notional)
            .sum();
        (bought * 0.5).max(MIN_ESTIMATED_CAPITAL)
    }

    /// Snap benchmark timestamps onto the period grid.
    fn normalize_benchmark(&self, benchmark: &ReturnSeries) -> AnalysisResult<ReturnSeries> {
        let interval = self.config.sampling_interval_secs;
        let points = benchmark
            .points()
            .iter()
            .map(|p| {
                Ok(ReturnPoint {
                    timestamp: period_start(bucket(p.timestamp, interval))?,
                    value: p.value,
                })
            })
            .collect::<AnalysisResult<Vec<_>>>()?;

        let normalized = ReturnSeries::new(points).map_err(|_| {
            AnalysisError::Validation(
                "benchmark has more than one point in a sampling period".to_string(),
            )
        })?;
        normalized.check_contiguous(self.config.sampling_interval())?;
        Ok(normalized)
    }
}

fn align(wallet: &[ReturnPoint], benchmark: &ReturnSeries) -> AnalysisResult<AlignedReturns> {
    let by_time: HashMap<DateTime<Utc>, Option<f64>> = benchmark
        .points()
        .iter()
        .map(|p| (p.timestamp, p.value))
        .collect();

    let mut wallet_points = Vec::new();
    let mut benchmark_points = Vec::new();
    for point in wallet {
        let Some(bench_value) = by_time.get(&point.timestamp) else {
            continue;
        };
        match (point.value, *bench_value) {
            (Some(w), Some(b)) => {
                wallet_points.push(ReturnPoint::new(point.timestamp, w));
                benchmark_points.push(ReturnPoint::new(point.timestamp, b));
            }
            _ => {
                wallet_points.push(ReturnPoint::missing(point.timestamp));
                benchmark_points.push(ReturnPoint::missing(point.timestamp));
            }
        }
    }

    AlignedReturns::new(
        ReturnSeries::new(wallet_points)?,
        ReturnSeries::new(benchmark_points)?,
    )
}

fn bucket(timestamp: DateTime<Utc>, interval: i64) -> i64 {
    timestamp.timestamp().div_euclid(interval) * interval
}

fn period_start(seconds: i64) -> AnalysisResult<DateTime<Utc>> {
    DateTime::from_timestamp(seconds, 0).ok_or_else(|| {
        AnalysisError::Validation(format!("timestamp {} out of range", seconds))
    })
}
