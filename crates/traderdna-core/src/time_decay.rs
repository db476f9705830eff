//! Multi-horizon time-decay analysis
//!
//! Every trailing window is recomputed from its own filtered slice of closing
//! trades. Nothing is derived from a larger window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AnalysisResult};
use crate::ledger::closing_trades;
use crate::models::{DecaySummary, Metric, TimeWindowMetrics, Trade, WindowLabel};

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeDecayResult {
    /// Ordered longest to shortest
    pub windows: Vec<TimeWindowMetrics>,
    pub decay: DecaySummary,
}

impl TimeDecayResult {
    pub fn window(&self, label: WindowLabel) -> Option<&TimeWindowMetrics> {
        self.windows.iter().find(|w| w.window == label)
    }

    pub fn all_time(&self) -> Option<&TimeWindowMetrics> {
        self.window(WindowLabel::AllTime)
    }

    /// Window the decay comparison was made against.
    pub fn recent(&self) -> Option<&TimeWindowMetrics> {
        self.decay.recent_window.and_then(|label| self.window(label))
    }
}

pub struct TimeDecayAnalyzer<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> TimeDecayAnalyzer<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, trades: &[Trade], as_of: DateTime<Utc>) -> AnalysisResult<TimeDecayResult> {
        let windows: Vec<TimeWindowMetrics> = self
            .config
            .ordered_windows()
            .into_iter()
            .map(|label| self.window_metrics(trades, label, as_of))
            .collect();

        let all_time = windows
            .iter()
            .find(|w| w.window == WindowLabel::AllTime)
            .ok_or_else(|| AnalysisError::Validation("window set lacks all_time".to_string()))?;
        if all_time.trade_count == 0 {
            return Err(AnalysisError::InsufficientData(
                "no closing trades at or before as_of".to_string(),
            ));
        }

        let decay = self.summarize(trades, &windows, all_time, as_of);

        tracing::debug!(
            windows = windows.len(),
            recent = ?decay.recent_window,
            severe_decay = decay.severe_decay,
            "Computed time-decay windows"
        );

        Ok(TimeDecayResult { windows, decay })
    }

    /// Metrics over closing trades in `[as_of - window, as_of]`.
    pub fn window_metrics(
        &self,
        trades: &[Trade],
        label: WindowLabel,
        as_of: DateTime<Utc>,
    ) -> TimeWindowMetrics {
        let start = label.duration().map(|d| as_of - d);
        let in_window: Vec<f64> = closing_trades(trades)
            .filter(|t| t.timestamp <= as_of && start.map_or(true, |s| t.timestamp >= s))
            .map(Trade::pnl)
            .collect();

        let trade_count = in_window.len();
        let winning_trades = in_window.iter().filter(|p| **p > 0.0).count();
        let total_return: f64 = in_window.iter().sum();
        let (win_rate, avg_pnl_per_trade) = if trade_count == 0 {
            (Metric::Undefined, Metric::Undefined)
        } else {
            (
                Metric::Value(winning_trades as f64 / trade_count as f64),
                Metric::from_f64(total_return / trade_count as f64),
            )
        };

        TimeWindowMetrics {
            window: label,
            trade_count,
            winning_trades,
            win_rate,
            total_return,
            avg_pnl_per_trade,
            sample_sufficient: trade_count >= self.config.min_trades_per_window,
        }
    }

    fn summarize(
        &self,
        trades: &[Trade],
        windows: &[TimeWindowMetrics],
        all_time: &TimeWindowMetrics,
        as_of: DateTime<Utc>,
    ) -> DecaySummary {
        let Some(recent) = windows
            .iter()
            .filter(|w| w.window != WindowLabel::AllTime && w.sample_sufficient)
            .last()
        else {
            return DecaySummary {
                recent_window: None,
                win_rate_drop: Metric::Undefined,
                severe_decay: false,
                recent_losing: false,
                activity_ratio: Metric::Undefined,
            };
        };

        let win_rate_drop = match (all_time.win_rate.value(), recent.win_rate.value()) {
            (Some(all), Some(now)) => Metric::Value(all - now),
            _ => Metric::Undefined,
        };

        let severe_decay = all_time.sample_sufficient
            && match (all_time.win_rate.value(), recent.win_rate.value()) {
                (Some(all), Some(now)) => {
                    all > 0.0 && now < all * self.config.thresholds.severe_decay_ratio
                }
                _ => false,
            };

        DecaySummary {
            recent_window: Some(recent.window),
            win_rate_drop,
            severe_decay,
            recent_losing: recent.total_return < 0.0,
            activity_ratio: activity_ratio(trades, all_time, recent, as_of),
        }
    }
}

/// Recent closing-trade rate over the all-time rate, both per day.
fn activity_ratio(
    trades: &[Trade],
    all_time: &TimeWindowMetrics,
    recent: &TimeWindowMetrics,
    as_of: DateTime<Utc>,
) -> Metric {
    let Some(recent_days) = recent.window.to_days() else {
        return Metric::Undefined;
    };
    let Some(first) = closing_trades(trades)
        .find(|t| t.timestamp <= as_of)
        .map(|t| t.timestamp)
    else {
        return Metric::Undefined;
    };

    let history_days = ((as_of - first).num_seconds() as f64 / SECONDS_PER_DAY).max(1.0);
    let all_rate = all_time.trade_count as f64 / history_days;
    let recent_rate = recent.trade_count as f64 / recent_days as f64;
    Metric::ratio(recent_rate, all_rate, 0.0)
}
