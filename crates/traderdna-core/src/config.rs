//! Analysis configuration
//!
//! The engine consumes this but never owns where it comes from. Every field
//! has a serde default so partial configuration files work.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};
use crate::models::WindowLabel;

/// How periods without trades enter the wallet return series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonTradingPeriods {
    /// Counted as a 0% return (lowers measured volatility)
    Zero,
    /// Excluded from statistics via an explicit missing marker
    Missing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_periods_per_year")]
    pub periods_per_year: u32,

    #[serde(default = "default_risk_free_rate_per_period")]
    pub risk_free_rate_per_period: f64,

    /// Length of one return period in seconds
    #[serde(default = "default_sampling_interval_secs")]
    pub sampling_interval_secs: i64,

    #[serde(default = "default_non_trading_periods")]
    pub non_trading_periods: NonTradingPeriods,

    /// Capital the wallet return series is measured against. When unset it is
    /// estimated from the ledger's buy notional.
    #[serde(default)]
    pub initial_capital: Option<f64>,

    #[serde(default = "default_windows")]
    pub windows: Vec<WindowLabel>,

    #[serde(default = "default_min_trades_per_window")]
    pub min_trades_per_window: usize,

    /// Cumulative returns within this distance of zero count as zero
    #[serde(default = "default_zero_return_tolerance")]
    pub zero_return_tolerance: f64,

    #[serde(default)]
    pub thresholds: TagThresholds,

    #[serde(default)]
    pub assessment: AssessmentThresholds,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            periods_per_year: default_periods_per_year(),
            risk_free_rate_per_period: default_risk_free_rate_per_period(),
            sampling_interval_secs: default_sampling_interval_secs(),
            non_trading_periods: default_non_trading_periods(),
            initial_capital: None,
            windows: default_windows(),
            min_trades_per_window: default_min_trades_per_window(),
            zero_return_tolerance: default_zero_return_tolerance(),
            thresholds: TagThresholds::default(),
            assessment: AssessmentThresholds::default(),
        }
    }
}

// Crypto markets trade every day of the year
fn default_periods_per_year() -> u32 {
    365
}

fn default_risk_free_rate_per_period() -> f64 {
    0.04 / 365.0
}

fn default_sampling_interval_secs() -> i64 {
    86_400
}

fn default_non_trading_periods() -> NonTradingPeriods {
    NonTradingPeriods::Zero
}

fn default_windows() -> Vec<WindowLabel> {
    WindowLabel::ALL.to_vec()
}

fn default_min_trades_per_window() -> usize {
    5
}

fn default_zero_return_tolerance() -> f64 {
    1e-4
}

impl AnalysisConfig {
    pub fn sampling_interval(&self) -> Duration {
        Duration::seconds(self.sampling_interval_secs)
    }

    /// Configured windows, deduplicated and ordered longest to shortest.
    pub fn ordered_windows(&self) -> Vec<WindowLabel> {
        let mut windows = self.windows.clone();
        windows.sort();
        windows.dedup();
        windows
    }

    pub fn validate(&self) -> AnalysisResult<()> {
        if self.periods_per_year == 0 {
            return Err(invalid("periods_per_year must be positive"));
        }
        if self.sampling_interval_secs <= 0 {
            return Err(invalid("sampling_interval_secs must be positive"));
        }
        if !self.risk_free_rate_per_period.is_finite() {
            return Err(invalid("risk_free_rate_per_period must be finite"));
        }
        if let Some(capital) = self.initial_capital {
            if !(capital.is_finite() && capital > 0.0) {
                return Err(invalid("initial_capital must be a positive number"));
            }
        }
        if !self.windows.contains(&WindowLabel::AllTime) {
            return Err(invalid("windows must include all_time"));
        }
        if self.min_trades_per_window == 0 {
            return Err(invalid("min_trades_per_window must be at least 1"));
        }
        if !(self.zero_return_tolerance.is_finite() && self.zero_return_tolerance >= 0.0) {
            return Err(invalid("zero_return_tolerance must be non-negative"));
        }
        self.thresholds.validate()?;
        self.assessment.validate()
    }
}

fn invalid(message: &str) -> AnalysisError {
    AnalysisError::Validation(format!("configuration: {}", message))
}

/// Every threshold the behavior tagger compares against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagThresholds {
    /// Single-trade share of total P&L above which a wallet is concentrated
    pub concentration_threshold: f64,
    /// Win-rate drop (all-time minus recent) that counts as decay
    pub decay_delta_threshold: f64,
    /// Recent win rate below this fraction of all-time is severe decay
    pub severe_decay_ratio: f64,
    /// Maximum spread of win rates across sufficient windows for consistency
    pub consistency_band: f64,
    pub beta_share_threshold: f64,
    pub r_squared_threshold: f64,
    pub drawdown_tolerance_threshold: f64,
    pub drawdown_tolerance_min_sharpe: f64,
    /// Profit factor under which a mostly-winning wallet has a poor payoff
    pub poor_payoff_max_profit_factor: f64,
    pub poor_payoff_min_win_rate: f64,
    pub token_concentration_threshold: f64,
    /// Trades per trading day
    pub high_frequency_threshold: f64,
    pub low_win_rate_threshold: f64,
    pub gambler_max_profit_factor: f64,
    pub sniper_min_win_rate: f64,
    pub sniper_max_trades_per_day: f64,
    pub sniper_min_profit_factor: f64,
    pub conservative_min_sharpe: f64,
    pub conservative_max_drawdown: f64,
    pub smart_money_min_alpha_share: f64,
    pub smart_money_min_win_rate: f64,
    pub smart_money_min_sharpe: f64,
    pub dormant_after_days: f64,
    pub active_trader_trades_per_day: f64,
    /// Average trade notional in the quote currency
    pub whale_avg_trade_value: f64,
    pub diamond_hands_min_hold_hours: f64,
    pub paper_hands_max_hold_hours: f64,
}

impl Default for TagThresholds {
    fn default() -> Self {
        Self {
            concentration_threshold: 0.5,
            decay_delta_threshold: 0.20,
            severe_decay_ratio: 0.7,
            consistency_band: 0.10,
            beta_share_threshold: 0.7,
            r_squared_threshold: 0.6,
            drawdown_tolerance_threshold: 0.4,
            drawdown_tolerance_min_sharpe: 1.0,
            poor_payoff_max_profit_factor: 1.0,
            poor_payoff_min_win_rate: 0.5,
            token_concentration_threshold: 0.8,
            high_frequency_threshold: 10.0,
            low_win_rate_threshold: 0.4,
            gambler_max_profit_factor: 1.0,
            sniper_min_win_rate: 0.7,
            sniper_max_trades_per_day: 5.0,
            sniper_min_profit_factor: 1.5,
            conservative_min_sharpe: 2.0,
            conservative_max_drawdown: 0.2,
            smart_money_min_alpha_share: 0.6,
            smart_money_min_win_rate: 0.6,
            smart_money_min_sharpe: 1.5,
            dormant_after_days: 30.0,
            active_trader_trades_per_day: 5.0,
            whale_avg_trade_value: 50_000.0,
            diamond_hands_min_hold_hours: 7.0 * 24.0,
            paper_hands_max_hold_hours: 24.0,
        }
    }
}

impl TagThresholds {
    fn validate(&self) -> AnalysisResult<()> {
        let all = [
            self.concentration_threshold,
            self.decay_delta_threshold,
            self.severe_decay_ratio,
            self.consistency_band,
            self.beta_share_threshold,
            self.r_squared_threshold,
            self.drawdown_tolerance_threshold,
            self.drawdown_tolerance_min_sharpe,
            self.poor_payoff_max_profit_factor,
            self.poor_payoff_min_win_rate,
            self.token_concentration_threshold,
            self.high_frequency_threshold,
            self.low_win_rate_threshold,
            self.gambler_max_profit_factor,
            self.sniper_min_win_rate,
            self.sniper_max_trades_per_day,
            self.sniper_min_profit_factor,
            self.conservative_min_sharpe,
            self.conservative_max_drawdown,
            self.smart_money_min_alpha_share,
            self.smart_money_min_win_rate,
            self.smart_money_min_sharpe,
            self.dormant_after_days,
            self.active_trader_trades_per_day,
            self.whale_avg_trade_value,
            self.diamond_hands_min_hold_hours,
            self.paper_hands_max_hold_hours,
        ];
        if all.iter().any(|v| !v.is_finite()) {
            return Err(invalid("tag thresholds must be finite"));
        }
        Ok(())
    }
}

/// Cut-offs for the structured verdicts in the assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssessmentThresholds {
    pub beta_leveraged: f64,
    pub beta_aggressive: f64,
    pub beta_moderate: f64,

    /// Annualized alpha bands, best first
    pub alpha_excellent: f64,
    pub alpha_good: f64,
    pub alpha_positive: f64,
    pub alpha_neutral: f64,

    /// Closing trades needed for each confidence level
    pub confidence_high_trades: usize,
    pub confidence_medium_trades: usize,

    /// Alpha share above which performance counts as skill based
    pub skill_min_alpha_share: f64,

    pub recommend_min_alpha_share: f64,
    pub recommend_min_sharpe: f64,
    /// Recent win rate must stay at or above this fraction of all-time
    pub recommend_min_win_rate_retention: f64,

    pub reject_max_alpha_share: f64,
    pub reject_max_sharpe: f64,
}

impl Default for AssessmentThresholds {
    fn default() -> Self {
        Self {
            beta_leveraged: 1.5,
            beta_aggressive: 1.0,
            beta_moderate: 0.5,
            alpha_excellent: 0.3,
            alpha_good: 0.1,
            alpha_positive: 0.0,
            alpha_neutral: -0.1,
            confidence_high_trades: 100,
            confidence_medium_trades: 30,
            skill_min_alpha_share: 0.5,
            recommend_min_alpha_share: 0.5,
            recommend_min_sharpe: 1.5,
            recommend_min_win_rate_retention: 0.8,
            reject_max_alpha_share: 0.3,
            reject_max_sharpe: 0.5,
        }
    }
}

impl AssessmentThresholds {
    fn validate(&self) -> AnalysisResult<()> {
        let all = [
            self.beta_leveraged,
            self.beta_aggressive,
            self.beta_moderate,
            self.alpha_excellent,
            self.alpha_good,
            self.alpha_positive,
            self.alpha_neutral,
            self.skill_min_alpha_share,
            self.recommend_min_alpha_share,
            self.recommend_min_sharpe,
            self.recommend_min_win_rate_retention,
            self.reject_max_alpha_share,
            self.reject_max_sharpe,
        ];
        if all.iter().any(|v| !v.is_finite()) {
            return Err(invalid("assessment thresholds must be finite"));
        }
        if !(self.beta_leveraged >= self.beta_aggressive && self.beta_aggressive >= self.beta_moderate) {
            return Err(invalid("beta bands must be ordered leveraged >= aggressive >= moderate"));
        }
        if !(self.alpha_excellent >= self.alpha_good
            && self.alpha_good >= self.alpha_positive
            && self.alpha_positive >= self.alpha_neutral)
        {
            return Err(invalid("alpha bands must be ordered from excellent down to neutral"));
        }
        if self.confidence_high_trades < self.confidence_medium_trades {
            return Err(invalid("confidence_high_trades must be at least confidence_medium_trades"));
        }
        Ok(())
    }
}
