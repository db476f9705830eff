//! Data models for wallet skill analysis
//!
//! These are the values that flow between the analysis components. Every
//! component produces fresh values from borrowed inputs; nothing here is
//! mutated after construction.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};

// =============================================================================
// Trade Ledger
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// A single executed trade, as delivered by the data-acquisition layer.
///
/// `realized_pnl` is net of fees. Buys carry no realized P&L; only sells
/// close exposure, so trade-level statistics are computed over sells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Execution time
    pub timestamp: DateTime<Utc>,

    /// Transaction signature / hash
    #[serde(default)]
    pub tx_ref: String,

    /// Token mint or contract address
    pub token: String,

    /// Token symbol (e.g., "SOL", "BONK")
    #[serde(default)]
    pub token_symbol: String,

    pub side: Side,

    pub quantity: Decimal,

    /// Price per unit in the quote currency
    pub unit_price: Decimal,

    /// Realized P&L in the quote currency, net of fees
    #[serde(default, alias = "realized_value")]
    pub realized_pnl: Decimal,

    #[serde(default)]
    pub fee: Decimal,
}

impl Trade {
    /// Whether this trade closes exposure and therefore realizes P&L.
    pub fn is_closing(&self) -> bool {
        self.side == Side::Sell
    }

    pub fn pnl(&self) -> f64 {
        to_f64(self.realized_pnl)
    }

    pub fn notional(&self) -> f64 {
        to_f64(self.quantity) * to_f64(self.unit_price)
    }

    /// Symbol when known, otherwise the raw token identifier.
    pub fn token_label(&self) -> &str {
        if self.token_symbol.is_empty() {
            &self.token
        } else {
            &self.token_symbol
        }
    }
}

pub(crate) fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

// =============================================================================
// Return Series
// =============================================================================

/// One period of a return series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnPoint {
    pub timestamp: DateTime<Utc>,

    /// Periodic return; `None` marks the period as missing (excluded from
    /// statistics rather than treated as zero).
    pub value: Option<f64>,
}

impl ReturnPoint {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self {
            timestamp,
            value: Some(value),
        }
    }

    pub fn missing(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            value: None,
        }
    }
}

/// Time-indexed periodic returns with strictly increasing timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ReturnPoint>", into = "Vec<ReturnPoint>")]
pub struct ReturnSeries {
    points: Vec<ReturnPoint>,
}

impl ReturnSeries {
    pub fn new(points: Vec<ReturnPoint>) -> AnalysisResult<Self> {
        for pair in points.windows(2) {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(AnalysisError::Validation(format!(
                    "return series timestamps must be strictly increasing ({} followed by {})",
                    pair[0].timestamp, pair[1].timestamp
                )));
            }
        }

        if let Some(bad) = points
            .iter()
            .find(|p| p.value.map_or(false, |v| !v.is_finite()))
        {
            return Err(AnalysisError::Validation(format!(
                "non-finite return at {}",
                bad.timestamp
            )));
        }

        Ok(Self { points })
    }

    pub fn points(&self) -> &[ReturnPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns of all non-missing periods, in order.
    pub fn observed(&self) -> Vec<f64> {
        self.points.iter().filter_map(|p| p.value).collect()
    }

    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.points.first().map(|p| p.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.points.last().map(|p| p.timestamp)
    }

    /// Fails when two consecutive points are further apart than `interval`.
    /// Gaps must be represented by explicit missing points.
    pub fn check_contiguous(&self, interval: Duration) -> AnalysisResult<()> {
        for pair in self.points.windows(2) {
            if pair[1].timestamp - pair[0].timestamp > interval {
                return Err(AnalysisError::Validation(format!(
                    "gap between {} and {} exceeds the sampling interval without a missing marker",
                    pair[0].timestamp, pair[1].timestamp
                )));
            }
        }
        Ok(())
    }
}

impl TryFrom<Vec<ReturnPoint>> for ReturnSeries {
    type Error = AnalysisError;

    fn try_from(points: Vec<ReturnPoint>) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl From<ReturnSeries> for Vec<ReturnPoint> {
    fn from(series: ReturnSeries) -> Self {
        series.points
    }
}

/// Wallet and benchmark series on an identical timestamp index.
///
/// A period missing on either side is skipped on both, so `pairs()` always
/// yields matched observations.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedReturns {
    wallet: ReturnSeries,
    benchmark: ReturnSeries,
}

impl AlignedReturns {
    pub fn new(wallet: ReturnSeries, benchmark: ReturnSeries) -> AnalysisResult<Self> {
        let same_index = wallet.len() == benchmark.len()
            && wallet
                .points()
                .iter()
                .zip(benchmark.points())
                .all(|(w, b)| w.timestamp == b.timestamp);
        if !same_index {
            return Err(AnalysisError::Validation(
                "wallet and benchmark series must share one timestamp index".to_string(),
            ));
        }
        Ok(Self { wallet, benchmark })
    }

    pub fn wallet(&self) -> &ReturnSeries {
        &self.wallet
    }

    pub fn benchmark(&self) -> &ReturnSeries {
        &self.benchmark
    }

    /// Matched (wallet, benchmark) observations, skipping missing periods.
    pub fn pairs(&self) -> (Vec<f64>, Vec<f64>) {
        self.wallet
            .points()
            .iter()
            .zip(self.benchmark.points())
            .filter_map(|(w, b)| Some((w.value?, b.value?)))
            .unzip()
    }

    pub fn observations(&self) -> usize {
        self.wallet
            .points()
            .iter()
            .zip(self.benchmark.points())
            .filter(|(w, b)| w.value.is_some() && b.value.is_some())
            .count()
    }
}

/// Point on a compounded equity curve, starting from 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
}

// =============================================================================
// Metric Values
// =============================================================================

/// A statistic that may be undefined.
///
/// Division by zero never produces `inf` or `NaN`: `x/0` with `x > 0` is
/// `Unbounded`, every other degenerate case is `Undefined`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Metric {
    Value(f64),
    Unbounded,
    Undefined,
}

impl Metric {
    pub fn from_f64(value: f64) -> Self {
        if value.is_finite() {
            Metric::Value(value)
        } else {
            Metric::Undefined
        }
    }

    /// `numerator / denominator`, with `|denominator| <= tolerance` treated as zero.
    pub fn ratio(numerator: f64, denominator: f64, tolerance: f64) -> Self {
        if denominator.abs() <= tolerance {
            if numerator > tolerance {
                Metric::Unbounded
            } else {
                Metric::Undefined
            }
        } else {
            Metric::from_f64(numerator / denominator)
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Metric::Value(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Metric::Value(_))
    }

    /// Strictly above `threshold`. `Unbounded` exceeds everything.
    pub fn exceeds(&self, threshold: f64) -> bool {
        match self {
            Metric::Value(v) => *v > threshold,
            Metric::Unbounded => true,
            Metric::Undefined => false,
        }
    }

    /// Strictly below `threshold`. Only defined values qualify.
    pub fn below(&self, threshold: f64) -> bool {
        matches!(self, Metric::Value(v) if *v < threshold)
    }

    pub fn clamp(self, min: f64, max: f64) -> Self {
        match self {
            Metric::Value(v) => Metric::Value(v.clamp(min, max)),
            other => other,
        }
    }
}

// =============================================================================
// Time Windows
// =============================================================================

/// Trailing horizon used by the time-decay analysis.
///
/// The derived ordering runs from the longest window to the shortest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WindowLabel {
    #[serde(rename = "all_time")]
    AllTime,
    #[serde(rename = "180d")]
    Days180,
    #[serde(rename = "90d")]
    Days90,
    #[serde(rename = "30d")]
    Days30,
    #[serde(rename = "7d")]
    Days7,
}

impl WindowLabel {
    pub const ALL: [WindowLabel; 5] = [
        WindowLabel::AllTime,
        WindowLabel::Days180,
        WindowLabel::Days90,
        WindowLabel::Days30,
        WindowLabel::Days7,
    ];

    pub fn to_days(&self) -> Option<i64> {
        match self {
            WindowLabel::AllTime => None,
            WindowLabel::Days180 => Some(180),
            WindowLabel::Days90 => Some(90),
            WindowLabel::Days30 => Some(30),
            WindowLabel::Days7 => Some(7),
        }
    }

    pub fn duration(&self) -> Option<Duration> {
        self.to_days().map(Duration::days)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WindowLabel::AllTime => "all_time",
            WindowLabel::Days180 => "180d",
            WindowLabel::Days90 => "90d",
            WindowLabel::Days30 => "30d",
            WindowLabel::Days7 => "7d",
        }
    }
}

impl fmt::Display for WindowLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WindowLabel {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all_time" | "all" => Ok(WindowLabel::AllTime),
            "180d" => Ok(WindowLabel::Days180),
            "90d" => Ok(WindowLabel::Days90),
            "30d" | "1m" => Ok(WindowLabel::Days30),
            "7d" | "1w" => Ok(WindowLabel::Days7),
            other => Err(AnalysisError::Validation(format!(
                "unknown window label '{}'",
                other
            ))),
        }
    }
}

/// Statistics recomputed from scratch over one trailing window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeWindowMetrics {
    pub window: WindowLabel,

    /// Closing trades inside the window
    pub trade_count: usize,

    pub winning_trades: usize,

    pub win_rate: Metric,

    /// Summed realized P&L inside the window (quote currency)
    pub total_return: f64,

    pub avg_pnl_per_trade: Metric,

    /// When false the values are advisory only
    pub sample_sufficient: bool,
}

/// Comparison of recent performance against the full history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecaySummary {
    /// Shortest sample-sufficient window other than all-time
    pub recent_window: Option<WindowLabel>,

    /// All-time win rate minus recent win rate
    pub win_rate_drop: Metric,

    pub severe_decay: bool,

    pub recent_losing: bool,

    /// Recent trade rate divided by the all-time trade rate
    pub activity_ratio: Metric,
}

// =============================================================================
// Component Outputs
// =============================================================================

/// Split of wallet performance into market-following and idiosyncratic parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionResult {
    /// Excess return per period
    pub alpha: f64,

    /// Alpha scaled by periods per year
    pub alpha_annualized: f64,

    pub beta: f64,

    pub r_squared: Metric,

    /// Fraction of cumulative return attributable to alpha, clipped to [0, 1]
    pub alpha_share: Metric,

    /// Fraction of cumulative return attributable to beta, clipped to [0, 1]
    pub beta_share: Metric,

    pub alpha_contribution: f64,

    pub beta_contribution: f64,

    /// Wallet cumulative return over the aligned periods
    pub total_return: f64,

    /// Benchmark cumulative return over the aligned periods
    pub benchmark_return: f64,

    pub observations: usize,

    /// Benchmark variance was ~0, beta forced to 0
    pub degenerate_regression: bool,

    /// Clipping to [0, 1] changed at least one share
    pub shares_clipped: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub sharpe_ratio: Metric,
    pub sortino_ratio: Metric,
    /// Largest peak-to-trough decline, in [0, 1]
    pub max_drawdown: f64,
    pub calmar_ratio: Metric,
    pub annual_return: Metric,
    pub annual_volatility: f64,
    /// Mean periodic return
    pub expected_return: f64,
    pub profit_factor: Metric,
    pub win_rate: Metric,
    pub largest_single_trade_contribution_pct: Metric,
    pub max_win_streak: usize,
    pub max_loss_streak: usize,
}

/// Activity and concentration profile of the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingProfile {
    pub total_fills: usize,
    pub buy_count: usize,
    pub sell_count: usize,
    pub unique_tokens: usize,
    pub trading_days: usize,
    pub trades_per_day: f64,
    pub avg_trade_value: Metric,
    pub total_fees: f64,
    pub avg_hold_hours: Metric,
    pub days_since_last_trade: f64,
    /// Share of profitable P&L coming from the single best token
    pub top_token_share: Metric,
    /// Herfindahl index over profitable tokens
    pub token_hhi: Metric,
}

/// Why a metric in the report went undefined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegenerateInput {
    /// Benchmark variance ~0; beta undefined
    FlatBenchmark,
    /// Wallet return variance ~0; Sharpe undefined
    ZeroVolatility,
    /// No returns below the risk-free rate; Sortino undefined
    ZeroDownsideVolatility,
    /// No losing trades; profit factor unbounded
    NoLosingTrades,
    /// No closing trades in the ledger
    NoTrades,
    /// Cumulative return ~0; alpha/beta shares undefined
    ZeroTotalReturn,
    /// Summed P&L ~0; single-trade contribution undefined
    ZeroPnlTotal,
    /// No drawdown; Calmar undefined
    ZeroDrawdown,
    /// Wallet equity reached zero; later periods marked missing
    EquityDepleted,
}

// =============================================================================
// Behavior Tags
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BehaviorTag {
    ConcentrationRisk,
    TimeDecay,
    Consistency,
    HighBetaRider,
    DrawdownTolerance,
    PoorPayoff,
    TokenConcentration,
    Gambler,
    Sniper,
    Conservative,
    SmartMoney,
    Dormant,
    ActiveTrader,
    Whale,
    DiamondHands,
    PaperHands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagCategory {
    Positive,
    Negative,
    Warning,
    Neutral,
}

impl BehaviorTag {
    pub fn category(&self) -> TagCategory {
        match self {
            BehaviorTag::Consistency
            | BehaviorTag::Sniper
            | BehaviorTag::Conservative
            | BehaviorTag::SmartMoney
            | BehaviorTag::DiamondHands => TagCategory::Positive,
            BehaviorTag::PaperHands | BehaviorTag::PoorPayoff => TagCategory::Negative,
            BehaviorTag::ConcentrationRisk
            | BehaviorTag::TimeDecay
            | BehaviorTag::HighBetaRider
            | BehaviorTag::TokenConcentration
            | BehaviorTag::Gambler => TagCategory::Warning,
            BehaviorTag::DrawdownTolerance
            | BehaviorTag::Dormant
            | BehaviorTag::ActiveTrader
            | BehaviorTag::Whale => TagCategory::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BehaviorTag::ConcentrationRisk => "concentration-risk",
            BehaviorTag::TimeDecay => "time-decay",
            BehaviorTag::Consistency => "consistency",
            BehaviorTag::HighBetaRider => "high-beta-rider",
            BehaviorTag::DrawdownTolerance => "drawdown-tolerance",
            BehaviorTag::PoorPayoff => "poor-payoff",
            BehaviorTag::TokenConcentration => "token-concentration",
            BehaviorTag::Gambler => "gambler",
            BehaviorTag::Sniper => "sniper",
            BehaviorTag::Conservative => "conservative",
            BehaviorTag::SmartMoney => "smart-money",
            BehaviorTag::Dormant => "dormant",
            BehaviorTag::ActiveTrader => "active-trader",
            BehaviorTag::Whale => "whale",
            BehaviorTag::DiamondHands => "diamond-hands",
            BehaviorTag::PaperHands => "paper-hands",
        }
    }
}

impl fmt::Display for BehaviorTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Input Contract
// =============================================================================

/// Everything the engine needs to analyze one wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Wallet address
    pub wallet: String,

    /// Deduplicated trades, ordered by timestamp
    pub trades: Vec<Trade>,

    /// Benchmark asset returns covering the ledger period
    pub benchmark: ReturnSeries,

    /// Reference time; defaults to the latest trade
    #[serde(default)]
    pub as_of: Option<DateTime<Utc>>,

    /// Version of the upstream data snapshot, used as a cache key
    #[serde(default)]
    pub snapshot_version: Option<String>,
}
