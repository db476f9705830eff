//! Wallet report assembly
//!
//! `ReportAssembler` is the only writer of a `WalletReport`. It does no
//! analysis of its own: it checks that every upstream result is present and
//! internally consistent, then freezes them into one value.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::assessment::Assessment;
use crate::error::{AnalysisError, AnalysisResult};
use crate::models::{
    BehaviorTag, DecaySummary, DegenerateInput, EquityPoint, Metric, RegressionResult, RiskMetrics,
    TimeWindowMetrics, TradingProfile, WindowLabel,
};
use crate::time_decay::TimeDecayResult;

/// Immutable result of one wallet analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletReport {
    wallet: String,
    as_of: DateTime<Utc>,
    observations: usize,
    regression: RegressionResult,
    windows: Vec<TimeWindowMetrics>,
    decay: DecaySummary,
    risk: RiskMetrics,
    profile: TradingProfile,
    tags: BTreeSet<BehaviorTag>,
    assessment: Assessment,
    degeneracies: BTreeSet<DegenerateInput>,
    wallet_equity: Vec<EquityPoint>,
    benchmark_equity: Vec<EquityPoint>,
}

impl WalletReport {
    pub fn wallet(&self) -> &str {
        &self.wallet
    }

    pub fn as_of(&self) -> DateTime<Utc> {
        self.as_of
    }

    /// Aligned return periods used by the regression
    pub fn observations(&self) -> usize {
        self.observations
    }

    pub fn regression(&self) -> &RegressionResult {
        &self.regression
    }

    /// Longest window first
    pub fn windows(&self) -> &[TimeWindowMetrics] {
        &self.windows
    }

    pub fn window(&self, label: WindowLabel) -> Option<&TimeWindowMetrics> {
        self.windows.iter().find(|w| w.window == label)
    }

    pub fn decay(&self) -> &DecaySummary {
        &self.decay
    }

    pub fn risk(&self) -> &RiskMetrics {
        &self.risk
    }

    pub fn profile(&self) -> &TradingProfile {
        &self.profile
    }

    pub fn tags(&self) -> &BTreeSet<BehaviorTag> {
        &self.tags
    }

    pub fn has_tag(&self, tag: BehaviorTag) -> bool {
        self.tags.contains(&tag)
    }

    pub fn assessment(&self) -> &Assessment {
        &self.assessment
    }

    pub fn degeneracies(&self) -> &BTreeSet<DegenerateInput> {
        &self.degeneracies
    }

    pub fn wallet_equity(&self) -> &[EquityPoint] {
        &self.wallet_equity
    }

    pub fn benchmark_equity(&self) -> &[EquityPoint] {
        &self.benchmark_equity
    }
}

#[derive(Debug, Default)]
pub struct ReportAssembler {
    expected_windows: Vec<WindowLabel>,
    wallet: Option<String>,
    as_of: Option<DateTime<Utc>>,
    regression: Option<RegressionResult>,
    time_decay: Option<TimeDecayResult>,
    risk: Option<RiskMetrics>,
    profile: Option<TradingProfile>,
    tags: Option<BTreeSet<BehaviorTag>>,
    assessment: Option<Assessment>,
    degeneracies: BTreeSet<DegenerateInput>,
    wallet_equity: Option<Vec<EquityPoint>>,
    benchmark_equity: Option<Vec<EquityPoint>>,
}

impl ReportAssembler {
    /// `expected_windows` must be ordered longest to shortest.
    pub fn new(expected_windows: Vec<WindowLabel>) -> Self {
        Self {
            expected_windows,
            ..Self::default()
        }
    }

    pub fn wallet(mut self, wallet: impl Into<String>) -> Self {
        self.wallet = Some(wallet.into());
        self
    }

    pub fn as_of(mut self, as_of: DateTime<Utc>) -> Self {
        self.as_of = Some(as_of);
        self
    }

    pub fn regression(mut self, regression: RegressionResult) -> Self {
        self.regression = Some(regression);
        self
    }

    pub fn time_decay(mut self, time_decay: TimeDecayResult) -> Self {
        self.time_decay = Some(time_decay);
        self
    }

    pub fn risk(mut self, risk: RiskMetrics) -> Self {
        self.risk = Some(risk);
        self
    }

    pub fn profile(mut self, profile: TradingProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn tags(mut self, tags: BTreeSet<BehaviorTag>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn assessment(mut self, assessment: Assessment) -> Self {
        self.assessment = Some(assessment);
        self
    }

    pub fn degeneracies(mut self, found: impl IntoIterator<Item = DegenerateInput>) -> Self {
        self.degeneracies.extend(found);
        self
    }

    pub fn equity_curves(mut self, wallet: Vec<EquityPoint>, benchmark: Vec<EquityPoint>) -> Self {
        self.wallet_equity = Some(wallet);
        self.benchmark_equity = Some(benchmark);
        self
    }

    pub fn assemble(self) -> AnalysisResult<WalletReport> {
        let time_decay = required(self.time_decay, "time-decay windows")?;
        let regression = required(self.regression, "regression")?;
        let report = WalletReport {
            wallet: required(self.wallet, "wallet")?,
            as_of: required(self.as_of, "as_of")?,
            observations: regression.observations,
            regression,
            windows: time_decay.windows,
            decay: time_decay.decay,
            risk: required(self.risk, "risk metrics")?,
            profile: required(self.profile, "trading profile")?,
            tags: required(self.tags, "tags")?,
            assessment: required(self.assessment, "assessment")?,
            degeneracies: self.degeneracies,
            wallet_equity: required(self.wallet_equity, "wallet equity curve")?,
            benchmark_equity: required(self.benchmark_equity, "benchmark equity curve")?,
        };

        check_windows(&report.windows, &self.expected_windows)?;
        check_bounds(&report)?;
        check_finite(&report)?;

        if report.wallet_equity.len() != report.benchmark_equity.len() {
            return Err(AnalysisError::Assembly(
                "wallet and benchmark equity curves differ in length".to_string(),
            ));
        }

        Ok(report)
    }
}

fn required<T>(value: Option<T>, field: &str) -> AnalysisResult<T> {
    value.ok_or_else(|| AnalysisError::Assembly(format!("missing {}", field)))
}

fn check_windows(windows: &[TimeWindowMetrics], expected: &[WindowLabel]) -> AnalysisResult<()> {
    let labels: Vec<WindowLabel> = windows.iter().map(|w| w.window).collect();
    if labels != expected {
        return Err(AnalysisError::Assembly(format!(
            "window labels {:?} do not match configured {:?}",
            labels, expected
        )));
    }

    for w in windows {
        if w.winning_trades > w.trade_count {
            return Err(AnalysisError::Assembly(format!(
                "window {} has more winning trades than trades",
                w.window
            )));
        }
    }

    // Shorter windows are subsets of longer ones
    for pair in windows.windows(2) {
        if pair[1].trade_count > pair[0].trade_count {
            return Err(AnalysisError::Assembly(format!(
                "window {} has more trades than enclosing window {}",
                pair[1].window, pair[0].window
            )));
        }
    }
    Ok(())
}

fn check_bounds(report: &WalletReport) -> AnalysisResult<()> {
    let unit = |name: &str, metric: Metric| match metric.value() {
        Some(v) if !(0.0..=1.0).contains(&v) => Err(AnalysisError::Assembly(format!(
            "{} = {} outside [0, 1]",
            name, v
        ))),
        _ => Ok(()),
    };

    unit("max_drawdown", Metric::Value(report.risk.max_drawdown))?;
    unit("win_rate", report.risk.win_rate)?;
    unit("r_squared", report.regression.r_squared)?;
    unit("alpha_share", report.regression.alpha_share)?;
    unit("beta_share", report.regression.beta_share)?;
    unit(
        "largest_single_trade_contribution_pct",
        report.risk.largest_single_trade_contribution_pct,
    )?;
    for w in &report.windows {
        unit("window win_rate", w.win_rate)?;
    }
    Ok(())
}

fn check_finite(report: &WalletReport) -> AnalysisResult<()> {
    let r = &report.regression;
    let k = &report.risk;
    let p = &report.profile;

    let mut values = vec![
        ("alpha", r.alpha),
        ("alpha_annualized", r.alpha_annualized),
        ("beta", r.beta),
        ("alpha_contribution", r.alpha_contribution),
        ("beta_contribution", r.beta_contribution),
        ("total_return", r.total_return),
        ("benchmark_return", r.benchmark_return),
        ("max_drawdown", k.max_drawdown),
        ("annual_volatility", k.annual_volatility),
        ("expected_return", k.expected_return),
        ("trades_per_day", p.trades_per_day),
        ("total_fees", p.total_fees),
        ("days_since_last_trade", p.days_since_last_trade),
    ];

    let metrics = [
        ("r_squared", r.r_squared),
        ("alpha_share", r.alpha_share),
        ("beta_share", r.beta_share),
        ("sharpe_ratio", k.sharpe_ratio),
        ("sortino_ratio", k.sortino_ratio),
        ("calmar_ratio", k.calmar_ratio),
        ("annual_return", k.annual_return),
        ("profit_factor", k.profit_factor),
        ("win_rate", k.win_rate),
        ("largest_single_trade_contribution_pct", k.largest_single_trade_contribution_pct),
        ("avg_trade_value", p.avg_trade_value),
        ("avg_hold_hours", p.avg_hold_hours),
        ("top_token_share", p.top_token_share),
        ("token_hhi", p.token_hhi),
        ("win_rate_drop", report.decay.win_rate_drop),
        ("activity_ratio", report.decay.activity_ratio),
    ];
    values.extend(metrics.iter().filter_map(|(name, m)| m.value().map(|v| (*name, v))));

    for w in &report.windows {
        values.push(("window total_return", w.total_return));
        values.extend(w.win_rate.value().map(|v| ("window win_rate", v)));
        values.extend(w.avg_pnl_per_trade.value().map(|v| ("window avg_pnl_per_trade", v)));
    }
    for point in report.wallet_equity.iter().chain(&report.benchmark_equity) {
        values.push(("equity", point.equity));
    }

    match values.iter().find(|(_, v)| !v.is_finite()) {
        Some((name, v)) => Err(AnalysisError::Assembly(format!("{} is not finite ({})", name, v))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::{AlphaGrade, BetaProfile, Confidence, Recommendation};
    use chrono::TimeZone;

    fn window(label: WindowLabel, trade_count: usize) -> TimeWindowMetrics {
        TimeWindowMetrics {
            window: label,
            trade_count,
            winning_trades: trade_count / 2,
            win_rate: Metric::Value(0.5),
            total_return: 10.0,
            avg_pnl_per_trade: Metric::Value(1.0),
            sample_sufficient: trade_count >= 5,
        }
    }

    fn assembler(windows: Vec<TimeWindowMetrics>) -> ReportAssembler {
        let as_of = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let curve = vec![EquityPoint { timestamp: as_of, equity: 1.0 }];
        ReportAssembler::new(vec![WindowLabel::AllTime, WindowLabel::Days30])
            .wallet("7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU")
            .as_of(as_of)
            .regression(RegressionResult {
                alpha: 0.001,
                alpha_annualized: 0.365,
                beta: 0.8,
                r_squared: Metric::Value(0.5),
                alpha_share: Metric::Value(0.6),
                beta_share: Metric::Value(0.4),
                alpha_contribution: 0.06,
                beta_contribution: 0.04,
                total_return: 0.1,
                benchmark_return: 0.05,
                observations: 42,
                degenerate_regression: false,
                shares_clipped: false,
            })
            .time_decay(TimeDecayResult {
                windows,
                decay: DecaySummary {
                    recent_window: Some(WindowLabel::Days30),
                    win_rate_drop: Metric::Value(0.0),
                    severe_decay: false,
                    recent_losing: false,
                    activity_ratio: Metric::Value(1.0),
                },
            })
            .risk(RiskMetrics {
                sharpe_ratio: Metric::Value(1.1),
                sortino_ratio: Metric::Unbounded,
                max_drawdown: 0.1,
                calmar_ratio: Metric::Value(3.0),
                annual_return: Metric::Value(0.3),
                annual_volatility: 0.4,
                expected_return: 0.001,
                profit_factor: Metric::Value(1.5),
                win_rate: Metric::Value(0.5),
                largest_single_trade_contribution_pct: Metric::Value(0.1),
                max_win_streak: 2,
                max_loss_streak: 2,
            })
            .profile(TradingProfile {
                total_fills: 20,
                buy_count: 10,
                sell_count: 10,
                unique_tokens: 3,
                trading_days: 10,
                trades_per_day: 2.0,
                avg_trade_value: Metric::Value(100.0),
                total_fees: 1.0,
                avg_hold_hours: Metric::Undefined,
                days_since_last_trade: 0.0,
                top_token_share: Metric::Value(0.5),
                token_hhi: Metric::Value(0.3),
            })
            .tags(BTreeSet::new())
            .assessment(Assessment {
                beta_profile: BetaProfile::Moderate,
                alpha_grade: AlphaGrade::Excellent,
                skill_based: Some(true),
                confidence: Confidence::Low,
                recommendation: Recommendation::Caution,
            })
            .degeneracies([DegenerateInput::ZeroDownsideVolatility])
            .equity_curves(curve.clone(), curve)
    }

    #[test]
    fn test_assembles_consistent_parts() {
        let report = assembler(vec![window(WindowLabel::AllTime, 10), window(WindowLabel::Days30, 6)])
            .assemble()
            .unwrap();
        assert_eq!(report.observations(), 42);
        assert_eq!(report.windows().len(), 2);
        assert!(report.degeneracies().contains(&DegenerateInput::ZeroDownsideVolatility));
        assert_eq!(report.window(WindowLabel::Days30).unwrap().trade_count, 6);
    }

    #[test]
    fn test_rejects_missing_component() {
        let err = ReportAssembler::new(vec![WindowLabel::AllTime])
            .wallet("w")
            .assemble()
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Assembly(_)));
    }

    #[test]
    fn test_rejects_window_mismatch() {
        let err = assembler(vec![window(WindowLabel::AllTime, 10)]).assemble().unwrap_err();
        assert!(matches!(err, AnalysisError::Assembly(_)));
    }

    #[test]
    fn test_rejects_inconsistent_trade_counts() {
        let err = assembler(vec![window(WindowLabel::AllTime, 4), window(WindowLabel::Days30, 6)])
            .assemble()
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Assembly(_)));
    }

    #[test]
    fn test_rejects_non_finite_values() {
        let mut all = window(WindowLabel::AllTime, 10);
        all.total_return = f64::NAN;
        let err = assembler(vec![all, window(WindowLabel::Days30, 6)])
            .assemble()
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Assembly(_)));
    }

    #[test]
    fn test_report_serializes_with_stable_field_names() {
        let report = assembler(vec![window(WindowLabel::AllTime, 10), window(WindowLabel::Days30, 6)])
            .assemble()
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("regression").is_some());
        assert_eq!(json["windows"][1]["window"], "30d");
        assert_eq!(json["risk"]["sortino_ratio"]["kind"], "unbounded");

        let back: WalletReport = serde_json::from_value(json).unwrap();
        assert_eq!(back.wallet(), report.wallet());
        assert_eq!(back.tags(), report.tags());
        assert_eq!(back.risk().sortino_ratio, Metric::Unbounded);
    }
}
