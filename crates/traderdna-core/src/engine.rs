//! Analysis engine
//!
//! Runs the full pipeline for one wallet:
//! ledger → aligned returns → {decomposition, time decay, risk, profile} →
//! tags → report. The middle stage runs in parallel with a join barrier
//! before tagging. The engine holds no state between calls.

use chrono::{DateTime, Utc};

use crate::alpha_beta::AlphaBetaDecomposer;
use crate::assessment::assess;
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AnalysisResult, WalletError};
use crate::ledger::validate_ledger;
use crate::models::{AnalysisRequest, Trade};
use crate::profile::trading_profile;
use crate::report::{ReportAssembler, WalletReport};
use crate::returns::ReturnSeriesBuilder;
use crate::risk::{equity_curve, RiskMetricsCalculator};
use crate::tags::{BehaviorTagger, TagInputs};
use crate::time_decay::TimeDecayAnalyzer;

#[derive(Debug, Clone)]
pub struct Engine {
    config: AnalysisConfig,
}

impl Engine {
    pub fn new(config: AnalysisConfig) -> AnalysisResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn analyze(&self, request: &AnalysisRequest) -> Result<WalletReport, WalletError> {
        let _span = tracing::info_span!("analyze", wallet = %request.wallet).entered();

        self.run(request).map_err(|e| {
            tracing::warn!(wallet = %request.wallet, code = e.code(), error = %e, "Wallet analysis failed");
            WalletError::new(request.wallet.clone(), e)
        })
    }

    fn run(&self, request: &AnalysisRequest) -> AnalysisResult<WalletReport> {
        validate_ledger(&request.trades)?;

        let as_of = resolve_as_of(request)?;
        let trades = trades_until(&request.trades, as_of);

        let built = ReturnSeriesBuilder::new(&self.config).build(trades, &request.benchmark, as_of)?;
        let aligned = &built.aligned;

        let decomposer = AlphaBetaDecomposer::new(&self.config);
        let decay_analyzer = TimeDecayAnalyzer::new(&self.config);
        let risk_calculator = RiskMetricsCalculator::new(&self.config);

        let (regression, (time_decay, (risk, profile))) = rayon::join(
            || decomposer.decompose(aligned),
            || {
                rayon::join(
                    || decay_analyzer.analyze(trades, as_of),
                    || {
                        rayon::join(
                            || risk_calculator.calculate(aligned.wallet(), trades),
                            || trading_profile(trades, as_of),
                        )
                    },
                )
            },
        );
        let regression = regression?;
        let time_decay = time_decay?;
        let risk = risk?;
        let profile = profile?;

        let tags = BehaviorTagger::new(&self.config.thresholds).tag(&TagInputs {
            regression: &regression,
            decay: &time_decay,
            risk: &risk,
            profile: &profile,
        });
        let assessment = assess(&regression, &time_decay, &risk, &self.config.assessment);

        let degeneracies: Vec<_> = built
            .degeneracies
            .iter()
            .copied()
            .chain(regression.degeneracies())
            .chain(risk.degeneracies())
            .collect();
        if !degeneracies.is_empty() {
            tracing::warn!(?degeneracies, "Some metrics are undefined for this wallet");
        }

        let report = ReportAssembler::new(self.config.ordered_windows())
            .wallet(request.wallet.clone())
            .as_of(as_of)
            .equity_curves(equity_curve(aligned.wallet()), equity_curve(aligned.benchmark()))
            .regression(regression)
            .time_decay(time_decay)
            .risk(risk)
            .profile(profile)
            .tags(tags)
            .assessment(assessment)
            .degeneracies(degeneracies)
            .assemble()?;

        tracing::info!(
            wallet = %report.wallet(),
            observations = report.observations(),
            tags = report.tags().len(),
            recommendation = ?report.assessment().recommendation,
            "Wallet analysis complete"
        );

        Ok(report)
    }
}

/// Explicit `as_of`, otherwise the latest trade.
fn resolve_as_of(request: &AnalysisRequest) -> AnalysisResult<DateTime<Utc>> {
    match (request.as_of, request.trades.last()) {
        (Some(as_of), _) => Ok(as_of),
        (None, Some(last)) => Ok(last.timestamp),
        (None, None) => Err(AnalysisError::InsufficientData(
            "ledger is empty".to_string(),
        )),
    }
}

/// Prefix of an ordered ledger at or before `as_of`.
fn trades_until(trades: &[Trade], as_of: DateTime<Utc>) -> &[Trade] {
    let end = trades.partition_point(|t| t.timestamp <= as_of);
    &trades[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReturnPoint, ReturnSeries, Side};
    use chrono::{Duration, TimeZone};
    use rust_decimal::Decimal;

    fn day(d: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap() + Duration::days(d)
    }

    fn sell(d: i64, pnl: i64) -> Trade {
        Trade {
            timestamp: day(d),
            tx_ref: format!("sig{}", d),
            token: "SOL".to_string(),
            token_symbol: "SOL".to_string(),
            side: Side::Sell,
            quantity: Decimal::ONE,
            unit_price: Decimal::from(100),
            realized_pnl: Decimal::from(pnl),
            fee: Decimal::ZERO,
        }
    }

    fn benchmark(days: i64) -> ReturnSeries {
        ReturnSeries::new(
            (0..days)
                .map(|d| ReturnPoint::new(day(d), if d % 2 == 0 { 0.01 } else { -0.005 }))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = AnalysisConfig {
            periods_per_year: 0,
            ..AnalysisConfig::default()
        };
        assert!(Engine::new(config).is_err());
    }

    #[test]
    fn test_failures_carry_wallet_id() {
        let engine = Engine::new(AnalysisConfig::default()).unwrap();
        let request = AnalysisRequest {
            wallet: "wallet-a".to_string(),
            trades: vec![sell(0, 10)],
            benchmark: benchmark(5),
            as_of: None,
            snapshot_version: None,
        };
        let err = engine.analyze(&request).unwrap_err();
        assert_eq!(err.wallet, "wallet-a");
        assert_eq!(err.code(), "INSUFFICIENT_DATA");
    }

    #[test]
    fn test_out_of_order_ledger_is_rejected() {
        let engine = Engine::new(AnalysisConfig::default()).unwrap();
        let request = AnalysisRequest {
            wallet: "wallet-b".to_string(),
            trades: vec![sell(3, 10), sell(1, 10), sell(4, -5)],
            benchmark: benchmark(6),
            as_of: None,
            snapshot_version: None,
        };
        assert_eq!(engine.analyze(&request).unwrap_err().code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_trades_after_as_of_are_dropped() {
        let trades = vec![sell(0, 1), sell(2, 1), sell(5, 1)];
        assert_eq!(trades_until(&trades, day(2)).len(), 2);
        assert_eq!(trades_until(&trades, day(10)).len(), 3);
    }

    #[test]
    fn test_analyze_produces_report() {
        let engine = Engine::new(AnalysisConfig::default()).unwrap();
        let request = AnalysisRequest {
            wallet: "wallet-c".to_string(),
            trades: vec![sell(0, 20), sell(1, -10), sell(2, 30), sell(3, 15), sell(4, -5)],
            benchmark: benchmark(5),
            as_of: None,
            snapshot_version: None,
        };
        let report = engine.analyze(&request).unwrap();
        assert_eq!(report.wallet(), "wallet-c");
        assert_eq!(report.as_of(), day(4));
        assert_eq!(report.observations(), 5);
        assert_eq!(report.windows().len(), 5);
        assert_eq!(report.wallet_equity().len(), 5);
        assert_eq!(report.risk().win_rate.value(), Some(0.6));
    }

    #[test]
    fn test_lot_arithmetic_overflow_fails_the_wallet() {
        let engine = Engine::new(AnalysisConfig::default()).unwrap();
        let lots = Decimal::from(100_000_000_000_000_000i64);
        let buy = Trade {
            side: Side::Buy,
            quantity: lots,
            unit_price: Decimal::new(1, 12),
            realized_pnl: Decimal::ZERO,
            ..sell(0, 0)
        };
        let huge_sell = Trade {
            quantity: lots,
            unit_price: Decimal::from(1_000_000_000_000i64),
            ..sell(1, 10)
        };
        let request = AnalysisRequest {
            wallet: "wallet-d".to_string(),
            trades: vec![buy, huge_sell, sell(2, -5), sell(3, 8)],
            benchmark: benchmark(5),
            as_of: None,
            snapshot_version: None,
        };

        let err = engine.analyze(&request).unwrap_err();
        assert_eq!(err.wallet, "wallet-d");
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
