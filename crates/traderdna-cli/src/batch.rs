//! Batch analysis
//!
//! Wallets are independent, so the batch fans out across the rayon pool.
//! Output order follows input order. One wallet failing never affects
//! another.

use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use traderdna_core::{AnalysisRequest, Engine, WalletReport};

use crate::cache::ReportCache;
use crate::error::{CliError, Result};

/// One line of batch output.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchLine {
    Ok {
        wallet: String,
        report: Arc<WalletReport>,
    },
    Error {
        /// Absent when the input line could not be parsed
        wallet: Option<String>,
        line: usize,
        code: String,
        message: String,
    },
}

impl BatchLine {
    pub fn is_ok(&self) -> bool {
        matches!(self, BatchLine::Ok { .. })
    }

    fn failed(wallet: Option<String>, line: usize, error: &CliError) -> Self {
        BatchLine::Error {
            wallet,
            line,
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}

pub fn run(
    engine: &Engine,
    cache: &ReportCache,
    requests: Vec<(usize, Result<AnalysisRequest>)>,
) -> Vec<BatchLine> {
    requests
        .into_par_iter()
        .map(|(line, parsed)| match parsed {
            Ok(request) => analyze_one(engine, cache, line, &request),
            Err(e) => {
                tracing::warn!(line, error = %e, "Skipping unreadable request");
                BatchLine::failed(None, line, &e)
            }
        })
        .collect()
}

fn analyze_one(engine: &Engine, cache: &ReportCache, line: usize, request: &AnalysisRequest) -> BatchLine {
    match cache.get_or_analyze(request, || engine.analyze(request)) {
        Ok(report) => BatchLine::Ok {
            wallet: request.wallet.clone(),
            report,
        },
        Err(e) => BatchLine::failed(Some(request.wallet.clone()), line, &CliError::from(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use traderdna_core::{AnalysisConfig, ReturnPoint, ReturnSeries, Side, Trade};

    fn day(d: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + Duration::days(d)
    }

    fn request(wallet: &str, trade_days: i64) -> AnalysisRequest {
        let trades = (0..trade_days)
            .map(|d| Trade {
                timestamp: day(d),
                tx_ref: format!("{}-{}", wallet, d),
                token: "SOL".to_string(),
                token_symbol: "SOL".to_string(),
                side: Side::Sell,
                quantity: Decimal::ONE,
                unit_price: Decimal::from(150),
                realized_pnl: Decimal::from(if d % 3 == 0 { -20 } else { 35 }),
                fee: Decimal::ZERO,
            })
            .collect();
        let benchmark = ReturnSeries::new(
            (0..10)
                .map(|d| ReturnPoint::new(day(d), if d % 2 == 0 { 0.02 } else { -0.01 }))
                .collect(),
        )
        .unwrap();
        AnalysisRequest {
            wallet: wallet.to_string(),
            trades,
            benchmark,
            as_of: None,
            snapshot_version: Some("snap-1".to_string()),
        }
    }

    #[test]
    fn test_batch_keeps_order_and_isolates_failures() {
        let engine = Engine::new(AnalysisConfig::default()).unwrap();
        let cache = ReportCache::new(&CacheConfig::default());
        let requests = vec![
            (1, Ok(request("alpha", 10))),
            (2, Ok(request("beta", 1))),
            (3, Err(CliError::InvalidParameter("bad".into()))),
            (4, Ok(request("gamma", 8))),
        ];

        let lines = run(&engine, &cache, requests);
        assert_eq!(lines.len(), 4);
        assert!(lines[0].is_ok());
        assert!(lines[3].is_ok());

        match &lines[1] {
            BatchLine::Error { wallet, code, line, .. } => {
                assert_eq!(wallet.as_deref(), Some("beta"));
                assert_eq!(code, "INSUFFICIENT_DATA");
                assert_eq!(*line, 2);
            }
            other => panic!("expected error line, got {:?}", other),
        }
        match &lines[2] {
            BatchLine::Error { wallet, code, .. } => {
                assert!(wallet.is_none());
                assert_eq!(code, "INPUT_ERROR");
            }
            other => panic!("expected error line, got {:?}", other),
        }
    }

    #[test]
    fn test_output_line_shape() {
        let engine = Engine::new(AnalysisConfig::default()).unwrap();
        let cache = ReportCache::new(&CacheConfig::default());
        let lines = run(&engine, &cache, vec![(1, Ok(request("alpha", 10)))]);

        let json = serde_json::to_value(&lines[0]).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["wallet"], "alpha");
        assert_eq!(json["report"]["wallet"], "alpha");
    }

    #[test]
    fn test_cache_computes_once_per_key() {
        let engine = Engine::new(AnalysisConfig::default()).unwrap();
        let cache = ReportCache::new(&CacheConfig::default());
        let req = request("alpha", 10);
        let calls = AtomicUsize::new(0);

        let analyze = || {
            calls.fetch_add(1, Ordering::SeqCst);
            engine.analyze(&req)
        };
        let first = cache.get_or_analyze(&req, analyze).unwrap();
        let second = cache.get_or_analyze(&req, analyze).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }
}
