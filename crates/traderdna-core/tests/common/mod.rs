#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use traderdna_core::{AnalysisConfig, AnalysisRequest, ReturnPoint, ReturnSeries, Side, Trade};

pub const WALLET: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";

pub fn day(d: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(d)
}

pub fn sell_at(at: DateTime<Utc>, pnl: i64) -> Trade {
    Trade {
        timestamp: at,
        tx_ref: format!("sig-{}", at.timestamp()),
        token: "So11111111111111111111111111111111111111112".to_string(),
        token_symbol: "SOL".to_string(),
        side: Side::Sell,
        quantity: Decimal::ONE,
        unit_price: Decimal::from(100),
        realized_pnl: Decimal::from(pnl),
        fee: Decimal::ZERO,
    }
}

pub fn sell(d: i64, pnl: i64) -> Trade {
    sell_at(day(d), pnl)
}

/// Alternating benchmark covering `days` daily periods from day 0.
pub fn benchmark(days: i64) -> ReturnSeries {
    ReturnSeries::new(
        (0..days)
            .map(|d| {
                let value = match d % 3 {
                    0 => 0.012,
                    1 => -0.007,
                    _ => 0.003,
                };
                ReturnPoint::new(day(d), value)
            })
            .collect(),
    )
    .unwrap()
}

pub fn request(trades: Vec<Trade>, benchmark_days: i64) -> AnalysisRequest {
    AnalysisRequest {
        wallet: WALLET.to_string(),
        trades,
        benchmark: benchmark(benchmark_days),
        as_of: None,
        snapshot_version: None,
    }
}

/// Large fixed capital so no scenario depletes equity.
pub fn config() -> AnalysisConfig {
    AnalysisConfig {
        initial_capital: Some(100_000.0),
        ..AnalysisConfig::default()
    }
}
