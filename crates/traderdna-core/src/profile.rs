//! Trading activity and concentration profile.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::AnalysisResult;
use crate::ledger::{closing_trades, hold_periods};
use crate::models::{to_f64, Metric, Side, Trade, TradingProfile};
use crate::stats::PNL_EPSILON;

pub fn trading_profile(trades: &[Trade], as_of: DateTime<Utc>) -> AnalysisResult<TradingProfile> {
    let buy_count = trades.iter().filter(|t| t.side == Side::Buy).count();
    let unique_tokens: HashSet<&str> = trades.iter().map(|t| t.token.as_str()).collect();
    let trading_days: HashSet<NaiveDate> = trades.iter().map(|t| t.timestamp.date_naive()).collect();

    let trades_per_day = if trading_days.is_empty() {
        0.0
    } else {
        trades.len() as f64 / trading_days.len() as f64
    };

    let avg_trade_value = if trades.is_empty() {
        Metric::Undefined
    } else {
        Metric::from_f64(trades.iter().map(Trade::notional).sum::<f64>() / trades.len() as f64)
    };

    let holds = hold_periods(trades)?;
    let avg_hold_hours = if holds.is_empty() {
        Metric::Undefined
    } else {
        Metric::from_f64(holds.iter().map(|h| h.hours).sum::<f64>() / holds.len() as f64)
    };

    let days_since_last_trade = trades
        .last()
        .map(|t| ((as_of - t.timestamp).num_seconds() as f64 / 86_400.0).max(0.0))
        .unwrap_or(0.0);

    let (top_token_share, token_hhi) = token_concentration(trades);

    Ok(TradingProfile {
        total_fills: trades.len(),
        buy_count,
        sell_count: trades.len() - buy_count,
        unique_tokens: unique_tokens.len(),
        trading_days: trading_days.len(),
        trades_per_day,
        avg_trade_value,
        total_fees: trades.iter().map(|t| to_f64(t.fee)).sum(),
        avg_hold_hours,
        days_since_last_trade,
        top_token_share,
        token_hhi,
    })
}

/// Best token's share of profitable P&L, and the Herfindahl index over all
/// profitable tokens.
fn token_concentration(trades: &[Trade]) -> (Metric, Metric) {
    let mut by_token: BTreeMap<&str, f64> = BTreeMap::new();
    for trade in closing_trades(trades) {
        *by_token.entry(trade.token.as_str()).or_default() += trade.pnl();
    }

    let profits: Vec<f64> = by_token.into_values().filter(|p| *p > 0.0).collect();
    let total: f64 = profits.iter().sum();
    if total <= PNL_EPSILON {
        return (Metric::Undefined, Metric::Undefined);
    }

    let top = profits.iter().copied().fold(0.0, f64::max);
    let hhi = profits.iter().map(|p| (p / total).powi(2)).sum::<f64>();
    (Metric::from_f64(top / total), Metric::from_f64(hhi))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn trade(hours: i64, token: &str, side: Side, price: Decimal, pnl: Decimal) -> Trade {
        Trade {
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap() + Duration::hours(hours),
            tx_ref: String::new(),
            token: token.to_string(),
            token_symbol: String::new(),
            side,
            quantity: dec!(10),
            unit_price: price,
            realized_pnl: pnl,
            fee: dec!(0.5),
        }
    }

    #[test]
    fn test_profile_counts_and_holds() {
        let trades = vec![
            trade(0, "SOL", Side::Buy, dec!(100), Decimal::ZERO),
            trade(6, "BONK", Side::Buy, dec!(1), Decimal::ZERO),
            trade(12, "SOL", Side::Sell, dec!(110), dec!(99)),
            trade(30, "BONK", Side::Sell, dec!(2), dec!(9)),
        ];
        let as_of = trades[3].timestamp + Duration::days(3);
        let profile = trading_profile(&trades, as_of).unwrap();

        assert_eq!(profile.total_fills, 4);
        assert_eq!(profile.buy_count, 2);
        assert_eq!(profile.sell_count, 2);
        assert_eq!(profile.unique_tokens, 2);
        assert_eq!(profile.trading_days, 2);
        assert_eq!(profile.trades_per_day, 2.0);
        assert_eq!(profile.total_fees, 2.0);
        // SOL held 12h, BONK held 24h
        assert_eq!(profile.avg_hold_hours, Metric::Value(18.0));
        assert_eq!(profile.days_since_last_trade, 3.0);
        assert_eq!(profile.avg_trade_value, Metric::Value((1000.0 + 10.0 + 1100.0 + 20.0) / 4.0));
    }

    #[test]
    fn test_token_concentration() {
        let trades = vec![
            trade(0, "SOL", Side::Sell, dec!(1), dec!(90)),
            trade(1, "BONK", Side::Sell, dec!(1), dec!(10)),
            trade(2, "WIF", Side::Sell, dec!(1), dec!(-50)),
        ];
        let (top, hhi) = token_concentration(&trades);
        assert_eq!(top, Metric::Value(0.9));
        assert!((hhi.value().unwrap() - 0.82).abs() < 1e-12);
    }

    #[test]
    fn test_no_profitable_tokens() {
        let trades = vec![trade(0, "SOL", Side::Sell, dec!(1), dec!(-5))];
        let profile = trading_profile(&trades, trades[0].timestamp).unwrap();
        assert_eq!(profile.top_token_share, Metric::Undefined);
        assert_eq!(profile.avg_hold_hours, Metric::Undefined);
    }
}
