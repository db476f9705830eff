//! Trade ledger validation and FIFO lot matching.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};
use crate::models::{to_f64, Side, Trade};

/// Reject malformed or out-of-order ledgers. Nothing is repaired.
pub fn validate_ledger(trades: &[Trade]) -> AnalysisResult<()> {
    for (index, trade) in trades.iter().enumerate() {
        if trade.token.trim().is_empty() {
            return Err(AnalysisError::Validation(format!(
                "trade #{} ({}) has an empty token identifier",
                index, trade.tx_ref
            )));
        }
        if trade.quantity.is_sign_negative()
            || trade.unit_price.is_sign_negative()
            || trade.fee.is_sign_negative()
        {
            return Err(AnalysisError::Validation(format!(
                "trade #{} ({}) has a negative quantity, price or fee",
                index, trade.tx_ref
            )));
        }
    }

    for (index, pair) in trades.windows(2).enumerate() {
        if pair[1].timestamp < pair[0].timestamp {
            return Err(AnalysisError::Validation(format!(
                "trade #{} at {} precedes trade #{} at {}; ledger must be ordered by timestamp",
                index + 1,
                pair[1].timestamp,
                index,
                pair[0].timestamp
            )));
        }
    }

    Ok(())
}

/// Trades that realize P&L.
pub fn closing_trades(trades: &[Trade]) -> impl Iterator<Item = &Trade> {
    trades.iter().filter(|t| t.is_closing())
}

/// Holding time of one matched quantity, buy to sell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldPeriod {
    pub token: String,
    pub hours: f64,
    pub quantity: f64,
}

/// Recompute `realized_pnl` from FIFO buy lots, per token.
///
/// Buy fees are folded into the lot cost and the sell fee is deducted from
/// the sell's P&L. Sell quantity with no matching lot realizes nothing.
///
/// Fails with `Validation` when a lot cost or P&L leaves the decimal range.
pub fn realize_fifo(trades: &[Trade]) -> AnalysisResult<Vec<Trade>> {
    let matched = match_lots(trades)?;
    Ok(trades
        .iter()
        .zip(matched.realized)
        .map(|(trade, pnl)| Trade {
            realized_pnl: pnl,
            ..trade.clone()
        })
        .collect())
}

/// FIFO holding periods for every sell matched against earlier buys.
pub fn hold_periods(trades: &[Trade]) -> AnalysisResult<Vec<HoldPeriod>> {
    Ok(match_lots(trades)?.holds)
}

struct Lot {
    quantity: Decimal,
    unit_cost: Decimal,
    opened_at: DateTime<Utc>,
}

struct MatchedLots {
    realized: Vec<Decimal>,
    holds: Vec<HoldPeriod>,
}

fn match_lots(trades: &[Trade]) -> AnalysisResult<MatchedLots> {
    let mut books: HashMap<&str, VecDeque<Lot>> = HashMap::new();
    let mut realized = Vec::with_capacity(trades.len());
    let mut holds = Vec::new();

    for trade in trades {
        let book = books.entry(trade.token.as_str()).or_default();

        match trade.side {
            Side::Buy => {
                if !trade.quantity.is_zero() {
                    book.push_back(Lot {
                        quantity: trade.quantity,
                        unit_cost: trade
                            .fee
                            .checked_div(trade.quantity)
                            .and_then(|fee_per_unit| trade.unit_price.checked_add(fee_per_unit))
                            .ok_or_else(|| overflow(trade, "lot cost"))?,
                        opened_at: trade.timestamp,
                    });
                }
                realized.push(Decimal::ZERO);
            }
            Side::Sell => {
                let mut remaining = trade.quantity;
                let mut pnl = Decimal::ZERO;

                while remaining > Decimal::ZERO {
                    let Some(lot) = book.front_mut() else {
                        tracing::debug!(
                            token = %trade.token,
                            unmatched = %remaining,
                            "Sell exceeds known buy lots"
                        );
                        break;
                    };

                    let filled = remaining.min(lot.quantity);
                    pnl = trade
                        .unit_price
                        .checked_sub(lot.unit_cost)
                        .and_then(|spread| filled.checked_mul(spread))
                        .and_then(|gain| pnl.checked_add(gain))
                        .ok_or_else(|| overflow(trade, "realized P&L"))?;
                    holds.push(HoldPeriod {
                        token: trade.token.clone(),
                        hours: (trade.timestamp - lot.opened_at).num_seconds() as f64 / 3600.0,
                        quantity: to_f64(filled),
                    });

                    lot.quantity -= filled;
                    remaining -= filled;
                    if lot.quantity.is_zero() {
                        book.pop_front();
                    }
                }

                realized.push(
                    pnl.checked_sub(trade.fee)
                        .ok_or_else(|| overflow(trade, "realized P&L"))?,
                );
            }
        }
    }

    Ok(MatchedLots { realized, holds })
}

fn overflow(trade: &Trade, what: &str) -> AnalysisError {
    AnalysisError::Validation(format!(
        "trade {} ({}): {} exceeds the decimal range",
        trade.tx_ref, trade.token, what
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn trade(hour: i64, token: &str, side: Side, quantity: Decimal, price: Decimal) -> Trade {
        Trade {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + Duration::hours(hour),
            tx_ref: format!("tx{}", hour),
            token: token.to_string(),
            token_symbol: String::new(),
            side,
            quantity,
            unit_price: price,
            realized_pnl: Decimal::ZERO,
            fee: Decimal::ZERO,
        }
    }

    #[test]
    fn test_validate_rejects_out_of_order() {
        let trades = vec![
            trade(5, "SOL", Side::Buy, dec!(1), dec!(100)),
            trade(1, "SOL", Side::Sell, dec!(1), dec!(110)),
        ];
        assert!(matches!(
            validate_ledger(&trades),
            Err(AnalysisError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_accepts_same_block_trades() {
        let trades = vec![
            trade(1, "SOL", Side::Buy, dec!(1), dec!(100)),
            trade(1, "BONK", Side::Buy, dec!(10), dec!(0.01)),
        ];
        assert!(validate_ledger(&trades).is_ok());
    }

    #[test]
    fn test_validate_rejects_negative_fee() {
        let mut bad = trade(1, "SOL", Side::Buy, dec!(1), dec!(100));
        bad.fee = dec!(-0.1);
        assert!(validate_ledger(&[bad]).is_err());
    }

    #[test]
    fn test_fifo_realizes_across_lots() {
        let mut buy_with_fee = trade(0, "SOL", Side::Buy, dec!(2), dec!(100));
        buy_with_fee.fee = dec!(2);
        let trades = vec![
            buy_with_fee,
            trade(1, "SOL", Side::Buy, dec!(2), dec!(120)),
            trade(2, "SOL", Side::Sell, dec!(3), dec!(130)),
        ];
        let realized = realize_fifo(&trades).unwrap();

        assert_eq!(realized[0].realized_pnl, Decimal::ZERO);
        assert_eq!(realized[1].realized_pnl, Decimal::ZERO);
        // 2 @ (130 - 101) + 1 @ (130 - 120)
        assert_eq!(realized[2].realized_pnl, dec!(68));
    }

    #[test]
    fn test_fifo_keeps_tokens_separate_and_deducts_sell_fee() {
        let mut sell = trade(3, "BONK", Side::Sell, dec!(100), dec!(0.02));
        sell.fee = dec!(0.5);
        let trades = vec![
            trade(0, "SOL", Side::Buy, dec!(1), dec!(100)),
            trade(1, "BONK", Side::Buy, dec!(100), dec!(0.01)),
            sell,
        ];
        let realized = realize_fifo(&trades).unwrap();
        assert_eq!(realized[2].realized_pnl, dec!(0.5));
    }

    #[test]
    fn test_unmatched_sell_realizes_only_fee() {
        let mut sell = trade(0, "SOL", Side::Sell, dec!(1), dec!(100));
        sell.fee = dec!(1);
        let realized = realize_fifo(&[sell]).unwrap();
        assert_eq!(realized[0].realized_pnl, dec!(-1));
    }

    #[test]
    fn test_hold_periods() {
        let trades = vec![
            trade(0, "SOL", Side::Buy, dec!(1), dec!(100)),
            trade(10, "SOL", Side::Buy, dec!(1), dec!(100)),
            trade(24, "SOL", Side::Sell, dec!(2), dec!(110)),
        ];
        let holds = hold_periods(&trades).unwrap();
        assert_eq!(holds.len(), 2);
        assert_eq!(holds[0].hours, 24.0);
        assert_eq!(holds[1].hours, 14.0);
    }

    #[test]
    fn test_tiny_quantity_with_large_fee_is_rejected() {
        let mut buy = trade(0, "SOL", Side::Buy, dec!(0.0000000000000000000001), dec!(1));
        buy.fee = dec!(10000000000);
        let trades = vec![buy, trade(1, "SOL", Side::Sell, dec!(1), dec!(1))];

        assert!(validate_ledger(&trades).is_ok());
        assert!(matches!(
            realize_fifo(&trades),
            Err(AnalysisError::Validation(_))
        ));
        assert!(hold_periods(&trades).is_err());
    }

    #[test]
    fn test_pnl_outside_decimal_range_is_rejected() {
        let trades = vec![
            trade(0, "SOL", Side::Buy, dec!(100000000000000000), dec!(0.000000000001)),
            trade(1, "SOL", Side::Sell, dec!(100000000000000000), dec!(1000000000000)),
        ];
        let err = realize_fifo(&trades).unwrap_err();
        assert!(err.to_string().contains("tx1"));
    }

    #[test]
    fn test_closing_trades_are_sells() {
        let trades = vec![
            trade(0, "SOL", Side::Buy, dec!(1), dec!(100)),
            trade(1, "SOL", Side::Sell, dec!(1), dec!(110)),
        ];
        let closing: Vec<&Trade> = closing_trades(&trades).collect();
        assert_eq!(closing.len(), 1);
        assert_eq!(closing[0].tx_ref, "tx1");
    }
}
