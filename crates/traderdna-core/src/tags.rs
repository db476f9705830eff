//! Behavior tagging
//!
//! A fixed, ordered list of threshold rules over the combined metric vector.
//! Rules are evaluated independently; any number of tags may apply at once.

use std::collections::BTreeSet;

use crate::config::TagThresholds;
use crate::models::{BehaviorTag, RegressionResult, RiskMetrics, TradingProfile};
use crate::time_decay::TimeDecayResult;

/// Everything a rule may look at.
#[derive(Debug, Clone, Copy)]
pub struct TagInputs<'a> {
    pub regression: &'a RegressionResult,
    pub decay: &'a TimeDecayResult,
    pub risk: &'a RiskMetrics,
    pub profile: &'a TradingProfile,
}

type Predicate = fn(&TagInputs<'_>, &TagThresholds) -> bool;

pub struct TagRule {
    pub tag: BehaviorTag,
    predicate: Predicate,
}

impl TagRule {
    pub fn matches(&self, inputs: &TagInputs<'_>, thresholds: &TagThresholds) -> bool {
        (self.predicate)(inputs, thresholds)
    }
}

pub const RULES: &[TagRule] = &[
    TagRule { tag: BehaviorTag::ConcentrationRisk, predicate: concentration_risk },
    TagRule { tag: BehaviorTag::TimeDecay, predicate: time_decay },
    TagRule { tag: BehaviorTag::Consistency, predicate: consistency },
    TagRule { tag: BehaviorTag::HighBetaRider, predicate: high_beta_rider },
    TagRule { tag: BehaviorTag::DrawdownTolerance, predicate: drawdown_tolerance },
    TagRule { tag: BehaviorTag::PoorPayoff, predicate: poor_payoff },
    TagRule { tag: BehaviorTag::TokenConcentration, predicate: token_concentration },
    TagRule { tag: BehaviorTag::Gambler, predicate: gambler },
    TagRule { tag: BehaviorTag::Sniper, predicate: sniper },
    TagRule { tag: BehaviorTag::Conservative, predicate: conservative },
    TagRule { tag: BehaviorTag::SmartMoney, predicate: smart_money },
    TagRule { tag: BehaviorTag::Dormant, predicate: dormant },
    TagRule { tag: BehaviorTag::ActiveTrader, predicate: active_trader },
    TagRule { tag: BehaviorTag::Whale, predicate: whale },
    TagRule { tag: BehaviorTag::DiamondHands, predicate: diamond_hands },
    TagRule { tag: BehaviorTag::PaperHands, predicate: paper_hands },
];

pub struct BehaviorTagger<'a> {
    thresholds: &'a TagThresholds,
}

impl<'a> BehaviorTagger<'a> {
    pub fn new(thresholds: &'a TagThresholds) -> Self {
        Self { thresholds }
    }

    pub fn tag(&self, inputs: &TagInputs<'_>) -> BTreeSet<BehaviorTag> {
        let tags: BTreeSet<BehaviorTag> = RULES
            .iter()
            .filter(|rule| rule.matches(inputs, self.thresholds))
            .map(|rule| rule.tag)
            .collect();
        tracing::debug!(tags = ?tags, "Evaluated behavior rules");
        tags
    }
}

fn concentration_risk(i: &TagInputs<'_>, t: &TagThresholds) -> bool {
    i.risk
        .largest_single_trade_contribution_pct
        .exceeds(t.concentration_threshold)
}

fn time_decay(i: &TagInputs<'_>, t: &TagThresholds) -> bool {
    let (Some(all), Some(recent)) = (i.decay.all_time(), i.decay.recent()) else {
        return false;
    };
    if !(all.sample_sufficient && recent.sample_sufficient) {
        return false;
    }
    match (all.win_rate.value(), recent.win_rate.value()) {
        (Some(all), Some(recent)) => all - recent > t.decay_delta_threshold,
        _ => false,
    }
}

fn consistency(i: &TagInputs<'_>, t: &TagThresholds) -> bool {
    let rates: Vec<f64> = i
        .decay
        .windows
        .iter()
        .filter(|w| w.sample_sufficient)
        .filter_map(|w| w.win_rate.value())
        .collect();
    if rates.len() < 2 {
        return false;
    }
    let high = rates.iter().copied().fold(f64::MIN, f64::max);
    let low = rates.iter().copied().fold(f64::MAX, f64::min);
    high - low <= t.consistency_band
}

fn high_beta_rider(i: &TagInputs<'_>, t: &TagThresholds) -> bool {
    i.regression.beta_share.exceeds(t.beta_share_threshold)
        && i.regression.r_squared.exceeds(t.r_squared_threshold)
}

fn drawdown_tolerance(i: &TagInputs<'_>, t: &TagThresholds) -> bool {
    i.risk.max_drawdown > t.drawdown_tolerance_threshold
        && i.risk.sharpe_ratio.exceeds(t.drawdown_tolerance_min_sharpe)
}

fn poor_payoff(i: &TagInputs<'_>, t: &TagThresholds) -> bool {
    i.risk.profit_factor.below(t.poor_payoff_max_profit_factor)
        && i.risk.win_rate.exceeds(t.poor_payoff_min_win_rate)
}

fn token_concentration(i: &TagInputs<'_>, t: &TagThresholds) -> bool {
    i.profile.unique_tokens > 1 && i.profile.top_token_share.exceeds(t.token_concentration_threshold)
}

fn gambler(i: &TagInputs<'_>, t: &TagThresholds) -> bool {
    i.profile.trades_per_day > t.high_frequency_threshold
        && i.risk.win_rate.below(t.low_win_rate_threshold)
        && i.risk.profit_factor.below(t.gambler_max_profit_factor)
}

fn sniper(i: &TagInputs<'_>, t: &TagThresholds) -> bool {
    i.risk.win_rate.exceeds(t.sniper_min_win_rate)
        && i.profile.trades_per_day < t.sniper_max_trades_per_day
        && i.risk.profit_factor.exceeds(t.sniper_min_profit_factor)
}

fn conservative(i: &TagInputs<'_>, t: &TagThresholds) -> bool {
    i.risk.sharpe_ratio.exceeds(t.conservative_min_sharpe)
        && i.risk.max_drawdown < t.conservative_max_drawdown
}

fn smart_money(i: &TagInputs<'_>, t: &TagThresholds) -> bool {
    i.regression.alpha_share.exceeds(t.smart_money_min_alpha_share)
        && i.risk.win_rate.exceeds(t.smart_money_min_win_rate)
        && i.risk.sharpe_ratio.exceeds(t.smart_money_min_sharpe)
}

fn dormant(i: &TagInputs<'_>, t: &TagThresholds) -> bool {
    i.profile.days_since_last_trade > t.dormant_after_days
}

fn active_trader(i: &TagInputs<'_>, t: &TagThresholds) -> bool {
    i.profile.trades_per_day > t.active_trader_trades_per_day
}

fn whale(i: &TagInputs<'_>, t: &TagThresholds) -> bool {
    i.profile.avg_trade_value.exceeds(t.whale_avg_trade_value)
}

fn diamond_hands(i: &TagInputs<'_>, t: &TagThresholds) -> bool {
    i.profile.avg_hold_hours.exceeds(t.diamond_hands_min_hold_hours)
}

fn paper_hands(i: &TagInputs<'_>, t: &TagThresholds) -> bool {
    i.profile.avg_hold_hours.exceeds(0.0)
        && i.profile.avg_hold_hours.below(t.paper_hands_max_hold_hours)
}
