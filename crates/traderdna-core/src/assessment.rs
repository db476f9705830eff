//! Structured verdicts derived from the metric vector
//!
//! These are enumerations only. Turning them into prose is left to whoever
//! presents the report.

use serde::{Deserialize, Serialize};

use crate::config::AssessmentThresholds;
use crate::models::{Metric, RegressionResult, RiskMetrics};
use crate::time_decay::TimeDecayResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetaProfile {
    Leveraged,
    Aggressive,
    Moderate,
    Independent,
}

impl BetaProfile {
    pub fn from_beta(beta: f64, t: &AssessmentThresholds) -> Self {
        if beta > t.beta_leveraged {
            BetaProfile::Leveraged
        } else if beta > t.beta_aggressive {
            BetaProfile::Aggressive
        } else if beta > t.beta_moderate {
            BetaProfile::Moderate
        } else {
            BetaProfile::Independent
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlphaGrade {
    Excellent,
    Good,
    Positive,
    Neutral,
    Negative,
}

impl AlphaGrade {
    /// Grade from annualized alpha.
    pub fn from_alpha(alpha_annualized: f64, t: &AssessmentThresholds) -> Self {
        if alpha_annualized > t.alpha_excellent {
            AlphaGrade::Excellent
        } else if alpha_annualized > t.alpha_good {
            AlphaGrade::Good
        } else if alpha_annualized > t.alpha_positive {
            AlphaGrade::Positive
        } else if alpha_annualized > t.alpha_neutral {
            AlphaGrade::Neutral
        } else {
            AlphaGrade::Negative
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn from_trade_count(closing_trades: usize, t: &AssessmentThresholds) -> Self {
        match closing_trades {
            n if n >= t.confidence_high_trades => Confidence::High,
            n if n >= t.confidence_medium_trades => Confidence::Medium,
            _ => Confidence::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Recommended,
    Caution,
    NotRecommended,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub beta_profile: BetaProfile,
    pub alpha_grade: AlphaGrade,
    /// `None` when the alpha share is undefined
    pub skill_based: Option<bool>,
    pub confidence: Confidence,
    pub recommendation: Recommendation,
}

pub fn assess(
    regression: &RegressionResult,
    decay: &TimeDecayResult,
    risk: &RiskMetrics,
    thresholds: &AssessmentThresholds,
) -> Assessment {
    let closing_trades = decay.all_time().map_or(0, |w| w.trade_count);

    Assessment {
        beta_profile: BetaProfile::from_beta(regression.beta, thresholds),
        alpha_grade: AlphaGrade::from_alpha(regression.alpha_annualized, thresholds),
        skill_based: regression
            .alpha_share
            .value()
            .map(|share| share > thresholds.skill_min_alpha_share),
        confidence: Confidence::from_trade_count(closing_trades, thresholds),
        recommendation: recommend(regression, decay, risk, thresholds),
    }
}

fn recommend(
    regression: &RegressionResult,
    decay: &TimeDecayResult,
    risk: &RiskMetrics,
    t: &AssessmentThresholds,
) -> Recommendation {
    let all_time = decay.all_time().map_or(Metric::Undefined, |w| w.win_rate);
    let recent = decay.recent().map_or(all_time, |w| w.win_rate);
    let holding_up = match (all_time.value(), recent.value()) {
        (Some(all), Some(now)) => now >= all * t.recommend_min_win_rate_retention,
        _ => false,
    };
    let total_pnl = decay.all_time().map_or(0.0, |w| w.total_return);

    if regression.alpha_share.exceeds(t.recommend_min_alpha_share)
        && risk.sharpe_ratio.exceeds(t.recommend_min_sharpe)
        && holding_up
    {
        Recommendation::Recommended
    } else if regression.alpha_share.below(t.reject_max_alpha_share)
        || risk.sharpe_ratio.below(t.reject_max_sharpe)
        || total_pnl < 0.0
    {
        Recommendation::NotRecommended
    } else {
        Recommendation::Caution
    }
}
