mod common;

use approx::assert_relative_eq;
use chrono::Duration;
use common::{config, day, request, sell, sell_at};
use traderdna_core::{
    AnalysisConfig, BehaviorTag, DegenerateInput, Engine, Metric, NonTradingPeriods, Recommendation,
    WindowLabel,
};

#[test]
fn small_wins_large_losses_is_poor_payoff_not_concentration() {
    let mut trades: Vec<_> = (0..8).map(|d| sell(d, 50)).collect();
    trades.push(sell(8, -1000));
    trades.push(sell(9, -900));

    let engine = Engine::new(config()).unwrap();
    let report = engine.analyze(&request(trades, 10)).unwrap();
    let risk = report.risk();

    assert_relative_eq!(risk.profit_factor.value().unwrap(), 400.0 / 1900.0, epsilon = 1e-12);
    assert_eq!(risk.win_rate, Metric::Value(0.8));
    assert!(risk.profit_factor.below(1.0));
    assert!(!report.has_tag(BehaviorTag::ConcentrationRisk));
    assert!(report.has_tag(BehaviorTag::PoorPayoff));
    assert_eq!(risk.max_win_streak, 8);
    assert_eq!(risk.max_loss_streak, 2);
    assert_eq!(report.assessment().recommendation, Recommendation::NotRecommended);
}

#[test]
fn recent_collapse_is_tagged_time_decay() {
    let as_of = day(130);
    let mut trades = Vec::new();
    // Ten winners 120-111 days before as_of
    for i in 0..10 {
        trades.push(sell_at(as_of - Duration::days(120 - i), 100));
    }
    // Ten trades 25-16 days before as_of, one winner
    for i in 0..10 {
        let pnl = if i == 0 { 100 } else { -50 };
        trades.push(sell_at(as_of - Duration::days(25 - i), pnl));
    }

    let mut req = request(trades, 131);
    req.as_of = Some(as_of);
    let report = Engine::new(config()).unwrap().analyze(&req).unwrap();

    let all_time = report.window(WindowLabel::AllTime).unwrap();
    let month = report.window(WindowLabel::Days30).unwrap();
    assert_eq!(all_time.win_rate, Metric::Value(0.55));
    assert_eq!(month.win_rate, Metric::Value(0.1));
    assert!(all_time.sample_sufficient && month.sample_sufficient);
    assert!(!report.window(WindowLabel::Days7).unwrap().sample_sufficient);

    assert_eq!(report.decay().recent_window, Some(WindowLabel::Days30));
    assert!(report.decay().severe_decay);
    assert!(report.has_tag(BehaviorTag::TimeDecay));
    assert!(!report.has_tag(BehaviorTag::Consistency));
}

#[test]
fn one_trade_dominating_pnl_is_concentration_risk() {
    let mut trades = vec![sell(0, 10)];
    trades.extend((1..19).map(|d| sell(d, 5)));
    trades.push(sell(19, 900));

    let report = Engine::new(config()).unwrap().analyze(&request(trades, 20)).unwrap();
    let risk = report.risk();

    assert_relative_eq!(
        risk.largest_single_trade_contribution_pct.value().unwrap(),
        0.9,
        epsilon = 1e-12
    );
    assert!(report.has_tag(BehaviorTag::ConcentrationRisk));
    assert_eq!(risk.profit_factor, Metric::Unbounded);
    assert!(report.degeneracies().contains(&DegenerateInput::NoLosingTrades));
}

#[test]
fn window_boundary_includes_exact_start() {
    let as_of = day(60);
    let boundary = as_of - Duration::days(30);
    let trades = vec![
        sell(0, 10),
        sell_at(boundary - Duration::seconds(1), -500),
        sell_at(boundary, 20),
        sell(59, 30),
    ];

    let mut req = request(trades, 61);
    req.as_of = Some(as_of);
    let report = Engine::new(config()).unwrap().analyze(&req).unwrap();

    let month = report.window(WindowLabel::Days30).unwrap();
    assert_eq!(month.trade_count, 2);
    assert_eq!(month.total_return, 50.0);
    assert_eq!(month.win_rate, Metric::Value(1.0));
    assert_eq!(report.window(WindowLabel::AllTime).unwrap().trade_count, 4);
}

#[test]
fn identical_inputs_give_identical_reports() {
    let trades = (0..30)
        .map(|d| sell(d, if d % 4 == 0 { -40 } else { 25 + d }))
        .collect();
    let req = request(trades, 30);
    let engine = Engine::new(config()).unwrap();

    let first = engine.analyze(&req).unwrap();
    let second = engine.analyze(&req).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn wallet_tracking_benchmark_is_high_beta_rider() {
    // Daily P&L equal to the benchmark return on a fixed capital basis
    let capital = 100_000.0;
    let bench = common::benchmark(30);
    let mut equity = capital;
    let mut trades = Vec::new();
    for (d, point) in bench.points().iter().enumerate() {
        let pnl = equity * point.value.unwrap();
        equity += pnl;
        let mut trade = sell(d as i64, 0);
        trade.realized_pnl = rust_decimal::Decimal::from_f64_retain(pnl).unwrap();
        trades.push(trade);
    }

    let report = Engine::new(config()).unwrap().analyze(&request(trades, 30)).unwrap();
    let regression = report.regression();
    assert_relative_eq!(regression.beta, 1.0, epsilon = 1e-6);
    assert_relative_eq!(regression.alpha, 0.0, epsilon = 1e-8);
    assert!(regression.r_squared.exceeds(0.99));
    assert!(report.has_tag(BehaviorTag::HighBetaRider));
}

#[test]
fn missing_policy_excludes_idle_days() {
    let trades = vec![sell(0, 100), sell(5, -50), sell(10, 80)];
    let cfg = AnalysisConfig {
        non_trading_periods: NonTradingPeriods::Missing,
        ..config()
    };
    let report = Engine::new(cfg).unwrap().analyze(&request(trades.clone(), 11)).unwrap();
    assert_eq!(report.observations(), 3);
    assert_eq!(report.wallet_equity().len(), 11);

    let zeroed = Engine::new(config()).unwrap().analyze(&request(trades, 11)).unwrap();
    assert_eq!(zeroed.observations(), 11);
}

#[test]
fn flat_benchmark_is_flagged_not_fatal() {
    let trades = (0..6).map(|d| sell(d, 10 * (d + 1))).collect();
    let mut req = request(trades, 6);
    req.benchmark = traderdna_core::ReturnSeries::new(
        (0..6).map(|d| traderdna_core::ReturnPoint::new(day(d), 0.0)).collect(),
    )
    .unwrap();

    let report = Engine::new(config()).unwrap().analyze(&req).unwrap();
    assert!(report.regression().degenerate_regression);
    assert_eq!(report.regression().beta, 0.0);
    assert!(report.degeneracies().contains(&DegenerateInput::FlatBenchmark));
}
