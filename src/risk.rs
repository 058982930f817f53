// ===============================
// src/risk.rs
// ===============================
//
// Metric classifier. Two independent threshold tables; banner and gauge
// consumers read different outputs:
// - banner : status text above the panels (risk % AND |daily pnl %|)
//     High     if risk > 4   or |pnl| > 2.5
//     Moderate if risk > 2   or |pnl| > 1.5
// - gauge  : circular gauge + badge (risk % only)
//     High     if risk >= 5
//     Moderate if risk >= 2
//
// Everything here is pure; non-finite inputs count as 0.
//

use crate::domain::{
    ConfidenceTier, PortfolioSnapshot, PortfolioView, SeverityLevel, Signal, SignalView,
};

pub const SUGGEST_REDUCE: &str = "Consider reducing position sizes";
pub const SUGGEST_CORRELATION: &str = "Monitor position correlation";
pub const SUGGEST_PNL_LIMIT: &str = "Daily P&L approaching limits";
pub const SUGGEST_DEFAULT: &str = "Portfolio operating within safe parameters";

/// Risk % at which the gauge is drawn full.
const GAUGE_FULL_RISK: f64 = 10.0;

fn metric(x: f64) -> f64 {
    if x.is_finite() { x } else { 0.0 }
}

/// Banner/status-text table.
pub fn classify_banner(risk_percent: f64, daily_pnl_percent: f64) -> SeverityLevel {
    let risk = metric(risk_percent);
    let pnl = metric(daily_pnl_percent).abs();
    if risk > 4.0 || pnl > 2.5 {
        SeverityLevel::High
    } else if risk > 2.0 || pnl > 1.5 {
        SeverityLevel::Moderate
    } else {
        SeverityLevel::Safe
    }
}

/// Gauge/badge table. Ignores pnl.
pub fn classify_gauge(risk_percent: f64) -> SeverityLevel {
    let risk = metric(risk_percent);
    if risk < 2.0 {
        SeverityLevel::Safe
    } else if risk < 5.0 {
        SeverityLevel::Moderate
    } else {
        SeverityLevel::High
    }
}

pub fn banner_message(level: SeverityLevel) -> &'static str {
    match level {
        SeverityLevel::High => "High risk detected - reduce exposure",
        SeverityLevel::Moderate => "Moderate risk - monitor closely",
        SeverityLevel::Safe => "All limits within safe range",
    }
}

pub fn gauge_label(level: SeverityLevel) -> &'static str {
    match level {
        SeverityLevel::High => "HIGH RISK",
        SeverityLevel::Moderate => "MODERATE RISK",
        SeverityLevel::Safe => "SAFE ZONE",
    }
}

/// Fraction of the gauge arc to fill, 0.0..=1.0.
pub fn gauge_fill(risk_percent: f64) -> f64 {
    (metric(risk_percent) / GAUGE_FULL_RISK).clamp(0.0, 1.0)
}

/// One message per triggered condition, fixed order, never empty.
pub fn derive_suggestions(snap: &PortfolioSnapshot) -> Vec<String> {
    let mut out = Vec::with_capacity(3);
    if metric(snap.total_risk_percent) > 3.0 {
        out.push(SUGGEST_REDUCE.to_string());
    }
    if snap.active_positions > 2 {
        out.push(SUGGEST_CORRELATION.to_string());
    }
    if metric(snap.daily_pnl_percent).abs() > 2.0 {
        out.push(SUGGEST_PNL_LIMIT.to_string());
    }
    if out.is_empty() {
        out.push(SUGGEST_DEFAULT.to_string());
    }
    out
}

pub fn portfolio_view(snap: &PortfolioSnapshot) -> PortfolioView {
    let banner = classify_banner(snap.total_risk_percent, snap.daily_pnl_percent);
    let gauge = classify_gauge(snap.total_risk_percent);
    PortfolioView {
        total_balance: metric(snap.total_balance),
        daily_pnl: metric(snap.daily_pnl),
        daily_pnl_percent: metric(snap.daily_pnl_percent),
        realized_pnl: metric(snap.realized_pnl),
        unrealized_pnl: metric(snap.unrealized_pnl),
        total_risk_percent: metric(snap.total_risk_percent),
        active_positions: snap.active_positions,
        banner,
        banner_message: banner_message(banner).to_string(),
        gauge,
        gauge_label: gauge_label(gauge).to_string(),
        gauge_fill: gauge_fill(snap.total_risk_percent),
        suggestions: derive_suggestions(snap),
    }
}

pub fn confidence_tier(confidence: f64) -> ConfidenceTier {
    let c = metric(confidence);
    if c >= 85.0 {
        ConfidenceTier::High
    } else if c >= 75.0 {
        ConfidenceTier::Medium
    } else {
        ConfidenceTier::Low
    }
}

pub fn signal_view(signal: &Signal) -> SignalView {
    SignalView {
        tier: confidence_tier(signal.confidence),
        leverage: signal.suggested_leverage.filter(|l| *l >= 1.0).unwrap_or(1.0),
        risk_reward: signal.risk_reward_ratio.filter(|r| *r > 0.0).unwrap_or(2.0),
        signal: signal.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Direction;

    fn snap(risk: f64, positions: u32, pnl_pct: f64) -> PortfolioSnapshot {
        PortfolioSnapshot {
            total_risk_percent: risk,
            active_positions: positions,
            daily_pnl_percent: pnl_pct,
            ..Default::default()
        }
    }

    #[test]
    fn banner_table_boundaries() {
        assert_eq!(classify_banner(0.0, 0.0), SeverityLevel::Safe);
        // "> 2" is exclusive
        assert_eq!(classify_banner(2.0, 0.0), SeverityLevel::Safe);
        assert_eq!(classify_banner(2.01, 0.0), SeverityLevel::Moderate);
        assert_eq!(classify_banner(4.0, 0.0), SeverityLevel::Moderate);
        assert_eq!(classify_banner(4.01, 0.0), SeverityLevel::High);
        assert_eq!(classify_banner(0.0, 1.6), SeverityLevel::Moderate);
        assert_eq!(classify_banner(0.0, -2.6), SeverityLevel::High);
        assert_eq!(classify_banner(0.0, -1.5), SeverityLevel::Safe);
    }

    #[test]
    fn gauge_table_boundaries() {
        assert_eq!(classify_gauge(1.99), SeverityLevel::Safe);
        assert_eq!(classify_gauge(2.0), SeverityLevel::Moderate);
        assert_eq!(classify_gauge(4.99), SeverityLevel::Moderate);
        assert_eq!(classify_gauge(5.0), SeverityLevel::High);
    }

    #[test]
    fn tables_disagree_where_their_cut_points_do() {
        // gauge says moderate at 2%, banner still safe
        assert_eq!(classify_gauge(2.0), SeverityLevel::Moderate);
        assert_eq!(classify_banner(2.0, 0.0), SeverityLevel::Safe);
        // banner escalates on pnl alone, gauge never does
        assert_eq!(classify_banner(0.5, 3.0), SeverityLevel::High);
        assert_eq!(classify_gauge(0.5), SeverityLevel::Safe);
        // 4.5% risk: banner high, gauge moderate
        assert_eq!(classify_banner(4.5, 0.0), SeverityLevel::High);
        assert_eq!(classify_gauge(4.5), SeverityLevel::Moderate);
    }

    #[test]
    fn non_finite_metrics_count_as_zero() {
        assert_eq!(classify_banner(f64::NAN, f64::INFINITY), SeverityLevel::Safe);
        assert_eq!(classify_gauge(f64::NAN), SeverityLevel::Safe);
        assert_eq!(gauge_fill(f64::NAN), 0.0);
    }

    #[test]
    fn classification_is_pure() {
        for _ in 0..3 {
            assert_eq!(classify_banner(3.3, -1.2), SeverityLevel::Moderate);
            assert_eq!(classify_gauge(3.3), SeverityLevel::Moderate);
        }
    }

    #[test]
    fn suggestions_fire_in_fixed_order() {
        let out = derive_suggestions(&snap(3.5, 3, 2.1));
        assert_eq!(out, vec![SUGGEST_REDUCE, SUGGEST_CORRELATION, SUGGEST_PNL_LIMIT]);

        let out = derive_suggestions(&snap(0.5, 3, -2.5));
        assert_eq!(out, vec![SUGGEST_CORRELATION, SUGGEST_PNL_LIMIT]);
    }

    #[test]
    fn suggestions_default_when_all_safe() {
        let out = derive_suggestions(&snap(1.0, 1, 0.3));
        assert_eq!(out, vec![SUGGEST_DEFAULT]);
        // boundaries are exclusive
        let out = derive_suggestions(&snap(3.0, 2, 2.0));
        assert_eq!(out, vec![SUGGEST_DEFAULT]);
    }

    #[test]
    fn gauge_fill_is_clamped() {
        assert_eq!(gauge_fill(5.0), 0.5);
        assert_eq!(gauge_fill(25.0), 1.0);
        assert_eq!(gauge_fill(-1.0), 0.0);
    }

    #[test]
    fn portfolio_view_carries_both_tables() {
        let view = portfolio_view(&snap(4.5, 1, 0.0));
        assert_eq!(view.banner, SeverityLevel::High);
        assert_eq!(view.banner_message, "High risk detected - reduce exposure");
        assert_eq!(view.gauge, SeverityLevel::Moderate);
        assert_eq!(view.gauge_label, "MODERATE RISK");
        assert_eq!(view.suggestions, vec![SUGGEST_REDUCE]);
    }

    #[test]
    fn signal_tiers_and_defaults() {
        let mut sig = Signal {
            symbol: "BTC/USDT".into(),
            direction: Direction::Long,
            confidence: 85.0,
            entry_price: Some(64_000.0),
            stop_loss: None,
            take_profit: None,
            suggested_leverage: None,
            risk_reward_ratio: None,
            trade_duration: None,
            timestamp: None,
            id: None,
            reasoning: None,
        };
        let v = signal_view(&sig);
        assert_eq!(v.tier, ConfidenceTier::High);
        assert_eq!(v.leverage, 1.0);
        assert_eq!(v.risk_reward, 2.0);

        sig.confidence = 75.0;
        sig.suggested_leverage = Some(3.0);
        let v = signal_view(&sig);
        assert_eq!(v.tier, ConfidenceTier::Medium);
        assert_eq!(v.leverage, 3.0);

        sig.confidence = 74.9;
        assert_eq!(signal_view(&sig).tier, ConfidenceTier::Low);
    }
}
