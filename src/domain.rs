// ===============================
// src/domain.rs
// ===============================
use chrono::{DateTime, Local};
use serde::{Deserialize, Deserializer, Serialize};

/// Missing *and* null metrics both become zero (the service omits fields freely).
fn zero_if_null<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[serde(alias = "LONG")]
    Long,
    #[serde(alias = "SHORT")]
    Short,
}

// ---------------------------------------------------------------------------
// Remote snapshots (immutable once received)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    #[serde(default, deserialize_with = "zero_if_null")]
    pub total_balance: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub daily_pnl: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub daily_pnl_percent: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub total_risk_percent: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub active_positions: u32,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub realized_pnl: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub unrealized_pnl: f64,
}

/// Service-side status block shipped next to the portfolio snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    pub emergency_stop_active: Option<bool>,
    pub api_connected: Option<bool>,
    pub last_update: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortfolioStatus {
    pub snapshot: PortfolioSnapshot,
    pub system: SystemStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub direction: Direction,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub confidence: f64,
    pub entry_price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub suggested_leverage: Option<f64>,
    pub risk_reward_ratio: Option<f64>,
    pub trade_duration: Option<String>,
    pub timestamp: Option<String>,
    pub id: Option<String>,
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub direction: Direction,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub size: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub leverage: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub margin: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub entry_price: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub current_price: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub position_value: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub margin_ratio: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub unrealized_pnl: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub realized_pnl: f64,
    #[serde(default, alias = "stop_loss")]
    pub recommended_stop_loss: Option<f64>,
    #[serde(default, alias = "take_profit")]
    pub recommended_take_profit: Option<f64>,
}

// ---------------------------------------------------------------------------
// Wire envelopes: `{ success, <payload>, error? }`
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct PortfolioEnvelope {
    pub success: bool,
    pub data: Option<PortfolioSnapshot>,
    pub system_status: Option<SystemStatus>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SignalsEnvelope {
    pub success: bool,
    pub signals: Option<Vec<Signal>>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PositionsEnvelope {
    pub success: bool,
    pub positions: Option<Vec<Position>>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommandEnvelope {
    pub success: bool,
    pub message: Option<String>,
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Derived state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityLevel {
    Safe,
    Moderate,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyStopState {
    Inactive,
    Active,
}

// ---------------------------------------------------------------------------
// Projections handed to the display sink (read-only for the sink)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioView {
    pub total_balance: f64,
    pub daily_pnl: f64,
    pub daily_pnl_percent: f64,
    pub realized_pnl: f64,
    pub unrealized_pnl: f64,
    pub total_risk_percent: f64,
    pub active_positions: u32,
    pub banner: SeverityLevel,
    pub banner_message: String,
    pub gauge: SeverityLevel,
    pub gauge_label: String,
    /// 0.0..=1.0, full at 10% risk.
    pub gauge_fill: f64,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalView {
    pub signal: Signal,
    pub tier: ConfidenceTier,
    pub leverage: f64,
    pub risk_reward: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionView {
    pub position: Position,
    pub total_pnl: f64,
    pub unrealized_pct: f64,
    pub profitable: bool,
}

/// Parallel, time-aligned chart series (always equal length).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartSnapshot {
    pub labels: Vec<String>,
    pub risk: Vec<f64>,
    pub pnl: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum DisplayEvent {
    Portfolio(PortfolioView),
    Signals(Vec<SignalView>),
    Positions(Vec<PositionView>),
    Connection(ConnectionState),
    EmergencyStop(EmergencyStopState),
    Chart(ChartSnapshot),
    Timestamp(DateTime<Local>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_and_missing_metrics_become_zero() {
        let snap: PortfolioSnapshot =
            serde_json::from_str(r#"{"total_balance": 197.97, "daily_pnl": null}"#).unwrap();
        assert_eq!(snap.total_balance, 197.97);
        assert_eq!(snap.daily_pnl, 0.0);
        assert_eq!(snap.total_risk_percent, 0.0);
        assert_eq!(snap.active_positions, 0);
    }

    #[test]
    fn position_accepts_service_stop_loss_keys() {
        let pos: Position = serde_json::from_str(
            r#"{"symbol":"GMX/USDT","direction":"long","size":2.17,"leverage":2,
                "margin":14.8152,"stop_loss":13.76,"take_profit":14.38}"#,
        )
        .unwrap();
        assert_eq!(pos.direction, Direction::Long);
        assert_eq!(pos.recommended_stop_loss, Some(13.76));
        assert_eq!(pos.recommended_take_profit, Some(14.38));
        assert_eq!(pos.realized_pnl, 0.0);
    }

    #[test]
    fn envelope_without_success_is_rejected() {
        assert!(serde_json::from_str::<SignalsEnvelope>(r#"{"signals": []}"#).is_err());
    }

    #[test]
    fn severity_is_ordered() {
        assert!(SeverityLevel::Safe < SeverityLevel::Moderate);
        assert!(SeverityLevel::Moderate < SeverityLevel::High);
    }
}
