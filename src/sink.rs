// ===============================
// src/sink.rs
// ===============================
//
// Display sinks. The orchestrator pushes projections here; sinks only read.
// - LogSink     : human-readable tracing lines
// - ChannelSink : DisplayEvent over mpsc (recorder / external renderer / tests)
// - FanoutSink  : forwards to several sinks in order
//

use chrono::{DateTime, Local};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::domain::{
    ChartSnapshot, ConnectionState, DisplayEvent, EmergencyStopState, PortfolioView, PositionView,
    SignalView,
};

pub trait DisplaySink: Send {
    fn project_portfolio(&mut self, view: &PortfolioView);
    fn project_signals(&mut self, signals: &[SignalView]);
    fn project_positions(&mut self, positions: &[PositionView]);
    fn project_connection(&mut self, state: ConnectionState);
    fn project_emergency_stop(&mut self, state: EmergencyStopState);
    fn project_chart(&mut self, chart: &ChartSnapshot);
    fn project_timestamp(&mut self, at: DateTime<Local>);
}

#[derive(Debug, Default)]
pub struct LogSink;

impl DisplaySink for LogSink {
    fn project_portfolio(&mut self, v: &PortfolioView) {
        info!(
            balance = %format!("${:.2}", v.total_balance),
            daily_pnl = %format!("${:.2} ({:.2}%)", v.daily_pnl, v.daily_pnl_percent),
            risk = %format!("{:.1}%", v.total_risk_percent),
            positions = v.active_positions,
            banner = ?v.banner,
            gauge = %v.gauge_label,
            "{}",
            v.banner_message
        );
        for s in &v.suggestions {
            info!(suggestion = %s, "suggestion");
        }
    }

    fn project_signals(&mut self, signals: &[SignalView]) {
        if signals.is_empty() {
            info!("no conservative signals available");
            return;
        }
        for s in signals {
            info!(
                symbol = %s.signal.symbol,
                direction = ?s.signal.direction,
                confidence = s.signal.confidence,
                tier = ?s.tier,
                leverage = s.leverage,
                rr = %format!("1:{}", s.risk_reward),
                "signal"
            );
        }
    }

    fn project_positions(&mut self, positions: &[PositionView]) {
        if positions.is_empty() {
            info!("no active positions");
            return;
        }
        for p in positions {
            info!(
                symbol = %p.position.symbol,
                direction = ?p.position.direction,
                size = p.position.size,
                leverage = p.position.leverage,
                unrealized = %format!("{:.4} ({:.2}%)", p.position.unrealized_pnl, p.unrealized_pct),
                realized = p.position.realized_pnl,
                profitable = p.profitable,
                "position"
            );
        }
    }

    fn project_connection(&mut self, state: ConnectionState) {
        match state {
            ConnectionState::Connected => info!("connection: Connected"),
            ConnectionState::Disconnected => warn!("connection: Disconnected - data may be stale"),
        }
    }

    fn project_emergency_stop(&mut self, state: EmergencyStopState) {
        match state {
            EmergencyStopState::Active => warn!("EMERGENCY STOP ACTIVE - trading halted"),
            EmergencyStopState::Inactive => info!("emergency stop cleared"),
        }
    }

    fn project_chart(&mut self, chart: &ChartSnapshot) {
        tracing::debug!(points = chart.labels.len(), last_risk = ?chart.risk.last(), "chart");
    }

    fn project_timestamp(&mut self, at: DateTime<Local>) {
        info!("Last update: {}", at.format("%H:%M:%S"));
    }
}

/// Forwards every projection as a `DisplayEvent`. Never blocks the
/// orchestrator: when the receiver lags, the event is dropped.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<DisplayEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<DisplayEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, ev: DisplayEvent) {
        if let Err(e) = self.tx.try_send(ev) {
            warn!(error = %e, "display channel full or closed, event dropped");
        }
    }
}

impl DisplaySink for ChannelSink {
    fn project_portfolio(&mut self, view: &PortfolioView) {
        self.send(DisplayEvent::Portfolio(view.clone()));
    }
    fn project_signals(&mut self, signals: &[SignalView]) {
        self.send(DisplayEvent::Signals(signals.to_vec()));
    }
    fn project_positions(&mut self, positions: &[PositionView]) {
        self.send(DisplayEvent::Positions(positions.to_vec()));
    }
    fn project_connection(&mut self, state: ConnectionState) {
        self.send(DisplayEvent::Connection(state));
    }
    fn project_emergency_stop(&mut self, state: EmergencyStopState) {
        self.send(DisplayEvent::EmergencyStop(state));
    }
    fn project_chart(&mut self, chart: &ChartSnapshot) {
        self.send(DisplayEvent::Chart(chart.clone()));
    }
    fn project_timestamp(&mut self, at: DateTime<Local>) {
        self.send(DisplayEvent::Timestamp(at));
    }
}

#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn DisplaySink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl DisplaySink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl DisplaySink for FanoutSink {
    fn project_portfolio(&mut self, view: &PortfolioView) {
        self.sinks.iter_mut().for_each(|s| s.project_portfolio(view));
    }
    fn project_signals(&mut self, signals: &[SignalView]) {
        self.sinks.iter_mut().for_each(|s| s.project_signals(signals));
    }
    fn project_positions(&mut self, positions: &[PositionView]) {
        self.sinks.iter_mut().for_each(|s| s.project_positions(positions));
    }
    fn project_connection(&mut self, state: ConnectionState) {
        self.sinks.iter_mut().for_each(|s| s.project_connection(state));
    }
    fn project_emergency_stop(&mut self, state: EmergencyStopState) {
        self.sinks.iter_mut().for_each(|s| s.project_emergency_stop(state));
    }
    fn project_chart(&mut self, chart: &ChartSnapshot) {
        self.sinks.iter_mut().for_each(|s| s.project_chart(chart));
    }
    fn project_timestamp(&mut self, at: DateTime<Local>) {
        self.sinks.iter_mut().for_each(|s| s.project_timestamp(at));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fanout_forwards_to_every_sink_in_order() {
        let (tx_a, mut rx_a) = mpsc::channel(8);
        let (tx_b, mut rx_b) = mpsc::channel(8);
        let mut sink = FanoutSink::new()
            .with(ChannelSink::new(tx_a))
            .with(ChannelSink::new(tx_b));

        sink.project_connection(ConnectionState::Disconnected);
        sink.project_signals(&[]);

        for rx in [&mut rx_a, &mut rx_b] {
            assert_eq!(
                rx.try_recv().unwrap(),
                DisplayEvent::Connection(ConnectionState::Disconnected)
            );
            assert_eq!(rx.try_recv().unwrap(), DisplayEvent::Signals(vec![]));
        }
    }

    #[test]
    fn channel_sink_drops_when_full() {
        let (tx, mut rx) = mpsc::channel(1);
        let mut sink = ChannelSink::new(tx);
        sink.project_emergency_stop(EmergencyStopState::Active);
        sink.project_emergency_stop(EmergencyStopState::Inactive);
        assert_eq!(
            rx.try_recv().unwrap(),
            DisplayEvent::EmergencyStop(EmergencyStopState::Active)
        );
        assert!(rx.try_recv().is_err());
    }
}
