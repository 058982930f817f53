//! Shared test helpers: a scripted in-memory dashboard service and sink drains.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use risk_dashboard::api::{CommandAck, DashboardApi};
use risk_dashboard::config::RefreshCfg;
use risk_dashboard::domain::{
    DisplayEvent, PortfolioSnapshot, PortfolioStatus, Position, Signal, SystemStatus,
};
use risk_dashboard::error::FetchError;
use risk_dashboard::sink::{ChannelSink, DisplaySink};
use serde_json::json;
use tokio::sync::mpsc;

/// One scripted answer: wait `delay`, then return `result`.
pub struct Step<T> {
    pub delay: Duration,
    pub result: Result<T, FetchError>,
}

impl<T> Step<T> {
    pub fn now(result: Result<T, FetchError>) -> Self {
        Self { delay: Duration::ZERO, result }
    }

    pub fn after(delay: Duration, result: Result<T, FetchError>) -> Self {
        Self { delay, result }
    }
}

/// Answers from per-endpoint queues. An exhausted queue answers with an
/// empty success after `default_delay`.
#[derive(Default)]
pub struct FakeApi {
    portfolio: Mutex<VecDeque<Step<PortfolioStatus>>>,
    signals: Mutex<VecDeque<Step<Vec<Signal>>>>,
    positions: Mutex<VecDeque<Step<Vec<Position>>>>,
    commands: Mutex<VecDeque<Result<CommandAck, FetchError>>>,
    default_delay: Duration,
    pub command_calls: AtomicUsize,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self { default_delay: delay, ..Self::default() }
    }

    pub fn portfolio(self, step: Step<PortfolioStatus>) -> Self {
        self.portfolio.lock().unwrap().push_back(step);
        self
    }

    pub fn signals(self, step: Step<Vec<Signal>>) -> Self {
        self.signals.lock().unwrap().push_back(step);
        self
    }

    pub fn positions(self, step: Step<Vec<Position>>) -> Self {
        self.positions.lock().unwrap().push_back(step);
        self
    }

    pub fn command(self, ack: Result<CommandAck, FetchError>) -> Self {
        self.commands.lock().unwrap().push_back(ack);
        self
    }

    async fn answer<T>(
        &self,
        queue: &Mutex<VecDeque<Step<T>>>,
        fallback: impl FnOnce() -> T,
    ) -> Result<T, FetchError> {
        let step = queue.lock().unwrap().pop_front();
        let step = step.unwrap_or_else(|| Step::after(self.default_delay, Ok(fallback())));
        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }
        step.result
    }
}

#[async_trait]
impl DashboardApi for FakeApi {
    async fn fetch_portfolio_status(&self) -> Result<PortfolioStatus, FetchError> {
        self.answer(&self.portfolio, PortfolioStatus::default).await
    }

    async fn fetch_signals(&self) -> Result<Vec<Signal>, FetchError> {
        self.answer(&self.signals, Vec::new).await
    }

    async fn fetch_positions(&self) -> Result<Vec<Position>, FetchError> {
        self.answer(&self.positions, Vec::new).await
    }

    async fn trigger_emergency_stop(&self) -> Result<CommandAck, FetchError> {
        self.command_calls.fetch_add(1, Ordering::SeqCst);
        self.commands.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(FetchError::Transport("no scripted answer".into()))
        })
    }

    async fn reset_emergency_stop(&self) -> Result<CommandAck, FetchError> {
        self.trigger_emergency_stop().await
    }
}

// ---- fixtures ----

pub fn status(risk: f64, pnl_percent: f64) -> PortfolioStatus {
    PortfolioStatus {
        snapshot: PortfolioSnapshot {
            total_balance: 1_000.0,
            daily_pnl: pnl_percent * 10.0,
            daily_pnl_percent: pnl_percent,
            total_risk_percent: risk,
            active_positions: 1,
            realized_pnl: 0.0,
            unrealized_pnl: pnl_percent * 10.0,
        },
        system: SystemStatus::default(),
    }
}

pub fn status_with_stop(risk: f64, stop_active: bool) -> PortfolioStatus {
    let mut s = status(risk, 0.0);
    s.system.emergency_stop_active = Some(stop_active);
    s
}

pub fn signal(symbol: &str, confidence: f64) -> Signal {
    serde_json::from_value(json!({
        "symbol": symbol,
        "direction": "long",
        "confidence": confidence,
        "entry_price": 100.0,
    }))
    .unwrap()
}

pub fn position(symbol: &str, unrealized: f64) -> Position {
    serde_json::from_value(json!({
        "symbol": symbol,
        "direction": "short",
        "size": 2.0,
        "leverage": 2.0,
        "margin": 50.0,
        "entry_price": 100.0,
        "current_price": 98.0,
        "unrealized_pnl": unrealized,
        "realized_pnl": 0.0,
    }))
    .unwrap()
}

pub fn transport_err() -> FetchError {
    FetchError::Transport("connection refused".into())
}

pub fn default_cfg() -> RefreshCfg {
    RefreshCfg::default()
}

// ---- sinks ----

pub fn channel_sink() -> (Box<dyn DisplaySink>, mpsc::Receiver<DisplayEvent>) {
    let (tx, rx) = mpsc::channel(4096);
    (Box::new(ChannelSink::new(tx)), rx)
}

/// Everything projected so far.
pub fn drain(rx: &mut mpsc::Receiver<DisplayEvent>) -> Vec<DisplayEvent> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        out.push(ev);
    }
    out
}
