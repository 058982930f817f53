// ===============================
// src/orchestrator.rs (update cadence + state derivation)
// ===============================
//
// Owns every piece of derived state (trackers, chart history, last portfolio
// view) and is the only writer to the display sink.
//
// Per cycle:
//   1) portfolio-status -> connection up, emergency-stop edge, both
//      classifiers, chart push, portfolio + chart projection.
//      On failure: connection down, last numbers stay on screen.
//   2) signals   -> projected as received, empty list on failure
//   3) positions -> projected as received, empty list on failure
//   4) "last update" timestamp, whatever happened above
//
// The three fetches run concurrently and are applied one by one as they
// settle. Every result carries its cycle id; a result older than (or equal
// to) the newest one already applied for its kind is discarded, so a slow
// superseded cycle can never overwrite fresher data.
//
// Wakes (timer / focus / visible / manual) share one queue. Queued wakes are
// drained together into a single cycle, and at most `max_in_flight` cycles
// are outstanding; beyond that the wake collapses into one pending cycle.
//

use std::future::Future;
use std::sync::Arc;

use ahash::AHashMap as HashMap;
use chrono::{DateTime, Local};
use futures_util::future::BoxFuture;
use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{Duration, Instant},
};
use tracing::{debug, info, warn};

use crate::api::DashboardApi;
use crate::chart::ChartSeries;
use crate::config::RefreshCfg;
use crate::domain::{
    ConnectionState, EmergencyStopState, PortfolioStatus, PortfolioView, Position, Signal,
};
use crate::error::FetchError;
use crate::metrics::{
    CHART_POINTS, CONNECTION_UP, CYCLES, EMERGENCY_STOP, FETCHES, FETCH_LATENCY, IN_FLIGHT,
    RISK_PERCENT, STALE_DISCARDS, WAKES_COALESCED,
};
use crate::sink::DisplaySink;
use crate::tracker::{ConnectionTracker, EmergencyStopTracker};
use crate::wake::{self, WakeReason, WAKE_QUEUE};
use crate::{positions, risk};

/// Monotonic, starts at 1. 0 means "nothing applied yet".
pub type CycleId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    Portfolio,
    Signals,
    Positions,
}

impl DataKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataKind::Portfolio => "portfolio",
            DataKind::Signals => "signals",
            DataKind::Positions => "positions",
        }
    }
}

#[derive(Debug)]
pub enum Fetched {
    Portfolio(Result<PortfolioStatus, FetchError>),
    Signals(Result<Vec<Signal>, FetchError>),
    Positions(Result<Vec<Position>, FetchError>),
}

impl Fetched {
    pub fn kind(&self) -> DataKind {
        match self {
            Fetched::Portfolio(_) => DataKind::Portfolio,
            Fetched::Signals(_) => DataKind::Signals,
            Fetched::Positions(_) => DataKind::Positions,
        }
    }
}

/// One settled fetch, tagged with the cycle that launched it.
#[derive(Debug)]
pub struct CycleResult {
    pub cycle: CycleId,
    pub fetched: Fetched,
}

/// What `apply` did with a result.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    Projected,
    /// Fetch failed; the panel was degraded (empty list / connection down).
    Failed(FetchError),
    /// A newer cycle already projected this kind.
    Stale { newest: CycleId },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub cycle: CycleId,
    pub portfolio: Option<Applied>,
    pub signals: Option<Applied>,
    pub positions: Option<Applied>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Newest {
    portfolio: CycleId,
    signals: CycleId,
    positions: CycleId,
}

impl Newest {
    fn slot(&mut self, kind: DataKind) -> &mut CycleId {
        match kind {
            DataKind::Portfolio => &mut self.portfolio,
            DataKind::Signals => &mut self.signals,
            DataKind::Positions => &mut self.positions,
        }
    }
}

async fn timed<T, F>(limit: Duration, fut: F) -> Result<T, FetchError>
where
    F: Future<Output = Result<T, FetchError>>,
{
    let started = Instant::now();
    let out = match tokio::time::timeout(limit, fut).await {
        Ok(r) => r,
        Err(_) => Err(FetchError::Timeout(limit)),
    };
    FETCH_LATENCY.observe(started.elapsed().as_secs_f64() * 1_000.0);
    out
}

pub struct Orchestrator {
    api: Arc<dyn DashboardApi>,
    sink: Box<dyn DisplaySink>,
    cfg: RefreshCfg,
    last_cycle: CycleId,
    newest: Newest,
    connection: ConnectionTracker,
    emergency: EmergencyStopTracker,
    chart: ChartSeries,
    portfolio: Option<PortfolioView>,
    last_refreshed: Option<DateTime<Local>>,
}

impl Orchestrator {
    pub fn new(api: Arc<dyn DashboardApi>, sink: Box<dyn DisplaySink>, cfg: RefreshCfg) -> Self {
        let chart = ChartSeries::new(cfg.chart_points);
        Self {
            api,
            sink,
            cfg,
            last_cycle: 0,
            newest: Newest::default(),
            connection: ConnectionTracker::default(),
            emergency: EmergencyStopTracker::default(),
            chart,
            portfolio: None,
            last_refreshed: None,
        }
    }

    // ---- read-only views of owned state ----

    pub fn connection(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn emergency_stop(&self) -> EmergencyStopState {
        self.emergency.state()
    }

    pub fn chart(&self) -> &ChartSeries {
        &self.chart
    }

    pub fn portfolio(&self) -> Option<&PortfolioView> {
        self.portfolio.as_ref()
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Local>> {
        self.last_refreshed
    }

    pub fn last_cycle(&self) -> CycleId {
        self.last_cycle
    }

    // ---- cycle steps ----

    pub fn begin_cycle(&mut self, reason: WakeReason) -> CycleId {
        self.last_cycle += 1;
        CYCLES.with_label_values(&[reason.as_str()]).inc();
        debug!(cycle = self.last_cycle, %reason, "refresh cycle started");
        self.last_cycle
    }

    /// The three independent round trips of one cycle. They own everything
    /// they need, so they can outlive `&self` and settle in any order.
    pub fn fetches(&self, cycle: CycleId) -> Vec<BoxFuture<'static, CycleResult>> {
        let limit = self.cfg.fetch_timeout;

        let api = self.api.clone();
        let portfolio: BoxFuture<'static, CycleResult> = Box::pin(async move {
            let r = timed(limit, api.fetch_portfolio_status()).await;
            CycleResult { cycle, fetched: Fetched::Portfolio(r) }
        });

        let api = self.api.clone();
        let signals: BoxFuture<'static, CycleResult> = Box::pin(async move {
            let r = timed(limit, api.fetch_signals()).await;
            CycleResult { cycle, fetched: Fetched::Signals(r) }
        });

        let api = self.api.clone();
        let positions: BoxFuture<'static, CycleResult> = Box::pin(async move {
            let r = timed(limit, api.fetch_positions()).await;
            CycleResult { cycle, fetched: Fetched::Positions(r) }
        });

        vec![portfolio, signals, positions]
    }

    pub fn apply(&mut self, result: CycleResult, now: DateTime<Local>) -> Applied {
        let kind = result.fetched.kind();
        let slot = self.newest.slot(kind);
        if result.cycle <= *slot {
            let newest = *slot;
            STALE_DISCARDS.with_label_values(&[kind.as_str()]).inc();
            FETCHES.with_label_values(&[kind.as_str(), "stale"]).inc();
            debug!(cycle = result.cycle, newest, kind = kind.as_str(), "stale result discarded");
            return Applied::Stale { newest };
        }
        *slot = result.cycle;
        let cycle = result.cycle;

        let applied = match result.fetched {
            Fetched::Portfolio(Ok(status)) => {
                self.project_portfolio(status, now);
                Applied::Projected
            }
            Fetched::Portfolio(Err(e)) => {
                warn!(cycle, error = %e, "portfolio fetch failed, keeping last values");
                self.observe_connection(false);
                Applied::Failed(e)
            }
            Fetched::Signals(Ok(list)) => {
                let views: Vec<_> = list.iter().map(risk::signal_view).collect();
                self.sink.project_signals(&views);
                Applied::Projected
            }
            Fetched::Signals(Err(e)) => {
                warn!(cycle, error = %e, "signals fetch failed, showing empty list");
                self.sink.project_signals(&[]);
                Applied::Failed(e)
            }
            Fetched::Positions(Ok(list)) => {
                self.sink.project_positions(&positions::project(list));
                Applied::Projected
            }
            Fetched::Positions(Err(e)) => {
                warn!(cycle, error = %e, "positions fetch failed, showing empty list");
                self.sink.project_positions(&[]);
                Applied::Failed(e)
            }
        };

        let outcome = match &applied {
            Applied::Failed(e) => e.kind(),
            _ => "ok",
        };
        FETCHES.with_label_values(&[kind.as_str(), outcome]).inc();
        applied
    }

    /// Step 4: always stamps, regardless of fetch outcomes.
    pub fn finish_cycle(&mut self, cycle: CycleId, now: DateTime<Local>) {
        self.last_refreshed = Some(now);
        self.sink.project_timestamp(now);
        debug!(cycle, "refresh cycle settled");
    }

    fn project_portfolio(&mut self, status: PortfolioStatus, now: DateTime<Local>) {
        self.observe_connection(true);

        if let Some(active) = status.system.emergency_stop_active {
            if let Some(state) = self.emergency.observe(active) {
                EMERGENCY_STOP.set(i64::from(state == EmergencyStopState::Active));
                match state {
                    EmergencyStopState::Active => warn!("emergency stop activated"),
                    EmergencyStopState::Inactive => info!("emergency stop deactivated"),
                }
                self.sink.project_emergency_stop(state);
            }
        }

        let view = risk::portfolio_view(&status.snapshot);
        self.chart.push(
            now.format("%H:%M").to_string(),
            view.total_risk_percent,
            view.daily_pnl_percent.abs(),
        );
        RISK_PERCENT.set(view.total_risk_percent);
        CHART_POINTS.set(self.chart.len() as i64);

        self.sink.project_portfolio(&view);
        self.sink.project_chart(&self.chart.snapshot());
        self.portfolio = Some(view);
    }

    fn observe_connection(&mut self, reachable: bool) {
        if let Some(state) = self.connection.observe(reachable) {
            CONNECTION_UP.set(i64::from(reachable));
            match state {
                ConnectionState::Connected => info!("dashboard service reachable again"),
                ConnectionState::Disconnected => warn!("dashboard service unreachable"),
            }
            self.sink.project_connection(state);
        }
    }

    /// One full cycle, awaited in place (used by `once` and by tests).
    pub async fn refresh(&mut self, reason: WakeReason) -> CycleReport {
        let cycle = self.begin_cycle(reason);
        let mut pending: FuturesUnordered<_> = self.fetches(cycle).into_iter().collect();
        let mut report = CycleReport { cycle, portfolio: None, signals: None, positions: None };

        while let Some(res) = pending.next().await {
            let kind = res.fetched.kind();
            let applied = self.apply(res, Local::now());
            match kind {
                DataKind::Portfolio => report.portfolio = Some(applied),
                DataKind::Signals => report.signals = Some(applied),
                DataKind::Positions => report.positions = Some(applied),
            }
        }
        self.finish_cycle(cycle, Local::now());
        report
    }

    fn launch(
        &mut self,
        reason: WakeReason,
        inflight: &mut FuturesUnordered<BoxFuture<'static, CycleResult>>,
        remaining: &mut HashMap<CycleId, usize>,
    ) {
        let cycle = self.begin_cycle(reason);
        let futs = self.fetches(cycle);
        remaining.insert(cycle, futs.len());
        inflight.extend(futs);
        IN_FLIGHT.set(remaining.len() as i64);
    }

    /// Consumer loop. Returns the orchestrator on shutdown; results still in
    /// flight are dropped, not awaited.
    pub async fn run(
        mut self,
        mut wake_rx: mpsc::Receiver<WakeReason>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Self {
        let max_in_flight = self.cfg.max_in_flight.max(1);
        let mut inflight: FuturesUnordered<BoxFuture<'static, CycleResult>> =
            FuturesUnordered::new();
        let mut remaining: HashMap<CycleId, usize> = HashMap::new();
        let mut deferred: Option<WakeReason> = None;
        let mut wakes_open = true;

        info!(
            interval_ms = self.cfg.interval.as_millis() as u64,
            max_in_flight, "dashboard orchestrator running"
        );

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,

                maybe = wake_rx.recv(), if wakes_open => {
                    let Some(reason) = maybe else {
                        wakes_open = false;
                        continue;
                    };

                    // burst -> one cycle
                    let mut coalesced = 0u64;
                    while wake_rx.try_recv().is_ok() {
                        coalesced += 1;
                    }
                    if coalesced > 0 {
                        WAKES_COALESCED.inc_by(coalesced);
                        debug!(%reason, coalesced, "wake burst coalesced");
                    }

                    if remaining.len() < max_in_flight {
                        self.launch(reason, &mut inflight, &mut remaining);
                    } else {
                        if deferred.is_some() {
                            WAKES_COALESCED.inc();
                        }
                        debug!(%reason, in_flight = remaining.len(), "in-flight cap reached, refresh deferred");
                        deferred = Some(reason);
                    }
                }

                Some(done) = inflight.next(), if !inflight.is_empty() => {
                    let cycle = done.cycle;
                    self.apply(done, Local::now());

                    let settled = match remaining.get_mut(&cycle) {
                        Some(left) => {
                            *left = left.saturating_sub(1);
                            *left == 0
                        }
                        None => false,
                    };
                    if settled {
                        remaining.remove(&cycle);
                        self.finish_cycle(cycle, Local::now());
                    }
                    IN_FLIGHT.set(remaining.len() as i64);

                    if remaining.len() < max_in_flight {
                        if let Some(reason) = deferred.take() {
                            self.launch(reason, &mut inflight, &mut remaining);
                        }
                    }
                }

                else => break,
            }
        }

        IN_FLIGHT.set(0);
        info!(dropped_cycles = remaining.len(), "dashboard orchestrator stopped");
        self
    }

    /// Start the cadence: timer producer + consumer loop, plus an immediate
    /// first refresh.
    pub fn spawn(self) -> DashboardHandle {
        let (wake_tx, wake_rx) = mpsc::channel(WAKE_QUEUE);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(wake::run_timer(
            wake_tx.clone(),
            self.cfg.interval,
            shutdown_rx.clone(),
        ));
        wake::wake(&wake_tx, WakeReason::Startup);

        let task = tokio::spawn(self.run(wake_rx, shutdown_rx.clone()));
        DashboardHandle { wake_tx, shutdown_tx, shutdown_rx, task }
    }
}

/// Lifecycle handle returned by `Orchestrator::spawn`.
pub struct DashboardHandle {
    wake_tx: mpsc::Sender<WakeReason>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    task: JoinHandle<Orchestrator>,
}

impl DashboardHandle {
    /// Extra producer for the wake queue (stdin events, commands, ...).
    pub fn waker(&self) -> mpsc::Sender<WakeReason> {
        self.wake_tx.clone()
    }

    pub fn wake(&self, reason: WakeReason) -> bool {
        wake::wake(&self.wake_tx, reason)
    }

    /// Lets extra producers stop together with the dashboard.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// Stop the timer and the loop; hands back the final state.
    pub async fn stop(self) -> Option<Orchestrator> {
        let _ = self.shutdown_tx.send(true);
        match self.task.await {
            Ok(orch) => Some(orch),
            Err(e) => {
                warn!(?e, "orchestrator task ended abnormally");
                None
            }
        }
    }
}
