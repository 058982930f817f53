// ===============================
// src/main.rs
// ===============================
/*
 # live dashboard against a local service, JSONL projections on stdout
 RECORD_FILE=- cargo run -- watch

 # host events (one per line on stdin): focus | visible | refresh |
 #                                      emergency-stop | reset-emergency-stop
 curl -s localhost:9899/metrics | grep '^refresh_cycles_total'
*/
/*
=============================================================================
Project : risk_dashboard — live portfolio risk dashboard core in Rust
Module  : main.rs
Version : 0.5.0
Author  : Kukuh Tripamungkas Wicaksono (Kukuh TW)
Email   : kukuhtw@gmail.com
WhatsApp: https://wa.me/628129893706
LinkedIn: https://id.linkedin.com/in/kukuhtw
License : MIT (see LICENSE)

Summary : Polls portfolio / signal / position snapshots from the dashboard
          service, classifies risk, tracks connection & emergency-stop edges,
          keeps a bounded chart history and projects it to display sinks.

(c) 2025 Kukuh TW. All rights reserved where applicable.
=============================================================================
*/
use std::io;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use risk_dashboard::{
    api::{DashboardApi, HttpApi},
    commands::{self, Command},
    config::{self, Args},
    domain::{ConnectionState, DisplayEvent},
    error::CommandError,
    metrics,
    orchestrator::Orchestrator,
    recorder,
    sink::{ChannelSink, FanoutSink, LogSink},
    wake::{self, WakeReason},
};

const RECORD_QUEUE: usize = 1024;

#[derive(Parser, Debug)]
#[command(name = "risk_dashboard", version, about = "Live portfolio risk dashboard")]
struct Cli {
    /// Overrides DASHBOARD_API_URL.
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Refresh on a timer until Ctrl-C (default).
    Watch,
    /// Run a single refresh cycle and print the derived state as JSON.
    Once,
    /// Halt all trading.
    EmergencyStop {
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Resume trading after an emergency stop.
    ResetEmergencyStop {
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    // ---- Config, then logging (filter comes from config) ----
    let loaded = config::load(cli.api_url.as_deref());
    let filter = loaded.as_ref().map(|a| a.log_filter.as_str()).unwrap_or("info");
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args = match loaded {
        Ok(a) => a,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            std::process::exit(2);
        }
    };

    // stdin may still be parked in a blocking read; exit without waiting for it
    let code = run(cli.command.unwrap_or(Cmd::Watch), args).await;
    std::process::exit(code);
}

async fn run(cmd: Cmd, args: Args) -> i32 {
    let api: Arc<dyn DashboardApi> = match HttpApi::new(args.api_url.clone(), args.refresh.fetch_timeout) {
        Ok(api) => Arc::new(api),
        Err(e) => {
            error!(error = %e, "http client init failed");
            return 2;
        }
    };

    info!(
        api_url = %args.api_url,
        interval_ms = args.refresh.interval.as_millis() as u64,
        fetch_timeout_ms = args.refresh.fetch_timeout.as_millis() as u64,
        chart_points = args.refresh.chart_points,
        max_in_flight = args.refresh.max_in_flight,
        record = ?args.record,
        "startup config"
    );

    match cmd {
        Cmd::Watch => watch(api, &args).await,
        Cmd::Once => once(api, &args).await,
        Cmd::EmergencyStop { yes } => command(api.as_ref(), Command::TriggerEmergencyStop, yes).await,
        Cmd::ResetEmergencyStop { yes } => command(api.as_ref(), Command::ResetEmergencyStop, yes).await,
    }
}

/// Log sink, plus a recorder fed over a channel when RECORD_FILE is set.
async fn build_sink(args: &Args) -> io::Result<(FanoutSink, Option<JoinHandle<()>>)> {
    let mut sink = FanoutSink::new().with(LogSink);
    let Some(target) = &args.record else {
        return Ok((sink, None));
    };
    let writer = recorder::open_writer(target).await?;
    let (tx, rx) = mpsc::channel::<DisplayEvent>(RECORD_QUEUE);
    let task = tokio::spawn(recorder::run(rx, writer));
    sink = sink.with(ChannelSink::new(tx));
    Ok((sink, Some(task)))
}

async fn watch(api: Arc<dyn DashboardApi>, args: &Args) -> i32 {
    // ---- Metrics ----
    metrics::init();
    if args.metrics_port != 0 {
        if let Err(e) = metrics::serve_metrics(args.metrics_port) {
            warn!(port = args.metrics_port, error = %e, "metrics endpoint disabled");
        }
    }

    let (sink, recorder_task) = match build_sink(args).await {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "cannot open record target");
            return 2;
        }
    };

    let handle = Orchestrator::new(api.clone(), Box::new(sink), args.refresh.clone()).spawn();
    tokio::spawn(wake::run_stdin(handle.waker(), api, handle.shutdown_signal()));

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "ctrl-c handler failed, stopping");
    }
    info!("shutting down");

    // dropping the orchestrator closes the record channel
    let last = handle.stop().await;
    let code = match &last {
        Some(orch) => {
            info!(cycles = orch.last_cycle(), connection = ?orch.connection(), "final state");
            0
        }
        None => 1,
    };
    drop(last);

    if let Some(task) = recorder_task {
        let _ = task.await;
    }
    code
}

async fn once(api: Arc<dyn DashboardApi>, args: &Args) -> i32 {
    let (sink, recorder_task) = match build_sink(args).await {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "cannot open record target");
            return 2;
        }
    };

    let mut orch = Orchestrator::new(api, Box::new(sink), args.refresh.clone());
    let report = orch.refresh(WakeReason::Manual).await;

    let summary = serde_json::json!({
        "cycle": report.cycle,
        "connection": orch.connection(),
        "emergency_stop": orch.emergency_stop(),
        "portfolio": orch.portfolio(),
        "chart": orch.chart().snapshot(),
        "last_update": orch.last_refreshed(),
    });
    match serde_json::to_string_pretty(&summary) {
        Ok(s) => println!("{s}"),
        Err(e) => error!(error = %e, "summary encode failed"),
    }

    let code = if orch.connection() == ConnectionState::Connected { 0 } else { 1 };
    drop(orch);
    if let Some(task) = recorder_task {
        let _ = task.await;
    }
    code
}

async fn command(api: &dyn DashboardApi, cmd: Command, yes: bool) -> i32 {
    if !yes {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut out = io::stdout();
        if !commands::confirm(cmd.prompt(), &mut input, &mut out) {
            println!("{}", CommandError::Cancelled);
            return 1;
        }
    }

    match commands::execute(api, cmd).await {
        Ok(msg) => {
            println!("{msg}");
            0
        }
        Err(e) => {
            println!("{e}");
            1
        }
    }
}
