// ===============================
// src/metrics.rs
// ===============================
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, Gauge, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use tracing::{error, info, warn};

// Single custom registry (we register everything here)
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

// -------- Refresh cadence --------
pub static CYCLES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("refresh_cycles_total", "refresh cycles started (label: reason)"),
        &["reason"],
    )
    .expect("metric: refresh_cycles_total")
});

pub static WAKES_COALESCED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "wake_events_coalesced_total",
        "wake events folded into an already pending refresh",
    )
    .expect("metric: wake_events_coalesced_total")
});

pub static IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("refresh_cycles_in_flight", "cycles with outstanding fetches")
        .expect("metric: refresh_cycles_in_flight")
});

// -------- Fetch adapters --------
pub static FETCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("fetch_results_total", "fetch results (labels: kind, outcome)"),
        &["kind", "outcome"],
    )
    .expect("metric: fetch_results_total")
});

pub static STALE_DISCARDS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "stale_results_discarded_total",
            "results from superseded cycles dropped before projection (label: kind)",
        ),
        &["kind"],
    )
    .expect("metric: stale_results_discarded_total")
});

pub static FETCH_LATENCY: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new("fetch_latency_ms", "fetch round trip (ms)")
            .buckets(vec![5.0, 25.0, 100.0, 250.0, 1_000.0, 2_500.0, 5_000.0, 10_000.0]),
    )
    .expect("metric: fetch_latency_ms")
});

// -------- Derived state --------
pub static RISK_PERCENT: Lazy<Gauge> = Lazy::new(|| {
    Gauge::new("portfolio_risk_percent", "last projected total risk %")
        .expect("metric: portfolio_risk_percent")
});

pub static CONNECTION_UP: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("dashboard_connection_up", "1 if the service is reachable")
        .expect("metric: dashboard_connection_up")
});

pub static EMERGENCY_STOP: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("emergency_stop_active", "1 while the emergency stop is active")
        .expect("metric: emergency_stop_active")
});

pub static CHART_POINTS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("chart_points", "points held in the chart ring buffer")
        .expect("metric: chart_points")
});

pub fn init() {
    CONNECTION_UP.set(1);
    let results = [
        REGISTRY.register(Box::new(CYCLES.clone())),
        REGISTRY.register(Box::new(WAKES_COALESCED.clone())),
        REGISTRY.register(Box::new(IN_FLIGHT.clone())),
        REGISTRY.register(Box::new(FETCHES.clone())),
        REGISTRY.register(Box::new(STALE_DISCARDS.clone())),
        REGISTRY.register(Box::new(FETCH_LATENCY.clone())),
        REGISTRY.register(Box::new(RISK_PERCENT.clone())),
        REGISTRY.register(Box::new(CONNECTION_UP.clone())),
        REGISTRY.register(Box::new(EMERGENCY_STOP.clone())),
        REGISTRY.register(Box::new(CHART_POINTS.clone())),
    ];
    for r in results {
        if let Err(e) = r {
            warn!(%e, "metric registration failed");
        }
    }
}

// Encode all metrics in Prometheus text format
pub fn encode_metrics() -> Vec<u8> {
    let encoder = TextEncoder::new();
    let families = REGISTRY.gather();
    let mut buf = Vec::new();
    if encoder.encode(&families, &mut buf).is_err() || buf.is_empty() {
        buf.extend_from_slice(b"# no metrics\n");
    }
    buf
}

// Serve one HTTP request (GET / or /metrics); tiny HTTP 1.1 responder
fn handle_client(mut stream: TcpStream) {
    // Read a bit to consume headers (no full parse)
    let mut _req_buf = [0u8; 1024];
    let _ = stream.read(&mut _req_buf);

    let body = encode_metrics();
    let header = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain; version=0.0.4; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );

    let _ = stream.write_all(header.as_bytes());
    let _ = stream.write_all(&body);
    let _ = stream.flush();
}

// Bind first so a taken port is reported, then serve on a dedicated OS thread
// (keeps the single-threaded runtime free of blocking accept).
pub fn serve_metrics(port: u16) -> std::io::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr)?;
    info!("metrics listening on http://{addr}/ (and /metrics)");

    thread::spawn(move || {
        for conn in listener.incoming() {
            match conn {
                Ok(stream) => handle_client(stream),
                Err(e) => error!(%e, "metrics accept error"),
            }
        }
    });
    Ok(())
}
