// ===============================
// src/config.rs
// ===============================
/*
=============================================================================
Project : risk_dashboard — live portfolio risk dashboard core in Rust
Module  : config.rs
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
use std::env;
use std::str::FromStr;
use std::time::Duration;

use dotenvy::dotenv;
use url::Url;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_REFRESH_MS: u64 = 5_000;
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_CHART_POINTS: usize = 20;
pub const DEFAULT_MAX_IN_FLIGHT: usize = 2;
pub const DEFAULT_METRICS_PORT: u16 = 9899;

/// Where projected display events go besides the log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordTarget {
    Stdout,
    File(String),
}

impl RecordTarget {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "" => None,
            "-" => Some(RecordTarget::Stdout),
            path => Some(RecordTarget::File(path.to_string())),
        }
    }
}

/// Timing knobs of the update orchestrator.
#[derive(Clone, Debug)]
pub struct RefreshCfg {
    pub interval: Duration,
    pub fetch_timeout: Duration,
    pub chart_points: usize,
    pub max_in_flight: usize,
}

impl Default for RefreshCfg {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_REFRESH_MS),
            fetch_timeout: Duration::from_millis(DEFAULT_FETCH_TIMEOUT_MS),
            chart_points: DEFAULT_CHART_POINTS,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Args {
    pub api_url: Url,
    pub refresh: RefreshCfg,
    pub metrics_port: u16, // 0 = off
    pub record: Option<RecordTarget>,
    pub log_filter: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid DASHBOARD_API_URL {url:?}: {source}")]
    ApiUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

pub fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw.trim()).map_err(|source| ConfigError::ApiUrl {
        url: raw.to_string(),
        source,
    })
}

/// Load `.env` + environment. `api_override` (from the CLI) wins over the env.
pub fn load(api_override: Option<&str>) -> Result<Args, ConfigError> {
    // .env optional
    let _ = dotenv();

    let raw_url = match api_override {
        Some(u) => u.to_string(),
        None => env::var("DASHBOARD_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
    };
    let api_url = parse_api_url(&raw_url)?;

    // ===== Refresh cadence =====
    let refresh = RefreshCfg {
        interval: Duration::from_millis(env_or("REFRESH_INTERVAL_MS", DEFAULT_REFRESH_MS).max(1)),
        fetch_timeout: Duration::from_millis(
            env_or("FETCH_TIMEOUT_MS", DEFAULT_FETCH_TIMEOUT_MS).max(1),
        ),
        chart_points: env_or("CHART_POINTS", DEFAULT_CHART_POINTS).max(1),
        max_in_flight: env_or("MAX_IN_FLIGHT_CYCLES", DEFAULT_MAX_IN_FLIGHT).max(1),
    };

    // ===== Outputs =====
    let metrics_port = env_or("METRICS_PORT", DEFAULT_METRICS_PORT);
    let record = env::var("RECORD_FILE").ok().and_then(|s| RecordTarget::parse(&s));
    let log_filter = env::var("LOG_FILTER").unwrap_or_else(|_| "info".to_string());

    Ok(Args {
        api_url,
        refresh,
        metrics_port,
        record,
        log_filter,
    })
}
