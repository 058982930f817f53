// ===============================
// src/api.rs
// ===============================
//
// Fetch adapters against the dashboard service:
//   GET  /api/portfolio-status     -> { success, data, system_status }
//   GET  /api/signals              -> { success, signals }
//   GET  /api/positions            -> { success, positions }
//   POST /api/emergency-stop       -> { success, error? }
//   POST /api/reset-emergency-stop -> { success, error? }
//
// One round trip per call. Transport failures, `success=false` and malformed
// payloads all come back as Err(FetchError); nothing here panics on input.
//

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::domain::{
    CommandEnvelope, PortfolioEnvelope, PortfolioStatus, Position, PositionsEnvelope, Signal,
    SignalsEnvelope,
};
use crate::error::FetchError;

pub const PORTFOLIO_PATH: &str = "/api/portfolio-status";
pub const SIGNALS_PATH: &str = "/api/signals";
pub const POSITIONS_PATH: &str = "/api/positions";
pub const EMERGENCY_STOP_PATH: &str = "/api/emergency-stop";
pub const RESET_EMERGENCY_STOP_PATH: &str = "/api/reset-emergency-stop";

/// Service acknowledgement for a one-shot command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandAck {
    pub success: bool,
    pub message: Option<String>,
    pub error: Option<String>,
}

#[async_trait]
pub trait DashboardApi: Send + Sync {
    async fn fetch_portfolio_status(&self) -> Result<PortfolioStatus, FetchError>;

    async fn fetch_signals(&self) -> Result<Vec<Signal>, FetchError>;

    async fn fetch_positions(&self) -> Result<Vec<Position>, FetchError>;

    async fn trigger_emergency_stop(&self) -> Result<CommandAck, FetchError>;

    async fn reset_emergency_stop(&self) -> Result<CommandAck, FetchError>;
}

fn rejected(what: &str, error: Option<String>) -> FetchError {
    FetchError::Protocol(format!(
        "{what}: success=false ({})",
        error.unwrap_or_else(|| "no error message".to_string())
    ))
}

fn missing(what: &str, field: &str) -> FetchError {
    FetchError::Protocol(format!("{what}: missing `{field}` payload"))
}

// ---- envelope -> payload (shared with tests) ----

pub fn portfolio_from_body(body: &str) -> Result<PortfolioStatus, FetchError> {
    let env: PortfolioEnvelope = serde_json::from_str(body)?;
    if !env.success {
        return Err(rejected("portfolio-status", env.error));
    }
    let snapshot = env.data.ok_or_else(|| missing("portfolio-status", "data"))?;
    Ok(PortfolioStatus {
        snapshot,
        system: env.system_status.unwrap_or_default(),
    })
}

pub fn signals_from_body(body: &str) -> Result<Vec<Signal>, FetchError> {
    let env: SignalsEnvelope = serde_json::from_str(body)?;
    if !env.success {
        return Err(rejected("signals", env.error));
    }
    env.signals.ok_or_else(|| missing("signals", "signals"))
}

pub fn positions_from_body(body: &str) -> Result<Vec<Position>, FetchError> {
    let env: PositionsEnvelope = serde_json::from_str(body)?;
    if !env.success {
        return Err(rejected("positions", env.error));
    }
    env.positions.ok_or_else(|| missing("positions", "positions"))
}

pub fn command_from_body(body: &str) -> Result<CommandAck, FetchError> {
    let env: CommandEnvelope = serde_json::from_str(body)?;
    Ok(CommandAck {
        success: env.success,
        message: env.message,
        error: env.error,
    })
}

/// reqwest-backed adapter.
#[derive(Clone, Debug)]
pub struct HttpApi {
    base: Url,
    http: reqwest::Client,
}

impl HttpApi {
    pub fn new(base: Url, timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("risk_dashboard/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { base, http })
    }

    fn url(&self, path: &str) -> Result<Url, FetchError> {
        self.base
            .join(path)
            .map_err(|e| FetchError::Transport(format!("bad url {path}: {e}")))
    }

    // Body is read regardless of HTTP status: the service answers 500 with a
    // `{success:false, error}` envelope, which is more useful than the code.
    async fn get_body(&self, path: &str) -> Result<String, FetchError> {
        let url = self.url(path)?;
        let rsp = self.http.get(url).send().await.map_err(transport)?;
        let status = rsp.status();
        let body = rsp.text().await.map_err(transport)?;
        debug!(%path, %status, bytes = body.len(), "GET");
        Ok(body)
    }

    async fn post_body(&self, path: &str) -> Result<String, FetchError> {
        let url = self.url(path)?;
        let rsp = self
            .http
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body("{}")
            .send()
            .await
            .map_err(transport)?;
        let status = rsp.status();
        let body = rsp.text().await.map_err(transport)?;
        debug!(%path, %status, bytes = body.len(), "POST");
        Ok(body)
    }
}

fn transport(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Transport(format!("timeout: {e}"))
    } else {
        FetchError::from(e)
    }
}

#[async_trait]
impl DashboardApi for HttpApi {
    async fn fetch_portfolio_status(&self) -> Result<PortfolioStatus, FetchError> {
        portfolio_from_body(&self.get_body(PORTFOLIO_PATH).await?)
    }

    async fn fetch_signals(&self) -> Result<Vec<Signal>, FetchError> {
        signals_from_body(&self.get_body(SIGNALS_PATH).await?)
    }

    async fn fetch_positions(&self) -> Result<Vec<Position>, FetchError> {
        positions_from_body(&self.get_body(POSITIONS_PATH).await?)
    }

    async fn trigger_emergency_stop(&self) -> Result<CommandAck, FetchError> {
        command_from_body(&self.post_body(EMERGENCY_STOP_PATH).await?)
    }

    async fn reset_emergency_stop(&self) -> Result<CommandAck, FetchError> {
        command_from_body(&self.post_body(RESET_EMERGENCY_STOP_PATH).await?)
    }
}
