// ===============================
// src/wake.rs
// ===============================
//
// Wake producers. Every source pushes into the same bounded queue with
// try_send: a full queue already holds a pending refresh, so nothing is lost
// by dropping and producers never block.
//
// Sources:
// - timer   : every REFRESH_INTERVAL_MS
// - stdin   : lines "focus" / "visible" / "refresh" from the hosting shell
// - manual  : after a successful one-shot command ("emergency-stop" /
//             "reset-emergency-stop" lines, already confirmed by the host)
//

use std::fmt;
use std::sync::Arc;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::{mpsc, watch},
    time::{interval, Duration, MissedTickBehavior},
};
use tracing::{debug, info};

use crate::api::DashboardApi;
use crate::commands::{self, Command};

pub const WAKE_QUEUE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WakeReason {
    Startup,
    Timer,
    Focus,
    Visible,
    Manual,
}

impl WakeReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            WakeReason::Startup => "startup",
            WakeReason::Timer => "timer",
            WakeReason::Focus => "focus",
            WakeReason::Visible => "visible",
            WakeReason::Manual => "manual",
        }
    }
}

impl fmt::Display for WakeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of host input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    Wake(WakeReason),
    Command(Command),
}

impl HostEvent {
    /// Unknown lines are ignored.
    pub fn parse_line(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "focus" => Some(HostEvent::Wake(WakeReason::Focus)),
            "visible" | "visibilitychange" => Some(HostEvent::Wake(WakeReason::Visible)),
            "refresh" | "r" => Some(HostEvent::Wake(WakeReason::Manual)),
            "emergency-stop" => Some(HostEvent::Command(Command::TriggerEmergencyStop)),
            "reset-emergency-stop" => Some(HostEvent::Command(Command::ResetEmergencyStop)),
            _ => None,
        }
    }
}

/// Non-blocking wake; false only if the consumer is gone.
pub fn wake(tx: &mpsc::Sender<WakeReason>, reason: WakeReason) -> bool {
    match tx.try_send(reason) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            debug!(%reason, "wake queue full, refresh already pending");
            true
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    }
}

/// Recurring timer producer. The first tick is skipped; the orchestrator
/// refreshes on start on its own.
pub async fn run_timer(
    tx: mpsc::Sender<WakeReason>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut tick = interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tick.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                if !wake(&tx, WakeReason::Timer) {
                    break;
                }
            }
        }
    }
    debug!("timer stopped");
}

/// Host events on stdin (focus / visibility changes, confirmed commands).
/// Commands run inline, one at a time; success wakes a refresh.
pub async fn run_stdin(
    tx: mpsc::Sender<WakeReason>,
    api: Arc<dyn DashboardApi>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            line = lines.next_line() => match line {
                Ok(Some(l)) => {
                    let reason = match HostEvent::parse_line(&l) {
                        Some(HostEvent::Wake(reason)) => reason,
                        Some(HostEvent::Command(cmd)) => {
                            match commands::execute(api.as_ref(), cmd).await {
                                Ok(msg) => info!(%msg, "command done"),
                                Err(e) => info!(error = %e, "command failed"),
                            }
                            WakeReason::Manual
                        }
                        None => continue,
                    };
                    if !wake(&tx, reason) {
                        break;
                    }
                }
                Ok(None) => {
                    info!("stdin closed, host events disabled");
                    break;
                }
                Err(e) => {
                    debug!(?e, "stdin read error");
                    break;
                }
            }
        }
    }
}
