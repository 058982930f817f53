// ===============================
// src/commands.rs
// ===============================
//
// One-shot operator commands. Fire once, report the service's answer,
// never retry.
//

use std::io::{BufRead, Write};

use tracing::{error, info, warn};

use crate::api::{CommandAck, DashboardApi};
use crate::error::CommandError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    TriggerEmergencyStop,
    ResetEmergencyStop,
}

impl Command {
    pub fn prompt(&self) -> &'static str {
        match self {
            Command::TriggerEmergencyStop => {
                "Are you sure you want to trigger emergency stop? This will halt all trading."
            }
            Command::ResetEmergencyStop => {
                "Are you sure you want to reset emergency stop? Trading will resume."
            }
        }
    }

    fn done(&self) -> &'static str {
        match self {
            Command::TriggerEmergencyStop => "Emergency stop activated successfully",
            Command::ResetEmergencyStop => "Emergency stop reset successfully",
        }
    }

    fn failed(&self) -> &'static str {
        match self {
            Command::TriggerEmergencyStop => "Failed to activate emergency stop",
            Command::ResetEmergencyStop => "Failed to reset emergency stop",
        }
    }
}

/// y/yes (any case) confirms; anything else, including EOF, cancels.
pub fn confirm<R: BufRead, W: Write>(question: &str, input: &mut R, out: &mut W) -> bool {
    let _ = write!(out, "{question} [y/N] ");
    let _ = out.flush();
    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(0) | Err(_) => false,
        Ok(_) => matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
    }
}

/// Send the command exactly once and translate the answer for the operator.
pub async fn execute(api: &dyn DashboardApi, cmd: Command) -> Result<String, CommandError> {
    let result = match cmd {
        Command::TriggerEmergencyStop => api.trigger_emergency_stop().await,
        Command::ResetEmergencyStop => api.reset_emergency_stop().await,
    };

    match result {
        Ok(CommandAck { success: true, message, .. }) => {
            let msg = message.unwrap_or_else(|| cmd.done().to_string());
            info!(command = ?cmd, %msg, "command accepted");
            Ok(cmd.done().to_string())
        }
        Ok(CommandAck { error, .. }) => {
            let reason = error.unwrap_or_else(|| "unknown error".to_string());
            warn!(command = ?cmd, %reason, "command rejected");
            Err(CommandError::Rejected(format!("{}: {reason}", cmd.failed())))
        }
        Err(e) => {
            error!(command = ?cmd, error = %e, "command request failed");
            Err(CommandError::Request(e))
        }
    }
}
