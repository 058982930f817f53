// ===============================
// src/lib.rs
// ===============================
pub mod api;
pub mod chart;
pub mod commands;
pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod positions;
pub mod recorder;
pub mod risk;
pub mod sink;
pub mod tracker;
pub mod wake;
