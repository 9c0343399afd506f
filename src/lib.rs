//! ETS - Employer Tracking System
//!
//! A job-search tool server speaking newline-delimited JSON-RPC, plus an
//! LLM agent client that drives the tools through a workflow-enforcing
//! orchestration loop.
//!
//! # Architecture
//!
//! - **Protocol layer**: JSON-RPC 2.0 wire types and error envelopes
//! - **Server layer**: TCP transport loop, tool registry, and dispatch
//! - **Tool layer**: job search, keyword persistence, analysis, graph
//!   inspection, and spreadsheet export behind narrow collaborator traits
//! - **Agent layer**: model client, RPC client, and the orchestrator loop

pub mod agent;
pub mod config;
pub mod domain;
pub mod error;
pub mod protocol;
pub mod providers;
pub mod server;
pub mod tools;

pub use error::{AppError, AppResult};

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the logging system with structured logging
///
/// Log levels are configurable via the RUST_LOG environment variable;
/// the default keeps the crate at info and silences noisy HTTP internals.
pub fn initialize_logging() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ets=info,reqwest=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}
