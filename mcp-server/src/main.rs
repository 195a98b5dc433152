//! Lifetrack MCP Server
//!
//! Stdio MCP server that works on one tenant's goals and trips through the
//! Lifetrack HTTP API. Tools:
//! - `list_records`, `get_record`: read goals or trips, with filters and paging
//! - `create_record`, `update_record`, `delete_record`: edit them, with
//!   optimistic concurrency through the record version
//! - `goal_summary`: savings totals across all goals
//!
//! Environment:
//! - LIFETRACK_TENANT_ID: tenant every request acts as (required)
//! - LIFETRACK_API_URL: API base URL (default http://localhost:8080)
//! - RUST_LOG: log filter; logs are written to stderr

mod client;
mod server;

use anyhow::{Context, Result};
use rmcp::ServiceExt;
use server::LifetrackServer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the MCP protocol
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let server = LifetrackServer::from_env().context("Invalid Lifetrack configuration")?;
    tracing::info!("Starting Lifetrack MCP server on stdio");

    let service = server
        .serve((tokio::io::stdin(), tokio::io::stdout()))
        .await
        .context("MCP handshake failed")?;
    service.waiting().await?;
    tracing::info!("Lifetrack MCP server stopped");

    Ok(())
}
