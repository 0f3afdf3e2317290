//! # slugge
//!
//! Project backend binary: opens the store, starts the processing tracker and
//! serves the HTTP/WebSocket API until interrupted.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use slugge_engine::{AssistantConfig, ProcessingConfig, ProcessingTracker};
use slugge_server::ServerConfig;
use slugge_store::Database;
use slugge_telemetry::TelemetryConfig;

/// Slugge project backend.
#[derive(Parser, Debug)]
#[command(name = "slugge", about = "Slugge project backend")]
struct Cli {
    /// Host to bind.
    #[arg(long, env = "SLUGGE_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to bind (0 for auto-assign).
    #[arg(long, env = "SLUGGE_PORT", default_value = "8000")]
    port: u16,

    /// Path to the SQLite database.
    #[arg(long, env = "DATABASE_PATH", default_value = "slugge.db")]
    db_path: PathBuf,

    /// Serve the demo user from the auth endpoints.
    #[arg(
        long,
        env = "DEMO_MODE",
        default_value = "true",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    demo_mode: bool,

    /// Browser origin allowed by CORS.
    #[arg(long, env = "FRONTEND_ORIGIN", default_value = "http://localhost:5173")]
    frontend_origin: String,

    /// Prefix for minted share links.
    #[arg(long, env = "SHARE_BASE_URL", default_value = "http://localhost:5173/share")]
    share_base_url: String,

    /// Base URL for checkout and billing-portal links.
    #[arg(long, env = "BILLING_BASE_URL", default_value = "https://billing.example.com")]
    billing_base_url: String,

    /// Emit JSON log lines.
    #[arg(long, env = "SLUGGE_LOG_JSON")]
    log_json: bool,

    /// Evict completed processing runs after this many seconds. Kept forever when unset.
    #[arg(long, env = "STATUS_RETENTION_SECS")]
    status_retention_secs: Option<u64>,
}

impl Cli {
    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            frontend_origin: self.frontend_origin.clone(),
            share_base_url: self.share_base_url.clone(),
            billing_base_url: self.billing_base_url.clone(),
            demo_mode: self.demo_mode,
            ..ServerConfig::default()
        }
    }

    fn processing_config(&self) -> ProcessingConfig {
        ProcessingConfig {
            status_retention: self.status_retention_secs.map(Duration::from_secs),
            ..ProcessingConfig::default()
        }
    }

    fn telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig {
            json: self.log_json,
            ..TelemetryConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    slugge_telemetry::init_telemetry(&cli.telemetry_config())
        .context("Failed to initialize telemetry")?;

    let db = Database::open(&cli.db_path)
        .with_context(|| format!("Failed to open database at {}", cli.db_path.display()))?;

    let tracker = Arc::new(ProcessingTracker::new(db.clone(), cli.processing_config()));
    let eviction = slugge_engine::start_eviction_task(Arc::clone(&tracker));

    let handle = slugge_server::start(
        cli.server_config(),
        db,
        Arc::clone(&tracker),
        AssistantConfig::default(),
    )
    .await
    .context("Failed to start server")?;
    tracing::info!(port = handle.port(), demo_mode = cli.demo_mode, "slugge ready");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl+c")?;

    tracing::info!("shutting down");
    let cancelled = tracker.cancel_all();
    if cancelled > 0 {
        tracing::info!(cancelled, "cancelled processing runs");
    }
    if let Some(task) = eviction {
        task.abort();
    }
    handle.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_server_config() {
        let cli = Cli::parse_from(["slugge"]);
        let config = cli.server_config();
        assert_eq!(config.port, 8000);
        assert_eq!(config.frontend_origin, "http://localhost:5173");
        assert!(config.demo_mode);
        assert!(cli.processing_config().status_retention.is_none());
    }

    #[test]
    fn every_flag_has_help_text() {
        use clap::CommandFactory;

        let command = Cli::command();
        for arg in command.get_arguments() {
            if matches!(arg.get_id().as_str(), "help" | "version") {
                continue;
            }
            assert!(arg.get_help().is_some(), "--{} has no help text", arg.get_id());
        }
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "slugge",
            "--port",
            "9100",
            "--demo-mode",
            "false",
            "--status-retention-secs",
            "600",
            "--log-json",
        ]);
        assert_eq!(cli.server_config().port, 9100);
        assert!(!cli.server_config().demo_mode);
        assert_eq!(
            cli.processing_config().status_retention,
            Some(Duration::from_secs(600))
        );
        assert!(cli.telemetry_config().json);
    }
}
