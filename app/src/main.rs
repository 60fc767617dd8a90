//! Main application entry point for AssetDesk.

use api_client::{ApiClient, DamBackend, Permissions};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use ui::{AppConfig, AppConfigOverrides, UiFlags};

mod logging;

#[derive(Parser)]
#[command(name = "assetdesk", author, version, about = "AssetDesk desktop client")]
struct Args {
    /// Path to config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override log level (e.g. info, debug)
    #[arg(long)]
    log_level: Option<String>,
    /// Override the API base URL
    #[arg(long)]
    api_url: Option<String>,
    /// Override the thumbnail poll interval in milliseconds
    #[arg(long)]
    poll_interval_ms: Option<u64>,
    /// Show the admin-only controls
    #[arg(long)]
    admin: bool,
    /// Hide every editing control
    #[arg(long, conflicts_with = "admin")]
    read_only: bool,
    /// Enable tokio console for debugging
    #[arg(long)]
    debug_console: bool,
    /// Enable tracing spans instrumentation
    #[arg(long)]
    trace_spans: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let overrides = AppConfigOverrides {
        log_level: args.log_level.clone(),
        api_base_url: args.api_url.clone(),
        poll_interval_ms: args.poll_interval_ms,
        debug_console: args.debug_console,
        trace_spans: args.trace_spans,
        ..AppConfigOverrides::default()
    };
    let cfg = AppConfig::load_from(args.config.clone()).apply_overrides(&overrides);
    std::fs::create_dir_all(&cfg.cache_path)?;
    let _guard = logging::init(&cfg.log_level, &cfg.cache_path, "assetdesk.log", cfg.debug_console);

    tracing::info!(api = %cfg.api_base_url, "starting AssetDesk");
    let credentials = match auth::load_credentials() {
        Ok(credentials) => credentials,
        Err(e) => {
            eprintln!("❌ {}", e);
            return Ok(());
        }
    };
    let client = ApiClient::with_timeout(cfg.api_base_url.clone(), credentials, cfg.request_timeout())?;
    let backend: Arc<dyn DamBackend> = Arc::new(client);

    let permissions = Permissions {
        can_edit: !args.read_only,
        is_admin: args.admin,
    };
    ui::run(UiFlags {
        backend,
        config: cfg,
        config_path: args.config,
        permissions,
    })?;
    Ok(())
}
