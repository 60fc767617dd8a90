use api_client::{ApiClient, Asset, DamBackend, ThumbnailSize};
use clap::{Parser, Subcommand};
use preview::{resolve, PreviewRenderer};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tasks::{PollConfig, PollController, PollOutcome, TagAutocomplete};
use tokio::sync::mpsc;

#[path = "../config.rs"]
mod config;
#[path = "../logging.rs"]
mod logging;

#[derive(Parser)]
#[command(name = "asset_cli", author, version, about = "AssetDesk asset and thumbnail CLI")]
struct Cli {
    /// Override log level (e.g. info, debug)
    #[arg(long)]
    log_level: Option<String>,
    /// Override the API base URL
    #[arg(long)]
    api_url: Option<String>,
    /// Override the thumbnail poll interval in milliseconds
    #[arg(long)]
    poll_interval_ms: Option<u64>,
    /// Give up watching after this many polls (0 = never)
    #[arg(long)]
    max_polls: Option<u32>,
    /// Path to config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Enable tokio console for debugging
    #[arg(long)]
    debug_console: bool,
    /// Enable tracing spans instrumentation
    #[arg(long)]
    trace_spans: bool,
    /// Store tokens in ~/.assetdesk/tokens.json instead of the system keyring
    #[arg(long)]
    use_file_store: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store the personal API token
    Login {
        #[arg(long)]
        token: String,
        /// CSRF token sent with state-changing requests
        #[arg(long)]
        csrf: Option<String>,
    },
    /// Forget stored credentials
    Logout,
    /// List assets with their thumbnail state
    ListAssets {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 25)]
        per_page: u32,
    },
    /// Show one asset
    ShowAsset {
        id: String,
        /// Print the raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Poll an asset until its thumbnail settles
    Watch { id: String },
    /// Retry a failed thumbnail
    Retry { id: String },
    /// Generate a thumbnail for a skipped asset
    Generate { id: String },
    /// Regenerate thumbnail styles (admin)
    RegenerateStyles {
        id: String,
        /// Style to regenerate; repeat for several
        #[arg(long = "style")]
        styles: Vec<ThumbnailSize>,
        #[arg(long)]
        force_imagick: bool,
    },
    /// Show recent activity for an asset
    Activity { id: String },
    /// Show view and download counts
    Metrics { id: String },
    /// Save a thumbnail to disk
    DownloadThumbnail {
        id: String,
        #[arg(long, default_value = "medium")]
        size: ThumbnailSize,
        #[arg(long)]
        out: PathBuf,
    },
    /// Suggest tags for a query
    Tags { query: String },
    /// Show a metadata field with its categories
    ShowField { id: u64 },
    /// Set the categories a metadata field applies to
    SetFieldCategories {
        id: u64,
        /// Comma separated category ids to enable; all others are suppressed
        #[arg(long, value_delimiter = ',')]
        enable: Vec<u64>,
        /// Comma separated category ids where the field is primary
        #[arg(long, value_delimiter = ',')]
        primary: Vec<u64>,
    },
}

fn describe(asset: &Asset) -> String {
    let resolved = resolve(asset, 0);
    format!(
        "{}  {}  {}  {}",
        asset.id, asset.filename, asset.thumbnail_status, resolved.state
    )
}

fn backend(cfg: &config::AppConfig) -> Result<Arc<dyn DamBackend>, Box<dyn std::error::Error>> {
    let credentials = auth::load_credentials()?;
    let client = ApiClient::with_timeout(cfg.api_base_url.clone(), credentials, cfg.request_timeout())?;
    Ok(Arc::new(client))
}

#[cfg_attr(feature = "trace-spans", tracing::instrument)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.use_file_store {
        std::env::set_var(auth::USE_FILE_STORE_ENV, "1");
    }

    let overrides = config::AppConfigOverrides {
        log_level: cli.log_level.clone(),
        api_base_url: cli.api_url.clone(),
        poll_interval_ms: cli.poll_interval_ms,
        max_polls: cli.max_polls,
        thumbnails_preload: None,
        debug_console: cli.debug_console,
        trace_spans: cli.trace_spans,
    };
    let cfg = config::AppConfig::load_from(cli.config.clone()).apply_overrides(&overrides);
    std::fs::create_dir_all(&cfg.cache_path)?;
    let _guard = logging::init(&cfg.log_level, &cfg.cache_path, "asset_cli.log", cfg.debug_console);

    match cli.command {
        Commands::Login { token, csrf } => {
            auth::store_api_token(&token)?;
            if let Some(csrf) = csrf {
                auth::store_csrf_token(&csrf)?;
            }
            println!("Token stored");
        }
        Commands::Logout => {
            auth::clear_credentials()?;
            println!("Logged out");
        }
        Commands::ListAssets { page, per_page } => {
            let backend = backend(&cfg)?;
            let page = backend.list_assets(page, per_page).await?;
            for asset in &page.data {
                println!("{}", describe(asset));
            }
            println!(
                "Page {} of {} ({} assets)",
                page.current_page, page.last_page, page.total
            );
        }
        Commands::ShowAsset { id, json } => {
            let backend = backend(&cfg)?;
            let asset = backend.get_asset(&id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&asset)?);
            } else {
                let resolved = resolve(&asset, 0);
                println!("ID: {}", asset.id);
                println!("Filename: {}", asset.filename);
                println!("MIME type: {}", asset.mime_type);
                println!("Thumbnail status: {}", asset.thumbnail_status);
                println!("Thumbnail state: {}", resolved.state);
                if let Some(url) = &resolved.thumbnail_url {
                    println!("Thumbnail: {}", url);
                }
                if let Some(error) = &resolved.error_message {
                    println!("Error: {}", error);
                }
                println!("Server retries: {}", asset.thumbnail_retry_count);
                println!("Updated: {}", asset.updated_at.to_rfc3339());
            }
        }
        Commands::Watch { id } => {
            let backend = backend(&cfg)?;
            let asset = backend.get_asset(&id).await?;
            println!("{}", describe(&asset));

            let (tx, mut rx) = mpsc::unbounded_channel::<Asset>();
            let printer = tokio::spawn(async move {
                let mut renderer = PreviewRenderer::new();
                while let Some(snapshot) = rx.recv().await {
                    if renderer.observe(&snapshot) {
                        println!("{}", describe(&snapshot));
                    }
                }
            });
            let poll = PollConfig::new(cfg.poll_interval(), cfg.max_polls());
            let handle = PollController::start(backend, &asset, 0, poll, move |snapshot| {
                let _ = tx.send(snapshot);
            });
            let outcome = handle.finished().await;
            let _ = printer.await;
            match outcome {
                PollOutcome::Settled(state) => println!("Settled: {}", state),
                PollOutcome::Exhausted => println!("Gave up after {} polls", cfg.max_polls),
                PollOutcome::Cancelled => println!("Watch cancelled"),
            }
        }
        Commands::Retry { id } => {
            let backend = backend(&cfg)?;
            tasks::retry_thumbnail(backend, id.clone()).await?;
            println!("Retry queued for {}", id);
        }
        Commands::Generate { id } => {
            let backend = backend(&cfg)?;
            tasks::generate_thumbnail(backend, id.clone()).await?;
            println!("Generation queued for {}", id);
        }
        Commands::RegenerateStyles { id, styles, force_imagick } => {
            let backend = backend(&cfg)?;
            let styles: Vec<String> = styles.iter().map(|s| s.as_str().to_string()).collect();
            let listed = styles.join(", ");
            tasks::regenerate_styles(backend, id.clone(), styles, force_imagick).await?;
            println!("Regenerating {} for {}", listed, id);
        }
        Commands::Activity { id } => {
            let backend = backend(&cfg)?;
            let events = tasks::fetch_activity(backend, id).await?;
            if events.is_empty() {
                println!("No activity");
            }
            for event in events {
                println!(
                    "{}  {}  {}{}",
                    event.created_at.to_rfc3339(),
                    event.action,
                    event.user_name.as_deref().unwrap_or("system"),
                    event
                        .description
                        .map(|d| format!("  {}", d))
                        .unwrap_or_default()
                );
            }
        }
        Commands::Metrics { id } => {
            let backend = backend(&cfg)?;
            let metrics = tasks::fetch_metrics(backend, id).await?;
            println!("Views: {}", metrics.views);
            println!("Downloads: {}", metrics.downloads);
        }
        Commands::DownloadThumbnail { id, size, out } => {
            let backend = backend(&cfg)?;
            let bytes = backend.thumbnail_bytes(&id, size).await?;
            if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&out, &bytes)?;
            println!("Saved {} bytes to {}", bytes.len(), out.display());
        }
        Commands::Tags { query } => {
            let backend = backend(&cfg)?;
            let autocomplete = TagAutocomplete::new(backend, std::time::Duration::ZERO);
            match autocomplete.query(query).await {
                Some(Ok(suggestions)) => {
                    for suggestion in suggestions {
                        println!("{} ({:?})", suggestion.name, suggestion.kind);
                    }
                }
                Some(Err(e)) => return Err(e.into()),
                None => {}
            }
        }
        Commands::ShowField { id } => {
            let backend = backend(&cfg)?;
            let data = tasks::load_field_editor(backend, id).await?;
            println!("Field: {} ({})", data.field.label, data.field.name);
            println!("Type: {}", data.field.field_type);
            println!("AI eligible: {}", data.field.is_ai_eligible);
            for option in &data.field.options {
                println!("  option {} = {}", option.label, option.value);
            }
            for category in &data.categories {
                let enabled = data.enabled.contains(&category.id);
                let vis = data.visibility.get(&category.id);
                println!(
                    "  [{}] {} (id: {}){}{}",
                    if enabled { "x" } else { " " },
                    category.name,
                    category.id,
                    if vis.map_or(false, |v| v.is_primary) { " primary" } else { "" },
                    if vis.map_or(false, |v| v.is_required) { " required" } else { "" },
                );
            }
        }
        Commands::SetFieldCategories { id, enable, primary } => {
            let backend = backend(&cfg)?;
            let data = tasks::load_field_editor(backend.clone(), id).await?;
            let known: BTreeSet<u64> = data.categories.iter().map(|c| c.id).collect();
            if let Some(unknown) = enable.iter().find(|c| !known.contains(c)) {
                return Err(format!("unknown category {}", unknown).into());
            }
            let mut edit = data.edit();
            edit.enabled = enable.into_iter().collect();
            for category in &primary {
                edit.set_primary(*category, true);
            }
            let report = tasks::submit_field_editor(backend, data, edit).await;
            match report.first_error() {
                None => println!("Saved field {} ({} calls)", id, report.attempted.len()),
                Some(failure) => {
                    for failure in &report.failures {
                        eprintln!("{} failed: {}", failure.call, failure.message);
                    }
                    return Err(format!("{} of {} calls failed, first: {}", report.failures.len(), report.attempted.len(), failure.call).into());
                }
            }
        }
    }

    Ok(())
}
