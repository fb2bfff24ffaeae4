use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

mod app;
mod ui;

use app::{App, AppEvent};
use infinilist::config::Config;
use infinilist::context::ListContext;
use infinilist::list::PageProvider;
use infinilist::provider::{open_in_memory, seed_customers, RestPageProvider, SqlitePageProvider};

/// Get the config directory path (~/.config/infinilist/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("infinilist"))
}

#[derive(Parser, Debug)]
#[command(
    name = "infinilist",
    about = "Browse a paged entity list in the terminal with lazy loading and session caching"
)]
struct Args {
    /// Config file (default: ~/.config/infinilist/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Load pages from this REST API instead of the built-in SQLite table
    #[arg(long, value_name = "URL")]
    api: Option<String>,

    /// Entity (table or REST collection) to list
    #[arg(long, default_value = "customers")]
    entity: String,

    /// Rows to seed into the in-memory SQLite table
    #[arg(long, default_value_t = 250)]
    rows: usize,

    /// Override the configured page size
    #[arg(long)]
    page_size: Option<u32>,

    /// Keep a header row at the top of the list
    #[arg(long)]
    header: bool,

    /// Append a footer row once everything is loaded
    #[arg(long)]
    footer: bool,

    /// Write logs here (default: ~/.config/infinilist/infinilist.log)
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

/// Route tracing output to a file; the terminal belongs to the renderer.
fn init_tracing(path: &Path) -> Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file '{}'", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
    }

    let log_path = args
        .log_file
        .clone()
        .unwrap_or_else(|| config_dir.join("infinilist.log"));
    init_tracing(&log_path)?;

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from '{}'", config_path.display()))?;

    if let Some(page_size) = args.page_size {
        anyhow::ensure!(page_size > 0, "--page-size must be at least 1");
        config.page_size = page_size;
    }
    if args.api.is_some() {
        config.api_base_url = args.api.clone();
    }
    config.has_header |= args.header;
    config.has_footer |= args.footer;
    tracing::info!(config = ?config, "Starting");

    let provider: Arc<dyn PageProvider> = match &config.api_base_url {
        Some(base) => {
            tracing::info!(base = %base, entity = %args.entity, "Using REST provider");
            Arc::new(
                RestPageProvider::from_config(&config, &args.entity)
                    .context("Failed to configure REST provider")?,
            )
        }
        None => {
            let pool = open_in_memory()
                .await
                .context("Failed to open in-memory database")?;
            seed_customers(&pool, args.rows)
                .await
                .context("Failed to seed demo data")?;
            Arc::new(
                SqlitePageProvider::customers(pool).context("Failed to create SQLite provider")?,
            )
        }
    };

    let entity = if config.api_base_url.is_some() {
        args.entity.clone()
    } else {
        "customers".to_string()
    };

    let context = ListContext::from_config(config);
    let mut app = App::new(context, provider, entity);

    let (event_tx, event_rx) = mpsc::channel::<AppEvent>(32);
    ui::run(&mut app, event_tx, event_rx).await?;

    Ok(())
}
