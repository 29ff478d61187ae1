use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod app;
mod backend;
mod config;
mod conversation;
mod design;
mod handler;
mod session;
mod tui;
mod ui;

use app::App;
use backend::BackendClient;
use config::Config;

#[derive(Parser, Debug)]
#[command(name = "atelier")]
#[command(version)]
#[command(about = "Terminal client for AI-guided ornament design sessions")]
struct Args {
    /// Base URL of the design backend
    #[arg(long)]
    backend_url: Option<String>,

    /// Directory for saved design images
    #[arg(long)]
    image_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let data_dir = config::data_dir()?;
    init_logging(&args, &data_dir)?;

    let config = Config::load().unwrap_or_else(|_| Config::new());
    let backend_url = args
        .backend_url
        .unwrap_or_else(|| config.backend_url().to_string());
    let image_dir = args
        .image_dir
        .or(config.image_dir)
        .unwrap_or_else(|| data_dir.join("designs"));

    let backend = BackendClient::new(&backend_url);
    tracing::info!(backend = %backend.base_url(), "starting design session");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();

    let mut app = App::new(backend, events.sender(), image_dir, data_dir);
    app.start_session();

    let result = run(&mut terminal, &mut events, &mut app).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut tui::Tui, events: &mut tui::EventHandler, app: &mut App) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event)?,
            None => break,
        }
    }
    Ok(())
}

/// Logging goes to a file; the terminal itself belongs to the UI.
fn init_logging(args: &Args, data_dir: &Path) -> Result<()> {
    let default_level = if args.verbose {
        "atelier_tui=trace"
    } else if args.debug {
        "atelier_tui=debug"
    } else {
        "atelier_tui=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create {}", data_dir.display()))?;
    let log_file =
        File::create(data_dir.join("atelier.log")).context("failed to create log file")?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(Arc::new(log_file)),
        )
        .init();

    Ok(())
}
