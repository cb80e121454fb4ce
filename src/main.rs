use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod app;
mod client;
mod config;
mod conversation;
mod handler;
mod tui;
mod turn;
mod ui;

use app::App;
use config::Config;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "charla")]
#[command(version)]
#[command(about = "Terminal chat client for a hosted assistant", long_about = None)]
struct Cli {
    /// Prediction endpoint to send messages to
    #[arg(long)]
    endpoint: Option<String>,

    /// Display name shown next to your messages
    #[arg(long)]
    name: Option<String>,

    /// Start with the light color theme
    #[arg(long)]
    light: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) -> Result<()> {
    let log_path = Config::get_log_path()?;
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let log_file = OpenOptions::new().create(true).append(true).open(&log_path)?;

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // The terminal belongs to the UI, so logs go to a file
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load().unwrap_or_else(|_| Config::new());

    let endpoint = cli
        .endpoint
        .or(config.endpoint)
        .unwrap_or_else(|| config::DEFAULT_ENDPOINT.to_string());
    let username = cli
        .name
        .or(config.username)
        .unwrap_or_else(|| config::DEFAULT_USERNAME.to_string());
    let light_theme = cli.light || config.light_theme.unwrap_or(false);

    init_logging(cli.verbose)?;
    info!("Starting charla with endpoint {}", endpoint);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let mut app = App::new(&endpoint, username, light_theme);
    let mut events = EventHandler::new();

    let result = run(&mut app, &mut terminal, &mut events).await;

    tui::restore()?;
    result
}

async fn run(app: &mut App, terminal: &mut tui::Tui, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;
        if let Some(event) = events.next().await {
            handler::handle_event(app, event).await?;
        }
    }
    Ok(())
}
