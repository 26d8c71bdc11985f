pub mod api;
pub mod app;
pub mod auth;
pub mod cli;
pub mod command;
pub mod compose;
pub mod config;
pub mod event;
pub mod interaction;
pub mod recent;
pub mod ui;
pub mod validate;

use app::App;
use clap::Parser;
use cli::{Cli, CliCommand};
use config::load_config;
use recent::{FileStore, RecentSearches};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    // Initialize tracing (logs to stderr if RUST_LOG is set).
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        // No subcommand or explicit `tui` → launch the interactive TUI.
        None | Some(CliCommand::Tui) => run_tui().await,
        Some(CliCommand::Login { email }) => cli::run_login(email).await,
        Some(CliCommand::Logout) => cli::run_logout().await,
        // All other subcommands → non-interactive JSONL output.
        Some(cmd) => cli::run_command(cmd).await,
    }
}

/// Launch the interactive TUI.
async fn run_tui() -> color_eyre::Result<()> {
    let config = load_config();

    // Backend credentials are required; a session is not (guests can browse).
    let api_client = cli::build_api_client()?;
    match api_client.session() {
        Some(session) => tracing::info!(user = %session.user.id, "session loaded"),
        None => tracing::info!("no saved session, browsing as guest"),
    }

    let recent = RecentSearches::load(
        Box::new(FileStore::new(FileStore::default_path())),
        config.recent_search_limit,
    );

    let terminal = ratatui::init();
    let result = App::new(config, api_client, recent).run(terminal).await;
    ratatui::restore();
    result
}
