use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod cli;
mod core;
mod daemon;
mod notifier;

use crate::core::settings::Settings;

#[derive(Parser)]
#[command(name = "homework-bot")]
#[command(author, version, about = "Relays Practicum homework review status changes to Telegram")]
struct Cli {
    /// Config file (default: ~/.config/homework-bot/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the polling daemon
    Daemon,

    /// Fetch the latest homework status once and print it
    Check {
        /// Unix timestamp to request statuses from (default: 0, all time)
        #[arg(long, default_value = "0")]
        from_date: i64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(json: bool) {
    let registry = tracing_subscriber::registry().with(env_filter());

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Loads `path`, or `.env` from the working directory or its parents. An
/// absent file is not an error.
fn load_env_file(path: Option<&Path>) -> Result<Option<PathBuf>, dotenvy::Error> {
    let loaded = match path {
        Some(path) => dotenvy::from_path(path).map(|()| path.to_path_buf()),
        None => dotenvy::dotenv(),
    };

    match loaded {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

fn report_env_file(loaded: Result<Option<PathBuf>, dotenvy::Error>) {
    match loaded {
        Ok(Some(path)) => tracing::debug!(?path, "Loaded environment file"),
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "Failed to load .env file"),
    }
}

/// `.env` may set `RUST_LOG`, so it is read before the subscriber is built and
/// its outcome is logged afterwards.
fn init_environment(json_logs: bool) {
    let loaded = load_env_file(None);
    init_logging(json_logs);
    report_env_file(loaded);
}

fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let settings = Settings::load(path)?;
    settings.validate()?;
    Ok(settings)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Daemon => {
            init_environment(cli.json_logs);
            let settings = load_settings(cli.config.as_deref())?;
            daemon::run(settings).await
        }
        Commands::Check { from_date, json } => {
            init_environment(cli.json_logs);
            let settings = load_settings(cli.config.as_deref())?;
            cli::check::run(&settings, from_date, json).await
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
    }
}
