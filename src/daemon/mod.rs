mod polling;

pub(crate) use polling::CycleError;

use crate::api::PracticumClient;
use crate::core::credentials::{CredentialError, Credentials};
use crate::core::settings::Settings;
use crate::notifier::{Notifier, TelegramTransport};
use anyhow::{Context, Result};
use chrono::Utc;
use polling::PollLoop;

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Credentials(#[from] CredentialError),

    #[error("Failed to build homework API client")]
    Client(#[source] reqwest::Error),
}

pub async fn run(settings: Settings) -> Result<()> {
    tracing::info!("Starting homework-bot daemon");

    let lookup = |name: &str| std::env::var(name).ok();
    let poll_loop = match startup(&settings, lookup, Utc::now().timestamp()) {
        Ok(poll_loop) => poll_loop,
        Err(StartupError::Credentials(CredentialError::Missing(variable))) => {
            tracing::error!(
                critical = true,
                variable,
                "Required environment variable is missing, shutting down"
            );
            std::process::exit(1);
        }
        Err(e @ StartupError::Client(_)) => return Err(e).context("Daemon startup failed"),
    };

    poll_loop.run(shutdown_signal()).await;

    tracing::info!("homework-bot daemon stopped");
    Ok(())
}

/// Checks credentials and wires the API client and notifier into a loop whose
/// cursor starts at `now`. Nothing is built when a credential is missing.
fn startup<F>(settings: &Settings, lookup: F, now: i64) -> Result<PollLoop, StartupError>
where
    F: Fn(&str) -> Option<String>,
{
    let credentials = Credentials::from_lookup(lookup)?;
    tracing::info!("Environment variables checked");

    let api = PracticumClient::new(&settings.api, &credentials.practicum_token)
        .map_err(StartupError::Client)?;
    let transport = TelegramTransport::new(&settings.telegram, &credentials.telegram_token);
    let notifier = Notifier::new(Box::new(transport), credentials.telegram_chat_id);

    Ok(PollLoop::new(
        Box::new(api),
        notifier,
        now,
        settings.poll.interval(),
    ))
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
