use crate::api::{current_date, extract_latest, HomeworkApi, PracticumClient};
use crate::core::credentials::Credentials;
use crate::core::models::{format_status, Submission, NOT_YET_ACCEPTED};
use crate::core::settings::Settings;
use crate::daemon::CycleError;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Serialize)]
struct CheckOutput {
    endpoint: String,
    from_date: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_date: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    latest: Option<Submission>,
    message: String,
}

/// One-shot poll: prints what the daemon would send, without sending it.
pub async fn run(settings: &Settings, from_date: i64, json: bool) -> Result<()> {
    let token = Credentials::practicum_token_from_env()?;
    let client = PracticumClient::new(&settings.api, &token)
        .context("Failed to build homework API client")?;

    let payload = client.fetch(from_date).await?;
    let latest = extract_latest(&payload)?;
    let message = chat_message(latest.as_ref());

    let output = CheckOutput {
        endpoint: client.endpoint().to_string(),
        from_date,
        current_date: current_date(&payload),
        latest,
        message,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_text_output(&output);
    }

    Ok(())
}

/// The text the daemon would post for `latest`, including its failure message
/// when the record cannot be formatted.
fn chat_message(latest: Option<&Submission>) -> String {
    match latest {
        Some(submission) => {
            format_status(submission).unwrap_or_else(|e| CycleError::from(e).chat_message())
        }
        None => NOT_YET_ACCEPTED.to_string(),
    }
}

fn print_text_output(output: &CheckOutput) {
    println!("Endpoint:  {}", output.endpoint);
    println!("From date: {}", format_timestamp(output.from_date));
    if let Some(ts) = output.current_date {
        println!("Server:    {}", format_timestamp(ts));
    }

    if let Some(latest) = &output.latest {
        println!(
            "Latest:    {} ({})",
            latest.homework_name.as_deref().unwrap_or("<unnamed>"),
            latest.status.as_deref().unwrap_or("<no status>")
        );
    }

    println!();
    println!("{}", output.message);
}

fn format_timestamp(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .map(|dt| format!("{} ({})", dt.to_rfc3339(), ts))
        .unwrap_or_else(|| ts.to_string())
}
