use crate::core::settings::TelegramSettings;
use crate::notifier::{ChatTransport, DeliveryError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct BotApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Telegram Bot API `sendMessage`.
pub struct TelegramTransport {
    client: reqwest::Client,
    send_message_url: String,
}

impl TelegramTransport {
    pub fn new(settings: &TelegramSettings, bot_token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            send_message_url: format!(
                "{}/bot{}/sendMessage",
                settings.api_base.trim_end_matches('/'),
                bot_token
            ),
        }
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&self.send_message_url)
            .json(&SendMessageRequest { chat_id, text })
            .send()
            .await
            // The URL embeds the bot token.
            .map_err(reqwest::Error::without_url)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(reqwest::Error::without_url)?;
        let parsed: Option<BotApiResponse> = serde_json::from_str(&body).ok();

        match parsed {
            Some(reply) if status.is_success() && reply.ok => Ok(()),
            Some(reply) => Err(DeliveryError::Rejected {
                status: status.as_u16(),
                description: reply
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            }),
            None => Err(DeliveryError::Rejected {
                status: status.as_u16(),
                description: body,
            }),
        }
    }
}
