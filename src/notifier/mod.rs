mod telegram;

use async_trait::async_trait;

pub use telegram::TelegramTransport;

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("chat transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("chat API rejected the message ({status}): {description}")]
    Rejected { status: u16, description: String },
}

/// Delivers plain text to a chat.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), DeliveryError>;
}

/// Sends to one fixed chat. Delivery failures are logged and dropped.
pub struct Notifier {
    transport: Box<dyn ChatTransport>,
    chat_id: String,
}

impl Notifier {
    pub fn new(transport: Box<dyn ChatTransport>, chat_id: impl Into<String>) -> Self {
        Self {
            transport,
            chat_id: chat_id.into(),
        }
    }

    pub async fn notify(&self, text: &str) {
        match self.transport.send_message(&self.chat_id, text).await {
            Ok(()) => {
                tracing::debug!(chat_id = %self.chat_id, "Message sent");
            }
            Err(e) => {
                tracing::error!(chat_id = %self.chat_id, error = %e, "Failed to send message");
            }
        }
    }
}
