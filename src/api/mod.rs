mod practicum;
mod response;

use async_trait::async_trait;
use serde_json::Value;

pub use practicum::PracticumClient;
pub use response::{current_date, extract_latest, ShapeError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Ошибка ответа API: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Эндпоинт {endpoint} недоступен. Код ответа API: {status}")]
    HttpStatus { status: u16, endpoint: String },

    #[error("Ошибка формата JSON: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Source of homework status payloads.
#[async_trait]
pub trait HomeworkApi: Send + Sync {
    /// Fetches statuses changed since `from_date` (Unix seconds). The body is
    /// returned undecoded beyond JSON; shape checks live in [`extract_latest`].
    async fn fetch(&self, from_date: i64) -> Result<Value, ApiError>;
}
