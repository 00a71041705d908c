use crate::api::{ApiError, HomeworkApi};
use crate::core::settings::ApiSettings;
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

pub struct PracticumClient {
    client: reqwest::Client,
    endpoint: String,
    authorization: String,
}

impl PracticumClient {
    pub fn new(settings: &ApiSettings, token: &str) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = settings.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let authorization = match settings.auth_scheme.as_deref() {
            Some(scheme) => format!("{} {}", scheme, token),
            None => token.to_string(),
        };

        Ok(Self {
            client: builder.build()?,
            endpoint: settings.endpoint.clone(),
            authorization,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl HomeworkApi for PracticumClient {
    async fn fetch(&self, from_date: i64) -> Result<Value, ApiError> {
        tracing::debug!(endpoint = %self.endpoint, from_date, "Requesting homework statuses");

        let response = self
            .client
            .get(&self.endpoint)
            .header(AUTHORIZATION, &self.authorization)
            .query(&[("from_date", from_date)])
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, endpoint = %self.endpoint, "Homework API request failed");
                ApiError::Transport(e)
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            tracing::error!(
                endpoint = %self.endpoint,
                status = status.as_u16(),
                "Homework API returned unexpected status"
            );
            return Err(ApiError::HttpStatus {
                status: status.as_u16(),
                endpoint: self.endpoint.clone(),
            });
        }

        // Raw bytes: `text()` would silently replace invalid UTF-8.
        let body = response.bytes().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to read homework API response body");
            ApiError::Transport(e)
        })?;

        serde_json::from_slice(&body).map_err(|e| {
            tracing::error!(error = %e, "Homework API response is not valid JSON");
            ApiError::Decode(e)
        })
    }
}
