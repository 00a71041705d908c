use std::fmt;

pub const PRACTICUM_TOKEN: &str = "PRACTICUM_TOKEN";
pub const TELEGRAM_TOKEN: &str = "TELEGRAM_TOKEN";
pub const TELEGRAM_CHAT_ID: &str = "TELEGRAM_CHAT_ID";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("required environment variable {0} is missing or empty")]
    Missing(&'static str),
}

/// Secrets read once at startup. `Debug` redacts the values.
#[derive(Clone)]
pub struct Credentials {
    pub practicum_token: String,
    pub telegram_token: String,
    pub telegram_chat_id: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self, CredentialError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Checks variables in a fixed order and reports the first one that is
    /// absent or blank.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CredentialError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            practicum_token: require(&lookup, PRACTICUM_TOKEN)?,
            telegram_token: require(&lookup, TELEGRAM_TOKEN)?,
            telegram_chat_id: require(&lookup, TELEGRAM_CHAT_ID)?,
        })
    }

    /// Only the API token, for commands that never talk to Telegram.
    pub fn practicum_token_from_env() -> Result<String, CredentialError> {
        require(&|name: &str| std::env::var(name).ok(), PRACTICUM_TOKEN)
    }
}

fn require<F>(lookup: &F, name: &'static str) -> Result<String, CredentialError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .filter(|value| !value.trim().is_empty())
        .ok_or(CredentialError::Missing(name))
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("practicum_token", &"<redacted>")
            .field("telegram_token", &"<redacted>")
            .field("telegram_chat_id", &self.telegram_chat_id)
            .finish()
    }
}
