use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Sent when the API reports no submissions inside the polled window.
pub const NOT_YET_ACCEPTED: &str = "Работа еще не принята на проверку";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomeworkStatus {
    Approved,
    Reviewing,
    Rejected,
}

impl HomeworkStatus {
    pub const ALL: [HomeworkStatus; 3] = [
        HomeworkStatus::Approved,
        HomeworkStatus::Reviewing,
        HomeworkStatus::Rejected,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            HomeworkStatus::Approved => "approved",
            HomeworkStatus::Reviewing => "reviewing",
            HomeworkStatus::Rejected => "rejected",
        }
    }

    pub fn verdict(&self) -> &'static str {
        match self {
            HomeworkStatus::Approved => "Работа проверена: ревьюеру всё понравилось. Ура!",
            HomeworkStatus::Reviewing => "Работа взята на проверку ревьюером.",
            HomeworkStatus::Rejected => "Работа проверена: у ревьюера есть замечания.",
        }
    }
}

impl fmt::Display for HomeworkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for HomeworkStatus {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.code() == s)
            .ok_or_else(|| FormatError::UnknownStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("В ответе API отсутствует ключ \"{0}\"")]
    FieldMissing(&'static str),

    #[error("Статус \"{0}\" в ответе API не соответствует ожидаемым")]
    UnknownStatus(String),
}

/// One entry of the `homeworks` array. Unknown fields are kept so two records
/// compare equal only when the API returned identical objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    #[serde(default)]
    pub homework_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Submission {
    #[cfg(test)]
    pub fn new(homework_name: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            homework_name: Some(homework_name.into()),
            status: Some(status.into()),
            extra: Map::new(),
        }
    }

    pub fn parsed_status(&self) -> Result<HomeworkStatus, FormatError> {
        self.status
            .as_deref()
            .ok_or(FormatError::FieldMissing("status"))?
            .parse()
    }
}

/// Renders the chat message announcing `submission`'s current review state.
pub fn format_status(submission: &Submission) -> Result<String, FormatError> {
    render_status(submission)
        .inspect_err(|e| tracing::error!(error = %e, "Cannot format homework status"))
}

fn render_status(submission: &Submission) -> Result<String, FormatError> {
    let name = submission
        .homework_name
        .as_deref()
        .ok_or(FormatError::FieldMissing("homework_name"))?;
    let status = submission.parsed_status()?;

    tracing::info!(homework = name, %status, "Homework status updated");
    Ok(format!(
        "Изменился статус проверки работы \"{}\". {}",
        name,
        status.verdict()
    ))
}
