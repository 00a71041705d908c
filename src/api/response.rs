use crate::core::models::Submission;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ShapeError {
    #[error("Ответ API не соответствует ожиданиям")]
    NotAMapping,

    #[error("В ответе API отсутствует список домашних работ с ключом \"homeworks\"")]
    MissingHomeworks,

    #[error("Тип значения ключа \"homeworks\" не соответствует ожидаемому")]
    HomeworksNotASequence,

    #[error("Некорректная запись о домашней работе: {0}")]
    MalformedRecord(String),
}

/// Returns the most recent submission, i.e. the first element of `homeworks`
/// as ordered by the API. `Ok(None)` means nothing has been submitted in the
/// polled window.
pub fn extract_latest(payload: &Value) -> Result<Option<Submission>, ShapeError> {
    let object = match payload.as_object() {
        Some(object) if !object.is_empty() => object,
        _ => {
            tracing::error!(
                expected = "non-empty JSON object",
                "Homework API response has unexpected shape"
            );
            return Err(ShapeError::NotAMapping);
        }
    };

    let Some(homeworks) = object.get("homeworks") else {
        tracing::error!(
            expected = "\"homeworks\" key",
            "Homework API response has unexpected shape"
        );
        return Err(ShapeError::MissingHomeworks);
    };

    let Some(homeworks) = homeworks.as_array() else {
        tracing::error!(
            expected = "\"homeworks\" to be an array",
            "Homework API response has unexpected shape"
        );
        return Err(ShapeError::HomeworksNotASequence);
    };

    let Some(first) = homeworks.first() else {
        return Ok(None);
    };

    Submission::deserialize(first).map(Some).map_err(|e| {
        tracing::error!(
            expected = "homework record object",
            error = %e,
            "Homework API response has unexpected shape"
        );
        ShapeError::MalformedRecord(e.to_string())
    })
}

/// The server clock reported alongside the statuses, used as the next cursor.
pub fn current_date(payload: &Value) -> Option<i64> {
    payload.get("current_date").and_then(Value::as_i64)
}
