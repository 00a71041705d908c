use crate::core::models::Submission;

/// What the chat was last told about. Lives for the process lifetime only.
#[derive(Debug, Default)]
pub struct DedupCache {
    // Outer `None`: nothing sent yet. `Some(None)`: the "no submissions" message.
    last_submission: Option<Option<Submission>>,
    last_error: Option<String>,
}

impl DedupCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submission_changed(&self, latest: Option<&Submission>) -> bool {
        match &self.last_submission {
            Some(previous) => previous.as_ref() != latest,
            None => true,
        }
    }

    pub fn mark_submission_notified(&mut self, latest: Option<Submission>) {
        self.last_submission = Some(latest);
    }

    pub fn error_changed(&self, message: &str) -> bool {
        self.last_error.as_deref() != Some(message)
    }

    pub fn mark_error_notified(&mut self, message: String) {
        self.last_error = Some(message);
    }
}
