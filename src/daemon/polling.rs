use crate::api::{current_date, extract_latest, ApiError, HomeworkApi, ShapeError};
use crate::core::models::{format_status, FormatError, NOT_YET_ACCEPTED};
use crate::core::store::DedupCache;
use crate::notifier::Notifier;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error(transparent)]
    Format(#[from] FormatError),
}

impl CycleError {
    pub fn kind(&self) -> &'static str {
        match self {
            CycleError::Api(ApiError::Transport(_)) => "transport",
            CycleError::Api(ApiError::HttpStatus { .. }) => "http_status",
            CycleError::Api(ApiError::Decode(_)) => "decode",
            CycleError::Shape(_) => "shape",
            CycleError::Format(_) => "format",
        }
    }

    pub fn chat_message(&self) -> String {
        format!("Сбой в работе программы: {}", self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    StatusNotified,
    StatusUnchanged,
    ErrorNotified,
    ErrorSuppressed,
}

pub struct PollLoop {
    api: Box<dyn HomeworkApi>,
    notifier: Notifier,
    cache: DedupCache,
    cursor: i64,
    interval: Duration,
}

impl PollLoop {
    pub fn new(
        api: Box<dyn HomeworkApi>,
        notifier: Notifier,
        cursor: i64,
        interval: Duration,
    ) -> Self {
        Self {
            api,
            notifier,
            cache: DedupCache::new(),
            cursor,
            interval,
        }
    }

    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    /// Polls until `shutdown` resolves. Shutdown is only observed while
    /// sleeping between cycles, so a cycle in flight always completes.
    pub async fn run<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            cursor = self.cursor,
            "Polling loop started"
        );

        tokio::pin!(shutdown);

        loop {
            let outcome = self.run_cycle().await;
            tracing::debug!(?outcome, cursor = self.cursor(), "Cycle finished");

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested, stopping polling loop");
                    return;
                }
            }
        }
    }

    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let payload = match self.api.fetch(self.cursor).await {
            Ok(payload) => payload,
            // No response this cycle: the cursor stays where it was.
            Err(e) => return self.report_failure(e.into()).await,
        };

        let outcome = match self.process(&payload).await {
            Ok(outcome) => outcome,
            Err(e) => self.report_failure(e).await,
        };

        self.advance_cursor(&payload);
        outcome
    }

    async fn process(&mut self, payload: &Value) -> Result<CycleOutcome, CycleError> {
        let latest = extract_latest(payload)?;

        if !self.cache.submission_changed(latest.as_ref()) {
            tracing::debug!("Homework status unchanged");
            return Ok(CycleOutcome::StatusUnchanged);
        }

        let message = match &latest {
            Some(submission) => format_status(submission)?,
            None => {
                tracing::info!("No submissions in the polled window");
                NOT_YET_ACCEPTED.to_string()
            }
        };

        self.notifier.notify(&message).await;
        self.cache.mark_submission_notified(latest);
        Ok(CycleOutcome::StatusNotified)
    }

    async fn report_failure(&mut self, error: CycleError) -> CycleOutcome {
        let message = error.chat_message();
        tracing::warn!(kind = error.kind(), error = %error, "Poll cycle failed");

        if !self.cache.error_changed(&message) {
            tracing::debug!("Same error already reported, not notifying again");
            return CycleOutcome::ErrorSuppressed;
        }

        self.notifier.notify(&message).await;
        self.cache.mark_error_notified(message);
        CycleOutcome::ErrorNotified
    }

    fn advance_cursor(&mut self, payload: &Value) {
        match current_date(payload) {
            Some(next) => self.cursor = next,
            None => {
                tracing::warn!(
                    cursor = self.cursor,
                    "Response has no integer current_date, keeping cursor"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::testing::RecordingTransport;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Replays scripted responses and records the cursor of every request.
    #[derive(Clone, Default)]
    struct ScriptedApi {
        responses: Arc<Mutex<VecDeque<Result<Value, ApiError>>>>,
        cursors: Arc<Mutex<Vec<i64>>>,
    }

    impl ScriptedApi {
        fn push_ok(&self, payload: Value) {
            self.responses.lock().unwrap().push_back(Ok(payload));
        }

        fn push_err(&self, error: ApiError) {
            self.responses.lock().unwrap().push_back(Err(error));
        }

        fn cursors(&self) -> Vec<i64> {
            self.cursors.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HomeworkApi for ScriptedApi {
        async fn fetch(&self, from_date: i64) -> Result<Value, ApiError> {
            self.cursors.lock().unwrap().push(from_date);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("no scripted response left")
        }
    }

    fn unavailable() -> ApiError {
        ApiError::HttpStatus {
            status: 503,
            endpoint: "https://practicum.yandex.ru/api/user_api/homework_statuses/".to_string(),
        }
    }

    fn setup(cursor: i64) -> (PollLoop, ScriptedApi, RecordingTransport) {
        let api = ScriptedApi::default();
        let transport = RecordingTransport::default();
        let poll = PollLoop::new(
            Box::new(api.clone()),
            Notifier::new(Box::new(transport.clone()), "42"),
            cursor,
            Duration::from_secs(600),
        );
        (poll, api, transport)
    }

    #[tokio::test]
    async fn test_approved_status_is_notified_and_cursor_advances() {
        let (mut poll, api, transport) = setup(1000);
        api.push_ok(json!({
            "homeworks": [{"homework_name": "hw1", "status": "approved"}],
            "current_date": 2000,
        }));

        assert_eq!(poll.run_cycle().await, CycleOutcome::StatusNotified);
        assert_eq!(
            transport.texts(),
            vec!["Изменился статус проверки работы \"hw1\". Работа проверена: ревьюеру всё понравилось. Ура!"]
        );
        assert_eq!(api.cursors(), vec![1000]);
        assert_eq!(poll.cursor(), 2000);
    }

    #[tokio::test]
    async fn test_empty_homeworks_sends_fallback() {
        let (mut poll, api, transport) = setup(1000);
        api.push_ok(json!({"homeworks": [], "current_date": 2500}));

        assert_eq!(poll.run_cycle().await, CycleOutcome::StatusNotified);
        assert_eq!(transport.texts(), vec![NOT_YET_ACCEPTED]);
        assert_eq!(poll.cursor(), 2500);
    }

    #[tokio::test]
    async fn test_http_error_reported_once() {
        let (mut poll, api, transport) = setup(1000);
        api.push_err(unavailable());
        api.push_err(unavailable());

        assert_eq!(poll.run_cycle().await, CycleOutcome::ErrorNotified);
        assert_eq!(poll.run_cycle().await, CycleOutcome::ErrorSuppressed);

        let texts = transport.texts();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].starts_with("Сбой в работе программы: "));
        assert!(texts[0].contains("503"));
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_cursor() {
        let (mut poll, api, _transport) = setup(1000);
        api.push_err(unavailable());
        api.push_ok(json!({"homeworks": [], "current_date": 3000}));

        poll.run_cycle().await;
        assert_eq!(poll.cursor(), 1000);

        poll.run_cycle().await;
        assert_eq!(api.cursors(), vec![1000, 1000]);
        assert_eq!(poll.cursor(), 3000);
    }

    #[tokio::test]
    async fn test_unchanged_submission_notified_once() {
        let (mut poll, api, transport) = setup(1000);
        let payload = json!({
            "homeworks": [{"homework_name": "hw1", "status": "reviewing"}],
            "current_date": 2000,
        });
        api.push_ok(payload.clone());
        api.push_ok(payload);

        assert_eq!(poll.run_cycle().await, CycleOutcome::StatusNotified);
        assert_eq!(poll.run_cycle().await, CycleOutcome::StatusUnchanged);
        assert_eq!(transport.texts().len(), 1);
        assert_eq!(api.cursors(), vec![1000, 2000]);
    }

    #[tokio::test]
    async fn test_status_change_notifies_again() {
        let (mut poll, api, transport) = setup(1000);
        api.push_ok(json!({
            "homeworks": [{"homework_name": "hw1", "status": "reviewing"}],
            "current_date": 2000,
        }));
        api.push_ok(json!({
            "homeworks": [{"homework_name": "hw1", "status": "rejected"}],
            "current_date": 3000,
        }));

        poll.run_cycle().await;
        poll.run_cycle().await;

        let texts = transport.texts();
        assert_eq!(texts.len(), 2);
        assert!(texts[1].ends_with("Работа проверена: у ревьюера есть замечания."));
    }

    #[tokio::test]
    async fn test_unknown_status_reported_as_failure() {
        let (mut poll, api, transport) = setup(1000);
        let payload = json!({
            "homeworks": [{"homework_name": "hw1", "status": "pending"}],
            "current_date": 2000,
        });
        api.push_ok(payload.clone());
        api.push_ok(payload);

        assert_eq!(poll.run_cycle().await, CycleOutcome::ErrorNotified);
        assert_eq!(poll.cursor(), 2000);
        // The record was never announced, so it is retried and the repeated
        // error is suppressed.
        assert_eq!(poll.run_cycle().await, CycleOutcome::ErrorSuppressed);

        assert_eq!(
            transport.texts(),
            vec!["Сбой в работе программы: Статус \"pending\" в ответе API не соответствует ожидаемым"]
        );
    }

    #[tokio::test]
    async fn test_shape_error_still_advances_cursor() {
        let (mut poll, api, transport) = setup(1000);
        api.push_ok(json!({"current_date": 2000}));

        assert_eq!(poll.run_cycle().await, CycleOutcome::ErrorNotified);
        assert_eq!(poll.cursor(), 2000);
        assert_eq!(
            transport.texts(),
            vec!["Сбой в работе программы: В ответе API отсутствует список домашних работ с ключом \"homeworks\""]
        );
    }

    #[tokio::test]
    async fn test_missing_current_date_keeps_cursor() {
        let (mut poll, api, _transport) = setup(1000);
        api.push_ok(json!({"homeworks": []}));

        poll.run_cycle().await;
        assert_eq!(poll.cursor(), 1000);
    }

    #[tokio::test]
    async fn test_delivery_failure_still_updates_cache() {
        let api = ScriptedApi::default();
        let transport = RecordingTransport::failing();
        let mut poll = PollLoop::new(
            Box::new(api.clone()),
            Notifier::new(Box::new(transport.clone()), "42"),
            1000,
            Duration::from_secs(600),
        );
        let payload = json!({"homeworks": [], "current_date": 2000});
        api.push_ok(payload.clone());
        api.push_ok(payload);

        assert_eq!(poll.run_cycle().await, CycleOutcome::StatusNotified);
        assert_eq!(poll.run_cycle().await, CycleOutcome::StatusUnchanged);
        assert_eq!(transport.texts().len(), 1);
    }

    #[tokio::test]
    async fn test_error_notified_again_after_different_error() {
        let (mut poll, api, transport) = setup(1000);
        api.push_err(unavailable());
        api.push_ok(json!({"homeworks": "oops", "current_date": 2000}));
        api.push_err(unavailable());

        assert_eq!(poll.run_cycle().await, CycleOutcome::ErrorNotified);
        assert_eq!(poll.run_cycle().await, CycleOutcome::ErrorNotified);
        assert_eq!(poll.run_cycle().await, CycleOutcome::ErrorNotified);
        assert_eq!(transport.texts().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let (poll, api, transport) = setup(1000);
        api.push_ok(json!({"homeworks": [], "current_date": 2000}));

        poll.run(async {}).await;

        assert_eq!(transport.texts(), vec![NOT_YET_ACCEPTED]);
        assert_eq!(api.cursors(), vec![1000]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_sleeps_between_cycles() {
        let (poll, api, transport) = setup(1000);
        api.push_ok(json!({"homeworks": [], "current_date": 2000}));
        api.push_ok(json!({"homeworks": [], "current_date": 3000}));

        // Two cycles fit before shutdown at 900s with a 600s interval.
        poll.run(tokio::time::sleep(Duration::from_secs(900))).await;

        assert_eq!(api.cursors(), vec![1000, 2000]);
        assert_eq!(transport.texts().len(), 1);
    }
}
