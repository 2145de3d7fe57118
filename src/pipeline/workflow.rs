use std::pin::pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, watch};

use crate::api::{AnalysisApi, TransportError, UploadRequest};
use crate::models::Report;
use crate::repository;

use super::types::{WorkflowConfig, WorkflowError, WorkflowState};
use super::validator::UploadValidator;

/// Buffered upload-progress events per request.
const PROGRESS_BUFFER: usize = 32;

/// Cancellable state machine driving one analysis attempt:
/// Idle → Validating → Uploading(0..=100) → Extracting → Normalizing →
/// Generating → Complete, with Failed reachable from any non-terminal
/// state.
///
/// The analysis request runs concurrently with the timed processing
/// phases; the phases only pace user feedback. Observers subscribe to a
/// watch channel; transitions are strictly sequential per instance, and
/// after `cancel()` no further transition is observable.
pub struct AnalysisWorkflow<A: AnalysisApi> {
    api: Arc<A>,
    validator: UploadValidator,
    config: WorkflowConfig,
    state_tx: watch::Sender<WorkflowState>,
    cancel_tx: watch::Sender<bool>,
    running: AtomicBool,
}

impl<A: AnalysisApi> AnalysisWorkflow<A> {
    pub fn new(api: Arc<A>, validator: UploadValidator, config: WorkflowConfig) -> Self {
        let (state_tx, _) = watch::channel(WorkflowState::Idle);
        let (cancel_tx, _) = watch::channel(false);
        Self {
            api,
            validator,
            config,
            state_tx,
            cancel_tx,
            running: AtomicBool::new(false),
        }
    }

    /// Observe state transitions. The receiver sees the latest state;
    /// rapid transitions may coalesce, but never out of order.
    pub fn subscribe(&self) -> watch::Receiver<WorkflowState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> WorkflowState {
        self.state_tx.borrow().clone()
    }

    /// Abandon the in-flight attempt. Idempotent; the pending request and
    /// phase timers are dropped and no further transition is observable.
    pub fn cancel(&self) {
        if !self.cancel_tx.send_replace(true) {
            tracing::info!("Analysis workflow cancelled");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel_tx.borrow()
    }

    /// Drive one full analysis attempt. Errors also land in
    /// `WorkflowState::Failed` (except cancellation, which leaves the last
    /// observed state in place).
    pub async fn submit(&self, upload: UploadRequest) -> Result<Report, WorkflowError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(WorkflowError::Busy);
        }

        let result = self.run(upload).await;
        if let Err(error) = &result {
            if !matches!(error, WorkflowError::Cancelled) {
                self.fail(error.to_string());
            }
        }

        self.running.store(false, Ordering::SeqCst);
        result
    }

    async fn run(&self, upload: UploadRequest) -> Result<Report, WorkflowError> {
        // A fresh attempt clears any stale cancellation and re-enters Idle.
        self.cancel_tx.send_replace(false);
        self.state_tx.send_replace(WorkflowState::Idle);
        self.transition(WorkflowState::Validating)?;

        let file_name = upload.file_name.clone();
        self.validator.validate(&upload.meta())?;

        self.transition(WorkflowState::Uploading { progress: 0 })?;

        let (progress_tx, mut progress_rx) = mpsc::channel(PROGRESS_BUFFER);
        let mut cancel_rx = self.cancel_tx.subscribe();
        let mut request = pin!(self.api.analyze(upload, progress_tx));
        let mut outcome: Option<Result<Value, TransportError>> = None;
        let mut last_progress = 0u8;

        // Upload stage: relay progress events until the channel closes.
        loop {
            tokio::select! {
                _ = cancel_rx.changed() => return Err(WorkflowError::Cancelled),
                result = &mut request, if outcome.is_none() => {
                    outcome = Some(result);
                }
                maybe = progress_rx.recv() => match maybe {
                    Some(percent) => {
                        let percent = percent.min(100);
                        if percent > last_progress {
                            last_progress = percent;
                            self.transition(WorkflowState::Uploading { progress: percent })?;
                        }
                    }
                    None => break,
                }
            }
            if outcome.is_some() {
                break;
            }
        }

        if let Some(Err(error)) = outcome {
            return Err(WorkflowError::Transport(error));
        }
        if last_progress < 100 {
            self.transition(WorkflowState::Uploading { progress: 100 })?;
        }

        // Processing phases pace feedback while the request keeps running;
        // once the response is in, remaining phases pass without their timer.
        let phases = [
            (WorkflowState::Extracting, self.config.extracting),
            (WorkflowState::Normalizing, self.config.normalizing),
            (WorkflowState::Generating, self.config.generating),
        ];
        for (state, duration) in phases {
            self.transition(state)?;
            if outcome.is_none() {
                tokio::select! {
                    _ = cancel_rx.changed() => return Err(WorkflowError::Cancelled),
                    result = &mut request => outcome = Some(result),
                    _ = tokio::time::sleep(duration) => {}
                }
            }
        }

        let result = match outcome {
            Some(result) => result,
            None => tokio::select! {
                _ = cancel_rx.changed() => return Err(WorkflowError::Cancelled),
                result = &mut request => result,
            },
        };
        let payload = result?;

        let mut report = repository::normalize(&payload);
        if report.source_filename.is_none() {
            report.source_filename = Some(file_name);
        }
        self.transition(WorkflowState::Complete)?;
        tracing::info!(
            report_id = %report.id,
            risk = %report.risk_summary.overall_risk,
            "Analysis complete"
        );
        Ok(report)
    }

    /// Guarded transition: refused after cancellation, checked against
    /// the legal state order.
    fn transition(&self, next: WorkflowState) -> Result<(), WorkflowError> {
        if self.is_cancelled() {
            return Err(WorkflowError::Cancelled);
        }
        debug_assert!(
            self.state().can_advance_to(&next),
            "illegal transition {:?} -> {:?}",
            self.state(),
            next
        );
        tracing::debug!(state = ?next, "Workflow state");
        self.state_tx.send_replace(next);
        Ok(())
    }

    fn fail(&self, reason: String) {
        if self.is_cancelled() || self.state().is_terminal() {
            return;
        }
        tracing::warn!(%reason, "Analysis workflow failed");
        self.state_tx.send_replace(WorkflowState::Failed { reason });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// Mock collaborator with a configurable delay and outcome.
    struct MockApi {
        payload: Value,
        fail: bool,
        delay: Duration,
    }

    impl MockApi {
        fn ok(payload: Value) -> Self {
            Self {
                payload,
                fail: false,
                delay: Duration::from_millis(20),
            }
        }

        fn failing() -> Self {
            Self {
                payload: Value::Null,
                fail: true,
                delay: Duration::from_millis(5),
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    impl AnalysisApi for MockApi {
        async fn analyze(
            &self,
            _upload: UploadRequest,
            progress: mpsc::Sender<u8>,
        ) -> Result<Value, TransportError> {
            for percent in [25u8, 60, 100] {
                let _ = progress.send(percent).await;
            }
            drop(progress);
            tokio::time::sleep(self.delay).await;
            if self.fail {
                Err(TransportError::Network("connection refused".into()))
            } else {
                Ok(self.payload.clone())
            }
        }

        async fn fetch_report(&self, id: uuid::Uuid) -> Result<Value, TransportError> {
            Err(TransportError::Status {
                status: 404,
                message: format!("no report {id}"),
            })
        }

        async fn fetch_history(&self) -> Result<Vec<Value>, TransportError> {
            Ok(vec![])
        }
    }

    fn sample_payload() -> Value {
        serde_json::json!({
            "reportType": "Complete Blood Count",
            "summary": "Your results show values within expected limits.",
            "tests": [
                {"name": "Hemoglobin", "value": 14.1, "unit": "g/dL", "referenceRange": "13.2-16.6", "status": "Normal"}
            ],
            "lifestyle": ["Maintain a regular health check-up schedule."]
        })
    }

    fn workflow(api: MockApi) -> AnalysisWorkflow<MockApi> {
        let config = WorkflowConfig {
            extracting: Duration::from_millis(1),
            normalizing: Duration::from_millis(1),
            generating: Duration::from_millis(1),
        };
        AnalysisWorkflow::new(Arc::new(api), UploadValidator::default(), config)
    }

    fn png_upload() -> UploadRequest {
        UploadRequest::new("report.png", "image/png", vec![0u8; 2048])
    }

    #[tokio::test]
    async fn valid_upload_runs_to_complete() {
        let workflow = workflow(MockApi::ok(sample_payload()));
        let mut states = workflow.subscribe();

        // Record every state the observer can see; the watch channel may
        // coalesce rapid transitions but must never show them out of order.
        let observer = tokio::spawn(async move {
            let mut seen = Vec::new();
            while states.changed().await.is_ok() {
                let state = states.borrow_and_update().clone();
                let done = state.is_terminal();
                seen.push(state);
                if done {
                    break;
                }
            }
            seen
        });

        let report = workflow.submit(png_upload()).await.unwrap();
        assert_eq!(report.report_type, "Complete Blood Count");
        assert_eq!(report.source_filename.as_deref(), Some("report.png"));
        assert_eq!(workflow.state(), WorkflowState::Complete);

        let seen = observer.await.unwrap();
        assert_eq!(seen.last(), Some(&WorkflowState::Complete));
        for pair in seen.windows(2) {
            assert!(
                pair[1].rank() >= pair[0].rank(),
                "observed out-of-order states: {:?} then {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[tokio::test]
    async fn rejected_upload_fails_then_resubmission_succeeds() {
        let workflow = workflow(MockApi::ok(sample_payload()));

        let docx = UploadRequest::new(
            "report.docx",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            vec![0u8; 64],
        );
        let error = workflow.submit(docx).await.unwrap_err();
        assert!(matches!(error, WorkflowError::Validation(_)));
        assert!(matches!(workflow.state(), WorkflowState::Failed { .. }));

        // Failed is terminal for the attempt only; a new submission restarts.
        let report = workflow.submit(png_upload()).await.unwrap();
        assert_eq!(workflow.state(), WorkflowState::Complete);
        assert!(!report.tests.is_empty());
    }

    #[tokio::test]
    async fn transport_error_lands_in_failed_state() {
        let workflow = workflow(MockApi::failing());
        let error = workflow.submit(png_upload()).await.unwrap_err();
        assert!(matches!(error, WorkflowError::Transport(_)));
        match workflow.state() {
            WorkflowState::Failed { reason } => assert!(reason.contains("connection refused")),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancel_stops_all_observable_transitions() {
        let workflow = Arc::new(workflow(
            MockApi::ok(sample_payload()).with_delay(Duration::from_millis(200)),
        ));

        let task = {
            let workflow = workflow.clone();
            tokio::spawn(async move { workflow.submit(png_upload()).await })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;

        workflow.cancel();
        workflow.cancel(); // idempotent
        let frozen = workflow.state();

        let result = task.await.unwrap();
        assert!(matches!(result, Err(WorkflowError::Cancelled)));

        // Even after the mock's response would have arrived, the state
        // must not move again.
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(workflow.state(), frozen);
    }

    #[tokio::test]
    async fn concurrent_submission_is_rejected() {
        let workflow = Arc::new(workflow(
            MockApi::ok(sample_payload()).with_delay(Duration::from_millis(100)),
        ));

        let first = {
            let workflow = workflow.clone();
            tokio::spawn(async move { workflow.submit(png_upload()).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let second = workflow.submit(png_upload()).await;
        assert!(matches!(second, Err(WorkflowError::Busy)));

        assert!(first.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn late_response_still_walks_every_phase_in_order() {
        // Response arrives long after the phase timers have elapsed.
        let workflow = workflow(
            MockApi::ok(sample_payload()).with_delay(Duration::from_millis(80)),
        );
        let report = workflow.submit(png_upload()).await.unwrap();
        assert_eq!(workflow.state(), WorkflowState::Complete);
        assert_eq!(report.tests.len(), 1);
    }
}
