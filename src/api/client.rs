use std::convert::Infallible;
use std::sync::Arc;

use futures_util::Stream;
use reqwest::multipart;
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config;
use crate::models::{FeedbackEntry, ModerationPolicy, ReviewStatus};
use crate::session::SessionStore;

use super::{AdminApi, AnalysisApi, ChatApi, ChatReply, TransportError, UploadRequest};

/// Upload chunk size for progress reporting.
const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// HTTP client for the analysis collaborator.
///
/// Attaches the session's bearer token to every request; a 401 from any
/// endpoint clears the session before the error is surfaced.
pub struct HttpApiClient {
    base_url: String,
    client: reqwest::Client,
    session: Arc<SessionStore>,
}

impl HttpApiClient {
    pub fn new(base_url: &str, session: Arc<SessionStore>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config::REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            session,
        }
    }

    /// Client against the default local collaborator.
    pub fn default_local(session: Arc<SessionStore>) -> Self {
        Self::new(config::DEFAULT_API_BASE_URL, session)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.request(method, url);
        match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Status handling shared by every endpoint: 401 clears the session,
    /// other non-success statuses surface as `TransportError::Status`.
    async fn check(&self, response: reqwest::Response) -> Result<reqwest::Response, TransportError> {
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.session.clear();
            return Err(TransportError::Unauthorized);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}

/// Unwrap the collaborator's `{success, data, error}` envelope, passing
/// bare payloads through untouched.
fn unwrap_envelope(value: Value) -> Result<Value, TransportError> {
    match value {
        Value::Object(ref map) if map.contains_key("success") => {
            if map.get("success").and_then(Value::as_bool).unwrap_or(false) {
                Ok(map.get("data").cloned().unwrap_or(Value::Null))
            } else {
                let message = map
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("Analysis failed")
                    .to_string();
                Err(TransportError::Service(message))
            }
        }
        other => Ok(other),
    }
}

/// Chunked body stream that reports cumulative percent as each chunk is
/// handed to the transport. The percent is advisory — the workflow
/// enforces monotonicity on its side.
fn progress_chunks(
    bytes: Vec<u8>,
    progress: mpsc::Sender<u8>,
) -> impl Stream<Item = Result<Vec<u8>, Infallible>> {
    let total = bytes.len().max(1);
    futures_util::stream::unfold((bytes, 0usize, progress), move |(bytes, sent, progress)| {
        async move {
            if sent >= bytes.len() {
                return None;
            }
            let end = (sent + UPLOAD_CHUNK_BYTES).min(bytes.len());
            let chunk = bytes[sent..end].to_vec();
            let percent = ((end * 100) / total).min(100) as u8;
            let _ = progress.try_send(percent);
            Some((Ok(chunk), (bytes, end, progress)))
        }
    })
}

impl AnalysisApi for HttpApiClient {
    async fn analyze(
        &self,
        upload: UploadRequest,
        progress: mpsc::Sender<u8>,
    ) -> Result<Value, TransportError> {
        let length = upload.bytes.len() as u64;
        let body = reqwest::Body::wrap_stream(progress_chunks(upload.bytes, progress));
        let part = multipart::Part::stream_with_length(body, length)
            .file_name(upload.file_name)
            .mime_str(&upload.content_type)?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .request(reqwest::Method::POST, "/analyze")
            .multipart(form)
            .send()
            .await?;
        let response = self.check(response).await?;
        let envelope: Value = response.json().await?;
        unwrap_envelope(envelope)
    }

    async fn fetch_report(&self, id: Uuid) -> Result<Value, TransportError> {
        let response = self
            .request(reqwest::Method::GET, &format!("/reports/{id}"))
            .send()
            .await?;
        let response = self.check(response).await?;
        let envelope: Value = response.json().await?;
        unwrap_envelope(envelope)
    }

    async fn fetch_history(&self) -> Result<Vec<Value>, TransportError> {
        let response = self.request(reqwest::Method::GET, "/history").send().await?;
        let response = self.check(response).await?;
        let envelope: Value = response.json().await?;
        match unwrap_envelope(envelope)? {
            Value::Array(entries) => Ok(entries),
            Value::Null => Ok(Vec::new()),
            other => Err(TransportError::MalformedResponse(format!(
                "expected history array, got {other}"
            ))),
        }
    }
}

impl ChatApi for HttpApiClient {
    async fn send_chat(
        &self,
        message: &str,
        report_id: Option<Uuid>,
    ) -> Result<ChatReply, TransportError> {
        let body = serde_json::json!({
            "message": message,
            "reportId": report_id,
        });
        let response = self
            .request(reqwest::Method::POST, "/chat")
            .json(&body)
            .send()
            .await?;
        let response = self.check(response).await?;
        let value: Value = response.json().await?;
        serde_json::from_value(value).map_err(|e| TransportError::MalformedResponse(e.to_string()))
    }
}

impl AdminApi for HttpApiClient {
    async fn fetch_rules(&self) -> Result<ModerationPolicy, TransportError> {
        let response = self
            .request(reqwest::Method::GET, "/admin/rules")
            .send()
            .await?;
        let response = self.check(response).await?;
        let envelope: Value = response.json().await?;
        let payload = unwrap_envelope(envelope)?;
        serde_json::from_value(payload)
            .map_err(|e| TransportError::MalformedResponse(e.to_string()))
    }

    async fn update_rules(&self, policy: &ModerationPolicy) -> Result<(), TransportError> {
        let body = serde_json::json!({
            "disclaimer": policy.disclaimer,
            "allowedPhrases": policy.allowed_phrases,
            "blockedWords": policy.blocked_words,
        });
        let response = self
            .request(reqwest::Method::PUT, "/admin/rules")
            .json(&body)
            .send()
            .await?;
        self.check(response).await?;
        Ok(())
    }

    async fn fetch_feedback(&self) -> Result<Vec<FeedbackEntry>, TransportError> {
        let response = self
            .request(reqwest::Method::GET, "/admin/feedback")
            .send()
            .await?;
        let response = self.check(response).await?;
        let envelope: Value = response.json().await?;
        let payload = unwrap_envelope(envelope)?;
        serde_json::from_value(payload)
            .map_err(|e| TransportError::MalformedResponse(e.to_string()))
    }

    async fn update_feedback_status(
        &self,
        id: Uuid,
        status: ReviewStatus,
    ) -> Result<(), TransportError> {
        let body = serde_json::json!({ "status": status.as_str() });
        let response = self
            .request(reqwest::Method::PUT, &format!("/admin/feedback/{id}"))
            .json(&body)
            .send()
            .await?;
        self.check(response).await?;
        Ok(())
    }
}
