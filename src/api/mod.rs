//! External analysis collaborator — contract traits and HTTP client.
//!
//! Every consumer (workflow, repository, chat, policy editor) depends on
//! one of the trait seams below, never on the HTTP client directly, so
//! each stays testable with mock implementations.

pub mod client;

pub use client::HttpApiClient;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::models::{FeedbackEntry, ModerationPolicy, ReviewStatus};

/// Transport-level failure talking to the collaborator.
///
/// Surfaced as a transient notice or a `Failed` workflow state — never
/// fatal, never automatically retried.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Server returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Unauthorized — session cleared")]
    Unauthorized,

    #[error("Analysis service error: {0}")]
    Service(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.to_string())
    }
}

/// Metadata checked by the upload validator before any bytes move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    pub content_type: String,
    pub size: u64,
}

/// One file submission bound for `POST /analyze`.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadRequest {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    pub fn meta(&self) -> FileMeta {
        FileMeta {
            content_type: self.content_type.clone(),
            size: self.bytes.len() as u64,
        }
    }
}

/// Reply to one chat turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

// Consumers drive these futures on their own task in a cooperative,
// single-threaded model; the futures need not be Send.

#[allow(async_fn_in_trait)]
pub trait AnalysisApi {
    /// Submit a file for analysis. Upload progress (0..=100) is reported
    /// through `progress` as bytes are handed to the transport; the
    /// channel closes when the request finishes.
    async fn analyze(
        &self,
        upload: UploadRequest,
        progress: mpsc::Sender<u8>,
    ) -> Result<Value, TransportError>;

    async fn fetch_report(&self, id: Uuid) -> Result<Value, TransportError>;

    async fn fetch_history(&self) -> Result<Vec<Value>, TransportError>;
}

#[allow(async_fn_in_trait)]
pub trait ChatApi {
    async fn send_chat(
        &self,
        message: &str,
        report_id: Option<Uuid>,
    ) -> Result<ChatReply, TransportError>;
}

#[allow(async_fn_in_trait)]
pub trait AdminApi {
    async fn fetch_rules(&self) -> Result<ModerationPolicy, TransportError>;

    async fn update_rules(&self, policy: &ModerationPolicy) -> Result<(), TransportError>;

    async fn fetch_feedback(&self) -> Result<Vec<FeedbackEntry>, TransportError>;

    async fn update_feedback_status(
        &self,
        id: Uuid,
        status: ReviewStatus,
    ) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_request_meta() {
        let upload = UploadRequest::new("cbc.pdf", "application/pdf", vec![0u8; 2048]);
        let meta = upload.meta();
        assert_eq!(meta.content_type, "application/pdf");
        assert_eq!(meta.size, 2048);
    }

    #[test]
    fn chat_reply_tolerates_missing_suggestions() {
        let reply: ChatReply = serde_json::from_str(r#"{"reply":"Hello"}"#).unwrap();
        assert_eq!(reply.reply, "Hello");
        assert!(reply.suggestions.is_empty());
    }
}
