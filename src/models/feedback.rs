use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::ReviewStatus;

/// A user feedback record reviewed by an administrator.
///
/// Distinct from `FlaggedOutput` (safety-filter audit records) but shares
/// the same review-status lifecycle. Served by `/admin/feedback`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEntry {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub message: String,
    #[serde(default)]
    pub rating: Option<u8>,
    pub status: ReviewStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feedback_deserializes_with_optional_fields_absent() {
        let json = format!(
            r#"{{"id":"{}","createdAt":"2024-01-15T14:32:00Z","message":"Reference ranges didn't match my lab's.","status":"new"}}"#,
            Uuid::nil()
        );
        let entry: FeedbackEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(entry.status, ReviewStatus::New);
        assert!(entry.user.is_none());
        assert!(entry.rating.is_none());
    }
}
