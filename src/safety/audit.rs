use std::sync::Mutex;

use chrono::Utc;
use uuid::Uuid;

use crate::models::ReviewStatus;

use super::types::{FlagContext, FlaggedOutput};

/// Audit errors.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("Flagged output not found: {0}")]
    NotFound(Uuid),
}

/// Append-only store of flagged generated outputs.
///
/// Records are created exclusively by the safety filter and mutated only
/// through the administrator review operations below. Nothing deletes a
/// record.
#[derive(Debug, Default)]
pub struct ModerationAudit {
    records: Mutex<Vec<FlaggedOutput>>,
}

impl ModerationAudit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new record with status `New`. Only the safety filter
    /// calls this.
    pub(crate) fn append(
        &self,
        policy_version: u64,
        context: FlagContext,
        text: &str,
        matched_terms: Vec<String>,
    ) -> Uuid {
        let record = FlaggedOutput {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            policy_version,
            context,
            text: text.to_string(),
            matched_terms,
            status: ReviewStatus::New,
            notes: None,
        };
        let id = record.id;
        tracing::info!(
            flag_id = %id,
            policy_version,
            terms = record.matched_terms.len(),
            "Generated output flagged for review"
        );
        self.lock().push(record);
        id
    }

    /// All records, newest first.
    pub fn list(&self) -> Vec<FlaggedOutput> {
        let mut records = self.lock().clone();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }

    pub fn get(&self, id: Uuid) -> Result<FlaggedOutput, AuditError> {
        self.lock()
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(AuditError::NotFound(id))
    }

    /// Administrator review action: move a record through
    /// new → reviewed/flagged.
    pub fn set_status(&self, id: Uuid, status: ReviewStatus) -> Result<(), AuditError> {
        let mut records = self.lock();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(AuditError::NotFound(id))?;
        tracing::info!(flag_id = %id, status = status.as_str(), "Flag status updated");
        record.status = status;
        Ok(())
    }

    /// Administrator review action: attach reviewer notes.
    pub fn set_notes(&self, id: Uuid, notes: &str) -> Result<(), AuditError> {
        let mut records = self.lock();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(AuditError::NotFound(id))?;
        record.notes = Some(notes.to_string());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<FlaggedOutput>> {
        // Audit data stays usable even if a writer panicked mid-append.
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record(audit: &ModerationAudit) -> Uuid {
        audit.append(
            1,
            FlagContext::Sample,
            "I prescribe lifestyle changes.",
            vec!["prescribe".into()],
        )
    }

    #[test]
    fn append_creates_new_status_record() {
        let audit = ModerationAudit::new();
        let id = sample_record(&audit);
        let record = audit.get(id).unwrap();
        assert_eq!(record.status, ReviewStatus::New);
        assert_eq!(record.matched_terms, vec!["prescribe".to_string()]);
        assert_eq!(record.policy_version, 1);
        assert!(record.notes.is_none());
    }

    #[test]
    fn status_transition_and_notes() {
        let audit = ModerationAudit::new();
        let id = sample_record(&audit);

        audit.set_status(id, ReviewStatus::Flagged).unwrap();
        audit.set_notes(id, "Investigated prompt v2.3.0").unwrap();

        let record = audit.get(id).unwrap();
        assert_eq!(record.status, ReviewStatus::Flagged);
        assert_eq!(record.notes.as_deref(), Some("Investigated prompt v2.3.0"));
    }

    #[test]
    fn unknown_id_is_not_found() {
        let audit = ModerationAudit::new();
        assert!(matches!(
            audit.set_status(Uuid::new_v4(), ReviewStatus::Reviewed),
            Err(AuditError::NotFound(_))
        ));
        assert!(audit.get(Uuid::new_v4()).is_err());
    }

    #[test]
    fn list_is_never_truncated() {
        let audit = ModerationAudit::new();
        for _ in 0..5 {
            sample_record(&audit);
        }
        assert_eq!(audit.len(), 5);
        assert_eq!(audit.list().len(), 5);
    }
}
