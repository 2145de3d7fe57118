use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ReviewStatus;

/// What the safety filter decided about one block of generated text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Verdict {
    /// No blocked word matched.
    Safe,
    /// At least one blocked word matched; carries the distinct matched
    /// terms in policy order.
    Flagged { matched: Vec<String> },
}

impl Verdict {
    pub fn is_flagged(&self) -> bool {
        matches!(self, Self::Flagged { .. })
    }
}

/// One matched region of the evaluated text, in byte offsets.
///
/// Spans record every match independently — a term that is a substring of
/// another matched term produces its own span. Overlaps are resolved only
/// at render time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightSpan {
    pub start: usize,
    pub end: usize,
    pub term: String,
}

/// Outcome of one safety evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub verdict: Verdict,
    pub spans: Vec<HighlightSpan>,
    /// The text to display: the original with matched regions wrapped in
    /// highlight markers, or the safe placeholder when the policy holds
    /// flagged output for review.
    pub annotated: String,
}

/// Where a flagged output came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FlagContext {
    /// Generated summary or guidance for a report.
    Report { id: Uuid },
    /// An assistant chat reply, identified by its turn number.
    ChatTurn {
        report_id: Option<Uuid>,
        turn: u64,
    },
    /// Ad-hoc evaluation from the policy editor's sample screen.
    Sample,
}

/// Audit record created when generated text matches a blocked term.
///
/// Mutated only by administrator review actions; never auto-deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlaggedOutput {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    /// Policy version in effect when the flag was raised.
    pub policy_version: u64,
    pub context: FlagContext,
    /// The true generated text, exactly as produced.
    pub text: String,
    pub matched_terms: Vec<String>,
    pub status: ReviewStatus,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_flag_check() {
        assert!(!Verdict::Safe.is_flagged());
        assert!(Verdict::Flagged { matched: vec!["cure".into()] }.is_flagged());
    }

    #[test]
    fn flag_context_serializes_tagged() {
        let ctx = FlagContext::ChatTurn { report_id: None, turn: 3 };
        let json = serde_json::to_string(&ctx).unwrap();
        assert!(json.contains("chat_turn"));
    }
}
