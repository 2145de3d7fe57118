use serde::{Deserialize, Serialize};

/// The configurable content-safety policy read by the safety filter on
/// every evaluation and mutated only through an administrator update.
///
/// `allowed_phrases` are authoring guidance for the text generator — they
/// never affect a verdict. `blocked_words` each trigger a flag on match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationPolicy {
    pub disclaimer: String,
    pub allowed_phrases: Vec<String>,
    pub blocked_words: Vec<String>,
    /// When set, flagged text is withheld from the caller and replaced by
    /// a safe placeholder; the true text survives only in the audit record.
    #[serde(default)]
    pub hold_for_review: bool,
    /// Monotonic local version, bumped on every committed update and
    /// recorded on audit records created under this policy.
    #[serde(default)]
    pub version: u64,
}

impl Default for ModerationPolicy {
    fn default() -> Self {
        Self {
            disclaimer: "Lab-Lens does not provide medical diagnosis, treatment \
                         recommendations, or clinical advice. This tool is for educational \
                         and informational purposes only. Always consult a qualified \
                         healthcare professional for medical decisions."
                .into(),
            allowed_phrases: vec![
                "may indicate".into(),
                "can be associated with".into(),
                "might suggest".into(),
                "could be related to".into(),
                "is often seen with".into(),
                "consider consulting".into(),
                "general wellness tips".into(),
                "educational purposes".into(),
            ],
            blocked_words: vec![
                "diagnose".into(),
                "cure".into(),
                "prescribe".into(),
                "treat".into(),
                "medicine".into(),
                "medication".into(),
                "drug".into(),
                "therapy".into(),
                "definitely".into(),
                "certainly".into(),
                "guaranteed".into(),
            ],
            hold_for_review: false,
            version: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_has_core_blocked_words() {
        let policy = ModerationPolicy::default();
        for word in ["diagnose", "cure", "prescribe"] {
            assert!(policy.blocked_words.iter().any(|w| w == word));
        }
        assert!(!policy.hold_for_review);
    }

    #[test]
    fn policy_round_trips_through_wire_form() {
        let policy = ModerationPolicy::default();
        let json = serde_json::to_string(&policy).unwrap();
        assert!(json.contains("allowedPhrases"));
        assert!(json.contains("blockedWords"));
        let back: ModerationPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(back, policy);
    }

    #[test]
    fn wire_form_without_local_fields_defaults() {
        // /admin/rules carries only disclaimer + phrase lists.
        let json = r#"{"disclaimer":"d","allowedPhrases":[],"blockedWords":["cure"]}"#;
        let policy: ModerationPolicy = serde_json::from_str(json).unwrap();
        assert_eq!(policy.version, 0);
        assert!(!policy.hold_for_review);
        assert_eq!(policy.blocked_words, vec!["cure".to_string()]);
    }
}
