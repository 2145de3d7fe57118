//! Severity classification — maps free-text statuses and risk levels from
//! the external analysis engine into the fixed `Severity` taxonomy, and
//! grounds AI-extracted test values against a master reference table.
//!
//! The keyword classifier is deliberately a priority-ordered substring
//! match rather than an exact enumeration: upstream analysis text is
//! free-form, and unrecognized vocabulary must degrade to `Normal`
//! instead of failing.

pub mod reference;

use crate::models::Severity;

/// Keywords that mark a status as `Alert`, checked first.
const ALERT_KEYWORDS: &[&str] = &["high", "alert", "critical", "risk", "severe"];

/// Keywords that mark a status as `Borderline`, checked only when no
/// alert keyword matched.
const BORDERLINE_KEYWORDS: &[&str] = &["borderline", "monitor", "moderate"];

/// Classify a raw status or risk string into a `Severity`.
///
/// Case-insensitive substring match against the two keyword tiers;
/// total — empty or unmatched input yields `Severity::Normal`.
pub fn classify(raw: &str) -> Severity {
    let lowered = raw.to_lowercase();
    if ALERT_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
        return Severity::Alert;
    }
    if BORDERLINE_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
        return Severity::Borderline;
    }
    Severity::Normal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_tier_keywords() {
        for raw in ["High", "ALERT", "critical value", "At Risk", "Severe anemia markers"] {
            assert_eq!(classify(raw), Severity::Alert, "{raw}");
        }
    }

    #[test]
    fn borderline_tier_keywords() {
        for raw in ["Borderline elevated", "monitor closely", "Moderate deviation"] {
            assert_eq!(classify(raw), Severity::Borderline, "{raw}");
        }
    }

    #[test]
    fn alert_takes_priority_over_borderline() {
        // Contains both tiers; alert tier wins.
        assert_eq!(classify("High risk, monitor closely"), Severity::Alert);
        assert_eq!(classify("borderline but severe"), Severity::Alert);
    }

    #[test]
    fn unmatched_and_empty_default_to_normal() {
        assert_eq!(classify(""), Severity::Normal);
        assert_eq!(classify("within normal limits"), Severity::Normal);
        assert_eq!(classify("Optimal"), Severity::Normal);
        assert_eq!(classify("Not Classified"), Severity::Normal);
    }

    #[test]
    fn classification_is_case_insensitive() {
        assert_eq!(classify("hIgH"), Severity::Alert);
        assert_eq!(classify("BORDERLINE"), Severity::Borderline);
    }

    #[test]
    fn substring_matches_inside_longer_words() {
        // "risky" contains "risk" — substring semantics, by contract.
        assert_eq!(classify("risky profile"), Severity::Alert);
    }
}
