use std::sync::Arc;

use regex::Regex;

use crate::models::{ModerationPolicy, Report};

use super::audit::ModerationAudit;
use super::types::{Evaluation, FlagContext, HighlightSpan, Verdict};

/// Markers wrapping each highlighted region of annotated text.
///
/// Annotation is a pure text transform over the span list — no markup
/// injection. Renderers that need real markup should consume `spans`.
pub const HIGHLIGHT_OPEN: &str = "[[";
pub const HIGHLIGHT_CLOSE: &str = "]]";

/// Shown in place of flagged text when the policy holds output for review.
pub const HELD_FOR_REVIEW_MESSAGE: &str =
    "This response is being held for a safety review. Please consult a \
     qualified healthcare professional with any questions about your results.";

/// Evaluates AI-generated text against the moderation policy.
///
/// Flagging is advisory, not blocking: flagged text is still returned
/// (annotated) so a reviewer sees exactly what the user saw — unless the
/// policy's hold-for-review mode is on, in which case the caller gets the
/// safe placeholder and the true text survives only in the audit record.
///
/// This is the only component that creates audit records.
pub struct ContentSafetyFilter {
    audit: Arc<ModerationAudit>,
}

impl ContentSafetyFilter {
    pub fn new(audit: Arc<ModerationAudit>) -> Self {
        Self { audit }
    }

    pub fn audit(&self) -> Arc<ModerationAudit> {
        self.audit.clone()
    }

    /// Evaluate one block of generated text against the policy.
    ///
    /// Verdict and spans are a pure function of `(text, policy)`.
    /// `policy.allowed_phrases` are authoring guidance only and are never
    /// consulted here.
    pub fn evaluate(
        &self,
        text: &str,
        policy: &ModerationPolicy,
        context: FlagContext,
    ) -> Evaluation {
        let spans = scan_blocked_words(text, &policy.blocked_words);
        if spans.is_empty() {
            return Evaluation {
                verdict: Verdict::Safe,
                spans,
                annotated: text.to_string(),
            };
        }

        let matched = distinct_matched_terms(&spans, &policy.blocked_words);
        self.audit
            .append(policy.version, context, text, matched.clone());

        let annotated = if policy.hold_for_review {
            HELD_FOR_REVIEW_MESSAGE.to_string()
        } else {
            annotate(text, &spans)
        };

        Evaluation {
            verdict: Verdict::Flagged { matched },
            spans,
            annotated,
        }
    }

    /// Evaluate a report's generated plain-language summary before it
    /// reaches the results screen.
    pub fn review_report(&self, report: &Report, policy: &ModerationPolicy) -> Evaluation {
        self.evaluate(&report.summary, policy, FlagContext::Report { id: report.id })
    }
}

/// Find every occurrence of every blocked word, case-insensitively.
///
/// Each match gets its own span, including matches nested inside matches
/// of a longer term; overlap resolution happens at render time.
fn scan_blocked_words(text: &str, blocked_words: &[String]) -> Vec<HighlightSpan> {
    let mut spans = Vec::new();

    for word in blocked_words {
        let word = word.trim();
        if word.is_empty() {
            continue;
        }
        let pattern = format!("(?i){}", regex::escape(word));
        let regex = match Regex::new(&pattern) {
            Ok(regex) => regex,
            Err(e) => {
                tracing::debug!(word, error = %e, "Skipping unmatchable blocked word");
                continue;
            }
        };
        for mat in regex.find_iter(text) {
            spans.push(HighlightSpan {
                start: mat.start(),
                end: mat.end(),
                term: word.to_string(),
            });
        }
    }

    spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));
    spans
}

/// Distinct matched terms, in policy order.
fn distinct_matched_terms(spans: &[HighlightSpan], blocked_words: &[String]) -> Vec<String> {
    let mut matched = Vec::new();
    for word in blocked_words {
        let word = word.trim();
        if word.is_empty() || matched.iter().any(|m: &String| m == word) {
            continue;
        }
        if spans.iter().any(|s| s.term == word) {
            matched.push(word.to_string());
        }
    }
    matched
}

/// Wrap every matched region in highlight markers, preserving the
/// original text verbatim. Overlapping spans are merged into one region
/// so nested markers never corrupt the output.
fn annotate(text: &str, spans: &[HighlightSpan]) -> String {
    let mut regions: Vec<(usize, usize)> = Vec::new();
    for span in spans {
        if let Some(last) = regions.last_mut() {
            if span.start < last.1 {
                last.1 = last.1.max(span.end);
                continue;
            }
        }
        regions.push((span.start, span.end));
    }

    let mut out = String::with_capacity(
        text.len() + regions.len() * (HIGHLIGHT_OPEN.len() + HIGHLIGHT_CLOSE.len()),
    );
    let mut cursor = 0;
    for (start, end) in regions {
        out.push_str(&text[cursor..start]);
        out.push_str(HIGHLIGHT_OPEN);
        out.push_str(&text[start..end]);
        out.push_str(HIGHLIGHT_CLOSE);
        cursor = end;
    }
    out.push_str(&text[cursor..]);
    out
}
