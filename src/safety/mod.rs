//! Content-safety layer for AI-generated text.
//!
//! Every assistant-visible string produced by the external analysis
//! engine passes through [`filter::ContentSafetyFilter`] before display:
//! blocked-word matches flag the text, produce a structured highlight
//! annotation, and append an audit record for administrator review.

pub mod audit;
pub mod filter;
pub mod policy;
pub mod types;

pub use audit::{AuditError, ModerationAudit};
pub use filter::ContentSafetyFilter;
pub use policy::PolicyStore;
pub use types::{Evaluation, FlagContext, FlaggedOutput, HighlightSpan, Verdict};
