//! Lab-Lens core engine.
//!
//! Client-side orchestration and safety classification for AI-interpreted
//! lab reports:
//!
//! - [`pipeline`] — upload validation and the cancellable analysis
//!   workflow state machine (Upload → Processing → Results).
//! - [`severity`] — classification of free-text statuses/risk levels into
//!   the ordinal severity taxonomy, plus reference-range grounding of
//!   extracted values.
//! - [`safety`] — the content-safety filter, moderation policy store, and
//!   flagged-output audit trail.
//! - [`repository`] — normalization of loosely-typed analysis payloads
//!   into the canonical report model, history and lookup.
//! - [`chat`] — report-bound chat sessions with strict turn ordering.
//! - [`api`] — contract traits for the external analysis collaborator and
//!   the HTTP client implementing them.

pub mod api;
pub mod chat;
pub mod config;
pub mod models;
pub mod pipeline;
pub mod repository;
pub mod safety;
pub mod session;
pub mod severity;

use tracing_subscriber::EnvFilter;

/// Initialize tracing for binaries embedding the engine.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} core v{}", config::APP_NAME, config::APP_VERSION);
}
