/// Application-level constants
pub const APP_NAME: &str = "Lab-Lens";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Base URL of the analysis collaborator, overridable per client.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";

/// Upload constraints (configuration, not code — see `UploadConstraints`).
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
pub const ACCEPTED_CONTENT_TYPES: &[&str] = &["application/pdf", "image/jpeg", "image/png"];

/// Nominal processing-phase durations shown to the user while the
/// analysis request runs concurrently.
pub const EXTRACTING_PHASE_MS: u64 = 2000;
pub const NORMALIZING_PHASE_MS: u64 = 2500;
pub const GENERATING_PHASE_MS: u64 = 3000;

/// HTTP request timeout for collaborator calls.
pub const REQUEST_TIMEOUT_SECS: u64 = 60;

pub fn default_log_filter() -> String {
    "info,lab_lens=debug".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_types_cover_default_formats() {
        assert!(ACCEPTED_CONTENT_TYPES.contains(&"application/pdf"));
        assert!(ACCEPTED_CONTENT_TYPES.contains(&"image/jpeg"));
        assert!(ACCEPTED_CONTENT_TYPES.contains(&"image/png"));
    }

    #[test]
    fn max_upload_is_ten_megabytes() {
        assert_eq!(MAX_UPLOAD_BYTES, 10_485_760);
    }

    #[test]
    fn app_name_is_lab_lens() {
        assert_eq!(APP_NAME, "Lab-Lens");
    }
}
