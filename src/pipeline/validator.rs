use crate::api::FileMeta;
use crate::config;

/// Upload rejection — user-correctable, shown inline, no retry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Unsupported file type: {content_type}")]
    UnsupportedType { content_type: String },

    #[error("File is too large: {size} bytes (maximum {max})")]
    TooLarge { size: u64, max: u64 },
}

/// Accepted types and size ceiling — configuration, not code.
#[derive(Debug, Clone)]
pub struct UploadConstraints {
    pub accepted_types: Vec<String>,
    pub max_size_bytes: u64,
}

impl Default for UploadConstraints {
    fn default() -> Self {
        Self {
            accepted_types: config::ACCEPTED_CONTENT_TYPES
                .iter()
                .map(|t| t.to_string())
                .collect(),
            max_size_bytes: config::MAX_UPLOAD_BYTES,
        }
    }
}

/// Pure, synchronous gate a file passes before entering the pipeline.
#[derive(Debug, Clone, Default)]
pub struct UploadValidator {
    constraints: UploadConstraints,
}

impl UploadValidator {
    pub fn new(constraints: UploadConstraints) -> Self {
        Self { constraints }
    }

    pub fn validate(&self, meta: &FileMeta) -> Result<(), ValidationError> {
        let accepted = self
            .constraints
            .accepted_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(&meta.content_type));
        if !accepted {
            return Err(ValidationError::UnsupportedType {
                content_type: meta.content_type.clone(),
            });
        }
        if meta.size > self.constraints.max_size_bytes {
            return Err(ValidationError::TooLarge {
                size: meta.size,
                max: self.constraints.max_size_bytes,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1024 * 1024;

    fn meta(content_type: &str, size: u64) -> FileMeta {
        FileMeta {
            content_type: content_type.into(),
            size,
        }
    }

    #[test]
    fn accepts_a_two_megabyte_pdf() {
        let validator = UploadValidator::default();
        assert!(validator.validate(&meta("application/pdf", 2 * MB)).is_ok());
    }

    #[test]
    fn rejects_fifteen_megabytes_as_too_large() {
        let validator = UploadValidator::default();
        assert_eq!(
            validator.validate(&meta("image/png", 15 * MB)),
            Err(ValidationError::TooLarge {
                size: 15 * MB,
                max: config::MAX_UPLOAD_BYTES
            })
        );
    }

    #[test]
    fn rejects_docx_as_unsupported() {
        let validator = UploadValidator::default();
        let docx = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
        assert_eq!(
            validator.validate(&meta(docx, MB)),
            Err(ValidationError::UnsupportedType {
                content_type: docx.into()
            })
        );
    }

    #[test]
    fn type_check_runs_before_size_check() {
        let validator = UploadValidator::default();
        assert!(matches!(
            validator.validate(&meta("text/plain", 15 * MB)),
            Err(ValidationError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn content_type_match_is_case_insensitive() {
        let validator = UploadValidator::default();
        assert!(validator.validate(&meta("IMAGE/JPEG", MB)).is_ok());
    }

    #[test]
    fn custom_constraints_override_defaults() {
        let validator = UploadValidator::new(UploadConstraints {
            accepted_types: vec!["image/png".into()],
            max_size_bytes: MB,
        });
        assert!(validator.validate(&meta("image/png", MB)).is_ok());
        assert!(validator.validate(&meta("application/pdf", MB)).is_err());
        assert!(validator.validate(&meta("image/png", MB + 1)).is_err());
    }
}
