//! Analysis pipeline — upload validation and the cancellable workflow
//! state machine driving Upload → Processing → Results.

pub mod types;
pub mod validator;
pub mod workflow;

pub use types::{WorkflowConfig, WorkflowError, WorkflowState};
pub use validator::{UploadConstraints, UploadValidator, ValidationError};
pub use workflow::AnalysisWorkflow;
