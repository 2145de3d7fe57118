pub mod conversation;
pub mod enums;
pub mod feedback;
pub mod policy;
pub mod report;

pub use conversation::ChatMessage;
pub use enums::{BannerColor, InvalidEnum, MessageRole, ReviewStatus, Severity, UrgencyLevel};
pub use feedback::FeedbackEntry;
pub use policy::ModerationPolicy;
pub use report::{Report, RiskSummary, TestResult, TestValue};
