use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::MessageRole;

/// One entry of a chat session's append-only message log.
/// Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_message_carries_role_and_content() {
        let msg = ChatMessage::new(MessageRole::User, "What do my results mean?");
        assert_eq!(msg.role, MessageRole::User);
        assert_eq!(msg.content, "What do my results mean?");
    }

    #[test]
    fn messages_get_distinct_ids() {
        let a = ChatMessage::new(MessageRole::Assistant, "a");
        let b = ChatMessage::new(MessageRole::Assistant, "b");
        assert_ne!(a.id, b.id);
    }
}
