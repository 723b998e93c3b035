//! Conversation history shared between the query pipeline and the display

use crate::cite::TextBlock;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// First assistant line shown once a document is ready
pub const GREETING: &str = "Document processed successfully! Ask me anything about it.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MessageBody {
    Text(String),
    Blocks(Vec<TextBlock>),
}

impl MessageBody {
    pub fn text(text: impl Into<String>) -> Self {
        MessageBody::Text(text.into())
    }

    /// Body flattened to plain text, paragraphs separated by blank lines
    pub fn plain_text(&self) -> String {
        match self {
            MessageBody::Text(text) => text.clone(),
            MessageBody::Blocks(blocks) => blocks
                .iter()
                .map(TextBlock::plain_text)
                .collect::<Vec<_>>()
                .join("\n\n"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub id: u64,
    pub role: Role,
    pub body: MessageBody,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct LogState {
    next_id: u64,
    messages: Vec<Message>,
}

/// Append-only message log
///
/// Clones share the same history.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    state: Arc<Mutex<LogState>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LogState> {
        // Entries are only ever pushed, so a poisoned lock still holds a valid history
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a message and return a copy of the stored entry
    pub fn append(&self, role: Role, body: MessageBody) -> Message {
        let mut state = self.lock();
        state.next_id += 1;
        let message = Message {
            id: state.next_id,
            role,
            body,
            timestamp: Utc::now(),
        };
        state.messages.push(message.clone());
        message
    }

    /// Snapshot of every message, oldest first
    pub fn all(&self) -> Vec<Message> {
        self.lock().messages.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last(&self) -> Option<Message> {
        self.lock().messages.last().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cite::split_paragraphs;

    #[test]
    fn test_ids_strictly_increase_in_insertion_order() {
        let log = MessageLog::new();
        let first = log.append(Role::User, MessageBody::text("hi"));
        let second = log.append(Role::Assistant, MessageBody::text("hello"));

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert!(second.timestamp >= first.timestamp);

        let all = log.all();
        assert_eq!(all, vec![first, second]);
    }

    #[test]
    fn test_snapshot_is_detached_from_log() {
        let log = MessageLog::new();
        log.append(Role::User, MessageBody::text("one"));

        let mut snapshot = log.all();
        snapshot.clear();
        log.append(Role::User, MessageBody::text("two"));

        assert_eq!(log.len(), 2);
        assert_eq!(log.all()[0].body, MessageBody::text("one"));
    }

    #[test]
    fn test_clones_share_history() {
        let log = MessageLog::new();
        let other = log.clone();
        other.append(Role::Assistant, MessageBody::text(GREETING));
        assert_eq!(log.len(), 1);
        assert_eq!(log.last().map(|m| m.role), Some(Role::Assistant));
    }

    #[test]
    fn test_plain_text_joins_blocks() {
        let body = MessageBody::Blocks(split_paragraphs("a **b**\n\nc"));
        assert_eq!(body.plain_text(), "a b\n\nc");
    }
}
