//! Rendered chat messages.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a message. Drives styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

impl Sender {
    /// Styling class of the rendered message node.
    #[must_use]
    pub fn css_class(self) -> &'static str {
        match self {
            Self::User => "user-message",
            Self::Ai => "ai-message",
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => f.write_str("user"),
            Self::Ai => f.write_str("ai"),
        }
    }
}

/// View-local message identifier, unique for the lifetime of a [`ChatView`].
///
/// [`ChatView`]: super::ChatView
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(pub(crate) u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg-{}", self.0)
    }
}

/// A message node in the chat container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender: Sender,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

impl Message {
    /// Full class list of the rendered node, e.g. `chat-message user-message`.
    #[must_use]
    pub fn class_list(&self) -> String {
        format!("chat-message {}", self.sender.css_class())
    }

    /// Rows the message occupies in the scrollable container.
    #[must_use]
    pub fn height(&self) -> usize {
        self.text.lines().count().max(1)
    }
}
