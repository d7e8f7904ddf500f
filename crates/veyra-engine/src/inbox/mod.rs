//! Two-phase inbox reconciliation.
//!
//! Phase one reads the thread list into plain value identifiers without
//! touching any thread. Phase two re-finds each thread by content on a fresh
//! page and acts on it. Element handles never cross from one phase to the next.

pub mod identify;
pub mod reconcile;

pub use identify::{ThreadScanner, dedup};
pub use reconcile::InboxReconciler;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Content identity of a thread as rendered in the list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadIdentifier {
    pub name: String,
    pub last_message_preview: String,
    pub timestamp_label: String,
}

impl ThreadIdentifier {
    pub fn new(
        name: impl AsRef<str>,
        last_message_preview: impl AsRef<str>,
        timestamp_label: impl AsRef<str>,
    ) -> Self {
        Self {
            name: name.as_ref().trim().to_string(),
            last_message_preview: last_message_preview.as_ref().trim().to_string(),
            timestamp_label: timestamp_label.as_ref().trim().to_string(),
        }
    }

    /// Whether a row's rendered text carries this identity.
    pub fn matches_text(&self, rendered: &str) -> bool {
        rendered.contains(&self.name) && rendered.contains(&self.last_message_preview)
    }
}

impl fmt::Display for ThreadIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: \"{}\"", self.name, self.last_message_preview)
    }
}

/// Decided from the list view at identification time, never re-derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThreadClassification {
    Unread,
    Read,
    Request,
}

impl fmt::Display for ThreadClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ThreadClassification::Unread => "unread",
            ThreadClassification::Read => "read",
            ThreadClassification::Request => "request",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedThread {
    pub identifier: ThreadIdentifier,
    pub classification: ThreadClassification,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReconcileOutcome {
    Replied,
    AcceptedAndReplied,
    ReadNoReplyNeeded,
    AcceptFailed,
    ReplyFailed,
    Error(String),
}

impl fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileOutcome::Replied => write!(f, "replied"),
            ReconcileOutcome::AcceptedAndReplied => write!(f, "accepted+replied"),
            ReconcileOutcome::ReadNoReplyNeeded => write!(f, "read, no reply"),
            ReconcileOutcome::AcceptFailed => write!(f, "accept failed"),
            ReconcileOutcome::ReplyFailed => write!(f, "reply failed"),
            ReconcileOutcome::Error(reason) => write!(f, "error: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationRecord {
    pub identifier: ThreadIdentifier,
    pub classification: ThreadClassification,
    pub outcome: ReconcileOutcome,
    pub chat_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_fields_are_trimmed() {
        let id = ThreadIdentifier::new("  Anna ", "\nhey\t", " 2h");
        assert_eq!(id, ThreadIdentifier::new("Anna", "hey", "2h"));
    }

    #[test]
    fn row_text_must_carry_name_and_preview() {
        let id = ThreadIdentifier::new("Anna", "see you at 5", "2h");
        assert!(id.matches_text("Anna\nsee you at 5 · 2h"));
        assert!(!id.matches_text("Anna\nsee you at 6 · 2h"));
        assert!(!id.matches_text("Bence\nsee you at 5 · 2h"));
    }
}
