//! User-facing notifications.
//!
//! The engine never shows UI itself. It queues `Notification`s that the host
//! drains and renders: warnings as blocking dialogs, toasts as transient
//! messages.

use std::collections::VecDeque;

use crate::error::{OracleError, StorageError, UserInputError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Blocking dialog the user must dismiss.
    Warning,
    /// Non-blocking, disappears on its own.
    Toast,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub severity: Severity,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn toast(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Toast,
            title: String::new(),
            message: message.into(),
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Warning
    }
}

impl From<&UserInputError> for Notification {
    fn from(e: &UserInputError) -> Self {
        Notification::warning("Invalid action", e.to_string())
    }
}

impl From<&OracleError> for Notification {
    fn from(e: &OracleError) -> Self {
        Notification::toast(format!("Predict failed: {}", e))
    }
}

impl From<&StorageError> for Notification {
    fn from(e: &StorageError) -> Self {
        Notification::warning("Storage error", e.to_string())
    }
}

/// FIFO of notifications waiting for the host.
#[derive(Debug, Clone, Default)]
pub struct NotificationQueue {
    pending: VecDeque<Notification>,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, notification: Notification) {
        match notification.severity {
            Severity::Warning => log::warn!("⚠️ {}: {}", notification.title, notification.message),
            Severity::Toast => log::info!("💬 {}", notification.message),
        }
        self.pending.push_back(notification);
    }

    /// Take everything queued so far, oldest first.
    pub fn drain(&mut self) -> Vec<Notification> {
        self.pending.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_follows_error_layer() {
        let warning = Notification::from(&UserInputError::NoLabel);
        assert!(warning.is_blocking());

        let toast = Notification::from(&OracleError::Timeout { seconds: 5 });
        assert!(!toast.is_blocking());
        assert!(toast.message.contains("5s"));
    }

    #[test]
    fn test_queue_drains_in_order() {
        let mut queue = NotificationQueue::new();
        queue.push(Notification::toast("one"));
        queue.push(Notification::warning("Oops", "two"));
        assert_eq!(queue.len(), 2);

        let drained = queue.drain();
        assert_eq!(drained[0].message, "one");
        assert_eq!(drained[1].title, "Oops");
        assert!(queue.is_empty());
    }
}
