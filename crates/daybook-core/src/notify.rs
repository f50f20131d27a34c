//! Notification collaborator seam
//!
//! When a collection operation fails, the failure is classified and a short
//! human-readable message is handed to a [`Notifier`]. The core never
//! renders anything; embedders decide how to surface the message.

use std::cell::RefCell;

/// Severity of a user-facing notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
    Info,
}

/// Receives short human-readable messages about operation outcomes
pub trait Notifier {
    fn notify(&self, level: NoticeLevel, message: &str);
}

/// Discards every notice
#[derive(Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _level: NoticeLevel, _message: &str) {}
}

/// Collects notices in memory, for tests and queue-style embedders
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    notices: RefCell<Vec<(NoticeLevel, String)>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all notices received so far
    pub fn notices(&self) -> Vec<(NoticeLevel, String)> {
        self.notices.borrow().clone()
    }

    /// Messages only, in arrival order
    pub fn messages(&self) -> Vec<String> {
        self.notices.borrow().iter().map(|(_, m)| m.clone()).collect()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        self.notices.borrow_mut().push((level, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_notifier_records_in_order() {
        let notifier = MemoryNotifier::new();
        notifier.notify(NoticeLevel::Error, "first");
        notifier.notify(NoticeLevel::Success, "second");

        assert_eq!(notifier.messages(), vec!["first", "second"]);
        assert_eq!(notifier.notices()[0].0, NoticeLevel::Error);
    }
}
