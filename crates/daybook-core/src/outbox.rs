//! Offline feedback outbox
//!
//! Feedback written while offline queues in the `outbox` partition and is
//! drained when connectivity returns. The queue is layered on the plain
//! engine primitives; each item is deleted only after its send succeeds, so
//! a failed send leaves the item queued for the next drain.

use std::rc::Rc;

use crate::models::FeedbackItem;
use crate::storage::{StorageEngine, StorageError, StorageResult};

const PARTITION: &str = "outbox";

/// Result of one drain pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrainOutcome {
    /// Items sent and removed from the queue
    pub sent: usize,
    /// Items whose send failed; still queued
    pub remaining: usize,
}

/// Queue of outgoing feedback messages
pub struct Outbox {
    engine: Rc<StorageEngine>,
}

impl Outbox {
    pub fn new(engine: Rc<StorageEngine>) -> Self {
        Self { engine }
    }

    /// Queue a feedback message for the next drain
    pub fn enqueue(&self, subject: &str, body: &str) -> StorageResult<FeedbackItem> {
        let item = FeedbackItem::new(subject, body);
        let value = serde_json::to_value(&item).map_err(|source| StorageError::Encode {
            partition: PARTITION.to_string(),
            source,
        })?;
        self.engine.put(PARTITION, &value, None)?;
        tracing::debug!(id = %item.id, "feedback queued");
        Ok(item)
    }

    /// Queued items in enqueue order
    pub fn pending(&self) -> StorageResult<Vec<FeedbackItem>> {
        self.engine
            .get_all(PARTITION)?
            .into_iter()
            .map(|value| {
                serde_json::from_value(value).map_err(|source| StorageError::Decode {
                    partition: PARTITION.to_string(),
                    source,
                })
            })
            .collect()
    }

    /// Attempt to send every queued item.
    ///
    /// Items are tried in enqueue order. A send failure keeps that item
    /// queued and moves on to the next; it never aborts the pass.
    pub fn drain<F, E>(&self, mut send: F) -> StorageResult<DrainOutcome>
    where
        F: FnMut(&FeedbackItem) -> Result<(), E>,
    {
        let mut outcome = DrainOutcome::default();
        for item in self.pending()? {
            match send(&item) {
                Ok(()) => {
                    self.engine.delete(PARTITION, &item.id)?;
                    outcome.sent += 1;
                }
                Err(_) => {
                    outcome.remaining += 1;
                }
            }
        }
        if outcome.sent > 0 || outcome.remaining > 0 {
            tracing::info!(
                sent = outcome.sent,
                remaining = outcome.remaining,
                "outbox drained"
            );
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outbox() -> Outbox {
        Outbox::new(Rc::new(StorageEngine::open_in_memory().unwrap()))
    }

    #[test]
    fn test_enqueue_then_pending_in_order() {
        let outbox = outbox();
        outbox.enqueue("First", "body one").unwrap();
        outbox.enqueue("Second", "body two").unwrap();

        let pending = outbox.pending().unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].subject, "First");
        assert_eq!(pending[1].subject, "Second");
        assert!(pending[0].created_at > 0);
    }

    #[test]
    fn test_drain_removes_sent_items() {
        let outbox = outbox();
        outbox.enqueue("Hello", "world").unwrap();

        let outcome = outbox.drain(|_| Ok::<(), ()>(())).unwrap();
        assert_eq!(outcome, DrainOutcome { sent: 1, remaining: 0 });
        assert!(outbox.pending().unwrap().is_empty());
    }

    #[test]
    fn test_failed_send_keeps_item_queued() {
        let outbox = outbox();
        outbox.enqueue("Flaky", "first try fails").unwrap();
        outbox.enqueue("Fine", "sends").unwrap();

        let outcome = outbox
            .drain(|item| if item.subject == "Flaky" { Err("down") } else { Ok(()) })
            .unwrap();
        assert_eq!(outcome, DrainOutcome { sent: 1, remaining: 1 });

        let pending = outbox.pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].subject, "Flaky");

        // A later drain picks the failed item back up
        let outcome = outbox.drain(|_| Ok::<(), ()>(())).unwrap();
        assert_eq!(outcome, DrainOutcome { sent: 1, remaining: 0 });
        assert!(outbox.pending().unwrap().is_empty());
    }

    #[test]
    fn test_drain_on_empty_queue() {
        let outbox = outbox();
        let outcome = outbox.drain(|_| Ok::<(), ()>(())).unwrap();
        assert_eq!(outcome, DrainOutcome::default());
    }
}
