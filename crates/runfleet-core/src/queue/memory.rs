use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use super::{QueueError, QueueMessage, QueueProvider};

/// How long a received message stays hidden unless deleted.
pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug)]
struct Entry {
    id: String,
    content: String,
    inserted_at: OffsetDateTime,
    dequeue_count: u32,
    pop_receipt: Option<String>,
    visible_at: Instant,
}

impl Entry {
    fn snapshot(&self, pop_receipt: String) -> QueueMessage {
        QueueMessage {
            id: self.id.clone(),
            pop_receipt,
            content: self.content.clone(),
            inserted_at: Some(self.inserted_at),
            dequeue_count: self.dequeue_count,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    entries: VecDeque<Entry>,
    next_id: u64,
}

/// Process-local queue with visibility-timeout semantics.
///
/// Used by the combined deployment mode (webhook and consumer in one process)
/// and by tests.
#[derive(Debug)]
pub struct InMemoryQueue {
    state: Mutex<State>,
    visibility_timeout: Duration,
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::with_visibility_timeout(DEFAULT_VISIBILITY_TIMEOUT)
    }

    pub fn with_visibility_timeout(visibility_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(State::default()),
            visibility_timeout,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl QueueProvider for InMemoryQueue {
    async fn initialize(&self) -> Result<(), QueueError> {
        debug!("in-memory queue ready");
        Ok(())
    }

    async fn receive(&self) -> Result<Option<QueueMessage>, QueueError> {
        let now = Instant::now();
        let visibility = self.visibility_timeout;
        let mut state = self.lock();

        let Some(entry) = state.entries.iter_mut().find(|e| e.visible_at <= now) else {
            return Ok(None);
        };
        let receipt = Uuid::new_v4().to_string();
        entry.dequeue_count += 1;
        entry.pop_receipt = Some(receipt.clone());
        entry.visible_at = now + visibility;
        Ok(Some(entry.snapshot(receipt)))
    }

    async fn peek(&self) -> Result<Option<QueueMessage>, QueueError> {
        let now = Instant::now();
        let state = self.lock();
        Ok(state
            .entries
            .iter()
            .find(|e| e.visible_at <= now)
            .map(|e| e.snapshot(String::new())))
    }

    async fn send(&self, content: &str) -> Result<(), QueueError> {
        let mut state = self.lock();
        state.next_id += 1;
        let entry = Entry {
            id: state.next_id.to_string(),
            content: content.to_string(),
            inserted_at: OffsetDateTime::now_utc(),
            dequeue_count: 0,
            pop_receipt: None,
            visible_at: Instant::now(),
        };
        state.entries.push_back(entry);
        Ok(())
    }

    async fn delete(&self, message: &QueueMessage) -> Result<(), QueueError> {
        let mut state = self.lock();
        let Some(pos) = state.entries.iter().position(|e| e.id == message.id) else {
            return Err(QueueError::NotFound(message.id.clone()));
        };
        if state.entries[pos].pop_receipt.as_deref() != Some(message.pop_receipt.as_str()) {
            return Err(QueueError::ReceiptMismatch(message.id.clone()));
        }
        state.entries.remove(pos);
        Ok(())
    }

    async fn approximate_count(&self) -> Result<usize, QueueError> {
        Ok(self.lock().entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn receive_returns_messages_in_order() {
        let queue = InMemoryQueue::new();
        queue.send("a").await.unwrap();
        queue.send("b").await.unwrap();

        let first = queue.receive().await.unwrap().unwrap();
        let second = queue.receive().await.unwrap().unwrap();
        assert_eq!(first.content, "a");
        assert_eq!(second.content, "b");
        assert_eq!(first.dequeue_count, 1);
        assert!(queue.receive().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn peek_does_not_hide_message() {
        let queue = InMemoryQueue::new();
        queue.send("a").await.unwrap();

        let peeked = queue.peek().await.unwrap().unwrap();
        let received = queue.receive().await.unwrap().unwrap();
        assert_eq!(peeked.id, received.id);
        assert!(queue.peek().await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn undeleted_message_reappears_after_visibility_timeout() {
        let queue = InMemoryQueue::with_visibility_timeout(Duration::from_secs(5));
        queue.send("a").await.unwrap();

        let first = queue.receive().await.unwrap().unwrap();
        assert!(queue.receive().await.unwrap().is_none());

        tokio::time::advance(Duration::from_secs(6)).await;
        let again = queue.receive().await.unwrap().unwrap();
        assert_eq!(again.id, first.id);
        assert_eq!(again.dequeue_count, 2);
        assert_ne!(again.pop_receipt, first.pop_receipt);
    }

    #[tokio::test(start_paused = true)]
    async fn delete_requires_current_receipt() {
        let queue = InMemoryQueue::with_visibility_timeout(Duration::from_secs(5));
        queue.send("a").await.unwrap();
        let stale = queue.receive().await.unwrap().unwrap();

        tokio::time::advance(Duration::from_secs(6)).await;
        let current = queue.receive().await.unwrap().unwrap();

        assert!(matches!(
            queue.delete(&stale).await,
            Err(QueueError::ReceiptMismatch(_))
        ));
        queue.delete(&current).await.unwrap();
        assert_eq!(queue.approximate_count().await.unwrap(), 0);
        assert!(matches!(
            queue.delete(&current).await,
            Err(QueueError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn count_includes_invisible_messages() {
        let queue = InMemoryQueue::new();
        queue.send("a").await.unwrap();
        queue.send("b").await.unwrap();
        let _ = queue.receive().await.unwrap();
        assert_eq!(queue.approximate_count().await.unwrap(), 2);
    }
}
