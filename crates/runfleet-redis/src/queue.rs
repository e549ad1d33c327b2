use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{RedisError, Script};
use runfleet_core::{DEFAULT_VISIBILITY_TIMEOUT, QueueError, QueueMessage, QueueProvider};
use time::OffsetDateTime;
use tokio::sync::OnceCell;
use tracing::{debug, info};
use uuid::Uuid;

use crate::keys::QueueKeys;
use crate::scripts;

pub const DEFAULT_QUEUE_NAME: &str = "runfleet-jobs";

/// Raw message snapshot as returned by the receive and peek scripts.
type RawMessage = (String, String, String, String);

#[derive(Clone, PartialEq, Eq)]
pub struct RedisQueueConfig {
    /// Connection URL such as `redis://host:6379/0`.
    pub url: String,
    /// Prefix of every key the queue owns.
    pub name: String,
    pub visibility_timeout: Duration,
}

impl RedisQueueConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: DEFAULT_QUEUE_NAME.to_string(),
            visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT,
        }
    }
}

impl fmt::Debug for RedisQueueConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisQueueConfig")
            .field("url", &redact_url(&self.url))
            .field("name", &self.name)
            .field("visibility_timeout", &self.visibility_timeout)
            .finish()
    }
}

/// Hide the credentials part of a connection URL.
fn redact_url(url: &str) -> String {
    match (url.split_once("://"), url.rsplit_once('@')) {
        (Some((scheme, _)), Some((_, host))) => format!("{scheme}://<redacted>@{host}"),
        _ => url.to_string(),
    }
}

struct Scripts {
    send: Script,
    receive: Script,
    peek: Script,
    delete: Script,
}

/// [`QueueProvider`] on a Redis server.
///
/// The connection is opened by [`QueueProvider::initialize`]; every other call
/// fails with [`QueueError::NotInitialized`] until then.
pub struct RedisQueue {
    client: redis::Client,
    conn: OnceCell<ConnectionManager>,
    keys: QueueKeys,
    visibility_timeout: Duration,
    scripts: Scripts,
}

impl fmt::Debug for RedisQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisQueue")
            .field("keys", &self.keys)
            .field("visibility_timeout", &self.visibility_timeout)
            .field("connected", &self.conn.initialized())
            .finish()
    }
}

fn transport(e: RedisError) -> QueueError {
    QueueError::Transport(e.to_string())
}

fn now_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

fn to_message(raw: RawMessage, pop_receipt: String) -> Result<QueueMessage, QueueError> {
    let (id, content, inserted_at, dequeue_count) = raw;
    let inserted_at = inserted_at
        .parse::<i128>()
        .ok()
        .and_then(|ms| OffsetDateTime::from_unix_timestamp_nanos(ms * 1_000_000).ok());
    let dequeue_count = dequeue_count.parse().map_err(|_| {
        QueueError::Transport(format!(
            "message '{id}' has a malformed dequeue count '{dequeue_count}'"
        ))
    })?;
    Ok(QueueMessage {
        id,
        pop_receipt,
        content,
        inserted_at,
        dequeue_count,
    })
}

impl RedisQueue {
    /// Validate the URL without connecting.
    pub fn new(cfg: &RedisQueueConfig) -> Result<Self, QueueError> {
        let client = redis::Client::open(cfg.url.as_str()).map_err(transport)?;
        Ok(Self {
            client,
            conn: OnceCell::new(),
            keys: QueueKeys::new(&cfg.name),
            visibility_timeout: cfg.visibility_timeout,
            scripts: Scripts {
                send: scripts::send(),
                receive: scripts::receive(),
                peek: scripts::peek(),
                delete: scripts::delete(),
            },
        })
    }

    pub fn keys(&self) -> &QueueKeys {
        &self.keys
    }

    fn conn(&self) -> Result<ConnectionManager, QueueError> {
        self.conn.get().cloned().ok_or(QueueError::NotInitialized)
    }
}

#[async_trait]
impl QueueProvider for RedisQueue {
    async fn initialize(&self) -> Result<(), QueueError> {
        let conn = self
            .conn
            .get_or_try_init(|| ConnectionManager::new(self.client.clone()))
            .await
            .map_err(transport)?;
        let mut conn = conn.clone();
        redis::cmd("PING")
            .query_async::<()>(&mut conn)
            .await
            .map_err(transport)?;
        info!(queue = %self.keys.ready, "redis queue ready");
        Ok(())
    }

    async fn receive(&self) -> Result<Option<QueueMessage>, QueueError> {
        let mut conn = self.conn()?;
        let receipt = Uuid::new_v4().to_string();
        let raw: Option<RawMessage> = self
            .scripts
            .receive
            .key(&self.keys.ready)
            .key(&self.keys.inflight)
            .arg(&self.keys.message_prefix)
            .arg(now_ms())
            .arg(self.visibility_timeout.as_millis() as u64)
            .arg(&receipt)
            .invoke_async(&mut conn)
            .await
            .map_err(transport)?;
        raw.map(|raw| to_message(raw, receipt)).transpose()
    }

    async fn peek(&self) -> Result<Option<QueueMessage>, QueueError> {
        let mut conn = self.conn()?;
        let raw: Option<RawMessage> = self
            .scripts
            .peek
            .key(&self.keys.ready)
            .key(&self.keys.inflight)
            .arg(&self.keys.message_prefix)
            .arg(now_ms())
            .invoke_async(&mut conn)
            .await
            .map_err(transport)?;
        raw.map(|raw| to_message(raw, String::new())).transpose()
    }

    async fn send(&self, content: &str) -> Result<(), QueueError> {
        let mut conn = self.conn()?;
        let id: String = self
            .scripts
            .send
            .key(&self.keys.seq)
            .key(&self.keys.ready)
            .arg(&self.keys.message_prefix)
            .arg(content)
            .arg(now_ms())
            .invoke_async(&mut conn)
            .await
            .map_err(transport)?;
        debug!(message_id = %id, "message enqueued");
        Ok(())
    }

    async fn delete(&self, message: &QueueMessage) -> Result<(), QueueError> {
        let mut conn = self.conn()?;
        let outcome: i64 = self
            .scripts
            .delete
            .key(&self.keys.ready)
            .key(&self.keys.inflight)
            .arg(&self.keys.message_prefix)
            .arg(&message.id)
            .arg(&message.pop_receipt)
            .invoke_async(&mut conn)
            .await
            .map_err(transport)?;
        match outcome {
            1 => Ok(()),
            0 => Err(QueueError::NotFound(message.id.clone())),
            _ => Err(QueueError::ReceiptMismatch(message.id.clone())),
        }
    }

    async fn approximate_count(&self) -> Result<usize, QueueError> {
        let mut conn = self.conn()?;
        let (ready, inflight): (usize, usize) = redis::pipe()
            .llen(&self.keys.ready)
            .zcard(&self.keys.inflight)
            .query_async(&mut conn)
            .await
            .map_err(transport)?;
        Ok(ready + inflight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: &str, inserted_at: &str, count: &str) -> RawMessage {
        (id.into(), "payload".into(), inserted_at.into(), count.into())
    }

    #[test]
    fn snapshot_carries_receipt_and_counts() {
        let msg = to_message(raw("7", "1700000000000", "2"), "r-1".into()).unwrap();
        assert_eq!(msg.id, "7");
        assert_eq!(msg.pop_receipt, "r-1");
        assert_eq!(msg.content, "payload");
        assert_eq!(msg.dequeue_count, 2);
        assert_eq!(msg.inserted_at.unwrap().unix_timestamp(), 1_700_000_000);
    }

    #[test]
    fn unparsable_insert_time_is_dropped() {
        let msg = to_message(raw("7", "yesterday", "0"), String::new()).unwrap();
        assert!(msg.inserted_at.is_none());
    }

    #[test]
    fn malformed_dequeue_count_is_an_error() {
        assert!(matches!(
            to_message(raw("7", "0", "many"), String::new()),
            Err(QueueError::Transport(_))
        ));
    }

    #[test]
    fn invalid_url_is_rejected() {
        assert!(matches!(
            RedisQueue::new(&RedisQueueConfig::new("not a url")),
            Err(QueueError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn calls_before_initialize_are_refused() {
        let queue = RedisQueue::new(&RedisQueueConfig::new("redis://127.0.0.1:6379/0")).unwrap();
        assert!(matches!(queue.receive().await, Err(QueueError::NotInitialized)));
        assert!(matches!(queue.send("x").await, Err(QueueError::NotInitialized)));
        assert!(matches!(
            queue.approximate_count().await,
            Err(QueueError::NotInitialized)
        ));
    }

    #[test]
    fn debug_hides_url_credentials() {
        let cfg = RedisQueueConfig::new("redis://:s3cret@cache.local:6379/0");
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("cache.local:6379"));
        assert_eq!(cfg.name, DEFAULT_QUEUE_NAME);
    }
}
