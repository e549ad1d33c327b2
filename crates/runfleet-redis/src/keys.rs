/// Key layout of one named queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueKeys {
    /// Counter handing out message ids.
    pub seq: String,
    /// List of visible message ids, oldest first.
    pub ready: String,
    /// Sorted set of received ids scored by visibility deadline (unix ms).
    pub inflight: String,
    /// Prefix of the per-message hash; the id is appended.
    pub message_prefix: String,
}

impl QueueKeys {
    pub fn new(name: &str) -> Self {
        Self {
            seq: format!("{name}:seq"),
            ready: format!("{name}:ready"),
            inflight: format!("{name}:inflight"),
            message_prefix: format!("{name}:msg:"),
        }
    }

    pub fn message(&self, id: &str) -> String {
        format!("{}{id}", self.message_prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_share_the_queue_name() {
        let keys = QueueKeys::new("runfleet-jobs");
        assert_eq!(keys.ready, "runfleet-jobs:ready");
        assert_eq!(keys.inflight, "runfleet-jobs:inflight");
        assert_eq!(keys.seq, "runfleet-jobs:seq");
        assert_eq!(keys.message("17"), "runfleet-jobs:msg:17");
    }
}
