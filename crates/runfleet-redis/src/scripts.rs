//! Lua scripts executed atomically by the server.
//!
//! Message snapshots are returned as `{id, content, inserted_at_ms, dequeue_count}`,
//! all as strings; a missing message is returned as `false` (nil reply).
use redis::Script;

/// Move ids whose visibility deadline passed back to the head of the ready list.
const REQUEUE_EXPIRED: &str = r#"
local expired = redis.call('ZRANGEBYSCORE', KEYS[2], '-inf', ARGV[2])
for i = #expired, 1, -1 do
    redis.call('ZREM', KEYS[2], expired[i])
    redis.call('LPUSH', KEYS[1], expired[i])
end
"#;

/// KEYS: seq, ready. ARGV: message prefix, content, now (ms).
pub fn send() -> Script {
    Script::new(
        r#"
        local id = tostring(redis.call('INCR', KEYS[1]))
        redis.call('HSET', ARGV[1] .. id,
            'content', ARGV[2],
            'inserted_at', ARGV[3],
            'dequeue_count', 0)
        redis.call('RPUSH', KEYS[2], id)
        return id
        "#,
    )
}

/// KEYS: ready, inflight. ARGV: message prefix, now (ms), visibility (ms), receipt.
pub fn receive() -> Script {
    Script::new(&format!(
        r#"
        {REQUEUE_EXPIRED}
        local id = redis.call('LPOP', KEYS[1])
        while id and redis.call('EXISTS', ARGV[1] .. id) == 0 do
            id = redis.call('LPOP', KEYS[1])
        end
        if not id then
            return false
        end
        local key = ARGV[1] .. id
        redis.call('ZADD', KEYS[2], tonumber(ARGV[2]) + tonumber(ARGV[3]), id)
        local count = redis.call('HINCRBY', key, 'dequeue_count', 1)
        redis.call('HSET', key, 'receipt', ARGV[4])
        local fields = redis.call('HMGET', key, 'content', 'inserted_at')
        return {{id, fields[1], fields[2], tostring(count)}}
        "#
    ))
}

/// KEYS: ready, inflight. ARGV: message prefix, now (ms).
pub fn peek() -> Script {
    Script::new(&format!(
        r#"
        {REQUEUE_EXPIRED}
        local id = redis.call('LINDEX', KEYS[1], 0)
        if not id then
            return false
        end
        local fields = redis.call('HMGET', ARGV[1] .. id, 'content', 'inserted_at', 'dequeue_count')
        if not fields[1] then
            return false
        end
        return {{id, fields[1], fields[2], fields[3]}}
        "#
    ))
}

/// KEYS: ready, inflight. ARGV: message prefix, id, receipt.
///
/// Returns `1` when deleted, `0` when the message is gone and `-1` on a receipt mismatch.
pub fn delete() -> Script {
    Script::new(
        r#"
        local key = ARGV[1] .. ARGV[2]
        if redis.call('EXISTS', key) == 0 then
            return 0
        end
        if redis.call('HGET', key, 'receipt') ~= ARGV[3] then
            return -1
        end
        redis.call('DEL', key)
        redis.call('ZREM', KEYS[2], ARGV[2])
        redis.call('LREM', KEYS[1], 0, ARGV[2])
        return 1
        "#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripts_have_distinct_hashes() {
        let hashes = [
            send().get_hash().to_string(),
            receive().get_hash().to_string(),
            peek().get_hash().to_string(),
            delete().get_hash().to_string(),
        ];
        for (i, a) in hashes.iter().enumerate() {
            for b in &hashes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
