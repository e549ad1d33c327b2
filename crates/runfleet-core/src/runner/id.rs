use std::sync::atomic::{AtomicU64, Ordering};

/// Generates unique runner names for this process.
///
/// Format: `{host}-{owner}-{repo}-{run_id}-{seq}`.
/// - `host`:   coordinator host name
/// - `run_id`: job run id from the event
/// - `seq`:    per-manager decimal sequence
#[derive(Debug)]
pub struct RunnerNames {
    host: String,
    seq: AtomicU64,
}

impl RunnerNames {
    pub fn new(host: &str) -> Self {
        let host = sanitize(host);
        Self {
            host: if host.is_empty() { "runfleet".to_string() } else { host },
            seq: AtomicU64::new(0),
        }
    }

    pub fn next(&self, repo_full_name: &str, run_id: i64) -> String {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        format!(
            "{host}-{repo}-{run_id}-{seq}",
            host = self.host,
            repo = sanitize(repo_full_name)
        )
    }
}

/// Replace characters the runtime rejects in container names.
fn sanitize(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect::<String>()
        .trim_start_matches(['-', '.', '_'])
        .to_string()
}
