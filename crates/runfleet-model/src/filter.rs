use serde::{Deserialize, Serialize};

/// One side (allow or deny) of a repository filter.
///
/// `prefix` is matched independently of `entries`; `exact_match` only controls how `entries` are compared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListRule {
    /// Repository full-name prefix; empty disables it.
    pub prefix: String,
    /// Explicit repository names (or name prefixes when `exact_match` is off).
    pub entries: Vec<String>,
    /// Compare `entries` by equality instead of `starts_with`.
    pub exact_match: bool,
}

impl ListRule {
    /// Allow-list defaults: exact matching.
    pub fn allow() -> Self {
        Self {
            prefix: String::new(),
            entries: Vec::new(),
            exact_match: true,
        }
    }

    /// Deny-list defaults: prefix matching.
    pub fn deny() -> Self {
        Self {
            prefix: String::new(),
            entries: Vec::new(),
            exact_match: false,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_entries<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries = entries.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_exact_match(mut self, exact: bool) -> Self {
        self.exact_match = exact;
        self
    }

    /// Trim the prefix and every entry, drop empty entries and duplicates.
    pub fn normalized(&self) -> Self {
        let mut entries: Vec<String> = Vec::with_capacity(self.entries.len());
        for entry in self.entries.iter().map(|e| e.trim()) {
            if !entry.is_empty() && !entries.iter().any(|e| e == entry) {
                entries.push(entry.to_string());
            }
        }
        Self {
            prefix: self.prefix.trim().to_string(),
            entries,
            exact_match: self.exact_match,
        }
    }

    /// `true` when neither a prefix nor entries are configured.
    pub fn is_empty(&self) -> bool {
        self.prefix.is_empty() && self.entries.is_empty()
    }
}

impl Default for ListRule {
    fn default() -> Self {
        Self::allow()
    }
}

fn default_deny() -> ListRule {
    ListRule::deny()
}

/// Repository allow/deny policy.
///
/// Deny is always evaluated first and wins. An empty allow side denies every repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterPolicy {
    #[serde(default)]
    pub allow: ListRule,
    #[serde(default = "default_deny")]
    pub deny: ListRule,
}

impl FilterPolicy {
    pub fn new(allow: ListRule, deny: ListRule) -> Self {
        Self { allow, deny }
    }

    pub fn normalized(&self) -> Self {
        Self {
            allow: self.allow.normalized(),
            deny: self.deny.normalized(),
        }
    }
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self {
            allow: ListRule::allow(),
            deny: ListRule::deny(),
        }
    }
}
