use runfleet_model::{FilterPolicy, ListRule};

/// Allow-list entry matching any repository in prefix mode.
pub const WILDCARD: &str = "*";

/// Decides whether a repository may use this fleet.
///
/// Deny rules are evaluated first and always win. An allow rule with neither a
/// prefix nor entries denies everything.
#[derive(Debug, Clone)]
pub struct RepositoryFilter {
    allow: ListRule,
    deny: ListRule,
}

impl RepositoryFilter {
    pub fn new(policy: &FilterPolicy) -> Self {
        let policy = policy.normalized();
        Self {
            allow: policy.allow,
            deny: policy.deny,
        }
    }

    pub fn is_allowed(&self, repo_full_name: &str) -> bool {
        !self.is_denied(repo_full_name) && self.is_listed(repo_full_name)
    }

    fn is_denied(&self, repo: &str) -> bool {
        let deny = &self.deny;
        if !deny.prefix.is_empty() && repo.starts_with(deny.prefix.as_str()) {
            return true;
        }
        if deny.exact_match {
            deny.entries.iter().any(|e| e == repo)
        } else {
            deny.entries.iter().any(|e| repo.starts_with(e.as_str()))
        }
    }

    fn is_listed(&self, repo: &str) -> bool {
        let allow = &self.allow;
        if !allow.prefix.is_empty() && repo.starts_with(allow.prefix.as_str()) {
            return true;
        }
        if allow.entries.is_empty() {
            return false;
        }
        if allow.exact_match {
            allow.entries.iter().any(|e| e == repo)
        } else {
            allow
                .entries
                .iter()
                .any(|e| e == WILDCARD || repo.starts_with(e.as_str()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(allow: ListRule, deny: ListRule) -> RepositoryFilter {
        RepositoryFilter::new(&FilterPolicy::new(allow, deny))
    }

    #[test]
    fn empty_allow_denies_everything() {
        let f = filter(ListRule::allow(), ListRule::deny());
        assert!(!f.is_allowed("org/repo"));
        assert!(!f.is_allowed(""));
    }

    #[test]
    fn allow_prefix_admits() {
        let f = filter(ListRule::allow().with_prefix("org/"), ListRule::deny());
        assert!(f.is_allowed("org/repo"));
        assert!(!f.is_allowed("other/repo"));
    }

    #[test]
    fn exact_allow_requires_full_name() {
        let f = filter(ListRule::allow().with_entries(["org/repo"]), ListRule::deny());
        assert!(f.is_allowed("org/repo"));
        assert!(!f.is_allowed("org/repo-two"));
    }

    #[test]
    fn prefix_allow_entries_and_wildcard() {
        let f = filter(
            ListRule::allow()
                .with_exact_match(false)
                .with_entries(["team-a/"]),
            ListRule::deny(),
        );
        assert!(f.is_allowed("team-a/service"));
        assert!(!f.is_allowed("team-b/service"));

        let any = filter(
            ListRule::allow().with_exact_match(false).with_entries([WILDCARD]),
            ListRule::deny().with_prefix("secret/"),
        );
        assert!(any.is_allowed("anything/at-all"));
        assert!(!any.is_allowed("secret/vault"));
    }

    #[test]
    fn wildcard_is_literal_in_exact_mode() {
        let f = filter(ListRule::allow().with_entries([WILDCARD]), ListRule::deny());
        assert!(!f.is_allowed("org/repo"));
    }

    #[test]
    fn deny_wins_over_exact_allow() {
        let f = filter(
            ListRule::allow().with_entries(["org/repo"]),
            ListRule::deny().with_exact_match(true).with_entries(["org/repo"]),
        );
        assert!(!f.is_allowed("org/repo"));
    }

    #[test]
    fn deny_entries_match_by_prefix_by_default() {
        let f = filter(
            ListRule::allow().with_prefix("org/"),
            ListRule::deny().with_entries(["org/legacy"]),
        );
        assert!(!f.is_allowed("org/legacy-api"));
        assert!(f.is_allowed("org/modern"));
    }

    #[test]
    fn deny_prefix_wins_over_allow_prefix() {
        let f = filter(
            ListRule::allow().with_prefix("org/"),
            ListRule::deny().with_prefix("org/private-"),
        );
        assert!(!f.is_allowed("org/private-keys"));
        assert!(f.is_allowed("org/public"));
    }
}
