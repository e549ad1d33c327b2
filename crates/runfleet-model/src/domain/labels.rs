use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Container label map based on [`BTreeMap`].
///
/// Used both for labels attached at creation time and for labels read back from the runtime.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Labels(pub BTreeMap<String, String>);

impl Labels {
    /// Create an empty set of labels.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Returns `true` if no labels are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Insert or overwrite a label.
    ///
    /// Returns `self` for chaining.
    pub fn insert<K, V>(&mut self, key: K, val: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.0.insert(key.into(), val.into());
        self
    }

    /// Get the value for a key, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|s| s.as_str())
    }

    /// Iterate through all labels as `(&str, &str)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for Labels
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::Labels;
    use crate::{LABEL_JOB_RUN, LABEL_MANAGED};

    #[test]
    fn insert_overwrites_existing_key() {
        let mut labels = Labels::new();
        labels.insert(LABEL_MANAGED, "false").insert(LABEL_MANAGED, "true");

        assert_eq!(labels.get(LABEL_MANAGED), Some("true"));
        assert_eq!(labels.iter().count(), 1);
    }

    #[test]
    fn collects_from_pairs() {
        let labels: Labels = [(LABEL_MANAGED, "true"), (LABEL_JOB_RUN, "42")]
            .into_iter()
            .collect();

        assert_eq!(labels.get(LABEL_JOB_RUN), Some("42"));
        assert!(labels.get("missing").is_none());
    }
}
