use runfleet_model::{LabelSet, SELF_HOSTED};

/// Checks job label requirements against the fleet's capabilities.
#[derive(Debug, Clone)]
pub struct LabelMatcher {
    labels: LabelSet,
}

impl LabelMatcher {
    pub fn new(labels: LabelSet) -> Self {
        Self { labels }
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// `true` when the job asks for `self-hosted` and every label it asks for
    /// is advertised by this fleet. Comparison is case-insensitive.
    pub fn has_all_required_labels<S: AsRef<str>>(&self, job_labels: &[S]) -> bool {
        if !is_self_hosted(job_labels) {
            return false;
        }
        job_labels
            .iter()
            .all(|label| self.labels.contains(label.as_ref().trim()))
    }
}

/// Whether the job labels include the `self-hosted` marker.
pub fn is_self_hosted<S: AsRef<str>>(job_labels: &[S]) -> bool {
    job_labels
        .iter()
        .any(|l| l.as_ref().trim().eq_ignore_ascii_case(SELF_HOSTED))
}
