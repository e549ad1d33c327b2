use std::fmt;

/// Label every self-hosted job must carry to be considered by the fleet.
pub const SELF_HOSTED: &str = "self-hosted";

/// Fallback label when the process architecture has no CI-platform equivalent.
pub const ARCH_LABEL_UNKNOWN: &str = "unknown";

/// Maps the compile-time target architecture to the label CI platforms advertise.
pub fn process_arch_label() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "x64",
        "x86" => "x86",
        "aarch64" => "arm64",
        "arm" => "arm",
        "" => ARCH_LABEL_UNKNOWN,
        other => other,
    }
}

/// Capability labels advertised by this fleet.
///
/// Labels are lower-cased, trimmed and deduplicated; insertion order is kept so the rendered
/// label field is stable. The set always contains [`SELF_HOSTED`] and the process architecture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet(Vec<String>);

impl LabelSet {
    /// Build the fleet label set from configured labels.
    pub fn new<I, S>(configured: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_arch(configured, process_arch_label())
    }

    /// Same as [`LabelSet::new`] with an explicit architecture label.
    pub fn with_arch<I, S>(configured: I, arch: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        let extra = [SELF_HOSTED, arch];

        let all = configured
            .into_iter()
            .map(|s| s.as_ref().trim().to_lowercase())
            .chain(extra.iter().map(|s| s.trim().to_lowercase()));

        for label in all {
            if !label.is_empty() && !out.contains(&label) {
                out.push(label);
            }
        }
        Self(out)
    }

    /// Case-insensitive membership test.
    pub fn contains(&self, label: &str) -> bool {
        let folded = label.to_lowercase();
        self.0.iter().any(|l| *l == folded)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Comma-separated label string handed to the runner process.
    pub fn to_field(&self) -> String {
        self.0.join(",")
    }
}

impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_field())
    }
}
