//! Verification rubric.
//!
//! The rubric is fixed per format revision and shared by every verification
//! run. `RULES` is the default set; it is a constant and is never mutated.

/// Evidence Bundle format version written by the builder.
pub const FORMAT_VERSION: &str = "0.1";

/// Action log entry version accepted when an entry declares one.
pub const AAL_VERSION: &str = "1.0";

/// Archive entry holding the metadata document.
pub const META_ENTRY: &str = "meta.json";

/// Archive entry holding the action log.
pub const AAL_ENTRY: &str = "aal.ndjson";

/// Scoring rules for L1 verification.
#[derive(Debug, Clone, PartialEq)]
pub struct Rules {
    pub required_meta_fields: &'static [&'static str],
    pub required_system_info_fields: &'static [&'static str],
    pub required_aal_fields: &'static [&'static str],
    pub expected_version: &'static str,
    pub expected_aal_version: &'static str,

    pub meta_max: f64,
    pub aal_max: f64,
    pub optional_max: f64,
    pub hash_max: f64,

    pub meta_penalty: f64,
    pub malformed_line_penalty: f64,
    pub missing_entry_fields_penalty: f64,
    pub empty_aal_penalty: f64,
    pub optional_penalty: f64,

    /// Detailed JSON errors reported before they are summarized.
    pub max_json_errors: usize,
    /// Detailed AAL warnings reported before they are summarized.
    pub max_aal_warnings: usize,

    pub pass_threshold: f64,
    pub partial_threshold: f64,

    pub anchor_prefix: &'static str,
    pub signature_tokens: &'static [&'static str],
}

/// Default rubric for format version 0.1.
pub const RULES: Rules = Rules {
    required_meta_fields: &["bundle_id", "version", "timestamp", "system_info"],
    required_system_info_fields: &["name", "version", "operator"],
    required_aal_fields: &["timestamp", "actor", "action"],
    expected_version: FORMAT_VERSION,
    expected_aal_version: AAL_VERSION,

    meta_max: 4.0,
    aal_max: 4.0,
    optional_max: 2.0,
    hash_max: 2.0,

    meta_penalty: 1.0,
    malformed_line_penalty: 1.0,
    missing_entry_fields_penalty: 0.5,
    empty_aal_penalty: 1.0,
    optional_penalty: 1.0,

    max_json_errors: 3,
    max_aal_warnings: 5,

    pass_threshold: 7.0,
    partial_threshold: 4.0,

    anchor_prefix: "anchors/",
    signature_tokens: &["signature", "ctk"],
};

impl Default for Rules {
    fn default() -> Self {
        RULES
    }
}

impl Rules {
    /// Maximum attainable score for the always-present components.
    ///
    /// Reports are scored out of this value; the hash component is an
    /// opt-in bonus on top of it.
    pub fn base_max(&self) -> f64 {
        self.meta_max + self.aal_max + self.optional_max
    }

    /// True if the archive path names an anchor file.
    pub fn is_anchor_path(&self, name: &str) -> bool {
        name.starts_with(self.anchor_prefix) && name.len() > self.anchor_prefix.len()
    }

    /// True if the archive path looks like a signature artifact.
    pub fn is_signature_path(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.signature_tokens.iter().any(|t| lower.contains(t))
    }
}
