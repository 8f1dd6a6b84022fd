//! Core verification logic.
//!
//! Scores an archive against the L1 rubric. Each component (meta, aal,
//! optional, and hash when declared) is checked independently; content
//! problems are recorded inside the outcome instead of being returned as
//! errors. Only an archive that cannot be read at all short-circuits to a
//! failed outcome.

use std::fs;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use zip::result::ZipError;
use zip::ZipArchive;

use crate::crypto::{digest_matches, sha256_hex};
use crate::error::{BundleError, Result};
use crate::metadata::{is_iso8601_like, BundleMetadata};
use crate::rules::{Rules, AAL_ENTRY, META_ENTRY, RULES};
use crate::verdict::{compute_verdict, Verdict};

/// Score, warnings and errors for one rubric component.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentReport {
    pub score: f64,
    pub max_score: f64,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ComponentReport {
    fn full(max_score: f64) -> Self {
        Self {
            score: max_score,
            max_score,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn zeroed(max_score: f64) -> Self {
        Self {
            score: 0.0,
            ..Self::full(max_score)
        }
    }

    /// Deduct points; scores never drop below zero.
    fn penalize(&mut self, penalty: f64) {
        self.score = (self.score - penalty).max(0.0);
    }

    fn warn(&mut self, message: impl Into<String>, penalty: f64) {
        self.warnings.push(message.into());
        self.penalize(penalty);
    }

    fn error(&mut self, message: impl Into<String>, penalty: f64) {
        self.errors.push(message.into());
        self.penalize(penalty);
    }

    /// Hard error: the component is worth nothing.
    fn fail(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
        self.score = 0.0;
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Result of verifying one archive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationOutcome {
    pub meta: ComponentReport,
    pub aal: ComponentReport,
    pub optional: ComponentReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<ComponentReport>,
    pub anchors_found: bool,
    pub signature_found: bool,
    total_score: f64,
    verdict: Verdict,
}

impl VerificationOutcome {
    fn new(
        rules: &Rules,
        meta: ComponentReport,
        aal: ComponentReport,
        optional: ComponentReport,
        hash: Option<ComponentReport>,
        markers: Markers,
    ) -> Self {
        let total_score = [Some(&meta), Some(&aal), Some(&optional), hash.as_ref()]
            .into_iter()
            .flatten()
            .map(|c| c.score)
            .sum::<f64>()
            .max(0.0);
        let has_errors = [Some(&meta), Some(&aal), Some(&optional), hash.as_ref()]
            .into_iter()
            .flatten()
            .any(ComponentReport::has_errors);

        Self {
            verdict: compute_verdict(rules, total_score, has_errors),
            meta,
            aal,
            optional,
            hash,
            anchors_found: markers.anchors,
            signature_found: markers.signature,
            total_score,
        }
    }

    /// Outcome for an archive that could not be opened at all.
    fn unreadable(rules: &Rules, err: &BundleError) -> Self {
        let mut meta = ComponentReport::zeroed(rules.meta_max);
        meta.errors.push(err.to_string());
        Self::new(
            rules,
            meta,
            ComponentReport::zeroed(rules.aal_max),
            ComponentReport::zeroed(rules.optional_max),
            None,
            Markers::default(),
        )
    }

    /// Sum of component scores, floored at zero.
    pub fn total_score(&self) -> f64 {
        self.total_score
    }

    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    /// Present components with their names, in report order.
    pub fn components(&self) -> impl Iterator<Item = (&'static str, &ComponentReport)> {
        [
            Some(("meta", &self.meta)),
            Some(("aal", &self.aal)),
            Some(("optional", &self.optional)),
            self.hash.as_ref().map(|h| ("hash", h)),
        ]
        .into_iter()
        .flatten()
    }

    pub fn all_warnings(&self) -> impl Iterator<Item = &str> {
        self.components()
            .flat_map(|(_, c)| c.warnings.iter().map(String::as_str))
    }

    pub fn all_errors(&self) -> impl Iterator<Item = &str> {
        self.components()
            .flat_map(|(_, c)| c.errors.iter().map(String::as_str))
    }

    pub fn has_errors(&self) -> bool {
        self.components().any(|(_, c)| c.has_errors())
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Markers {
    anchors: bool,
    signature: bool,
}

/// Counts occurrences and admits only the first `limit` for detailed reporting.
struct Capped {
    seen: usize,
    limit: usize,
}

impl Capped {
    fn new(limit: usize) -> Self {
        Self { seen: 0, limit }
    }

    fn admit(&mut self) -> bool {
        self.seen += 1;
        self.seen <= self.limit
    }

    fn overflow(&self) -> usize {
        self.seen.saturating_sub(self.limit)
    }
}

/// Verify the archive at `path` with the default rubric.
pub fn verify_bundle(path: &Path) -> VerificationOutcome {
    verify_bundle_with(&RULES, path)
}

/// Verify the archive at `path` with a custom rubric.
pub fn verify_bundle_with(rules: &Rules, path: &Path) -> VerificationOutcome {
    match fs::read(path) {
        Ok(bytes) => verify_bytes_with(rules, &bytes),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot read bundle");
            VerificationOutcome::unreadable(rules, &BundleError::Io(e))
        }
    }
}

/// Verify an in-memory archive with the default rubric.
pub fn verify_bytes(bytes: &[u8]) -> VerificationOutcome {
    verify_bytes_with(&RULES, bytes)
}

/// Verify an in-memory archive with a custom rubric.
///
/// The outcome depends only on `bytes`; the hash component digests exactly
/// these bytes.
pub fn verify_bytes_with(rules: &Rules, bytes: &[u8]) -> VerificationOutcome {
    let mut zip = match ZipArchive::new(Cursor::new(bytes)) {
        Ok(zip) => zip,
        Err(e) => {
            warn!(error = %e, "not a valid archive");
            let err = match e {
                ZipError::Io(io) => BundleError::MalformedArchive(io.to_string()),
                other => BundleError::from(other),
            };
            return VerificationOutcome::unreadable(rules, &err);
        }
    };

    let names: Vec<String> = zip.file_names().map(String::from).collect();

    let (meta, meta_doc) = check_meta(rules, &mut zip);
    let aal = check_aal(rules, &mut zip);
    let (optional, markers) = check_optional(rules, &names);
    let hash = meta_doc
        .as_ref()
        .and_then(|doc| check_hash(rules, doc, bytes));

    let outcome = VerificationOutcome::new(rules, meta, aal, optional, hash, markers);
    info!(
        score = outcome.total_score(),
        verdict = outcome.verdict().display_name(),
        "bundle verified"
    );
    outcome
}

/// Read a whole archive entry. `Ok(None)` means the entry does not exist.
fn read_entry<R: Read + Seek>(zip: &mut ZipArchive<R>, name: &str) -> Result<Option<Vec<u8>>> {
    let mut file = match zip.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut out = Vec::new();
    file.read_to_end(&mut out)?;
    Ok(Some(out))
}

/// Read and strictly parse `meta.json` from the archive at `path`.
pub fn read_metadata(path: &Path) -> Result<BundleMetadata> {
    let file = fs::File::open(path)?;
    let mut zip = ZipArchive::new(file)?;
    match read_entry(&mut zip, META_ENTRY)? {
        Some(bytes) => BundleMetadata::from_json(&bytes),
        None => Err(BundleError::malformed(META_ENTRY, "entry not found")),
    }
}

/// Present means the key exists with a non-null value.
fn is_present(doc: &Map<String, Value>, key: &str) -> bool {
    doc.get(key).map(|v| !v.is_null()).unwrap_or(false)
}

fn missing_fields(doc: &Map<String, Value>, required: &[&str]) -> Vec<String> {
    required
        .iter()
        .filter(|f| !is_present(doc, f))
        .map(|f| f.to_string())
        .collect()
}

/// Check `meta.json`, returning the parsed document when it is a JSON object.
fn check_meta<R: Read + Seek>(
    rules: &Rules,
    zip: &mut ZipArchive<R>,
) -> (ComponentReport, Option<Map<String, Value>>) {
    let mut report = ComponentReport::full(rules.meta_max);

    let bytes = match read_entry(zip, META_ENTRY) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => {
            report.fail(format!("{} missing", META_ENTRY));
            return (report, None);
        }
        Err(e) => {
            report.fail(format!("{} read error: {}", META_ENTRY, e));
            return (report, None);
        }
    };

    let doc = match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(doc)) => doc,
        Ok(_) => {
            report.fail(BundleError::malformed(META_ENTRY, "expected a JSON object").to_string());
            return (report, None);
        }
        Err(e) => {
            let err = BundleError::malformed(META_ENTRY, format!("invalid JSON: {}", e));
            report.fail(err.to_string());
            return (report, None);
        }
    };

    let missing = missing_fields(&doc, rules.required_meta_fields);
    if !missing.is_empty() {
        report.warn(
            format!("{} missing required fields: {}", META_ENTRY, missing.join(", ")),
            rules.meta_penalty,
        );
    }

    if let Some(version) = doc.get("version").filter(|v| !v.is_null()) {
        if version.as_str() != Some(rules.expected_version) {
            report.warn(
                format!(
                    "version mismatch (expected: '{}', got: {})",
                    rules.expected_version, version
                ),
                rules.meta_penalty,
            );
        }
    }

    if let Some(ts) = doc.get("timestamp").filter(|v| !v.is_null()) {
        if !is_iso8601_like(ts) {
            report.warn(
                "timestamp should be ISO 8601 (e.g. 2025-11-19T12:34:56Z)",
                rules.meta_penalty,
            );
        }
    }

    match doc.get("system_info").filter(|v| !v.is_null()) {
        Some(Value::Object(info)) => {
            let missing = missing_fields(info, rules.required_system_info_fields);
            if !missing.is_empty() {
                report.warn(
                    format!("system_info missing fields: {}", missing.join(", ")),
                    rules.meta_penalty,
                );
            }
        }
        Some(_) => report.warn("system_info should be an object", rules.meta_penalty),
        None => {}
    }

    debug!(score = report.score, warnings = report.warnings.len(), "meta checked");
    (report, Some(doc))
}

/// Check `aal.ndjson` line by line.
fn check_aal<R: Read + Seek>(rules: &Rules, zip: &mut ZipArchive<R>) -> ComponentReport {
    let mut report = ComponentReport::full(rules.aal_max);

    let raw = match read_entry(zip, AAL_ENTRY) {
        Ok(Some(bytes)) => match String::from_utf8(bytes) {
            Ok(raw) => raw,
            Err(e) => {
                report.fail(format!("{} read error: {}", AAL_ENTRY, e));
                return report;
            }
        },
        Ok(None) => {
            report.fail(format!("{} missing", AAL_ENTRY));
            return report;
        }
        Err(e) => {
            report.fail(format!("{} read error: {}", AAL_ENTRY, e));
            return report;
        }
    };

    let lines: Vec<(usize, &str)> = raw
        .split('\n')
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| (i + 1, line))
        .collect();

    if lines.is_empty() {
        report.warn(format!("{} is empty", AAL_ENTRY), rules.empty_aal_penalty);
        return report;
    }

    let mut json_errors = Capped::new(rules.max_json_errors);
    let mut notes = Capped::new(rules.max_aal_warnings);

    for (n, line) in lines {
        let entry = match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(entry)) => entry,
            _ => {
                if json_errors.admit() {
                    report.error(
                        format!("AAL line {}: invalid JSON", n),
                        rules.malformed_line_penalty,
                    );
                } else {
                    report.penalize(rules.malformed_line_penalty);
                }
                continue;
            }
        };

        let missing = missing_fields(&entry, rules.required_aal_fields);
        if !missing.is_empty() {
            report.penalize(rules.missing_entry_fields_penalty);
            if notes.admit() {
                report.warn(format!("AAL line {}: missing fields {}", n, missing.join(", ")), 0.0);
            }
        }

        if let Some(version) = entry.get("aal_version").filter(|v| !v.is_null()) {
            if version.as_str() != Some(rules.expected_aal_version) && notes.admit() {
                report.warn(
                    format!(
                        "AAL line {}: aal_version mismatch (expected: '{}', got: {})",
                        n, rules.expected_aal_version, version
                    ),
                    0.0,
                );
            }
        }

        if let Some(ts) = entry.get("timestamp").filter(|v| !v.is_null()) {
            if !is_iso8601_like(ts) && notes.admit() {
                report.warn(format!("AAL line {}: timestamp not ISO 8601-like", n), 0.0);
            }
        }
    }

    if json_errors.overflow() > 0 {
        report.errors.push(format!(
            "...and {} more JSON errors in AAL",
            json_errors.overflow()
        ));
    }
    if notes.overflow() > 0 {
        report
            .warnings
            .push(format!("...and {} more AAL warnings", notes.overflow()));
    }

    debug!(
        score = report.score,
        warnings = report.warnings.len(),
        errors = report.errors.len(),
        "aal checked"
    );
    report
}

/// Advisory check for anchors and signature artifacts.
fn check_optional(rules: &Rules, names: &[String]) -> (ComponentReport, Markers) {
    let mut report = ComponentReport::full(rules.optional_max);
    let markers = Markers {
        anchors: names.iter().any(|n| rules.is_anchor_path(n)),
        signature: names.iter().any(|n| rules.is_signature_path(n)),
    };

    if !markers.anchors {
        report.warn(
            format!("No {} found (optional for v{})", rules.anchor_prefix, rules.expected_version),
            rules.optional_penalty,
        );
    }
    if !markers.signature {
        report.warn(
            format!("No cryptographic signature (optional for v{})", rules.expected_version),
            rules.optional_penalty,
        );
    }

    debug!(score = report.score, "optional checked");
    (report, markers)
}

/// Compare a declared `bundle_sha256` with the digest of the archive bytes.
///
/// Returns `None` when no digest is declared.
fn check_hash(rules: &Rules, meta: &Map<String, Value>, archive: &[u8]) -> Option<ComponentReport> {
    let declared = meta.get("bundle_sha256").filter(|v| !v.is_null())?;
    let mut report = ComponentReport::full(rules.hash_max);

    match declared.as_str() {
        Some(expected) => {
            let actual = sha256_hex(archive);
            if !digest_matches(expected, &actual) {
                report.fail(
                    BundleError::IntegrityMismatch {
                        expected: expected.to_string(),
                        actual,
                    }
                    .to_string(),
                );
            }
        }
        None => {
            let err = BundleError::malformed(META_ENTRY, "bundle_sha256 must be a string");
            report.fail(err.to_string());
        }
    }

    debug!(score = report.score, "hash checked");
    Some(report)
}
