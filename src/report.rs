//! Human and machine readable verification reports.

use std::fmt::Write;
use std::path::Path;

use serde_json::{json, Value};

use crate::metadata::BundleMetadata;
use crate::rules::Rules;
use crate::verify::VerificationOutcome;

const RESET: &str = "\x1b[0m";
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const BOLD: &str = "\x1b[1m";

/// Whole scores print without a fraction.
pub fn fmt_score(score: f64) -> String {
    if score.fract() == 0.0 {
        format!("{:.0}", score)
    } else {
        format!("{:.1}", score)
    }
}

/// Text report. Per-component scores are listed when `verbose` is set;
/// bundle identity is shown when `meta` is given.
pub fn render_text(
    rules: &Rules,
    outcome: &VerificationOutcome,
    path: &Path,
    meta: Option<&BundleMetadata>,
    verbose: bool,
) -> String {
    let mut out = String::new();
    write_text(&mut out, rules, outcome, path, meta, verbose).ok();
    out
}

fn write_text<W: Write>(
    out: &mut W,
    rules: &Rules,
    outcome: &VerificationOutcome,
    path: &Path,
    meta: Option<&BundleMetadata>,
    verbose: bool,
) -> std::fmt::Result {
    let verdict = outcome.verdict();

    writeln!(out)?;
    writeln!(out, "{}EVIDENCE BUNDLE VERIFICATION{}", BOLD, RESET)?;
    writeln!(out, "============================")?;
    writeln!(out, "Bundle:      {}", path.display())?;

    if let Some(meta) = meta {
        writeln!(out, "Bundle ID:   {}", meta.bundle_id)?;
        writeln!(
            out,
            "System:      {} {} ({})",
            meta.system_info.name, meta.system_info.version, meta.system_info.operator
        )?;
        writeln!(out, "Created:     {}", meta.created_at)?;
    }

    writeln!(out)?;
    writeln!(out, "{}CHECKS{}", BOLD, RESET)?;
    writeln!(out, "------")?;
    check_line(out, !outcome.meta.has_errors(), "meta.json valid", "meta.json has errors")?;
    check_line(out, !outcome.aal.has_errors(), "aal.ndjson valid", "aal.ndjson has errors")?;
    optional_line(out, outcome.anchors_found, "anchors/")?;
    optional_line(out, outcome.signature_found, "signature")?;
    if let Some(hash) = &outcome.hash {
        check_line(out, !hash.has_errors(), "bundle_sha256 verified", "bundle_sha256 mismatch")?;
    }

    if verbose {
        writeln!(out)?;
        writeln!(out, "{}COMPONENTS{}", BOLD, RESET)?;
        writeln!(out, "----------")?;
        for (name, component) in outcome.components() {
            writeln!(
                out,
                "{:<12} {}/{}",
                name,
                fmt_score(component.score),
                fmt_score(component.max_score)
            )?;
        }
    }

    if outcome.has_errors() {
        writeln!(out)?;
        writeln!(out, "{}{}ERRORS{}", BOLD, RED, RESET)?;
        for err in outcome.all_errors() {
            writeln!(out, "  {}", err)?;
        }
    }

    let mut warnings = outcome.all_warnings().peekable();
    if warnings.peek().is_some() {
        writeln!(out)?;
        writeln!(out, "{}WARNINGS{}", BOLD, RESET)?;
        for warning in warnings {
            writeln!(out, "  {}", warning)?;
        }
    }

    writeln!(out)?;
    writeln!(
        out,
        "Score:       {}/{}",
        fmt_score(outcome.total_score()),
        fmt_score(rules.base_max())
    )?;
    writeln!(
        out,
        "Verdict:     {}{}{}{}: {}",
        BOLD,
        verdict.color_code(),
        verdict.display_name(),
        RESET,
        verdict.explanation()
    )?;
    writeln!(out)
}

fn check_line<W: Write>(out: &mut W, ok: bool, yes: &str, no: &str) -> std::fmt::Result {
    if ok {
        writeln!(out, "{}✓{} {}", GREEN, RESET, yes)
    } else {
        writeln!(out, "{}✗{} {}", RED, RESET, no)
    }
}

fn optional_line<W: Write>(out: &mut W, found: bool, what: &str) -> std::fmt::Result {
    if found {
        writeln!(out, "{}✓{} {} present", GREEN, RESET, what)
    } else {
        writeln!(out, "○ {} missing (optional)", what)
    }
}

/// JSON report for `--format json`.
pub fn render_json(outcome: &VerificationOutcome, path: &Path) -> Value {
    json!({
        "path": path.display().to_string(),
        "verdict": outcome.verdict(),
        "score": outcome.total_score(),
        "exitCode": outcome.verdict().exit_code(),
        "outcome": outcome,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{BundleBuilder, EntryDraft};
    use crate::rules::RULES;
    use crate::verify::verify_bytes;

    fn passing_outcome() -> VerificationOutcome {
        let mut b = BundleBuilder::new("b1", "Demo", "1.0", "Ops").unwrap();
        b.append_entry(EntryDraft::new("user", "login")).unwrap();
        verify_bytes(&b.to_bytes().unwrap())
    }

    #[test]
    fn test_fmt_score() {
        assert_eq!(fmt_score(8.0), "8");
        assert_eq!(fmt_score(7.5), "7.5");
    }

    #[test]
    fn test_score_line_out_of_ten() {
        let report = render_text(&RULES, &passing_outcome(), Path::new("b.zip"), None, false);
        assert!(report.contains("Score:       8/10\n"));
        assert!(report.contains("L1-PASS"));
        assert!(report.contains("meta.json valid"));
        assert!(report.contains("○ anchors/ missing (optional)"));
        assert!(!report.contains("COMPONENTS"));
    }

    #[test]
    fn test_verbose_lists_components_and_identity() {
        let b = BundleBuilder::new("b1", "Demo", "1.0", "Ops").unwrap();
        let outcome = verify_bytes(&b.to_bytes().unwrap());
        let report = render_text(&RULES, &outcome, Path::new("b.zip"), Some(b.metadata()), true);
        assert!(report.contains("Bundle ID:   b1"));
        assert!(report.contains("System:      Demo 1.0 (Ops)"));
        assert!(report.contains("aal          3/4"));
        assert!(report.contains("Score:       7/10\n"));
    }

    #[test]
    fn test_unreadable_archive_report() {
        let outcome = verify_bytes(b"not a zip");
        let report = render_text(&RULES, &outcome, Path::new("bad.zip"), None, false);
        assert!(report.contains("ERRORS"));
        assert!(report.contains("Score:       0/10\n"));
        assert!(report.contains("L1-FAIL"));
    }

    #[test]
    fn test_json_report() {
        let value = render_json(&passing_outcome(), Path::new("b.zip"));
        assert_eq!(value["verdict"], "PASS");
        assert_eq!(value["exitCode"], 0);
        assert_eq!(value["score"], 8.0);
        assert_eq!(value["outcome"]["meta"]["score"], 4.0);
    }
}
