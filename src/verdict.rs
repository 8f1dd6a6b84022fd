//! Verdict computation.
//!
//! Maps an aggregate score and the presence of errors onto the tri-state
//! L1 verdict. PASS is highest, FAIL is lowest.

use serde::Serialize;

use crate::rules::Rules;

/// L1 verification verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    /// Score at or above the pass threshold and no errors recorded.
    Pass,

    /// Usable with caveats: mid-range score, or a high score with errors.
    Partial,

    /// Score below the partial threshold. Do not trust.
    Fail,
}

impl Verdict {
    /// Human-readable display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Verdict::Pass => "L1-PASS",
            Verdict::Partial => "L1-PARTIAL",
            Verdict::Fail => "L1-FAIL",
        }
    }

    /// Explanation of what this verdict means.
    pub fn explanation(&self) -> &'static str {
        match self {
            Verdict::Pass => "Bundle is valid for basic audit",
            Verdict::Partial => "Bundle has issues but may be usable",
            Verdict::Fail => "Bundle fails verification",
        }
    }

    /// ANSI color code for terminal output.
    pub fn color_code(&self) -> &'static str {
        match self {
            Verdict::Pass => "\x1b[32m",    // Green
            Verdict::Partial => "\x1b[33m", // Yellow
            Verdict::Fail => "\x1b[31m",    // Red
        }
    }

    /// Process exit code for a driving CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            Verdict::Pass => 0,
            Verdict::Partial => 1,
            Verdict::Fail => 2,
        }
    }
}

/// Compute the verdict from an aggregate score.
///
/// Rules:
/// - PASS: score >= pass threshold and no errors
/// - PARTIAL: score >= partial threshold otherwise
/// - FAIL: score below partial threshold
pub fn compute_verdict(rules: &Rules, score: f64, has_errors: bool) -> Verdict {
    if score >= rules.pass_threshold && !has_errors {
        Verdict::Pass
    } else if score >= rules.partial_threshold {
        Verdict::Partial
    } else {
        Verdict::Fail
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RULES;

    #[test]
    fn test_pass() {
        assert_eq!(compute_verdict(&RULES, 8.0, false), Verdict::Pass);
        assert_eq!(compute_verdict(&RULES, 7.0, false), Verdict::Pass);
    }

    #[test]
    fn test_error_prevents_pass() {
        assert_eq!(compute_verdict(&RULES, 10.0, true), Verdict::Partial);
    }

    #[test]
    fn test_partial_range() {
        assert_eq!(compute_verdict(&RULES, 6.5, false), Verdict::Partial);
        assert_eq!(compute_verdict(&RULES, 4.0, true), Verdict::Partial);
    }

    #[test]
    fn test_fail() {
        assert_eq!(compute_verdict(&RULES, 3.5, false), Verdict::Fail);
        assert_eq!(compute_verdict(&RULES, 0.0, true), Verdict::Fail);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(Verdict::Pass.exit_code(), 0);
        assert_eq!(Verdict::Partial.exit_code(), 1);
        assert_eq!(Verdict::Fail.exit_code(), 2);
    }
}
