//! Evidence Bundle CLI
//!
//! Build and verify Evidence Bundles: ZIP archives holding a `meta.json`
//! identity record, an append-only `aal.ndjson` action log, and optional
//! attachments, anchors and signatures.
//!
//! Verification is graded rather than boolean. Each component is scored
//! against a fixed rubric and the total maps to PASS, PARTIAL or FAIL.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use evidence_bundle_cli::{verify_bundle, BundleBuilder, EntryDraft};
//!
//! let mut bundle = BundleBuilder::new("incident-42", "Nav AI", "1.2.0", "Ops Team")?;
//! bundle.append_entry(EntryDraft::new("route-planner", "calculate_route"))?;
//! bundle.add_text_attachment("attachments/prompt.txt", "Navigate to the library.\n");
//! let path = bundle.write("out/incident-42.zip")?;
//!
//! let outcome = verify_bundle(Path::new(&path));
//! println!("{}", outcome.verdict().display_name());
//! # Ok::<(), evidence_bundle_cli::BundleError>(())
//! ```

pub mod builder;
pub mod crypto;
pub mod error;
pub mod metadata;
pub mod report;
pub mod rules;
pub mod verdict;
pub mod verify;

pub use builder::{BundleBuilder, EntryDraft};
pub use error::{BundleError, Result};
pub use metadata::{ActionLogEntry, BundleMetadata, SystemInfo};
pub use rules::{Rules, RULES};
pub use verdict::Verdict;
pub use verify::{
    read_metadata, verify_bundle, verify_bundle_with, verify_bytes, verify_bytes_with,
    ComponentReport, VerificationOutcome,
};
