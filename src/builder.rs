//! Evidence Bundle construction.
//!
//! A `BundleBuilder` accumulates metadata, action log entries and text
//! attachments in memory and serializes them into the archive layout:
//!
//! - `meta.json` (pretty-printed metadata)
//! - `aal.ndjson` (one compact JSON object per entry)
//! - one entry per attachment, in insertion order

use std::fs::{self, File};
use std::io::{Cursor, Seek, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use uuid::Uuid;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{BundleError, Result};
use crate::metadata::{iso_now, ActionLogEntry, BundleMetadata, JsonObject, SystemInfo};
use crate::rules::{AAL_ENTRY, FORMAT_VERSION, META_ENTRY};

/// In-memory Evidence Bundle.
#[derive(Debug, Clone)]
pub struct BundleBuilder {
    meta: BundleMetadata,
    entries: Vec<ActionLogEntry>,
    attachments: Vec<(String, String)>,
}

/// An action log entry before it is appended.
#[derive(Debug, Clone, Default)]
pub struct EntryDraft {
    actor: String,
    action: String,
    timestamp: Option<String>,
    input: Option<JsonObject>,
    output: Option<JsonObject>,
    metadata: Option<JsonObject>,
}

impl EntryDraft {
    pub fn new(actor: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            action: action.into(),
            ..Self::default()
        }
    }

    pub fn timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    pub fn input(mut self, input: JsonObject) -> Self {
        self.input = Some(input);
        self
    }

    pub fn output(mut self, output: JsonObject) -> Self {
        self.output = Some(output);
        self
    }

    pub fn metadata(mut self, metadata: JsonObject) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

fn require(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(BundleError::InvalidArgument { field });
    }
    Ok(())
}

impl BundleBuilder {
    /// Create a bundle with an explicit id.
    ///
    /// `created_at` is fixed to the current time here.
    pub fn new(
        bundle_id: impl Into<String>,
        system_name: impl Into<String>,
        system_version: impl Into<String>,
        operator: impl Into<String>,
    ) -> Result<Self> {
        let bundle_id = bundle_id.into();
        let system_info = SystemInfo {
            name: system_name.into(),
            version: system_version.into(),
            operator: operator.into(),
        };

        require("bundle_id", &bundle_id)?;
        require("system_name", &system_info.name)?;
        require("system_version", &system_info.version)?;
        require("operator", &system_info.operator)?;

        Ok(Self {
            meta: BundleMetadata {
                bundle_id,
                format_version: FORMAT_VERSION.to_string(),
                created_at: iso_now(),
                system_info,
                incident_time: None,
                incident_summary: None,
                tags: None,
                disclaimer: None,
                bundle_sha256: None,
            },
            entries: Vec::new(),
            attachments: Vec::new(),
        })
    }

    /// Create a bundle with a generated `evb-<uuid>` id.
    pub fn with_generated_id(
        system_name: impl Into<String>,
        system_version: impl Into<String>,
        operator: impl Into<String>,
    ) -> Result<Self> {
        Self::new(generate_bundle_id(), system_name, system_version, operator)
    }

    /// Demo bundle with a random id and demo narrative fields.
    pub fn new_demo() -> Result<Self> {
        Ok(Self::with_generated_id(
            "Evidence Bundle Demo System",
            "demo-0.1",
            "Evidence Bundle Developer (demo)",
        )?
        .incident_summary("Demo bundle generated with BundleBuilder::new_demo()")
        .tags(["demo", "evidence-bundle"])
        .disclaimer("This bundle is for demonstration and testing only."))
    }

    pub fn incident_time(mut self, incident_time: impl Into<String>) -> Self {
        self.meta.incident_time = Some(incident_time.into());
        self
    }

    pub fn incident_summary(mut self, summary: impl Into<String>) -> Self {
        self.meta.incident_summary = Some(summary.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.meta.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn disclaimer(mut self, disclaimer: impl Into<String>) -> Self {
        self.meta.disclaimer = Some(disclaimer.into());
        self
    }

    /// Declare the digest the finished archive is expected to have.
    pub fn bundle_sha256(mut self, digest: impl Into<String>) -> Self {
        self.meta.bundle_sha256 = Some(digest.into());
        self
    }

    pub fn metadata(&self) -> &BundleMetadata {
        &self.meta
    }

    pub fn entries(&self) -> &[ActionLogEntry] {
        &self.entries
    }

    /// Attachments in archive order.
    pub fn attachments(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attachments
            .iter()
            .map(|(path, content)| (path.as_str(), content.as_str()))
    }

    /// Append one action log entry. A missing timestamp defaults to now.
    pub fn append_entry(&mut self, draft: EntryDraft) -> Result<&ActionLogEntry> {
        require("actor", &draft.actor)?;
        require("action", &draft.action)?;

        let index = self.entries.len();
        self.entries.push(ActionLogEntry {
            timestamp: draft.timestamp.unwrap_or_else(iso_now),
            actor: draft.actor,
            action: draft.action,
            input: draft.input,
            output: draft.output,
            metadata: draft.metadata,
        });
        Ok(&self.entries[index])
    }

    /// Insert a text attachment at an archive-relative path.
    ///
    /// A path that already exists keeps its position and takes the new
    /// content. Paths are not sanitized.
    pub fn add_text_attachment(&mut self, path: impl Into<String>, content: impl Into<String>) {
        let path = path.into();
        let content = content.into();
        match self.attachments.iter_mut().find(|(p, _)| *p == path) {
            Some(existing) => existing.1 = content,
            None => self.attachments.push((path, content)),
        }
    }

    /// The `aal.ndjson` payload: one line per entry, newline-terminated.
    pub fn aal_ndjson(&self) -> Result<String> {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&entry.to_json_line()?);
            out.push('\n');
        }
        Ok(out)
    }

    /// Serialize the bundle into any seekable sink, returning the sink.
    pub fn write_to<W: Write + Seek>(&self, sink: W) -> Result<W> {
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut zip = ZipWriter::new(sink);

        zip.start_file(META_ENTRY, options)?;
        zip.write_all(self.meta.to_json_pretty()?.as_bytes())?;

        zip.start_file(AAL_ENTRY, options)?;
        zip.write_all(self.aal_ndjson()?.as_bytes())?;

        for (path, content) in &self.attachments {
            debug!(path = %path, bytes = content.len(), "writing attachment");
            zip.start_file(path.as_str(), options)?;
            zip.write_all(content.as_bytes())?;
        }

        Ok(zip.finish()?)
    }

    /// Serialize the bundle into an in-memory archive.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.write_to(Cursor::new(Vec::new()))?.into_inner())
    }

    /// Write the bundle to `path`, creating parent directories as needed.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let target = path.as_ref().to_path_buf();
        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = File::create(&target)?;
        self.write_to(file)?;

        info!(
            bundle_id = %self.meta.bundle_id,
            entries = self.entries.len(),
            attachments = self.attachments.len(),
            path = %target.display(),
            "bundle written"
        );
        Ok(target)
    }
}

/// Random bundle id of the form `evb-<uuid>`.
pub fn generate_bundle_id() -> String {
    format!("evb-{}", Uuid::new_v4())
}
