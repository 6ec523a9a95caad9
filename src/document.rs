//! The unit of conversion work and its status machine.
//!
//! ```text
//!            mark_processing            complete(html)
//!   IDLE ─────────────────▶ PROCESSING ───────────────▶ COMPLETED
//!   PENDING ──────────────▶     │
//!   ERROR ────────────────▶     │ fail(message)
//!                               └─────────────────────▶ ERROR
//! ```
//!
//! Fields are private so the only way to change a document is through these
//! transitions, which keep two invariants:
//!
//! * `status == Completed` ⇔ `converted_html.is_some()`
//! * `status == Error` ⇒ `error_message.is_some()` (and only then)

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Characters of source shown by [`Document::source_preview`].
pub const PREVIEW_CHARS: usize = 500;

/// Opaque, stable document identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a document is in its conversion lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingStatus {
    /// Added, never attempted.
    #[default]
    Idle,
    /// Queued. Reserved: no current flow produces it, but it counts as pending.
    Pending,
    /// Conversion request in flight.
    Processing,
    /// Converted; HTML available.
    Completed,
    /// Last attempt failed; retried by the next `process_pending`.
    Error,
}

impl ProcessingStatus {
    /// True for states picked up by `process_pending`.
    pub fn is_pending(self) -> bool {
        matches!(
            self,
            ProcessingStatus::Idle | ProcessingStatus::Pending | ProcessingStatus::Error
        )
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessingStatus::Idle => "IDLE",
            ProcessingStatus::Pending => "PENDING",
            ProcessingStatus::Processing => "PROCESSING",
            ProcessingStatus::Completed => "COMPLETED",
            ProcessingStatus::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// Input for creating a document: a display name and its Markdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    pub name: String,
    pub content: String,
}

impl NewDocument {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// One Markdown-to-HTML conversion unit.
///
/// Deserialisation goes through `DocumentRecord` and rejects records that
/// break the status invariants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "DocumentRecord")]
pub struct Document {
    id: DocumentId,
    name: String,
    original_content: String,
    converted_html: Option<String>,
    status: ProcessingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
}

/// Wire shape of a [`Document`], checked before it becomes one.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentRecord {
    id: DocumentId,
    name: String,
    original_content: String,
    converted_html: Option<String>,
    status: ProcessingStatus,
    #[serde(default)]
    error_message: Option<String>,
}

impl TryFrom<DocumentRecord> for Document {
    type Error = String;

    fn try_from(r: DocumentRecord) -> Result<Self, Self::Error> {
        if (r.status == ProcessingStatus::Completed) != r.converted_html.is_some() {
            return Err(format!(
                "document '{}': convertedHtml must be present exactly when status is COMPLETED",
                r.name
            ));
        }
        if (r.status == ProcessingStatus::Error) != r.error_message.is_some() {
            return Err(format!(
                "document '{}': errorMessage must be present exactly when status is ERROR",
                r.name
            ));
        }
        Ok(Self {
            id: r.id,
            name: r.name,
            original_content: r.original_content,
            converted_html: r.converted_html,
            status: r.status,
            error_message: r.error_message,
        })
    }
}

impl Document {
    /// A fresh IDLE document with a new id.
    pub fn new(name: impl Into<String>, original_content: impl Into<String>) -> Self {
        Self {
            id: DocumentId::new(),
            name: name.into(),
            original_content: original_content.into(),
            converted_html: None,
            status: ProcessingStatus::Idle,
            error_message: None,
        }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn original_content(&self) -> &str {
        &self.original_content
    }

    pub fn converted_html(&self) -> Option<&str> {
        self.converted_html.as_deref()
    }

    pub fn status(&self) -> ProcessingStatus {
        self.status
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// First [`PREVIEW_CHARS`] characters of the source, with `...` when cut.
    pub fn source_preview(&self) -> String {
        let mut chars = self.original_content.chars();
        let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
        if chars.next().is_some() {
            format!("{head}...")
        } else {
            head
        }
    }

    // ── Transitions ──────────────────────────────────────────────────────

    /// Dispatch: any pending state → PROCESSING. Returns false (and changes
    /// nothing) when the document is not pending.
    pub(crate) fn mark_processing(&mut self) -> bool {
        if !self.status.is_pending() {
            return false;
        }
        self.status = ProcessingStatus::Processing;
        self.error_message = None;
        true
    }

    /// Terminal success.
    pub(crate) fn complete(&mut self, html: String) {
        self.converted_html = Some(html);
        self.error_message = None;
        self.status = ProcessingStatus::Completed;
    }

    /// Terminal failure. Any previous HTML is dropped to keep the
    /// completed-iff-html invariant.
    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.error_message = Some(if message.trim().is_empty() {
            "An unknown error occurred.".to_string()
        } else {
            message
        });
        self.converted_html = None;
        self.status = ProcessingStatus::Error;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invariants(doc: &Document) {
        assert_eq!(
            doc.status() == ProcessingStatus::Completed,
            doc.converted_html().is_some(),
            "completed iff html: {doc:?}"
        );
        assert_eq!(
            doc.status() == ProcessingStatus::Error,
            doc.error_message().is_some(),
            "error iff message: {doc:?}"
        );
    }

    #[test]
    fn new_document_is_idle() {
        let doc = Document::new("a.md", "# A");
        assert_eq!(doc.status(), ProcessingStatus::Idle);
        assert!(doc.converted_html().is_none());
        assert_invariants(&doc);
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(Document::new("a", "").id(), Document::new("a", "").id());
    }

    #[test]
    fn lifecycle_keeps_invariants() {
        let mut doc = Document::new("a.md", "# A");
        assert!(doc.mark_processing());
        assert_invariants(&doc);

        doc.fail("quota exceeded");
        assert_eq!(doc.status(), ProcessingStatus::Error);
        assert_eq!(doc.error_message(), Some("quota exceeded"));
        assert_invariants(&doc);

        assert!(doc.mark_processing(), "ERROR is retryable");
        assert!(doc.error_message().is_none());
        doc.complete("<h1>A</h1>".into());
        assert_invariants(&doc);

        assert!(!doc.mark_processing(), "COMPLETED is not pending");
        assert_eq!(doc.status(), ProcessingStatus::Completed);
    }

    #[test]
    fn empty_failure_message_is_replaced() {
        let mut doc = Document::new("a.md", "");
        doc.mark_processing();
        doc.fail("");
        assert_eq!(doc.error_message(), Some("An unknown error occurred."));
    }

    #[test]
    fn pending_predicate() {
        assert!(ProcessingStatus::Idle.is_pending());
        assert!(ProcessingStatus::Pending.is_pending());
        assert!(ProcessingStatus::Error.is_pending());
        assert!(!ProcessingStatus::Processing.is_pending());
        assert!(!ProcessingStatus::Completed.is_pending());
    }

    #[test]
    fn preview_truncates_long_sources() {
        let long = "x".repeat(PREVIEW_CHARS + 10);
        let doc = Document::new("long.md", long);
        let preview = doc.source_preview();
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), PREVIEW_CHARS + 3);

        let short = Document::new("short.md", "# hi");
        assert_eq!(short.source_preview(), "# hi");
    }

    #[test]
    fn status_serialises_screaming_case() {
        let json = serde_json::to_string(&ProcessingStatus::Completed).unwrap();
        assert_eq!(json, "\"COMPLETED\"");
        let doc = Document::new("a.md", "# A");
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["status"], "IDLE");
        assert!(value["convertedHtml"].is_null());
    }

    #[test]
    fn deserialise_round_trips_valid_documents() {
        let mut doc = Document::new("a.md", "# A");
        doc.mark_processing();
        doc.complete("<h1>A</h1>".into());
        let json = serde_json::to_string(&doc).unwrap();
        let back: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn deserialise_rejects_completed_without_html() {
        let json = format!(
            r#"{{"id":"{}","name":"a.md","originalContent":"x","convertedHtml":null,"status":"COMPLETED"}}"#,
            DocumentId::new()
        );
        let err = serde_json::from_str::<Document>(&json).unwrap_err();
        assert!(err.to_string().contains("convertedHtml"), "got: {err}");
    }

    #[test]
    fn deserialise_rejects_error_without_message() {
        let json = format!(
            r#"{{"id":"{}","name":"a.md","originalContent":"x","convertedHtml":null,"status":"ERROR"}}"#,
            DocumentId::new()
        );
        assert!(serde_json::from_str::<Document>(&json).is_err());
    }
}
