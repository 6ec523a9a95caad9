//! The document queue: owns the batch and mediates every status transition.
//!
//! ## Processing model
//!
//! [`DocumentQueue::process_pending`] works in two explicit phases:
//!
//! 1. **Dispatch**: every selected pending document (IDLE, PENDING or ERROR)
//!    is marked PROCESSING up front, so readers see the whole batch as in
//!    flight before the first request leaves.
//! 2. **Settle**: documents are converted strictly one after another. Each
//!    outcome is applied by `settle`, the per-item
//!    continuation: success → COMPLETED with HTML, failure → ERROR with the
//!    message. The loop never stops early.
//!
//! Total time is the sum of the individual calls. `process_pending` takes
//! `&mut self`, so a second invocation cannot overlap a running one.

use crate::client::ConversionClient;
use crate::config::ConversionConfig;
use crate::credential::Credential;
use crate::document::{Document, DocumentId, NewDocument, ProcessingStatus};
use crate::error::Md2DocError;
use crate::progress::ProgressCallback;
use chrono::Local;
use serde::Serialize;
use tracing::{info, warn};

/// Outcome counts of one `process_pending` run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub attempted: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Ordered collection of documents plus the current selection.
pub struct DocumentQueue {
    documents: Vec<Document>,
    selected: Option<DocumentId>,
    client: ConversionClient,
    credential: Option<Credential>,
    progress: Option<ProgressCallback>,
}

impl DocumentQueue {
    /// Build a queue whose client, credential and callbacks come from `config`.
    pub fn new(config: &ConversionConfig) -> Result<Self, Md2DocError> {
        Ok(Self::with_client(ConversionClient::from_config(config)?, config))
    }

    /// Build a queue around an existing client.
    pub fn with_client(client: ConversionClient, config: &ConversionConfig) -> Self {
        Self {
            documents: Vec::new(),
            selected: None,
            client,
            credential: config.credential.clone(),
            progress: config.progress_callback.clone(),
        }
    }

    // ── Credential ───────────────────────────────────────────────────────

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Replace the in-memory credential after the user updated it.
    /// Persisting it is the caller's job ([`crate::credential::CredentialStore`]).
    pub fn set_credential(&mut self, credential: Option<Credential>) {
        self.credential = credential;
    }

    // ── Batch management ─────────────────────────────────────────────────

    /// Replace the collection with one IDLE document per item and select the
    /// first one. Confirming the replacement is the caller's concern.
    pub fn add_batch(&mut self, items: Vec<NewDocument>) -> Vec<DocumentId> {
        self.documents = items
            .into_iter()
            .map(|item| Document::new(item.name, item.content))
            .collect();
        self.selected = self.documents.first().map(Document::id);
        info!("Queued {} documents", self.documents.len());
        self.documents.iter().map(Document::id).collect()
    }

    /// Replace the collection with a single document and convert it right away.
    ///
    /// The document is added even when conversion cannot start; in that case
    /// it stays IDLE and the error (e.g. `MissingCredential`) is returned.
    pub async fn add_single(
        &mut self,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<DocumentId, Md2DocError> {
        let ids = self.add_batch(vec![NewDocument::new(name, content)]);
        let id = ids[0];
        self.process_pending(Some(&[id])).await?;
        Ok(id)
    }

    /// Convenience for the paste flow: `add_single` with a timestamped name.
    pub async fn add_pasted(&mut self, content: impl Into<String>) -> Result<DocumentId, Md2DocError> {
        self.add_single(pasted_name(), content).await
    }

    pub fn clear(&mut self) {
        self.documents.clear();
        self.selected = None;
    }

    /// Select `id` if it is in the queue. Returns whether the selection changed.
    pub fn select(&mut self, id: DocumentId) -> bool {
        if self.index_of(id).is_some() {
            self.selected = Some(id);
            true
        } else {
            false
        }
    }

    // ── Read side ────────────────────────────────────────────────────────

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn get(&self, id: DocumentId) -> Option<&Document> {
        self.documents.iter().find(|d| d.id() == id)
    }

    pub fn selected_id(&self) -> Option<DocumentId> {
        self.selected
    }

    pub fn selected(&self) -> Option<&Document> {
        self.selected.and_then(|id| self.get(id))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.documents
            .iter()
            .filter(|d| d.status().is_pending())
            .count()
    }

    // ── Processing ───────────────────────────────────────────────────────

    /// Convert every pending document, optionally restricted to `target`.
    ///
    /// # Errors
    /// Only [`Md2DocError::MissingCredential`], raised before any status
    /// changes and only when the backend needs a credential. Per-document
    /// failures are recorded on the documents.
    pub async fn process_pending(
        &mut self,
        target: Option<&[DocumentId]>,
    ) -> Result<BatchSummary, Md2DocError> {
        let credential = match self.credential.as_ref() {
            Some(c) if !c.is_empty() => c.clone(),
            _ if !self.client.requires_credential() => Credential::new(""),
            _ => return Err(Md2DocError::MissingCredential),
        };

        // Dispatch.
        let batch: Vec<usize> = self
            .documents
            .iter_mut()
            .enumerate()
            .filter(|(_, d)| target.is_none_or(|ids| ids.contains(&d.id())))
            .filter_map(|(i, d)| d.mark_processing().then_some(i))
            .collect();

        let total = batch.len();
        if total == 0 {
            return Ok(BatchSummary::default());
        }
        info!("Converting {} pending documents with {}", total, self.client.model());
        if let Some(ref cb) = self.progress {
            cb.on_batch_start(total);
        }

        // Settle, one at a time.
        let mut summary = BatchSummary {
            attempted: total,
            ..Default::default()
        };
        for (n, &idx) in batch.iter().enumerate() {
            let index = n + 1;
            let name = self.documents[idx].name().to_string();
            if let Some(ref cb) = self.progress {
                cb.on_document_start(index, total, &name);
            }

            let outcome = self
                .client
                .convert(self.documents[idx].original_content(), &credential)
                .await;

            match self.settle(idx, outcome) {
                Ok(html_len) => {
                    summary.completed += 1;
                    if let Some(ref cb) = self.progress {
                        cb.on_document_complete(index, total, &name, html_len);
                    }
                }
                Err(message) => {
                    summary.failed += 1;
                    if let Some(ref cb) = self.progress {
                        cb.on_document_error(index, total, &name, &message);
                    }
                }
            }
        }

        info!(
            "Batch complete: {}/{} converted, {} failed",
            summary.completed, summary.attempted, summary.failed
        );
        if let Some(ref cb) = self.progress {
            cb.on_batch_complete(total, summary.completed);
        }
        Ok(summary)
    }

    /// Apply one conversion outcome to the document at `idx`.
    ///
    /// Returns the HTML length on success, the recorded message on failure.
    fn settle(&mut self, idx: usize, outcome: Result<String, Md2DocError>) -> Result<usize, String> {
        let doc = &mut self.documents[idx];
        match outcome {
            Ok(html) => {
                let len = html.len();
                doc.complete(html);
                Ok(len)
            }
            Err(e) => {
                let message = e.to_string();
                warn!("'{}' failed: {}", doc.name(), message);
                doc.fail(message.clone());
                Err(doc.error_message().unwrap_or(&message).to_string())
            }
        }
    }

    fn index_of(&self, id: DocumentId) -> Option<usize> {
        self.documents.iter().position(|d| d.id() == id)
    }

    /// Count of documents currently in `status`.
    pub fn count_with(&self, status: ProcessingStatus) -> usize {
        self.documents.iter().filter(|d| d.status() == status).count()
    }
}

/// Display name for pasted text, e.g. `Pasted Content 14:03:27`.
pub fn pasted_name() -> String {
    format!("Pasted Content {}", Local::now().format("%H:%M:%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::llm::{CompletionBackend, CompletionRequest};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Echo;

    #[async_trait]
    impl CompletionBackend for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn complete(
            &self,
            request: CompletionRequest<'_>,
        ) -> Result<Option<String>, Md2DocError> {
            let md = request.prompt.rsplit("Input Markdown:\n").next().unwrap_or("");
            if md.contains("FAIL") {
                Err(Md2DocError::upstream("model refused"))
            } else {
                Ok(Some(format!("<p>{md}</p>")))
            }
        }
    }

    fn queue(with_key: bool) -> DocumentQueue {
        let mut builder = ConversionConfig::builder().backend(Arc::new(Echo));
        if with_key {
            builder = builder.credential(Credential::new("AIzaSy-test-key-000000000000"));
        }
        DocumentQueue::new(&builder.build().unwrap()).unwrap()
    }

    #[test]
    fn add_batch_replaces_and_selects_first() {
        let mut q = queue(true);
        q.add_batch(vec![NewDocument::new("old.md", "x")]);
        let ids = q.add_batch(vec![
            NewDocument::new("a.md", "# A"),
            NewDocument::new("b.md", "# B"),
        ]);
        assert_eq!(q.len(), 2);
        assert_eq!(q.selected_id(), Some(ids[0]));
        assert!(q.documents().iter().all(|d| d.status() == ProcessingStatus::Idle));
    }

    #[test]
    fn empty_batch_clears_selection() {
        let mut q = queue(true);
        q.add_batch(vec![NewDocument::new("a.md", "# A")]);
        q.add_batch(Vec::new());
        assert!(q.is_empty());
        assert!(q.selected_id().is_none());
    }

    #[test]
    fn select_unknown_is_noop() {
        let mut q = queue(true);
        let ids = q.add_batch(vec![
            NewDocument::new("a.md", "# A"),
            NewDocument::new("b.md", "# B"),
        ]);
        assert!(q.select(ids[1]));
        assert!(!q.select(DocumentId::new()));
        assert_eq!(q.selected_id(), Some(ids[1]));
    }

    #[test]
    fn clear_empties_everything() {
        let mut q = queue(true);
        q.add_batch(vec![NewDocument::new("a.md", "# A")]);
        q.clear();
        assert!(q.is_empty());
        assert!(q.selected().is_none());
    }

    #[tokio::test]
    async fn missing_credential_leaves_documents_idle() {
        let mut q = queue(false);
        q.add_batch(vec![NewDocument::new("a.md", "# A")]);
        let err = q.process_pending(None).await.unwrap_err();
        assert!(matches!(err, Md2DocError::MissingCredential));
        assert_eq!(q.count_with(ProcessingStatus::Idle), 1);
    }

    #[tokio::test]
    async fn target_restricts_the_batch() {
        let mut q = queue(true);
        let ids = q.add_batch(vec![
            NewDocument::new("a.md", "# A"),
            NewDocument::new("b.md", "# B"),
        ]);
        let summary = q.process_pending(Some(&ids[1..])).await.unwrap();
        assert_eq!(summary.attempted, 1);
        assert_eq!(q.get(ids[0]).unwrap().status(), ProcessingStatus::Idle);
        assert_eq!(q.get(ids[1]).unwrap().status(), ProcessingStatus::Completed);
    }

    #[tokio::test]
    async fn errors_are_retried_on_next_run() {
        let mut q = queue(true);
        let ids = q.add_batch(vec![NewDocument::new("a.md", "FAIL")]);
        let first = q.process_pending(None).await.unwrap();
        assert_eq!(first.failed, 1);
        assert_eq!(q.get(ids[0]).unwrap().error_message(), Some("model refused"));

        let second = q.process_pending(None).await.unwrap();
        assert_eq!(second.attempted, 1, "ERROR counts as pending");
        assert_eq!(q.pending_count(), 1);
    }

    #[tokio::test]
    async fn completed_documents_are_not_reconverted() {
        let mut q = queue(true);
        q.add_batch(vec![NewDocument::new("a.md", "# A")]);
        q.process_pending(None).await.unwrap();
        let again = q.process_pending(None).await.unwrap();
        assert_eq!(again, BatchSummary::default());
    }

    #[test]
    fn pasted_name_has_prefix() {
        assert!(pasted_name().starts_with("Pasted Content "));
    }
}
