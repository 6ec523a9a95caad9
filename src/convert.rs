//! One-shot conversion entry points.
//!
//! These wrap a single-document [`DocumentQueue`] for callers that have one
//! Markdown string or one file and want HTML or a DOCX back, without managing
//! queue state themselves. Batches, retries and selection belong to
//! [`crate::queue::DocumentQueue`].

use crate::config::ConversionConfig;
use crate::document::{DocumentId, NewDocument, ProcessingStatus};
use crate::error::Md2DocError;
use crate::pipeline::{export, input};
use crate::queue::DocumentQueue;
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Convert a Markdown string to cleaned HTML.
///
/// # Errors
/// [`Md2DocError::MissingCredential`] when `config` carries no credential,
/// [`Md2DocError::UpstreamError`] when the conversion call fails.
pub async fn convert_markdown(
    markdown: impl Into<String>,
    config: &ConversionConfig,
) -> Result<String, Md2DocError> {
    let mut queue = DocumentQueue::new(config)?;
    let id = queue.add_single("document.md", markdown).await?;
    finished_html(&queue, id)
}

/// Convert one Markdown file and write `<stem>.docx` into `out_dir`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn convert_file(
    input_path: impl AsRef<Path>,
    out_dir: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<PathBuf, Md2DocError> {
    let start = Instant::now();
    let NewDocument { name, content } = input::read_document(input_path.as_ref()).await?;

    let mut queue = DocumentQueue::new(config)?;
    let id = queue.add_single(name, content).await?;
    finished_html(&queue, id)?;

    let doc = queue
        .get(id)
        .ok_or_else(|| Md2DocError::Internal("document vanished from queue".into()))?;
    let artifact = export::export_document(doc, &config.docx)?;
    let path = export::write_artifact(&artifact, out_dir.as_ref()).await?;

    info!("Converted {} in {:?}", doc.name(), start.elapsed());
    Ok(path)
}

/// Synchronous wrapper around [`convert_markdown`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_markdown_sync(
    markdown: impl Into<String>,
    config: &ConversionConfig,
) -> Result<String, Md2DocError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Md2DocError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert_markdown(markdown, config))
}

/// Instantiate a named edgequake-llm provider (`openai`, `anthropic`,
/// `ollama`, …) for use as [`ConversionConfig::provider`].
pub fn create_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, Md2DocError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        Md2DocError::InvalidConfig(format!("provider '{provider_name}' not usable: {e}"))
    })
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn finished_html(queue: &DocumentQueue, id: DocumentId) -> Result<String, Md2DocError> {
    let doc = queue
        .get(id)
        .ok_or_else(|| Md2DocError::Internal("document vanished from queue".into()))?;
    match (doc.status(), doc.converted_html()) {
        (ProcessingStatus::Completed, Some(html)) => Ok(html.to_string()),
        _ => Err(Md2DocError::upstream(
            doc.error_message().unwrap_or("An unknown error occurred."),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::Credential;
    use crate::pipeline::llm::{CompletionBackend, CompletionRequest};
    use async_trait::async_trait;

    struct Fixed(&'static str);

    #[async_trait]
    impl CompletionBackend for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn complete(
            &self,
            _request: CompletionRequest<'_>,
        ) -> Result<Option<String>, Md2DocError> {
            if self.0.is_empty() {
                Err(Md2DocError::upstream("quota exceeded"))
            } else {
                Ok(Some(self.0.to_string()))
            }
        }
    }

    fn config(reply: &'static str) -> ConversionConfig {
        ConversionConfig::builder()
            .backend(Arc::new(Fixed(reply)))
            .credential(Credential::new("AIzaSy-test-key-000000000000"))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn markdown_to_html() {
        let html = convert_markdown("# A", &config("<h1>A</h1>")).await.unwrap();
        assert_eq!(html, "<h1 style=\"font-weight: normal;\">A</h1>");
    }

    #[tokio::test]
    async fn failure_surfaces_message() {
        let err = convert_markdown("# A", &config("")).await.unwrap_err();
        assert_eq!(err.to_string(), "quota exceeded");
    }

    #[tokio::test]
    async fn file_to_docx() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("notes.md");
        std::fs::write(&src, "# N").unwrap();

        let out = convert_file(&src, dir.path().join("out"), &config("<p>N</p>"))
            .await
            .unwrap();
        assert_eq!(out.file_name().unwrap(), "notes.docx");
        assert!(std::fs::read(&out).unwrap().starts_with(b"PK"));
    }
}
