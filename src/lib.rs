//! # edgequake-md2doc
//!
//! Convert Markdown documents to word-processor friendly HTML and DOCX using
//! a Large Language Model.
//!
//! ## Why this crate?
//!
//! Markdown pasted into Google Docs or Word loses its tables, keeps stray
//! asterisks, and turns headings bold. Rule-based renderers fix some of that
//! but each target editor has its own quirks. Instead this crate asks a model
//! to rewrite the Markdown as clean HTML under fixed formatting rules, then
//! applies a small deterministic clean-up and packages the result as a DOCX
//! (or places it on the clipboard).
//!
//! ## Pipeline Overview
//!
//! ```text
//! Markdown
//!  │
//!  ├─ 1. Input     filter .md / .markdown / .txt, read as UTF-8
//!  ├─ 2. Queue     documents IDLE → PROCESSING → COMPLETED | ERROR
//!  ├─ 3. Model     one request per document, strictly sequential
//!  ├─ 4. Polish    strip fences and <hr>, force normal-weight headings
//!  └─ 5. Output    DOCX (altChunk package) or clipboard rich text
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_md2doc::{ConversionConfig, Credential, DocumentQueue, NewDocument};
//! use edgequake_md2doc::pipeline::export;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .credential(Credential::new(std::env::var("GEMINI_API_KEY")?))
//!         .build()?;
//!
//!     let mut queue = DocumentQueue::new(&config)?;
//!     queue.add_batch(vec![NewDocument::new("notes.md", "# Notes\n\n|a|b|\n|-|-|\n|1|2|")]);
//!     let summary = queue.process_pending(None).await?;
//!     eprintln!("{} converted, {} failed", summary.completed, summary.failed);
//!
//!     if let Some(doc) = queue.selected() {
//!         let artifact = export::export_document(doc, &config.docx)?;
//!         export::write_artifact(&artifact, std::path::Path::new(".")).await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature     | Default | Description |
//! |-------------|---------|-------------|
//! | `cli`       | on      | Enables the `md2doc` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `clipboard` | on      | System clipboard export via arboard |
//!
//! Disable both when using only the library:
//! ```toml
//! edgequake-md2doc = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod convert;
pub mod credential;
pub mod document;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod queue;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::ConversionClient;
pub use config::{ConversionConfig, ConversionConfigBuilder, DEFAULT_MODEL};
pub use convert::{convert_file, convert_markdown, convert_markdown_sync, create_provider};
pub use credential::{Credential, CredentialStore};
pub use document::{Document, DocumentId, NewDocument, ProcessingStatus};
pub use error::Md2DocError;
pub use pipeline::export::{DocxOptions, ExportArtifact, Margins, Orientation};
pub use pipeline::llm::{CompletionBackend, CompletionRequest, GeminiBackend, ProviderBackend};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use queue::{BatchSummary, DocumentQueue};
