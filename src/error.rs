//! Error types for the edgequake-md2doc library.
//!
//! A single error enum covers every failure the library can report, but the
//! variants fall into two very different classes:
//!
//! * **Fatal for the call**: [`Md2DocError::MissingCredential`],
//!   [`Md2DocError::NoSupportedFiles`], export and clipboard failures. These
//!   are returned as `Err(..)` and the caller decides what to tell the user.
//!
//! * **Contained per document**: [`Md2DocError::UpstreamError`] raised while
//!   converting one document. [`crate::queue::DocumentQueue`] never propagates
//!   it; it records the message on the document (status `ERROR`) and moves on
//!   to the next one, so one bad document never costs the rest of the batch.
//!
//! Nothing here is fatal to the process: after any error the queue is left in
//! a consistent, interactive state.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the edgequake-md2doc library.
#[derive(Debug, Error)]
pub enum Md2DocError {
    // ── Credential errors ────────────────────────────────────────────────
    /// No credential is configured; conversion cannot start.
    #[error("API key is missing.\nSet GEMINI_API_KEY or save one with: md2doc --save-key <KEY>")]
    MissingCredential,

    /// The supplied credential was rejected before being stored.
    #[error("Invalid API key: {0}")]
    InvalidCredential(String),

    /// Reading or writing the persisted credential failed.
    #[error("Credential store '{path}' unusable: {reason}")]
    CredentialStore { path: PathBuf, reason: String },

    // ── Conversion errors ────────────────────────────────────────────────
    /// The remote conversion call failed or the service returned an error.
    #[error("{message}")]
    UpstreamError { message: String },

    // ── Input errors ─────────────────────────────────────────────────────
    /// A file does not carry one of the accepted Markdown extensions.
    #[error("Unsupported file '{path}': only .md, .markdown and .txt are accepted")]
    UnsupportedFile { path: PathBuf },

    /// Every file offered in a drop was unsupported.
    #[error("None of the {count} files are Markdown. Please provide .md, .markdown or .txt files only.")]
    NoSupportedFiles { count: usize },

    /// An input file could not be read.
    #[error("Failed to read '{path}': {source}")]
    FileReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Export errors ────────────────────────────────────────────────────
    /// Export was requested for a document that has no converted HTML.
    #[error("Document '{name}' has not been converted yet")]
    NotCompleted { name: String },

    /// DOCX encoding failed.
    #[error("Failed to generate DOCX for '{name}': {reason}")]
    ExportFailed { name: String, reason: String },

    /// Writing to the system clipboard failed.
    #[error("Failed to copy to clipboard: {0}")]
    ClipboardFailed(String),

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Md2DocError {
    /// Build an [`Md2DocError::UpstreamError`] from anything displayable.
    pub fn upstream(message: impl Into<String>) -> Self {
        Md2DocError::UpstreamError {
            message: message.into(),
        }
    }
}
