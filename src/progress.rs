//! Progress-callback trait for per-document conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events while [`crate::queue::DocumentQueue::process_pending`] works through
//! the pending documents.
//!
//! Documents are converted strictly one at a time, so events for a batch
//! arrive in order: `on_batch_start`, then for each document `on_document_start`
//! followed by exactly one of `on_document_complete` / `on_document_error`,
//! then `on_batch_complete`.
//!
//! # Example
//!
//! ```rust
//! use edgequake_md2doc::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: Arc<AtomicUsize>,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_document_complete(&self, index: usize, total: usize, name: &str, html_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{}/{} {} ({} bytes)", index, total, name, html_len);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     completed: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the queue as it processes each document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. `index` is 1-based within the batch.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once, after documents were marked PROCESSING.
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called just before the conversion request for a document is sent.
    fn on_document_start(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Called when a document reached COMPLETED.
    fn on_document_complete(&self, index: usize, total: usize, name: &str, html_len: usize) {
        let _ = (index, total, name, html_len);
    }

    /// Called when a document reached ERROR.
    fn on_document_error(&self, index: usize, total: usize, name: &str, error: &str) {
        let _ = (index, total, name, error);
    }

    /// Called once after every document in the batch was attempted.
    fn on_batch_complete(&self, total: usize, success_count: usize) {
        let _ = (total, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
