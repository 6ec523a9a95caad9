//! System clipboard output.
//!
//! Converted HTML is placed on the clipboard as rich text with the same markup
//! as the plain-text alternative, so pasting into a word processor keeps the
//! formatting and pasting into a plain editor still yields the HTML source.

use crate::document::Document;
use crate::error::Md2DocError;
use tracing::info;

/// Put `html` on the clipboard as both `text/html` and `text/plain`.
pub fn copy_html(html: &str) -> Result<(), Md2DocError> {
    let mut clipboard =
        arboard::Clipboard::new().map_err(|e| Md2DocError::ClipboardFailed(e.to_string()))?;
    clipboard
        .set_html(html, Some(html))
        .map_err(|e| Md2DocError::ClipboardFailed(e.to_string()))?;
    info!("Copied {} bytes of HTML to the clipboard", html.len());
    Ok(())
}

/// Copy a converted document. Fails with `NotCompleted` when there is no HTML.
pub fn copy_document(doc: &Document) -> Result<(), Md2DocError> {
    let html = doc.converted_html().ok_or_else(|| Md2DocError::NotCompleted {
        name: doc.name().to_string(),
    })?;
    copy_html(html)
}
