//! Input intake: pick the Markdown files out of a drop and read them.
//!
//! Acceptance is by name only. A file ending in `.md`, `.markdown` or `.txt`
//! is read as UTF-8; nothing sniffs the content. Unsupported files in a mixed
//! drop are skipped with a debug log; a drop with no supported file at all is
//! an error so the caller can tell the user.

use crate::document::NewDocument;
use crate::error::Md2DocError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File-name suffixes accepted as Markdown input.
pub const ACCEPTED_EXTENSIONS: [&str; 3] = [".md", ".txt", ".markdown"];

/// True when `path`'s file name ends with an accepted suffix. Case matters.
pub fn is_supported(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    ACCEPTED_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

/// Keep the supported paths, in their original order.
pub fn filter_supported<P: AsRef<Path>>(paths: &[P]) -> Vec<PathBuf> {
    paths
        .iter()
        .map(AsRef::as_ref)
        .filter(|p| {
            let ok = is_supported(p);
            if !ok {
                debug!("Skipping unsupported file {}", p.display());
            }
            ok
        })
        .map(Path::to_path_buf)
        .collect()
}

/// Like [`filter_supported`], but a non-empty drop with nothing usable is an error.
pub fn require_supported<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<PathBuf>, Md2DocError> {
    let kept = filter_supported(paths);
    if kept.is_empty() && !paths.is_empty() {
        return Err(Md2DocError::NoSupportedFiles { count: paths.len() });
    }
    Ok(kept)
}

/// Read one file into a [`NewDocument`] named after its file name.
pub async fn read_document(path: &Path) -> Result<NewDocument, Md2DocError> {
    if !is_supported(path) {
        return Err(Md2DocError::UnsupportedFile {
            path: path.to_path_buf(),
        });
    }
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Md2DocError::FileReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    debug!("Read {} ({} bytes)", name, content.len());
    Ok(NewDocument::new(name, content))
}

/// Read every supported file of a drop, preserving order.
///
/// The whole drop fails if any supported file cannot be read, so a batch is
/// never silently shorter than what the user picked.
pub async fn read_batch<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<NewDocument>, Md2DocError> {
    let mut docs = Vec::new();
    for path in require_supported(paths)? {
        docs.push(read_document(&path).await?);
    }
    Ok(docs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_markdown_suffixes() {
        assert!(is_supported(Path::new("a.md")));
        assert!(is_supported(Path::new("dir/b.markdown")));
        assert!(is_supported(Path::new("c.txt")));
        assert!(!is_supported(Path::new("D.MD")));
        assert!(!is_supported(Path::new("e.pdf")));
        assert!(!is_supported(Path::new("md")));
    }

    #[test]
    fn filter_keeps_order() {
        let kept = filter_supported(&["b.md", "x.png", "a.txt"]);
        assert_eq!(kept, vec![PathBuf::from("b.md"), PathBuf::from("a.txt")]);
    }

    #[test]
    fn all_unsupported_is_an_error() {
        let err = require_supported(&["x.png", "y.pdf"]).unwrap_err();
        assert!(matches!(err, Md2DocError::NoSupportedFiles { count: 2 }));
        let empty: [&str; 0] = [];
        assert!(require_supported(&empty).unwrap().is_empty());
    }

    #[tokio::test]
    async fn read_batch_names_by_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.md");
        let skip = dir.path().join("img.png");
        std::fs::write(&a, "# A").unwrap();
        std::fs::write(&skip, [0u8, 1, 2]).unwrap();

        let docs = read_batch(&[&a, &skip]).await.unwrap();
        assert_eq!(docs, vec![NewDocument::new("a.md", "# A")]);
    }

    #[tokio::test]
    async fn missing_file_reports_path() {
        let err = read_batch(&["/nonexistent/dir/gone.md"]).await.unwrap_err();
        assert!(matches!(err, Md2DocError::FileReadFailed { .. }));
    }
}
