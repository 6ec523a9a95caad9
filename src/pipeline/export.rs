//! DOCX export: wrap converted HTML in a Word-friendly shell and package it.
//!
//! The package uses the *altChunk* technique: instead of translating HTML into
//! WordprocessingML runs, the HTML travels inside the package as an MHT part
//! and `word/document.xml` merely points at it. Word imports the chunk on open,
//! so tables, lists and inline styles survive as the model wrote them.
//!
//! ```text
//! [Content_Types].xml
//! _rels/.rels
//! word/document.xml              <w:altChunk r:id="htmlChunk"/> + page setup
//! word/_rels/document.xml.rels   htmlChunk → /word/afchunk.mht
//! word/afchunk.mht               MIME multipart, quoted-printable HTML
//! ```

use crate::document::{Document, ProcessingStatus};
use crate::error::Md2DocError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

// ── Page setup ───────────────────────────────────────────────────────────────

/// Page orientation of the exported document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Page margins in twentieths of a point (1440 = one inch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Margins {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
    pub header: u32,
    pub footer: u32,
    pub gutter: u32,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            top: 1440,
            right: 1440,
            bottom: 1440,
            left: 1440,
            header: 720,
            footer: 720,
            gutter: 0,
        }
    }
}

/// Page options for [`encode_docx`]. Default: US Letter, portrait, 1" margins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DocxOptions {
    pub orientation: Orientation,
    pub margins: Margins,
}

impl DocxOptions {
    pub fn landscape() -> Self {
        Self {
            orientation: Orientation::Landscape,
            ..Self::default()
        }
    }
}

/// US Letter, short and long edge in twips.
const LETTER_SHORT: u32 = 12240;
const LETTER_LONG: u32 = 15840;

// ── HTML shell ───────────────────────────────────────────────────────────────

/// Styles that keep Word's import close to what the converter produced:
/// collapsed black table borders, normal-weight headings, and no rules.
const EXPORT_STYLES: &str = "\
body { font-family: Arial, sans-serif; line-height: 1.5; }
table { border-collapse: collapse; width: 100%; mso-table-lspace: 0pt; mso-table-rspace: 0pt; }
th, td { border: 1px solid black !important; padding: 8px; }
h1, h2, h3, h4, h5, h6 { font-weight: normal !important; mso-ansi-font-weight: normal !important; }
h1 b, h2 b, h3 b, h4 b, h5 b, h6 b, h1 strong, h2 strong, h3 strong, h4 strong, h5 strong, h6 strong { font-weight: normal !important; }
hr { display: none !important; height: 0 !important; border: 0 !important; visibility: hidden !important; }";

/// Wrap an HTML fragment in the Office-flavoured document shell.
pub fn wrap_html(title: &str, fragment: &str) -> String {
    format!(
        "<html xmlns:o=\"urn:schemas-microsoft-com:office:office\" \
xmlns:w=\"urn:schemas-microsoft-com:office:word\" \
xmlns=\"http://www.w3.org/TR/REC-html40\">\n\
<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>\n{}\n</style>\n</head>\n\
<body>\n{}\n</body>\n</html>",
        escape_html(title),
        EXPORT_STYLES,
        fragment
    )
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

// ── Package parts ────────────────────────────────────────────────────────────

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/afchunk.mht" ContentType="message/rfc822"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="R09c83fafc067488e" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="/word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/aFChunk" Target="/word/afchunk.mht" Id="htmlChunk"/></Relationships>"#;

const MHT_BOUNDARY: &str = "----=mhtDocumentPart";

fn document_xml(options: &DocxOptions) -> String {
    let (w, h, orient) = match options.orientation {
        Orientation::Portrait => (LETTER_SHORT, LETTER_LONG, "portrait"),
        Orientation::Landscape => (LETTER_LONG, LETTER_SHORT, "landscape"),
    };
    let m = &options.margins;
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><w:body><w:altChunk r:id="htmlChunk"/><w:sectPr><w:pgSz w:w="{w}" w:h="{h}" w:orient="{orient}"/><w:pgMar w:top="{}" w:right="{}" w:bottom="{}" w:left="{}" w:header="{}" w:footer="{}" w:gutter="{}"/></w:sectPr></w:body></w:document>"#,
        m.top, m.right, m.bottom, m.left, m.header, m.footer, m.gutter
    )
}

fn mht_document(html: &str) -> String {
    format!(
        "MIME-Version: 1.0\r\n\
Content-Type: multipart/related;\r\n    type=\"text/html\";\r\n    boundary=\"{b}\"\r\n\r\n\
--{b}\r\n\
Content-Type: text/html; charset=\"utf-8\"\r\n\
Content-Transfer-Encoding: quoted-printable\r\n\
Content-Location: file:///C:/fake/document.html\r\n\r\n\
{body}\r\n\r\n\
--{b}--\r\n",
        b = MHT_BOUNDARY,
        body = quoted_printable(html)
    )
}

/// Quoted-printable (RFC 2045) with CRLF line breaks and soft breaks at 76.
fn quoted_printable(input: &str) -> String {
    const MAX_LINE: usize = 76;
    let mut out = String::with_capacity(input.len() + input.len() / 8);

    for (n, line) in input.split('\n').enumerate() {
        if n > 0 {
            out.push_str("\r\n");
        }
        let line = line.strip_suffix('\r').unwrap_or(line);
        let bytes = line.as_bytes();
        let mut width = 0;

        for (i, &b) in bytes.iter().enumerate() {
            let last = i + 1 == bytes.len();
            let literal = match b {
                b'=' => false,
                b' ' | b'\t' => !last,
                33..=126 => true,
                _ => false,
            };
            let token_len = if literal { 1 } else { 3 };
            // Leave room for the trailing '=' of a soft break.
            if width + token_len > MAX_LINE - 1 {
                out.push_str("=\r\n");
                width = 0;
            }
            if literal {
                out.push(b as char);
            } else {
                out.push_str(&format!("={b:02X}"));
            }
            width += token_len;
        }
    }
    out
}

/// Package a wrapped HTML document as DOCX bytes.
pub fn encode_docx(wrapped_html: &str, options: &DocxOptions) -> Result<Vec<u8>, zip::result::ZipError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let opts = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let parts: [(&str, String); 5] = [
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", PACKAGE_RELS.to_string()),
        ("word/document.xml", document_xml(options)),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS.to_string()),
        ("word/afchunk.mht", mht_document(wrapped_html)),
    ];
    for (name, body) in parts {
        zip.start_file(name, opts)?;
        zip.write_all(body.as_bytes())?;
    }

    Ok(zip.finish()?.into_inner())
}

// ── Document export ──────────────────────────────────────────────────────────

static EXTENSION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.[^/.]+$").unwrap());

/// `notes.md` → `notes.docx`. Only the last extension is replaced.
///
/// The result is a single path component that every mainstream filesystem
/// accepts: `:` becomes `-` (pasted names carry a clock time), path separators
/// and the other reserved characters become `_`.
pub fn docx_file_name(name: &str) -> String {
    let stem: String = EXTENSION_RE
        .replace(name, "")
        .chars()
        .map(|c| match c {
            ':' => '-',
            '<' | '>' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    format!("{stem}.docx")
}

/// Return `name`, or `stem (n).ext` for the lowest `n` not yet in `taken`,
/// and record the choice. Keeps one run from writing two documents that map
/// to the same output name over each other.
pub fn unique_file_name(name: &str, taken: &mut HashSet<String>) -> String {
    if taken.insert(name.to_string()) {
        return name.to_string();
    }
    let (stem, ext) = match name.rfind('.') {
        Some(i) if i > 0 => name.split_at(i),
        _ => (name, ""),
    };
    let mut n = 1;
    loop {
        let candidate = format!("{stem} ({n}){ext}");
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// A generated DOCX ready to be written somewhere.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Export a COMPLETED document.
///
/// # Errors
/// [`Md2DocError::NotCompleted`] when the document has no HTML yet,
/// [`Md2DocError::ExportFailed`] when packaging fails.
pub fn export_document(doc: &Document, options: &DocxOptions) -> Result<ExportArtifact, Md2DocError> {
    let html = match (doc.status(), doc.converted_html()) {
        (ProcessingStatus::Completed, Some(html)) => html,
        _ => {
            return Err(Md2DocError::NotCompleted {
                name: doc.name().to_string(),
            })
        }
    };

    let wrapped = wrap_html(doc.name(), html);
    let bytes = encode_docx(&wrapped, options).map_err(|e| Md2DocError::ExportFailed {
        name: doc.name().to_string(),
        reason: e.to_string(),
    })?;

    debug!("Packaged '{}' as {} DOCX bytes", doc.name(), bytes.len());
    Ok(ExportArtifact {
        file_name: docx_file_name(doc.name()),
        bytes,
    })
}

/// Write `artifact` into `dir`, creating it if needed. Returns the final path.
///
/// Uses atomic write (temp file + rename) so a crash never leaves a partial DOCX.
pub async fn write_artifact(artifact: &ExportArtifact, dir: &Path) -> Result<PathBuf, Md2DocError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| Md2DocError::OutputWriteFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;

    let path = dir.join(&artifact.file_name);
    let tmp_path = dir.join(format!("{}.tmp", artifact.file_name));
    tokio::fs::write(&tmp_path, &artifact.bytes)
        .await
        .map_err(|e| Md2DocError::OutputWriteFailed {
            path: tmp_path.clone(),
            source: e,
        })?;
    tokio::fs::rename(&tmp_path, &path)
        .await
        .map_err(|e| Md2DocError::OutputWriteFailed {
            path: path.clone(),
            source: e,
        })?;

    info!("Wrote {}", path.display());
    Ok(path)
}
