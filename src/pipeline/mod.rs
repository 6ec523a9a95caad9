//! Pipeline stages for Markdown-to-DOCX conversion.
//!
//! Each submodule implements exactly one step, so each is testable on its own
//! and the backend can change without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ llm ──▶ postprocess ──▶ export / clipboard
//! (files)   (model)  (cleanup)       (DOCX)   (rich text)
//! ```
//!
//! 1. [`input`]      : filter a drop to Markdown files and read them
//! 2. [`llm`]        : one model call per document; the only network stage
//! 3. [`postprocess`]: strip fences and rules, force normal-weight headings
//! 4. [`export`]     : wrap in an Office HTML shell and package as DOCX
//! 5. [`clipboard`]  : place converted HTML on the system clipboard

#[cfg(feature = "clipboard")]
pub mod clipboard;
pub mod export;
pub mod input;
pub mod llm;
pub mod postprocess;
