//! Instruction prompt for Markdown-to-HTML conversion.
//!
//! The rules are fixed: the post-processor in
//! [`crate::pipeline::postprocess`] and the export shell in
//! [`crate::pipeline::export`] assume output shaped by exactly these rules.

/// Fixed instruction block. The Markdown is appended after it verbatim.
pub const CONVERSION_INSTRUCTIONS: &str = r#"You are an expert document formatter.
Convert the following Markdown text into semantic HTML that is optimized for copying and pasting directly into Google Docs.

Rules:
1. **Tables**: This is the most important part. You MUST format tables using standard HTML <table> tags.
   - Add `border="1"` attribute to the table tag.
   - Add inline styles to the table: `style="border-collapse: collapse; width: 100%; border: 1px solid #000;"`
   - Add inline styles to every <th> and <td>: `style="border: 1px solid #000; padding: 8px;"`
   - This ensures grid lines appear clearly when pasted.
2. **Clean Formatting**: Remove all Markdown artifacts (asterisks, hashes, backticks).
3. **Typography**:
   - Use proper headings (<h1>, <h2>).
   - **IMPORTANT**: Do NOT use bold for headings. Headings should be standard weight.
   - Do NOT use <hr> tags or horizontal lines.
4. **Lists**: Use <ul> and <ol> with <li>.
5. **Output**: Return ONLY the raw HTML string inside the response. No ```html blocks.

Input Markdown:
"#;

/// Build the full prompt for one conversion call.
pub fn build_conversion_prompt(markdown: &str) -> String {
    let mut prompt = String::with_capacity(CONVERSION_INSTRUCTIONS.len() + markdown.len());
    prompt.push_str(CONVERSION_INSTRUCTIONS);
    prompt.push_str(markdown);
    prompt
}
