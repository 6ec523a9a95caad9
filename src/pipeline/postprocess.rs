//! Post-processing: deterministic cleanup of model-generated HTML.
//!
//! ## Why is post-processing necessary?
//!
//! Even a well-prompted model occasionally ignores parts of its instructions:
//!
//! - Wrapping output in ` ```html ... ``` ` fences despite the prompt saying
//!   "no ```html blocks"
//! - Emitting `<hr>` separators, which Google Docs and Word render as heavy
//!   horizontal lines
//! - Leaving headings at the browser default bold weight
//!
//! These three passes fix that without touching content. They are cheap,
//! pure `&str → String` functions, so each is tested on its own.
//!
//! ## Rule Order
//!
//! Fences go first so that the `<hr>` and heading passes never see the
//! backtick wrapper; `<hr>` removal runs before heading injection but the two
//! are independent.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Inline rule injected into every heading's `style` attribute.
pub const NORMAL_WEIGHT_RULE: &str = "font-weight: normal;";

/// Apply all post-processing rules to raw model output.
///
/// Rules (applied in order):
/// 1. Strip a leading ```` ```html ```` fence and a trailing ```` ``` ```` fence
/// 2. Remove every `<hr>` element, any case, self-closing or not
/// 3. Force `font-weight: normal;` into every `<h1>`…`<h6>` opening tag
pub fn clean_html(input: &str) -> String {
    let s = strip_html_fences(input);
    let s = remove_horizontal_rules(&s);
    force_normal_headings(&s)
}

// ── Rule 1: Strip outer html fences ──────────────────────────────────────────

static RE_LEADING_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^```html\s*").unwrap());
static RE_TRAILING_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*```$").unwrap());

pub fn strip_html_fences(input: &str) -> String {
    let s = RE_LEADING_FENCE.replace(input, "");
    RE_TRAILING_FENCE.replace(&s, "").into_owned()
}

// ── Rule 2: Remove horizontal rules ──────────────────────────────────────────

static RE_HR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</?hr\b[^>]*>").unwrap());

pub fn remove_horizontal_rules(input: &str) -> String {
    RE_HR.replace_all(input, "").into_owned()
}

// ── Rule 3: Force non-bold headings ──────────────────────────────────────────
//
// Only the opening tag is rewritten. An existing `style` attribute gets the
// rule prepended inside its quotes; otherwise a new attribute is inserted
// directly after the tag name, ahead of any other attributes. A style that
// already starts with the rule is left alone so the pass is idempotent.

static RE_HEADING_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<h([1-6])(\s[^>]*)?>").unwrap());
static RE_STYLE_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)(?:^|\s)style\s*=\s*["']"#).unwrap());

pub fn force_normal_headings(input: &str) -> String {
    RE_HEADING_OPEN
        .replace_all(input, |caps: &Captures<'_>| {
            let level = &caps[1];
            let attrs = caps.get(2).map_or("", |m| m.as_str());

            match RE_STYLE_ATTR.find(attrs) {
                Some(m) => {
                    let (head, value) = attrs.split_at(m.end());
                    if already_normal(value) {
                        format!("<h{level}{attrs}>")
                    } else {
                        format!("<h{level}{head}{NORMAL_WEIGHT_RULE} {value}>")
                    }
                }
                None => format!("<h{level} style=\"{NORMAL_WEIGHT_RULE}\"{attrs}>"),
            }
        })
        .into_owned()
}

fn already_normal(style_value: &str) -> bool {
    style_value
        .trim_start()
        .get(..NORMAL_WEIGHT_RULE.len() - 1)
        .is_some_and(|head| head.eq_ignore_ascii_case("font-weight: normal"))
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fences() {
        let input = "```html\n<h1>Hello</h1>\n<p>World</p>\n```";
        assert_eq!(strip_html_fences(input), "<h1>Hello</h1>\n<p>World</p>");
    }

    #[test]
    fn test_strip_fences_case_insensitive() {
        assert_eq!(strip_html_fences("```HTML\n<p>x</p>\n```"), "<p>x</p>");
    }

    #[test]
    fn test_strip_trailing_fence_only() {
        assert_eq!(strip_html_fences("<p>x</p>\n```"), "<p>x</p>");
    }

    #[test]
    fn test_no_fences_passthrough() {
        let input = "<p>plain</p>";
        assert_eq!(strip_html_fences(input), input);
    }

    #[test]
    fn test_fence_round_trip() {
        let inner = "<h2>Section</h2>\n<ul><li>a</li></ul>";
        let once = strip_html_fences(&format!("```html\n{inner}\n```"));
        assert_eq!(once, inner);
        let twice = strip_html_fences(&format!("```html\n{once}\n```"));
        assert_eq!(twice, inner);
    }

    #[test]
    fn test_remove_hr_variants() {
        let input = "<p>a</p><hr><p>b</p><hr/><p>c</p><HR /><p>d</p><hr class=\"x\">";
        assert_eq!(
            remove_horizontal_rules(input),
            "<p>a</p><p>b</p><p>c</p><p>d</p>"
        );
    }

    #[test]
    fn test_remove_hr_leaves_html_and_href() {
        let input = "<html><a href=\"#\">link</a></html>";
        assert_eq!(remove_horizontal_rules(input), input);
    }

    #[test]
    fn test_heading_without_style() {
        assert_eq!(
            force_normal_headings("<h1>Title</h1>"),
            "<h1 style=\"font-weight: normal;\">Title</h1>"
        );
    }

    #[test]
    fn test_heading_with_existing_style() {
        assert_eq!(
            force_normal_headings("<h2 style=\"color:red\">Title</h2>"),
            "<h2 style=\"font-weight: normal; color:red\">Title</h2>"
        );
    }

    #[test]
    fn test_heading_other_attributes_preserved() {
        assert_eq!(
            force_normal_headings("<h3 id=\"intro\" class=\"lead\">Intro</h3>"),
            "<h3 style=\"font-weight: normal;\" id=\"intro\" class=\"lead\">Intro</h3>"
        );
    }

    #[test]
    fn test_heading_injection_is_idempotent() {
        let input = "<h1>A</h1><h2 style=\"color:red\">B</h2><h6 class=\"c\">C</h6>";
        let once = force_normal_headings(input);
        let twice = force_normal_headings(&once);
        assert_eq!(once, twice);
        assert_eq!(once.matches(NORMAL_WEIGHT_RULE).count(), 3);
    }

    #[test]
    fn test_non_heading_tags_untouched() {
        let input = "<head><title>t</title></head><hgroup></hgroup><h7>x</h7>";
        assert_eq!(force_normal_headings(input), input);
    }

    #[test]
    fn test_clean_html_full_pipeline() {
        let input = "```html\n<h1>Hello</h1>\n<hr>\n<table border=\"1\"><tr><td>1</td></tr></table>\n```";
        let result = clean_html(input);
        assert!(result.starts_with("<h1 style=\"font-weight: normal;\">Hello</h1>"));
        assert!(!result.to_lowercase().contains("<hr"));
        assert!(!result.contains("```"));
        assert!(result.contains("<table border=\"1\">"));
    }
}
