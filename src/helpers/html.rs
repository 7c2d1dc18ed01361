//! HTML helper functions

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Root-relative `href`/`src` attributes
    static ref ROOT_RELATIVE_ATTR: Regex =
        Regex::new(r#"(?P<attr>\b(?:href|src)=["'])/(?P<rest>[^/])"#).unwrap();
}

/// Escape HTML special characters
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Escape XML special characters
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Strip HTML tags from a string
pub fn strip_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut in_tag = false;

    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }

    result
}

/// Truncate a string to a specified number of characters
pub fn truncate(s: &str, length: usize, omission: Option<&str>) -> String {
    let omission = omission.unwrap_or("...");

    if s.chars().count() <= length {
        s.to_string()
    } else {
        let truncated: String = s
            .chars()
            .take(length.saturating_sub(omission.chars().count()))
            .collect();
        format!("{}{}", truncated.trim_end(), omission)
    }
}

/// Count words in HTML content (strips tags first)
pub fn count_words(html: &str) -> usize {
    let text = strip_html(html);
    let mut count = 0;
    let mut in_word = false;

    for c in text.chars() {
        if c.is_alphanumeric() && !is_cjk(c) {
            if !in_word {
                in_word = true;
                count += 1;
            }
        } else if is_cjk(c) {
            // every CJK character counts as a word
            count += 1;
            in_word = false;
        } else {
            in_word = false;
        }
    }

    count
}

fn is_cjk(c: char) -> bool {
    ('\u{4E00}'..='\u{9FFF}').contains(&c)
}

/// Rewrite root-relative `href`/`src` attributes to absolute URLs
pub fn absolutize_urls(content: &str, base_url: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    ROOT_RELATIVE_ATTR
        .replace_all(content, |caps: &regex::Captures| {
            format!("{}{}/{}", &caps["attr"], base_url, &caps["rest"])
        })
        .into_owned()
}

/// Strip characters XML 1.0 does not allow
pub fn strip_invalid_xml_chars(s: &str) -> String {
    s.chars()
        .filter(|&c| {
            c == '\t'
                || c == '\n'
                || c == '\r'
                || ('\u{0020}'..='\u{D7FF}').contains(&c)
                || ('\u{E000}'..='\u{FFFD}').contains(&c)
                || ('\u{10000}'..='\u{10FFFF}').contains(&c)
        })
        .collect()
}

/// Generate meta generator tag
pub fn meta_generator() -> String {
    format!(
        r#"<meta name="generator" content="quill {}">"#,
        env!("CARGO_PKG_VERSION")
    )
}
