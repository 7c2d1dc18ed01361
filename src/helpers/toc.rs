//! Table of contents built from rendered headings

use lazy_static::lazy_static;
use regex::Regex;

use super::html::strip_html;

lazy_static! {
    static ref HEADING: Regex =
        Regex::new(r#"(?s)<h([1-6])\s+id="([^"]*)"[^>]*>(.*?)</h[1-6]>"#).unwrap();
}

/// Build a nested `<ol class="toc">` from headings up to `max_depth`.
/// Returns an empty string when there are no headings.
pub fn toc(content: &str, max_depth: usize) -> String {
    let mut html = String::new();
    let mut current_level = 0;
    let mut items = 0;

    for caps in HEADING.captures_iter(content) {
        let level: usize = caps[1].parse().unwrap_or(1);
        if level > max_depth {
            continue;
        }

        while current_level < level {
            html.push_str("<ol>");
            current_level += 1;
        }
        while current_level > level {
            html.push_str("</ol>");
            current_level -= 1;
        }

        html.push_str(&format!(
            r##"<li class="toc-item toc-level-{}"><a class="toc-link" href="#{}"><span class="toc-text">{}</span></a></li>"##,
            level,
            &caps[2],
            strip_html(&caps[3])
        ));
        items += 1;
    }

    while current_level > 0 {
        html.push_str("</ol>");
        current_level -= 1;
    }

    if items == 0 {
        String::new()
    } else {
        format!(r#"<nav class="toc">{}</nav>"#, html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toc_nesting() {
        let html = r#"<h2 id="setup">Setup</h2><p>x</p><h3 id="aliases">Aliases <code>lg</code></h3><h2 id="done">Done</h2><h4 id="deep">Deep</h4>"#;
        let toc = toc(html, 3);
        assert!(toc.contains(r##"href="#setup""##));
        assert!(toc.contains(r#"<span class="toc-text">Aliases lg</span>"#));
        assert!(toc.contains("toc-level-3"));
        assert!(!toc.contains("deep"));
        assert_eq!(toc.matches("<ol>").count(), toc.matches("</ol>").count());
    }

    #[test]
    fn test_toc_empty() {
        assert_eq!(toc("<p>no headings</p>", 3), "");
    }
}
