//! Link extraction and path arithmetic for internal link checking

use pulldown_cmark::{Event, Parser, Tag};

use crate::content::markdown::markdown_options;
use crate::helpers::decode_url;

/// A link or image reference found in markdown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Destination as written
    pub target: String,
    /// Byte offset of the link in the markdown it was found in
    pub offset: usize,
}

/// Destination split into its parts, percent-decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTarget {
    pub path: String,
    pub fragment: Option<String>,
}

impl LinkTarget {
    pub fn parse(target: &str) -> Self {
        let (rest, fragment) = match target.split_once('#') {
            Some((rest, fragment)) => (rest, Some(decode_url(fragment))),
            None => (target, None),
        };
        let path = rest.split_once('?').map(|(p, _)| p).unwrap_or(rest);
        Self {
            path: decode_url(path),
            fragment: fragment.filter(|f| !f.is_empty()),
        }
    }
}

/// Collect link and image destinations, skipping code
pub fn extract_links(markdown: &str) -> Vec<Link> {
    Parser::new_ext(markdown, markdown_options())
        .into_offset_iter()
        .filter_map(|(event, range)| match event {
            Event::Start(Tag::Link { dest_url, .. }) | Event::Start(Tag::Image { dest_url, .. }) => {
                Some(Link {
                    target: dest_url.trim().to_string(),
                    offset: range.start,
                })
            }
            _ => None,
        })
        .filter(|link| !link.target.is_empty())
        .collect()
}

/// 1-based line of a byte offset
pub fn line_of(text: &str, offset: usize) -> usize {
    let offset = offset.min(text.len());
    text.as_bytes()[..offset]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
        + 1
}

/// Join a relative path onto a `/`-separated directory, resolving `.` and
/// `..`. Returns `None` when the path climbs above the top.
pub fn join_relative(base_dir: &str, relative: &str) -> Option<String> {
    let mut parts: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

/// Directory part of a `/`-separated path
pub fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_links() {
        let md = "See [the rules](../graphql.md#rules) and ![logo](/img/logo.png).\n\n\
                  ```\n[not a link](nowhere.md)\n```\n\n\
                  Inline `[also not](x.md)` and [ref][r].\n\n[r]: /about/\n";
        let links = extract_links(md);
        let targets: Vec<_> = links.iter().map(|l| l.target.as_str()).collect();
        assert_eq!(targets, vec!["../graphql.md#rules", "/img/logo.png", "/about/"]);
        assert_eq!(line_of(md, links[0].offset), 1);
    }

    #[test]
    fn test_link_target_parse() {
        let t = LinkTarget::parse("/tags/c%20sharp/?page=2#top");
        assert_eq!(t.path, "/tags/c sharp/");
        assert_eq!(t.fragment.as_deref(), Some("top"));

        let t = LinkTarget::parse("#usage");
        assert_eq!(t.path, "");
        assert_eq!(t.fragment.as_deref(), Some("usage"));

        let t = LinkTarget::parse("other.md#");
        assert_eq!(t.fragment, None);
    }

    #[test]
    fn test_line_of() {
        let text = "a\nb\nc";
        assert_eq!(line_of(text, 0), 1);
        assert_eq!(line_of(text, 2), 2);
        assert_eq!(line_of(text, 4), 3);
    }

    #[test]
    fn test_join_relative() {
        assert_eq!(join_relative("_posts", "other.md").as_deref(), Some("_posts/other.md"));
        assert_eq!(join_relative("_posts", "../about.md").as_deref(), Some("about.md"));
        assert_eq!(join_relative("a/b", "./../c/./d").as_deref(), Some("a/c/d"));
        assert_eq!(join_relative("", "../x"), None);
    }

    #[test]
    fn test_parent_dir() {
        assert_eq!(parent_dir("_posts/a.md"), "_posts");
        assert_eq!(parent_dir("about.md"), "");
        assert_eq!(parent_dir("/2020/05/x/"), "/2020/05/x");
    }
}
