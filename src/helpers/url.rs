//! URL helper functions

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use crate::config::SiteConfig;

/// Characters escaped in the path segment of a generated URL
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Generate a URL with the root path
///
/// # Examples
/// ```ignore
/// url_for(&config, "/css/style.css") // -> "/blog/css/style.css"
/// ```
pub fn url_for(config: &SiteConfig, path: &str) -> String {
    let root = config.root.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    if path.is_empty() {
        format!("{}/", root)
    } else {
        format!("{}/{}", root, path)
    }
}

/// Generate a full URL including the domain
///
/// # Examples
/// ```ignore
/// full_url_for(&config, "/about/") // -> "https://example.com/blog/about/"
/// ```
pub fn full_url_for(config: &SiteConfig, path: &str) -> String {
    let base = config.url.trim_end_matches('/');
    let root = format!("{}/", config.root.trim_end_matches('/'));
    let path = if path.starts_with(&root) {
        path.to_string()
    } else {
        url_for(config, path)
    };
    format!("{}{}", base, path)
}

/// Encode a URL path, leaving `/` alone
pub fn encode_url(path: &str) -> String {
    utf8_percent_encode(path, PATH_SEGMENT).to_string()
}

/// Decode a percent-encoded URL path
pub fn decode_url(path: &str) -> String {
    percent_decode_str(path).decode_utf8_lossy().into_owned()
}

/// Whether a link target leaves the site (has a scheme or is protocol-relative)
pub fn is_external(link: &str) -> bool {
    if link.starts_with("//") {
        return true;
    }
    match link.find(':') {
        Some(pos) => {
            let scheme = &link[..pos];
            !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Normalize a route so that `/a/b`, `/a/b/` and `/a/b/index.html` compare equal
pub fn normalize_route(path: &str) -> String {
    let path = path.trim();
    let path = path.strip_suffix("index.html").unwrap_or(path);
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.rsplit('/').next().is_some_and(|last| last.contains('.')) {
        // a file such as atom.xml or images/logo.png
        format!("/{}", trimmed)
    } else {
        format!("/{}/", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> SiteConfig {
        let mut config = SiteConfig::default();
        config.url = "https://example.com".to_string();
        config.root = "/blog/".to_string();
        config
    }

    #[test]
    fn test_url_for() {
        let config = test_config();
        assert_eq!(url_for(&config, "/css/style.css"), "/blog/css/style.css");
        assert_eq!(url_for(&config, "about/"), "/blog/about/");
        assert_eq!(url_for(&config, ""), "/blog/");
    }

    #[test]
    fn test_full_url_for() {
        let config = test_config();
        assert_eq!(
            full_url_for(&config, "/about/"),
            "https://example.com/blog/about/"
        );
        assert_eq!(
            full_url_for(&config, "/blog/about/"),
            "https://example.com/blog/about/"
        );
    }

    #[test]
    fn test_encode_decode() {
        assert_eq!(encode_url("/tags/c sharp/"), "/tags/c%20sharp/");
        assert_eq!(decode_url("/tags/c%20sharp/"), "/tags/c sharp/");
    }

    #[test]
    fn test_is_external() {
        assert!(is_external("https://github.com"));
        assert!(is_external("mailto:me@example.com"));
        assert!(is_external("//cdn.example.com/x.js"));
        assert!(!is_external("/2019/03/02/graphql/"));
        assert!(!is_external("../about.md"));
        assert!(!is_external("#usage"));
        assert!(!is_external("notes/a:b.md"));
    }

    #[test]
    fn test_normalize_route() {
        assert_eq!(normalize_route("/a/b"), "/a/b/");
        assert_eq!(normalize_route("a/b/"), "/a/b/");
        assert_eq!(normalize_route("/a/b/index.html"), "/a/b/");
        assert_eq!(normalize_route("/index.html"), "/");
        assert_eq!(normalize_route("/atom.xml"), "/atom.xml");
        assert_eq!(normalize_route(""), "/");
    }
}
