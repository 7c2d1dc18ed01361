//! Front-matter and link linter
//!
//! Every post must carry a non-empty `title` and `layout`, tags must be
//! non-blank and unique, no two documents may write the same route, and
//! every internal markdown link must resolve to a source document, a
//! generated route or a static asset.

mod diagnostic;
pub mod links;

pub use diagnostic::{Diagnostic, DiagnosticKind, Report, Severity};

use anyhow::Result;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use self::links::{extract_links, join_relative, line_of, parent_dir, LinkTarget};
use crate::content::loader::{relative_source, sort_posts, ContentLoader};
use crate::content::{FrontMatter, Page, Post};
use crate::generator::routes::{site_routes, RouteKind};
use crate::helpers::{is_external, normalize_route};
use crate::Site;

/// A document as the linter sees it
struct Document {
    source: String,
    /// Raw file content
    content: String,
    /// Byte offset of the markdown body inside `content`
    body_start: usize,
    anchors: Vec<String>,
}

impl Document {
    fn body(&self) -> &str {
        &self.content[self.body_start..]
    }
}

/// What a link landed on
enum Resolved<'a> {
    Document(&'a Document),
    Other,
}

/// Lint the whole site
pub fn run(site: &Site) -> Result<Report> {
    let mut report = Report::default();
    let loader = ContentLoader::new(site);

    let mut documents: Vec<Document> = Vec::new();
    let mut posts: Vec<Post> = Vec::new();
    let mut pages: Vec<Page> = Vec::new();

    for path in loader.post_files() {
        let Some(content) = read_document(site, &path, &mut report) else {
            continue;
        };
        let source = relative_source(&site.source_dir, &path);
        lint_post_front_matter(site, &source, &content, &mut report);

        match loader.load_post(&path) {
            Ok(post) => {
                documents.push(Document {
                    source: source.clone(),
                    body_start: body_start(&content),
                    content,
                    anchors: post.anchors.clone(),
                });
                if post.published || site.config.render_drafts {
                    posts.push(post);
                }
            }
            Err(e) => report.push(
                &source,
                DiagnosticKind::Unreadable {
                    message: format!("{:#}", e),
                },
            ),
        }
    }

    for path in loader.page_files() {
        let Some(content) = read_document(site, &path, &mut report) else {
            continue;
        };
        let source = relative_source(&site.source_dir, &path);
        if let Err(e) = FrontMatter::parse_strict(&content) {
            report.push(
                &source,
                DiagnosticKind::InvalidFrontMatter {
                    message: e.to_string(),
                },
            );
        }

        match loader.load_page(&path) {
            Ok(page) => {
                documents.push(Document {
                    source,
                    body_start: body_start(&content),
                    content,
                    anchors: page.anchors.clone(),
                });
                pages.push(page);
            }
            Err(e) => report.push(
                &source,
                DiagnosticKind::Unreadable {
                    message: format!("{:#}", e),
                },
            ),
        }
    }

    report.documents = documents.len();
    sort_posts(&mut posts);

    let index = RouteIndex::build(site, &posts, &pages, &documents, &mut report);

    if site.config.check.check_links {
        for doc in &documents {
            lint_links(site, doc, &index, &mut report);
        }
    }

    report.diagnostics.sort_by(|a, b| a.source.cmp(&b.source));

    tracing::info!(
        "Checked {} documents: {} errors, {} warnings",
        report.documents,
        report.errors().count(),
        report.warnings().count()
    );

    Ok(report)
}

fn read_document(site: &Site, path: &Path, report: &mut Report) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(content) => Some(content),
        Err(e) => {
            report.push(
                &relative_source(&site.source_dir, path),
                DiagnosticKind::Unreadable {
                    message: e.to_string(),
                },
            );
            None
        }
    }
}

/// Offset where the markdown body starts, as the lenient parser sees it
fn body_start(content: &str) -> usize {
    match FrontMatter::parse(content) {
        Ok((_, body)) => content.len() - body.len(),
        Err(_) => 0,
    }
}

/// The front-matter contract of a post
fn lint_post_front_matter(site: &Site, source: &str, content: &str, report: &mut Report) {
    let fm = match FrontMatter::parse_strict(content) {
        Ok((Some(fm), _)) => fm,
        Ok((None, _)) => {
            report.push(source, DiagnosticKind::MissingFrontMatter);
            return;
        }
        Err(e) => {
            report.push(
                source,
                DiagnosticKind::InvalidFrontMatter {
                    message: e.to_string(),
                },
            );
            return;
        }
    };

    if fm.title.as_deref().map_or(true, |t| t.trim().is_empty()) {
        report.push(source, DiagnosticKind::MissingTitle);
    }

    match fm.layout.as_deref().map(str::trim) {
        None | Some("") => report.push(source, DiagnosticKind::MissingLayout),
        Some(layout) if !site.config.is_known_layout(layout) => report.push(
            source,
            DiagnosticKind::UnknownLayout {
                layout: layout.to_string(),
            },
        ),
        Some(_) => {}
    }

    if fm.tags.is_empty() && site.config.check.require_tags {
        report.push(source, DiagnosticKind::MissingTags);
    }

    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for (i, tag) in fm.tags.iter().enumerate() {
        let tag = tag.trim();
        if tag.is_empty() {
            report.push(source, DiagnosticKind::EmptyTag { position: i + 1 });
            continue;
        }
        let key = tag.to_lowercase();
        if !seen.insert(key.clone()) && reported.insert(key) {
            report.push(
                source,
                DiagnosticKind::DuplicateTag {
                    tag: tag.to_string(),
                },
            );
        }
    }
}

/// Generated routes and source files, for link resolution
struct RouteIndex<'a> {
    /// Normalized route -> document index, `None` for listings and assets
    routes: HashMap<String, Option<usize>>,
    /// Source-relative path -> document index
    sources: HashMap<&'a str, usize>,
    documents: &'a [Document],
}

impl<'a> RouteIndex<'a> {
    /// Index routes, reporting documents that collide on one
    fn build(
        site: &Site,
        posts: &[Post],
        pages: &[Page],
        documents: &'a [Document],
        report: &mut Report,
    ) -> Self {
        let sources: HashMap<&str, usize> = documents
            .iter()
            .enumerate()
            .map(|(i, d)| (d.source.as_str(), i))
            .collect();

        // Every claim on each route
        let mut claims: IndexMap<String, Vec<(RouteKind, Option<usize>)>> = IndexMap::new();
        for route in site_routes(site, posts, pages) {
            let doc = match &route.kind {
                RouteKind::Post(i) => sources.get(posts[*i].source.as_str()).copied(),
                RouteKind::Page(i) => sources.get(pages[*i].source.as_str()).copied(),
                _ => None,
            };
            claims.entry(route.path).or_default().push((route.kind, doc));
        }

        let mut routes: HashMap<String, Option<usize>> = HashMap::new();
        for (path, claimants) in claims {
            for (i, (_, doc)) in claimants.iter().enumerate() {
                let Some(d) = doc else { continue };
                let Some((other, _)) = claimants
                    .iter()
                    .enumerate()
                    .find(|(j, _)| *j != i)
                    .map(|(_, claim)| claim)
                else {
                    continue;
                };
                report.push(
                    &documents[*d].source,
                    DiagnosticKind::DuplicatePermalink {
                        route: path.clone(),
                        other: other.describe(posts, pages),
                    },
                );
            }
            let doc = claimants.first().and_then(|(_, d)| *d);
            routes.insert(path, doc);
        }

        Self {
            routes,
            sources,
            documents,
        }
    }

    /// Look up a site path, with or without the root prefix
    fn route(&self, site: &Site, path: &str) -> Option<Resolved<'a>> {
        let root = site.config.root.trim_end_matches('/');
        let candidates = [
            normalize_route(path),
            normalize_route(&format!("{}/{}", root, path.trim_start_matches('/'))),
        ];
        candidates.iter().find_map(|candidate| {
            self.routes.get(candidate).map(|doc| match doc {
                Some(i) => Resolved::Document(&self.documents[*i]),
                None => Resolved::Other,
            })
        })
    }

    /// Look up a source-relative file
    fn source_file(&self, site: &Site, relative: &str) -> Option<Resolved<'a>> {
        if let Some(&i) = self.sources.get(relative) {
            return Some(Resolved::Document(&self.documents[i]));
        }
        let path = site.source_dir.join(relative);
        if path.is_file() {
            Some(Resolved::Other)
        } else {
            None
        }
    }
}

/// Route a document is served at, as a directory for relative URL joins
fn document_url_dir(index: &RouteIndex, doc_index: usize) -> Option<String> {
    index
        .routes
        .iter()
        .find(|(_, d)| **d == Some(doc_index))
        .map(|(route, _)| {
            if route.ends_with('/') {
                route.trim_end_matches('/').to_string()
            } else {
                parent_dir(route).to_string()
            }
        })
}

fn lint_links(site: &Site, doc: &Document, index: &RouteIndex, report: &mut Report) {
    let ignore: Vec<glob::Pattern> = site
        .config
        .check
        .ignore
        .iter()
        .filter_map(|p| match glob::Pattern::new(p) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                tracing::warn!("Invalid check.ignore pattern {:?}: {}", p, e);
                None
            }
        })
        .collect();

    let doc_index = index.sources.get(doc.source.as_str()).copied();

    for link in extract_links(doc.body()) {
        if is_external(&link.target) {
            continue;
        }
        let target = LinkTarget::parse(&link.target);
        if ignore.iter().any(|p| p.matches(&target.path)) {
            tracing::debug!("Ignoring link {} in {}", link.target, doc.source);
            continue;
        }

        let line = line_of(&doc.content, doc.body_start + link.offset);

        let resolved = if target.path.is_empty() {
            Some(Resolved::Document(doc))
        } else if target.path.starts_with('/') {
            index.route(site, &target.path)
        } else {
            // A source file next to this one, or a URL relative to its route
            join_relative(parent_dir(&doc.source), &target.path)
                .and_then(|relative| index.source_file(site, &relative))
                .or_else(|| {
                    let dir = doc_index.and_then(|i| document_url_dir(index, i))?;
                    let joined = join_relative(&dir, &target.path)?;
                    index.route(site, &format!("/{}", joined))
                })
        };

        match (resolved, &target.fragment) {
            (None, _) => report.push(
                &doc.source,
                DiagnosticKind::BrokenLink {
                    target: link.target.clone(),
                    line,
                },
            ),
            (Some(Resolved::Document(target_doc)), Some(fragment))
                if site.config.check.check_anchors
                    && !target_doc.anchors.iter().any(|a| a == fragment) =>
            {
                report.push(
                    &doc.source,
                    DiagnosticKind::BrokenAnchor {
                        target: link.target.clone(),
                        line,
                    },
                )
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn site_with(files: &[(&str, &str)]) -> (TempDir, Site) {
        let dir = TempDir::new().unwrap();
        for (path, content) in files {
            let full = dir.path().join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, content).unwrap();
        }
        let site = Site::new(dir.path()).unwrap();
        (dir, site)
    }

    fn kinds<'a>(report: &'a Report, source: &'a str) -> Vec<&'a DiagnosticKind> {
        report.for_source(source).collect()
    }

    #[test]
    fn test_clean_site() {
        let (_dir, site) = site_with(&[
            (
                "source/_posts/a.md",
                "---\nlayout: post\ntitle: A\ndate: 2020-01-01\ntags: [git]\n---\n## Aliases\n",
            ),
            (
                "source/_posts/b.md",
                "---\nlayout: post\ntitle: B\ndate: 2020-01-02\ntags: [graphql]\n---\n\
                 See [a](a.md#aliases), [a again](/2020/01/01/a/), [tags](/tags/git/),\n\
                 [about](../about.md), [logo](/img/logo.png) and [top](#intro).\n\n# Intro\n",
            ),
            ("source/about.md", "---\ntitle: About\n---\n[home](/)\n"),
            ("source/img/logo.png", "png"),
        ]);
        let report = run(&site).unwrap();
        assert_eq!(report.documents, 3);
        assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
        assert!(report.passes(true));
    }

    #[test]
    fn test_front_matter_contract() {
        let (_dir, site) = site_with(&[
            ("source/_posts/no-fm.md", "Just prose.\n"),
            ("source/_posts/blank.md", "---\ntitle: \"  \"\nlayout:\n---\n"),
            (
                "source/_posts/tags.md",
                "---\ntitle: T\nlayout: talk\ntags:\n  - git\n  - \"\"\n  - Git\n  - git\n---\n",
            ),
            ("source/_posts/broken.md", "---\ntitle: [oops\n---\n"),
        ]);
        let report = run(&site).unwrap();

        assert_eq!(
            kinds(&report, "_posts/no-fm.md"),
            vec![&DiagnosticKind::MissingFrontMatter]
        );
        assert_eq!(
            kinds(&report, "_posts/blank.md"),
            vec![&DiagnosticKind::MissingTitle, &DiagnosticKind::MissingLayout]
        );
        assert_eq!(
            kinds(&report, "_posts/tags.md"),
            vec![
                &DiagnosticKind::UnknownLayout {
                    layout: "talk".to_string()
                },
                &DiagnosticKind::EmptyTag { position: 2 },
                &DiagnosticKind::DuplicateTag {
                    tag: "Git".to_string()
                },
            ]
        );
        assert!(matches!(
            kinds(&report, "_posts/broken.md")[..],
            [DiagnosticKind::InvalidFrontMatter { .. }]
        ));
        assert!(report.has_errors());
    }

    #[test]
    fn test_require_tags() {
        let (_dir, site) = site_with(&[
            ("_config.yml", "check:\n  require_tags: true\n"),
            ("source/_posts/a.md", "---\ntitle: A\nlayout: post\n---\n"),
        ]);
        let report = run(&site).unwrap();
        assert_eq!(
            kinds(&report, "_posts/a.md"),
            vec![&DiagnosticKind::MissingTags]
        );
        assert!(report.passes(false));
        assert!(!report.passes(true));
    }

    #[test]
    fn test_broken_links_and_anchors() {
        let (_dir, site) = site_with(&[
            (
                "source/_posts/a.md",
                "---\ntitle: A\nlayout: post\ndate: 2020-01-01\n---\n## Setup\n",
            ),
            (
                "source/_posts/b.md",
                "---\ntitle: B\nlayout: post\n---\nIntro\n\n\
                 [gone](missing.md)\n\
                 [anchor](a.md#nope)\n\
                 [route](/2020/01/01/a/#setup)\n\
                 [nowhere](/no/such/page/)\n\
                 [web](https://example.org/x) [mail](mailto:x@y.z)\n\
                 `[code](skip.md)`\n",
            ),
        ]);
        let report = run(&site).unwrap();
        assert_eq!(
            kinds(&report, "_posts/b.md"),
            vec![
                &DiagnosticKind::BrokenLink {
                    target: "missing.md".to_string(),
                    line: 7
                },
                &DiagnosticKind::BrokenAnchor {
                    target: "a.md#nope".to_string(),
                    line: 8
                },
                &DiagnosticKind::BrokenLink {
                    target: "/no/such/page/".to_string(),
                    line: 10
                },
            ]
        );
    }

    #[test]
    fn test_relative_url_against_route() {
        let (_dir, site) = site_with(&[
            ("_config.yml", "permalink: posts/:title/\n"),
            ("source/_posts/a.md", "---\ntitle: A\nlayout: post\n---\n[b](../b/)\n"),
            ("source/_posts/b.md", "---\ntitle: B\nlayout: post\n---\n[c](../c/)\n"),
        ]);
        let report = run(&site).unwrap();
        assert!(kinds(&report, "_posts/a.md").is_empty());
        assert_eq!(kinds(&report, "_posts/b.md").len(), 1);
    }

    #[test]
    fn test_links_with_root_and_ignore() {
        let (_dir, site) = site_with(&[
            (
                "_config.yml",
                "root: /blog/\ncheck:\n  ignore:\n    - \"/downloads/**\"\n",
            ),
            ("source/about.md", "---\ntitle: About\n---\n"),
            (
                "source/_posts/a.md",
                "---\ntitle: A\nlayout: post\n---\n[x](/blog/about/) [y](/about/) [z](/downloads/tool.zip)\n",
            ),
        ]);
        let report = run(&site).unwrap();
        assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
    }

    #[test]
    fn test_anchor_check_can_be_disabled() {
        let (_dir, site) = site_with(&[
            ("_config.yml", "check:\n  check_anchors: false\n"),
            ("source/_posts/a.md", "---\ntitle: A\nlayout: post\n---\n[x](#nothing)\n"),
        ]);
        let report = run(&site).unwrap();
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn test_duplicate_permalink() {
        let (_dir, site) = site_with(&[
            ("_config.yml", "permalink: :title/\n"),
            ("source/_posts/about.md", "---\ntitle: A\nlayout: post\n---\n"),
            ("source/about.md", "---\ntitle: About page\n---\n"),
        ]);
        let report = run(&site).unwrap();
        assert_eq!(
            kinds(&report, "about.md"),
            vec![&DiagnosticKind::DuplicatePermalink {
                route: "/about/".to_string(),
                other: "post _posts/about.md".to_string(),
            }]
        );
        assert_eq!(
            kinds(&report, "_posts/about.md"),
            vec![&DiagnosticKind::DuplicatePermalink {
                route: "/about/".to_string(),
                other: "page about.md".to_string(),
            }]
        );
    }

    #[test]
    fn test_page_shadowing_generated_route() {
        let (_dir, site) = site_with(&[
            (
                "source/_posts/a.md",
                "---\ntitle: A\nlayout: post\ntags: [git]\n---\n",
            ),
            ("source/tags.md", "---\ntitle: Tags\n---\n"),
            ("source/archives.md", "---\ntitle: Archives\n---\n"),
            ("source/index.md", "---\ntitle: Home\n---\n"),
            ("source/logo.md", "---\ntitle: Logo\n---\n"),
            ("source/logo/index.html", "<p>static</p>"),
        ]);
        let report = run(&site).unwrap();

        let collides_with = |source: &str| match kinds(&report, source).as_slice() {
            [DiagnosticKind::DuplicatePermalink { other, .. }] => other.clone(),
            found => panic!("{}: {:?}", source, found),
        };
        assert_eq!(collides_with("tags.md"), "tag index");
        assert_eq!(collides_with("archives.md"), "archive");
        assert_eq!(collides_with("index.md"), "home page");
        assert_eq!(collides_with("logo.md"), "asset logo/index.html");
        assert!(kinds(&report, "_posts/a.md").is_empty());
        assert!(report.has_errors());
    }
}
