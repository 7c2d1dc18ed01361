//! Lint diagnostics

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// How bad a finding is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

/// A single problem with a document. The `Display` text is the message.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticKind {
    #[error("cannot read document: {message}")]
    Unreadable { message: String },

    #[error("{message}")]
    InvalidFrontMatter { message: String },

    #[error("no front-matter block")]
    MissingFrontMatter,

    #[error("title is missing or empty")]
    MissingTitle,

    #[error("layout is missing or empty")]
    MissingLayout,

    #[error("unknown layout `{layout}`")]
    UnknownLayout { layout: String },

    #[error("tag #{position} is empty")]
    EmptyTag { position: usize },

    #[error("tag `{tag}` is listed more than once")]
    DuplicateTag { tag: String },

    #[error("post has no tags")]
    MissingTags,

    #[error("writes to {route}, which is also the {other}")]
    DuplicatePermalink { route: String, other: String },

    #[error("line {line}: link `{target}` does not resolve")]
    BrokenLink { target: String, line: usize },

    #[error("line {line}: link `{target}` names a heading that does not exist")]
    BrokenAnchor { target: String, line: usize },
}

impl DiagnosticKind {
    pub fn severity(&self) -> Severity {
        match self {
            DiagnosticKind::UnknownLayout { .. }
            | DiagnosticKind::DuplicateTag { .. }
            | DiagnosticKind::MissingTags
            | DiagnosticKind::BrokenAnchor { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

/// A finding tied to a source document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Source path relative to the source directory
    pub source: String,
    #[serde(flatten)]
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn new(source: impl Into<String>, kind: DiagnosticKind) -> Self {
        Self {
            source: source.into(),
            kind,
        }
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.source, self.severity(), self.kind)
    }
}

/// Result of a `check` run
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    /// Number of documents inspected
    pub documents: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl Report {
    pub fn push(&mut self, source: &str, kind: DiagnosticKind) {
        self.diagnostics.push(Diagnostic::new(source, kind));
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity() == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity() == Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    /// Whether the run passes; `strict` fails on warnings too
    pub fn passes(&self, strict: bool) -> bool {
        if strict {
            self.diagnostics.is_empty()
        } else {
            !self.has_errors()
        }
    }

    /// Diagnostics for one source document
    pub fn for_source<'a>(&'a self, source: &'a str) -> impl Iterator<Item = &'a DiagnosticKind> {
        self.diagnostics
            .iter()
            .filter(move |d| d.source == source)
            .map(|d| &d.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let d = Diagnostic::new(
            "_posts/a.md",
            DiagnosticKind::BrokenLink {
                target: "../b.md".to_string(),
                line: 7,
            },
        );
        assert_eq!(
            d.to_string(),
            "_posts/a.md: error: line 7: link `../b.md` does not resolve"
        );
    }

    #[test]
    fn test_report_passes() {
        let mut report = Report::default();
        assert!(report.passes(true));

        report.push("a.md", DiagnosticKind::MissingTags);
        assert!(report.passes(false));
        assert!(!report.passes(true));

        report.push("a.md", DiagnosticKind::MissingTitle);
        assert!(!report.passes(false));
        assert_eq!(report.errors().count(), 1);
        assert_eq!(report.warnings().count(), 1);
    }

    #[test]
    fn test_serialize() {
        let d = Diagnostic::new("a.md", DiagnosticKind::EmptyTag { position: 2 });
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["kind"], "empty_tag");
        assert_eq!(json["position"], 2);
        assert_eq!(json["source"], "a.md");
    }
}
