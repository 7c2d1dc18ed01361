//! Markdown rendering with syntax highlighting

use anyhow::Result;
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use std::collections::HashMap;
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use crate::config::HighlightConfig;
use crate::helpers::html_escape;

/// Excerpt separator
pub const MORE_MARKER: &str = "<!-- more -->";

/// Parser options shared by rendering and link extraction
pub fn markdown_options() -> Options {
    // Front-matter is split off before parsing, so no metadata blocks here
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_SMART_PUNCTUATION
        | Options::ENABLE_HEADING_ATTRIBUTES
}

/// Assigns unique heading ids the way the rendered HTML will carry them
#[derive(Default)]
struct HeadingIds {
    seen: HashMap<String, usize>,
}

impl HeadingIds {
    fn assign(&mut self, explicit: Option<&str>, text: &str) -> String {
        let base = match explicit {
            Some(id) => id.to_string(),
            None => {
                let slug = slug::slugify(text);
                if slug.is_empty() {
                    "section".to_string()
                } else {
                    slug
                }
            }
        };
        let count = self.seen.entry(base.clone()).or_insert(0);
        let id = if *count == 0 {
            base
        } else {
            format!("{}-{}", base, count)
        };
        *count += 1;
        id
    }
}

/// Markdown renderer with syntax highlighting
pub struct MarkdownRenderer {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    theme_name: String,
    highlight: bool,
    line_numbers: bool,
}

impl MarkdownRenderer {
    /// Create a new markdown renderer
    pub fn new() -> Self {
        Self::from_config(&HighlightConfig::default())
    }

    /// Create from the site's highlight settings
    pub fn from_config(config: &HighlightConfig) -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
            theme_name: config.theme.clone(),
            highlight: config.enable,
            line_numbers: config.line_number,
        }
    }

    /// Render markdown to HTML
    pub fn render(&self, markdown: &str) -> Result<String> {
        let parser = Parser::new_ext(markdown, markdown_options());

        let mut events: Vec<Event> = Vec::new();
        let mut ids = HeadingIds::default();

        let mut in_code_block = false;
        let mut code_block_lang: Option<String> = None;
        let mut code_block_content = String::new();

        // Heading events are held back until the text is known
        let mut heading: Option<(Tag, Vec<Event>)> = None;

        for event in parser {
            if in_code_block {
                match event {
                    Event::Text(text) => code_block_content.push_str(&text),
                    Event::End(TagEnd::CodeBlock) => {
                        let highlighted =
                            self.highlight_code(&code_block_content, code_block_lang.as_deref());
                        events.push(Event::Html(CowStr::from(highlighted)));
                        in_code_block = false;
                        code_block_lang = None;
                    }
                    _ => {}
                }
                continue;
            }

            if heading.is_some() {
                if let Event::End(TagEnd::Heading(_)) = event {
                    if let Some((start, inner)) = heading.take() {
                        let text = plain_text(&inner);
                        events.push(Event::Start(with_heading_id(start, &mut ids, &text)));
                        events.extend(inner);
                        events.push(event);
                    }
                } else if let Some((_, inner)) = heading.as_mut() {
                    inner.push(event);
                }
                continue;
            }

            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    in_code_block = true;
                    code_block_lang = match kind {
                        CodeBlockKind::Fenced(lang) => {
                            // "rust,ignore" or "rust {.class}" keep only the language token
                            let lang = lang
                                .split(|c: char| c == ',' || c.is_whitespace())
                                .next()
                                .unwrap_or("")
                                .to_string();
                            if lang.is_empty() {
                                None
                            } else {
                                Some(lang)
                            }
                        }
                        CodeBlockKind::Indented => None,
                    };
                    code_block_content.clear();
                }
                Event::Start(tag @ Tag::Heading { .. }) => {
                    heading = Some((tag, Vec::new()));
                }
                other => events.push(other),
            }
        }

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());

        Ok(html_output)
    }

    /// Highlight a code block
    fn highlight_code(&self, code: &str, lang: Option<&str>) -> String {
        let lang = lang.unwrap_or("text");

        if !self.highlight {
            return format!(
                r#"<pre><code class="language-{}">{}</code></pre>"#,
                html_escape(lang),
                html_escape(code)
            );
        }

        let syntax = self
            .syntax_set
            .find_syntax_by_token(lang)
            .or_else(|| self.syntax_set.find_syntax_by_extension(lang))
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let theme = self
            .theme_set
            .themes
            .get(&self.theme_name)
            .or_else(|| self.theme_set.themes.values().next());

        let highlighted = theme.and_then(|theme| {
            highlighted_html_for_string(code, &self.syntax_set, syntax, theme).ok()
        });

        match highlighted {
            Some(highlighted) if self.line_numbers => {
                self.add_line_numbers(&highlighted, code.lines().count(), lang)
            }
            Some(highlighted) => format!(
                r#"<figure class="highlight {}">{}</figure>"#,
                html_escape(lang),
                highlighted
            ),
            None => format!(
                r#"<pre><code class="language-{}">{}</code></pre>"#,
                html_escape(lang),
                html_escape(code)
            ),
        }
    }

    /// Add a line-number gutter next to highlighted code
    fn add_line_numbers(&self, highlighted: &str, line_count: usize, lang: &str) -> String {
        let gutter = (1..=line_count)
            .map(|n| format!(r#"<span class="line-number">{}</span>"#, n))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"<figure class="highlight {}"><table><tr><td class="gutter"><pre>{}</pre></td><td class="code">{}</td></tr></table></figure>"#,
            html_escape(lang),
            gutter,
            highlighted
        )
    }

    /// Split content at `<!-- more -->`.
    /// Returns (excerpt, full content without the marker)
    pub fn split_excerpt(content: &str) -> (Option<String>, String) {
        if let Some(pos) = content.find(MORE_MARKER) {
            let excerpt = content[..pos].trim().to_string();
            let remaining = content[pos + MORE_MARKER.len()..].trim();
            let full = format!("{}\n\n{}", excerpt, remaining);
            (Some(excerpt), full)
        } else {
            (None, content.to_string())
        }
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Fill in the id of a heading start tag
fn with_heading_id<'a>(tag: Tag<'a>, ids: &mut HeadingIds, text: &str) -> Tag<'a> {
    match tag {
        Tag::Heading {
            level,
            id,
            classes,
            attrs,
        } => Tag::Heading {
            level,
            id: Some(CowStr::from(ids.assign(id.as_deref(), text))),
            classes,
            attrs,
        },
        other => other,
    }
}

/// Heading ids that [`MarkdownRenderer::render`] assigns for this markdown
pub fn heading_ids(markdown: &str) -> Vec<String> {
    let mut ids = HeadingIds::default();
    let mut result = Vec::new();
    let mut current: Option<(Option<String>, Vec<Event>)> = None;

    for event in Parser::new_ext(markdown, markdown_options()) {
        match event {
            Event::Start(Tag::Heading { id, .. }) => {
                current = Some((id.map(|id| id.to_string()), Vec::new()));
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((explicit, inner)) = current.take() {
                    result.push(ids.assign(explicit.as_deref(), &plain_text(&inner)));
                }
            }
            other => {
                if let Some((_, inner)) = current.as_mut() {
                    inner.push(other);
                }
            }
        }
    }

    result
}

/// Concatenate the visible text of inline events
fn plain_text(events: &[Event]) -> String {
    let mut text = String::new();
    for event in events {
        match event {
            Event::Text(t) | Event::Code(t) => text.push_str(t),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            _ => {}
        }
    }
    text
}
