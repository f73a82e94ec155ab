//! Formatters convert between raw author text, the stored form, and HTML.
//!
//! Stored documents have a `<t>` (plain) or `<r>` (rich) root. Text inside is
//! escaped and markup is expressed as tags, so [`unparse_stored`] is the same
//! for every formatter: strip tags, unescape.

use std::sync::LazyLock;

use anyhow::{Result, bail};
use pulldown_cmark::{Options, Parser, html};
use regex::{Captures, Regex};
use tracing::trace;

use super::filter::{FilterPipeline, unescape};
use crate::models::Post;

#[allow(clippy::expect_used)]
static ANY_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex literal"));

#[allow(clippy::expect_used)]
static MARKER_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<s>.*?</s>|<e>.*?</e>").expect("valid regex literal"));

#[allow(clippy::expect_used)]
static STORED_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<(/?)([A-Za-z]+)(?:\s+url="([^"]*)")?\s*/?>"#).expect("valid regex literal")
});

/// Converts content between its raw, stored and rendered forms.
pub trait Formatter: Send + Sync {
    /// Formatter name for logs and errors.
    fn name(&self) -> &str;

    /// Parse raw author text into the stored form.
    ///
    /// `post` is the entity being written; its non-content fields are
    /// already set when this is called.
    fn parse(&self, raw: &str, post: &Post) -> Result<String>;

    /// Reconstruct editable raw text from the stored form.
    fn unparse(&self, stored: &str) -> Result<String>;

    /// Render the stored form as display HTML.
    fn render(&self, stored: &str) -> Result<String>;
}

/// Inline formatter for regular posts: quote blocks, autolinks, line breaks.
pub struct StandardFormatter {
    filters: FilterPipeline,
}

impl StandardFormatter {
    pub fn new() -> Self {
        Self {
            filters: FilterPipeline::standard(),
        }
    }
}

impl Default for StandardFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter for StandardFormatter {
    fn name(&self) -> &str {
        "standard"
    }

    fn parse(&self, raw: &str, post: &Post) -> Result<String> {
        let body = self.filters.process(raw);
        let root = if body.contains("<QUOTE>") || body.contains("<URL ") {
            "r"
        } else {
            "t"
        };

        trace!(
            thread_id = %post.thread_id,
            is_first = post.is_first,
            root,
            "parsed standard content"
        );

        Ok(format!("<{root}>{body}</{root}>"))
    }

    fn unparse(&self, stored: &str) -> Result<String> {
        unparse_stored(stored)
    }

    fn render(&self, stored: &str) -> Result<String> {
        check_root(stored)?;

        let without_markers = MARKER_TEXT.replace_all(stored, "");
        let html = STORED_TAG.replace_all(&without_markers, |caps: &Captures| {
            let closing = !caps[1].is_empty();
            match (&caps[2], closing) {
                ("br", _) => "<br>".to_string(),
                ("QUOTE", false) => r#"<blockquote class="quoteCon">"#.to_string(),
                ("QUOTE", true) => "</blockquote>".to_string(),
                ("URL", false) => {
                    let url = caps.get(3).map_or("", |m| m.as_str());
                    format!(r#"<a href="{url}" target="_blank" rel="nofollow noopener">"#)
                }
                ("URL", true) => "</a>".to_string(),
                _ => String::new(),
            }
        });

        Ok(html.into_owned())
    }
}

/// Markdown formatter for long-form opening posts.
pub struct MarkdownFormatter {
    filters: FilterPipeline,
    options: Options,
}

impl MarkdownFormatter {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);

        Self {
            filters: FilterPipeline::markdown(),
            options,
        }
    }
}

impl Default for MarkdownFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter for MarkdownFormatter {
    fn name(&self) -> &str {
        "markdown"
    }

    fn parse(&self, raw: &str, post: &Post) -> Result<String> {
        trace!(thread_id = %post.thread_id, "parsed markdown content");
        Ok(format!("<r>{}</r>", self.filters.process(raw)))
    }

    fn unparse(&self, stored: &str) -> Result<String> {
        unparse_stored(stored)
    }

    fn render(&self, stored: &str) -> Result<String> {
        let source = unparse_stored(stored)?;
        let parser = Parser::new_ext(&source, self.options);

        let mut out = String::with_capacity(source.len() * 3 / 2);
        html::push_html(&mut out, parser);

        // Markdown passes raw HTML through; sanitize before display.
        Ok(purify(&out))
    }
}

/// Strip tags and unescape entities.
pub fn unparse_stored(stored: &str) -> Result<String> {
    check_root(stored)?;
    Ok(unescape(&ANY_TAG.replace_all(stored, "")))
}

/// Remove every tag from an HTML fragment. Entities are left as-is.
pub fn strip_tags(html: &str) -> String {
    ANY_TAG.replace_all(html, "").into_owned()
}

/// XSS-purify an HTML fragment.
pub fn purify(html: &str) -> String {
    ammonia::clean(html)
}

fn check_root(stored: &str) -> Result<()> {
    let plain = stored.starts_with("<t>") && stored.ends_with("</t>");
    let rich = stored.starts_with("<r>") && stored.ends_with("</r>");
    if !plain && !rich {
        bail!("not a stored document");
    }
    Ok(())
}
