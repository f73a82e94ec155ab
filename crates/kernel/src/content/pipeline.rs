//! Content pipeline: the raw / stored / rendered duality of a post body.
//!
//! Every operation resolves its formatter from the post and the thread
//! classification passed in by the caller. Nothing is cached on the post, so
//! a thread that changes classification changes how its opening post is
//! read and written on the next call.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::excerpt::ThreadExcerpt;
use super::formatter::{Formatter, MarkdownFormatter, StandardFormatter, purify, strip_tags};
use super::{finish, truncate_chars};
use crate::error::{ContentError, ContentResult};
use crate::models::{Classification, Post};

/// Summary length in characters.
pub const SUMMARY_LENGTH: usize = 80;

/// Marker appended to truncated summaries.
pub const SUMMARY_END_WITH: &str = "...";

/// Notice content length in characters.
pub const NOTICE_LENGTH: usize = 80;

/// Length of the purified thread excerpt used as the fallback first content.
pub const THREAD_CONTENT_LENGTH: usize = 200;

/// Greedy within a line: runs from the first opening marker to the last
/// closing one on the same line. Text on other lines is kept.
#[allow(clippy::expect_used)]
static QUOTED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<blockquote class="quoteCon">.*</blockquote>"#).expect("valid regex literal")
});

/// Notice content for a post and its thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryContent {
    pub content: String,
    pub first_content: String,
}

/// Parses, unparses and renders post content through injected formatters.
#[derive(Clone)]
pub struct ContentPipeline {
    standard: Arc<dyn Formatter>,
    long_form: Arc<dyn Formatter>,
}

impl ContentPipeline {
    /// Create a pipeline from the two formatter variants.
    pub fn new(standard: Arc<dyn Formatter>, long_form: Arc<dyn Formatter>) -> Self {
        Self {
            standard,
            long_form,
        }
    }

    /// Pipeline with the built-in standard and markdown formatters.
    pub fn with_defaults() -> Self {
        Self::new(
            Arc::new(StandardFormatter::new()),
            Arc::new(MarkdownFormatter::new()),
        )
    }

    /// The long-form formatter governs only the opening post of a long-form
    /// thread.
    pub fn resolve_formatter(&self, post: &Post, classification: Classification) -> &dyn Formatter {
        if post.is_first && classification.is_long_form() {
            self.long_form.as_ref()
        } else {
            self.standard.as_ref()
        }
    }

    /// Parse `raw` and store it on the post. Empty input stores the empty
    /// marker rather than an empty document.
    pub fn set_content(
        &self,
        post: &mut Post,
        classification: Classification,
        raw: &str,
    ) -> ContentResult<()> {
        let stored = self.parse_stored(post, classification, raw)?;
        post.set_stored_content(stored);
        Ok(())
    }

    /// Whether storing `raw` would leave the post's content as it is.
    ///
    /// Compares stored forms, so input differing only in what parsing
    /// normalises (e.g. `\r\n` line endings) counts as unchanged.
    pub fn is_unchanged(
        &self,
        post: &Post,
        classification: Classification,
        raw: &str,
    ) -> ContentResult<bool> {
        let stored = self.parse_stored(post, classification, raw)?;
        Ok(stored.as_deref() == post.stored_content())
    }

    /// Editable raw content.
    pub fn get_content(
        &self,
        post: &Post,
        classification: Classification,
    ) -> ContentResult<String> {
        let Some(stored) = post.stored_content() else {
            return Ok(String::new());
        };

        let formatter = self.resolve_formatter(post, classification);
        formatter
            .unparse(stored)
            .map_err(|e| ContentError::format(formatter.name(), e))
    }

    /// Display HTML; empty when there is no content.
    pub fn render_content(
        &self,
        post: &Post,
        classification: Classification,
    ) -> ContentResult<String> {
        match post.stored_content() {
            Some(stored) if !stored.is_empty() => self.render_stored(post, classification, stored),
            _ => Ok(String::new()),
        }
    }

    /// HTML summary.
    ///
    /// Long content is truncated as raw text first and the truncated text is
    /// parsed and rendered again, so markup cut by the truncation is
    /// re-balanced and the summary never outgrows the cut. Line-break markup
    /// is removed from the result.
    pub fn get_summary(
        &self,
        post: &Post,
        classification: Classification,
    ) -> ContentResult<String> {
        let raw = self.get_content(post, classification)?;

        let html = if raw.chars().count() > SUMMARY_LENGTH {
            let cut = finish(&truncate_chars(&raw, SUMMARY_LENGTH), SUMMARY_END_WITH);
            self.render_raw(post, classification, &cut)?
        } else {
            self.render_content(post, classification)?
        };

        Ok(html.replace("<br>", ""))
    }

    /// Plain-text summary: render, strip markup, then truncate.
    pub fn get_summary_text(
        &self,
        post: &Post,
        classification: Classification,
    ) -> ContentResult<String> {
        let text = strip_tags(&self.render_content(post, classification)?);
        if text.is_empty() {
            return Ok(String::new());
        }

        Ok(finish(
            &truncate_chars(&text, SUMMARY_LENGTH),
            SUMMARY_END_WITH,
        ))
    }

    /// Raw content with quoted blocks removed, cut to `max_len` characters
    /// when non-zero. The post is left untouched.
    pub fn filter_quoted_content(
        &self,
        post: &Post,
        classification: Classification,
        max_len: usize,
    ) -> ContentResult<String> {
        let raw = self.get_content(post, classification)?;
        let filtered = QUOTED_BLOCK.replace_all(&raw, "");

        Ok(if max_len > 0 {
            truncate_chars(&filtered, max_len)
        } else {
            filtered.into_owned()
        })
    }

    /// Notice content for `post` and its thread.
    ///
    /// Nested replies use their own content; posts in long-form threads use
    /// the thread excerpt; other posts drop quoted blocks first. A first
    /// content not decided by a branch falls back to the purified thread
    /// excerpt.
    pub fn get_summary_content(
        &self,
        post: &Post,
        thread: &dyn ThreadExcerpt,
        substr: usize,
        parse: bool,
    ) -> ContentResult<SummaryContent> {
        let classification = thread.classification();
        let mut first_content = None;

        let content = if post.is_nested_reply() {
            debug!(thread_id = %post.thread_id, "summary content for nested reply");
            let raw = self.get_content(post, classification)?;
            self.raw_or_rendered(post, classification, &raw, substr, parse)?
        } else if classification.is_long_form() {
            debug!(thread_id = %post.thread_id, "summary content for long-form thread");
            thread.content_by_type(NOTICE_LENGTH, parse)?
        } else {
            debug!(thread_id = %post.thread_id, "summary content for reply");
            let raw = self.filter_quoted_content(post, classification, 0)?;
            let content = self.raw_or_rendered(post, classification, &raw, substr, parse)?;

            first_content = Some(if post.is_first {
                content.clone()
            } else {
                thread.content_by_type(NOTICE_LENGTH, parse)?
            });

            content
        };

        let first_content = match first_content {
            Some(first) => first,
            None => purify(&thread.content_by_type(THREAD_CONTENT_LENGTH, parse)?),
        };

        Ok(SummaryContent {
            content,
            first_content,
        })
    }

    /// Stored form of `raw`; `None` for empty input.
    fn parse_stored(
        &self,
        post: &Post,
        classification: Classification,
        raw: &str,
    ) -> ContentResult<Option<String>> {
        if raw.is_empty() {
            return Ok(None);
        }

        let formatter = self.resolve_formatter(post, classification);
        formatter
            .parse(raw, post)
            .map(Some)
            .map_err(|e| ContentError::format(formatter.name(), e))
    }

    /// Parse and render raw text against `post` without storing it.
    pub(crate) fn render_raw(
        &self,
        post: &Post,
        classification: Classification,
        raw: &str,
    ) -> ContentResult<String> {
        if raw.is_empty() {
            return Ok(String::new());
        }

        let formatter = self.resolve_formatter(post, classification);
        let stored = formatter
            .parse(raw, post)
            .map_err(|e| ContentError::format(formatter.name(), e))?;
        self.render_stored(post, classification, &stored)
    }

    fn render_stored(
        &self,
        post: &Post,
        classification: Classification,
        stored: &str,
    ) -> ContentResult<String> {
        let formatter = self.resolve_formatter(post, classification);
        formatter
            .render(stored)
            .map_err(|e| ContentError::format(formatter.name(), e))
    }

    fn raw_or_rendered(
        &self,
        post: &Post,
        classification: Classification,
        raw: &str,
        substr: usize,
        parse: bool,
    ) -> ContentResult<String> {
        let raw = if substr > 0 {
            truncate_chars(raw, substr)
        } else {
            raw.to_string()
        };

        if parse {
            Ok(raw)
        } else {
            self.render_raw(post, classification, &raw)
        }
    }
}

impl std::fmt::Debug for ContentPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentPipeline")
            .field("standard", &self.standard.name())
            .field("long_form", &self.long_form.name())
            .finish()
    }
}
