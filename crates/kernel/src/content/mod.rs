//! Content processing module.
//!
//! This module provides:
//! - ContentPipeline: parse / unparse / render of post bodies, summaries and
//!   notice content
//! - Formatter: the standard (inline) and markdown (long-form) formatters
//! - FilterPipeline: text filters that build the stored form
//! - ThreadExcerpt: thread-level content used by notices

mod excerpt;
mod filter;
mod formatter;
mod pipeline;

pub use excerpt::{ThreadContext, ThreadExcerpt};
pub use filter::{FilterPipeline, TextFilter};
pub use formatter::{
    Formatter, MarkdownFormatter, StandardFormatter, purify, strip_tags, unparse_stored,
};
pub use pipeline::{
    ContentPipeline, NOTICE_LENGTH, SUMMARY_END_WITH, SUMMARY_LENGTH, SummaryContent,
    THREAD_CONTENT_LENGTH,
};

/// First `max` characters of `s`.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// End `s` with exactly one `suffix`: any run of trailing copies collapses
/// into one.
pub fn finish(s: &str, suffix: &str) -> String {
    if suffix.is_empty() {
        return s.to_string();
    }

    let mut base = s;
    while let Some(rest) = base.strip_suffix(suffix) {
        base = rest;
    }
    format!("{base}{suffix}")
}
