//! Thread-level excerpts used for notice and summary content.

use super::formatter::purify;
use super::{ContentPipeline, truncate_chars};
use crate::error::ContentResult;
use crate::models::{Classification, Post, Thread};

/// Source of thread-level content for notices.
pub trait ThreadExcerpt {
    /// The thread's classification.
    fn classification(&self) -> Classification;

    /// The thread's content, cut to `length` characters.
    ///
    /// With `parse` the raw text is returned; otherwise display HTML.
    fn content_by_type(&self, length: usize, parse: bool) -> ContentResult<String>;
}

/// Excerpts a thread through its opening post.
///
/// Long-form threads are represented by their title; other threads by the
/// opening post's content.
pub struct ThreadContext<'a> {
    pipeline: &'a ContentPipeline,
    thread: &'a Thread,
    first_post: &'a Post,
}

impl<'a> ThreadContext<'a> {
    pub fn new(pipeline: &'a ContentPipeline, thread: &'a Thread, first_post: &'a Post) -> Self {
        Self {
            pipeline,
            thread,
            first_post,
        }
    }

    pub fn thread(&self) -> &Thread {
        self.thread
    }
}

impl ThreadExcerpt for ThreadContext<'_> {
    fn classification(&self) -> Classification {
        self.thread.classification
    }

    fn content_by_type(&self, length: usize, parse: bool) -> ContentResult<String> {
        if self.thread.classification.is_long_form() {
            let title = truncate_chars(&self.thread.title, length);
            return Ok(if parse { title } else { purify(&title) });
        }

        let classification = self.thread.classification;
        let raw = self.pipeline.get_content(self.first_post, classification)?;
        let raw = truncate_chars(&raw, length);
        if parse {
            Ok(raw)
        } else {
            self.pipeline
                .render_raw(self.first_post, classification, &raw)
        }
    }
}
