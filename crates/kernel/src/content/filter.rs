//! Text filter pipeline used when parsing raw content.
//!
//! Filters run in sequence and turn raw author text into the stored form:
//! every literal character survives (escaped), and recognised constructs are
//! wrapped in tags. Because nothing is dropped, stripping the tags and
//! unescaping entities gives back the original text.

use std::sync::LazyLock;

use regex::Regex;

/// Escaped opening marker of a quote block.
pub const QUOTE_OPEN: &str = "&lt;blockquote class=&quot;quoteCon&quot;&gt;";

/// Escaped closing marker of a quote block.
pub const QUOTE_CLOSE: &str = "&lt;/blockquote&gt;";

#[allow(clippy::expect_used)]
static QUOTE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        "{}|{}",
        regex::escape(QUOTE_OPEN),
        regex::escape(QUOTE_CLOSE)
    ))
    .expect("valid regex literal")
});

/// Escaped text never contains `<`, so a URL cannot run into a tag.
#[allow(clippy::expect_used)]
static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://(?:[^\s<&]|&amp;)+").expect("valid regex literal")
});

/// Trait for text filters in the pipeline.
pub trait TextFilter: Send + Sync {
    /// Filter name for debugging.
    fn name(&self) -> &str;

    /// Process the input text and return filtered output.
    fn process(&self, input: &str) -> String;
}

/// Pipeline of text filters applied in sequence.
pub struct FilterPipeline {
    filters: Vec<Box<dyn TextFilter>>,
}

impl FilterPipeline {
    /// Create a new empty pipeline.
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Add a filter to the pipeline.
    pub fn add<F: TextFilter + 'static>(mut self, filter: F) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Pipeline for the inline formatter: quotes, links and line breaks.
    pub fn standard() -> Self {
        Self::new()
            .add(LineEndingFilter)
            .add(EscapeFilter)
            .add(QuoteFilter)
            .add(UrlFilter)
            .add(NewlineFilter)
    }

    /// Pipeline for markdown sources: markup is kept verbatim for the
    /// renderer, so only escaping applies.
    pub fn markdown() -> Self {
        Self::new().add(LineEndingFilter).add(EscapeFilter)
    }

    /// Filter names in application order.
    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// Process text through all filters in the pipeline.
    pub fn process(&self, input: &str) -> String {
        self.filters
            .iter()
            .fold(input.to_string(), |acc, filter| filter.process(&acc))
    }
}

impl Default for FilterPipeline {
    fn default() -> Self {
        Self::standard()
    }
}

/// Normalises `\r\n` and lone `\r` to `\n`.
pub struct LineEndingFilter;

impl TextFilter for LineEndingFilter {
    fn name(&self) -> &str {
        "line_ending"
    }

    fn process(&self, input: &str) -> String {
        input.replace("\r\n", "\n").replace('\r', "\n")
    }
}

/// Escapes the characters that would otherwise read as markup.
pub struct EscapeFilter;

impl TextFilter for EscapeFilter {
    fn name(&self) -> &str {
        "escape"
    }

    fn process(&self, input: &str) -> String {
        escape(input)
    }
}

/// Wraps balanced `<blockquote class="quoteCon">` blocks in `QUOTE` tags.
///
/// The original markers are kept inside `<s>`/`<e>` so unparsing restores
/// them. Unbalanced markers (e.g. a quote cut off by truncation) stay
/// literal text.
pub struct QuoteFilter;

impl TextFilter for QuoteFilter {
    fn name(&self) -> &str {
        "quote"
    }

    fn process(&self, input: &str) -> String {
        let markers: Vec<(usize, usize, bool)> = QUOTE_MARKER
            .find_iter(input)
            .map(|m| (m.start(), m.end(), m.as_str() == QUOTE_OPEN))
            .collect();

        let mut paired = vec![false; markers.len()];
        let mut open = Vec::new();
        for (i, &(_, _, is_open)) in markers.iter().enumerate() {
            if is_open {
                open.push(i);
            } else if let Some(start) = open.pop() {
                paired[start] = true;
                paired[i] = true;
            }
        }

        let mut result = String::with_capacity(input.len() + 32);
        let mut last_end = 0;
        for (i, &(start, end, is_open)) in markers.iter().enumerate() {
            if !paired[i] {
                continue;
            }
            result.push_str(&input[last_end..start]);
            let marker = &input[start..end];
            if is_open {
                result.push_str("<QUOTE><s>");
                result.push_str(marker);
                result.push_str("</s>");
            } else {
                result.push_str("<e>");
                result.push_str(marker);
                result.push_str("</e></QUOTE>");
            }
            last_end = end;
        }
        result.push_str(&input[last_end..]);
        result
    }
}

/// Wraps bare URLs in `URL` tags.
pub struct UrlFilter;

impl UrlFilter {
    /// Punctuation that ends a sentence rather than a URL.
    const TRAILING: &'static [char] = &['.', ',', ';', ':', '!', '?', ')'];
}

impl TextFilter for UrlFilter {
    fn name(&self) -> &str {
        "url"
    }

    fn process(&self, input: &str) -> String {
        let mut result = String::with_capacity(input.len());
        let mut last_end = 0;

        for mat in URL.find_iter(input) {
            let url = mat.as_str().trim_end_matches(Self::TRAILING);
            // "http://" alone is not a link
            if !url.contains("://") || url.ends_with("://") {
                continue;
            }

            result.push_str(&input[last_end..mat.start()]);
            result.push_str(&format!(r#"<URL url="{url}">{url}</URL>"#));
            last_end = mat.start() + url.len();
        }

        result.push_str(&input[last_end..]);
        result
    }
}

/// Marks line breaks with `<br/>`, keeping the newline itself.
pub struct NewlineFilter;

impl TextFilter for NewlineFilter {
    fn name(&self) -> &str {
        "newline"
    }

    fn process(&self, input: &str) -> String {
        input.replace('\n', "<br/>\n")
    }
}

/// Escape `&`, `<`, `>` and `"`.
pub fn escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Inverse of [`escape`].
pub fn unescape(input: &str) -> String {
    input
        .replace("&quot;", "\"")
        .replace("&gt;", ">")
        .replace("&lt;", "<")
        .replace("&amp;", "&")
}
