//! Turning raw model output into display-ready text.
//!
//! The model is asked not to use markdown, but it still decides where to
//! put blank lines. The normalizer bounds the whitespace and turns
//! paragraphs into `<p>` blocks:
//!
//! 1. runs of three or more `\n` collapse to `\n\n`;
//! 2. the whole string is trimmed;
//! 3. the text is split on `\n\n`, remaining single `\n` become spaces;
//! 4. every paragraph is wrapped in `<p>`/`</p>`, without separators.
//!
//! Normalizing is not idempotent: a second pass sees markup, not raw text.

use std::fmt::{self, Display};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("the pattern is valid"));

const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// How a single newline inside a paragraph is rendered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LineBreak {
    /// Wrapped lines flow together, joined with a space.
    #[default]
    Space,
    /// Every line break is kept as a `<br>`.
    Break,
}

/// Options for [`normalize_with`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NormalizeOptions {
    /// Rendering of intra-paragraph newlines.
    pub line_break: LineBreak,
    /// Escape `& < > " '` inside paragraphs.
    ///
    /// The output is usually inserted as trusted markup, so unescaped model
    /// output can smuggle HTML into the page. Turn this off only when the
    /// text is rendered as plain text anyway.
    pub escape_html: bool,
}

impl Default for NormalizeOptions {
    #[inline]
    fn default() -> Self {
        Self {
            line_break: LineBreak::Space,
            escape_html: true,
        }
    }
}

/// Paragraph-delimited text produced by the normalizer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct NormalizedText(String);

impl NormalizedText {
    /// Returns the markup.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Converts into the underlying string.
    #[inline]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for NormalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedText {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalizes a raw response with the default options.
#[inline]
pub fn normalize_response(raw: &str) -> NormalizedText {
    normalize_with(raw, &NormalizeOptions::default())
}

/// Normalizes a raw response.
pub fn normalize_with(raw: &str, options: &NormalizeOptions) -> NormalizedText {
    let text = normalize_plain(raw);
    let line_sep = match options.line_break {
        LineBreak::Space => " ",
        LineBreak::Break => "<br>",
    };

    let mut out = String::with_capacity(text.len() + 16);
    for paragraph in text.split(PARAGRAPH_SEPARATOR) {
        out.push_str("<p>");
        for (idx, line) in paragraph.split('\n').enumerate() {
            if idx > 0 {
                out.push_str(line_sep);
            }
            if options.escape_html {
                push_escaped(&mut out, line);
            } else {
                out.push_str(line);
            }
        }
        out.push_str("</p>");
    }
    NormalizedText(out)
}

/// Bounds blank lines and trims the text, without adding markup.
///
/// For front-ends that render plain text themselves.
pub fn normalize_plain(raw: &str) -> String {
    BLANK_LINES
        .replace_all(raw, PARAGRAPH_SEPARATOR)
        .trim()
        .to_owned()
}

fn push_escaped(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_blank_lines() {
        assert_eq!(
            normalize_response("a\n\n\n\nb").as_str(),
            "<p>a</p><p>b</p>"
        );
        assert_eq!(
            normalize_response("a\n\n\nb\n\nc").as_str(),
            "<p>a</p><p>b</p><p>c</p>"
        );
    }

    #[test]
    fn test_single_newline_becomes_space() {
        assert_eq!(normalize_response("a\nb").as_str(), "<p>a b</p>");
    }

    #[test]
    fn test_strips_outer_whitespace() {
        assert_eq!(
            normalize_response("  a  \n\n  b  ").as_str(),
            "<p>a  </p><p>  b</p>"
        );
        assert_eq!(
            normalize_response("\n\n\n\nhello\n\n\n").as_str(),
            "<p>hello</p>"
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize_response("").as_str(), "<p></p>");
        assert_eq!(normalize_response(" \n\n \t").as_str(), "<p></p>");
    }

    #[test]
    fn test_single_paragraph() {
        let out = normalize_response("Just one line.");
        assert_eq!(out.as_str(), "<p>Just one line.</p>");
        assert_eq!(out.as_str().matches("<p>").count(), 1);
    }

    #[test]
    fn test_no_long_newline_runs_before_wrapping() {
        let inputs = ["\n\n\n", "a\n\n\n\n\n\nb", "x\n\ny\n\n\n\nz\n"];
        for input in inputs {
            assert!(!normalize_plain(input).contains("\n\n\n"), "{input:?}");
        }
    }

    #[test]
    fn test_every_paragraph_is_wrapped() {
        let out = normalize_response("one\n\ntwo\nlines\n\n\n\nthree");
        let out = out.as_str();
        assert_eq!(out.matches("<p>").count(), 3);
        assert_eq!(out.matches("</p>").count(), 3);
        assert!(!out.contains('\n'));
    }

    #[test]
    fn test_escapes_html() {
        assert_eq!(
            normalize_response("<script>alert('x')</script> & \"q\"").as_str(),
            "<p>&lt;script&gt;alert(&#x27;x&#x27;)&lt;/script&gt; &amp; &quot;q&quot;</p>"
        );

        let options = NormalizeOptions {
            escape_html: false,
            ..Default::default()
        };
        assert_eq!(
            normalize_with("<b>hi</b>", &options).as_str(),
            "<p><b>hi</b></p>"
        );
    }

    #[test]
    fn test_line_break_style() {
        let options = NormalizeOptions {
            line_break: LineBreak::Break,
            ..Default::default()
        };
        assert_eq!(
            normalize_with("a\nb\n\nc", &options).as_str(),
            "<p>a<br>b</p><p>c</p>"
        );
    }

    #[test]
    fn test_not_idempotent() {
        let once = normalize_response("a\n\nb");
        let twice = normalize_response(once.as_str());
        assert_ne!(once, twice);
    }

    #[test]
    fn test_normalize_plain() {
        assert_eq!(normalize_plain("\n hi\n\n\n\nthere \n"), "hi\n\nthere");
    }

    #[test]
    fn test_serializes_as_string() {
        let value = serde_json::to_value(normalize_response("x")).unwrap();
        assert_eq!(value, serde_json::json!("<p>x</p>"));
    }
}
