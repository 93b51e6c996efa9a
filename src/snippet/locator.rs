//! Locates the snippet tag enclosing a cursor position.
//!
//! Tags may span multiple lines. The locator scans upward from the
//! cursor for the nearest unmatched open marker, then downward for the
//! matching close marker, accepting only attribute-continuation or blank
//! lines in between. Two markup families are recognized, HTML-like
//! `<code-example>`/`<code-pane>` elements and `{@example ...}` doc tags.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::snippet::TagSyntax;
use crate::snippet::attrs::{AttributeInfo, parse_attributes};

/// Line and byte-column address into a line buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextPosition {
    pub line: usize,
    pub character: usize,
}

impl TextPosition {
    pub fn new(line: usize, character: usize) -> Self {
        Self { line, character }
    }
}

/// Read access to a line-indexed text buffer. `line` returns the line's
/// text without its terminator and must only be called with an index
/// below `line_count`.
pub trait TextLines {
    fn line_count(&self) -> usize;
    fn line(&self, index: usize) -> String;
}

impl<S: AsRef<str>> TextLines for [S] {
    fn line_count(&self) -> usize {
        self.len()
    }

    fn line(&self, index: usize) -> String {
        self[index].as_ref().to_string()
    }
}

impl<S: AsRef<str>, const N: usize> TextLines for [S; N] {
    fn line_count(&self) -> usize {
        N
    }

    fn line(&self, index: usize) -> String {
        self[index].as_ref().to_string()
    }
}

/// The exact span of one snippet tag, markers included. `end` points one
/// past the close marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTagInfo {
    pub contents: String,
    pub start: TextPosition,
    pub end: TextPosition,
    pub syntax: TagSyntax,
}

/// A located snippet tag with its parsed attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetInfo {
    pub raw: RawTagInfo,
    pub attrs: AttributeInfo,
}

struct TagPair {
    open: &'static str,
    close: &'static str,
    syntax: TagSyntax,
}

/// Checked in order; the first pair matching a line wins.
static TAG_PAIRS: [TagPair; 3] = [
    TagPair {
        open: "<code-example",
        close: "</code-example>",
        syntax: TagSyntax::Html,
    },
    TagPair {
        open: "<code-pane",
        close: "</code-pane>",
        syntax: TagSyntax::Html,
    },
    TagPair {
        open: "{@example",
        close: "}",
        syntax: TagSyntax::Brace,
    },
];

/// A line consisting of tag attributes (or nothing), meaning a
/// multi-line tag continues across it.
static ATTRIBUTE_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:^| )(?:class|header|hide-copy|hidecopy|language|linenums|path|region|title)(?:[=>\s]|$)",
    )
    .expect("attribute-line pattern must compile")
});

fn floor_char_boundary(line: &str, index: usize) -> usize {
    let mut index = index.min(line.len());
    while !line.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(line: &str, index: usize) -> usize {
    let mut index = index.min(line.len());
    while !line.is_char_boundary(index) {
        index += 1;
    }
    index
}

/// Largest start index of `marker` beginning at or before `before_idx`.
fn last_index_of(line: &str, marker: &str, before_idx: usize) -> Option<usize> {
    let window = floor_char_boundary(line, before_idx.saturating_add(marker.len()));
    line[..window].rfind(marker)
}

/// Smallest start index of `marker` beginning at or after `after_idx`.
fn index_of(line: &str, marker: &str, after_idx: usize) -> Option<usize> {
    let from = ceil_char_boundary(line, after_idx);
    line[from..].find(marker).map(|idx| idx + from)
}

/// Tests for an open marker at or before `before_idx` that is not
/// already followed by its close marker within the same window. Returns
/// the pair's index in [`TAG_PAIRS`] and the marker's column.
fn is_open_line(line: &str, before_idx: usize) -> Option<(usize, usize)> {
    TAG_PAIRS.iter().enumerate().find_map(|(pair_idx, pair)| {
        let open_idx = last_index_of(line, pair.open, before_idx)?;
        match last_index_of(line, pair.close, before_idx.saturating_sub(pair.close.len())) {
            Some(close_idx) if open_idx <= close_idx => None,
            _ => Some((pair_idx, open_idx)),
        }
    })
}

/// Tests for a close marker ending at or after `after_idx` that is not
/// preceded by a new open marker. Returns the pair's index in
/// [`TAG_PAIRS`] and the marker's column.
fn is_close_line(line: &str, after_idx: usize) -> Option<(usize, usize)> {
    TAG_PAIRS.iter().enumerate().find_map(|(pair_idx, pair)| {
        let from = after_idx.saturating_add(1).saturating_sub(pair.close.len());
        let close_idx = index_of(line, pair.close, from)?;
        match index_of(line, pair.open, after_idx) {
            Some(open_idx) if close_idx >= open_idx => None,
            _ => Some((pair_idx, close_idx)),
        }
    })
}

fn is_middle_line(line: &str) -> bool {
    line.trim().is_empty() || ATTRIBUTE_LINE_RE.is_match(line)
}

fn contents_between<T: TextLines + ?Sized>(
    lines: &T,
    start: TextPosition,
    end: TextPosition,
) -> String {
    let mut contents = String::new();
    for line_idx in start.line..=end.line {
        let line = lines.line(line_idx);
        let from = if line_idx == start.line {
            start.character
        } else {
            0
        };
        let to = if line_idx == end.line {
            end.character
        } else {
            line.len()
        };
        if line_idx > start.line {
            contents.push('\n');
        }
        contents.push_str(&line[from..to]);
    }
    contents
}

/// Finds the raw span of the snippet tag enclosing `position`, or `None`
/// when the cursor is not inside one.
pub fn raw_tag_at<T: TextLines + ?Sized>(lines: &T, position: TextPosition) -> Option<RawTagInfo> {
    if position.line >= lines.line_count() {
        return None;
    }

    // Upward scan for the nearest unmatched open marker. A close marker
    // counts as continuation only on the cursor's own line (the cursor
    // may sit inside the close marker itself).
    let mut open: Option<(TextPosition, usize)> = None;
    let mut char_idx = position.character;
    for line_idx in (0..=position.line).rev() {
        let line = lines.line(line_idx);
        if let Some((pair_idx, open_idx)) = is_open_line(&line, char_idx) {
            open = Some((TextPosition::new(line_idx, open_idx), pair_idx));
            break;
        }
        let close_on_cursor_line =
            line_idx == position.line && is_close_line(&line, char_idx).is_some();
        if !is_middle_line(&line) && !close_on_cursor_line {
            return None;
        }
        char_idx = usize::MAX;
    }
    let (start, open_pair_idx) = open?;

    // Downward scan, restarted from the cursor, for the close marker.
    let mut end: Option<(TextPosition, usize)> = None;
    let mut char_idx = position.character;
    for line_idx in position.line..lines.line_count() {
        let line = lines.line(line_idx);
        if let Some((pair_idx, close_idx)) = is_close_line(&line, char_idx) {
            let character = close_idx + TAG_PAIRS[pair_idx].close.len();
            end = Some((TextPosition::new(line_idx, character), pair_idx));
            break;
        }
        if line_idx != start.line && !is_middle_line(&line) {
            return None;
        }
        char_idx = 0;
    }
    let (end, close_pair_idx) = end?;

    // Both markers must belong to the same tag pair.
    if open_pair_idx != close_pair_idx {
        return None;
    }

    Some(RawTagInfo {
        contents: contents_between(lines, start, end),
        start,
        end,
        syntax: TAG_PAIRS[open_pair_idx].syntax,
    })
}

/// Locates the snippet tag enclosing `position` and parses its
/// attributes. `None` when the cursor is outside any tag, the open and
/// close markers do not pair up, or the tag names no example path.
pub fn snippet_at<T: TextLines + ?Sized>(lines: &T, position: TextPosition) -> Option<SnippetInfo> {
    let raw = raw_tag_at(lines, position)?;
    let attrs = parse_attributes(&raw.contents, raw.syntax)?;
    Some(SnippetInfo { raw, attrs })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(line: usize, character: usize) -> TextPosition {
        TextPosition::new(line, character)
    }

    fn tag_at(lines: &[&str], position: TextPosition) -> Option<RawTagInfo> {
        raw_tag_at(lines, position)
    }

    #[test]
    fn test_single_line_tags() {
        let lines = [
            "line before",
            r#"text before <code-example path="foo"></code-example> text after"#,
            "text before {@example foo} text after",
            "line after",
        ];

        for position in [pos(1, 12), pos(1, 13), pos(1, 17), pos(1, 37), pos(1, 42), pos(1, 51)] {
            let raw = tag_at(&lines, position).unwrap();
            assert_eq!(raw.contents, r#"<code-example path="foo"></code-example>"#);
            assert_eq!(raw.start, pos(1, 12));
            assert_eq!(raw.end, pos(1, 52));
            assert_eq!(raw.syntax, TagSyntax::Html);
        }

        for position in [pos(2, 13), pos(2, 20), pos(2, 25)] {
            let raw = tag_at(&lines, position).unwrap();
            assert_eq!(raw.contents, "{@example foo}");
            assert_eq!(raw.start, pos(2, 12));
            assert_eq!(raw.end, pos(2, 26));
            assert_eq!(raw.syntax, TagSyntax::Brace);
        }

        for position in [
            pos(0, 5),
            pos(1, 5),
            pos(1, 57),
            pos(2, 5),
            pos(2, 31),
            pos(3, 5),
        ] {
            assert_eq!(tag_at(&lines, position), None, "at {position:?}");
        }
    }

    #[test]
    fn test_multi_line_tags() {
        let lines = [
            "line before",
            "text before <code-example",
            r#"                path="foo">"#,
            "            </code-example> text after",
            "line in-between",
            "text before {@example foo",
            r#"                region="bar""#,
            "            } text after",
            "line after",
        ];

        for position in [pos(1, 17), pos(2, 5), pos(2, 22), pos(3, 5), pos(3, 22)] {
            let raw = tag_at(&lines, position).unwrap();
            assert_eq!(
                raw.contents,
                "<code-example\n                path=\"foo\">\n            </code-example>"
            );
            assert_eq!(raw.start, pos(1, 12));
            assert_eq!(raw.end, pos(3, 27));
        }

        for position in [pos(5, 17), pos(6, 5), pos(6, 22), pos(7, 5), pos(7, 12)] {
            let raw = tag_at(&lines, position).unwrap();
            assert_eq!(
                raw.contents,
                "{@example foo\n                region=\"bar\"\n            }"
            );
            assert_eq!(raw.start, pos(5, 12));
            assert_eq!(raw.end, pos(7, 13));
        }

        for position in [pos(0, 5), pos(4, 5), pos(8, 5)] {
            assert_eq!(tag_at(&lines, position), None, "at {position:?}");
        }
    }

    #[test]
    fn test_adjacent_tags_pick_the_nearest() {
        let lines = [
            r#"<code-example path="foo"></code-example> <code-example path="bar"></code-example>"#,
            "{@example foo} {@example bar}",
        ];

        let first = snippet_at(&lines, pos(0, 15)).unwrap();
        assert_eq!(first.attrs.path, "foo");
        assert_eq!(first.raw.start, pos(0, 0));

        let second = snippet_at(&lines, pos(0, 55)).unwrap();
        assert_eq!(second.attrs.path, "bar");
        assert_eq!(second.raw.start, pos(0, 41));
        assert_eq!(second.raw.end, pos(0, 81));

        let first = snippet_at(&lines, pos(1, 8)).unwrap();
        assert_eq!(first.attrs.path, "foo");
        assert_eq!(first.raw.contents, "{@example foo}");

        let second = snippet_at(&lines, pos(1, 23)).unwrap();
        assert_eq!(second.attrs.path, "bar");
        assert_eq!(second.raw.contents, "{@example bar}");
    }

    #[test]
    fn test_close_markers_on_earlier_lines_end_the_scan() {
        let lines = [
            "<code-example",
            r#"                path="foo">"#,
            r#"</code-example> <code-example path="bar"></code-example>"#,
            "",
            "{@example foo",
            r#"                region="bar""#,
            "            }",
        ];

        // Inside the first tag's close marker.
        let raw = tag_at(&lines, pos(2, 14)).unwrap();
        assert_eq!(raw.start, pos(0, 0));
        assert_eq!(raw.end, pos(2, 15));

        // Past the second tag on that line there is nothing to enclose.
        assert_eq!(tag_at(&lines, pos(2, 56)), None);

        // Blank lines count as continuation, but the scans still never
        // pair markers across separate tags.
        let raw = tag_at(&lines, pos(5, 10)).unwrap();
        assert_eq!(raw.start, pos(4, 0));
        assert_eq!(raw.end, pos(6, 13));
        assert_eq!(tag_at(&lines, pos(3, 0)), None);
    }

    #[test]
    fn test_mismatched_markers_return_none() {
        let lines = [r#"<code-example path="foo"></code-pane>"#];
        assert_eq!(tag_at(&lines, pos(0, 10)), None);

        let lines = ["<code-pane", r#"    path="bar">"#, "</code-example>"];
        assert_eq!(tag_at(&lines, pos(1, 10)), None);

        let lines = [r#"{@example qux></code-pane>"#];
        assert_eq!(tag_at(&lines, pos(0, 10)), None);

        let lines = [r#"<code example path="baz"}"#];
        assert_eq!(tag_at(&lines, pos(0, 10)), None);
    }

    #[test]
    fn test_attribute_lines_continue_a_multi_line_tag() {
        let lines = [
            "<code-example",
            r#"    class="special""#,
            r#"    header="Heading""#,
            "    hide-copy",
            "    hideCopy",
            r#"    language="ts""#,
            r#"    linenums="15""#,
            r#"    path="foo""#,
            r#"    region="bar""#,
            r#"    title="baz""#,
            "",
            "    title unknown",
            "    unknown title",
            "    title>",
            "</code-example>",
        ];
        let raw = tag_at(&lines, pos(0, 5)).unwrap();
        assert_eq!(raw.start, pos(0, 0));
        assert_eq!(raw.end, pos(14, 15));
    }

    #[test]
    fn test_unknown_attribute_lines_break_the_tag() {
        let lines = ["<code-example", r#"    unknown="unknown">"#, "</code-example>"];
        assert_eq!(tag_at(&lines, pos(1, 10)), None);
        // The downward scan from the open marker's own line stops there too.
        assert_eq!(tag_at(&lines, pos(0, 5)), None);
    }

    #[test]
    fn test_unterminated_tag_returns_none() {
        let lines = ["<code-example", r#"    path="foo">"#];
        assert_eq!(tag_at(&lines, pos(0, 5)), None);

        let lines = [r#"    path="foo">"#, "</code-example>"];
        assert_eq!(tag_at(&lines, pos(0, 5)), None);
    }

    #[test]
    fn test_position_outside_the_buffer_returns_none() {
        let lines = ["{@example foo}"];
        assert_eq!(tag_at(&lines, pos(1, 0)), None);
        assert_eq!(tag_at(&lines, pos(7, 3)), None);
    }

    #[test]
    fn test_code_pane_tags_are_recognized() {
        let lines = [r#"<code-pane path="bar"></code-pane>"#];
        let info = snippet_at(&lines, pos(0, 10)).unwrap();
        assert_eq!(info.attrs.path, "bar");
        assert_eq!(info.raw.syntax, TagSyntax::Html);
        assert_eq!(info.raw.end, pos(0, 34));
    }

    #[test]
    fn test_snippet_at_requires_a_path() {
        let lines = [r#"<code-example region="foo"></code-example>"#];
        assert!(raw_tag_at(&lines, pos(0, 10)).is_some());
        assert_eq!(snippet_at(&lines, pos(0, 10)), None);
    }

    #[test]
    fn test_fixed_size_line_buffers_work_without_slicing() {
        let lines = ["{@example foo}"];
        assert_eq!(lines.line_count(), 1);
        assert_eq!(lines.line(0), "{@example foo}");
        assert!(snippet_at(&lines, pos(0, 5)).is_some());
    }
}
