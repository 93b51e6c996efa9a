//! Comment-syntax recognizers for docregion directives.
//!
//! Example files mark extractable regions with directive comments
//! (`#docregion`, `#enddocregion`, `#docplaster`) whose comment syntax
//! depends on the file type. Each supported comment family bundles the three
//! directive recognizers together with a formatter that wraps plaster text
//! in that family's comment delimiters.

use once_cell::sync::Lazy;
use regex::Regex;

/// Directive recognizers and plaster formatting for one comment family.
pub struct DocregionMatcher {
    region_start: Regex,
    region_end: Regex,
    plaster: Regex,
    format_plaster: fn(&str) -> String,
}

impl DocregionMatcher {
    /// Matches a region-start directive, capturing the raw name-list text.
    pub fn region_start<'a>(&self, line: &'a str) -> Option<&'a str> {
        capture(&self.region_start, line)
    }

    /// Matches a region-end directive, capturing the raw name-list text.
    pub fn region_end<'a>(&self, line: &'a str) -> Option<&'a str> {
        capture(&self.region_end, line)
    }

    /// Matches a docplaster directive, capturing the raw plaster text.
    pub fn plaster<'a>(&self, line: &'a str) -> Option<&'a str> {
        capture(&self.plaster, line)
    }

    /// Wraps plaster text in this family's comment delimiters.
    pub fn format_plaster(&self, text: &str) -> String {
        (self.format_plaster)(text)
    }
}

fn capture<'a>(pattern: &Regex, line: &'a str) -> Option<&'a str> {
    pattern
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn directive_re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("directive pattern must compile")
}

fn block_comment_plaster(text: &str) -> String {
    format!("/* {} */", text)
}

fn line_comment_plaster(text: &str) -> String {
    format!("// {}", text)
}

fn hash_comment_plaster(text: &str) -> String {
    format!("# {}", text)
}

fn html_comment_plaster(text: &str) -> String {
    format!("<!-- {} -->", text)
}

/// `/* #docregion ... */` style, e.g. CSS.
static BLOCK_COMMENT: Lazy<DocregionMatcher> = Lazy::new(|| DocregionMatcher {
    region_start: directive_re(r"^\s*/\*\s*#docregion\s*(.*?)\s*\*/\s*$"),
    region_end: directive_re(r"^\s*/\*\s*#enddocregion\s*(.*?)\s*\*/\s*$"),
    plaster: directive_re(r"^\s*/\*\s*#docplaster\s*(.*?)\s*\*/\s*$"),
    format_plaster: block_comment_plaster,
});

fn line_comment_matcher(format_plaster: fn(&str) -> String) -> DocregionMatcher {
    DocregionMatcher {
        region_start: directive_re(r"^\s*//\s*#docregion\s*(.*)$"),
        region_end: directive_re(r"^\s*//\s*#enddocregion\s*(.*)$"),
        plaster: directive_re(r"^\s*//\s*#docplaster\s*(.*)$"),
        format_plaster,
    }
}

/// `// #docregion` for matching, block-comment plaster, e.g. TS/JS and any
/// unlisted file type.
static MIXED_COMMENT: Lazy<DocregionMatcher> =
    Lazy::new(|| line_comment_matcher(block_comment_plaster));

/// `// #docregion` for matching and plaster both, for languages with no
/// block comment form, e.g. Pug and JSON.
static INLINE_COMMENT: Lazy<DocregionMatcher> =
    Lazy::new(|| line_comment_matcher(line_comment_plaster));

/// `# #docregion` (a doubled `##` prefix is tolerated), e.g. shell and YAML.
static HASH_COMMENT: Lazy<DocregionMatcher> = Lazy::new(|| DocregionMatcher {
    region_start: directive_re(r"^\s*##?\s*#docregion\s*(.*)$"),
    region_end: directive_re(r"^\s*##?\s*#enddocregion\s*(.*)$"),
    plaster: directive_re(r"^\s*##?\s*#docplaster\s*(.*)$"),
    format_plaster: hash_comment_plaster,
});

/// `<!-- #docregion -->`, e.g. HTML and SVG. The region-start recognizer
/// tolerates a missing closing `-->` so a directive can sit immediately
/// before a line break.
static HTML_COMMENT: Lazy<DocregionMatcher> = Lazy::new(|| DocregionMatcher {
    region_start: directive_re(r"^\s*<!--\s*#docregion\s*([^>]*?)\s*(?:-->\s*)?$"),
    region_end: directive_re(r"^\s*<!--\s*#enddocregion\s*(.*?)\s*-->\s*$"),
    plaster: directive_re(r"^\s*<!--\s*#docplaster\s*(.*?)\s*-->\s*$"),
    format_plaster: html_comment_plaster,
});

/// Selects the comment family for a file type (case-insensitive).
/// Unlisted types fall back to the mixed `//` family.
pub fn matcher_for(file_type: &str) -> &'static DocregionMatcher {
    match file_type.to_lowercase().as_str() {
        "conf" | "sh" | "yaml" | "yml" => &HASH_COMMENT,
        "css" => &BLOCK_COMMENT,
        "html" | "svg" => &HTML_COMMENT,
        "jade" | "json" | "json.annotated" | "pug" => &INLINE_COMMENT,
        _ => &MIXED_COMMENT,
    }
}
