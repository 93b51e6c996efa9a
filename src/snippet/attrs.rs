//! Snippet tag attribute parsing.
//!
//! Attributes come either as `key="value"` pairs (single or double
//! quotes) or, inside `{@example ...}` tags, as bare positional tokens.
//! Key/value pairs win over positionals, and a tag without a usable
//! `path` is not a snippet at all.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::snippet::TagSyntax;

/// Line-numbering mode requested by a snippet tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linenums {
    /// `linenums="false"`: never number.
    Off,
    /// `linenums="true"`: number from 1.
    On,
    /// No attribute, or a value that is neither boolean nor numeric:
    /// number long snippets only.
    Auto,
    /// `linenums="<n>"`: number from `n`.
    From(i64),
}

/// Attributes of one snippet tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeInfo {
    /// Example file path, relative to the `examples/` directory.
    pub path: String,
    /// Docregion to show. `None` means the whole file.
    pub region: Option<String>,
    /// Header text displayed above the snippet.
    pub header: Option<String>,
    pub linenums: Linenums,
}

fn attr_re(name: &str) -> Regex {
    // Quote alternation keeps the value's closing quote matched with its
    // opening one.
    Regex::new(&format!(r#"(?i)\s{name}=(?:"([^"]*)"|'([^']*)')"#))
        .expect("attribute pattern must compile")
}

static LINENUMS_RE: Lazy<Regex> = Lazy::new(|| attr_re("linenums"));
static PATH_RE: Lazy<Regex> = Lazy::new(|| attr_re("path"));
static REGION_RE: Lazy<Regex> = Lazy::new(|| attr_re("region"));
static HEADER_RE: Lazy<Regex> = Lazy::new(|| attr_re("header"));
static TITLE_RE: Lazy<Regex> = Lazy::new(|| attr_re("title"));

/// Any quoted `key="value"` pair, for stripping before positional
/// token extraction.
static KV_PAIR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\s[\w-]+=(?:"[^"]*"|'[^']*')"#).expect("key/value pattern must compile")
});

fn attr_value(re: &Regex, contents: &str) -> Option<String> {
    let caps = re.captures(contents)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Positional tokens of a `{@example ...}` tag: everything left after
/// the tag markers and the quoted key/value pairs are removed.
fn brace_positionals(contents: &str) -> Vec<String> {
    let body = contents.strip_prefix("{@example").unwrap_or(contents);
    let body = body.strip_suffix('}').unwrap_or(body);
    let stripped = KV_PAIR_RE.replace_all(body, " ");
    stripped.split_whitespace().map(str::to_string).collect()
}

fn parse_linenums(value: Option<String>) -> Linenums {
    match value.as_deref() {
        None => Linenums::Auto,
        Some("false") => Linenums::Off,
        Some("true") => Linenums::On,
        Some(value) => value
            .trim()
            .parse::<i64>()
            .map(Linenums::From)
            .unwrap_or(Linenums::Auto),
    }
}

/// Parses the attributes of a raw tag. `None` when the tag carries no
/// non-empty `path`.
pub fn parse_attributes(contents: &str, syntax: TagSyntax) -> Option<AttributeInfo> {
    let positionals = match syntax {
        TagSyntax::Html => Vec::new(),
        TagSyntax::Brace => brace_positionals(contents),
    };
    let positional = |idx: usize| positionals.get(idx).cloned();

    let path = non_empty(attr_value(&PATH_RE, contents)).or_else(|| positional(0))?;
    let region = non_empty(attr_value(&REGION_RE, contents)).or_else(|| positional(1));
    let header = non_empty(attr_value(&HEADER_RE, contents))
        .or_else(|| non_empty(attr_value(&TITLE_RE, contents)))
        .or_else(|| positional(2));
    let linenums = parse_linenums(attr_value(&LINENUMS_RE, contents));

    Some(AttributeInfo {
        path,
        region,
        header,
        linenums,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn html(contents: &str) -> Option<AttributeInfo> {
        parse_attributes(contents, TagSyntax::Html)
    }

    fn brace(contents: &str) -> Option<AttributeInfo> {
        parse_attributes(contents, TagSyntax::Brace)
    }

    #[test]
    fn test_extracts_quoted_attributes() {
        let attrs = html(
            r#"<code-example path="a/b.ts" region="reg" header="Head" linenums="4"></code-example>"#,
        )
        .unwrap();
        assert_eq!(attrs.path, "a/b.ts");
        assert_eq!(attrs.region.as_deref(), Some("reg"));
        assert_eq!(attrs.header.as_deref(), Some("Head"));
        assert_eq!(attrs.linenums, Linenums::From(4));
    }

    #[test]
    fn test_single_and_double_quotes_are_interchangeable() {
        let double = html(r#"<code-example path="a/b.ts" region="reg">"#).unwrap();
        let single = html(r#"<code-example path='a/b.ts' region='reg'>"#).unwrap();
        assert_eq!(double, single);
    }

    #[test]
    fn test_quote_styles_can_be_mixed_and_nested() {
        let attrs = html(r#"<code-example path="p" region="foo'bar" header='baz"qux'>"#).unwrap();
        assert_eq!(attrs.region.as_deref(), Some("foo'bar"));
        assert_eq!(attrs.header.as_deref(), Some(r#"baz"qux"#));
    }

    #[test]
    fn test_missing_path_yields_none() {
        assert_eq!(html("<code-example></code-example>"), None);
        assert_eq!(html(r#"<code-example region="foo">"#), None);
        assert_eq!(html(r#"<code-example path="">"#), None);
        assert_eq!(
            brace(r#"{@example linenums="foo" region="bar" title="baz"}"#),
            None
        );
    }

    #[test]
    fn test_lookalike_attribute_names_do_not_count_as_path() {
        assert_eq!(html(r#"<code-example notpath="foo">"#), None);
        assert_eq!(html(r#"<code-example pathnot="foo">"#), None);
        assert_eq!(html(r#"<code-example path-neither="foo">"#), None);
    }

    #[test]
    fn test_attribute_names_are_case_insensitive() {
        let attrs = html(r#"<code-example PATH="p" Region="r">"#).unwrap();
        assert_eq!(attrs.path, "p");
        assert_eq!(attrs.region.as_deref(), Some("r"));
    }

    #[test]
    fn test_brace_positional_attributes() {
        let attrs = brace("{@example foo/bar.ts baz qux}").unwrap();
        assert_eq!(attrs.path, "foo/bar.ts");
        assert_eq!(attrs.region.as_deref(), Some("baz"));
        assert_eq!(attrs.header.as_deref(), Some("qux"));
    }

    #[test]
    fn test_brace_positionals_skip_key_value_pairs() {
        let attrs = brace(r#"{@example foo linenums="true" bar title="baz"}"#).unwrap();
        assert_eq!(attrs.path, "foo");
        assert_eq!(attrs.region.as_deref(), Some("bar"));
        assert_eq!(attrs.header.as_deref(), Some("baz"));
        assert_eq!(attrs.linenums, Linenums::On);

        let attrs = brace(r#"{@example foo linenums="true" bar baz}"#).unwrap();
        assert_eq!(attrs.region.as_deref(), Some("bar"));
        assert_eq!(attrs.header.as_deref(), Some("baz"));
    }

    #[test]
    fn test_brace_positionals_span_lines() {
        let attrs = brace("{@example foo bar baz\n    linenums=\"true\"\n}").unwrap();
        assert_eq!(attrs.path, "foo");
        assert_eq!(attrs.region.as_deref(), Some("bar"));
        assert_eq!(attrs.header.as_deref(), Some("baz"));
        assert_eq!(attrs.linenums, Linenums::On);
    }

    #[test]
    fn test_key_value_pairs_win_over_positionals() {
        let attrs = brace(r#"{@example kv-loses region="kv-wins" positional}"#).unwrap();
        assert_eq!(attrs.path, "kv-loses");
        assert_eq!(attrs.region.as_deref(), Some("kv-wins"));
    }

    #[test]
    fn test_header_falls_back_to_title() {
        let titled = html(r#"<code-example path="p" title="The Title">"#).unwrap();
        assert_eq!(titled.header.as_deref(), Some("The Title"));

        let both = html(r#"<code-example path="p" header="H" title="T">"#).unwrap();
        assert_eq!(both.header.as_deref(), Some("H"));
    }

    #[test]
    fn test_linenums_values() {
        let linenums = |tag: &str| html(tag).unwrap().linenums;
        assert_eq!(linenums(r#"<code-example path="p">"#), Linenums::Auto);
        assert_eq!(
            linenums(r#"<code-example path="p" linenums="false">"#),
            Linenums::Off
        );
        assert_eq!(
            linenums(r#"<code-example path="p" linenums="true">"#),
            Linenums::On
        );
        assert_eq!(
            linenums(r#"<code-example path="p" linenums="42">"#),
            Linenums::From(42)
        );
        assert_eq!(
            linenums(r#"<code-example path="p" linenums="bar">"#),
            Linenums::Auto
        );
    }

    #[test]
    fn test_empty_attribute_values_fall_through() {
        let attrs = html(r#"<code-example path="p" region="" header="">"#).unwrap();
        assert_eq!(attrs.region, None);
        assert_eq!(attrs.header, None);

        // An empty key/value pair leaves the positional slot in effect.
        let attrs = brace(r#"{@example foo region="" bar}"#).unwrap();
        assert_eq!(attrs.region.as_deref(), Some("bar"));
    }
}
