//! Example-file path resolution.
//!
//! A snippet tag's `path` is relative to an `examples/` directory that
//! sits next to the guides under the docs content root. The containing
//! document's own path tells us where that root is.

use regex::Regex;

/// Default pattern locating the docs content root in a document path.
/// Everything up to and including the last `aio/content/` component.
pub const DEFAULT_EXAMPLES_PREFIX: &str = r"(?i)^.*[\\/]aio[\\/]content[\\/]";

/// Resolves a tag's relative example path against the path of the
/// document containing the tag. `None` when the document is not under a
/// recognized docs content root.
pub fn resolve_example_path(
    prefix: &Regex,
    document_path: &str,
    relative_path: &str,
) -> Option<String> {
    let matched = prefix.find(document_path)?;
    Some(format!("{}examples/{}", matched.as_str(), relative_path))
}

/// File type of a path: the text after the last `.` of the final
/// component, unless that dot is the component's first character.
pub fn file_type_of(path: &str) -> &str {
    let component = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match component.rfind('.') {
        Some(idx) if idx > 0 => &component[idx + 1..],
        _ => "",
    }
}
