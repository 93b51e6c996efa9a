//! Code-snippet tag recognition in documentation sources.
//!
//! Documentation files embed example code through snippet tags that name
//! an example file and, optionally, a docregion inside it. This module
//! finds the tag enclosing a cursor position, parses its attributes, and
//! resolves the example file it points at.

pub mod attrs;
pub mod locator;
pub mod resolver;

/// The two snippet markup families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagSyntax {
    /// `<code-example ...>` / `<code-pane ...>` elements with
    /// `key="value"` attributes.
    Html,
    /// `{@example ...}` doc tags with positional attributes (path, then
    /// region, then title) besides `key="value"` pairs.
    Brace,
}
