//! Hover, definition, and completion for code-snippet tags.
//!
//! All three features share one pipeline: find the tag under the cursor,
//! resolve its `path` attribute to an example file on disk, run the
//! docregion extractor over that file, and shape the extracted region
//! into the feature's response. Everything that is merely "nothing to
//! show" (no tag, unresolvable path, unknown region) is `Ok(None)`;
//! `Err` is reserved for superseded requests and read failures.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_lsp::lsp_types::{
    CompletionItem, Documentation, GotoDefinitionResponse, Hover, HoverContents, Location,
    MarkupContent, MarkupKind, Position, Range, Url,
};
use tracing::debug;

use crate::docregion::cache::ExtractorCache;
use crate::docregion::extractor::DocregionExtractor;
use crate::lsp::document::LspDocument;
use crate::snippet::attrs::Linenums;
use crate::snippet::locator::{snippet_at, SnippetInfo};
use crate::snippet::resolver::{file_type_of, resolve_example_path};

/// Regions longer than this get line numbers when `linenums` is absent
/// or garbage.
pub const AUTO_LINENUM_THRESHOLD: usize = 10;

/// Failures of the read-and-extract pipeline.
#[derive(Debug, Error)]
pub enum SnippetError {
    #[error("request superseded by a document change")]
    Cancelled,
    #[error("failed to read example file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type SnippetResult<T> = Result<T, SnippetError>;

/// Gate for completions: the text between the last space and the cursor
/// must be an unfinished `region=` attribute.
static REGION_ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^region=(?:"[^"]*|'[^']*)?$"#).expect("region attribute pattern must compile")
});

/// Payload carried on completion items so `completionItem/resolve` can
/// recover the example file without re-running tag detection.
#[derive(Debug, Serialize, Deserialize)]
struct ResolveData {
    example_path: String,
    file_type: String,
    region: String,
}

/// A snippet tag found under the cursor, with everything derived from
/// the document while its lock was held.
struct DetectedSnippet {
    snippet: SnippetInfo,
    tag_range: Range,
    cursor_line: String,
    cursor_byte: usize,
    document_path: String,
}

/// The example file a detected tag points at.
struct LocatedExample {
    path: String,
    file_type: String,
}

/// Intellisense provider for code-snippet tags in documentation sources.
pub struct CodeSnippetIntellisense {
    cache: Arc<ExtractorCache>,
    examples_prefix: Regex,
}

impl CodeSnippetIntellisense {
    pub fn new(cache: Arc<ExtractorCache>, examples_prefix: Regex) -> Self {
        Self {
            cache,
            examples_prefix,
        }
    }

    /// Renders the region named by the tag under `position` as a fenced
    /// markdown block, numbered per the tag's `linenums` attribute.
    pub async fn hover(
        &self,
        document: &LspDocument,
        position: Position,
    ) -> SnippetResult<Option<Hover>> {
        let cancelled = document.cancellation();
        let Some(detected) = self.detect(document, position, "Providing hover").await else {
            return Ok(None);
        };
        let Some(example) = self.locate_example(&detected).await else {
            return Ok(None);
        };
        let extractor = self.extractor_for(&example, &cancelled).await?;
        let region = detected.snippet.attrs.region.as_deref().unwrap_or("");
        let Some(info) = extractor.extract(region) else {
            return Ok(None);
        };

        let first = first_linenum(detected.snippet.attrs.linenums, info.lines.len());
        let code = with_linenums(&info.lines, first);
        let mut value = String::new();
        if let Some(header) = &detected.snippet.attrs.header {
            value.push_str(&format!("_{header}_\n\n---\n"));
        }
        value.push_str(&format!("```{}\n{}\n```", info.file_type, code));

        Ok(Some(Hover {
            contents: HoverContents::Markup(MarkupContent {
                kind: MarkupKind::Markdown,
                value,
            }),
            range: Some(detected.tag_range),
        }))
    }

    /// Returns one location in the example file per span the region was
    /// collected from.
    pub async fn definition(
        &self,
        document: &LspDocument,
        position: Position,
    ) -> SnippetResult<Option<GotoDefinitionResponse>> {
        let cancelled = document.cancellation();
        let Some(detected) = self
            .detect(document, position, "Providing definition")
            .await
        else {
            return Ok(None);
        };
        let Some(example) = self.locate_example(&detected).await else {
            return Ok(None);
        };
        let Ok(example_uri) = Url::from_file_path(&example.path) else {
            return Ok(None);
        };
        let extractor = self.extractor_for(&example, &cancelled).await?;
        let region = detected.snippet.attrs.region.as_deref().unwrap_or("");
        let Some(info) = extractor.extract(region) else {
            return Ok(None);
        };

        let locations = info
            .ranges
            .iter()
            .map(|range| {
                Location::new(
                    example_uri.clone(),
                    Range::new(
                        Position::new(range.start as u32, 0),
                        Position::new(range.end as u32, 0),
                    ),
                )
            })
            .collect();
        Ok(Some(GotoDefinitionResponse::Array(locations)))
    }

    /// Offers the example file's region names while the cursor sits in an
    /// unfinished `region=` attribute.
    pub async fn completions(
        &self,
        document: &LspDocument,
        position: Position,
        trigger: Option<char>,
    ) -> SnippetResult<Option<Vec<CompletionItem>>> {
        if !self.in_region_attribute(document, position).await {
            return Ok(None);
        }
        let cancelled = document.cancellation();
        let Some(detected) = self
            .detect(document, position, "Providing completion items")
            .await
        else {
            return Ok(None);
        };
        let Some(example) = self.locate_example(&detected).await else {
            return Ok(None);
        };
        let extractor = self.extractor_for(&example, &cancelled).await?;

        let next_char = detected.cursor_line[detected.cursor_byte..].chars().next();
        let items = extractor
            .region_names()
            .into_iter()
            .map(|name| completion_item(name, trigger, next_char, &example))
            .collect();
        Ok(Some(items))
    }

    /// Fills in the documentation of a completion item produced by
    /// [`Self::completions`]. Items without usable payload pass through
    /// unchanged.
    pub async fn resolve_completion(
        &self,
        mut item: CompletionItem,
    ) -> SnippetResult<CompletionItem> {
        let Some(data) = item
            .data
            .as_ref()
            .and_then(|value| serde_json::from_value::<ResolveData>(value.clone()).ok())
        else {
            return Ok(item);
        };
        let contents = tokio::fs::read_to_string(&data.example_path)
            .await
            .map_err(|source| SnippetError::Io {
                path: data.example_path.clone(),
                source,
            })?;
        let extractor = self.cache.get_or_create(&data.file_type, &contents);
        let Some(info) = extractor.extract(&data.region) else {
            return Ok(item);
        };
        // Resolved documentation is never line-numbered.
        item.documentation = Some(Documentation::MarkupContent(MarkupContent {
            kind: MarkupKind::Markdown,
            value: format!("```{}\n{}\n```", info.file_type, info.contents()),
        }));
        Ok(item)
    }

    async fn detect(
        &self,
        document: &LspDocument,
        position: Position,
        action: &str,
    ) -> Option<DetectedSnippet> {
        let state = document.state.read().await;
        debug!(
            "{action} for '{}:{}:{}'...",
            state.path, position.line, position.character
        );

        let byte_position = state.byte_position(position)?;
        let snippet = snippet_at(&state.text, byte_position)?;
        debug!("  Detected code snippet: {}", snippet.raw.contents);

        let tag_range = Range::new(
            state.lsp_position(snippet.raw.start),
            state.lsp_position(snippet.raw.end),
        );
        let cursor_line = state.line_text(byte_position.line)?;
        Some(DetectedSnippet {
            snippet,
            tag_range,
            cursor_line,
            cursor_byte: byte_position.character,
            document_path: state.path.clone(),
        })
    }

    async fn locate_example(&self, detected: &DetectedSnippet) -> Option<LocatedExample> {
        let path = resolve_example_path(
            &self.examples_prefix,
            &detected.document_path,
            &detected.snippet.attrs.path,
        )?;
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return None;
        }
        debug!("  Located example file: {path}");
        let file_type = file_type_of(&path).to_string();
        Some(LocatedExample { path, file_type })
    }

    /// Reads the example file and hands back a (possibly cached)
    /// extractor for it. Bails out if the document changed while the
    /// file was being read.
    async fn extractor_for(
        &self,
        example: &LocatedExample,
        cancelled: &AtomicBool,
    ) -> SnippetResult<Arc<DocregionExtractor>> {
        let contents = tokio::fs::read_to_string(&example.path)
            .await
            .map_err(|source| SnippetError::Io {
                path: example.path.clone(),
                source,
            })?;
        if cancelled.load(Ordering::SeqCst) {
            return Err(SnippetError::Cancelled);
        }
        Ok(self.cache.get_or_create(&example.file_type, &contents))
    }

    async fn in_region_attribute(&self, document: &LspDocument, position: Position) -> bool {
        let state = document.state.read().await;
        let Some(byte_position) = state.byte_position(position) else {
            return false;
        };
        let Some(line) = state.line_text(byte_position.line) else {
            return false;
        };
        is_in_region_attribute(&line, byte_position.character)
    }
}

fn completion_item(
    name: &str,
    trigger: Option<char>,
    next_char: Option<char>,
    example: &LocatedExample,
) -> CompletionItem {
    let insert_text = match trigger {
        Some('=') => format!("\"{name}\""),
        Some(quote @ ('"' | '\'')) if next_char != Some(quote) => format!("{name}{quote}"),
        _ => name.to_string(),
    };
    let data = serde_json::to_value(ResolveData {
        example_path: example.path.clone(),
        file_type: example.file_type.clone(),
        region: name.to_string(),
    })
    .ok();

    CompletionItem {
        label: if name.is_empty() {
            "<default>".to_string()
        } else {
            name.to_string()
        },
        filter_text: Some(name.to_string()),
        insert_text: Some(insert_text),
        data,
        ..Default::default()
    }
}

/// Whether the text from the character after the last space up to the
/// cursor is an unfinished `region=` attribute.
fn is_in_region_attribute(line: &str, cursor_byte: usize) -> bool {
    let cursor = cursor_byte.min(line.len());
    // A space exactly at the cursor leaves an empty window.
    if line[cursor..].starts_with(' ') {
        return false;
    }
    let attr_start = line[..cursor].rfind(' ').map_or(0, |idx| idx + 1);
    REGION_ATTR_RE.is_match(&line[attr_start..cursor])
}

/// The first line number to render, or `None` to skip numbering. The
/// `linenums` attribute decides, with length-based auto mode as default.
fn first_linenum(linenums: Linenums, line_count: usize) -> Option<i64> {
    let first = match linenums {
        Linenums::Off => -1,
        Linenums::On => 1,
        Linenums::Auto => {
            if line_count > AUTO_LINENUM_THRESHOLD {
                1
            } else {
                -1
            }
        }
        Linenums::From(n) => n,
    };
    (first > -1).then_some(first)
}

/// Joins the lines, prefixing each with a right-aligned line number when
/// numbering is on. The column is sized for the largest number printed.
fn with_linenums(lines: &[String], first_linenum: Option<i64>) -> String {
    let Some(first) = first_linenum else {
        return lines.join("\n");
    };
    let width = (first + lines.len() as i64).to_string().len();
    lines
        .iter()
        .enumerate()
        .map(|(offset, line)| format!("{:>width$}. {line}", first + offset as i64))
        .collect::<Vec<_>>()
        .join("\n")
}
