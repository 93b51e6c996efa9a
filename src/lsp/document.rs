//! Open-document state for the LSP server.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ropey::Rope;
use tokio::sync::RwLock;
use tower_lsp::lsp_types::{Position, TextDocumentContentChangeEvent, Url};

use crate::snippet::locator::{TextLines, TextPosition};

/// State for an open text document managed by the LSP server.
#[derive(Debug)]
pub struct LspDocumentState {
    pub uri: Url,
    /// Filesystem path of the document, used for path-prefix matching and
    /// log lines. Falls back to the URI path for non-file schemes.
    pub path: String,
    pub text: Rope,
    pub version: i32,
}

/// An open document with a cancellation token for requests in flight.
#[derive(Debug)]
pub struct LspDocument {
    pub id: u32,
    pub state: RwLock<LspDocumentState>,
    cancel_flag: parking_lot::Mutex<Arc<AtomicBool>>,
}

fn strip_terminator(mut line: String) -> String {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    line
}

/// Byte column for a UTF-16 column, clamped to the end of the line. A
/// column landing inside a surrogate pair rounds up to the next char.
pub fn utf16_to_byte_column(line: &str, utf16_column: usize) -> usize {
    let mut units = 0;
    for (byte_idx, ch) in line.char_indices() {
        if units >= utf16_column {
            return byte_idx;
        }
        units += ch.len_utf16();
    }
    line.len()
}

/// UTF-16 column for a byte column, clamped to the end of the line.
pub fn byte_to_utf16_column(line: &str, byte_column: usize) -> usize {
    let mut end = byte_column.min(line.len());
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    line[..end].chars().map(char::len_utf16).sum()
}

impl TextLines for Rope {
    fn line_count(&self) -> usize {
        self.len_lines()
    }

    fn line(&self, index: usize) -> String {
        strip_terminator(Rope::line(self, index).to_string())
    }
}

impl LspDocumentState {
    /// Text of one line without its terminator, or `None` past the end of
    /// the document.
    pub fn line_text(&self, index: usize) -> Option<String> {
        if index >= self.text.len_lines() {
            return None;
        }
        Some(strip_terminator(self.text.line(index).to_string()))
    }

    /// Line + byte column for an LSP (UTF-16) position, or `None` when
    /// the line is past the end of the document.
    pub fn byte_position(&self, position: Position) -> Option<TextPosition> {
        let line = self.line_text(position.line as usize)?;
        Some(TextPosition::new(
            position.line as usize,
            utf16_to_byte_column(&line, position.character as usize),
        ))
    }

    /// LSP (UTF-16) position for a line + byte column.
    pub fn lsp_position(&self, position: TextPosition) -> Position {
        let character = self
            .line_text(position.line)
            .map(|line| byte_to_utf16_column(&line, position.character))
            .unwrap_or(0);
        Position::new(position.line as u32, character as u32)
    }

    /// Rope char index for an LSP position, clamping past-the-end
    /// positions to the end of the document.
    fn position_to_char(&self, position: Position) -> usize {
        let line_idx = position.line as usize;
        let Some(line) = self.line_text(line_idx) else {
            return self.text.len_chars();
        };
        let byte = utf16_to_byte_column(&line, position.character as usize);
        self.text.line_to_char(line_idx) + line[..byte].chars().count()
    }

    /// Applies a list of content changes in order. Returns an error and
    /// leaves the text untouched when the version is not newer than the
    /// stored one.
    pub fn apply(
        &mut self,
        changes: Vec<TextDocumentContentChangeEvent>,
        version: i32,
    ) -> Result<(), String> {
        if version <= self.version {
            return Err(format!(
                "version {} not newer than {}",
                version, self.version
            ));
        }
        for change in &changes {
            if let Some(range) = change.range {
                let start = self.position_to_char(range.start);
                let end = self.position_to_char(range.end);
                self.text.remove(start..end);
                self.text.insert(start, &change.text);
            } else {
                self.text = Rope::from_str(&change.text);
            }
        }
        self.version = version;
        Ok(())
    }
}

impl LspDocument {
    pub fn new(id: u32, uri: Url, text: &str, version: i32) -> Self {
        let path = uri
            .to_file_path()
            .map(|path| path.to_string_lossy().into_owned())
            .unwrap_or_else(|_| uri.path().to_string());
        Self {
            id,
            state: RwLock::new(LspDocumentState {
                uri,
                path,
                text: Rope::from_str(text),
                version,
            }),
            cancel_flag: parking_lot::Mutex::new(Arc::new(AtomicBool::new(false))),
        }
    }

    /// Returns the URI of the document.
    pub async fn uri(&self) -> Url {
        self.state.read().await.uri.clone()
    }

    /// Returns the current text of the document as a string.
    pub async fn text(&self) -> String {
        self.state.read().await.text.to_string()
    }

    /// Returns the current version of the document.
    pub async fn version(&self) -> i32 {
        self.state.read().await.version
    }

    /// Token observed by requests in flight on this document. It is set
    /// once the document changes, after which the request's results no
    /// longer apply.
    pub fn cancellation(&self) -> Arc<AtomicBool> {
        self.cancel_flag.lock().clone()
    }

    fn cancel_in_flight(&self) {
        let superseded = std::mem::replace(
            &mut *self.cancel_flag.lock(),
            Arc::new(AtomicBool::new(false)),
        );
        superseded.store(true, Ordering::SeqCst);
    }

    /// Applies content changes, cancelling any requests still running
    /// against the previous text.
    pub async fn apply(
        &self,
        changes: Vec<TextDocumentContentChangeEvent>,
        version: i32,
    ) -> Result<(), String> {
        let mut state = self.state.write().await;
        state.apply(changes, version)?;
        drop(state);
        self.cancel_in_flight();
        Ok(())
    }

    /// Marks the document closed, cancelling any requests in flight.
    pub fn close(&self) {
        self.cancel_in_flight();
    }
}
