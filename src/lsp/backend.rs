//! LSP backend wiring the document lifecycle to the snippet providers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use dashmap::DashMap;
use regex::Regex;
use tower_lsp::jsonrpc;
use tower_lsp::lsp_types::{
    CompletionItem, CompletionOptions, CompletionParams, CompletionResponse,
    DidChangeTextDocumentParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams,
    GotoDefinitionParams, GotoDefinitionResponse, Hover, HoverParams, HoverProviderCapability,
    InitializeParams, InitializeResult, InitializedParams, MessageType, OneOf,
    ServerCapabilities, ServerInfo, TextDocumentSyncCapability, TextDocumentSyncKind, Url,
};
use tower_lsp::{Client, LanguageServer};
use tracing::{debug, info, warn};

use crate::docregion::cache::ExtractorCache;
use crate::lsp::document::LspDocument;
use crate::lsp::intellisense::{CodeSnippetIntellisense, SnippetError};

/// The docsnippet language server.
pub struct DocsnippetBackend {
    client: Client,
    documents_by_uri: DashMap<Url, Arc<LspDocument>>,
    documents_by_id: DashMap<u32, Arc<LspDocument>>,
    serial_document_id: AtomicU32,
    intellisense: CodeSnippetIntellisense,
}

impl DocsnippetBackend {
    pub fn new(client: Client, examples_prefix: Regex) -> Self {
        let cache = Arc::new(ExtractorCache::new());
        Self {
            client,
            documents_by_uri: DashMap::new(),
            documents_by_id: DashMap::new(),
            serial_document_id: AtomicU32::new(0),
            intellisense: CodeSnippetIntellisense::new(cache, examples_prefix),
        }
    }

    /// Generates a unique document id.
    fn next_document_id(&self) -> u32 {
        self.serial_document_id.fetch_add(1, Ordering::SeqCst)
    }

    fn document(&self, uri: &Url) -> Option<Arc<LspDocument>> {
        self.documents_by_uri
            .get(uri)
            .map(|entry| entry.value().clone())
    }
}

fn to_rpc_error(err: SnippetError) -> jsonrpc::Error {
    match &err {
        SnippetError::Cancelled => jsonrpc::Error::request_cancelled(),
        SnippetError::Io { .. } => {
            warn!("{err}");
            jsonrpc::Error::internal_error()
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for DocsnippetBackend {
    async fn initialize(&self, params: InitializeParams) -> jsonrpc::Result<InitializeResult> {
        info!("Received initialize request: {params:?}");
        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::INCREMENTAL,
                )),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                definition_provider: Some(OneOf::Left(true)),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(vec![
                        "=".to_string(),
                        "\"".to_string(),
                        "'".to_string(),
                    ]),
                    resolve_provider: Some(true),
                    ..Default::default()
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            ..Default::default()
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        info!("Server initialized");
        self.client
            .log_message(MessageType::INFO, "docsnippet language server initialized")
            .await;
    }

    async fn shutdown(&self) -> jsonrpc::Result<()> {
        info!("Received shutdown request");
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri.clone();
        let version = params.text_document.version;
        info!("Opening document: URI={uri}, version={version}");

        let id = self.next_document_id();
        let document = Arc::new(LspDocument::new(
            id,
            uri.clone(),
            &params.text_document.text,
            version,
        ));
        self.documents_by_uri.insert(uri, document.clone());
        self.documents_by_id.insert(id, document);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;
        debug!("Changing document: URI={uri}, version={version}");

        let Some(document) = self.document(&uri) else {
            warn!("Failed to find document with URI={uri}");
            return;
        };
        if let Err(err) = document.apply(params.content_changes, version).await {
            warn!("Failed to apply changes to URI={uri}: {err}");
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        if let Some((_, document)) = self.documents_by_uri.remove(&uri) {
            self.documents_by_id.remove(&document.id);
            document.close();
            info!("Closed document: URI={uri}, id={}", document.id);
        } else {
            warn!("Failed to find document with URI={uri}");
        }
    }

    async fn hover(&self, params: HoverParams) -> jsonrpc::Result<Option<Hover>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        let Some(document) = self.document(&uri) else {
            return Ok(None);
        };
        self.intellisense
            .hover(&document, position)
            .await
            .map_err(to_rpc_error)
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> jsonrpc::Result<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        let Some(document) = self.document(&uri) else {
            return Ok(None);
        };
        self.intellisense
            .definition(&document, position)
            .await
            .map_err(to_rpc_error)
    }

    async fn completion(
        &self,
        params: CompletionParams,
    ) -> jsonrpc::Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;
        let trigger = params
            .context
            .as_ref()
            .and_then(|context| context.trigger_character.as_deref())
            .and_then(|trigger| trigger.chars().next());
        let Some(document) = self.document(&uri) else {
            return Ok(None);
        };
        let items = self
            .intellisense
            .completions(&document, position, trigger)
            .await
            .map_err(to_rpc_error)?;
        Ok(items.map(CompletionResponse::Array))
    }

    async fn completion_resolve(&self, item: CompletionItem) -> jsonrpc::Result<CompletionItem> {
        self.intellisense
            .resolve_completion(item)
            .await
            .map_err(to_rpc_error)
    }
}
