pub mod docregion;
pub mod logging;
pub mod lsp;
pub mod snippet;
