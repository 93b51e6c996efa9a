use anyhow::Context;
use clap::Parser;
use regex::Regex;
use tower_lsp::{LspService, Server};

use docsnippet_language_server::logging::init_logger;
use docsnippet_language_server::lsp::backend::DocsnippetBackend;
use docsnippet_language_server::snippet::resolver::DEFAULT_EXAMPLES_PREFIX;

/// Language server for documentation code snippets.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Log level for stderr output (overrides RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,

    /// Disable ANSI colors in stderr output
    #[arg(long)]
    no_color: bool,

    /// Disable the session log file
    #[arg(long)]
    no_file_log: bool,

    /// Pattern locating the docs content root in document paths
    #[arg(long, default_value = DEFAULT_EXAMPLES_PREFIX)]
    examples_prefix: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let _guard = init_logger(args.no_color, args.log_level.as_deref(), !args.no_file_log)?;

    let examples_prefix = Regex::new(&args.examples_prefix)
        .with_context(|| format!("invalid --examples-prefix pattern: {}", args.examples_prefix))?;

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) =
        LspService::new(|client| DocsnippetBackend::new(client, examples_prefix));

    Server::new(stdin, stdout, socket).serve(service).await;

    Ok(())
}
