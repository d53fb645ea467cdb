//! larkdoc CLI for Lark document summarization over MCP.
//!
//! Runs the stdio MCP server used by editor and desktop clients, and offers
//! one-shot commands for trying the pipeline from a terminal.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
