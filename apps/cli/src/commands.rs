//! CLI command definitions, routing, and tracing setup.

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use larkdoc_core::{DocumentPipeline, FAILURE_PREFIX, PipelineStage, ProgressReporter};
use larkdoc_shared::{AppConfig, init_config, load_config};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// larkdoc: summarize Lark documents for AI clients.
#[derive(Parser)]
#[command(
    name = "larkdoc",
    version,
    about = "Serve Lark document summaries over MCP, or fetch them from the terminal.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Summarize a document and print the result.
    Analyze {
        /// Lark document URL (`/docx/<token>` or `/wiki/<token>`).
        url: String,
    },

    /// Print the raw text of a document.
    Fetch {
        /// Lark document URL (`/docx/<token>` or `/wiki/<token>`).
        url: String,
    },

    /// MCP server operations.
    #[command(name = "mcp")]
    Mcp {
        /// Subcommand for MCP operations.
        #[command(subcommand)]
        action: McpAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// MCP server subcommands.
#[derive(Subcommand)]
pub(crate) enum McpAction {
    /// Serve the document tools over stdio.
    Serve,
    /// Print MCP client configuration snippets.
    Config {
        /// Target client: vscode, claude-desktop, or cursor.
        #[arg(long, default_value = "vscode")]
        target: String,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
///
/// Logs always go to stderr; stdout carries MCP frames or command output.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "larkdoc=info",
        1 => "larkdoc=debug",
        _ => "larkdoc=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Analyze { url } => cmd_analyze(&url).await,
        Command::Fetch { url } => cmd_fetch(&url).await,
        Command::Mcp { action } => match action {
            McpAction::Serve => cmd_mcp_serve().await,
            McpAction::Config { target } => cmd_mcp_config(&target),
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

/// Load the TOML config and layer credentials from the environment on top.
fn runtime_config() -> Result<AppConfig> {
    Ok(load_config()?.with_env())
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_analyze(url: &str) -> Result<()> {
    let pipeline = DocumentPipeline::new(&runtime_config()?)?;
    let progress = CliProgress::new();
    let text = pipeline.analyze_with(url, &progress).await;
    emit(text)
}

async fn cmd_fetch(url: &str) -> Result<()> {
    let pipeline = DocumentPipeline::new(&runtime_config()?)?;
    let progress = CliProgress::new();
    let text = pipeline.read_content_with(url, &progress).await;
    emit(text)
}

/// Print a pipeline result, turning failure text into a non-zero exit.
fn emit(text: String) -> Result<()> {
    if text.starts_with(FAILURE_PREFIX) {
        return Err(eyre!(text));
    }
    println!("{text}");
    Ok(())
}

async fn cmd_mcp_serve() -> Result<()> {
    let config = runtime_config()?;
    if config.credentials.app_id.is_empty() || config.credentials.api_key.is_empty() {
        tracing::warn!("APP_ID or ARK_API_KEY is not set; upstream calls will be rejected");
    }
    let pipeline = DocumentPipeline::new(&config)?;
    info!(model = %config.ark.model, "serving document tools");
    larkdoc_mcp::serve_stdio(pipeline).await?;
    Ok(())
}

fn cmd_mcp_config(target: &str) -> Result<()> {
    let command = std::env::current_exe()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| "larkdoc".to_string());

    let env = serde_json::json!({
        "APP_ID": "",
        "APP_SECRET": "",
        "ARK_API_KEY": "",
        "ARK_MODEL": "",
    });

    let (header, config) = match target {
        "vscode" => (
            "// .vscode/mcp.json",
            serde_json::json!({
                "servers": {
                    "larkdoc": {
                        "type": "stdio",
                        "command": command,
                        "args": ["mcp", "serve"],
                        "env": env,
                    }
                }
            }),
        ),
        "claude-desktop" => (
            "// claude_desktop_config.json",
            serde_json::json!({
                "mcpServers": {
                    "larkdoc": {
                        "command": command,
                        "args": ["mcp", "serve"],
                        "env": env,
                    }
                }
            }),
        ),
        "cursor" => (
            "// Cursor MCP settings",
            serde_json::json!({
                "mcpServers": {
                    "larkdoc": {
                        "command": command,
                        "args": ["mcp", "serve"],
                        "env": env,
                    }
                }
            }),
        ),
        _ => {
            return Err(eyre!(
                "unknown config target '{target}': expected 'vscode', 'claude-desktop', or 'cursor'"
            ));
        }
    };

    println!("{header}");
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config = runtime_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");

    let status = |v: &str| if v.is_empty() { "missing" } else { "set" };
    println!("# credentials (from environment)");
    println!("# app_id      = {}", status(&config.credentials.app_id));
    println!("# app_secret  = {}", status(&config.credentials.app_secret));
    println!("# ark_api_key = {}", status(&config.credentials.api_key));
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner on stderr.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn stage(&self, stage: PipelineStage) {
        let msg = match stage {
            PipelineStage::Start => "Starting",
            PipelineStage::ResolvingUrl => "Resolving URL",
            PipelineStage::FetchingToken => "Requesting tenant token",
            PipelineStage::LocatingDocument => "Locating document",
            PipelineStage::FetchingContent => "Fetching content",
            PipelineStage::Summarizing => "Summarizing",
            PipelineStage::Done | PipelineStage::Failed => {
                self.spinner.finish_and_clear();
                return;
            }
        };
        self.spinner.set_message(msg);
    }
}
