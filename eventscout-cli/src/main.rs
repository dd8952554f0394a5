//! eventscout CLI - ask Gemini about events and run traced Custom Search queries.

#![allow(clippy::print_stdout)]

mod config;
mod error;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{ArgAction, Args, Parser, Subcommand};
use eventscout::llms::{Gemini, GeminiConfig};
use eventscout::message::Content;
use eventscout::query::{CityWithRadius, SearchInputParameters};
use eventscout::runner::{RunOutcome, SearchRunner};
use eventscout::search::{GoogleCustomSearch, GoogleSearchConfig, invoke_traced_search};
use eventscout::tool::Tool;
use eventscout::trace::{Langfuse, TraceContext};
use serde_json::json;
use tracing::{Level, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{
    AppConfig, config_path as default_config_path, init_config_at, load_config_from,
};
use crate::error::Result;

const DEFAULT_PROMPT: &str = "Do you have the tool GoogleCustomSearch enabled? Demonstrate it performing a search for \"latest trends in renewable energy\".";

/// eventscout - find events with Gemini and Google Custom Search.
#[derive(Parser)]
#[command(name = "eventscout")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, env = "EVENTSCOUT_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the model a question, letting it search the web
    Ask(AskArgs),
    /// Search for events in one or more cities
    Search(SearchArgs),
    /// Show configuration and credential status
    Status,
    /// Manage configuration
    Config(ConfigArgs),
}

#[derive(Args)]
struct AskArgs {
    /// Prompt to send
    prompt: Option<String>,

    /// Model to use (overrides config and GEMINI_MODEL)
    #[arg(short, long)]
    model: Option<String>,
}

#[derive(Args)]
struct SearchArgs {
    /// Field of interest, e.g. "AI conferences"
    #[arg(short, long)]
    field: String,

    /// City to search in (repeatable)
    #[arg(short = 'C', long = "city", required = true)]
    cities: Vec<String>,
}

#[derive(Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Show configuration file path
    Path,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("failed to create tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "eventscout_cli={level},eventscout={level},reqwest=warn,hyper=warn"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbosity >= 2)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config_file = cli.config.unwrap_or_else(default_config_path);

    match cli.command {
        Commands::Ask(args) => cmd_ask(args, &config_file).await,
        Commands::Search(args) => cmd_search(args, &config_file).await,
        Commands::Status => cmd_status(&config_file).await,
        Commands::Config(args) => cmd_config(args, &config_file).await,
    }
}

fn search_client(config: &AppConfig) -> Result<GoogleCustomSearch> {
    let search_config = config.apply_search(GoogleSearchConfig::from_env()?);
    Ok(GoogleCustomSearch::new(search_config)?)
}

fn langfuse(config: &AppConfig) -> Option<Langfuse> {
    if config.tracing.langfuse {
        Langfuse::from_env()
    } else {
        info!("Langfuse tracing disabled in config");
        None
    }
}

async fn flush(langfuse: Option<&Langfuse>) {
    if let Some(langfuse) = langfuse {
        match langfuse.flush().await {
            Ok(sent) => info!(events = sent, "Flushed Langfuse events"),
            Err(e) => warn!(error = %e, "Failed to flush Langfuse events"),
        }
    }
}

async fn cmd_ask(args: AskArgs, config_file: &Path) -> Result<()> {
    let config = load_config_from(config_file).await?;

    let gemini = Gemini::from_env()?;
    let search = Arc::new(search_client(&config)?);
    let tool = search.definition();

    let mut options = config.run_options();
    if let Some(model) = args.model {
        options = options.with_model(model);
    }

    let prompt = args.prompt.as_deref().unwrap_or(DEFAULT_PROMPT);
    let langfuse = langfuse(&config);
    let trace = langfuse
        .as_ref()
        .map(|lf| lf.trace(&config.tracing.trace_name, Some(json!({ "prompt": prompt }))));

    let runner = SearchRunner::new(Arc::new(gemini), search, tool).with_options(options);
    let result = runner
        .run(prompt, trace.as_ref().map(|t| t as &dyn TraceContext))
        .await;

    flush(langfuse.as_ref()).await;
    let outcome = result?;

    print!("{}", render_outcome(&outcome)?);

    info!(usage = %outcome.usage, "Run complete");
    Ok(())
}

/// Console transcript of a run: first reply, tool notice, final answer.
fn render_outcome(outcome: &RunOutcome) -> Result<String> {
    let mut out = String::new();

    if let Some(preamble) = &outcome.preamble {
        out.push_str(preamble);
        out.push('\n');
    }
    if outcome.requested_tools() {
        out.push_str("\nTool calls detected. Executing tools...\n");
    }

    out.push_str("\nFinal AI Response (after processing tools):\n");
    match &outcome.response.message.content {
        Some(Content::Text(text)) => out.push_str(text),
        Some(parts) => out.push_str(&serde_json::to_string_pretty(parts)?),
        None => {}
    }
    out.push('\n');

    Ok(out)
}

async fn cmd_search(args: SearchArgs, config_file: &Path) -> Result<()> {
    let config = load_config_from(config_file).await?;

    let params = args
        .cities
        .into_iter()
        .fold(SearchInputParameters::new(args.field), |params, city| {
            params.location(CityWithRadius::new(city))
        });
    let queries = params.queries()?;

    let search = search_client(&config)?;
    let langfuse = langfuse(&config);
    let trace = langfuse
        .as_ref()
        .map(|lf| lf.trace(&config.tracing.trace_name, Some(json!(params))));
    let trace_ref = trace.as_ref().map(|t| t as &dyn TraceContext);

    let mut outcome = Ok(());
    for query in &queries {
        match invoke_traced_search(&search, query, trace_ref).await {
            Ok(results) => {
                println!("# {query}");
                println!("{results}\n");
            }
            Err(e) => {
                outcome = Err(e.into());
                break;
            }
        }
    }

    flush(langfuse.as_ref()).await;
    outcome
}

async fn cmd_status(config_file: &Path) -> Result<()> {
    println!("eventscout Status\n");

    println!("Configuration:");
    println!("  Path:   {}", config_file.display());
    println!(
        "  Exists: {}",
        if config_file.exists() { "yes" } else { "no" }
    );

    if config_file.exists() {
        match load_config_from(config_file).await {
            Ok(config) => {
                println!("  Valid:  yes");
                println!();
                println!("Model:");
                println!(
                    "  Name:        {}",
                    config.model.name.as_deref().unwrap_or(GeminiConfig::DEFAULT_MODEL)
                );
                println!("  Max tokens:  {}", config.model.max_output_tokens);
                println!("  Temperature: {}", config.model.temperature);
                println!();
                println!(
                    "Langfuse: {}",
                    if config.tracing.langfuse {
                        "enabled"
                    } else {
                        "disabled"
                    }
                );
            }
            Err(e) => {
                println!("  Valid:  no ({e})");
            }
        }
    }

    println!();
    println!("Environment:");
    for name in [
        "GOOGLE_API_KEY",
        "GEMINI_API_KEY",
        "GOOGLE_CSE_ID",
        "GEMINI_MODEL",
        "LANGFUSE_PUBLIC_KEY",
        "LANGFUSE_SECRET_KEY",
        "LANGFUSE_HOST",
    ] {
        print_env_status(name);
    }

    Ok(())
}

async fn cmd_config(args: ConfigArgs, config_file: &Path) -> Result<()> {
    match args.command {
        ConfigCommands::Path => {
            println!("{}", config_file.display());
        }
        ConfigCommands::Show => {
            if config_file.exists() {
                let content = tokio::fs::read_to_string(config_file).await?;
                println!("{content}");
            } else {
                println!("Configuration file does not exist.");
                println!("Run 'eventscout config init' to create one.");
            }
        }
        ConfigCommands::Init { force } => {
            init_config_at(config_file, force).await?;
            println!("Created {}", config_file.display());
        }
    }

    Ok(())
}

fn print_env_status(name: &str) {
    let status = if std::env::var(name).is_ok_and(|v| !v.is_empty()) {
        "set"
    } else {
        "-"
    };
    println!("  {name}: {status}");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use eventscout::chat::ChatResponse;
    use eventscout::message::{ContentPart, Message};
    use eventscout::usage::Usage;

    fn outcome(preamble: Option<&str>, requested: usize, response: ChatResponse) -> RunOutcome {
        RunOutcome {
            preamble: preamble.map(str::to_owned),
            requested_tool_calls: requested,
            tool_calls: Vec::new(),
            response,
            usage: Usage::default(),
        }
    }

    #[test]
    fn final_answer_printed_when_calls_were_skipped() {
        let text = render_outcome(&outcome(
            Some("Searching now."),
            1,
            ChatResponse::from_text("FINAL ANSWER"),
        ))
        .unwrap();

        assert_eq!(
            text,
            "Searching now.\n\nTool calls detected. Executing tools...\n\nFinal AI Response (after processing tools):\nFINAL ANSWER\n"
        );
    }

    #[test]
    fn final_answer_printed_without_tool_calls() {
        let text = render_outcome(&outcome(None, 0, ChatResponse::from_text("Hi!"))).unwrap();

        assert!(!text.contains("Tool calls detected"));
        assert!(text.ends_with("Final AI Response (after processing tools):\nHi!\n"));
    }

    #[test]
    fn part_content_is_pretty_json() {
        let response = ChatResponse::new(Message::assistant(Content::Parts(vec![
            ContentPart::text("a"),
        ])));
        let text = render_outcome(&outcome(None, 0, response)).unwrap();

        assert!(text.contains("[\n  {\n    \"type\": \"text\",\n    \"text\": \"a\"\n  }\n]"));
    }
}
