// Copyright 2026 PatentScope Harvest Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use patentscope_runtime::cli;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "patentscope",
    about = "Harvest bibliographic records from WIPO PATENTSCOPE",
    version,
    after_help = "Run 'patentscope <command> --help' for details on each command."
)]
struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Log level when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for a molecule and harvest every matching document
    Search {
        /// Primary search term (e.g. "darolutamide")
        molecule: String,
        /// Development code to include in the query. Can be repeated; the
        /// first three are used.
        #[arg(long = "dev-code")]
        dev_codes: Vec<String>,
        /// CAS registry number
        #[arg(long)]
        cas: Option<String>,
        /// Maximum number of documents to harvest
        #[arg(long, default_value = "50")]
        max_results: usize,
        /// Show the browser window
        #[arg(long)]
        headed: bool,
        /// Wall-clock ceiling per document in milliseconds
        #[arg(long)]
        unit_timeout: Option<u64>,
        /// Delay between documents in milliseconds
        #[arg(long)]
        pacing_ms: Option<u64>,
    },
    /// Harvest known documents by identifier
    Fetch {
        /// Document identifiers (e.g. WO2019028689)
        #[arg(required = true)]
        doc_ids: Vec<String>,
        /// Show the browser window
        #[arg(long)]
        headed: bool,
        /// Write the captured page of a single document to this file
        #[arg(long)]
        save_html: Option<PathBuf>,
    },
    /// Extract a record from a saved detail page
    Parse {
        /// HTML file to parse
        file: PathBuf,
        /// Identifier the page was fetched for
        #[arg(long)]
        doc_id: String,
    },
    /// Check environment and diagnose issues
    Doctor,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global flags via environment variables so all modules can check them
    if cli.json {
        std::env::set_var("PATENTSCOPE_JSON", "1");
    }
    if cli.quiet {
        std::env::set_var("PATENTSCOPE_QUIET", "1");
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Search {
            molecule,
            dev_codes,
            cas,
            max_results,
            headed,
            unit_timeout,
            pacing_ms,
        } => {
            cli::search_cmd::run(cli::search_cmd::SearchArgs {
                molecule,
                dev_codes,
                cas,
                max_results,
                headed,
                unit_timeout,
                pacing_ms,
            })
            .await
        }
        Commands::Fetch {
            doc_ids,
            headed,
            save_html,
        } => cli::fetch_cmd::run(&doc_ids, headed, save_html.as_deref()).await,
        Commands::Parse { file, doc_id } => cli::parse_cmd::run(&file, &doc_id),
        Commands::Doctor => cli::doctor::run().await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "patentscope", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        if !cli::output::is_quiet() && !cli::output::is_json() {
            eprintln!("  Error: {e:#}");
        }
        if cli::output::is_json() {
            cli::output::print_json(&serde_json::json!({
                "error": true,
                "message": format!("{e:#}"),
            }));
        }
        std::process::exit(1);
    }

    result
}
