//! taskloom - checklist-driven task orchestrator

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{init_command, resume_command, run_command, status_command, tools_command};

/// taskloom - plan, refine and execute requests with a language model
#[derive(Parser)]
#[command(name = "taskloom")]
#[command(about = "◆ Checklist-driven task orchestrator")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config, workspace and state directory
    Init,
    /// Run a request through the workflow
    Run {
        /// Request to execute; omit for interactive mode
        #[arg(short, long)]
        message: Option<String>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Continue the checklist left by an interrupted run
    Resume {
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show config and checklist progress
    Status,
    /// List the tools available to the model
    Tools,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let outcome = match cli.command {
        Commands::Init => init_command().await,
        Commands::Run { message, json } => run_command(message, json).await,
        Commands::Resume { json } => resume_command(json).await,
        Commands::Status => status_command().await,
        Commands::Tools => tools_command().await,
    };

    if let Err(e) = outcome {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
