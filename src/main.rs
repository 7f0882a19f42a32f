use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::debug;

use sitewright::tools::SimulatedToolClient;
use sitewright::{OrchestratorConfig, WorkflowOrchestrator};

/// Natural-language workflow automation for analytics-site administration
#[derive(Parser)]
#[command(name = "sitewright")]
#[command(about = "Turn admin requests into validated multi-step workflows", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a free-text workflow request
    Request {
        /// The request, e.g. "Clean up the Finance project"
        text: String,

        /// Auto-confirm a plan that requires confirmation. Plan state is
        /// in-memory only, so the handshake must complete in this run.
        #[arg(short = 'y', long)]
        yes: bool,

        /// Refuse plans assessed as high risk outright
        #[arg(long)]
        block_high_risk: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(cli.verbose >= 2)
        .init();

    match cli.command {
        Commands::Request {
            text,
            yes,
            block_high_risk,
        } => run_request(&text, yes, block_high_risk).await,
    }
}

async fn run_request(text: &str, yes: bool, block_high_risk: bool) -> anyhow::Result<()> {
    let client = Arc::new(SimulatedToolClient::new());
    let orchestrator =
        WorkflowOrchestrator::with_config(client, OrchestratorConfig { block_high_risk });

    debug!(request = text, "processing workflow request");
    let response = orchestrator.process_request(text).await;
    println!("{}", serde_json::to_string_pretty(&response)?);

    if response["status"] == "confirmation_required" {
        let Some(workflow_id) = response["workflow_id"].as_str() else {
            anyhow::bail!("confirmation response carried no workflow id");
        };
        if yes {
            let result = orchestrator.confirm(workflow_id, true).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            eprintln!("Plan requires confirmation; re-run with --yes to execute it.");
        }
    }

    if response["success"] == false {
        std::process::exit(1);
    }
    Ok(())
}
