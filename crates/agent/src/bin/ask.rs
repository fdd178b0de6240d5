//! One-shot CLI for asking the diagnostic agent a question.
//!
//! Run with: cargo run --bin ask -- "Why is my-pod crash looping?"

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use kube_sleuth_agent::{
    agent::provider::create_provider,
    cluster::KubeBackend,
    config::{Config, ModelProvider},
    tools::inspector::ClusterInspector,
    AgentService, AskOutcome, ToolRegistry,
};

#[derive(Parser)]
#[command(author, version, about = "Ask the cluster diagnostic agent a question", long_about = None)]
struct Cli {
    /// The question to investigate
    question: String,

    /// Namespace to scope the investigation to
    #[arg(short, long)]
    namespace: Option<String>,

    /// Use the mock provider (no API key required)
    #[arg(long)]
    mock: bool,

    /// Log level (debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = format!("kube_sleuth_agent={},warn", cli.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(log_filter)
        .init();

    let mut config = Config::load()?;
    if cli.mock {
        config.llm.provider = ModelProvider::Mock;
    }

    let client = kube::Client::try_default().await?;
    let backend = Arc::new(KubeBackend::new(client, &config.cluster));
    let registry = Arc::new(ToolRegistry::diagnostic_tools());
    let inspector = Arc::new(ClusterInspector::new(registry, backend, &config.cluster));
    let provider = create_provider(&config.llm)?;
    let service = AgentService::new(provider, inspector, &config);

    let outcome = service
        .ask(&cli.question, cli.namespace.as_deref())
        .await?;

    print_outcome(&outcome);

    Ok(())
}

fn print_outcome(outcome: &AskOutcome) {
    println!("=== Investigation ===");
    println!();
    for entry in outcome.transcript.entries() {
        println!("{}", entry);
    }
    println!();
    println!("=== Answer ===");
    println!();
    println!("{}", outcome.answer);
    println!();
    println!(
        "({} iterations, {} tool(s) used, {} ms)",
        outcome.iterations,
        outcome.tools_used.len(),
        outcome.duration_ms
    );
}
