use std::sync::Arc;
use tracing::info;

use kube_sleuth_agent::{
    agent::provider::create_provider,
    cluster::KubeBackend,
    config::Config,
    metrics,
    server::Server,
    tools::inspector::ClusterInspector,
    AgentService, Result, ToolRegistry,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::load()?;
    info!(
        "Loaded configuration: provider={:?} model={} max_iterations={}",
        config.llm.provider, config.llm.model, config.agent.max_iterations
    );

    metrics::register_metrics();

    // Connect to the cluster (in-cluster config or local kubeconfig)
    let client = kube::Client::try_default().await?;
    let backend = Arc::new(KubeBackend::new(client, &config.cluster));

    // Wire up the agent
    let registry = Arc::new(ToolRegistry::diagnostic_tools());
    let inspector = Arc::new(ClusterInspector::new(
        registry.clone(),
        backend,
        &config.cluster,
    ));
    let provider = create_provider(&config.llm)?;
    let service = Arc::new(AgentService::new(provider, inspector, &config));

    // Start server
    let server = Server::new(&config, service, registry);
    info!("Starting server on {}", config.server.addr);
    server.run().await?;

    Ok(())
}
