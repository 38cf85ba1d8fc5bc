use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use venture_mentor::{api::start_server, MentorConfig, Orchestrator};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = MentorConfig::from_env()?;
    config.require_completion_key()?;

    if !config.retrieval_configured() {
        warn!("OPENAI_API_KEY / PINECONE_API_KEY / PINECONE_INDEX_HOST not fully set; answers will have no sources");
    }

    info!("Venture Mentor - API Server");
    info!("Port: {}", config.port);

    let orchestrator = Arc::new(Orchestrator::from_config(&config)?);

    info!(
        model = %config.anthropic_model,
        max_tool_rounds = orchestrator.settings().max_tool_rounds,
        top_k = orchestrator.settings().top_k,
        "Orchestrator initialized"
    );

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
        }
        signal.cancel();
    });

    start_server(orchestrator, config.port, shutdown).await?;

    Ok(())
}
