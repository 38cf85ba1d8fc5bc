use tracing::info;
use tracing_subscriber::EnvFilter;
use venture_mentor::{ChatMessage, ChatRequest, MentorConfig, Orchestrator};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let question = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if question.trim().is_empty() {
        eprintln!("usage: mentor <question>");
        eprintln!("example: mentor \"Is a 3:1 LTV to CAC ratio good enough for a campus meal-prep startup?\"");
        std::process::exit(2);
    }

    let config = MentorConfig::from_env()?;
    config.require_completion_key()?;

    let orchestrator = Orchestrator::from_config(&config)?;
    let request = ChatRequest::new(vec![ChatMessage::user(question)], None)?;

    info!("Asking the mentor");

    match orchestrator.run(request).await {
        Ok(response) => {
            println!("{}\n", response.message);

            if !response.sources.is_empty() {
                println!("=== SOURCES ===");
                for (i, source) in response.sources.iter().enumerate() {
                    let speaker = source
                        .speaker
                        .as_deref()
                        .map(|s| format!(" ({})", s))
                        .unwrap_or_default();
                    println!("  [{}] [{}] {}{}", i + 1, source.source_type, source.title, speaker);
                }
            }

            if !response.tool_calls.is_empty() {
                println!("\n=== CALCULATIONS ===");
                for call in &response.tool_calls {
                    println!("  {} {}", call.name, call.output);
                }
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Mentor request failed: {}", e);
            Err(Box::new(e) as Box<dyn std::error::Error>)
        }
    }
}
