//! Ask a connection a question and print the answer.
//!
//! Usage: agentwire-demo <config.json> <connection-id>

use std::sync::Arc;

use agentwire_client::{AgentClient, ClientConfig};
use agentwire_core::protocols::question::{self, Question};
use agentwire_core::Handlers;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| "agentwire.json".to_string());
    let connection_id = args.next().ok_or("missing connection id")?;

    let client = AgentClient::new(ClientConfig::from_file(&config_path)?)?;

    let mut handlers = Handlers::builder();
    handlers
        .add_status_handler(
            Question::status_type().to_string(),
            question::QUESTION_ANSWERED_STATUS,
            |msg| {
                println!(" Answer: {}", serde_json::to_string_pretty(msg.fields())?);
                Ok(())
            },
        )
        .add_status_handler(
            Question::status_type().to_string(),
            question::QUESTION_SENT_STATUS,
            |msg| {
                tracing::info!("Question delivered on thread {:?}", msg.thread_id());
                Ok(())
            },
        )
        .problem_report_handler(|msg| {
            tracing::error!("Problem report: {:?}", msg.get("description"));
            Ok(())
        })
        .default_handler(|msg| {
            tracing::warn!("Unexpected message: {:?}", msg.message_type());
            Ok(())
        });

    let endpoint = client.endpoint(Arc::new(handlers.build())).await?;
    tracing::info!("Listening for answers on {}", endpoint.local_addr()?);
    let listener = tokio::spawn(endpoint.run());

    let question = Question::new(
        connection_id,
        "Challenge Question",
        "Hi, are you on the phone with us right now?",
        "Asked to verify the caller",
        ["Yes, it's me", "No, that is not me!"],
    );
    question.ask(client.context()).await?;
    println!(" Question sent on thread {}", question.thread_id());

    tokio::select! {
        result = listener => result??,
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down"),
    }

    client.close();
    Ok(())
}
