//! Fake OpenAI-compatible chat completions upstream.
//!
//! Usage: `mock_provider [port] [latency_ms] [error_rate]`

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use rand::Rng;
use serde_json::Value;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Clone)]
struct ServerConfig {
    latency_ms: u64,
    error_rate: f64,
}

fn arg<T: std::str::FromStr>(args: &[String], index: usize, default: T) -> anyhow::Result<T> {
    match args.get(index) {
        Some(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid argument {index}: {raw}")),
        None => Ok(default),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().collect();
    let port: u16 = arg(&args, 1, 3001)?;
    let latency_ms: u64 = arg(&args, 2, 500)?;
    let error_rate: f64 = arg(&args, 3, 0.0)?;

    let config = ServerConfig { latency_ms, error_rate };

    let app = Router::new()
        .route("/v1/chat/completions", post(handler))
        .with_state(config);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!(
        "Mock provider on {}. Latency: {}ms, Error Rate: {}",
        addr, latency_ms, error_rate
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn handler(State(config): State<ServerConfig>, Json(req): Json<Value>) -> (StatusCode, Json<Value>) {
    let jitter = rand::thread_rng().gen_range(0..=20);
    sleep(Duration::from_millis(config.latency_ms + jitter)).await;

    if config.error_rate > 0.0 && rand::thread_rng().gen_bool(config.error_rate.min(1.0)) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": "simulated failure"})),
        );
    }

    // Echo the last line of the user message, which holds the question.
    let question = req["messages"]
        .as_array()
        .and_then(|messages| messages.last())
        .and_then(|message| message["content"].as_str())
        .and_then(|content| content.lines().last())
        .unwrap_or("your question")
        .to_string();

    (StatusCode::OK, Json(serde_json::json!({
        "id": "mock-response",
        "object": "chat.completion",
        "created": 1677652288,
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": format!("Mock advice for \"{}\": only if it is a need.", question)
            },
            "finish_reason": "stop"
        }],
        "usage": {
            "prompt_tokens": 10,
            "completion_tokens": 10,
            "total_tokens": 20
        }
    })))
}
