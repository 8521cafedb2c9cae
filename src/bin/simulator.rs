//! Spawns a mock provider and the gateway, then fires a burst of requests.
//!
//! Assumes binaries are already built by a previous `cargo build`.

use std::process::{Child, Command};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task;

const GATEWAY: &str = "http://127.0.0.1:8080";

// Kills children on exit
struct ProcessGuard(Child);
impl Drop for ProcessGuard {
    fn drop(&mut self) {
        let _ = self.0.kill();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("Starting simulation...");

    let _provider = ProcessGuard(
        Command::new("./target/debug/mock_provider")
            .args(["3001", "200", "0.1"])
            .spawn()?,
    );

    let _gateway = ProcessGuard(
        Command::new("./target/debug/finance-edge")
            .env("BIND_ADDR", "127.0.0.1:8080")
            .env("HF_API_KEY", "mock-key")
            .env("UPSTREAM_ENDPOINT", "http://127.0.0.1:3001/v1/chat/completions")
            .env("UPSTREAM_TIMEOUT_SECS", "5")
            .spawn()?,
    );

    println!("Provider on 3001, gateway on 8080. Waiting 3s for startup...");
    tokio::time::sleep(Duration::from_secs(3)).await;

    println!("Sending 100 concurrent requests (50 identical, 50 unique)...");
    let client = reqwest::Client::new();
    let ok = Arc::new(AtomicUsize::new(0));
    let hits = Arc::new(AtomicUsize::new(0));
    let errors = Arc::new(AtomicUsize::new(0));
    let start_time = Instant::now();

    let mut tasks = Vec::new();
    for i in 0..100 {
        let client = client.clone();
        let ok = ok.clone();
        let hits = hits.clone();
        let errors = errors.clone();

        let message = if i < 50 {
            "Can I buy a ₹300 coffee?".to_string()
        } else {
            format!("Can I buy item #{i} for ₹{}?", i * 10)
        };

        tasks.push(task::spawn(async move {
            let body = serde_json::json!({
                "message": message,
                "expenses": "Budget: 5000\nSpent: 20",
                "app_data": "Wallet Balance: ₹500",
                "history": []
            });

            match client.post(format!("{GATEWAY}/finance-ai")).json(&body).send().await {
                Ok(resp) if resp.status().is_success() => {
                    ok.fetch_add(1, Ordering::Relaxed);
                    if resp.headers().get("x-cache").is_some_and(|v| v == "hit") {
                        hits.fetch_add(1, Ordering::Relaxed);
                    }
                }
                _ => {
                    errors.fetch_add(1, Ordering::Relaxed);
                }
            }
        }));
    }

    for t in tasks {
        let _ = t.await;
    }

    let duration = start_time.elapsed();
    println!("--- Results ---");
    println!("Success: {}", ok.load(Ordering::Relaxed));
    println!("Cache hits: {}", hits.load(Ordering::Relaxed));
    println!("Errors: {}", errors.load(Ordering::Relaxed));
    println!("Total Time: {:?}", duration);
    println!("RPS: {:.2}", 100.0 / duration.as_secs_f64());

    let stats: serde_json::Value = client.get(format!("{GATEWAY}/stats")).send().await?.json().await?;
    println!("Gateway stats: {}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
