mod cache;
mod config;
mod handlers;
mod metrics;
mod models;
mod providers;
mod rate_limit;
mod state;

use axum::{
    Router,
    routing::{get, post},
};
use clap::Parser;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

use config::Args;
use handlers::{chat_handler, health_handler, metrics_handler};
use providers::ProviderRegistry;
use rate_limit::{RateLimiter, sweep_task};
use state::AppState;

// this is main async function with tokio
#[tokio::main]
async fn main() {
    // parse cli arguments
    let args = Args::parse();

    let providers = ProviderRegistry::from_env();

    // one limiter for the whole process, shared with the sweeper
    let limiter = Arc::new(RateLimiter::new(
        args.rate_limit,
        Duration::from_secs(args.rate_window),
    ));

    // creating shared state
    let state = Arc::new(AppState {
        client: reqwest::Client::new(),
        cache: DashMap::new(),
        ttl: Duration::from_secs(args.cache_ttl),
        providers,
        limiter: Arc::clone(&limiter),
    });

    // spawn the background sweeper
    tokio::spawn(sweep_task(
        limiter,
        Duration::from_secs(args.sweep_interval),
    ));

    // creating the router with routes
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/api/chat/{provider}", post(chat_handler)) // post route
        .route("/metrics", get(metrics_handler)) // metrics endpoint
        .with_state(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();

    println!("Gateway running on http://localhost:{}", args.port);
    println!(
        "Rate limit: {} requests per {} seconds per provider:user key",
        args.rate_limit, args.rate_window
    );
    println!("Cache TTL: {} seconds", args.cache_ttl);
    axum::serve(listener, app).await.unwrap();
}
