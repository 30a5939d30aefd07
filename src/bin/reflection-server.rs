// ABOUTME: Main binary for the reflection server
// ABOUTME: Loads configuration, wires resources, and serves the HTTP API
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reflection server binary

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use reflection_server::auth::AuthManager;
use reflection_server::config::ServerConfig;
use reflection_server::context::ServerResources;
use reflection_server::database::Database;
use reflection_server::generation::ReflectionGenerator;
use reflection_server::llm::OpenAiProvider;
use reflection_server::logging;
use reflection_server::rate_limiting::RateLimiter;
use reflection_server::routes;

#[derive(Parser)]
#[command(
    name = "reflection-server",
    about = "Journaling reflection service",
    long_about = "Turns free-text journal entries into structured reflections via an LLM \
                  provider, with schema validation, per-user rate limiting, and SQLite storage."
)]
struct Args {
    /// HTTP port override (defaults to HTTP_PORT or 8080)
    #[arg(long)]
    http_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init_from_env().context("Failed to initialize logging")?;

    let mut config = ServerConfig::from_env().context("Failed to load configuration")?;
    if let Some(port) = args.http_port {
        config.http_port = port;
    }

    info!("Starting reflection server: {}", config.summary());

    let database = Arc::new(
        Database::new(&config.database_url)
            .await
            .context("Failed to open database")?,
    );

    let auth_manager = Arc::new(AuthManager::new(
        config.jwt_secret.clone().into_bytes(),
        config.jwt_expiry_hours,
    ));

    let rate_limiter = Arc::new(RateLimiter::new(std::time::Duration::from_secs(
        config.rate_limit_window_secs,
    )));

    let provider = OpenAiProvider::from_env().context("Failed to initialize LLM provider")?;
    let mut generator = ReflectionGenerator::new(Arc::new(provider)).with_invocation_timeout(
        std::time::Duration::from_secs(config.llm.invocation_timeout_secs),
    );
    if let Some(model) = &config.llm.model {
        generator = generator.with_model(model.clone());
    }

    let resources = Arc::new(ServerResources::new(
        database,
        auth_manager,
        rate_limiter,
        Arc::new(generator),
    ));

    let app = routes::router(resources);

    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Listening on {addr}");

    axum::serve(listener, app)
        .await
        .context("HTTP server exited with an error")?;

    Ok(())
}
