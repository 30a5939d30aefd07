// ABOUTME: Environment-only server configuration loaded once at startup
// ABOUTME: Covers HTTP port, database URL, JWT settings, rate-limit window, and LLM tuning
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Server Configuration
//!
//! Configuration is environment-only; there is no config file. Every knob has
//! a sensible default except `JWT_SECRET`, which must be provided.

use std::env;

use crate::errors::{AppError, AppResult};

/// LLM generation settings
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Model passed to the provider (default: provider's own default)
    pub model: Option<String>,
    /// Per-invocation timeout in seconds
    pub invocation_timeout_secs: u64,
}

/// Server configuration loaded from the environment
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen port
    pub http_port: u16,
    /// SQLite database URL
    pub database_url: String,
    /// Secret for signing session JWTs
    pub jwt_secret: String,
    /// JWT expiry in hours
    pub jwt_expiry_hours: i64,
    /// Per-user generation cooldown in seconds
    pub rate_limit_window_secs: u64,
    /// LLM settings
    pub llm: LlmConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns a config error if `JWT_SECRET` is missing or a numeric variable
    /// fails to parse.
    pub fn from_env() -> AppResult<Self> {
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| AppError::config("Missing JWT_SECRET environment variable"))?;

        Ok(Self {
            http_port: parse_env("HTTP_PORT", 8080)?,
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./data/journal.db".to_owned()),
            jwt_secret,
            jwt_expiry_hours: parse_env("JWT_EXPIRY_HOURS", 24)?,
            rate_limit_window_secs: parse_env("RATE_LIMIT_WINDOW_SECS", 60)?,
            llm: LlmConfig {
                model: env::var("LLM_MODEL").ok(),
                invocation_timeout_secs: parse_env("LLM_TIMEOUT_SECS", 30)?,
            },
        })
    }

    /// One-line summary for startup logging (no secrets)
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "port={} database={} rate_limit_window={}s llm_model={} llm_timeout={}s",
            self.http_port,
            self.database_url,
            self.rate_limit_window_secs,
            self.llm.model.as_deref().unwrap_or("(provider default)"),
            self.llm.invocation_timeout_secs
        )
    }
}

/// Parse an environment variable with a default
fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> AppResult<T> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| AppError::config(format!("Invalid value for {name}: {value}"))),
        Err(_) => Ok(default),
    }
}
