// ABOUTME: Focused dependency injection context shared across route handlers
// ABOUTME: Bundles database, auth manager, rate limiter, and the reflection generator
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Server Resources
//!
//! All request-scoped collaborators are constructed once at startup and passed
//! into the routers behind `Arc`s. Nothing in the pipeline reaches for global
//! client handles.

use std::sync::Arc;

use crate::auth::AuthManager;
use crate::database::Database;
use crate::generation::ReflectionGenerator;
use crate::rate_limiting::RateLimiter;

/// Shared resources injected into every route handler
pub struct ServerResources {
    /// Journal storage
    pub database: Arc<Database>,
    /// JWT issuance and validation
    pub auth_manager: Arc<AuthManager>,
    /// Per-user generation cooldown gate
    pub rate_limiter: Arc<RateLimiter>,
    /// LLM-backed reflection generator
    pub generator: Arc<ReflectionGenerator>,
}

impl ServerResources {
    /// Bundle the collaborators into a shared context
    #[must_use]
    pub fn new(
        database: Arc<Database>,
        auth_manager: Arc<AuthManager>,
        rate_limiter: Arc<RateLimiter>,
        generator: Arc<ReflectionGenerator>,
    ) -> Self {
        Self {
            database,
            auth_manager,
            rate_limiter,
            generator,
        }
    }
}
