// ABOUTME: HTTP route registration for the reflection server
// ABOUTME: Assembles journal and health routers into the application router
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP routes for the reflection server

pub mod health;
pub mod journal;

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::context::ServerResources;

/// Build the full application router
#[must_use]
pub fn router(resources: Arc<ServerResources>) -> Router {
    Router::new()
        .merge(health::HealthRoutes::routes(resources.clone()))
        .merge(journal::JournalRoutes::routes(resources))
        .layer(TraceLayer::new_for_http())
}
