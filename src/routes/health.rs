// ABOUTME: Liveness and readiness route handlers for the reflection server
// ABOUTME: Readiness probes the database connection and the LLM provider behind the generator
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Health check routes
//!
//! `/health` is pure liveness and always answers. `/ready` verifies the two
//! dependencies a submission needs: a usable database connection and a
//! reachable, credentialed LLM provider. A failed dependency turns the
//! response into `503` with the failing check named.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tracing::warn;

use crate::context::ServerResources;

/// Health routes implementation
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create all health check routes
    #[must_use]
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/health", get(Self::health))
            .route("/ready", get(Self::ready))
            .with_state(resources)
    }

    /// Liveness: the process is up and serving requests
    async fn health() -> Json<serde_json::Value> {
        Json(serde_json::json!({
            "status": "healthy",
            "timestamp": chrono::Utc::now().to_rfc3339()
        }))
    }

    /// Readiness: every dependency a submission needs is usable
    async fn ready(State(resources): State<Arc<ServerResources>>) -> Response {
        let database_ok = match resources.database.health_check().await {
            Ok(()) => true,
            Err(error) => {
                warn!(error = %error, "readiness check: database ping failed");
                false
            }
        };

        let provider_ok = match resources.generator.health_check().await {
            Ok(healthy) => healthy,
            Err(error) => {
                warn!(error = %error, "readiness check: LLM provider probe failed");
                false
            }
        };

        let ready = database_ok && provider_ok;
        let status = if ready {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };

        let body = serde_json::json!({
            "status": if ready { "ready" } else { "not_ready" },
            "checks": {
                "database": check_label(database_ok),
                "llm_provider": check_label(provider_ok),
            },
            "provider": resources.generator.provider_name(),
            "model": resources.generator.model(),
            "timestamp": chrono::Utc::now().to_rfc3339()
        });

        (status, Json(body)).into_response()
    }
}

const fn check_label(ok: bool) -> &'static str {
    if ok {
        "ok"
    } else {
        "failed"
    }
}
