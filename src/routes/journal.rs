// ABOUTME: Journal route handlers for entry submission, history, and reflection editing
// ABOUTME: Wires auth, rate limiting, generation, and persistence into the HTTP boundary
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Journal routes
//!
//! This module handles the journaling pipeline's HTTP surface: submitting an
//! entry (generation + persistence), browsing history, reading one stored
//! reflection, and editing a reflection in place. All handlers require JWT
//! authentication.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::AuthResult,
    context::ServerResources,
    errors::AppError,
    models::HistoryItem,
    schema::{self, InteractiveReflection, Reflection, StoredReflection},
};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to submit a new journal entry
#[derive(Debug, Deserialize)]
pub struct SubmitEntryRequest {
    /// Raw entry text
    pub entry_text: String,
}

/// Response for a successful submission
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitEntryResponse {
    /// Server-assigned entry id
    pub entry_id: Uuid,
    /// The generated, schema-valid reflection
    pub reflection: Reflection,
}

/// Query parameters for listing history
#[derive(Debug, Deserialize, Default)]
pub struct HistoryQuery {
    /// Maximum number of entries to return
    #[serde(default = "default_limit")]
    pub limit: i64,
}

const fn default_limit() -> i64 {
    20
}

/// Response for the history listing
#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    /// Entries newest-first, each with its reflection if present
    pub entries: Vec<HistoryItem>,
    /// Number of entries returned
    pub total: usize,
}

/// Response for reading one stored reflection
#[derive(Debug, Serialize, Deserialize)]
pub struct ReflectionResponse {
    /// The entry this reflection belongs to
    pub entry_id: Uuid,
    /// The stored reflection in the interactive, editable shape
    pub reflection: InteractiveReflection,
}

/// Request to overwrite a stored reflection
#[derive(Debug, Deserialize)]
pub struct UpdateReflectionRequest {
    /// The edited reflection payload, in either shape
    pub reflection: serde_json::Value,
}

/// Acknowledgment for a successful update
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateReflectionResponse {
    pub success: bool,
    pub message: String,
}

// ============================================================================
// Journal Routes
// ============================================================================

/// Journal routes handler
pub struct JournalRoutes;

impl JournalRoutes {
    /// Create all journal routes
    #[must_use]
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/journal/entries", post(Self::submit_entry))
            .route("/api/journal/entries", get(Self::list_history))
            .route(
                "/api/journal/entries/:entry_id/reflection",
                get(Self::get_reflection),
            )
            .route(
                "/api/journal/entries/:entry_id/reflection",
                patch(Self::update_reflection),
            )
            .with_state(resources)
    }

    /// Extract and authenticate the user from the authorization header
    fn authenticate(
        headers: &axum::http::HeaderMap,
        resources: &Arc<ServerResources>,
    ) -> Result<AuthResult, AppError> {
        let auth_header = headers
            .get("authorization")
            .and_then(|h| h.to_str().ok())
            .ok_or_else(AppError::auth_required)?;

        resources
            .auth_manager
            .authenticate(auth_header)
            .map_err(|e| AppError::auth_invalid(format!("Authentication failed: {e}")))
    }

    /// Submit a new entry: rate limit, validate, generate, persist
    ///
    /// Validation and the rate-limit gate run before any model call is made,
    /// so rejected submissions cost nothing.
    async fn submit_entry(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
        Json(request): Json<SubmitEntryRequest>,
    ) -> Result<Response, AppError> {
        let auth = Self::authenticate(&headers, &resources)?;

        resources.rate_limiter.check_and_update(auth.user_id)?;
        schema::validate_entry_text(&request.entry_text)?;

        let reflection = resources.generator.generate(&request.entry_text).await?;

        let payload = serde_json::to_value(&reflection)
            .map_err(|e| AppError::internal(format!("Failed to serialize reflection: {e}")))?;

        let entry_id = resources
            .database
            .create_entry_with_output(auth.user_id, &request.entry_text, &payload)
            .await
            .map_err(|e| AppError::database(format!("Failed to save journal entry: {e}")))?;

        info!(user_id = %auth.user_id, entry_id = %entry_id, "journal entry created");

        let response = SubmitEntryResponse {
            entry_id,
            reflection,
        };

        Ok((StatusCode::CREATED, Json(response)).into_response())
    }

    /// List the caller's entries newest-first
    async fn list_history(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
        Query(query): Query<HistoryQuery>,
    ) -> Result<Response, AppError> {
        let auth = Self::authenticate(&headers, &resources)?;

        let limit = query.limit.clamp(1, 100);
        let entries = resources
            .database
            .history(auth.user_id, limit)
            .await
            .map_err(|e| AppError::database(format!("Failed to load history: {e}")))?;

        let total = entries.len();
        Ok(Json(HistoryResponse { entries, total }).into_response())
    }

    /// Read one stored reflection in the interactive shape
    async fn get_reflection(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
        Path(entry_id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let auth = Self::authenticate(&headers, &resources)?;

        Self::entry_owner_checked(&resources, entry_id, auth.user_id).await?;

        let payload = resources
            .database
            .get_output(entry_id)
            .await
            .map_err(|e| AppError::database(format!("Failed to load reflection: {e}")))?
            .ok_or_else(|| AppError::not_found("Reflection"))?;

        // Stored rows may be in either shape; the upgrade is idempotent.
        let stored = StoredReflection::from_value(payload)
            .map_err(|e| AppError::internal(format!("Stored reflection is invalid: {e}")))?;

        let response = ReflectionResponse {
            entry_id,
            reflection: stored.into_interactive(),
        };

        Ok(Json(response).into_response())
    }

    /// Overwrite a stored reflection in place
    async fn update_reflection(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
        Path(entry_id): Path<Uuid>,
        Json(request): Json<UpdateReflectionRequest>,
    ) -> Result<Response, AppError> {
        let auth = Self::authenticate(&headers, &resources)?;

        // Schema check first: a malformed edit should fail before any lookup.
        let stored = StoredReflection::from_value(request.reflection)?;

        Self::entry_owner_checked(&resources, entry_id, auth.user_id).await?;

        let interactive = stored.into_interactive();
        let payload = serde_json::to_value(&interactive)
            .map_err(|e| AppError::internal(format!("Failed to serialize reflection: {e}")))?;

        let updated = resources
            .database
            .update_output(entry_id, &payload)
            .await
            .map_err(|e| AppError::database(format!("Failed to update reflection: {e}")))?;

        if !updated {
            return Err(AppError::not_found("Reflection"));
        }

        info!(user_id = %auth.user_id, entry_id = %entry_id, "reflection updated");

        Ok(Json(UpdateReflectionResponse {
            success: true,
            message: "Reflection updated successfully".to_owned(),
        })
        .into_response())
    }

    /// Load an entry's owner and enforce the ownership invariant
    ///
    /// Fails with `NotFound` if the entry does not exist and `Forbidden` if
    /// the requester is not the owner.
    async fn entry_owner_checked(
        resources: &Arc<ServerResources>,
        entry_id: Uuid,
        requester: Uuid,
    ) -> Result<(), AppError> {
        let owner = resources
            .database
            .entry_owner(entry_id)
            .await
            .map_err(|e| AppError::database(format!("Failed to load entry owner: {e}")))?
            .ok_or_else(|| AppError::not_found("Journal entry"))?;

        if owner != requester {
            return Err(AppError::forbidden(
                "Only the owner may access this journal entry",
            ));
        }

        Ok(())
    }
}
