// ABOUTME: Common data models for journal entries and their stored reflections
// ABOUTME: Defines JournalEntry and the history pairing returned to callers
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core data structures shared across the storage and HTTP layers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One piece of raw user writing
///
/// Created once at submission time, never mutated, never deleted by this
/// service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Server-assigned identifier
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// Raw entry text, non-empty and at most 5000 characters
    pub entry_text: String,
    /// Server-assigned creation timestamp, immutable
    pub created_at: DateTime<Utc>,
}

/// An entry paired with its stored reflection, if any
///
/// A `None` reflection is a valid, displayable state: generation was in flight
/// or failed after the entry was recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryItem {
    /// The journal entry
    pub entry: JournalEntry,
    /// The stored reflection payload, if one exists
    pub reflection: Option<serde_json::Value>,
}
