// ABOUTME: Library root for the reflection server crate
// ABOUTME: Exposes the journaling pipeline modules for the binary and tests
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Reflection Server
//!
//! A journaling service that turns free-text entries into structured,
//! schema-validated reflections via an LLM provider. The pipeline is:
//! authenticate, rate limit, validate input, generate (with one bounded
//! repair retry), then persist the entry and its reflection atomically.

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// JWT issuance and bearer-token validation
pub mod auth;
/// Environment-driven server configuration
pub mod config;
/// Shared per-request resource context
pub mod context;
/// `SQLite`-backed journal storage
pub mod database;
/// Unified application error type and HTTP mapping
pub mod errors;
/// Reflection generation with bounded repair retry
pub mod generation;
/// LLM provider abstraction and `OpenAI`-compatible client
pub mod llm;
/// Logging setup
pub mod logging;
/// Persistence-facing data models
pub mod models;
/// Per-user submission cooldown
pub mod rate_limiting;
/// HTTP route handlers
pub mod routes;
/// Reflection schema types and validation
pub mod schema;
