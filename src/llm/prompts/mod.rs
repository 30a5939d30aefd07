// ABOUTME: System prompts for LLM interactions loaded at compile time
// ABOUTME: Provides the reflection generation prompt with the schema contract and authoring guidelines
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # System Prompts
//!
//! This module provides system prompts for LLM interactions.
//! Prompts are loaded at compile time from markdown files for easy maintenance.

/// Reflection generation system prompt
///
/// Declares the exact JSON shape of a reflection (field names, types, and
/// cardinality bounds) plus the authoring guidelines, including the mandatory
/// crisis safety note. The schema validator enforces the same bounds on the
/// way back.
pub const REFLECTION_SYSTEM_PROMPT: &str = include_str!("reflection_system.md");

/// Get the system prompt used for every generation request
#[must_use]
pub const fn reflection_system_prompt() -> &'static str {
    REFLECTION_SYSTEM_PROMPT
}
