// ABOUTME: Canonical reflection schema types and structural validation
// ABOUTME: Defines Reflection, InteractiveReflection, and the duck-typed stored-form classifier
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Reflection Schema
//!
//! Defines the canonical shape of a generated [`Reflection`] and its
//! user-editable [`InteractiveReflection`] variant, and rejects anything else.
//! Every bound lives here as a named constant; validation failures name the
//! offending field and the violated constraint so the repair retry can quote
//! them back to the model.
//!
//! Stored payloads carry no format-version tag, so the stored form is
//! discriminated structurally: a payload is interactive iff its micro-action
//! steps are objects carrying a `text` field and the payload has a
//! `prompt_responses` field at all. [`is_interactive`] implements exactly that
//! heuristic; it must not be "improved" without migrating stored rows.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::errors::{AppError, AppResult};

/// Maximum characters in a raw journal entry
pub const MAX_ENTRY_TEXT_CHARS: usize = 5000;

/// Maximum mood tags per reflection
pub const MAX_MOOD_TAGS: usize = 5;
/// Maximum key themes per reflection
pub const MAX_KEY_THEMES: usize = 5;
/// Minimum reflection prompts (hard contract)
pub const MIN_REFLECTION_PROMPTS: usize = 2;
/// Maximum reflection prompts
pub const MAX_REFLECTION_PROMPTS: usize = 5;
/// Micro-action duration bounds in minutes
pub const MIN_DURATION_MINUTES: u32 = 1;
pub const MAX_DURATION_MINUTES: u32 = 60;
/// Micro-action step count bounds
pub const MIN_STEPS: usize = 1;
pub const MAX_STEPS: usize = 5;
/// Maximum characters in the reframe
pub const MAX_REFRAME_CHARS: usize = 200;
/// Maximum characters in the mantra
pub const MAX_MANTRA_CHARS: usize = 100;
/// Maximum characters per prompt response (parity with entry text)
pub const MAX_PROMPT_RESPONSE_CHARS: usize = 5000;

/// Validate raw journal entry text before any model call is made
///
/// # Errors
///
/// Returns `InvalidInput` naming the violated bound if the trimmed text is
/// empty or the text exceeds [`MAX_ENTRY_TEXT_CHARS`].
pub fn validate_entry_text(text: &str) -> AppResult<()> {
    if text.trim().is_empty() {
        return Err(AppError::invalid_input("entry_text cannot be empty"));
    }
    if text.chars().count() > MAX_ENTRY_TEXT_CHARS {
        return Err(AppError::invalid_input(format!(
            "entry_text must be {MAX_ENTRY_TEXT_CHARS} characters or less"
        )));
    }
    Ok(())
}

// ============================================================================
// Generated Form
// ============================================================================

/// A short, timed, step-by-step suggested activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MicroAction {
    /// Short, actionable title
    pub title: String,
    /// Duration in minutes, within [1, 60]
    pub duration_minutes: u32,
    /// 1-5 simple, concrete steps
    pub steps: Vec<String>,
}

/// The model's structured interpretation of one journal entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reflection {
    /// 0-5 short mood descriptors
    #[serde(default)]
    pub mood_tags: Vec<String>,
    /// 0-5 main themes in the entry
    #[serde(default)]
    pub key_themes: Vec<String>,
    /// 2-5 open-ended questions for deeper reflection
    pub reflection_prompts: Vec<String>,
    /// Suggested micro-action
    pub micro_action: MicroAction,
    /// Compassionate reframing, at most 200 characters
    pub reframe: String,
    /// Optional short affirmation, at most 100 characters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mantra: Option<String>,
    /// Crisis-resource text; required by the prompt contract (not the schema)
    /// whenever the entry indicates self-harm or severe distress
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety_note: Option<String>,
}

impl Reflection {
    /// Parse and validate a candidate JSON value
    ///
    /// # Errors
    ///
    /// Returns `SchemaViolation` if the value does not deserialize into the
    /// reflection shape or violates any structural bound.
    pub fn from_value(value: Value) -> AppResult<Self> {
        let reflection: Self = serde_json::from_value(value)
            .map_err(|e| AppError::schema_violation(format!("malformed reflection: {e}")))?;
        reflection.validate()?;
        Ok(reflection)
    }

    /// Parse and validate raw model output text
    ///
    /// A body that is not valid JSON at all fails with the same error class as
    /// a schema violation, so the repair retry treats both identically.
    ///
    /// # Errors
    ///
    /// Returns `SchemaViolation` on parse failure or any violated bound.
    pub fn from_json_str(raw: &str) -> AppResult<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| AppError::schema_violation(format!("response is not valid JSON: {e}")))?;
        Self::from_value(value)
    }

    /// Check all structural bounds
    ///
    /// # Errors
    ///
    /// Returns `SchemaViolation` naming the offending field and constraint.
    pub fn validate(&self) -> AppResult<()> {
        check_max_elements("mood_tags", self.mood_tags.len(), MAX_MOOD_TAGS)?;
        check_max_elements("key_themes", self.key_themes.len(), MAX_KEY_THEMES)?;
        check_element_range(
            "reflection_prompts",
            self.reflection_prompts.len(),
            MIN_REFLECTION_PROMPTS,
            MAX_REFLECTION_PROMPTS,
        )?;
        validate_micro_action_bounds(self.micro_action.duration_minutes, self.micro_action.steps.len())?;
        check_max_chars("reframe", &self.reframe, MAX_REFRAME_CHARS)?;
        if let Some(mantra) = &self.mantra {
            check_max_chars("mantra", mantra, MAX_MANTRA_CHARS)?;
        }
        Ok(())
    }
}

// ============================================================================
// Interactive (editable) Form
// ============================================================================

/// One micro-action step with per-step editing state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractiveStep {
    /// The step text
    pub text: String,
    /// Whether the user marked the step done
    #[serde(default)]
    pub completed: bool,
    /// Free-text user notes for the step
    #[serde(default)]
    pub notes: String,
}

/// Micro-action in the interactive shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractiveMicroAction {
    pub title: String,
    pub duration_minutes: u32,
    pub steps: Vec<InteractiveStep>,
}

/// User-editable superset of [`Reflection`]
///
/// `prompt_responses` maps a reflection prompt's position to the user's
/// free-text answer. Any subset of positions may be present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractiveReflection {
    #[serde(default)]
    pub mood_tags: Vec<String>,
    #[serde(default)]
    pub key_themes: Vec<String>,
    pub reflection_prompts: Vec<String>,
    pub micro_action: InteractiveMicroAction,
    pub reframe: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mantra: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety_note: Option<String>,
    pub prompt_responses: BTreeMap<usize, String>,
}

impl InteractiveReflection {
    /// Parse and validate a candidate JSON value
    ///
    /// # Errors
    ///
    /// Returns `SchemaViolation` if the value does not deserialize into the
    /// interactive shape or violates any structural bound.
    pub fn from_value(value: Value) -> AppResult<Self> {
        let reflection: Self = serde_json::from_value(value).map_err(|e| {
            AppError::schema_violation(format!("malformed interactive reflection: {e}"))
        })?;
        reflection.validate()?;
        Ok(reflection)
    }

    /// Check all structural bounds
    ///
    /// # Errors
    ///
    /// Returns `SchemaViolation` naming the offending field and constraint.
    pub fn validate(&self) -> AppResult<()> {
        check_max_elements("mood_tags", self.mood_tags.len(), MAX_MOOD_TAGS)?;
        check_max_elements("key_themes", self.key_themes.len(), MAX_KEY_THEMES)?;
        check_element_range(
            "reflection_prompts",
            self.reflection_prompts.len(),
            MIN_REFLECTION_PROMPTS,
            MAX_REFLECTION_PROMPTS,
        )?;
        validate_micro_action_bounds(self.micro_action.duration_minutes, self.micro_action.steps.len())?;
        check_max_chars("reframe", &self.reframe, MAX_REFRAME_CHARS)?;
        if let Some(mantra) = &self.mantra {
            check_max_chars("mantra", mantra, MAX_MANTRA_CHARS)?;
        }
        for (position, response) in &self.prompt_responses {
            if *position >= self.reflection_prompts.len() {
                return Err(AppError::schema_violation(format!(
                    "prompt_responses references prompt {position}, but there are only {} prompts",
                    self.reflection_prompts.len()
                )));
            }
            check_max_chars(
                &format!("prompt_responses[{position}]"),
                response,
                MAX_PROMPT_RESPONSE_CHARS,
            )?;
        }
        Ok(())
    }
}

// ============================================================================
// Stored Form Classification & Upgrade
// ============================================================================

/// Structural check for the interactive shape
///
/// A payload is interactive iff its micro-action steps are objects carrying a
/// `text` field and it carries a `prompt_responses` field at all. Stored rows
/// predate any version tag, so this exact heuristic is load-bearing.
#[must_use]
pub fn is_interactive(value: &Value) -> bool {
    let has_responses = value.get("prompt_responses").is_some();
    let steps_are_objects = value
        .pointer("/micro_action/steps")
        .and_then(Value::as_array)
        .is_some_and(|steps| steps.iter().all(|step| step.get("text").is_some()));
    has_responses && steps_are_objects
}

/// A reflection payload as it lives in storage, in either shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StoredReflection {
    /// Interactive, user-editable shape
    Interactive(InteractiveReflection),
    /// Plain generated shape
    Plain(Reflection),
}

impl StoredReflection {
    /// Classify, parse, and validate a candidate payload
    ///
    /// # Errors
    ///
    /// Returns `SchemaViolation` if the payload matches neither shape or
    /// violates any bound of the shape it matches.
    pub fn from_value(value: Value) -> AppResult<Self> {
        if is_interactive(&value) {
            Ok(Self::Interactive(InteractiveReflection::from_value(value)?))
        } else {
            Ok(Self::Plain(Reflection::from_value(value)?))
        }
    }

    /// Upgrade to the interactive shape
    ///
    /// Pure, deterministic, and idempotent: an already-interactive payload is
    /// returned unchanged; a plain reflection gets `completed = false`, empty
    /// notes for every step, and an empty response map.
    #[must_use]
    pub fn into_interactive(self) -> InteractiveReflection {
        match self {
            Self::Interactive(interactive) => interactive,
            Self::Plain(reflection) => upgrade_to_interactive(reflection),
        }
    }
}

/// Upgrade a plain reflection to the interactive shape
#[must_use]
pub fn upgrade_to_interactive(reflection: Reflection) -> InteractiveReflection {
    InteractiveReflection {
        mood_tags: reflection.mood_tags,
        key_themes: reflection.key_themes,
        reflection_prompts: reflection.reflection_prompts,
        micro_action: InteractiveMicroAction {
            title: reflection.micro_action.title,
            duration_minutes: reflection.micro_action.duration_minutes,
            steps: reflection
                .micro_action
                .steps
                .into_iter()
                .map(|text| InteractiveStep {
                    text,
                    completed: false,
                    notes: String::new(),
                })
                .collect(),
        },
        reframe: reflection.reframe,
        mantra: reflection.mantra,
        safety_note: reflection.safety_note,
        prompt_responses: BTreeMap::new(),
    }
}

// ============================================================================
// Bound Checks
// ============================================================================

fn check_max_elements(field: &str, len: usize, max: usize) -> AppResult<()> {
    if len > max {
        return Err(AppError::schema_violation(format!(
            "{field} has {len} elements, maximum is {max}"
        )));
    }
    Ok(())
}

fn check_element_range(field: &str, len: usize, min: usize, max: usize) -> AppResult<()> {
    if len < min {
        let noun = if len == 1 { "element" } else { "elements" };
        return Err(AppError::schema_violation(format!(
            "{field} has {len} {noun}, minimum is {min}"
        )));
    }
    check_max_elements(field, len, max)
}

fn check_max_chars(field: &str, value: &str, max: usize) -> AppResult<()> {
    let len = value.chars().count();
    if len > max {
        return Err(AppError::schema_violation(format!(
            "{field} has {len} characters, maximum is {max}"
        )));
    }
    Ok(())
}

fn validate_micro_action_bounds(duration_minutes: u32, step_count: usize) -> AppResult<()> {
    if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&duration_minutes) {
        return Err(AppError::schema_violation(format!(
            "micro_action.duration_minutes is {duration_minutes}, allowed range is [{MIN_DURATION_MINUTES}, {MAX_DURATION_MINUTES}]"
        )));
    }
    check_element_range("micro_action.steps", step_count, MIN_STEPS, MAX_STEPS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_interactive_requires_both_markers() {
        let plain = json!({
            "micro_action": { "steps": ["breathe"] }
        });
        assert!(!is_interactive(&plain));

        let responses_but_bare_steps = json!({
            "micro_action": { "steps": ["breathe"] },
            "prompt_responses": {}
        });
        assert!(!is_interactive(&responses_but_bare_steps));

        let object_steps_but_no_responses = json!({
            "micro_action": { "steps": [{ "text": "breathe" }] }
        });
        assert!(!is_interactive(&object_steps_but_no_responses));

        let interactive = json!({
            "micro_action": { "steps": [{ "text": "breathe" }] },
            "prompt_responses": {}
        });
        assert!(is_interactive(&interactive));
    }

    #[test]
    fn test_entry_text_bounds() {
        assert!(validate_entry_text("I'm nervous about my exam tomorrow").is_ok());
        assert!(validate_entry_text("   ").is_err());
        assert!(validate_entry_text(&"x".repeat(MAX_ENTRY_TEXT_CHARS)).is_ok());
        assert!(validate_entry_text(&"x".repeat(MAX_ENTRY_TEXT_CHARS + 1)).is_err());
    }
}
