// ABOUTME: Reflection generation orchestrator with schema validation and bounded repair retry
// ABOUTME: Builds the prompt, invokes the LLM once, and repairs invalid output with exactly one retry
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Reflection Generator
//!
//! Obtains a schema-valid [`Reflection`] for a journal entry. Generative models
//! are non-deterministic and prompt-following is not bit-exact, so the one
//! failure class recovered locally is malformed model output: on the first
//! parse or schema failure the generator issues exactly one repair attempt that
//! quotes the invalid output and the named validation error back to the model.
//! The first attempt's raw output is reused for the repair prompt, so every
//! call performs at most two model invocations. Transport failures and
//! timeouts are never retried.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::errors::{AppError, AppResult};
use crate::llm::{reflection_system_prompt, ChatMessage, ChatRequest, LlmProvider};
use crate::schema::Reflection;

/// Sampling temperature for generation requests
///
/// Balances variety in wording against schema-structure stability. A tuning
/// knob, not a correctness requirement.
pub const GENERATION_TEMPERATURE: f32 = 0.7;

/// Default per-invocation timeout
pub const DEFAULT_INVOCATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Orchestrates prompt construction, model invocation, schema validation,
/// and the single bounded repair retry
pub struct ReflectionGenerator {
    provider: Arc<dyn LlmProvider>,
    model: Option<String>,
    invocation_timeout: Duration,
}

impl ReflectionGenerator {
    /// Create a generator backed by the given provider
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            model: None,
            invocation_timeout: DEFAULT_INVOCATION_TIMEOUT,
        }
    }

    /// Override the model passed to the provider
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Override the per-invocation timeout
    #[must_use]
    pub const fn with_invocation_timeout(mut self, timeout: Duration) -> Self {
        self.invocation_timeout = timeout;
        self
    }

    /// Identifier of the backing provider
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Model requests are issued with
    #[must_use]
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    /// Check whether the backing provider is reachable and credentialed
    ///
    /// # Errors
    ///
    /// Returns the provider's error if the probe itself fails.
    pub async fn health_check(&self) -> AppResult<bool> {
        self.provider.health_check().await
    }

    /// Generate a schema-valid reflection for the given entry text
    ///
    /// Performs at most two model invocations: the initial attempt, and one
    /// repair attempt if the initial output fails to parse or validate. The
    /// repair prompt reuses the initial output verbatim; no probe call is made.
    ///
    /// # Errors
    ///
    /// Returns `GenerationFailed` if the model is unreachable, an invocation
    /// times out, or both the original and repaired outputs fail validation.
    pub async fn generate(&self, entry_text: &str) -> AppResult<Reflection> {
        let capabilities = self.provider.capabilities();
        if !capabilities.supports_json_mode() || !capabilities.supports_system_messages() {
            return Err(AppError::config(format!(
                "provider {} lacks JSON mode or system message support required for generation",
                self.provider.name()
            )));
        }

        let initial_messages = vec![
            ChatMessage::system(reflection_system_prompt()),
            ChatMessage::user(entry_text),
        ];

        let first_raw = self.invoke(initial_messages).await?;

        let first_error = match Reflection::from_json_str(&first_raw) {
            Ok(reflection) => {
                debug!("reflection validated on first attempt");
                return Ok(reflection);
            }
            Err(error) => error,
        };

        warn!(error = %first_error.message, "model output failed validation, issuing repair retry");

        let repair_messages = vec![
            ChatMessage::system(reflection_system_prompt()),
            ChatMessage::user(entry_text),
            ChatMessage::assistant(first_raw),
            ChatMessage::system(format!(
                "Your previous response did not match the required schema. Error: {}\n\n\
                 Please fix the JSON to match the exact schema provided. Ensure all required \
                 fields are present and have the correct types.",
                first_error.message
            )),
        ];

        let second_raw = self.invoke(repair_messages).await?;

        match Reflection::from_json_str(&second_raw) {
            Ok(reflection) => {
                info!("reflection validated successfully on retry");
                Ok(reflection)
            }
            Err(second_error) => Err(AppError::generation_failed(format!(
                "no valid reflection after repair retry: {}",
                second_error.message
            ))),
        }
    }

    /// Invoke the model once under the configured timeout
    ///
    /// Transport failures and timeouts surface immediately as generation
    /// failure; there is no retry at this level.
    async fn invoke(&self, messages: Vec<ChatMessage>) -> AppResult<String> {
        let mut request = ChatRequest::new(messages)
            .with_temperature(GENERATION_TEMPERATURE)
            .with_json_mode();
        if let Some(model) = &self.model {
            request = request.with_model(model.clone());
        }

        match tokio::time::timeout(self.invocation_timeout, self.provider.complete(&request)).await
        {
            Ok(Ok(response)) => Ok(response.content),
            Ok(Err(error)) => Err(AppError::generation_failed(format!(
                "model invocation failed: {error}"
            ))
            .with_source(error)),
            Err(_) => Err(AppError::generation_failed(format!(
                "model invocation timed out after {}s",
                self.invocation_timeout.as_secs()
            ))),
        }
    }
}
