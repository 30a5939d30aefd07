// ABOUTME: Common test utilities and fixtures for integration tests
// ABOUTME: Provides scripted LLM providers, in-memory databases, and authenticated users

#![allow(dead_code)]
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;

use reflection_server::auth::AuthManager;
use reflection_server::context::ServerResources;
use reflection_server::database::Database;
use reflection_server::errors::AppError;
use reflection_server::generation::ReflectionGenerator;
use reflection_server::llm::{
    ChatRequest, ChatResponse, LlmCapabilities, LlmProvider,
};
use reflection_server::rate_limiting::RateLimiter;

static INIT_LOGGING: Once = Once::new();

/// Initialize test logging once per process
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_test_writer()
            .try_init();
    });
}

/// Create an in-memory test database with migrations applied
pub async fn create_test_database() -> Arc<Database> {
    let database = Database::new("sqlite::memory:")
        .await
        .expect("Failed to create test database");
    Arc::new(database)
}

/// Test JWT secret shared by all fixtures
pub const TEST_JWT_SECRET: &[u8] = b"test-jwt-secret-for-integration-tests";

/// Create a test auth manager
pub fn create_test_auth_manager() -> Arc<AuthManager> {
    Arc::new(AuthManager::new(TEST_JWT_SECRET.to_vec(), 24))
}

/// Create a user id and a bearer header value for it
pub fn create_test_user(auth_manager: &AuthManager) -> (Uuid, String) {
    let user_id = Uuid::new_v4();
    let token = auth_manager
        .generate_token(user_id)
        .expect("Failed to generate test token");
    (user_id, format!("Bearer {token}"))
}

/// A reflection payload that satisfies every structural bound
pub fn valid_reflection_json() -> Value {
    json!({
        "mood_tags": ["anxious", "hopeful"],
        "key_themes": ["work stress"],
        "reflection_prompts": [
            "What would help you feel more prepared?",
            "When have you handled something like this before?"
        ],
        "micro_action": {
            "title": "Box breathing",
            "duration_minutes": 5,
            "steps": ["Sit comfortably", "Breathe in for four counts", "Hold and release"]
        },
        "reframe": "Feeling nervous means you care about doing well.",
        "mantra": "One step at a time."
    })
}

/// What a scripted invocation returns
#[derive(Clone)]
pub enum ScriptedReply {
    /// Model responds with this body
    Content(String),
    /// The provider call fails with a transport-style error
    TransportError,
    /// The provider call hangs well past any sane invocation timeout
    Stall,
}

/// Scripted fake provider for generator and route tests
///
/// Replies are consumed in order; running out of script is a test bug.
pub struct ScriptedProvider {
    replies: Mutex<Vec<ScriptedReply>>,
    calls: AtomicUsize,
    capabilities: LlmCapabilities,
    healthy: bool,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<ScriptedReply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies),
            calls: AtomicUsize::new(0),
            capabilities: LlmCapabilities::JSON_MODE | LlmCapabilities::SYSTEM_MESSAGES,
            healthy: true,
        })
    }

    /// Provider that returns one valid reflection
    pub fn valid() -> Arc<Self> {
        Self::new(vec![ScriptedReply::Content(
            valid_reflection_json().to_string(),
        )])
    }

    /// Provider whose health probe reports unavailable
    pub fn unhealthy() -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            capabilities: LlmCapabilities::JSON_MODE | LlmCapabilities::SYSTEM_MESSAGES,
            healthy: false,
        })
    }

    /// Provider advertising only the given capabilities
    pub fn with_capabilities(capabilities: LlmCapabilities) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            capabilities,
            healthy: true,
        })
    }

    /// Number of completed invocations so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn capabilities(&self) -> LlmCapabilities {
        self.capabilities
    }

    fn default_model(&self) -> &str {
        "scripted-model"
    }

    async fn complete(&self, _request: &ChatRequest) -> Result<ChatResponse, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let reply = {
            let mut replies = self.replies.lock().expect("script lock poisoned");
            if replies.is_empty() {
                panic!("ScriptedProvider ran out of scripted replies");
            }
            replies.remove(0)
        };

        match reply {
            ScriptedReply::Content(content) => Ok(ChatResponse {
                content,
                model: "scripted-model".to_owned(),
                usage: None,
                finish_reason: Some("stop".to_owned()),
            }),
            ScriptedReply::TransportError => Err(AppError::external_service(
                "Scripted",
                "simulated connection failure",
            )),
            ScriptedReply::Stall => {
                tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
                unreachable!("stalled invocation should have been cancelled by the timeout");
            }
        }
    }

    async fn health_check(&self) -> Result<bool, AppError> {
        Ok(self.healthy)
    }
}

/// Assemble server resources around a scripted provider
pub async fn create_test_resources(provider: Arc<ScriptedProvider>) -> Arc<ServerResources> {
    init_test_logging();

    let database = create_test_database().await;
    let auth_manager = create_test_auth_manager();
    let rate_limiter = Arc::new(RateLimiter::default());
    let generator = Arc::new(ReflectionGenerator::new(provider));

    Arc::new(ServerResources::new(
        database,
        auth_manager,
        rate_limiter,
        generator,
    ))
}
