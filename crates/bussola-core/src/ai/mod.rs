//! Pluggable completion backend abstraction
//!
//! The agent pipeline treats the LLM transport as a black box: one text
//! completion per call, `(system prompt, user prompt) -> text`. This module
//! defines that boundary and the concrete backends behind it.
//!
//! # Architecture
//!
//! - `CompletionBackend` trait: the interface every backend implements
//! - `AiClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `OpenAiCompatibleBackend`, `MockBackend`
//!
//! # Configuration
//!
//! Environment variables:
//! - `AI_BACKEND`: Backend to use (openai_compatible, mock). Default: openai_compatible
//! - `OPENAI_API_KEY`: API key (required for the openai_compatible backend)
//! - `OPENAI_BASE_URL`: Server URL (default: https://api.openai.com)
//! - `OPENAI_MODEL`: Model name (default: gpt-4o-mini)
//!
//! The client is never constructed at module scope: callers build one (or
//! `from_env()`) and inject it into the pipeline explicitly.

pub mod mock;
pub mod openai_compatible;

pub use mock::MockBackend;
pub use openai_compatible::OpenAiCompatibleBackend;

use async_trait::async_trait;

use crate::error::Result;

/// Sampling options for one completion call
#[derive(Debug, Clone, Copy)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl CompletionOptions {
    pub fn new(temperature: f32) -> Self {
        Self {
            temperature,
            max_tokens: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self::new(0.3)
    }
}

/// Trait defining the interface for all completion backends
///
/// Backends must be Send + Sync to allow use across async tasks.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// One text completion: system prompt + user prompt -> raw model text
    async fn complete(
        &self,
        system: &str,
        user: &str,
        opts: &CompletionOptions,
    ) -> Result<String>;

    /// Check if the backend is reachable
    async fn health_check(&self) -> bool;

    /// Model name (for logging)
    fn model(&self) -> &str;

    /// Host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete AI client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum AiClient {
    /// OpenAI-compatible chat completions backend
    OpenAiCompatible(OpenAiCompatibleBackend),
    /// Mock backend for testing
    Mock(MockBackend),
}

impl AiClient {
    /// Create an AI client from environment variables
    ///
    /// Checks `AI_BACKEND` to determine which backend to use:
    /// - `openai_compatible` (default): uses OPENAI_API_KEY / OPENAI_BASE_URL
    /// - `mock`: canned backend for testing
    ///
    /// Returns None when the required credential is not set — the pipeline
    /// treats that as its missing-credential precondition.
    pub fn from_env() -> Option<Self> {
        let backend =
            std::env::var("AI_BACKEND").unwrap_or_else(|_| "openai_compatible".to_string());

        match backend.to_lowercase().as_str() {
            "openai_compatible" | "openai" => {
                OpenAiCompatibleBackend::from_env().map(AiClient::OpenAiCompatible)
            }
            "mock" => Some(AiClient::Mock(MockBackend::new())),
            _ => {
                tracing::warn!(backend = %backend, "Unknown AI_BACKEND, falling back to openai_compatible");
                OpenAiCompatibleBackend::from_env().map(AiClient::OpenAiCompatible)
            }
        }
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        AiClient::Mock(MockBackend::new())
    }

    /// Create a new instance with a different model
    pub fn with_model(&self, model: &str) -> Self {
        match self {
            AiClient::OpenAiCompatible(b) => AiClient::OpenAiCompatible(b.with_model(model)),
            AiClient::Mock(b) => AiClient::Mock(b.with_model(model)),
        }
    }
}

#[async_trait]
impl CompletionBackend for AiClient {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        opts: &CompletionOptions,
    ) -> Result<String> {
        match self {
            AiClient::OpenAiCompatible(b) => b.complete(system, user, opts).await,
            AiClient::Mock(b) => b.complete(system, user, opts).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AiClient::OpenAiCompatible(b) => b.health_check().await,
            AiClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AiClient::OpenAiCompatible(b) => b.model(),
            AiClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AiClient::OpenAiCompatible(b) => b.host(),
            AiClient::Mock(b) => b.host(),
        }
    }
}
