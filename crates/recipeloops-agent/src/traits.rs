use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::GenerationOutput;

/// Default model used for both roles
pub const DEFAULT_MODEL: &str = "gpt-4.1";

/// Default API endpoint for the OpenAI provider
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Errors that can occur during a text-generation call
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limited by provider: {0}")]
    RateLimited(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Provider returned no text")]
    EmptyOutput,

    #[error("Client configuration error: {0}")]
    Config(String),
}

impl GenerationError {
    /// Whether a later attempt could plausibly succeed
    pub fn is_transient(&self) -> bool {
        match self {
            GenerationError::Network(_)
            | GenerationError::Timeout(_)
            | GenerationError::RateLimited(_)
            | GenerationError::EmptyOutput => true,
            GenerationError::Http { status, .. } => *status >= 500,
            GenerationError::Auth(_)
            | GenerationError::MalformedResponse(_)
            | GenerationError::Config(_) => false,
        }
    }
}

/// A single request to the text-generation service
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Model identifier
    pub model: String,
    /// Persistent behavioral framing (system role)
    pub instructions: String,
    /// Task-specific content (user role)
    pub input: String,
    /// Sampling temperature, if the model accepts one
    pub temperature: Option<f32>,
}

impl GenerationRequest {
    pub fn new(
        model: impl Into<String>,
        instructions: impl Into<String>,
        input: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            instructions: instructions.into(),
            input: input.into(),
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Configuration for a text-generation client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the API (no trailing slash)
    pub base_url: String,
    /// API key (None = read from the environment at construction)
    pub api_key: Option<String>,
    /// Per-request timeout (None = no limit)
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout: Some(Duration::from_secs(120)),
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Supported provider types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProviderType {
    #[default]
    OpenAi,
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderType::OpenAi => write!(f, "openai"),
        }
    }
}

impl std::str::FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" | "open-ai" => Ok(ProviderType::OpenAi),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// The core abstraction over a text-generation service
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Human-readable name of the provider (e.g., "OpenAI")
    fn name(&self) -> &str;

    /// The provider type
    fn provider_type(&self) -> ProviderType;

    /// Generate text for one instructions/input pair
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationOutput, GenerationError>;

    /// Check whether the client is configured well enough to make calls
    async fn is_available(&self) -> bool;
}
