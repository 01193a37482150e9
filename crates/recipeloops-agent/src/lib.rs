//! # recipeloops-agent
//!
//! Text-generation client layer for the recipeloops chef/critic loop.
//!
//! Both roles talk to the same kind of service: a system-role instruction
//! string plus a user-role input string go in, free-form text comes out.
//! Every call returns a [`GenerationError`] on failure rather than an empty
//! value, so callers always see the failure before touching the text.
//!
//! ## Key Types
//!
//! - [`TextGenerator`] - Trait implemented by each provider
//! - [`GenerationRequest`] - Model, instructions, input and temperature
//! - [`GenerationOutput`] - Generated text plus timing and usage
//! - [`OpenAiClient`] - OpenAI Responses API implementation

mod openai;
mod output;
mod traits;

use std::sync::Arc;

pub use openai::OpenAiClient;
pub use output::{GenerationOutput, TokenUsage};
pub use traits::{
    ClientConfig, GenerationError, GenerationRequest, ProviderType, TextGenerator,
    API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_MODEL,
};

/// Create a client by provider type
pub fn create_client(
    provider: ProviderType,
    config: ClientConfig,
) -> Result<Arc<dyn TextGenerator>, GenerationError> {
    match provider {
        ProviderType::OpenAi => Ok(Arc::new(OpenAiClient::new(config)?)),
    }
}
