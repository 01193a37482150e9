use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::{
    ClientConfig, GenerationError, GenerationOutput, GenerationRequest, ProviderType,
    TextGenerator, TokenUsage, API_KEY_ENV,
};

/// Model families that reject a sampling temperature
const NO_TEMPERATURE_PREFIXES: &[&str] = &["gpt-5", "o1", "o3", "o4"];

/// OpenAI Responses API client
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Option<Duration>,
}

impl OpenAiClient {
    pub fn new(config: ClientConfig) -> Result<Self, GenerationError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| GenerationError::Config(e.to_string()))?;

        let api_key = config
            .api_key
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty());

        Ok(Self {
            client,
            base_url: config.base_url,
            api_key,
            timeout: config.timeout,
        })
    }

    /// Whether the model accepts a `temperature` parameter
    pub fn accepts_temperature(model: &str) -> bool {
        let model = model.to_lowercase();
        !NO_TEMPERATURE_PREFIXES
            .iter()
            .any(|prefix| model.starts_with(prefix))
    }

    fn build_body(request: &GenerationRequest) -> Value {
        let mut body = json!({
            "model": request.model,
            "instructions": request.instructions,
            "input": request.input,
        });

        if let Some(temperature) = request.temperature {
            if Self::accepts_temperature(&request.model) {
                body["temperature"] = json!(temperature);
            } else {
                debug!(
                    model = %request.model,
                    temperature,
                    "Model does not accept temperature, omitting"
                );
            }
        }

        body
    }

    fn map_send_error(&self, e: reqwest::Error) -> GenerationError {
        if e.is_timeout() {
            GenerationError::Timeout(self.timeout.unwrap_or_default())
        } else {
            GenerationError::Network(e.to_string())
        }
    }

    /// Pull the generated text out of a Responses API body
    fn extract_text(body: &Value) -> Result<String, GenerationError> {
        if let Some(message) = body["error"]["message"].as_str() {
            return Err(GenerationError::MalformedResponse(message.to_string()));
        }

        if let Some(text) = body["output_text"].as_str() {
            return Ok(text.to_string());
        }

        let output = body["output"].as_array().ok_or_else(|| {
            GenerationError::MalformedResponse("No output array in response".to_string())
        })?;

        let text: Vec<&str> = output
            .iter()
            .filter(|item| item["type"] == "message")
            .filter_map(|item| item["content"].as_array())
            .flatten()
            .filter(|part| part["type"] == "output_text")
            .filter_map(|part| part["text"].as_str())
            .collect();

        if text.is_empty() {
            return Err(GenerationError::EmptyOutput);
        }

        Ok(text.join("\n"))
    }

    fn extract_usage(body: &Value) -> Option<TokenUsage> {
        let usage = body.get("usage")?;
        Some(TokenUsage {
            input_tokens: usage["input_tokens"].as_u64().unwrap_or(0),
            output_tokens: usage["output_tokens"].as_u64().unwrap_or(0),
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    fn name(&self) -> &str {
        "OpenAI"
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::OpenAi
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationOutput, GenerationError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| GenerationError::Config(format!("{} is not set", API_KEY_ENV)))?;

        debug!(
            provider = self.name(),
            model = %request.model,
            input_len = request.input.len(),
            "Sending generation request"
        );

        let start = Instant::now();
        let response = self
            .client
            .post(format!("{}/responses", self.base_url))
            .bearer_auth(api_key)
            .json(&Self::build_body(request))
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Generation request rejected");
            return Err(match status.as_u16() {
                401 | 403 => GenerationError::Auth(body),
                429 => GenerationError::RateLimited(body),
                code => GenerationError::Http { status: code, body },
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

        let text = Self::extract_text(&body)?;
        let model = body["model"]
            .as_str()
            .unwrap_or(&request.model)
            .to_string();
        let duration = start.elapsed();

        debug!(
            model = %model,
            output_len = text.len(),
            duration_ms = duration.as_millis(),
            "Generation completed"
        );

        let mut output = GenerationOutput::new(text, model, duration);
        if let Some(usage) = Self::extract_usage(&body) {
            output = output.with_usage(usage);
        }
        Ok(output)
    }

    async fn is_available(&self) -> bool {
        self.api_key.is_some()
    }
}
