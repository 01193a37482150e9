use recipeloops_agent::{
    GenerationError, GenerationRequest, TextGenerator, TokenUsage, DEFAULT_MODEL,
};
use std::time::Duration;
use tracing::{debug, info};

use crate::{ChefPrompts, RecipeRequest};

/// Default sampling temperature for recipe creation
pub const DEFAULT_CHEF_TEMPERATURE: f32 = 1.0;

/// Model settings for the chef role
#[derive(Debug, Clone, PartialEq)]
pub struct ChefSettings {
    pub model: String,
    pub temperature: Option<f32>,
}

impl Default for ChefSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: Some(DEFAULT_CHEF_TEMPERATURE),
        }
    }
}

/// What one chef call produced
#[derive(Debug, Clone)]
pub struct ChefOutput {
    /// The composed user-role input sent to the model
    pub prompt: String,
    /// The recipe text
    pub recipe: String,
    pub duration: Duration,
    /// Token usage, when the provider reports it
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, thiserror::Error)]
pub enum CreationError {
    #[error("Recipe generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Chef returned an empty recipe")]
    EmptyRecipe,
}

/// Generator role: turns a request (and optional critique) into a recipe
pub struct RecipeCreator<'a> {
    client: &'a dyn TextGenerator,
    settings: ChefSettings,
}

impl<'a> RecipeCreator<'a> {
    pub fn new(client: &'a dyn TextGenerator) -> Self {
        Self::with_settings(client, ChefSettings::default())
    }

    pub fn with_settings(client: &'a dyn TextGenerator, settings: ChefSettings) -> Self {
        Self { client, settings }
    }

    pub fn settings(&self) -> &ChefSettings {
        &self.settings
    }

    /// Create a recipe, revising against `feedback` when present
    pub async fn create_recipe(
        &self,
        request: &RecipeRequest,
        feedback: Option<&str>,
    ) -> Result<ChefOutput, CreationError> {
        let prompt = ChefPrompts::build_input(request, feedback);

        debug!(
            prompt_len = prompt.len(),
            revision = feedback.is_some(),
            "Running chef"
        );

        let mut generation = GenerationRequest::new(
            self.settings.model.clone(),
            ChefPrompts::SYSTEM_INSTRUCTIONS,
            prompt.clone(),
        );
        if let Some(temperature) = self.settings.temperature {
            generation = generation.with_temperature(temperature);
        }

        let output = self.client.generate(&generation).await?;

        info!(
            model = %output.model,
            lines = output.line_count(),
            duration_secs = output.duration.as_secs_f64(),
            "Chef completed"
        );

        if output.is_blank() {
            return Err(CreationError::EmptyRecipe);
        }

        Ok(ChefOutput {
            prompt,
            recipe: output.text,
            duration: output.duration,
            usage: output.usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use recipeloops_agent::{GenerationOutput, ProviderType};
    use std::sync::Mutex;

    struct EchoGenerator {
        reply: String,
        seen: Mutex<Vec<GenerationRequest>>,
    }

    impl EchoGenerator {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for EchoGenerator {
        fn name(&self) -> &str {
            "echo"
        }

        fn provider_type(&self) -> ProviderType {
            ProviderType::OpenAi
        }

        async fn generate(
            &self,
            request: &GenerationRequest,
        ) -> Result<GenerationOutput, GenerationError> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(GenerationOutput::new(
                self.reply.clone(),
                request.model.clone(),
                Duration::from_millis(5),
            )
            .with_usage(TokenUsage {
                input_tokens: 120,
                output_tokens: 30,
            }))
        }

        async fn is_available(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_create_recipe_sends_chef_framing() {
        let client = EchoGenerator::new("Sunny Chickpea Fusilli\n1. Boil water");
        let chef = RecipeCreator::new(&client);
        let request = RecipeRequest::new("pasta", ["vegan"]);

        let output = chef.create_recipe(&request, None).await.unwrap();
        assert_eq!(output.recipe, "Sunny Chickpea Fusilli\n1. Boil water");
        assert_eq!(output.usage.map(|usage| usage.total()), Some(150));

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].instructions, ChefPrompts::SYSTEM_INSTRUCTIONS);
        assert_eq!(seen[0].input, output.prompt);
        assert_eq!(seen[0].temperature, Some(DEFAULT_CHEF_TEMPERATURE));
        assert_eq!(seen[0].model, DEFAULT_MODEL);
    }

    #[tokio::test]
    async fn test_create_recipe_threads_feedback() {
        let client = EchoGenerator::new("Revised recipe");
        let chef = RecipeCreator::with_settings(
            &client,
            ChefSettings {
                model: "gpt-5".to_string(),
                temperature: None,
            },
        );
        let request = RecipeRequest::new("pasta", ["vegan"]);

        chef.create_recipe(&request, Some("vegan: FAILED - butter"))
            .await
            .unwrap();

        let seen = client.seen.lock().unwrap();
        assert!(seen[0].input.contains("vegan: FAILED - butter"));
        assert_eq!(seen[0].temperature, None);
    }

    #[tokio::test]
    async fn test_blank_recipe_is_an_error() {
        let client = EchoGenerator::new("  \n ");
        let chef = RecipeCreator::new(&client);
        let request = RecipeRequest::new("pasta", ["vegan"]);

        let err = chef.create_recipe(&request, None).await.unwrap_err();
        assert!(matches!(err, CreationError::EmptyRecipe));
    }
}
