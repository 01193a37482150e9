use recipeloops_agent::{
    GenerationError, GenerationRequest, TextGenerator, TokenUsage, DEFAULT_MODEL,
};
use recipeloops_chef::RecipeRequest;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{extract_taste_rating, has_conflicting_markers, CriticPrompts, Verdict, VerdictMode};

/// Default sampling temperature for evaluation
pub const DEFAULT_CRITIC_TEMPERATURE: f32 = 0.2;

/// Model and verdict settings for the critic role
#[derive(Debug, Clone, PartialEq)]
pub struct CriticSettings {
    pub model: String,
    pub temperature: Option<f32>,
    pub verdict_mode: VerdictMode,
}

impl Default for CriticSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: Some(DEFAULT_CRITIC_TEMPERATURE),
            verdict_mode: VerdictMode::default(),
        }
    }
}

/// The critic's free-text verdict on one recipe
#[derive(Debug, Clone)]
pub struct Critique {
    /// Composed evaluation prompt (None when the local pre-check failed the recipe)
    pub prompt: Option<String>,
    /// Raw critique text, threaded back to the chef as feedback
    pub text: String,
    pub verdict: Verdict,
    /// Taste rating found in the text, for reporting only
    pub taste_rating: Option<u8>,
    pub duration: Duration,
    pub usage: Option<TokenUsage>,
}

impl Critique {
    pub fn is_passed(&self) -> bool {
        self.verdict.is_passed()
    }
}

/// Evaluator role: audits a recipe against the request's constraints
pub struct CriticEvaluator<'a> {
    client: &'a dyn TextGenerator,
    settings: CriticSettings,
}

impl<'a> CriticEvaluator<'a> {
    pub fn new(client: &'a dyn TextGenerator) -> Self {
        Self::with_settings(client, CriticSettings::default())
    }

    pub fn with_settings(client: &'a dyn TextGenerator, settings: CriticSettings) -> Self {
        Self { client, settings }
    }

    pub fn settings(&self) -> &CriticSettings {
        &self.settings
    }

    /// Evaluate a recipe against the original request.
    ///
    /// A blank recipe fails locally without a model call. `RecipeCreator`
    /// never returns one, so this only guards direct library callers.
    pub async fn evaluate_recipe(
        &self,
        recipe: &str,
        request: &RecipeRequest,
    ) -> Result<Critique, EvaluationError> {
        if recipe.trim().is_empty() {
            warn!("Recipe is empty, failing pre-check without calling the critic");
            let text = CriticPrompts::build_precheck_failure(request);
            return Ok(Critique {
                prompt: None,
                verdict: Verdict::detect(&text, self.settings.verdict_mode),
                taste_rating: None,
                text,
                duration: Duration::ZERO,
                usage: None,
            });
        }

        let prompt = CriticPrompts::build_evaluation_prompt(recipe, request);

        debug!(
            prompt_len = prompt.len(),
            constraints = request.constraints.len(),
            "Running critic evaluation"
        );

        let mut generation = GenerationRequest::new(
            self.settings.model.clone(),
            CriticPrompts::SYSTEM_INSTRUCTIONS,
            prompt.clone(),
        );
        if let Some(temperature) = self.settings.temperature {
            generation = generation.with_temperature(temperature);
        }

        let output = self.client.generate(&generation).await?;

        if output.is_blank() {
            return Err(EvaluationError::EmptyCritique);
        }

        if has_conflicting_markers(&output.text) {
            warn!(
                mode = ?self.settings.verdict_mode,
                "Critique contains both PASSED and FAILED status markers"
            );
        }

        let verdict = Verdict::detect(&output.text, self.settings.verdict_mode);
        let taste_rating = extract_taste_rating(&output.text);

        info!(
            verdict = %verdict,
            taste_rating = ?taste_rating,
            duration_secs = output.duration.as_secs_f64(),
            "Critic completed"
        );

        Ok(Critique {
            prompt: Some(prompt),
            text: output.text,
            verdict,
            taste_rating,
            duration: output.duration,
            usage: output.usage,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("Critic generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Critic returned an empty critique")]
    EmptyCritique,
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use recipeloops_agent::{GenerationOutput, ProviderType};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedCritic {
        reply: Result<String, u16>,
        calls: AtomicUsize,
    }

    impl FixedCritic {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(status: u16) -> Self {
            Self {
                reply: Err(status),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for FixedCritic {
        fn name(&self) -> &str {
            "fixed"
        }

        fn provider_type(&self) -> ProviderType {
            ProviderType::OpenAi
        }

        async fn generate(
            &self,
            request: &GenerationRequest,
        ) -> Result<GenerationOutput, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(request.instructions, CriticPrompts::SYSTEM_INSTRUCTIONS);
            match &self.reply {
                Ok(text) => Ok(GenerationOutput::new(
                    text.clone(),
                    request.model.clone(),
                    Duration::from_millis(3),
                )),
                Err(status) => Err(GenerationError::Http {
                    status: *status,
                    body: "boom".to_string(),
                }),
            }
        }

        async fn is_available(&self) -> bool {
            true
        }
    }

    fn pasta() -> RecipeRequest {
        RecipeRequest::new("pasta", ["gluten-free", "vegan"])
    }

    #[tokio::test]
    async fn test_evaluate_passing_critique() {
        let client = FixedCritic::replying(
            "gluten-free: PASSED\nvegan: PASSED\nTaste Rating: 8/10\nOverall Status: PASSED",
        );
        let critic = CriticEvaluator::new(&client);

        let critique = critic.evaluate_recipe("A recipe", &pasta()).await.unwrap();
        assert!(critique.is_passed());
        assert_eq!(critique.taste_rating, Some(8));
        assert!(critique.prompt.unwrap().contains("A recipe"));
    }

    #[tokio::test]
    async fn test_evaluate_failing_critique_keeps_raw_text() {
        let text = "gluten-free: PASSED\nvegan: FAILED - contains butter. Suggest vegan butter.\nOverall Status: FAILED";
        let client = FixedCritic::replying(text);
        let critic = CriticEvaluator::new(&client);

        let critique = critic.evaluate_recipe("A recipe", &pasta()).await.unwrap();
        assert_eq!(critique.verdict, Verdict::Failed);
        assert_eq!(critique.text, text);
    }

    #[tokio::test]
    async fn test_empty_recipe_short_circuits() {
        let client = FixedCritic::replying("Overall Status: PASSED");
        let critic = CriticEvaluator::new(&client);

        let critique = critic.evaluate_recipe("   ", &pasta()).await.unwrap();
        assert_eq!(critique.verdict, Verdict::Failed);
        assert!(critique.prompt.is_none());
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_generation_failure_is_explicit() {
        let client = FixedCritic::failing(502);
        let critic = CriticEvaluator::new(&client);

        let err = critic.evaluate_recipe("A recipe", &pasta()).await.unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::Generation(GenerationError::Http { status: 502, .. })
        ));
    }
}
