use std::collections::VecDeque;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use recipeloops_agent::{
    GenerationError, GenerationOutput, GenerationRequest, ProviderType, TextGenerator,
};
use recipeloops_chef::{ChefPrompts, RecipeCreator, RecipeRequest};
use recipeloops_core::{
    FailurePolicy, LoopConfig, LoopContext, LoopError, LoopOutcome, LoopRunner,
    DEFAULT_MAX_ATTEMPTS,
};
use recipeloops_critic::{CriticEvaluator, CriticPrompts};
use recipeloops_logging::{LogFormat, Logger};

const PASSING: &str =
    "gluten-free: PASSED\nvegan: PASSED\nTaste Rating: 8/10\nOverall Status: PASSED";
const FAILING: &str = "gluten-free: PASSED\nvegan: FAILED - contains butter. Suggest vegan butter.\nOverall Status: FAILED";

type Reply = Result<String, GenerationError>;

/// A generator that replays canned replies per role and records chef inputs.
#[derive(Default)]
struct ScriptedGenerator {
    chef_replies: Mutex<VecDeque<Reply>>,
    critic_replies: Mutex<VecDeque<Reply>>,
    chef_inputs: Mutex<Vec<String>>,
    critic_inputs: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    fn new() -> Self {
        Self::default()
    }

    fn chef(self, reply: Reply) -> Self {
        self.chef_replies.lock().unwrap().push_back(reply);
        self
    }

    fn critic(self, reply: Reply) -> Self {
        self.critic_replies.lock().unwrap().push_back(reply);
        self
    }

    fn chef_calls(&self) -> usize {
        self.chef_inputs.lock().unwrap().len()
    }

    fn critic_calls(&self) -> usize {
        self.critic_inputs.lock().unwrap().len()
    }

    fn chef_input(&self, index: usize) -> String {
        self.chef_inputs.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::OpenAi
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationOutput, GenerationError> {
        let reply = if request.instructions == ChefPrompts::SYSTEM_INSTRUCTIONS {
            let mut inputs = self.chef_inputs.lock().unwrap();
            inputs.push(request.input.clone());
            let attempt = inputs.len();
            self.chef_replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(format!("Recipe attempt {}\n1. Cook it", attempt)))
        } else {
            assert_eq!(request.instructions, CriticPrompts::SYSTEM_INSTRUCTIONS);
            self.critic_inputs.lock().unwrap().push(request.input.clone());
            self.critic_replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(FAILING.to_string()))
        };

        reply.map(|text| {
            GenerationOutput::new(text, request.model.clone(), Duration::from_millis(1))
        })
    }

    async fn is_available(&self) -> bool {
        true
    }
}

fn pasta() -> RecipeRequest {
    RecipeRequest::new("pasta", ["gluten-free", "vegan"])
}

fn quiet_logger() -> Arc<Logger> {
    Arc::new(Logger::new(LogFormat::Json).quiet())
}

async fn run_loop(
    generator: &ScriptedGenerator,
    context: LoopContext,
    config: LoopConfig,
) -> Result<LoopOutcome, LoopError> {
    let runner = LoopRunner::with_config(
        RecipeCreator::new(generator),
        CriticEvaluator::new(generator),
        quiet_logger(),
        config,
    );
    runner.run(context).await
}

// ============================================================
// Termination
// ============================================================

#[tokio::test]
async fn test_success_on_first_attempt() {
    let generator = ScriptedGenerator::new()
        .chef(Ok("Chickpea Penne\n1. Boil".to_string()))
        .critic(Ok(PASSING.to_string()));

    let outcome = run_loop(&generator, LoopContext::new(pasta()), LoopConfig::default())
        .await
        .unwrap();

    assert!(outcome.is_success());
    assert_eq!(outcome.attempts(), 1);
    assert_eq!(outcome.recipe(), Some("Chickpea Penne\n1. Boil"));
    assert_eq!(generator.chef_calls(), 1);
    assert_eq!(generator.critic_calls(), 1);

    match outcome {
        LoopOutcome::Success { taste_rating, .. } => assert_eq!(taste_rating, Some(8)),
        other => panic!("Expected Success, got {:?}", other),
    }
}

#[tokio::test]
async fn test_success_stops_further_generation() {
    let generator = ScriptedGenerator::new()
        .critic(Ok(FAILING.to_string()))
        .critic(Ok(PASSING.to_string()));

    let outcome = run_loop(&generator, LoopContext::new(pasta()), LoopConfig::default())
        .await
        .unwrap();

    assert!(outcome.is_success());
    assert_eq!(outcome.attempts(), 2);
    assert_eq!(outcome.recipe(), Some("Recipe attempt 2\n1. Cook it"));
    assert_eq!(generator.chef_calls(), 2);
    assert_eq!(generator.critic_calls(), 2);
}

#[tokio::test]
async fn test_exhausted_after_max_attempts() {
    let generator = ScriptedGenerator::new();

    let outcome = run_loop(&generator, LoopContext::new(pasta()), LoopConfig::default())
        .await
        .unwrap();

    assert!(outcome.is_exhausted());
    assert_eq!(outcome.attempts(), DEFAULT_MAX_ATTEMPTS);
    assert_eq!(outcome.recipe(), Some("Recipe attempt 5\n1. Cook it"));
    assert_eq!(generator.chef_calls(), 5);
    assert_eq!(generator.critic_calls(), 5);
    assert_eq!(outcome.history().len(), 5);
    assert_eq!(outcome.exit_code(), 1);
}

#[tokio::test]
async fn test_custom_budget() {
    let generator = ScriptedGenerator::new();
    let context = LoopContext::new(pasta()).with_max_attempts(2);

    let outcome = run_loop(&generator, context, LoopConfig::default())
        .await
        .unwrap();

    assert!(outcome.is_exhausted());
    assert_eq!(generator.chef_calls(), 2);
}

#[tokio::test]
async fn test_zero_budget_is_config_error() {
    let generator = ScriptedGenerator::new();
    let context = LoopContext::new(pasta()).with_max_attempts(0);

    let result = run_loop(&generator, context, LoopConfig::default()).await;

    assert!(matches!(result, Err(LoopError::ConfigError(_))));
    assert_eq!(generator.chef_calls(), 0);
}

#[tokio::test]
async fn test_invalid_request_rejected_before_any_call() {
    let generator = ScriptedGenerator::new();
    let context = LoopContext::new(RecipeRequest::new("", ["vegan"]));

    let result = run_loop(&generator, context, LoopConfig::default()).await;

    assert!(matches!(result, Err(LoopError::InvalidRequest(_))));
    assert_eq!(generator.chef_calls(), 0);
}

#[tokio::test]
async fn test_lowercase_marker_is_not_approval() {
    let generator = ScriptedGenerator::new().critic(Ok("overall status: passed".to_string()));
    let context = LoopContext::new(pasta()).with_max_attempts(1);

    let outcome = run_loop(&generator, context, LoopConfig::default())
        .await
        .unwrap();

    assert!(outcome.is_exhausted());
}

// ============================================================
// Feedback threading
// ============================================================

#[tokio::test]
async fn test_failed_critique_becomes_next_feedback() {
    let generator = ScriptedGenerator::new()
        .critic(Ok(FAILING.to_string()))
        .critic(Ok(PASSING.to_string()));

    run_loop(&generator, LoopContext::new(pasta()), LoopConfig::default())
        .await
        .unwrap();

    let first = generator.chef_input(0);
    let second = generator.chef_input(1);

    assert_eq!(first, ChefPrompts::build_input(&pasta(), None));
    assert!(first.contains("This is the first attempt."));
    assert_eq!(second, ChefPrompts::build_input(&pasta(), Some(FAILING)));
    assert!(second.contains(FAILING));
}

#[tokio::test]
async fn test_only_latest_critique_is_threaded() {
    let generator = ScriptedGenerator::new()
        .critic(Ok("first critique\nOverall Status: FAILED".to_string()))
        .critic(Ok("second critique\nOverall Status: FAILED".to_string()));
    let context = LoopContext::new(pasta()).with_max_attempts(3);

    run_loop(&generator, context, LoopConfig::default())
        .await
        .unwrap();

    let third = generator.chef_input(2);
    assert!(third.contains("second critique"));
    assert!(!third.contains("first critique"));
}

// ============================================================
// Failure policy
// ============================================================

#[tokio::test]
async fn test_generation_failure_retries_with_previous_feedback() {
    let generator = ScriptedGenerator::new()
        .chef(Ok("Recipe one\n1. Boil".to_string()))
        .chef(Err(GenerationError::Http {
            status: 500,
            body: "down".to_string(),
        }))
        .chef(Ok("Recipe three\n1. Boil".to_string()))
        .critic(Ok(FAILING.to_string()))
        .critic(Ok(PASSING.to_string()));

    let outcome = run_loop(&generator, LoopContext::new(pasta()), LoopConfig::default())
        .await
        .unwrap();

    assert!(outcome.is_success());
    assert_eq!(outcome.attempts(), 3);
    assert_eq!(outcome.recipe(), Some("Recipe three\n1. Boil"));
    // The failed attempt never reached the critic
    assert_eq!(generator.critic_calls(), 2);
    // Attempt 3 revises against attempt 1's critique
    assert!(generator.chef_input(2).contains(FAILING));

    let history = outcome.history();
    assert_eq!(history.len(), 3);
    assert!(history[1].is_error());
    assert!(history[1].error.as_deref().unwrap().contains("HTTP 500"));
}

#[tokio::test]
async fn test_stop_policy_ends_exhausted_with_error() {
    let generator = ScriptedGenerator::new()
        .chef(Ok("Recipe one\n1. Boil".to_string()))
        .chef(Err(GenerationError::Timeout(Duration::from_secs(30))));
    let config = LoopConfig {
        failure_policy: FailurePolicy::Stop,
        ..Default::default()
    };

    let outcome = run_loop(&generator, LoopContext::new(pasta()), config)
        .await
        .unwrap();

    match outcome {
        LoopOutcome::Exhausted {
            attempts,
            recipe,
            last_error,
            ..
        } => {
            assert_eq!(attempts, 2);
            assert_eq!(recipe.as_deref(), Some("Recipe one\n1. Boil"));
            assert!(last_error.unwrap().contains("timed out"));
        }
        other => panic!("Expected Exhausted, got {:?}", other),
    }
    assert_eq!(generator.chef_calls(), 2);
}

#[tokio::test]
async fn test_all_attempts_fail_reports_no_recipe() {
    let mut generator = ScriptedGenerator::new();
    for _ in 0..3 {
        generator = generator.chef(Err(GenerationError::Network("connection refused".into())));
    }
    let context = LoopContext::new(pasta()).with_max_attempts(3);

    let outcome = run_loop(&generator, context, LoopConfig::default())
        .await
        .unwrap();

    assert!(outcome.is_exhausted());
    assert_eq!(outcome.recipe(), None);
    assert_eq!(generator.critic_calls(), 0);
}

#[tokio::test]
async fn test_auth_failure_ends_loop_without_retrying() {
    let generator = ScriptedGenerator::new()
        .chef(Ok("Recipe one\n1. Boil".to_string()))
        .chef(Err(GenerationError::Auth("invalid api key".into())));

    let outcome = run_loop(&generator, LoopContext::new(pasta()), LoopConfig::default())
        .await
        .unwrap();

    match outcome {
        LoopOutcome::Exhausted {
            attempts,
            recipe,
            last_error,
            ..
        } => {
            assert_eq!(attempts, 2);
            assert_eq!(recipe.as_deref(), Some("Recipe one\n1. Boil"));
            assert!(last_error.unwrap().contains("Authentication failed"));
        }
        other => panic!("Expected Exhausted, got {:?}", other),
    }
    assert_eq!(generator.chef_calls(), 2);
    assert_eq!(generator.critic_calls(), 1);
}

#[tokio::test]
async fn test_critic_failure_keeps_generated_recipe() {
    let generator = ScriptedGenerator::new()
        .chef(Ok("Only recipe\n1. Boil".to_string()))
        .critic(Err(GenerationError::RateLimited("slow down".into())));
    let context = LoopContext::new(pasta()).with_max_attempts(1);

    let outcome = run_loop(&generator, context, LoopConfig::default())
        .await
        .unwrap();

    assert!(outcome.is_exhausted());
    assert_eq!(outcome.recipe(), Some("Only recipe\n1. Boil"));
}

#[tokio::test]
async fn test_blank_recipe_is_a_failed_attempt_not_evaluated() {
    let generator = ScriptedGenerator::new()
        .chef(Ok("   ".to_string()))
        .critic(Ok(PASSING.to_string()));

    let outcome = run_loop(&generator, LoopContext::new(pasta()), LoopConfig::default())
        .await
        .unwrap();

    assert!(outcome.is_success());
    assert_eq!(outcome.attempts(), 2);
    assert_eq!(generator.critic_calls(), 1);
}

// ============================================================
// Interruption
// ============================================================

#[tokio::test]
async fn test_interrupt_before_first_attempt() {
    let generator = ScriptedGenerator::new();
    let runner = LoopRunner::new(
        RecipeCreator::new(&generator),
        CriticEvaluator::new(&generator),
        quiet_logger(),
    );
    runner.interrupt_handle().store(true, Ordering::SeqCst);

    let outcome = runner.run(LoopContext::new(pasta())).await.unwrap();

    assert!(matches!(outcome, LoopOutcome::UserInterrupted { .. }));
    assert_eq!(outcome.exit_code(), 130);
    assert_eq!(generator.chef_calls(), 0);
}
