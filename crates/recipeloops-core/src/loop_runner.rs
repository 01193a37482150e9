use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use recipeloops_chef::RecipeCreator;
use recipeloops_critic::CriticEvaluator;
use recipeloops_logging::{AgentRole, LogEvent, Logger};

use crate::context::AttemptRecord;
use crate::error::LoopError;
use crate::outcome::LoopOutcome;
use crate::LoopContext;

/// What to do when an attempt fails with a generation error
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Spend one unit of budget and try again
    #[default]
    Retry,
    /// End the loop as exhausted right away
    Stop,
}

/// Verbose tracing of prompts and raw model outputs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebugChannels {
    /// Chef input and generated recipe
    pub recipe: bool,
    /// Critic input and raw critique
    pub critique: bool,
}

/// Loop behavior that is fixed for a whole run
#[derive(Debug, Clone, Default)]
pub struct LoopConfig {
    pub failure_policy: FailurePolicy,
    pub debug: DebugChannels,
}

/// Orchestrates the chef-critic loop
pub struct LoopRunner<'a> {
    chef: RecipeCreator<'a>,
    critic: CriticEvaluator<'a>,
    logger: Arc<Logger>,
    config: LoopConfig,
    interrupted: Arc<AtomicBool>,
}

impl<'a> LoopRunner<'a> {
    pub fn new(chef: RecipeCreator<'a>, critic: CriticEvaluator<'a>, logger: Arc<Logger>) -> Self {
        Self::with_config(chef, critic, logger, LoopConfig::default())
    }

    pub fn with_config(
        chef: RecipeCreator<'a>,
        critic: CriticEvaluator<'a>,
        logger: Arc<Logger>,
        config: LoopConfig,
    ) -> Self {
        Self {
            chef,
            critic,
            logger,
            config,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a handle to signal interruption
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.interrupted.clone()
    }

    /// Run the chef-critic loop until approval or the budget runs out
    pub async fn run(&self, mut context: LoopContext) -> Result<LoopOutcome, LoopError> {
        context.request.validate()?;
        if context.max_attempts == 0 {
            return Err(LoopError::ConfigError(
                "max_attempts must be at least 1".to_string(),
            ));
        }

        self.logger.log(&LogEvent::LoopStarted {
            base_dish: context.request.base_dish.clone(),
            constraints: context.request.constraints.clone(),
            max_attempts: context.max_attempts,
            chef_model: self.chef.settings().model.clone(),
            critic_model: self.critic.settings().model.clone(),
        });

        loop {
            if self.interrupted.load(Ordering::SeqCst) {
                info!("Loop interrupted by user");
                let duration = context.total_duration();
                return Ok(LoopOutcome::interrupted(
                    context.attempt,
                    context.last_recipe,
                    context.history,
                    duration,
                ));
            }

            if !context.should_continue() {
                return Ok(self.exhaust(context));
            }

            let attempt = context.begin_attempt();
            match self.run_attempt(&mut context, attempt).await {
                Ok(Some(outcome)) => return Ok(outcome),
                Ok(None) => {}
                Err(e) => {
                    warn!(attempt, error = %e, "Attempt failed");
                    self.logger.log(&LogEvent::AttemptFailed {
                        attempt,
                        role: failed_role(&e),
                        error: e.to_string(),
                    });
                    context.push_record(AttemptRecord::failed(attempt, e.to_string()));
                    context.set_error(e.to_string());

                    if self.config.failure_policy == FailurePolicy::Stop {
                        return Ok(self.exhaust(context));
                    }
                    if !e.is_transient() {
                        warn!(attempt, "Error is not retryable, ending loop");
                        return Ok(self.exhaust(context));
                    }
                }
            }
        }
    }

    fn exhaust(&self, context: LoopContext) -> LoopOutcome {
        self.logger.log(&LogEvent::RetryBudgetExhausted {
            attempts: context.attempt,
        });
        let duration = context.total_duration();
        LoopOutcome::exhausted(
            context.attempt,
            context.last_recipe,
            context.last_error,
            context.history,
            duration,
        )
    }

    /// Run a single attempt of the chef-critic loop
    /// Returns Some(outcome) if the recipe was approved, None to continue
    async fn run_attempt(
        &self,
        context: &mut LoopContext,
        attempt: usize,
    ) -> Result<Option<LoopOutcome>, LoopError> {
        let feedback = context.last_feedback.as_deref();

        self.logger.log(&LogEvent::ChefStarted {
            attempt,
            revision: feedback.is_some(),
        });

        debug!(attempt, "Running chef");
        let chef_output = self.chef.create_recipe(&context.request, feedback).await?;

        if self.config.debug.recipe {
            self.logger.log(&LogEvent::PromptComposed {
                attempt,
                role: AgentRole::Chef,
                prompt: chef_output.prompt.clone(),
            });
            self.logger.log(&LogEvent::ModelOutput {
                attempt,
                role: AgentRole::Chef,
                text: chef_output.recipe.clone(),
            });
        }

        let recipe_lines = chef_output.recipe.lines().count();
        self.logger.log(&LogEvent::ChefCompleted {
            attempt,
            recipe_lines,
            duration_secs: chef_output.duration.as_secs_f64(),
            tokens: chef_output.usage.map(|usage| usage.total()),
        });
        context.set_recipe(chef_output.recipe.clone());

        self.logger.log(&LogEvent::CriticStarted { attempt });

        debug!(attempt, "Running critic");
        let critique = self
            .critic
            .evaluate_recipe(&chef_output.recipe, &context.request)
            .await?;

        if self.config.debug.critique {
            if let Some(ref prompt) = critique.prompt {
                self.logger.log(&LogEvent::PromptComposed {
                    attempt,
                    role: AgentRole::Critic,
                    prompt: prompt.clone(),
                });
            }
            self.logger.log(&LogEvent::ModelOutput {
                attempt,
                role: AgentRole::Critic,
                text: critique.text.clone(),
            });
        }

        self.logger.log(&LogEvent::CriticCompleted {
            attempt,
            verdict: critique.verdict.to_string(),
            taste_rating: critique.taste_rating,
            duration_secs: critique.duration.as_secs_f64(),
            tokens: critique.usage.map(|usage| usage.total()),
        });

        context.push_record(AttemptRecord {
            attempt,
            verdict: Some(critique.verdict.to_string()),
            taste_rating: critique.taste_rating,
            recipe_lines,
            chef_duration_secs: chef_output.duration.as_secs_f64(),
            critic_duration_secs: critique.duration.as_secs_f64(),
            error: None,
            timestamp: Utc::now(),
        });

        if critique.is_passed() {
            self.logger.log(&LogEvent::LoopCompleted {
                attempts: attempt,
                duration_secs: context.total_duration().as_secs_f64(),
            });

            return Ok(Some(LoopOutcome::success(
                attempt,
                chef_output.recipe,
                critique.taste_rating,
                context.history.clone(),
                context.total_duration(),
            )));
        }

        info!(attempt, "Recipe rejected, carrying critique to next attempt");
        context.set_feedback(critique.text);
        Ok(None)
    }
}

fn failed_role(error: &LoopError) -> AgentRole {
    match error {
        LoopError::CriticError(_) => AgentRole::Critic,
        _ => AgentRole::Chef,
    }
}
