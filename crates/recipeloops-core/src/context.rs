use chrono::{DateTime, Utc};
use recipeloops_chef::RecipeRequest;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Retry budget used when none is configured
pub const DEFAULT_MAX_ATTEMPTS: usize = 5;

/// Shared context for the chef-critic loop
#[derive(Debug, Clone)]
pub struct LoopContext {
    /// The request every attempt is judged against
    pub request: RecipeRequest,
    /// Attempts started so far (the current attempt number once running)
    pub attempt: usize,
    /// Retry budget
    pub max_attempts: usize,
    /// Bookkeeping for each attempt
    pub history: Vec<AttemptRecord>,
    /// When the loop started
    started_at: Instant,
    /// Latest critique, fed to the chef on the next attempt
    pub last_feedback: Option<String>,
    /// Most recently generated recipe
    pub last_recipe: Option<String>,
    /// Most recent attempt failure
    pub last_error: Option<String>,
}

/// Record of a single attempt. Critique text is never stored here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub attempt: usize,
    /// "PASSED" / "FAILED", or None if the attempt errored before a verdict
    pub verdict: Option<String>,
    pub taste_rating: Option<u8>,
    pub recipe_lines: usize,
    pub chef_duration_secs: f64,
    pub critic_duration_secs: f64,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AttemptRecord {
    pub fn failed(attempt: usize, error: String) -> Self {
        Self {
            attempt,
            verdict: None,
            taste_rating: None,
            recipe_lines: 0,
            chef_duration_secs: 0.0,
            critic_duration_secs: 0.0,
            error: Some(error),
            timestamp: Utc::now(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl LoopContext {
    pub fn new(request: RecipeRequest) -> Self {
        Self {
            request,
            attempt: 0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            history: Vec::new(),
            started_at: Instant::now(),
            last_feedback: None,
            last_recipe: None,
            last_error: None,
        }
    }

    pub fn with_max_attempts(mut self, max: usize) -> Self {
        self.max_attempts = max;
        self
    }

    /// Start the next attempt and return its 1-based number
    pub fn begin_attempt(&mut self) -> usize {
        self.attempt += 1;
        self.attempt
    }

    pub fn push_record(&mut self, record: AttemptRecord) {
        self.history.push(record);
    }

    /// Replace the feedback; only the latest critique is kept
    pub fn set_feedback(&mut self, feedback: String) {
        self.last_feedback = Some(feedback);
    }

    pub fn set_recipe(&mut self, recipe: String) {
        self.last_recipe = Some(recipe);
    }

    pub fn set_error(&mut self, error: String) {
        self.last_error = Some(error);
    }

    pub fn total_duration(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn should_continue(&self) -> bool {
        self.attempt < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_accounting() {
        let mut context =
            LoopContext::new(RecipeRequest::new("pasta", ["vegan"])).with_max_attempts(2);

        assert!(context.should_continue());
        assert_eq!(context.begin_attempt(), 1);
        assert!(context.should_continue());
        assert_eq!(context.begin_attempt(), 2);
        assert!(!context.should_continue());
    }

    #[test]
    fn test_feedback_is_replaced_not_accumulated() {
        let mut context = LoopContext::new(RecipeRequest::new("pasta", ["vegan"]));
        context.set_feedback("first".to_string());
        context.set_feedback("second".to_string());
        assert_eq!(context.last_feedback.as_deref(), Some("second"));
    }
}
