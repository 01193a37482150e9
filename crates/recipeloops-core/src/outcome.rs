use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::AttemptRecord;

/// The final outcome of a chef-critic loop
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoopOutcome {
    /// The critic approved a recipe
    Success {
        attempts: usize,
        recipe: String,
        taste_rating: Option<u8>,
        #[serde(skip)]
        history: Vec<AttemptRecord>,
        total_duration_secs: f64,
    },
    /// Retry budget ran out, or an attempt failed under the stop policy
    Exhausted {
        attempts: usize,
        /// Last generated recipe (None = no recipe was ever produced)
        recipe: Option<String>,
        last_error: Option<String>,
        #[serde(skip)]
        history: Vec<AttemptRecord>,
        total_duration_secs: f64,
    },
    /// User requested stop (e.g., Ctrl+C)
    UserInterrupted {
        attempts: usize,
        recipe: Option<String>,
        #[serde(skip)]
        history: Vec<AttemptRecord>,
        total_duration_secs: f64,
    },
}

impl LoopOutcome {
    pub fn success(
        attempts: usize,
        recipe: String,
        taste_rating: Option<u8>,
        history: Vec<AttemptRecord>,
        duration: Duration,
    ) -> Self {
        Self::Success {
            attempts,
            recipe,
            taste_rating,
            history,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn exhausted(
        attempts: usize,
        recipe: Option<String>,
        last_error: Option<String>,
        history: Vec<AttemptRecord>,
        duration: Duration,
    ) -> Self {
        Self::Exhausted {
            attempts,
            recipe,
            last_error,
            history,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn interrupted(
        attempts: usize,
        recipe: Option<String>,
        history: Vec<AttemptRecord>,
        duration: Duration,
    ) -> Self {
        Self::UserInterrupted {
            attempts,
            recipe,
            history,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn attempts(&self) -> usize {
        match self {
            Self::Success { attempts, .. } => *attempts,
            Self::Exhausted { attempts, .. } => *attempts,
            Self::UserInterrupted { attempts, .. } => *attempts,
        }
    }

    /// The recipe to show the user: approved, or best effort
    pub fn recipe(&self) -> Option<&str> {
        match self {
            Self::Success { recipe, .. } => Some(recipe),
            Self::Exhausted { recipe, .. } => recipe.as_deref(),
            Self::UserInterrupted { recipe, .. } => recipe.as_deref(),
        }
    }

    pub fn history(&self) -> &[AttemptRecord] {
        match self {
            Self::Success { history, .. } => history,
            Self::Exhausted { history, .. } => history,
            Self::UserInterrupted { history, .. } => history,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The retry budget was used up without approval
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Success { .. } => 0,
            Self::Exhausted { .. } => 1,
            Self::UserInterrupted { .. } => 130,
        }
    }
}
