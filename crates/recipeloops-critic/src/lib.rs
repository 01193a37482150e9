mod evaluator;
mod prompts;
mod verdict;

pub use evaluator::{
    CriticEvaluator, CriticSettings, Critique, EvaluationError, DEFAULT_CRITIC_TEMPERATURE,
};
pub use prompts::CriticPrompts;
pub use verdict::{
    extract_taste_rating, has_conflicting_markers, Verdict, VerdictMode, FAILED_MARKER,
    PASSED_MARKER, TASTE_CONSTRAINT, TASTE_THRESHOLD,
};
