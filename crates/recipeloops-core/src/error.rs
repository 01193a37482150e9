use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoopError {
    #[error("Chef error: {0}")]
    ChefError(#[from] recipeloops_chef::CreationError),

    #[error("Critic evaluation error: {0}")]
    CriticError(#[from] recipeloops_critic::EvaluationError),

    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] recipeloops_chef::RequestError),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl LoopError {
    /// Whether retrying the attempt could plausibly succeed
    pub fn is_transient(&self) -> bool {
        use recipeloops_chef::CreationError;
        use recipeloops_critic::EvaluationError;

        match self {
            LoopError::ChefError(CreationError::Generation(e))
            | LoopError::CriticError(EvaluationError::Generation(e)) => e.is_transient(),
            LoopError::ChefError(CreationError::EmptyRecipe)
            | LoopError::CriticError(EvaluationError::EmptyCritique) => true,
            LoopError::InvalidRequest(_) | LoopError::ConfigError(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recipeloops_agent::GenerationError;
    use recipeloops_chef::CreationError;
    use recipeloops_critic::EvaluationError;

    #[test]
    fn test_transient_follows_generation_error() {
        let auth = LoopError::from(CreationError::from(GenerationError::Auth("bad key".into())));
        assert!(!auth.is_transient());

        let rate_limited = LoopError::from(EvaluationError::from(GenerationError::RateLimited(
            "slow down".into(),
        )));
        assert!(rate_limited.is_transient());

        assert!(LoopError::from(CreationError::EmptyRecipe).is_transient());
        assert!(!LoopError::ConfigError("bad".into()).is_transient());
    }
}
