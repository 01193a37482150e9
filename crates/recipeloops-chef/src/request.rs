use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What the user asked for: a base dish plus constraints that must all hold
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecipeRequest {
    /// Dish to build the recipe around (e.g., "pasta")
    pub base_dish: String,
    /// Ordered constraints; every one must be satisfied
    #[serde(default)]
    pub constraints: Vec<String>,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RequestError {
    #[error("Base dish must not be empty")]
    EmptyBaseDish,

    #[error("Constraint #{0} is empty")]
    EmptyConstraint(usize),
}

impl RecipeRequest {
    pub fn new<I, S>(base_dish: impl Into<String>, constraints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            base_dish: base_dish.into(),
            constraints: constraints.into_iter().map(Into::into).collect(),
        }
    }

    /// The request used when nothing else is supplied
    pub fn sample() -> Self {
        Self::new(
            "pasta",
            [
                "gluten-free",
                "vegan",
                "under 500 calories per serving",
                "high protein (>15g per serving)",
                "no coconut",
                "taste must be rated 7/10 or higher",
            ],
        )
    }

    pub fn validate(&self) -> Result<(), RequestError> {
        if self.base_dish.trim().is_empty() {
            return Err(RequestError::EmptyBaseDish);
        }
        if let Some(pos) = self.constraints.iter().position(|c| c.trim().is_empty()) {
            return Err(RequestError::EmptyConstraint(pos + 1));
        }
        Ok(())
    }

    /// Constraints joined with ", " in their original order
    pub fn constraints_line(&self) -> String {
        self.constraints.join(", ")
    }
}
