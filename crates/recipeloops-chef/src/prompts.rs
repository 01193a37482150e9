use crate::RecipeRequest;

/// Prompt templates for the chef
pub struct ChefPrompts;

impl ChefPrompts {
    /// System-role framing for every chef call
    pub const SYSTEM_INSTRUCTIONS: &'static str = "You are an innovative and highly skilled chef, \
renowned for creating delicious recipes that also meet specific dietary and nutritional targets. \
You are good at interpreting user requests and also at refining your creations based on precise feedback.";

    /// Build the chef input for an attempt.
    ///
    /// Deterministic: the same request and feedback always yield the same string.
    pub fn build_input(request: &RecipeRequest, feedback: Option<&str>) -> String {
        let header = format!(
            "Please create a '{dish}' recipe that meets ALL of the following constraints: {constraints}.",
            dish = request.base_dish,
            constraints = request.constraints_line(),
        );

        match feedback {
            Some(feedback) => Self::build_revision(&header, feedback),
            None => Self::build_first_attempt(&header),
        }
    }

    fn build_first_attempt(header: &str) -> String {
        format!(
            r#"{header}
This is the first attempt.

Please provide:
- a creative name for the dish
- a list of ingredients (with quantities)
- step-by-step instructions
- an estimated calorie count per serving
- an estimated protein content (grams) per serving
- a short description of its taste profile"#
        )
    }

    fn build_revision(header: &str, feedback: &str) -> String {
        format!(
            r#"{header}

IMPORTANT: Your previous attempt had issues. Please revise the recipe based on this specific feedback:

{feedback}

Ensure all original constraints AND this feedback are addressed."#
        )
    }
}
