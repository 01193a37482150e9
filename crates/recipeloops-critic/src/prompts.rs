use recipeloops_chef::RecipeRequest;

use crate::{FAILED_MARKER, PASSED_MARKER, TASTE_CONSTRAINT, TASTE_THRESHOLD};

/// Prompt templates for the critic
pub struct CriticPrompts;

impl CriticPrompts {
    /// System-role framing for every critic call
    pub const SYSTEM_INSTRUCTIONS: &'static str = "You are an extremely precise nutrition and dietary compliance evaluator. \
Your role is to meticulously assess a given recipe against a specific set of user-defined constraints. \
For each constraint, you must clearly state if it 'PASSED' or 'FAILED'. \
If a constraint FAILED, you must provide a concise reason and an actionable suggestion for improvement. \
You also need to provide an overall taste rating based on the recipe description.";

    /// Build the critic evaluation prompt
    pub fn build_evaluation_prompt(recipe: &str, request: &RecipeRequest) -> String {
        format!(
            r#"## RECIPE
{recipe}

## Step 1: Preparation Check
Before anything else, check that the RECIPE above includes its preparation steps.
If the preparation steps are missing, write 'Preparation steps: FAILED', then write '{failed}' on its own line and stop. Do not evaluate the constraints.

## Step 2: Constraints
Evaluate the RECIPE against EACH of the following constraints from the original request:
Original Request Constraints: {constraints}

For each constraint, state the constraint verbatim, then write 'PASSED' or 'FAILED'.
If 'FAILED', give a brief reason and a specific suggestion for fixing it.
Example for two constraints:
'gluten-free: PASSED'
'under 500 calories per serving: FAILED - Estimated 650 calories. Suggest reducing oil by half.'

## Step 3: Taste
After evaluating all constraints, write one line 'Taste Rating: [N]/10' based on the recipe's taste description (where N is a number).
The constraint '{taste}' is met only if N is {threshold} or higher.

## Step 4: Overall Status
Finally, on a new line, write '{passed}' if ALL constraints are met, or '{failed}' if ANY constraint is not met.
Write exactly one Overall Status line."#,
            recipe = recipe,
            constraints = request.constraints_line(),
            taste = TASTE_CONSTRAINT,
            threshold = TASTE_THRESHOLD,
            passed = PASSED_MARKER,
            failed = FAILED_MARKER,
        )
    }

    /// Critique produced locally when the recipe has no content to evaluate
    pub fn build_precheck_failure(request: &RecipeRequest) -> String {
        let mut critique = String::from(
            "Preparation steps: FAILED - The recipe is empty. Suggest providing a full recipe with ingredients and step-by-step instructions.\n",
        );
        for constraint in &request.constraints {
            critique.push_str(&format!(
                "{}: FAILED - Cannot be evaluated without a recipe.\n",
                constraint
            ));
        }
        critique.push_str(FAILED_MARKER);
        critique
    }
}
