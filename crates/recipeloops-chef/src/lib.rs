mod creator;
mod prompts;
mod request;

pub use creator::{
    ChefOutput, ChefSettings, CreationError, RecipeCreator, DEFAULT_CHEF_TEMPERATURE,
};
pub use prompts::ChefPrompts;
pub use request::{RecipeRequest, RequestError};
