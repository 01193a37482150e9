//! Configuration file support for recipeloops.
//!
//! Loads `recipeloops.toml` from the working directory, falling back to the
//! global `~/.config/recipeloops/config.toml`, and resolves the final run
//! settings against command-line overrides.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use recipeloops_agent::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
use recipeloops_chef::{ChefSettings, RecipeRequest, DEFAULT_CHEF_TEMPERATURE};
use recipeloops_core::{DebugChannels, FailurePolicy, DEFAULT_MAX_ATTEMPTS};
use recipeloops_critic::{CriticSettings, VerdictMode, DEFAULT_CRITIC_TEMPERATURE};

/// The project config file name
pub const CONFIG_FILE_NAME: &str = "recipeloops.toml";

/// Directory under the user config dir holding the global config
pub const GLOBAL_CONFIG_DIR: &str = "recipeloops";

/// The global config file name
pub const GLOBAL_CONFIG_FILE: &str = "config.toml";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Configuration loaded from `recipeloops.toml` (project or global)
#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Default model for both roles
    pub model: Option<String>,
    /// Retry budget
    pub max_attempts: Option<usize>,
    /// End the loop on the first generation error
    pub stop_on_error: Option<bool>,
    /// Read only the last `Overall Status:` line
    pub strict_verdict: Option<bool>,
    /// API base URL
    pub base_url: Option<String>,
    /// Per-request timeout (e.g. "90s", "2m")
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
    #[serde(default)]
    pub chef: RoleConfig,
    #[serde(default)]
    pub critic: RoleConfig,
    #[serde(default)]
    pub debug: DebugConfig,
    /// Request used when none is given on the command line
    pub request: Option<RecipeRequest>,
}

/// Configuration for a specific role (chef or critic)
#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RoleConfig {
    pub model: Option<String>,
    pub temperature: Option<f32>,
}

/// Debug channel toggles
#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DebugConfig {
    pub recipe: Option<bool>,
    pub critique: Option<bool>,
}

impl ProjectConfig {
    /// Load a config file.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if file exists and parses successfully
    /// - `Ok(None)` if file does not exist
    /// - `Err(...)` if file exists but fails to parse (hard error)
    pub fn load_file(config_path: &Path) -> Result<Option<Self>> {
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(Some(config))
    }

    /// Load configuration from the working directory
    pub fn load(working_dir: &Path) -> Result<Option<Self>> {
        Self::load_file(&working_dir.join(CONFIG_FILE_NAME))
    }

    /// Path of the global config file, if a config dir exists
    pub fn global_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(GLOBAL_CONFIG_DIR).join(GLOBAL_CONFIG_FILE))
    }

    /// Project config layered over global config
    pub fn load_layered(working_dir: &Path) -> Result<Self> {
        let project = Self::load(working_dir)?.unwrap_or_default();
        let global = match Self::global_path() {
            Some(path) => Self::load_file(&path)?.unwrap_or_default(),
            None => Self::default(),
        };
        Ok(project.or(global))
    }

    /// Fill every unset field from `fallback`
    pub fn or(self, fallback: Self) -> Self {
        Self {
            model: self.model.or(fallback.model),
            max_attempts: self.max_attempts.or(fallback.max_attempts),
            stop_on_error: self.stop_on_error.or(fallback.stop_on_error),
            strict_verdict: self.strict_verdict.or(fallback.strict_verdict),
            base_url: self.base_url.or(fallback.base_url),
            timeout: self.timeout.or(fallback.timeout),
            chef: RoleConfig {
                model: self.chef.model.or(fallback.chef.model),
                temperature: self.chef.temperature.or(fallback.chef.temperature),
            },
            critic: RoleConfig {
                model: self.critic.model.or(fallback.critic.model),
                temperature: self.critic.temperature.or(fallback.critic.temperature),
            },
            debug: DebugConfig {
                recipe: self.debug.recipe.or(fallback.debug.recipe),
                critique: self.debug.critique.or(fallback.debug.critique),
            },
            request: self.request.or(fallback.request),
        }
    }

    /// Get the effective model for the chef role.
    /// Priority: [chef].model > global model > None
    pub fn chef_model(&self) -> Option<&str> {
        self.chef.model.as_deref().or(self.model.as_deref())
    }

    /// Get the effective model for the critic role.
    /// Priority: [critic].model > global model > None
    pub fn critic_model(&self) -> Option<&str> {
        self.critic.model.as_deref().or(self.model.as_deref())
    }
}

/// Values taken from the command line; unset fields defer to the config file
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub dish: Option<String>,
    pub constraints: Vec<String>,
    pub request_file: Option<PathBuf>,
    pub model: Option<String>,
    pub chef_model: Option<String>,
    pub critic_model: Option<String>,
    pub chef_temperature: Option<f32>,
    pub critic_temperature: Option<f32>,
    pub max_attempts: Option<usize>,
    pub stop_on_error: bool,
    pub strict_verdict: bool,
    pub debug_recipe: bool,
    pub debug_critique: bool,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
}

/// Everything a run needs, after layering CLI > config > defaults
#[derive(Debug)]
pub struct RunSettings {
    pub request: RecipeRequest,
    pub chef: ChefSettings,
    pub critic: CriticSettings,
    pub max_attempts: usize,
    pub failure_policy: FailurePolicy,
    pub debug: DebugChannels,
    pub client: ClientConfig,
}

impl RunSettings {
    pub fn resolve(cli: CliOverrides, config: ProjectConfig, working_dir: &Path) -> Result<Self> {
        let request = resolve_request(&cli, &config, working_dir)?;

        let chef_model = cli
            .chef_model
            .as_deref()
            .or(cli.model.as_deref())
            .or(config.chef_model())
            .unwrap_or(DEFAULT_MODEL)
            .to_string();
        let critic_model = cli
            .critic_model
            .as_deref()
            .or(cli.model.as_deref())
            .or(config.critic_model())
            .unwrap_or(DEFAULT_MODEL)
            .to_string();

        let verdict_mode = if cli.strict_verdict || config.strict_verdict.unwrap_or(false) {
            VerdictMode::Strict
        } else {
            VerdictMode::Marker
        };

        let failure_policy = if cli.stop_on_error || config.stop_on_error.unwrap_or(false) {
            FailurePolicy::Stop
        } else {
            FailurePolicy::Retry
        };

        let client = ClientConfig::default()
            .with_base_url(
                cli.base_url
                    .or(config.base_url)
                    .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            )
            .with_timeout(cli.timeout.or(config.timeout).unwrap_or(DEFAULT_TIMEOUT));

        Ok(Self {
            request,
            chef: ChefSettings {
                model: chef_model,
                temperature: Some(
                    cli.chef_temperature
                        .or(config.chef.temperature)
                        .unwrap_or(DEFAULT_CHEF_TEMPERATURE),
                ),
            },
            critic: CriticSettings {
                model: critic_model,
                temperature: Some(
                    cli.critic_temperature
                        .or(config.critic.temperature)
                        .unwrap_or(DEFAULT_CRITIC_TEMPERATURE),
                ),
                verdict_mode,
            },
            max_attempts: cli
                .max_attempts
                .or(config.max_attempts)
                .unwrap_or(DEFAULT_MAX_ATTEMPTS),
            failure_policy,
            debug: DebugChannels {
                recipe: cli.debug_recipe || config.debug.recipe.unwrap_or(false),
                critique: cli.debug_critique || config.debug.critique.unwrap_or(false),
            },
            client,
        })
    }
}

/// Pick the request: --request-file > --dish/--constraint > [request] > built-in sample
fn resolve_request(
    cli: &CliOverrides,
    config: &ProjectConfig,
    working_dir: &Path,
) -> Result<RecipeRequest> {
    let request = if let Some(ref path) = cli.request_file {
        let path = if path.is_absolute() {
            path.clone()
        } else {
            working_dir.join(path)
        };
        load_request_file(&path)?
    } else if let Some(ref dish) = cli.dish {
        RecipeRequest::new(dish.clone(), cli.constraints.clone())
    } else if !cli.constraints.is_empty() {
        anyhow::bail!("--constraint requires --dish");
    } else if let Some(ref request) = config.request {
        request.clone()
    } else {
        RecipeRequest::sample()
    };

    request.validate().context("Invalid recipe request")?;
    Ok(request)
}

/// Load a request from a `.json` or `.toml` file
pub fn load_request_file(path: &Path) -> Result<RecipeRequest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read request file {}", path.display()))?;

    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if is_json {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    } else {
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }
}
